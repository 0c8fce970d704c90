#![no_main]

use libfuzzer_sys::fuzz_target;
use transcodecs::{Limits, Transcoder};

// Tight limits so hostile headers can't make the fuzzer allocate much.
fuzz_target!(|data: &[u8]| {
    let limits = Limits::default()
        .with_max_width(2048)
        .with_max_height(2048)
        .with_max_pixels(1 << 20)
        .with_max_memory_bytes(16 << 20);
    let transcoder = Transcoder::new().with_limits(limits);
    if let Ok((_, image)) = transcoder.decode(data) {
        assert!(image.width() <= 2048 && image.height() <= 2048);
        assert_eq!(image.as_bytes().len(), image.byte_len());
    }
});
