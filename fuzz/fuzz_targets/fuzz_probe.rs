#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(probe) = transcodecs::probe(data) {
        assert!(probe.bytes_examined <= data.len());
        if let Ok(info) = transcodecs::from_bytes(data) {
            assert_eq!(info.format, probe.format);
            assert_eq!(Some((info.width, info.height)), probe.dimensions());
        }
    }
});
