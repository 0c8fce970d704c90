#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use transcodecs::{ImageFormat, Limits, Transcoder};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    target: u8,
    quality: u8,
    data: &'a [u8],
}

fuzz_target!(|input: Input<'_>| {
    let target = ImageFormat::ALL[input.target as usize % ImageFormat::ALL.len()];
    let transcoder = Transcoder::new().with_limits(Limits::default().with_max_pixels(1 << 18));
    if let Ok(result) = transcoder.convert_one(input.data, target, input.quality) {
        assert!((1..=100).contains(&input.quality));
        assert_eq!(ImageFormat::detect(&result.output_bytes), Some(target));
        let (_, decoded) = transcoder.decode(&result.output_bytes).expect("own output decodes");
        assert_eq!((decoded.width(), decoded.height()), (result.width, result.height));
    }
});
