//! tcimg, a batch image transcoder.
//!
//! Converts JPEG, PNG, WebP and GIF files between formats at a chosen
//! quality, and inspects image headers without decoding pixels.

mod batch;
mod info;
mod output;
mod process;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use transcodecs::{ConversionSettings, DitherMode, ImageFormat, QualityPreset};

/// Arguments for the `process` subcommand.
#[derive(Parser, Debug)]
pub struct ProcessArgs {
    /// Input files, directories or glob patterns.
    #[arg(required = true)]
    pub files: Vec<String>,

    // --- Output ---
    /// Output file or directory (dir/ with trailing slash for batch).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Filename suffix before extension (default: none).
    #[arg(long, default_value = "")]
    pub suffix: String,

    /// Allow overwriting existing files.
    #[arg(long)]
    pub force: bool,

    /// Convert but don't write any files.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip writing output if it would be larger than input.
    #[arg(long)]
    pub skip_if_larger: bool,

    // --- Format ---
    /// Target format (default: from -o extension, else jpeg).
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    // --- Quality ---
    /// Quality 1-100 (default: 80). Overrides --preset.
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Quality preset, mapped per target format.
    #[arg(long, value_enum)]
    pub preset: Option<PresetArg>,

    /// Shorthand for --preset lossless.
    #[arg(long)]
    pub lossless: bool,

    // --- Codec options ---
    /// Write progressive JPEG.
    #[arg(long)]
    pub progressive: bool,

    /// GIF dithering.
    #[arg(long, value_enum, default_value = "floyd-steinberg")]
    pub dither: DitherArg,

    /// Seed for --dither random.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// GIF palette size, 2-256 (default: from quality).
    #[arg(long)]
    pub colors: Option<u16>,

    // --- Limits ---
    /// Refuse inputs with more pixels than this.
    #[arg(long)]
    pub max_pixels: Option<u64>,

    // --- Batch ---
    /// Number of parallel workers (default: CPU count).
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Print summary report after batch processing.
    #[arg(long)]
    pub report: bool,

    /// Write CSV report to file.
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Log level: error, warn, info, debug or trace.
    #[arg(long, env = "TCIMG_LOG", default_value = "warn")]
    pub log_level: log::Level,
}

/// Arguments for the `info` subcommand.
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Input files, directories or glob patterns.
    #[arg(required = true)]
    pub files: Vec<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Log level: error, warn, info, debug or trace.
    #[arg(long, env = "TCIMG_LOG", default_value = "warn")]
    pub log_level: log::Level,
}

/// Target image format.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    Jpeg,
    Webp,
    Png,
    Gif,
}

impl FormatArg {
    pub fn to_image_format(self) -> ImageFormat {
        match self {
            FormatArg::Jpeg => ImageFormat::Jpeg,
            FormatArg::Webp => ImageFormat::WebP,
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Gif => ImageFormat::Gif,
        }
    }
}

/// Quality preset.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PresetArg {
    Lossless,
    NearLossless,
    High,
    Balanced,
    Small,
}

impl PresetArg {
    fn to_preset(self) -> QualityPreset {
        match self {
            PresetArg::Lossless => QualityPreset::Lossless,
            PresetArg::NearLossless => QualityPreset::NearLossless,
            PresetArg::High => QualityPreset::HighQuality,
            PresetArg::Balanced => QualityPreset::Balanced,
            PresetArg::Small => QualityPreset::SmallFile,
        }
    }
}

/// GIF dithering mode.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DitherArg {
    None,
    Ordered,
    FloydSteinberg,
    /// Seeded noise; see --seed.
    Random,
}

impl ProcessArgs {
    /// Target format from --format, then the -o extension, then the default.
    pub fn resolve_format(&self) -> ImageFormat {
        if let Some(fmt) = self.format {
            return fmt.to_image_format();
        }

        if let Some(ref out) = self.output {
            let path = std::path::Path::new(out);
            if let Some(fmt) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ImageFormat::from_extension)
            {
                return fmt;
            }
        }

        ConversionSettings::default().format
    }

    /// Format and quality applied to every input.
    pub fn resolve_settings(&self) -> ConversionSettings {
        let format = self.resolve_format();
        let quality = match (self.quality, self.lossless, self.preset) {
            (Some(q), _, _) => q,
            (None, true, _) => QualityPreset::Lossless.for_format(format),
            (None, false, Some(preset)) => preset.to_preset().for_format(format),
            (None, false, None) => ConversionSettings::default().quality,
        };
        ConversionSettings::new(format, quality)
    }

    pub fn dither_mode(&self) -> DitherMode {
        match self.dither {
            DitherArg::None => DitherMode::None,
            DitherArg::Ordered => DitherMode::Ordered,
            DitherArg::FloydSteinberg => DitherMode::FloydSteinberg,
            DitherArg::Random => DitherMode::Random { seed: self.seed },
        }
    }
}

fn init_logger(level: log::Level) {
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("warning: logger already initialized: {e}");
    }
}

/// Dispatch CLI arguments.
///
/// A leading `process` or `info` selects the subcommand; anything else is
/// parsed as `process` arguments (bare files default).
fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let first_arg = args.get(1).map(|s| s.as_str());
    match first_arg {
        Some("process") => {
            let cmd = ProcessArgs::parse_from(&args[1..]);
            init_logger(cmd.log_level);
            process::run(cmd)
        }
        Some("info") => {
            let cmd = InfoArgs::parse_from(&args[1..]);
            init_logger(cmd.log_level);
            info::run(cmd)
        }
        Some("help" | "--help" | "-h") | None => {
            print_help();
            Ok(())
        }
        Some("--version" | "-V") => {
            println!("tcimg {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(_) => {
            // Bare files / flags → treat as `process` args
            let cmd = ProcessArgs::parse_from(
                std::iter::once("process".to_string()).chain(args[1..].iter().cloned()),
            );
            init_logger(cmd.log_level);
            process::run(cmd)
        }
    }
}

fn print_help() {
    eprintln!(
        "\
tcimg {} — batch image transcoder

USAGE:
    tcimg [COMMAND] [OPTIONS] <FILES>...

COMMANDS:
    process    Convert images (default)
    info       Probe and display image metadata

Bare files default to `process`, writing JPEG at quality 80.

EXAMPLES:
    tcimg photo.png                              Convert to photo.jpg
    tcimg photo.png -f webp -q 90 -o out.webp    Convert to WebP
    tcimg process shots/ -f gif --colors 64 -o gifs/ --report
    tcimg info photo.jpg --json

Run `tcimg process --help` or `tcimg info --help` for full options.",
        env!("CARGO_PKG_VERSION")
    );
}
