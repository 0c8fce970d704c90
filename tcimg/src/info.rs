//! Image inspection: probe and display metadata without decoding.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::InfoArgs;
use crate::batch;

/// Run the `info` subcommand.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let files = batch::expand_inputs(&args.files)?;

    if files.is_empty() {
        anyhow::bail!("no image files found");
    }

    let multi = files.len() > 1;

    for (i, path) in files.iter().enumerate() {
        if multi && !args.json {
            if i > 0 {
                println!();
            }
            println!("{}:", path.display());
        }

        match inspect_file(path) {
            Ok(info) => {
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&info)?);
                } else {
                    print_info(&info);
                }
            }
            Err(e) => {
                eprintln!("  error: {e:#}");
            }
        }
    }

    Ok(())
}

/// Probe a single file and return structured info.
fn inspect_file(path: &Path) -> anyhow::Result<ImageInfoDisplay> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let info = transcodecs::from_bytes(&data)?;
    let probe = transcodecs::probe(&data)?;

    Ok(ImageInfoDisplay {
        path: path.display().to_string(),
        format: info.format.to_string(),
        mime_type: info.format.mime_type().to_string(),
        width: info.width,
        height: info.height,
        has_alpha: info.has_alpha,
        has_animation: info.has_animation,
        bit_depth: info.bit_depth,
        header_bytes: probe.bytes_examined,
        decoded_size: u64::from(info.width) * u64::from(info.height) * 4,
        file_size: data.len() as u64,
    })
}

#[derive(Debug, Serialize)]
struct ImageInfoDisplay {
    path: String,
    format: String,
    mime_type: String,
    width: u32,
    height: u32,
    has_alpha: bool,
    has_animation: bool,
    bit_depth: Option<u8>,
    /// Bytes read to find the header fields.
    header_bytes: usize,
    /// RGBA8 buffer size a full decode would allocate.
    decoded_size: u64,
    file_size: u64,
}

fn print_info(info: &ImageInfoDisplay) {
    println!("  Format:       {} ({})", info.format, info.mime_type);
    println!("  Dimensions:   {}x{}", info.width, info.height);
    if let Some(depth) = info.bit_depth {
        println!("  Bit depth:    {depth}");
    }
    println!(
        "  Alpha:        {}",
        if info.has_alpha { "yes" } else { "no" }
    );
    if info.has_animation {
        println!("  Animation:    yes (first frame is converted)");
    }
    println!(
        "  File size:    {} ({} bytes)",
        batch::format_size(info.file_size),
        info.file_size
    );
    println!("  Decoded:      {}", batch::format_size(info.decoded_size));
    println!("  Header:       {} bytes examined", info.header_bytes);
}
