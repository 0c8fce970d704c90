//! The `process` subcommand: read inputs, convert them as one batch, write
//! outputs.

use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use transcodecs::{
    BatchJob, CodecConfig, ConversionRequest, ConversionResult, ItemStatus, Limits, Transcoder,
};

use crate::ProcessArgs;
use crate::batch::{self, BatchSummary, FileResult};
use crate::output::OutputConfig;

/// Run the `process` subcommand.
pub fn run(args: ProcessArgs) -> anyhow::Result<()> {
    let files = batch::expand_inputs(&args.files)?;

    if files.is_empty() {
        anyhow::bail!("no image files found");
    }

    let settings = args.resolve_settings();
    let output_config = OutputConfig::new(
        args.output.as_deref(),
        &args.suffix,
        args.force,
        args.dry_run,
        settings,
    );
    let transcoder = build_transcoder(&args);
    log::info!(
        "converting {} files to {} at quality {}",
        files.len(),
        settings.format,
        settings.quality
    );

    // Unreadable files are reported without entering the batch.
    let mut summary = BatchSummary::new();
    let mut loaded: Vec<(&PathBuf, Vec<u8>)> = Vec::with_capacity(files.len());
    for path in &files {
        match std::fs::read(path).with_context(|| format!("reading {}", path.display())) {
            Ok(data) => loaded.push((path, data)),
            Err(e) => {
                eprintln!("error: {e:#}");
                summary.push(FileResult::failed(path, 0, format!("{e:#}")));
            }
        }
    }

    let requests: Vec<ConversionRequest<'_>> = loaded.iter().map(|(_, data)| settings.request(data)).collect();

    let pb = if requests.len() > 1 {
        let pb = ProgressBar::new(requests.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let job = BatchJob::new(&requests)
        .with_max_concurrency(args.jobs.unwrap_or(0))
        .with_progress(|_, status| {
            if matches!(status, ItemStatus::Completed | ItemStatus::Failed) {
                pb.inc(1);
            }
        });
    let report = transcoder.run_batch(&job);
    pb.finish_and_clear();

    let input_count = files.len();
    for ((path, data), result) in loaded.iter().zip(report.results) {
        let file_result = match result {
            Ok(converted) => write_output(path, data.len() as u64, converted, &args, &output_config, input_count),
            Err(e) => FileResult::failed(path, data.len() as u64, e.to_string()),
        };
        if let Some(ref err) = file_result.error {
            eprintln!("error: {}: {}", path.display(), err);
        } else if input_count == 1 {
            print_single(&file_result);
        }
        summary.push(file_result);
    }

    if args.report {
        summary.print_report();
    }

    if let Some(ref csv_path) = args.csv {
        summary.write_csv(csv_path)?;
        eprintln!("CSV report written to {}", csv_path.display());
    }

    let totals = summary.totals();
    if totals.failed > 0 && !args.report {
        eprintln!("{} of {} files failed", totals.failed, summary.results.len());
    }

    Ok(())
}

fn build_transcoder(args: &ProcessArgs) -> Transcoder {
    let mut limits = Limits::default();
    if let Some(max) = args.max_pixels {
        limits = limits.with_max_pixels(max);
    }

    let mut config = CodecConfig::default()
        .with_jpeg_progressive(args.progressive)
        .with_gif_dither(args.dither_mode());
    if let Some(colors) = args.colors {
        config = config.with_gif_max_colors(colors);
    }

    Transcoder::new().with_limits(limits).with_codec_config(config)
}

/// Write one converted image, folding I/O failures into the result.
fn write_output(
    input: &Path,
    input_size: u64,
    converted: ConversionResult,
    args: &ProcessArgs,
    output_config: &OutputConfig,
    input_count: usize,
) -> FileResult {
    let output_size = converted.output_byte_size as u64;
    let mut result = FileResult {
        input_path: input.to_path_buf(),
        input_size,
        source_format: Some(converted.source_format),
        dimensions: Some((converted.width, converted.height)),
        output_size: Some(output_size),
        output_path: None,
        skipped: false,
        error: None,
        duration: converted.encode_time,
    };

    if args.skip_if_larger && output_size > input_size {
        result.skipped = true;
        return result;
    }

    let written = output_config.resolve(input, input_count).and_then(|output| {
        output_config.check_writable(input, &output)?;
        if !output_config.dry_run {
            OutputConfig::ensure_parent(&output)?;
            std::fs::write(&output, &converted.output_bytes)
                .with_context(|| format!("writing {}", output.display()))?;
        }
        Ok(output)
    });

    match written {
        Ok(output) => result.output_path = Some(output),
        Err(e) => {
            result.output_size = None;
            result.error = Some(format!("{e:#}"));
        }
    }
    result
}

fn print_single(result: &FileResult) {
    if result.skipped {
        eprintln!("skipped (output would be larger)");
        return;
    }
    if let (Some(out_size), Some(out_path)) = (result.output_size, &result.output_path) {
        let change = result
            .change_pct()
            .map(|pct| format!(" ({pct:+.1}%)"))
            .unwrap_or_default();
        eprintln!(
            "{} -> {} ({}{change})",
            batch::format_size(result.input_size),
            batch::format_size(out_size),
            out_path.display(),
        );
    }
}
