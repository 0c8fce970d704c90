//! Input discovery and the per-file report for `process`.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use transcodecs::ImageFormat;

/// Files named on the command line, each admitted once.
#[derive(Default)]
struct InputSet {
    seen: HashSet<PathBuf>,
    files: Vec<PathBuf>,
}

impl InputSet {
    /// Keep `path` unless another spelling of it was already admitted.
    fn admit(&mut self, path: PathBuf) {
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        if self.seen.insert(key) {
            self.files.push(path);
        }
    }

    /// Admit every convertible file below `dir`. Unreadable subdirectories
    /// are skipped with a warning.
    fn admit_dir(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("skipping {}: {e}", dir.display());
                return;
            }
        };
        let mut children: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        children.sort();
        for child in children {
            if child.is_dir() {
                self.admit_dir(&child);
            } else if is_convertible(&child) {
                self.admit(child);
            }
        }
    }
}

/// Expand files, directories and glob patterns into the list of images to
/// convert.
///
/// Paths reached through globs or directories are filtered by extension;
/// paths named directly are always kept so the decoder can report on them.
/// Largest files come first so the batch's long items start early.
pub fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut inputs = InputSet::default();

    for pattern in patterns {
        if pattern.contains(['*', '?', '[']) {
            for entry in glob::glob(pattern)? {
                let path = entry?;
                if path.is_file() && is_convertible(&path) {
                    inputs.admit(path);
                }
            }
            continue;
        }

        let path = PathBuf::from(pattern);
        if path.is_dir() {
            inputs.admit_dir(&path);
        } else if path.is_file() {
            inputs.admit(path);
        } else {
            anyhow::bail!("not a file or directory: {}", path.display());
        }
    }

    let mut files = inputs.files;
    files.sort_by_cached_key(|p| Reverse(p.metadata().map_or(0, |m| m.len())));
    log::debug!("{} input files", files.len());
    Ok(files)
}

/// Whether the extension names one of the four source formats.
pub fn is_convertible(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension)
        .is_some()
}

/// Result of processing a single file.
#[derive(Debug)]
pub struct FileResult {
    pub input_path: PathBuf,
    pub input_size: u64,
    pub source_format: Option<ImageFormat>,
    pub dimensions: Option<(u32, u32)>,
    pub output_size: Option<u64>,
    pub output_path: Option<PathBuf>,
    pub skipped: bool,
    pub error: Option<String>,
    /// Encoder time for converted files.
    pub duration: Duration,
}

impl FileResult {
    /// A file that failed before or during conversion.
    pub fn failed(input_path: &Path, input_size: u64, error: String) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            input_size,
            source_format: None,
            dimensions: None,
            output_size: None,
            output_path: None,
            skipped: false,
            error: Some(error),
            duration: Duration::ZERO,
        }
    }

    /// Output size change relative to input, in percent.
    pub fn change_pct(&self) -> Option<f64> {
        let out = self.output_size?;
        if self.input_size == 0 {
            return None;
        }
        Some((out as f64 - self.input_size as f64) / self.input_size as f64 * 100.0)
    }
}

/// Outcome counts for a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub input_bytes: u64,
    /// Bytes produced, including outputs withheld by `--skip-if-larger`.
    pub output_bytes: u64,
}

/// Per-file results of one `process` run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub results: Vec<FileResult>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: FileResult) {
        self.results.push(result);
    }

    /// Counts and byte totals over every file.
    pub fn totals(&self) -> Totals {
        let mut totals = Totals::default();
        for r in &self.results {
            totals.input_bytes += r.input_size;
            totals.output_bytes += r.output_size.unwrap_or(0);
            if r.error.is_some() {
                totals.failed += 1;
            } else if r.skipped {
                totals.skipped += 1;
            } else {
                totals.converted += 1;
            }
        }
        totals
    }

    /// Print a human-readable summary table.
    pub fn print_report(&self) {
        if self.results.is_empty() {
            println!("No files processed.");
            return;
        }

        // Header
        println!(
            "{:<32} {:>11} {:>10} {:>10} {:>8} {:>8}",
            "File", "Dimensions", "Input", "Output", "Change", "Encode"
        );
        println!("{}", "-".repeat(84));

        for r in &self.results {
            let name = r
                .input_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("?");
            let name = truncate_name(name, 30);
            let dims = r
                .dimensions
                .map(|(w, h)| format!("{w}x{h}"))
                .unwrap_or_default();

            if let Some(err) = &r.error {
                println!("{:<32} {:>11} {:>10} {}", name, dims, format_size(r.input_size), err);
            } else if r.skipped {
                println!(
                    "{:<32} {:>11} {:>10} {:>10}",
                    name,
                    dims,
                    format_size(r.input_size),
                    "skipped"
                );
            } else if let Some(out_size) = r.output_size {
                let change = r
                    .change_pct()
                    .map_or_else(|| "N/A".to_string(), |pct| format!("{pct:+.1}%"));
                let time_ms = r.duration.as_millis();
                let time_str = if time_ms >= 1000 {
                    format!("{:.1}s", time_ms as f64 / 1000.0)
                } else {
                    format!("{}ms", time_ms)
                };
                println!(
                    "{:<32} {:>11} {:>10} {:>10} {:>8} {:>8}",
                    name,
                    dims,
                    format_size(r.input_size),
                    format_size(out_size),
                    change,
                    time_str,
                );
            }
        }

        println!("{}", "-".repeat(84));
        let totals = self.totals();
        let change = if totals.input_bytes > 0 {
            let pct = (totals.output_bytes as f64 - totals.input_bytes as f64)
                / totals.input_bytes as f64
                * 100.0;
            format!("{pct:+.1}%")
        } else {
            "N/A".to_string()
        };
        println!(
            "{} converted, {} skipped, {} failed | {} -> {} ({change})",
            totals.converted,
            totals.skipped,
            totals.failed,
            format_size(totals.input_bytes),
            format_size(totals.output_bytes),
        );
    }

    /// Write results as CSV.
    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut f = std::fs::File::create(path)?;
        writeln!(
            f,
            "input,source_format,width,height,input_size,output,output_size,change_pct,encode_ms,status"
        )?;
        for r in &self.results {
            let status = if r.error.is_some() {
                "error"
            } else if r.skipped {
                "skipped"
            } else {
                "ok"
            };
            let out_path = r
                .output_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            let source_format = r.source_format.map(|f| f.to_string()).unwrap_or_default();
            let (width, height) = r.dimensions.unwrap_or((0, 0));
            let out_size = r.output_size.unwrap_or(0);
            let change = r.change_pct().unwrap_or(0.0);
            writeln!(
                f,
                "{},{},{},{},{},{},{},{:.1},{},{}",
                r.input_path.display(),
                source_format,
                width,
                height,
                r.input_size,
                out_path,
                out_size,
                change,
                r.duration.as_millis(),
                status,
            )?;
        }
        Ok(())
    }
}

/// Shorten a file name to at most `max` characters, keeping the end.
fn truncate_name(name: &str, max: usize) -> String {
    let count = name.chars().count();
    if count <= max {
        return name.to_string();
    }
    let tail: String = name.chars().skip(count - (max - 2)).collect();
    format!("..{tail}")
}

/// Binary-prefixed size with one decimal, e.g. `2.0 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
