//! Output path resolution with format-aware extension changes.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use transcodecs::ConversionSettings;

/// Resolved output configuration.
pub struct OutputConfig {
    pub target_dir: Option<PathBuf>,
    pub target_file: Option<PathBuf>,
    pub suffix: String,
    pub force: bool,
    pub dry_run: bool,
    /// Target format and quality; the format decides the extension.
    pub settings: ConversionSettings,
}

impl OutputConfig {
    /// Create from CLI args.
    pub fn new(output: Option<&str>, suffix: &str, force: bool, dry_run: bool, settings: ConversionSettings) -> Self {
        let (target_dir, target_file) = match output {
            Some(o) => {
                let path = PathBuf::from(o);
                if o.ends_with('/') || o.ends_with('\\') || path.is_dir() {
                    (Some(path), None)
                } else {
                    (None, Some(path))
                }
            }
            None => (None, None),
        };

        Self {
            target_dir,
            target_file,
            suffix: suffix.to_string(),
            force,
            dry_run,
            settings,
        }
    }

    /// Resolve the output path for a given input file.
    pub fn resolve(&self, input: &Path, input_count: usize) -> anyhow::Result<PathBuf> {
        // -o file: only valid for single-file input
        if let Some(ref target) = self.target_file {
            if input_count > 1 {
                bail!("-o with a file path only works for a single input file (got {input_count})");
            }
            return Ok(target.clone());
        }

        let filename = self.output_filename(input);

        // -o dir/: place output in target directory
        if let Some(ref dir) = self.target_dir {
            return Ok(dir.join(filename));
        }

        // Default: next to the input
        let parent = input.parent().unwrap_or(Path::new("."));
        Ok(parent.join(filename))
    }

    /// `<stem><suffix>.<ext>` for the target format.
    fn output_filename(&self, input: &Path) -> String {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        self.settings
            .output_file_name(&format!("{stem}{}", self.suffix))
    }

    /// Check if the output path is writable (won't clobber without --force).
    pub fn check_writable(&self, input: &Path, output: &Path) -> anyhow::Result<()> {
        if self.dry_run {
            return Ok(());
        }

        if let (Ok(ci), Ok(co)) = (input.canonicalize(), output.canonicalize()) {
            if ci == co {
                bail!(
                    "output would overwrite input: {}\nUse --suffix or -o to write elsewhere",
                    input.display()
                );
            }
        }

        if output.exists() && !self.force {
            bail!(
                "output already exists: {}\nUse --force to overwrite",
                output.display()
            );
        }

        Ok(())
    }

    /// Create parent directories for the output path.
    pub fn ensure_parent(output: &Path) -> anyhow::Result<()> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating directory: {}", parent.display()))?;
            }
        }
        Ok(())
    }
}
