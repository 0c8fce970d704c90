//! Batch conversion over a bounded worker pool.
//!
//! Each request is decoded and encoded on a single worker. Results come
//! back in request order regardless of completion order, and a failed item
//! never affects its siblings.

use std::fmt;
use std::num::NonZeroUsize;

use rayon::prelude::*;

use crate::error::ConversionError;
use crate::format::ImageFormat;
use crate::limits::CancellationToken;
use crate::pipeline::{ConversionResult, Transcoder};
use crate::raster::SourceAsset;

/// One conversion: source bytes, target format and quality.
#[derive(Clone, Copy, Debug)]
pub struct ConversionRequest<'a> {
    pub source: SourceAsset<'a>,
    pub target_format: ImageFormat,
    /// Validated when the request runs, not here.
    pub quality: u8,
}

impl<'a> ConversionRequest<'a> {
    pub fn new(bytes: &'a [u8], target_format: ImageFormat, quality: u8) -> Self {
        Self {
            source: SourceAsset::new(bytes),
            target_format,
            quality,
        }
    }
}

/// A target format and quality chosen once and applied to many inputs.
///
/// `Default` is JPEG at quality 80. Nothing in the conversion path falls
/// back to it implicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConversionSettings {
    pub format: ImageFormat,
    pub quality: u8,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality: 80,
        }
    }
}

impl ConversionSettings {
    pub fn new(format: ImageFormat, quality: u8) -> Self {
        Self { format, quality }
    }

    /// A request converting `bytes` with these settings.
    pub fn request<'a>(&self, bytes: &'a [u8]) -> ConversionRequest<'a> {
        ConversionRequest::new(bytes, self.format, self.quality)
    }

    /// `<stem>.<ext>` for the target format.
    pub fn output_file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.format.extension())
    }
}

/// Lifecycle of one batch item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ItemStatus::Pending => "pending",
            ItemStatus::InProgress => "in progress",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        })
    }
}

type Outcome = (ItemStatus, Result<ConversionResult, ConversionError>);

type ProgressFn<'a> = dyn Fn(usize, ItemStatus) + Send + Sync + 'a;

/// An ordered set of requests sharing a worker limit and a cancellation
/// token.
pub struct BatchJob<'a> {
    requests: &'a [ConversionRequest<'a>],
    max_concurrency: usize,
    cancel: CancellationToken,
    progress: Option<Box<ProgressFn<'a>>>,
}

impl<'a> BatchJob<'a> {
    pub fn new(requests: &'a [ConversionRequest<'a>]) -> Self {
        Self {
            requests,
            max_concurrency: 0,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    /// Cap on items in progress at once. 0 means available parallelism.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Use an existing token, e.g. one shared with a UI thread.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Called with the item index on every status change.
    pub fn with_progress(mut self, progress: impl Fn(usize, ItemStatus) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn requests(&self) -> &'a [ConversionRequest<'a>] {
        self.requests
    }

    /// Handle for cancelling items that have not started yet.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn worker_count(&self) -> usize {
        let limit = if self.max_concurrency == 0 {
            std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
        } else {
            self.max_concurrency
        };
        limit.min(self.requests.len()).max(1)
    }

    fn notify(&self, index: usize, status: ItemStatus) {
        if let Some(progress) = &self.progress {
            progress(index, status);
        }
    }
}

impl fmt::Debug for BatchJob<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchJob")
            .field("requests", &self.requests.len())
            .field("max_concurrency", &self.max_concurrency)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Outcome of a batch, index-aligned with its requests.
#[derive(Debug)]
#[non_exhaustive]
pub struct BatchReport {
    pub results: Vec<Result<ConversionResult, ConversionError>>,
    /// Final status per item. Cancelled items stay `Pending`.
    pub statuses: Vec<ItemStatus>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.len() - self.success_count()
    }

    /// Items skipped because the batch was cancelled.
    pub fn cancelled_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r, Err(ConversionError::Cancelled)))
            .count()
    }

    /// Input bytes of the items that converted.
    pub fn total_input_bytes(&self) -> usize {
        self.results
            .iter()
            .flatten()
            .map(|r| r.source_byte_size)
            .sum()
    }

    pub fn total_output_bytes(&self) -> usize {
        self.results
            .iter()
            .flatten()
            .map(|r| r.output_byte_size)
            .sum()
    }
}

fn run_item(
    transcoder: &Transcoder,
    job: &BatchJob<'_>,
    index: usize,
    request: &ConversionRequest<'_>,
) -> Outcome {
    if job.cancel.is_cancelled() {
        return (ItemStatus::Pending, Err(ConversionError::Cancelled));
    }
    job.notify(index, ItemStatus::InProgress);

    let result = transcoder.convert_one(request.source.bytes(), request.target_format, request.quality);
    let status = match &result {
        Ok(_) => ItemStatus::Completed,
        Err(e) => {
            log::debug!("batch item {index} failed: {e}");
            ItemStatus::Failed
        }
    };
    job.notify(index, status);
    (status, result)
}

pub(crate) fn run(transcoder: &Transcoder, job: &BatchJob<'_>) -> BatchReport {
    let requests = job.requests;
    let workers = job.worker_count();
    log::debug!("batch: {} requests on {workers} workers", requests.len());

    let convert_all = || -> Vec<Outcome> {
        requests
            .par_iter()
            .enumerate()
            .map(|(index, request)| run_item(transcoder, job, index, request))
            .collect()
    };

    let outcomes: Vec<Outcome> = match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("transcode-{i}"))
        .build()
    {
        Ok(pool) => pool.install(convert_all),
        Err(e) => {
            log::warn!("failed to build worker pool ({e}), converting sequentially");
            requests
                .iter()
                .enumerate()
                .map(|(index, request)| run_item(transcoder, job, index, request))
                .collect()
        }
    };

    let (statuses, results): (Vec<_>, Vec<_>) = outcomes.into_iter().unzip();
    let report = BatchReport { results, statuses };

    let cancelled = report.cancelled_count();
    if cancelled > 0 {
        log::warn!("batch cancelled: {cancelled} of {} items not started", requests.len());
    }
    log::debug!(
        "batch done: {} ok, {} failed",
        report.success_count(),
        report.failure_count()
    );
    report
}
