//! Resource limits and cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::DecodeError;

/// Bytes per decoded RGBA8 pixel.
const RGBA8_BYTES: u64 = 4;

/// Resource limits for decode operations.
///
/// Checked against header-declared dimensions before any decoder allocates
/// pixel memory. `None` disables a limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Limits {
    /// Maximum image width in pixels.
    pub max_width: Option<u64>,
    /// Maximum image height in pixels.
    pub max_height: Option<u64>,
    /// Maximum total pixels (width × height).
    pub max_pixels: Option<u64>,
    /// Maximum decoded buffer size in bytes.
    pub max_memory_bytes: Option<u64>,
}

impl Default for Limits {
    /// 32768 px per side, 256 megapixels, 1 GiB of decoded RGBA8.
    fn default() -> Self {
        Self {
            max_width: Some(32_768),
            max_height: Some(32_768),
            max_pixels: Some(256 * 1024 * 1024),
            max_memory_bytes: Some(1024 * 1024 * 1024),
        }
    }
}

impl Limits {
    /// Create a new Limits with no restrictions.
    pub fn none() -> Self {
        Self {
            max_width: None,
            max_height: None,
            max_pixels: None,
            max_memory_bytes: None,
        }
    }

    pub fn with_max_width(mut self, max: u64) -> Self {
        self.max_width = Some(max);
        self
    }

    pub fn with_max_height(mut self, max: u64) -> Self {
        self.max_height = Some(max);
        self
    }

    pub fn with_max_pixels(mut self, max: u64) -> Self {
        self.max_pixels = Some(max);
        self
    }

    pub fn with_max_memory_bytes(mut self, max: u64) -> Self {
        self.max_memory_bytes = Some(max);
        self
    }

    /// Check if dimensions are within limits.
    ///
    /// Returns `Err` with a description if any limit is exceeded.
    pub fn check_dimensions(&self, width: u64, height: u64) -> Result<(), &'static str> {
        if let Some(max_width) = self.max_width {
            if width > max_width {
                return Err("width exceeds limit");
            }
        }

        if let Some(max_height) = self.max_height {
            if height > max_height {
                return Err("height exceeds limit");
            }
        }

        if let Some(max_pixels) = self.max_pixels {
            let pixels = width.saturating_mul(height);
            if pixels > max_pixels {
                return Err("pixel count exceeds limit");
            }
        }

        Ok(())
    }

    /// Check if a memory allocation is within limits.
    pub fn check_memory(&self, bytes: u64) -> Result<(), &'static str> {
        if let Some(max_memory) = self.max_memory_bytes {
            if bytes > max_memory {
                return Err("memory allocation exceeds limit");
            }
        }
        Ok(())
    }

    /// Validate a decode target of `width`×`height` RGBA8 pixels.
    pub fn check_decode(&self, width: u64, height: u64) -> Result<(), DecodeError> {
        let bytes = width.saturating_mul(height).saturating_mul(RGBA8_BYTES);
        self.check_dimensions(width, height)
            .and_then(|()| self.check_memory(bytes))
            .map_err(|reason| DecodeError::DimensionsExceedLimit {
                width,
                height,
                reason,
            })
    }
}

/// Shared cancellation flag for a batch.
///
/// Clones observe the same flag. Cancelling is sticky.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Items already in progress run to completion.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_none() {
        let limits = Limits::none();
        assert!(limits.check_dimensions(u64::MAX, u64::MAX).is_ok());
        assert!(limits.check_memory(u64::MAX).is_ok());
        assert!(limits.check_decode(u64::MAX, u64::MAX).is_ok());
    }

    #[test]
    fn limits_dimensions() {
        let limits = Limits {
            max_width: Some(1000),
            max_height: Some(1000),
            max_pixels: Some(500_000),
            max_memory_bytes: None,
        };

        assert!(limits.check_dimensions(1000, 1000).is_err()); // 1M pixels > 500k
        assert!(limits.check_dimensions(500, 500).is_ok()); // 250k pixels
        assert!(limits.check_dimensions(2000, 500).is_err()); // width > 1000
    }

    #[test]
    fn limits_memory() {
        let limits = Limits::none().with_max_memory_bytes(1_000_000);

        assert!(limits.check_memory(500_000).is_ok());
        assert!(limits.check_memory(2_000_000).is_err());
        // 500x500 RGBA8 = 1_000_000 bytes, exactly at the limit
        assert!(limits.check_decode(500, 500).is_ok());
        assert!(limits.check_decode(501, 500).is_err());
    }

    #[test]
    fn default_rejects_huge_header() {
        let err = Limits::default().check_decode(100_000, 100_000).unwrap_err();
        match err {
            DecodeError::DimensionsExceedLimit { width, height, reason } => {
                assert_eq!((width, height), (100_000, 100_000));
                assert_eq!(reason, "width exceeds limit");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
