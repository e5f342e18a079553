// src/error.rs
//! Error handling for the whole crate.
//!
//! - Decoder, filesystem and config failures all funnel into `HiresError`.
//! - Nothing here crosses the `search` boundary: lookups log and fall back to the native texture.

use thiserror::Error;

/// Main error type. Send + Sync + 'static so it can leave the prefetch thread.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HiresError {
    /// I/O errors (file reads, missing files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic raster decode failures.
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    /// DDS container parse failures.
    #[error("DDS error: {0}")]
    Dds(#[from] ddsfile::Error),

    /// Directory walk failures.
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Config file (de)serialization.
    #[error("config error: {0}")]
    Json(#[from] serde_json::Error),

    /// DDS pixel format with no matching level format.
    #[error("unsupported DDS pixel format: {0}")]
    UnsupportedFormat(String),

    /// File extension that is not a structured container.
    #[error("not a DDS container: {0}")]
    NotAContainer(String),

    /// Decoder produced no pixels.
    #[error("decoded image has no pixel data")]
    EmptyImage,

    /// DDS surface data ends before the declared level.
    #[error("DDS data truncated at mip level {level}: need {needed} bytes, have {available}")]
    Truncated {
        level: u32,
        needed: usize,
        available: usize,
    },

    /// Context chaining.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        #[source]
        source: Box<HiresError>,
    },
}

impl HiresError {
    /// Add context to any error (chainable, like `.context()` in anyhow).
    #[inline]
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    /// True for filesystem failures, including ones hit while walking a directory tree.
    pub fn is_io(&self) -> bool {
        match self {
            HiresError::Io(_) => true,
            HiresError::Walk(err) => err.io_error().is_some(),
            HiresError::WithContext { source, .. } => source.is_io(),
            _ => false,
        }
    }

    /// True for failures of either decode path.
    #[inline]
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            HiresError::Image(_)
                | HiresError::Dds(_)
                | HiresError::UnsupportedFormat(_)
                | HiresError::EmptyImage
                | HiresError::Truncated { .. }
        )
    }
}

/// Convenient `Result` alias. Use `crate::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, HiresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wraps_source_message() {
        let err = HiresError::EmptyImage.context("tex1_4x4_00_0.png");
        assert_eq!(err.to_string(), "tex1_4x4_00_0.png: decoded image has no pixel data");
        assert!(!err.is_decode());
    }

    #[test]
    fn kind_checks() {
        let io = HiresError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.is_io());
        assert!(HiresError::EmptyImage.is_decode());
        assert!(HiresError::Truncated {
            level: 1,
            needed: 8,
            available: 0
        }
        .is_decode());
    }

    #[test]
    fn walk_failures_convert_and_count_as_io() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("missing");
        let walk_err = walkdir::WalkDir::new(&missing).into_iter().next().unwrap().unwrap_err();

        let err = HiresError::from(walk_err).context(format!("scanning {}", missing.display()));
        assert!(err.is_io());
        assert!(!err.is_decode());
        assert!(err.to_string().starts_with("scanning "), "{}", err);
    }
}
