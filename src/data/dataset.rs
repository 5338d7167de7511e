// ============================================================
// Layer 4 — Image Items and Dataset Errors
// ============================================================
// The sample type shared by every image source, the CIFAR-10
// geometry constants, and the errors raised while acquiring
// or parsing data.
//
// Reference: Burn Book §4 (Datasets)

use std::path::PathBuf;

use burn::data::dataset::InMemDataset;
use thiserror::Error;

/// Height and width of every image
pub const IMAGE_SIDE: usize = 32;
pub const CHANNELS: usize = 3;
/// Bytes in one channel-major image: 3 × 32 × 32
pub const IMAGE_BYTES: usize = CHANNELS * IMAGE_SIDE * IMAGE_SIDE;
pub const NUM_CLASSES: usize = 10;

/// One labelled image. Pixels are channel-major: all red values,
/// then all green, then all blue, each plane row by row.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageItem {
    pub pixels: Vec<u8>,
    pub label:  u8,
}

impl ImageItem {
    pub fn new(pixels: Vec<u8>, label: u8) -> Self {
        debug_assert_eq!(pixels.len(), IMAGE_BYTES);
        Self { pixels, label }
    }
}

/// Both CIFAR-10 and the synthetic set are small enough to keep in memory.
pub type ImageDataset = InMemDataset<ImageItem>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("io error at {}: {source}", .path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to download {url}: {source}")]
    Download {
        url:    String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{} is corrupt: {len} bytes is not a whole number of {record}-byte records", .path.display())]
    CorruptRecord {
        path:   PathBuf,
        len:    usize,
        record: usize,
    },

    #[error("{}: record {index} has label {label}, expected a class below 10", .path.display())]
    InvalidLabel {
        path:  PathBuf,
        index: usize,
        label: u8,
    },
}
