// ============================================================
// Layer 4 — CIFAR-10 Loader
// ============================================================
// Downloads the CIFAR-10 binary distribution once, caches it
// under the data directory, and parses the fixed-width records.
//
// Archive layout after extraction:
//   <data_dir>/cifar-10-batches-bin/
//     data_batch_1.bin … data_batch_5.bin   ← 50 000 train images
//     test_batch.bin                        ← 10 000 test images
//
// Record layout (3073 bytes):
//   [label: u8][red plane: 1024][green plane: 1024][blue plane: 1024]
//
// Reference: https://www.cs.toronto.edu/~kriz/cifar.html
//            Burn Book §4 (Datasets)

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use burn::data::dataset::InMemDataset;
use flate2::read::GzDecoder;
use tar::Archive;

use crate::data::dataset::{DatasetError, ImageDataset, ImageItem, IMAGE_BYTES, NUM_CLASSES};

const URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";
const ARCHIVE_DIR: &str = "cifar-10-batches-bin";
const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILE: &str = "test_batch.bin";
const RECORD_BYTES: usize = 1 + IMAGE_BYTES;

/// Human-readable class names, indexed by label
pub const CLASSES: [&str; NUM_CLASSES] = [
    "plane", "car", "bird", "cat", "deer", "dog", "frog", "horse", "ship", "truck",
];

/// Only one thread downloads and unpacks the archive at a time.
static DOWNLOAD_LOCK: Mutex<()> = Mutex::new(());

/// Accessor for a local (downloaded on demand) copy of CIFAR-10.
pub struct Cifar10 {
    root: PathBuf,
}

impl Cifar10 {
    /// Make sure the dataset exists under `data_dir`, downloading
    /// and extracting it on first use.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let root = download(data_dir.as_ref())?;
        Ok(Self { root })
    }

    /// The five training batches concatenated (50 000 images)
    pub fn train(&self) -> Result<ImageDataset, DatasetError> {
        let mut items = Vec::new();
        for file in TRAIN_FILES {
            items.extend(read_batch_file(&self.root.join(file))?);
        }
        tracing::info!("Loaded {} CIFAR-10 training images", items.len());
        Ok(InMemDataset::new(items))
    }

    /// The test batch (10 000 images)
    pub fn test(&self) -> Result<ImageDataset, DatasetError> {
        let items = read_batch_file(&self.root.join(TEST_FILE))?;
        tracing::info!("Loaded {} CIFAR-10 test images", items.len());
        Ok(InMemDataset::new(items))
    }
}

/// Download and unpack the archive unless the batch directory
/// already exists. Returns the batch directory.
fn download(data_dir: &Path) -> Result<PathBuf, DatasetError> {
    // A poisoned lock only means another download panicked; the
    // directory check below still decides what to do.
    let _lock = DOWNLOAD_LOCK.lock().unwrap_or_else(|e| e.into_inner());

    let root = data_dir.join(ARCHIVE_DIR);
    if root.exists() {
        tracing::debug!("Using cached CIFAR-10 at '{}'", root.display());
        return Ok(root);
    }

    fs::create_dir_all(data_dir).map_err(|source| DatasetError::Io {
        path: data_dir.to_path_buf(),
        source,
    })?;

    tracing::info!("Downloading CIFAR-10 from {URL}");
    let download_err = |source: reqwest::Error| DatasetError::Download { url: URL.to_string(), source };

    // The archive is ~160 MB; the blocking client's default 30 s limit is too short
    let client = reqwest::blocking::Client::builder()
        .timeout(None)
        .build()
        .map_err(download_err)?;
    let bytes = client
        .get(URL)
        .send()
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .map_err(download_err)?;

    tracing::info!("Extracting {} bytes into '{}'", bytes.len(), data_dir.display());
    Archive::new(GzDecoder::new(&bytes[..]))
        .unpack(data_dir)
        .map_err(|source| DatasetError::Io { path: data_dir.to_path_buf(), source })?;

    Ok(root)
}

fn read_batch_file(path: &Path) -> Result<Vec<ImageItem>, DatasetError> {
    let bytes = fs::read(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&bytes, path)
}

/// Split a CIFAR-10 binary batch into labelled images.
///
/// `source` is only used in error messages.
pub fn parse_records(bytes: &[u8], source: &Path) -> Result<Vec<ImageItem>, DatasetError> {
    if bytes.len() % RECORD_BYTES != 0 {
        return Err(DatasetError::CorruptRecord {
            path:   source.to_path_buf(),
            len:    bytes.len(),
            record: RECORD_BYTES,
        });
    }

    bytes
        .chunks_exact(RECORD_BYTES)
        .enumerate()
        .map(|(index, record)| {
            let label = record[0];
            if label as usize >= NUM_CLASSES {
                return Err(DatasetError::InvalidLabel {
                    path: source.to_path_buf(),
                    index,
                    label,
                });
            }
            Ok(ImageItem::new(record[1..].to_vec(), label))
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::Dataset;

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut r = vec![label];
        r.extend(std::iter::repeat(fill).take(IMAGE_BYTES));
        r
    }

    #[test]
    fn test_parse_two_records() {
        let mut bytes = record(3, 10);
        bytes.extend(record(9, 200));

        let items = parse_records(&bytes, Path::new("mem")).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, 3);
        assert_eq!(items[1].label, 9);
        assert!(items[0].pixels.iter().all(|&p| p == 10));
        assert_eq!(items[1].pixels.len(), IMAGE_BYTES);
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let mut bytes = record(1, 0);
        bytes.pop();
        let err = parse_records(&bytes, Path::new("short.bin")).unwrap_err();
        assert!(matches!(err, DatasetError::CorruptRecord { len, .. } if len == RECORD_BYTES - 1));
    }

    #[test]
    fn test_out_of_range_label_is_rejected() {
        let mut bytes = record(0, 0);
        bytes.extend(record(10, 0));
        let err = parse_records(&bytes, Path::new("bad.bin")).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidLabel { index: 1, label: 10, .. }));
    }

    #[test]
    fn test_cached_directory_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join(ARCHIVE_DIR);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(TEST_FILE), record(7, 42)).unwrap();

        let cifar = Cifar10::new(dir.path()).unwrap();
        let test  = cifar.test().unwrap();

        assert_eq!(test.len(), 1);
        assert_eq!(test.get(0).unwrap().label, 7);
    }
}
