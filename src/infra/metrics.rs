// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends every training progress checkpoint to a CSV file so
// the loss curve of a run can be plotted afterwards.
//
// Output file: <checkpoint dir>/metrics.csv
//
// Example CSV output:
//   epoch,batch,mean_loss
//   1,2000,2.187341
//   1,4000,1.853120
//   ...
//
// The header is written once; later runs append below it.
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Mean loss over one logging window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressMetrics {
    /// 1-based epoch number
    pub epoch: usize,

    /// 1-based index of the last batch in the window
    pub batch: usize,

    /// Mean cross-entropy loss over the window
    pub mean_loss: f64,
}

impl ProgressMetrics {
    pub fn new(epoch: usize, batch: usize, mean_loss: f64) -> Self {
        Self { epoch, batch, mean_loss }
    }
}

/// Appends progress rows to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create a logger writing to `<dir>/metrics.csv`.
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,batch,mean_loss")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one row.
    pub fn log(&self, m: &ProgressMetrics) -> io::Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(f, "{},{},{:.6}", m.epoch, m.batch, m.mean_loss)?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_then_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();

        logger.log(&ProgressMetrics::new(1, 2000, 2.25)).unwrap();
        logger.log(&ProgressMetrics::new(2, 2000, 1.5)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text, "epoch,batch,mean_loss\n1,2000,2.250000\n2,2000,1.500000\n");
    }

    #[test]
    fn test_reopening_appends_without_second_header() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::new(dir.path()).unwrap()
            .log(&ProgressMetrics::new(1, 10, 1.0)).unwrap();
        MetricsLogger::new(dir.path()).unwrap()
            .log(&ProgressMetrics::new(1, 10, 0.5)).unwrap();

        let text = fs::read_to_string(dir.path().join("metrics.csv")).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.matches("epoch,batch").count(), 1);
    }
}
