// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw image bytes to tensor batches:
//
//   CIFAR-10 archive  ─┐
//                      ├─► ImageDataset (InMemDataset<ImageItem>)
//   synthetic::generate┘          │
//                                 ▼
//                         DatasetProvider  (train / test splits)
//                                 │
//                                 ▼
//                 DataLoader + ImageBatcher → ImageBatch<B>
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// ImageItem, dataset constants and DatasetError
pub mod dataset;

/// Download, cache and parse the CIFAR-10 binary archive
pub mod cifar10;

/// Seeded class-separable images for offline runs and tests
pub mod synthetic;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Train/test splits and loader construction
pub mod provider;
