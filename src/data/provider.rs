// ============================================================
// Layer 4 — Dataset Provider
// ============================================================
// Owns the train and test splits for one run and hands out
// Burn DataLoaders over them:
//
//   provider.batches::<B>(Split::Train, 4, Some(seed), 2)  → shuffled
//   provider.batches::<B>(Split::Test,  4, None,       2)  → fixed order
//
// A shuffled loader draws a new permutation every time it is
// iterated, so each epoch sees the training set in a new order.
//
// Reference: Burn Book §4 (DataLoaderBuilder)

use std::{fmt, path::Path, sync::Arc};

use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    prelude::*,
};

use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    cifar10::Cifar10,
    dataset::{DatasetError, ImageItem},
    synthetic,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Test  => write!(f, "test"),
        }
    }
}

/// The two splits of one labelled image dataset.
#[derive(Clone)]
pub struct DatasetProvider {
    train: Arc<dyn Dataset<ImageItem>>,
    test:  Arc<dyn Dataset<ImageItem>>,
}

impl DatasetProvider {
    pub fn new(
        train: impl Dataset<ImageItem> + 'static,
        test:  impl Dataset<ImageItem> + 'static,
    ) -> Self {
        Self {
            train: Arc::new(train),
            test:  Arc::new(test),
        }
    }

    /// CIFAR-10 cached under `data_dir` (downloaded on first use)
    pub fn cifar10(data_dir: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let cifar = Cifar10::new(data_dir)?;
        Ok(Self::new(cifar.train()?, cifar.test()?))
    }

    /// Seeded synthetic images; train and test use different seeds
    pub fn synthetic(train_len: usize, test_len: usize, seed: u64) -> Self {
        Self::new(
            synthetic::generate(train_len, seed),
            synthetic::generate(test_len, seed.wrapping_add(1)),
        )
    }

    /// Number of examples in a split
    pub fn len(&self, split: Split) -> usize {
        self.split(split).len()
    }

    /// Build a loader over one split.
    ///
    /// `shuffle = None` keeps dataset order: batches are built on the
    /// calling thread and only the last one may be partial.
    /// `num_workers` is ignored in that case.
    ///
    /// `shuffle = Some(seed)` reshuffles on every iteration and, with
    /// `num_workers > 0`, splits each epoch across worker threads.
    /// Every item is still visited exactly once per epoch, but each
    /// worker ends its share with its own partial batch and batches
    /// arrive in completion order.
    pub fn batches<B: Backend>(
        &self,
        split:       Split,
        batch_size:  usize,
        shuffle:     Option<u64>,
        num_workers: usize,
    ) -> Arc<dyn DataLoader<B, ImageBatch<B>>> {
        let mut builder = DataLoaderBuilder::new(ImageBatcher::new()).batch_size(batch_size);
        let mut workers = 0;
        if let Some(seed) = shuffle {
            builder = builder.shuffle(seed);
            if num_workers > 0 {
                builder = builder.num_workers(num_workers);
                workers = num_workers;
            }
        }

        tracing::debug!(
            "Loader over {} split: {} items, batch_size={}, shuffle={:?}, workers={}",
            split,
            self.len(split),
            batch_size,
            shuffle,
            workers,
        );
        builder.build(self.split(split))
    }

    fn split(&self, split: Split) -> Arc<dyn Dataset<ImageItem>> {
        match split {
            Split::Train => self.train.clone(),
            Split::Test  => self.test.clone(),
        }
    }
}
