use ndarray::{Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::dataset::InMemoryDataset;

/// One owned minibatch of samples.
#[derive(Debug, Clone)]
pub struct Batch {
    pub features: Array2<f32>,
    pub labels: Vec<usize>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Minibatch iterator over an in-memory dataset.
///
/// Iteration order is deterministic given the construction seed: shuffling
/// draws from an owned `StdRng`, so two loaders built with the same seed walk
/// their epochs identically.
#[derive(Debug, Clone)]
pub struct DataLoader {
    dataset: InMemoryDataset,
    batch_size: usize,
    shuffle: bool,
    rng: StdRng,
}

impl DataLoader {
    /// Creates a new loader.
    ///
    /// # Arguments
    /// * `dataset` - The backing dataset.
    /// * `batch_size` - Samples per minibatch; the final batch may be smaller.
    /// * `shuffle` - Whether to permute sample order every epoch.
    /// * `seed` - Seed for the shuffling generator.
    ///
    /// # Panics
    /// If `batch_size` is zero.
    pub fn new(dataset: InMemoryDataset, batch_size: usize, shuffle: bool, seed: u64) -> Self {
        assert!(batch_size > 0, "batch_size must be > 0");
        Self {
            dataset,
            batch_size,
            shuffle,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Total example count of the backing dataset.
    #[inline]
    pub fn dataset_size(&self) -> usize {
        self.dataset.len()
    }

    #[inline]
    pub fn dataset(&self) -> &InMemoryDataset {
        &self.dataset
    }

    /// Starts one pass over the dataset, advancing the shuffling generator.
    pub fn epoch(&mut self) -> Epoch<'_> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            indices.shuffle(&mut self.rng);
        }

        Epoch {
            dataset: &self.dataset,
            indices,
            batch_size: self.batch_size,
            cursor: 0,
        }
    }
}

/// Iterator yielding the minibatches of a single epoch.
pub struct Epoch<'a> {
    dataset: &'a InMemoryDataset,
    indices: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Epoch<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.indices.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.indices.len());
        let picked = &self.indices[self.cursor..end];
        self.cursor = end;

        Some(Batch {
            features: self.dataset.features().select(Axis(0), picked),
            labels: picked.iter().map(|&i| self.dataset.labels()[i]).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn dataset() -> InMemoryDataset {
        InMemoryDataset::new(
            array![[0.0], [1.0], [2.0], [3.0], [4.0]],
            vec![0, 1, 2, 3, 4],
        )
    }

    #[test]
    fn unshuffled_epoch_respects_batch_size_and_order() {
        let mut loader = DataLoader::new(dataset(), 2, false, 0);

        let batches: Vec<Batch> = loader.epoch().collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].labels, [0, 1]);
        assert_eq!(batches[1].labels, [2, 3]);
        assert_eq!(batches[2].labels, [4]);
        assert_eq!(batches[2].features, array![[4.0]]);
    }

    #[test]
    fn shuffled_epoch_is_a_permutation() {
        let mut loader = DataLoader::new(dataset(), 2, true, 42);
        let mut labels: Vec<usize> = loader.epoch().flat_map(|b| b.labels).collect();
        labels.sort_unstable();
        assert_eq!(labels, [0, 1, 2, 3, 4]);
    }

    #[test]
    fn same_seed_walks_identical_epochs() {
        let mut a = DataLoader::new(dataset(), 2, true, 7);
        let mut b = DataLoader::new(dataset(), 2, true, 7);
        for _ in 0..3 {
            let la: Vec<usize> = a.epoch().flat_map(|batch| batch.labels).collect();
            let lb: Vec<usize> = b.epoch().flat_map(|batch| batch.labels).collect();
            assert_eq!(la, lb);
        }
    }

    #[test]
    fn empty_dataset_yields_no_batches() {
        let mut loader = DataLoader::new(
            InMemoryDataset::new(Array2::zeros((0, 1)), Vec::new()),
            4,
            false,
            0,
        );
        assert!(loader.epoch().next().is_none());
    }
}
