use ndarray::{Array2, ArrayView2};

/// A minimal in-memory classification dataset.
///
/// Rows of `features` are samples; `labels` holds one class index per row.
/// Deliberately allowed to be empty so that managers can surface an explicit
/// empty-dataset error instead of dividing by zero in metric computation.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    features: Array2<f32>,
    labels: Vec<usize>,
}

impl InMemoryDataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Panics
    /// If the number of feature rows and labels disagree.
    pub fn new(features: Array2<f32>, labels: Vec<usize>) -> Self {
        assert_eq!(
            features.nrows(),
            labels.len(),
            "features and labels must have the same length"
        );
        Self { features, labels }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    #[inline]
    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    #[inline]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn dataset_basic() {
        let ds = InMemoryDataset::new(array![[1.0, 2.0], [3.0, 4.0]], vec![0, 1]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.num_features(), 2);
        assert_eq!(ds.labels(), &[0, 1]);
    }

    #[test]
    fn empty_dataset_is_allowed() {
        let ds = InMemoryDataset::new(Array2::zeros((0, 3)), Vec::new());
        assert!(ds.is_empty());
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn mismatched_lengths_panic() {
        InMemoryDataset::new(array![[1.0], [2.0]], vec![0]);
    }
}
