use ndarray::{Array2, ArrayView1, ArrayView2};

/// Softmax cross-entropy over logits, averaged across the batch.
#[derive(Default, Clone, Copy)]
pub struct CrossEntropy;

impl CrossEntropy {
    /// Returns a new `CrossEntropy`.
    pub fn new() -> Self {
        Self
    }

    /// Mean negative log-likelihood of the labeled classes.
    ///
    /// Computed via log-sum-exp with max subtraction so large logits do not
    /// overflow.
    ///
    /// # Arguments
    /// * `logits` - Raw model outputs of shape `(batch, classes)`.
    /// * `labels` - One class index per row.
    pub fn loss(&self, logits: ArrayView2<f32>, labels: &[usize]) -> f32 {
        let mut total = 0.0;
        for (row, &label) in logits.outer_iter().zip(labels) {
            let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let log_sum_exp = max + row.mapv(|v| (v - max).exp()).sum().ln();
            total += log_sum_exp - row[label];
        }
        total / labels.len() as f32
    }

    /// Gradient of the mean loss with respect to the logits:
    /// `(softmax - onehot) / batch`.
    pub fn delta(&self, logits: ArrayView2<f32>, labels: &[usize]) -> Array2<f32> {
        let batch = logits.nrows() as f32;
        let mut delta = softmax(logits);
        for (i, &label) in labels.iter().enumerate() {
            delta[[i, label]] -= 1.0;
        }
        delta.mapv_into(|v| v / batch)
    }
}

/// Number of rows whose argmax matches the label.
pub fn num_correct(logits: ArrayView2<f32>, labels: &[usize]) -> usize {
    logits
        .outer_iter()
        .zip(labels)
        .filter(|&(ref row, &label)| argmax(row.view()) == label)
        .count()
}

fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = (0, f32::NEG_INFINITY);
    for (i, &v) in row.iter().enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }
    best.0
}

fn softmax(logits: ArrayView2<f32>) -> Array2<f32> {
    let mut out = logits.to_owned();
    for mut row in out.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    out
}
