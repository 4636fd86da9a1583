use ndarray::ArrayD;

use crate::error::{Result, SimError};

/// Sample-weighted mean over client body updates.
///
/// Only the body participates: heads are personalized and never leave their
/// client. Weights are the clients' train example counts.
///
/// # Arguments
/// * `updates` - One `(body tensors, weight)` pair per participating client.
///
/// # Returns
/// The aggregated body, or an error on an empty round, zero total weight, or
/// structurally incompatible updates.
pub fn aggregate_body(updates: &[(Vec<ArrayD<f32>>, usize)]) -> Result<Vec<ArrayD<f32>>> {
    let Some(((first, _), rest)) = updates.split_first() else {
        return Err(SimError::Aggregation {
            detail: "no client updates",
        });
    };

    for (body, _) in rest {
        if body.len() != first.len() {
            return Err(SimError::Aggregation {
                detail: "clients disagree on body tensor count",
            });
        }
        for (theirs, ours) in body.iter().zip(first) {
            if theirs.shape() != ours.shape() {
                return Err(SimError::Aggregation {
                    detail: "clients disagree on a body tensor shape",
                });
            }
        }
    }

    let total_weight: usize = updates.iter().map(|(_, w)| w).sum();
    if total_weight == 0 {
        return Err(SimError::Aggregation {
            detail: "total aggregation weight is zero",
        });
    }

    let mut aggregated: Vec<ArrayD<f32>> =
        first.iter().map(|t| ArrayD::zeros(t.raw_dim())).collect();

    for (body, weight) in updates {
        let weight = *weight as f32;
        for (acc, tensor) in aggregated.iter_mut().zip(body) {
            acc.zip_mut_with(tensor, |a, &t| *a += t * weight);
        }
    }

    let total = total_weight as f32;
    for acc in &mut aggregated {
        acc.mapv_inplace(|v| v / total);
    }

    Ok(aggregated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn body(value: f32) -> Vec<ArrayD<f32>> {
        vec![array![[value, value]].into_dyn(), array![value].into_dyn()]
    }

    #[test]
    fn unweighted_clients_average_evenly() {
        let updates = vec![(body(1.0), 1), (body(3.0), 1)];
        let agg = aggregate_body(&updates).unwrap();
        assert_eq!(agg[0], array![[2.0, 2.0]].into_dyn());
        assert_eq!(agg[1], array![2.0].into_dyn());
    }

    #[test]
    fn larger_clients_pull_the_mean() {
        let updates = vec![(body(1.0), 1), (body(5.0), 3)];
        let agg = aggregate_body(&updates).unwrap();
        // (1*1 + 5*3) / 4 = 4.0
        assert_eq!(agg[1], array![4.0].into_dyn());
    }

    #[test]
    fn empty_round_is_rejected() {
        assert!(matches!(
            aggregate_body(&[]),
            Err(SimError::Aggregation { .. })
        ));
    }

    #[test]
    fn zero_total_weight_is_rejected() {
        let updates = vec![(body(1.0), 0)];
        assert!(matches!(
            aggregate_body(&updates),
            Err(SimError::Aggregation { .. })
        ));
    }

    #[test]
    fn shape_disagreement_is_rejected() {
        let updates = vec![
            (vec![array![[1.0]].into_dyn()], 1),
            (vec![array![[1.0, 2.0]].into_dyn()], 1),
        ];
        assert!(matches!(
            aggregate_body(&updates),
            Err(SimError::Aggregation { .. })
        ));
    }
}
