//! Client-state files: one serialized head snapshot per client.
//!
//! Tensors are stored as named f32 entries in the safetensors format. The
//! file is read at the start of `train`/`test` when it exists and rewritten
//! unconditionally at the end of `train`; it is never deleted within a run.

use std::fs;
use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;

use crate::error::{FedRepError, Result};

/// Writes a named tensor state to `path`, replacing any previous snapshot.
pub fn save_state_dict(path: &Path, state: &[(String, ArrayD<f32>)]) -> Result<()> {
    let owned: Vec<_> = state
        .iter()
        .map(|(_, value)| value.as_standard_layout())
        .collect();

    let mut tensors = Vec::with_capacity(state.len());
    for ((key, value), buffer) in state.iter().zip(&owned) {
        let data: &[u8] = bytemuck::cast_slice(buffer.as_slice().unwrap());
        tensors.push((
            key.as_str(),
            TensorView::new(Dtype::F32, value.shape().to_vec(), data)?,
        ));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    safetensors::serialize_to_file(tensors, &None, path)?;
    Ok(())
}

/// Reads a named tensor state previously written by [`save_state_dict`].
pub fn load_state_dict(path: &Path) -> Result<Vec<(String, ArrayD<f32>)>> {
    let bytes = fs::read(path)?;
    let tensors = SafeTensors::deserialize(&bytes)?;

    let mut state = Vec::with_capacity(tensors.len());
    for (key, view) in tensors.tensors() {
        if view.dtype() != Dtype::F32 {
            return Err(FedRepError::StateTensor {
                key,
                detail: "expected f32 data",
            });
        }

        let data: Vec<f32> = bytemuck::pod_collect_to_vec(view.data());
        let value = ArrayD::from_shape_vec(IxDyn(view.shape()), data).map_err(|_| {
            FedRepError::StateTensor {
                key: key.clone(),
                detail: "element count disagrees with shape",
            }
        })?;
        state.push((key, value));
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fedrep-state-{}-{name}", std::process::id()))
    }

    #[test]
    fn state_round_trips_bit_identically() {
        let path = scratch_path("roundtrip.safetensors");
        let state = vec![
            ("0.weight".to_string(), array![[1.0f32, -2.0], [0.5, 3.25]].into_dyn()),
            ("0.bias".to_string(), array![0.0f32, -1.5].into_dyn()),
        ];

        save_state_dict(&path, &state).unwrap();
        let mut loaded = load_state_dict(&path).unwrap();
        loaded.sort_by(|a, b| a.0.cmp(&b.0));

        let mut expected = state.clone();
        expected.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(loaded, expected);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn overwriting_replaces_the_previous_snapshot() {
        let path = scratch_path("overwrite.safetensors");
        let first = vec![("0.bias".to_string(), array![1.0f32].into_dyn())];
        let second = vec![("0.bias".to_string(), array![2.0f32].into_dyn())];

        save_state_dict(&path, &first).unwrap();
        save_state_dict(&path, &second).unwrap();

        assert_eq!(load_state_dict(&path).unwrap(), second);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn loading_a_missing_file_is_an_io_error() {
        let res = load_state_dict(Path::new("/nonexistent/fedrep-state.safetensors"));
        assert!(matches!(res, Err(FedRepError::Io(_))));
    }
}
