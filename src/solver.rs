//! Solver seam
//!
//! The numeric solver lives outside this crate. It is built from a definition
//! string and turns slider activations into shape weights. Inputs are ordered
//! like the system's slider list, outputs like its shape list.

use crate::error::Result;

pub trait Solver: Sized {
    /// Build a solver from a serialized definition of any supported version.
    fn from_definition(definition: &str) -> Result<Self>;

    /// Shape weights for one slider-space input vector.
    fn solve(&self, inputs: &[f64]) -> Vec<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::Simplex;
    use serde_json::Value;

    /// Lights up the first non-rest shape of every fully active slider.
    struct FirstShapeSolver {
        shape_count: usize,
        slider_shapes: Vec<usize>,
    }

    impl Solver for FirstShapeSolver {
        fn from_definition(definition: &str) -> Result<Self> {
            let doc: Value = serde_json::from_str(definition)?;
            let progs = doc["progressions"].as_array().cloned().unwrap_or_default();
            let slider_shapes = doc["sliders"]
                .as_array()
                .cloned()
                .unwrap_or_default()
                .iter()
                .map(|s| {
                    let prog = s["prog"].as_u64().unwrap_or(0) as usize;
                    progs[prog]["pairs"][1][0].as_u64().unwrap_or(0) as usize
                })
                .collect();
            Ok(Self {
                shape_count: doc["shapes"].as_array().map_or(0, |s| s.len()),
                slider_shapes,
            })
        }

        fn solve(&self, inputs: &[f64]) -> Vec<f64> {
            let mut out = vec![0.0; self.shape_count];
            for (&shape, &value) in self.slider_shapes.iter().zip(inputs) {
                if value == 1.0 {
                    out[shape] = 1.0;
                }
            }
            out
        }
    }

    #[test]
    fn test_evaluate_inputs_orders_by_shape_list() {
        let mut sx = Simplex::in_memory("Face").unwrap();
        sx.create_slider("A", None, None, 1.0).unwrap();
        sx.create_slider("B", None, None, 1.0).unwrap();

        let outputs = sx
            .evaluate_inputs::<FirstShapeSolver>(&[vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap();

        assert_eq!(outputs, vec![vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]]);
    }

    #[test]
    fn test_bad_definition_is_reported() {
        let err = FirstShapeSolver::from_definition("{not json").err().unwrap();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }
}
