//! ONNX inference using tract
//!
//! Runs regression models exported to ONNX (e.g. from scikit-learn via
//! skl2onnx) without a native runtime dependency.

use super::Regressor;
use crate::models::FEATURE_COUNT;
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX regressor with a fixed `f32[1, FEATURE_COUNT]` input
pub struct OnnxRegressor {
    model: TractModel,
}

impl OnnxRegressor {
    /// Parse and optimize an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self> {
        let proto = tract_onnx::onnx()
            .proto_model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to decode ONNX protobuf")?;
        Self::from_proto(&proto)
    }

    /// Optimize an already decoded ONNX model
    pub fn from_proto(proto: &tract_onnx::pb::ModelProto) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_proto_model(proto)
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, FEATURE_COUNT]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model })
    }

    fn features_to_tensor(features: &[f64; FEATURE_COUNT]) -> Result<Tensor> {
        let data: Vec<f32> = features.iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, FEATURE_COUNT), data)
            .context("Failed to shape input tensor")?;
        Ok(array.into())
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<Vec<f64>> {
        let start = Instant::now();

        let input = Self::features_to_tensor(features)?;
        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let values: Vec<f64> = output
            .to_array_view::<f32>()?
            .iter()
            .map(|v| *v as f64)
            .collect();

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(values)
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ModelArtifacts;
    use crate::schema::FeatureSchema;
    use crate::testing;
    use tract_onnx::pb::{
        tensor_proto, tensor_shape_proto, type_proto, GraphProto, ModelProto, NodeProto,
        OperatorSetIdProto, TensorProto, TensorShapeProto, TypeProto, ValueInfoProto,
    };

    const WEIGHTS: [[f32; 2]; FEATURE_COUNT] = [
        [-6.0, -5.5],
        [-4.0, -3.5],
        [3.0, 2.0],
        [-5.0, -4.8],
        [7.5, 7.4],
        [0.0, 0.25],
        [2.5, 2.0],
        [0.5, 0.0],
    ];
    const BIAS: [f32; 2] = [22.5, 24.5];

    fn float_tensor(name: &str, dims: Vec<i64>, data: Vec<f32>) -> TensorProto {
        TensorProto {
            name: name.to_string(),
            dims,
            data_type: tensor_proto::DataType::Float as i32,
            float_data: data,
            ..Default::default()
        }
    }

    fn node(op_type: &str, inputs: &[&str], output: &str) -> NodeProto {
        NodeProto {
            op_type: op_type.to_string(),
            input: inputs.iter().map(|i| i.to_string()).collect(),
            output: vec![output.to_string()],
            name: output.to_string(),
            ..Default::default()
        }
    }

    fn value_info(name: &str, dims: &[i64]) -> ValueInfoProto {
        let dim = dims
            .iter()
            .map(|d| tensor_shape_proto::Dimension {
                value: Some(tensor_shape_proto::dimension::Value::DimValue(*d)),
                ..Default::default()
            })
            .collect();
        ValueInfoProto {
            name: name.to_string(),
            r#type: Some(TypeProto {
                value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                    elem_type: tensor_proto::DataType::Float as i32,
                    shape: Some(TensorShapeProto {
                        dim,
                        ..Default::default()
                    }),
                    ..Default::default()
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// `loads = features · W + b`, shaped `[1, 2]` like a skl2onnx regressor
    fn linear_graph() -> ModelProto {
        let weights: Vec<f32> = WEIGHTS.iter().flatten().copied().collect();
        ModelProto {
            ir_version: 7,
            opset_import: vec![OperatorSetIdProto {
                domain: String::new(),
                version: 13,
            }],
            graph: Some(GraphProto {
                name: "thermal_linear".to_string(),
                node: vec![
                    node("MatMul", &["features", "weights"], "product"),
                    node("Add", &["product", "bias"], "loads"),
                ],
                initializer: vec![
                    float_tensor("weights", vec![FEATURE_COUNT as i64, 2], weights),
                    float_tensor("bias", vec![2], BIAS.to_vec()),
                ],
                input: vec![value_info("features", &[1, FEATURE_COUNT as i64])],
                output: vec![value_info("loads", &[1, 2])],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn expected(features: &[f64; FEATURE_COUNT]) -> [f64; 2] {
        let mut out = [f64::from(BIAS[0]), f64::from(BIAS[1])];
        for (x, w) in features.iter().zip(WEIGHTS.iter()) {
            out[0] += x * f64::from(w[0]);
            out[1] += x * f64::from(w[1]);
        }
        out
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        assert!(OnnxRegressor::from_bytes(b"definitely not protobuf").is_err());
    }

    #[test]
    fn test_linear_graph_yields_heating_and_cooling() {
        let model = OnnxRegressor::from_proto(&linear_graph()).unwrap();
        let features = [0.5, -1.0, 0.25, 1.5, -0.75, 1.0, 0.0, 2.0];

        let outputs = model.predict(&features).unwrap();
        assert_eq!(outputs.len(), 2);
        for (got, want) in outputs.iter().zip(expected(&features)) {
            assert!((got - want).abs() < 1e-4, "got {}, want {}", got, want);
        }
        assert_eq!(model.kind(), "onnx");
    }

    #[test]
    fn test_onnx_artifacts_pass_probe_and_scale_inputs() {
        let model = OnnxRegressor::from_proto(&linear_graph()).unwrap();
        let artifacts = ModelArtifacts::from_parts(
            FeatureSchema::standard(),
            testing::scaler(),
            Box::new(model),
            "best_model-onnx",
        )
        .unwrap();
        assert_eq!(artifacts.kind(), "onnx");

        let raw = testing::sample_request().to_vector();
        let scaled = testing::scaler().transform(&raw);
        let outputs = artifacts.infer(&raw).unwrap();
        for (got, want) in outputs.iter().zip(expected(&scaled)) {
            assert!((got - want).abs() < 1e-3, "got {}, want {}", got, want);
        }
    }
}
