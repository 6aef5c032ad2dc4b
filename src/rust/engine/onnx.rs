use std::collections::HashMap;
use std::fmt::Debug;

use log::{debug, info};
use ndarray::Array2;
use ort::session::Session;
use ort::tensor::{PrimitiveTensorElementType, TensorElementType};
use ort::value::{DynValue, Tensor, ValueType};

use super::{InferenceEngine, ModelInput};
use crate::classifier::ClassifierError;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Which token tensor an ONNX graph input expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputRole {
    Ids,
    Mask,
    SegmentIds,
}

impl InputRole {
    fn from_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("mask") || name.contains("attention") {
            Self::Mask
        } else if name.contains("segment") || name.contains("token_type") {
            Self::SegmentIds
        } else {
            Self::Ids
        }
    }

    fn select<'a>(&self, input: &'a ModelInput) -> &'a [i64] {
        match self {
            Self::Ids => &input.ids,
            Self::Mask => &input.mask,
            Self::SegmentIds => &input.segment_ids,
        }
    }
}

/// Integer width a token input is declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexType {
    Int32,
    Int64,
}

/// Name, shape and element type of a graph input or output
#[derive(Debug, Clone)]
struct TensorDesc {
    name: String,
    dims: Vec<i64>,
    ty: TensorElementType,
}

impl TensorDesc {
    fn describe(name: &str, value_type: &ValueType) -> Result<Self, ClassifierError> {
        match value_type {
            ValueType::Tensor { ty, dimensions, .. } => Ok(Self {
                name: name.to_string(),
                dims: dimensions.clone(),
                ty: *ty,
            }),
            other => Err(ClassifierError::ModelLoad(format!(
                "'{}' must be a tensor, found {:?}",
                name, other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InputBinding {
    name: String,
    role: InputRole,
    index_type: IndexType,
}

/// How token tensors are fed to a validated graph
#[derive(Debug)]
struct Layout {
    bindings: Vec<InputBinding>,
    sequence_length: Option<usize>,
}

/// Checks that a graph takes batch-1, rank-2 integer token tensors and
/// produces a single float tensor, and works out the sequence length.
fn check_layout(inputs: &[TensorDesc], outputs: &[TensorDesc]) -> Result<Layout, ClassifierError> {
    if inputs.is_empty() {
        return Err(ClassifierError::ModelLoad("Model must have at least 1 input (token ids)".into()));
    }
    if outputs.len() != 1 {
        return Err(ClassifierError::ModelLoad(format!(
            "Classification models are expected to have only 1 output, found {}",
            outputs.len()
        )));
    }
    if outputs[0].ty != TensorElementType::Float32 {
        return Err(ClassifierError::ModelLoad(format!(
            "Output '{}' is expected to be float32, found {:?}",
            outputs[0].name, outputs[0].ty
        )));
    }

    let mut bindings: Vec<InputBinding> = Vec::with_capacity(inputs.len());
    let mut lengths = Vec::with_capacity(inputs.len());
    for input in inputs {
        let role = InputRole::from_name(&input.name);
        if bindings.iter().any(|b| b.role == role) {
            return Err(ClassifierError::ModelLoad(format!(
                "Input '{}' maps to {:?}, which is already bound",
                input.name, role
            )));
        }

        let index_type = match input.ty {
            TensorElementType::Int64 => IndexType::Int64,
            TensorElementType::Int32 => IndexType::Int32,
            other => {
                return Err(ClassifierError::ModelLoad(format!(
                    "Input '{}' is expected to be int32 or int64, found {:?}",
                    input.name, other
                )))
            }
        };
        if input.dims.len() != 2 {
            return Err(ClassifierError::ModelLoad(format!(
                "Input '{}' is expected to have 2 dimensions, found {}",
                input.name,
                input.dims.len()
            )));
        }
        if input.dims[0] != 1 && input.dims[0] != -1 {
            return Err(ClassifierError::ModelLoad(format!(
                "Input '{}' is expected to have batch size 1, found {}",
                input.name, input.dims[0]
            )));
        }

        lengths.push(input.dims[1]);
        bindings.push(InputBinding {
            name: input.name.clone(),
            role,
            index_type,
        });
    }

    if !bindings.iter().any(|b| b.role == InputRole::Ids) {
        return Err(ClassifierError::ModelLoad("Model has no token id input".into()));
    }

    let dynamic = lengths.iter().filter(|&&len| len < 0).count();
    let sequence_length = if dynamic == lengths.len() {
        None
    } else if dynamic > 0 {
        return Err(ClassifierError::ModelLoad(
            "Input tensors contain a mix of static and dynamic tensors".into(),
        ));
    } else if lengths.windows(2).any(|w| w[0] != w[1]) {
        return Err(ClassifierError::ModelLoad(format!(
            "Input tensors are expected to have the same length, found {:?}",
            lengths
        )));
    } else {
        Some(lengths[0] as usize)
    };

    Ok(Layout {
        bindings,
        sequence_length,
    })
}

fn token_tensor<T>(name: &str, values: Vec<T>) -> Result<DynValue, ClassifierError>
where
    T: PrimitiveTensorElementType + Debug + Clone + 'static,
{
    let len = values.len();
    let array = Array2::from_shape_vec((1, len), values)
        .map_err(|e| ClassifierError::Inference(format!("Failed to create {} array: {}", name, e)))?;
    let array_dyn = array.into_dyn();
    let values = array_dyn.as_standard_layout();
    let tensor = Tensor::from_array(&values)
        .map_err(|e| ClassifierError::Inference(format!("Failed to create {} tensor: {}", name, e)))?;
    Ok(tensor.into_dyn())
}

/// An ONNX Runtime session together with its validated input layout
#[derive(Debug)]
pub struct OnnxModel {
    session: Session,
    layout: Layout,
}

/// The ONNX Runtime backed [`InferenceEngine`].
///
/// The model must take batch-1, rank-2 int32 or int64 token tensors (ids,
/// and optionally an attention mask and segment ids) and produce exactly one
/// float32 output holding one score per label.
#[derive(Debug, Clone, Default)]
pub struct OrtEngine {
    config: RuntimeConfig,
}

impl OrtEngine {
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    fn validate_model(session: &Session) -> Result<Layout, ClassifierError> {
        let inputs = session
            .inputs
            .iter()
            .map(|input| TensorDesc::describe(&input.name, &input.input_type))
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = session
            .outputs
            .iter()
            .map(|output| TensorDesc::describe(&output.name, &output.output_type))
            .collect::<Result<Vec<_>, _>>()?;
        check_layout(&inputs, &outputs)
    }
}

impl InferenceEngine for OrtEngine {
    type Model = OnnxModel;

    fn name(&self) -> &str {
        "onnxruntime"
    }

    fn load(&self, model: &[u8]) -> Result<OnnxModel, ClassifierError> {
        let session = create_session_builder(&self.config)?
            .commit_from_memory(model)?;

        let layout = Self::validate_model(&session)?;
        info!(
            "ONNX model loaded: inputs {:?}, sequence length {}",
            layout.bindings.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            layout.sequence_length.map_or_else(|| "dynamic".to_string(), |n| n.to_string())
        );

        Ok(OnnxModel { session, layout })
    }

    fn input_length(&self, model: &OnnxModel) -> Option<usize> {
        model.layout.sequence_length
    }

    fn run(&self, model: &OnnxModel, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        let mut input_tensors = HashMap::new();
        for binding in &model.layout.bindings {
            let values = binding.role.select(input);
            let tensor = match binding.index_type {
                IndexType::Int64 => token_tensor(&binding.name, values.to_vec())?,
                IndexType::Int32 => {
                    let narrowed = values
                        .iter()
                        .map(|&v| i32::try_from(v))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| ClassifierError::Inference(format!("{} overflows int32: {}", binding.name, e)))?;
                    token_tensor(&binding.name, narrowed)?
                }
            };
            input_tensors.insert(binding.name.as_str(), tensor);
        }

        let outputs = model
            .session
            .run(input_tensors)
            .map_err(|e| ClassifierError::Inference(format!("Failed to run model: {}", e)))?;
        let scores = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Failed to extract output tensor: {}", e)))?;

        let scores: Vec<f32> = scores.iter().copied().collect();
        debug!("Model produced {} scores for {} tokens", scores.len(), input.token_count());
        Ok(scores)
    }
}
