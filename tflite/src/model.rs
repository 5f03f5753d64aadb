use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use anyhow::Context;

use crate::schema::{self, Model};
use crate::{BuiltinOperator, ElementType, ParseError, TfliteResult};

/// One entry of a model's operator-code table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperatorCode {
    Builtin(BuiltinOperator),
    Custom(String),
}

impl OperatorCode {
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            OperatorCode::Builtin(op) => op.name(),
            OperatorCode::Custom(name) => Cow::Borrowed(name),
        }
    }
}

impl fmt::Display for OperatorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Name, element type and shape of a subgraph input or output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
    pub element_type: ElementType,
    pub shape: Vec<usize>,
}

impl TensorInfo {
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the tensor payload, `None` when the element type has no fixed width.
    pub fn byte_len(&self) -> Option<usize> {
        self.element_type.size_of().map(|s| s * self.len())
    }
}

/// A verified TFLite model buffer.
#[derive(Clone, Debug)]
pub struct TfliteModel(Vec<u8>);

impl TfliteModel {
    pub fn new(buf: Vec<u8>) -> TfliteResult<TfliteModel> {
        schema::root_as_model(&buf).map_err(ParseError::from)?;
        if !schema::model_buffer_has_identifier(&buf) {
            debug!("Model buffer lacks the {} file identifier", schema::MODEL_IDENTIFIER);
        }
        Ok(TfliteModel(buf))
    }

    pub fn open(path: impl AsRef<Path>) -> TfliteResult<TfliteModel> {
        let path = path.as_ref();
        let buf = std::fs::read(path).with_context(|| format!("Reading model {path:?}"))?;
        TfliteModel::new(buf).with_context(|| format!("Loading model {path:?}"))
    }

    pub fn root(&self) -> Model<'_> {
        // verified in new()
        unsafe { flatbuffers::root_unchecked::<Model>(&self.0) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn operators(&self) -> TfliteResult<BTreeSet<OperatorCode>> {
        operators_of(self.root())
    }

    pub fn io(&self) -> TfliteResult<(Vec<TensorInfo>, Vec<TensorInfo>)> {
        io_of(self.root())
    }
}

/// Collect the set of operators referenced by a model's operator-code table.
pub fn extract_operators(model_bytes: &[u8]) -> TfliteResult<BTreeSet<OperatorCode>> {
    let model = schema::root_as_model(model_bytes).map_err(ParseError::from)?;
    operators_of(model)
}

/// List the first subgraph's inputs and outputs, in declaration order.
pub fn describe_io(model_bytes: &[u8]) -> TfliteResult<(Vec<TensorInfo>, Vec<TensorInfo>)> {
    let model = schema::root_as_model(model_bytes).map_err(ParseError::from)?;
    io_of(model)
}

fn operators_of(model: Model) -> TfliteResult<BTreeSet<OperatorCode>> {
    let codes = model
        .operator_codes()
        .ok_or_else(|| ParseError::Malformed("no operator code table".into()))?;
    let mut operators = BTreeSet::new();
    let mut custom_found = false;
    for code in codes.iter() {
        if let Some(custom) = code.custom_code() {
            custom_found = true;
            operators.insert(OperatorCode::Custom(custom.to_string()));
        }
    }
    for code in codes.iter() {
        if code.custom_code().is_some() {
            continue;
        }
        let builtin = BuiltinOperator::from_codes(code.deprecated_builtin_code(), code.builtin_code());
        // placeholder slot for a custom code already recorded
        if custom_found && builtin.is_custom() {
            continue;
        }
        operators.insert(OperatorCode::Builtin(builtin));
    }
    trace!("Operator table: {operators:?}");
    Ok(operators)
}

fn io_of(model: Model) -> TfliteResult<(Vec<TensorInfo>, Vec<TensorInfo>)> {
    let subgraphs =
        model.subgraphs().ok_or_else(|| ParseError::Malformed("no subgraphs".into()))?;
    if subgraphs.len() == 0 {
        return Err(ParseError::Malformed("no subgraphs".into()).into());
    }
    if subgraphs.len() > 1 {
        debug!("Model has {} subgraphs, describing the first one", subgraphs.len());
    }
    let subgraph = subgraphs.get(0);
    let tensors =
        subgraph.tensors().ok_or_else(|| ParseError::Malformed("subgraph has no tensors".into()))?;
    let describe = |ix: i32| -> TfliteResult<TensorInfo> {
        let ix = usize::try_from(ix)
            .ok()
            .filter(|ix| *ix < tensors.len())
            .ok_or_else(|| ParseError::Malformed(format!("tensor index {ix} out of range")))?;
        let tensor = tensors.get(ix);
        let element_type = ElementType::from_raw(tensor.type_()).ok_or_else(|| {
            ParseError::Malformed(format!("unknown tensor type {}", tensor.type_()))
        })?;
        let shape = tensor
            .shape()
            .map(|s| s.iter().map(|d| d.max(0) as usize).collect())
            .unwrap_or_default();
        Ok(TensorInfo {
            name: tensor.name().map(|s| s.to_string()).unwrap_or_else(|| format!("tensor_{ix}")),
            element_type,
            shape,
        })
    };
    let inputs = subgraph
        .inputs()
        .map(|v| v.iter().map(describe).collect::<TfliteResult<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    let outputs = subgraph
        .outputs()
        .map(|v| v.iter().map(describe).collect::<TfliteResult<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
    Ok((inputs, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::ModelWriter;

    fn names(ops: &BTreeSet<OperatorCode>) -> Vec<String> {
        ops.iter().map(|op| op.name().into_owned()).collect()
    }

    #[test]
    fn builtin_table() {
        let model = ModelWriter::default()
            .builtin(BuiltinOperator::CONV_2D)
            .builtin(BuiltinOperator::SOFTMAX)
            .builtin(BuiltinOperator::CONV_2D)
            .write();
        let ops = extract_operators(&model).unwrap();
        assert_eq!(names(&ops), vec!["CONV_2D", "SOFTMAX"]);
    }

    #[test]
    fn legacy_and_extended_codes() {
        let model = ModelWriter::default()
            .legacy_builtin(9)
            .builtin(BuiltinOperator(150))
            .write();
        let ops = extract_operators(&model).unwrap();
        assert!(ops.contains(&OperatorCode::Builtin(BuiltinOperator::FULLY_CONNECTED)));
        assert!(ops.contains(&OperatorCode::Builtin(BuiltinOperator(150))));
        assert!(!ops.contains(&OperatorCode::Builtin(BuiltinOperator::PLACEHOLDER_FOR_GREATER_OP_CODES)));
    }

    #[test]
    fn custom_code_hides_custom_placeholder() {
        let model = ModelWriter::default()
            .builtin(BuiltinOperator::CUSTOM)
            .custom("TFLite_Detection_PostProcess")
            .builtin(BuiltinOperator::DEPTHWISE_CONV_2D)
            .write();
        let ops = extract_operators(&model).unwrap();
        assert_eq!(
            ops,
            [
                OperatorCode::Builtin(BuiltinOperator::DEPTHWISE_CONV_2D),
                OperatorCode::Custom("TFLite_Detection_PostProcess".into())
            ]
            .into_iter()
            .collect()
        );
    }

    #[test]
    fn lone_custom_placeholder_is_kept() {
        let model = ModelWriter::default().builtin(BuiltinOperator::CUSTOM).write();
        assert_eq!(names(&extract_operators(&model).unwrap()), vec!["CUSTOM"]);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = extract_operators(&[0x12, 0x00, 0x44]).unwrap_err();
        assert!(err.downcast_ref::<ParseError>().is_some());
        let err = TfliteModel::new(b"definitely not a model, just a long string".to_vec()).unwrap_err();
        assert!(err.downcast_ref::<ParseError>().is_some());
    }

    #[test]
    fn io_description() {
        let model = ModelWriter::default()
            .builtin(BuiltinOperator::FULLY_CONNECTED)
            .input("serving_default_x:0", ElementType::I8, &[1, 4])
            .output("StatefulPartitionedCall:0", ElementType::I8, &[1, 2])
            .output("scores", ElementType::F32, &[1, 3, 3])
            .write();
        let model = TfliteModel::new(model).unwrap();
        let (inputs, outputs) = model.io().unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "serving_default_x:0");
        assert_eq!(inputs[0].shape, vec![1, 4]);
        assert_eq!(inputs[0].byte_len(), Some(4));
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].element_type, ElementType::F32);
        assert_eq!(outputs[1].byte_len(), Some(36));
    }

    proptest::proptest! {
        #[test]
        fn corrupted_models_fail_cleanly(ix in 0usize..1000, byte in proptest::prelude::any::<u8>()) {
            let mut model = ModelWriter::default()
                .builtin(BuiltinOperator::CONV_2D)
                .custom("ethos-u")
                .input("x", ElementType::I8, &[1, 4])
                .output("y", ElementType::I8, &[1, 4])
                .write();
            let ix = ix % model.len();
            model[ix] = byte;
            if let Err(e) = extract_operators(&model) {
                proptest::prop_assert!(e.downcast_ref::<ParseError>().is_some());
            }
            if let Err(e) = describe_io(&model) {
                proptest::prop_assert!(e.downcast_ref::<ParseError>().is_some());
            }
        }
    }
}
