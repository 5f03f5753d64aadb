//! Minimal TFLite writer.
//!
//! Produces containers with an operator-code table and a single subgraph declaring
//! its inputs and outputs. There are no operators, no weights: enough to exercise
//! introspection and everything downstream of it without shipping binary fixtures.

use flatbuffers::{FlatBufferBuilder, WIPOffset};

use crate::schema::{self, Model, OperatorCode, SubGraph, Tensor};
use crate::{BuiltinOperator, ElementType};

#[derive(Clone, Debug)]
struct OperatorCodeEntry {
    deprecated_builtin_code: i8,
    builtin_code: i32,
    custom_code: Option<String>,
}

#[derive(Clone, Debug)]
struct TensorEntry {
    name: String,
    element_type: ElementType,
    shape: Vec<i32>,
}

#[derive(Clone, Debug, Default)]
pub struct ModelWriter {
    operator_codes: Vec<OperatorCodeEntry>,
    inputs: Vec<TensorEntry>,
    outputs: Vec<TensorEntry>,
}

impl ModelWriter {
    /// Builtin entry encoded the current way: legacy field saturated, extended field set.
    pub fn builtin(mut self, op: BuiltinOperator) -> Self {
        let deprecated = op.0.min(BuiltinOperator::PLACEHOLDER_FOR_GREATER_OP_CODES.0) as i8;
        self.operator_codes.push(OperatorCodeEntry {
            deprecated_builtin_code: deprecated,
            builtin_code: op.0,
            custom_code: None,
        });
        self
    }

    /// Builtin entry encoded by an old writer: only the 8-bit field is set.
    pub fn legacy_builtin(mut self, code: i8) -> Self {
        self.operator_codes.push(OperatorCodeEntry {
            deprecated_builtin_code: code,
            builtin_code: 0,
            custom_code: None,
        });
        self
    }

    pub fn custom(mut self, name: impl Into<String>) -> Self {
        self.operator_codes.push(OperatorCodeEntry {
            deprecated_builtin_code: BuiltinOperator::CUSTOM.0 as i8,
            builtin_code: BuiltinOperator::CUSTOM.0,
            custom_code: Some(name.into()),
        });
        self
    }

    pub fn input(mut self, name: impl Into<String>, element_type: ElementType, shape: &[usize]) -> Self {
        self.inputs.push(TensorEntry {
            name: name.into(),
            element_type,
            shape: shape.iter().map(|d| *d as i32).collect(),
        });
        self
    }

    pub fn output(mut self, name: impl Into<String>, element_type: ElementType, shape: &[usize]) -> Self {
        self.outputs.push(TensorEntry {
            name: name.into(),
            element_type,
            shape: shape.iter().map(|d| *d as i32).collect(),
        });
        self
    }

    pub fn write(&self) -> Vec<u8> {
        let mut builder = FlatBufferBuilder::new();
        let operator_codes = self
            .operator_codes
            .iter()
            .map(|code| write_operator_code(&mut builder, code))
            .collect::<Vec<_>>();
        let operator_codes = builder.create_vector(&operator_codes);
        let subgraph = write_subgraph(&mut builder, &self.inputs, &self.outputs);
        let subgraphs = builder.create_vector(&[subgraph]);
        let description = builder.create_string("srmc-tflite writer");

        let start = builder.start_table();
        builder.push_slot::<u32>(Model::VT_VERSION, 3, 0);
        builder.push_slot_always(Model::VT_OPERATOR_CODES, operator_codes);
        builder.push_slot_always(Model::VT_SUBGRAPHS, subgraphs);
        builder.push_slot_always(Model::VT_DESCRIPTION, description);
        let model = builder.end_table(start);
        let model = WIPOffset::<Model>::new(model.value());
        builder.finish(model, Some(schema::MODEL_IDENTIFIER));
        builder.finished_data().to_vec()
    }
}

fn write_operator_code<'f>(
    builder: &mut FlatBufferBuilder<'f>,
    code: &OperatorCodeEntry,
) -> WIPOffset<OperatorCode<'f>> {
    let custom = code.custom_code.as_deref().map(|c| builder.create_string(c));
    let start = builder.start_table();
    builder.push_slot::<i32>(OperatorCode::VT_BUILTIN_CODE, code.builtin_code, 0);
    builder.push_slot::<i32>(OperatorCode::VT_VERSION, 1, 1);
    if let Some(custom) = custom {
        builder.push_slot_always(OperatorCode::VT_CUSTOM_CODE, custom);
    }
    builder.push_slot::<i8>(OperatorCode::VT_DEPRECATED_BUILTIN_CODE, code.deprecated_builtin_code, 0);
    let end = builder.end_table(start);
    WIPOffset::new(end.value())
}

fn write_tensor<'f>(builder: &mut FlatBufferBuilder<'f>, tensor: &TensorEntry) -> WIPOffset<Tensor<'f>> {
    let shape = builder.create_vector(&tensor.shape);
    let name = builder.create_string(&tensor.name);
    let start = builder.start_table();
    builder.push_slot_always(Tensor::VT_SHAPE, shape);
    builder.push_slot::<u32>(Tensor::VT_BUFFER, 0, 0);
    builder.push_slot_always(Tensor::VT_NAME, name);
    builder.push_slot::<i8>(Tensor::VT_TYPE_, tensor.element_type.raw(), 0);
    let end = builder.end_table(start);
    WIPOffset::new(end.value())
}

fn write_subgraph<'f>(
    builder: &mut FlatBufferBuilder<'f>,
    inputs: &[TensorEntry],
    outputs: &[TensorEntry],
) -> WIPOffset<SubGraph<'f>> {
    let tensors = inputs
        .iter()
        .chain(outputs.iter())
        .map(|t| write_tensor(builder, t))
        .collect::<Vec<_>>();
    let tensors = builder.create_vector(&tensors);
    let input_ids = (0..inputs.len() as i32).collect::<Vec<_>>();
    let output_ids = (inputs.len() as i32..(inputs.len() + outputs.len()) as i32).collect::<Vec<_>>();
    let input_ids = builder.create_vector(&input_ids);
    let output_ids = builder.create_vector(&output_ids);
    let name = builder.create_string("main");

    let start = builder.start_table();
    builder.push_slot_always(SubGraph::VT_TENSORS, tensors);
    builder.push_slot_always(SubGraph::VT_INPUTS, input_ids);
    builder.push_slot_always(SubGraph::VT_OUTPUTS, output_ids);
    builder.push_slot_always(SubGraph::VT_NAME, name);
    let end = builder.end_table(start);
    WIPOffset::new(end.value())
}
