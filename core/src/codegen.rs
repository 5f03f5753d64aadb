//! C++ sources embedding the artifacts, rendered from liquid templates.

use crate::encode::{encode_model, encode_tensor};
use crate::internal::*;
use crate::resolver::ResolverSet;
use crate::tensor::TensorData;

const LICENSE_HEADER: &str = include_str!("../templates/license_header.liquid");
const MODEL_SOURCE: &str = include_str!("../templates/model.cc.liquid");
const RESOLVER_HEADER: &str = include_str!("../templates/micro_mutable_op_resolver.hpp.liquid");
const IO_SOURCE: &str = include_str!("../templates/io.cc.liquid");

pub struct Codegen {
    parser: liquid::Parser,
}

impl Codegen {
    pub fn new() -> SrmcResult<Codegen> {
        Ok(Codegen { parser: liquid::ParserBuilder::with_stdlib().build()? })
    }

    fn render(&self, template: &str, globals: &liquid::Object) -> SrmcResult<String> {
        let template = self.parser.parse(template)?;
        Ok(template.render(globals)?)
    }

    /// Comment block opening every generated file.
    pub fn license_header(&self, file_name: &str) -> SrmcResult<String> {
        let now = time::OffsetDateTime::now_utc();
        let version = env!("CARGO_PKG_VERSION");
        let globals = liquid::object!({
            "file_name": file_name,
            "version": version,
            "gen_time": now.to_string(),
            "year": now.year(),
        });
        self.render(LICENSE_HEADER, &globals)
    }

    /// The compiled model as a byte array. Flash configurations place it with
    /// `MODEL_TFLITE_ATTRIBUTE_FLASH`.
    pub fn model_source(
        &self,
        license_header: &str,
        namespace: &str,
        model_bytes: &[u8],
        arena_cache_size: u64,
        system_config: &str,
    ) -> SrmcResult<String> {
        let (model_data, model_length) = encode_model(model_bytes);
        let (model_length, arena_cache_size) = (model_length as i64, arena_cache_size as i64);
        let (weights_location, tflite_attribute) = if system_config.contains("flash") {
            ("flash", "MODEL_TFLITE_ATTRIBUTE_FLASH")
        } else {
            ("sram", "MODEL_TFLITE_ATTRIBUTE")
        };
        let globals = liquid::object!({
            "license_header": license_header,
            "namespace": namespace,
            "model_data": model_data,
            "model_length": model_length,
            "arena_cache_size": arena_cache_size,
            "weights_location": weights_location,
            "tflite_attribute": tflite_attribute,
        });
        self.render(MODEL_SOURCE, &globals)
    }

    /// A `MicroMutableOpResolver` sized and filled for `operators`.
    pub fn resolver_header(
        &self,
        license_header: &str,
        namespace: &str,
        model_name: &str,
        operators: &ResolverSet,
    ) -> SrmcResult<String> {
        let operators = operators.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let globals = liquid::object!({
            "license_header": license_header,
            "namespace": namespace,
            "model": model_name,
            "operators": operators,
        });
        self.render(RESOLVER_HEADER, &globals)
    }

    /// Inputs and expected outputs as signed byte arrays.
    pub fn io_source(
        &self,
        license_header: &str,
        namespace: &str,
        inputs: &[TensorData],
        outputs: &[TensorData],
    ) -> SrmcResult<String> {
        let arrays = |tensors: &[TensorData]| -> Vec<liquid::model::Value> {
            tensors
                .iter()
                .map(|t| {
                    let (data, size) = encode_tensor(&t.to_bytes());
                    let size = size as i64;
                    liquid::model::Value::Object(liquid::object!({ "data": data, "size": size }))
                })
                .collect()
        };
        let (inputs, outputs) = (arrays(inputs), arrays(outputs));
        let globals = liquid::object!({
            "license_header": license_header,
            "namespace": namespace,
            "inputs": inputs,
            "outputs": outputs,
        });
        self.render(IO_SOURCE, &globals)
    }
}

/// `<namespace>_micro_mutable_op_resolver.hpp`
pub fn resolver_header_name(namespace: &str) -> String {
    format!("{namespace}_micro_mutable_op_resolver.hpp")
}
