//! Expected outputs from a CPU run of the uncompiled model through tract.

use std::path::Path;

use anyhow::{Context, bail, ensure};
use tract_tflite::prelude::*;

use crate::errors::SrmcResult;
use crate::tensor::TensorData;

/// Run the uncompiled model on `inputs`, returning its outputs in order.
pub fn run_reference(model: &Path, inputs: &[TensorData]) -> SrmcResult<Vec<TensorData>> {
    info!("Running {model:?} on the reference interpreter");
    let model =
        tract_tflite::tflite().model_for_path(model).with_context(|| format!("Loading {model:?} in tract"))?;
    let input_types = (0..model.inputs.len())
        .map(|ix| Ok(model.input_fact(ix)?.datum_type))
        .collect::<TractResult<Vec<DatumType>>>()?;
    ensure!(
        input_types.len() == inputs.len(),
        "Model has {} inputs, {} values given",
        input_types.len(),
        inputs.len()
    );
    let runnable = model.into_optimized()?.into_runnable()?;
    let inputs = inputs
        .iter()
        .zip(input_types)
        .map(|(data, dt)| to_tract(data, dt).map(TValue::from))
        .collect::<TractResult<TVec<TValue>>>()?;
    let outputs = runnable.run(inputs)?;
    outputs.iter().map(|t| from_tract(t)).collect()
}

fn to_tract(data: &TensorData, dt: DatumType) -> TractResult<Tensor> {
    let bytes = data.to_bytes();
    let expected = dt.size_of() * data.shape().iter().product::<usize>();
    ensure!(
        bytes.len() == expected,
        "{} input of shape {:?} is {} bytes, a {dt:?} tensor needs {expected}",
        data.element_type(),
        data.shape(),
        bytes.len()
    );
    let mut tensor = unsafe { Tensor::from_raw_dt(dt.unquantized(), data.shape(), &bytes)? };
    // keeps zero point and scale of quantized inputs
    unsafe { tensor.set_datum_type(dt) };
    Ok(tensor)
}

fn from_tract(tensor: &Tensor) -> SrmcResult<TensorData> {
    let element_type = match tensor.datum_type().unquantized() {
        DatumType::I8 => srmc_tflite::ElementType::I8,
        DatumType::U8 => srmc_tflite::ElementType::U8,
        DatumType::I16 => srmc_tflite::ElementType::I16,
        DatumType::I32 => srmc_tflite::ElementType::I32,
        DatumType::F32 => srmc_tflite::ElementType::F32,
        other => bail!("Unsupported reference output type {other:?}"),
    };
    let bytes = unsafe { tensor.as_bytes() };
    TensorData::from_bytes(element_type, tensor.shape(), bytes)
}
