//! Test-vector tensors: loading user inputs, random inputs, and capture files.

use ndarray::ArrayD;
use ndarray_npy::{ReadNpyError, read_npy, write_npy};
use rand::Rng;
use srmc_tflite::{ElementType, TensorInfo};

use crate::internal::*;

#[derive(Clone, Debug, PartialEq)]
pub enum TensorData {
    I8(ArrayD<i8>),
    U8(ArrayD<u8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    F32(ArrayD<f32>),
}

macro_rules! dispatch {
    ($tensor:expr, $a:ident => $body:expr) => {
        match $tensor {
            TensorData::I8($a) => $body,
            TensorData::U8($a) => $body,
            TensorData::I16($a) => $body,
            TensorData::I32($a) => $body,
            TensorData::F32($a) => $body,
        }
    };
}

impl TensorData {
    pub fn element_type(&self) -> ElementType {
        match self {
            TensorData::I8(_) => ElementType::I8,
            TensorData::U8(_) => ElementType::U8,
            TensorData::I16(_) => ElementType::I16,
            TensorData::I32(_) => ElementType::I32,
            TensorData::F32(_) => ElementType::F32,
        }
    }

    pub fn shape(&self) -> &[usize] {
        dispatch!(self, a => a.shape())
    }

    pub fn len(&self) -> usize {
        dispatch!(self, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Little-endian payload, logical order.
    pub fn to_bytes(&self) -> Vec<u8> {
        dispatch!(self, a => a.iter().flat_map(|x| x.to_le_bytes()).collect())
    }

    pub fn from_bytes(element_type: ElementType, shape: &[usize], bytes: &[u8]) -> SrmcResult<TensorData> {
        let len = shape.iter().product::<usize>();
        let size = element_type.size_of().unwrap_or(0);
        ensure!(
            len * size == bytes.len(),
            "{} bytes can not make a {element_type} tensor of shape {shape:?}",
            bytes.len()
        );
        macro_rules! make {
            ($variant:ident, $t:ty) => {{
                let values = bytes
                    .chunks_exact(std::mem::size_of::<$t>())
                    .map(|c| <$t>::from_le_bytes(c.try_into().unwrap_or_default()))
                    .collect::<Vec<$t>>();
                TensorData::$variant(ArrayD::from_shape_vec(shape.to_vec(), values)?)
            }};
        }
        Ok(match element_type {
            ElementType::I8 => make!(I8, i8),
            ElementType::U8 => make!(U8, u8),
            ElementType::I16 => make!(I16, i16),
            ElementType::I32 => make!(I32, i32),
            ElementType::F32 => make!(F32, f32),
            other => bail!("Unsupported tensor element type {other}"),
        })
    }

    /// Uniform random values of `element_type`: [-128, 127) for signed and float
    /// types, [0, 255) for u8.
    pub fn random(element_type: ElementType, shape: &[usize], rng: &mut impl Rng) -> SrmcResult<TensorData> {
        let shape = shape.to_vec();
        Ok(match element_type {
            ElementType::I8 => TensorData::I8(ArrayD::from_shape_fn(shape, |_| rng.gen_range(-128..127))),
            ElementType::U8 => TensorData::U8(ArrayD::from_shape_fn(shape, |_| rng.gen_range(0..255))),
            ElementType::I16 => TensorData::I16(ArrayD::from_shape_fn(shape, |_| rng.gen_range(-128..127))),
            ElementType::I32 => TensorData::I32(ArrayD::from_shape_fn(shape, |_| rng.gen_range(-128..127))),
            ElementType::F32 => TensorData::F32(ArrayD::from_shape_fn(shape, |_| rng.gen_range(-128.0..127.0))),
            other => bail!("Can not generate random {other} values"),
        })
    }

    pub fn read_npy(path: &Path) -> SrmcResult<TensorData> {
        macro_rules! attempt {
            ($variant:ident) => {
                match read_npy(path) {
                    Ok(a) => return Ok(TensorData::$variant(a)),
                    Err(ReadNpyError::WrongDescriptor(_)) => (),
                    Err(e) => return Err(e).with_context(|| format!("Reading {path:?}")),
                }
            };
        }
        attempt!(I8);
        attempt!(U8);
        attempt!(I16);
        attempt!(I32);
        attempt!(F32);
        bail!("{path:?}: unsupported npy element type (expected i8, u8, i16, i32 or f32)")
    }

    pub fn write_npy(&self, path: &Path) -> SrmcResult<()> {
        dispatch!(self, a => write_npy(path, a)).with_context(|| format!("Writing {path:?}"))?;
        Ok(())
    }

    /// Write `<dir>/<prefix>_<ix>.bin` and `<dir>/<prefix>_<ix>.npy`.
    pub fn write_capture(&self, dir: &Path, prefix: &str, ix: usize) -> SrmcResult<()> {
        fs::write(dir.join(format!("{prefix}_{ix}.bin")), self.to_bytes())?;
        self.write_npy(&dir.join(format!("{prefix}_{ix}.npy")))
    }
}

/// Load a user-provided value for the model input `info`.
///
/// `.npy` files holding the wrong number of values are ignored (`None`), so a random
/// input is used instead. `.bin` files are raw payloads and must match the size.
pub fn load_input(path: &Path, info: &TensorInfo) -> SrmcResult<Option<TensorData>> {
    let extension = path.extension().map(|e| e.to_string_lossy().to_lowercase());
    match extension.as_deref() {
        Some("npy") => {
            info!("Loading input {:?} from {path:?}", info.name);
            let data = TensorData::read_npy(path)?;
            ensure!(
                data.element_type() == info.element_type,
                "{path:?} holds {} values, input {:?} is {}",
                data.element_type(),
                info.name,
                info.element_type
            );
            if data.len() != info.len() {
                warn!("{path:?} holds {} values, input {:?} needs {}", data.len(), info.name, info.len());
                return Ok(None);
            }
            Ok(Some(data))
        }
        Some("bin") => {
            info!("Loading input {:?} from {path:?}", info.name);
            let bytes = fs::read(path)?;
            TensorData::from_bytes(info.element_type, &info.shape, &bytes)
                .with_context(|| format!("Loading {path:?} as input {:?}", info.name))
                .map(Some)
        }
        _ => {
            warn!("Ignoring {path:?}: inputs are read from .npy or .bin files");
            Ok(None)
        }
    }
}
