//! Flatbuffer accessors for the subset of the TFLite schema this crate reads.
//!
//! Field slots follow `tensorflow/lite/schema/schema.fbs`. Only the tables needed to
//! recover the operator-code table and the first subgraph's I/O tensors are mapped.

#![allow(clippy::derivable_impls)]

use flatbuffers::{ForwardsUOffset, Table, VOffsetT, Vector, Verifiable, Verifier};

pub const MODEL_IDENTIFIER: &str = "TFL3";

#[derive(Copy, Clone, PartialEq)]
pub struct Model<'a> {
    pub _tab: Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for Model<'a> {
    type Inner = Model<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { Table::new(buf, loc) } }
    }
}

impl<'a> Model<'a> {
    pub const VT_VERSION: VOffsetT = 4;
    pub const VT_OPERATOR_CODES: VOffsetT = 6;
    pub const VT_SUBGRAPHS: VOffsetT = 8;
    pub const VT_DESCRIPTION: VOffsetT = 10;

    #[inline]
    pub fn version(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Model::VT_VERSION, Some(0)).unwrap_or(0) }
    }

    #[inline]
    pub fn operator_codes(&self) -> Option<Vector<'a, ForwardsUOffset<OperatorCode<'a>>>> {
        unsafe {
            self._tab.get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<OperatorCode>>>>(
                Model::VT_OPERATOR_CODES,
                None,
            )
        }
    }

    #[inline]
    pub fn subgraphs(&self) -> Option<Vector<'a, ForwardsUOffset<SubGraph<'a>>>> {
        unsafe {
            self._tab.get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<SubGraph>>>>(
                Model::VT_SUBGRAPHS,
                None,
            )
        }
    }

    #[inline]
    pub fn description(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Model::VT_DESCRIPTION, None) }
    }
}

impl Verifiable for Model<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u32>("version", Self::VT_VERSION, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<OperatorCode>>>>(
                "operator_codes",
                Self::VT_OPERATOR_CODES,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<SubGraph>>>>(
                "subgraphs",
                Self::VT_SUBGRAPHS,
                false,
            )?
            .visit_field::<ForwardsUOffset<&str>>("description", Self::VT_DESCRIPTION, false)?
            .finish();
        Ok(())
    }
}

#[derive(Copy, Clone, PartialEq)]
pub struct OperatorCode<'a> {
    pub _tab: Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for OperatorCode<'a> {
    type Inner = OperatorCode<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { Table::new(buf, loc) } }
    }
}

impl<'a> OperatorCode<'a> {
    pub const VT_DEPRECATED_BUILTIN_CODE: VOffsetT = 4;
    pub const VT_CUSTOM_CODE: VOffsetT = 6;
    pub const VT_VERSION: VOffsetT = 8;
    pub const VT_BUILTIN_CODE: VOffsetT = 10;

    /// Legacy 8-bit operator id. Saturates at 127 for newer operators.
    #[inline]
    pub fn deprecated_builtin_code(&self) -> i8 {
        unsafe { self._tab.get::<i8>(Self::VT_DEPRECATED_BUILTIN_CODE, Some(0)).unwrap_or(0) }
    }

    #[inline]
    pub fn custom_code(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_CUSTOM_CODE, None) }
    }

    #[inline]
    pub fn version(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Self::VT_VERSION, Some(1)).unwrap_or(1) }
    }

    #[inline]
    pub fn builtin_code(&self) -> i32 {
        unsafe { self._tab.get::<i32>(Self::VT_BUILTIN_CODE, Some(0)).unwrap_or(0) }
    }
}

impl Verifiable for OperatorCode<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i8>("deprecated_builtin_code", Self::VT_DEPRECATED_BUILTIN_CODE, false)?
            .visit_field::<ForwardsUOffset<&str>>("custom_code", Self::VT_CUSTOM_CODE, false)?
            .visit_field::<i32>("version", Self::VT_VERSION, false)?
            .visit_field::<i32>("builtin_code", Self::VT_BUILTIN_CODE, false)?
            .finish();
        Ok(())
    }
}

#[derive(Copy, Clone, PartialEq)]
pub struct SubGraph<'a> {
    pub _tab: Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for SubGraph<'a> {
    type Inner = SubGraph<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { Table::new(buf, loc) } }
    }
}

impl<'a> SubGraph<'a> {
    pub const VT_TENSORS: VOffsetT = 4;
    pub const VT_INPUTS: VOffsetT = 6;
    pub const VT_OUTPUTS: VOffsetT = 8;
    pub const VT_NAME: VOffsetT = 12;

    #[inline]
    pub fn tensors(&self) -> Option<Vector<'a, ForwardsUOffset<Tensor<'a>>>> {
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<Tensor>>>>(Self::VT_TENSORS, None)
        }
    }

    #[inline]
    pub fn inputs(&self) -> Option<Vector<'a, i32>> {
        unsafe { self._tab.get::<ForwardsUOffset<Vector<'a, i32>>>(Self::VT_INPUTS, None) }
    }

    #[inline]
    pub fn outputs(&self) -> Option<Vector<'a, i32>> {
        unsafe { self._tab.get::<ForwardsUOffset<Vector<'a, i32>>>(Self::VT_OUTPUTS, None) }
    }

    #[inline]
    pub fn name(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_NAME, None) }
    }
}

impl Verifiable for SubGraph<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Tensor>>>>(
                "tensors",
                Self::VT_TENSORS,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("inputs", Self::VT_INPUTS, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("outputs", Self::VT_OUTPUTS, false)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .finish();
        Ok(())
    }
}

#[derive(Copy, Clone, PartialEq)]
pub struct Tensor<'a> {
    pub _tab: Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for Tensor<'a> {
    type Inner = Tensor<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { Table::new(buf, loc) } }
    }
}

impl<'a> Tensor<'a> {
    pub const VT_SHAPE: VOffsetT = 4;
    pub const VT_TYPE_: VOffsetT = 6;
    pub const VT_BUFFER: VOffsetT = 8;
    pub const VT_NAME: VOffsetT = 10;

    #[inline]
    pub fn shape(&self) -> Option<Vector<'a, i32>> {
        unsafe { self._tab.get::<ForwardsUOffset<Vector<'a, i32>>>(Self::VT_SHAPE, None) }
    }

    /// Raw `TensorType` discriminant.
    #[inline]
    pub fn type_(&self) -> i8 {
        unsafe { self._tab.get::<i8>(Self::VT_TYPE_, Some(0)).unwrap_or(0) }
    }

    #[inline]
    pub fn buffer(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_BUFFER, Some(0)).unwrap_or(0) }
    }

    #[inline]
    pub fn name(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_NAME, None) }
    }
}

impl Verifiable for Tensor<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("shape", Self::VT_SHAPE, false)?
            .visit_field::<i8>("type_", Self::VT_TYPE_, false)?
            .visit_field::<u32>("buffer", Self::VT_BUFFER, false)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .finish();
        Ok(())
    }
}

/// Verifies `buf` and returns the root `Model` table.
#[inline]
pub fn root_as_model(buf: &[u8]) -> Result<Model<'_>, flatbuffers::InvalidFlatbuffer> {
    flatbuffers::root::<Model>(buf)
}

#[inline]
pub fn model_buffer_has_identifier(buf: &[u8]) -> bool {
    flatbuffers::buffer_has_identifier(buf, MODEL_IDENTIFIER, false)
}
