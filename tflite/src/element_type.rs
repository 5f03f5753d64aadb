use std::fmt;

/// TFLite `TensorType`, the element type of a tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    F32,
    F16,
    I32,
    U8,
    I64,
    String,
    Bool,
    I16,
    Complex64,
    I8,
    F64,
    Complex128,
    U64,
    Resource,
    Variant,
    U32,
    U16,
    I4,
}

impl ElementType {
    pub fn from_raw(raw: i8) -> Option<ElementType> {
        use ElementType::*;
        let it = match raw {
            0 => F32,
            1 => F16,
            2 => I32,
            3 => U8,
            4 => I64,
            5 => String,
            6 => Bool,
            7 => I16,
            8 => Complex64,
            9 => I8,
            10 => F64,
            11 => Complex128,
            12 => U64,
            13 => Resource,
            14 => Variant,
            15 => U32,
            16 => U16,
            17 => I4,
            _ => return None,
        };
        Some(it)
    }

    pub fn raw(&self) -> i8 {
        use ElementType::*;
        match self {
            F32 => 0,
            F16 => 1,
            I32 => 2,
            U8 => 3,
            I64 => 4,
            String => 5,
            Bool => 6,
            I16 => 7,
            Complex64 => 8,
            I8 => 9,
            F64 => 10,
            Complex128 => 11,
            U64 => 12,
            Resource => 13,
            Variant => 14,
            U32 => 15,
            U16 => 16,
            I4 => 17,
        }
    }

    /// Storage size of one element, `None` for types without a fixed width.
    pub fn size_of(&self) -> Option<usize> {
        use ElementType::*;
        match self {
            I8 | U8 | Bool => Some(1),
            F16 | I16 | U16 => Some(2),
            F32 | I32 | U32 => Some(4),
            F64 | I64 | U64 | Complex64 => Some(8),
            Complex128 => Some(16),
            String | Resource | Variant | I4 => None,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = format!("{self:?}");
        write!(f, "{}", s.to_lowercase())
    }
}
