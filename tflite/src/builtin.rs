use std::borrow::Cow;
use std::fmt;

/// TFLite `BuiltinOperator` names, indexed by operator id.
static BUILTIN_OPERATOR_NAMES: &[&str] = &[
    "ADD",
    "AVERAGE_POOL_2D",
    "CONCATENATION",
    "CONV_2D",
    "DEPTHWISE_CONV_2D",
    "DEPTH_TO_SPACE",
    "DEQUANTIZE",
    "EMBEDDING_LOOKUP",
    "FLOOR",
    "FULLY_CONNECTED",
    "HASHTABLE_LOOKUP",
    "L2_NORMALIZATION",
    "L2_POOL_2D",
    "LOCAL_RESPONSE_NORMALIZATION",
    "LOGISTIC",
    "LSH_PROJECTION",
    "LSTM",
    "MAX_POOL_2D",
    "MUL",
    "RELU",
    "RELU_N1_TO_1",
    "RELU6",
    "RESHAPE",
    "RESIZE_BILINEAR",
    "RNN",
    "SOFTMAX",
    "SPACE_TO_DEPTH",
    "SVDF",
    "TANH",
    "CONCAT_EMBEDDINGS",
    "SKIP_GRAM",
    "CALL",
    "CUSTOM",
    "EMBEDDING_LOOKUP_SPARSE",
    "PAD",
    "UNIDIRECTIONAL_SEQUENCE_RNN",
    "GATHER",
    "BATCH_TO_SPACE_ND",
    "SPACE_TO_BATCH_ND",
    "TRANSPOSE",
    "MEAN",
    "SUB",
    "DIV",
    "SQUEEZE",
    "UNIDIRECTIONAL_SEQUENCE_LSTM",
    "STRIDED_SLICE",
    "BIDIRECTIONAL_SEQUENCE_RNN",
    "EXP",
    "TOPK_V2",
    "SPLIT",
    "LOG_SOFTMAX",
    "DELEGATE",
    "BIDIRECTIONAL_SEQUENCE_LSTM",
    "CAST",
    "PRELU",
    "MAXIMUM",
    "ARG_MAX",
    "MINIMUM",
    "LESS",
    "NEG",
    "PADV2",
    "GREATER",
    "GREATER_EQUAL",
    "LESS_EQUAL",
    "SELECT",
    "SLICE",
    "SIN",
    "TRANSPOSE_CONV",
    "SPARSE_TO_DENSE",
    "TILE",
    "EXPAND_DIMS",
    "EQUAL",
    "NOT_EQUAL",
    "LOG",
    "SUM",
    "SQRT",
    "RSQRT",
    "SHAPE",
    "POW",
    "ARG_MIN",
    "FAKE_QUANT",
    "REDUCE_PROD",
    "REDUCE_MAX",
    "PACK",
    "LOGICAL_OR",
    "ONE_HOT",
    "LOGICAL_AND",
    "LOGICAL_NOT",
    "UNPACK",
    "REDUCE_MIN",
    "FLOOR_DIV",
    "REDUCE_ANY",
    "SQUARE",
    "ZEROS_LIKE",
    "FILL",
    "FLOOR_MOD",
    "RANGE",
    "RESIZE_NEAREST_NEIGHBOR",
    "LEAKY_RELU",
    "SQUARED_DIFFERENCE",
    "MIRROR_PAD",
    "ABS",
    "SPLIT_V",
    "UNIQUE",
    "CEIL",
    "REVERSE_V2",
    "ADD_N",
    "GATHER_ND",
    "COS",
    "WHERE",
    "RANK",
    "ELU",
    "REVERSE_SEQUENCE",
    "MATRIX_DIAG",
    "QUANTIZE",
    "MATRIX_SET_DIAG",
    "ROUND",
    "HARD_SWISH",
    "IF",
    "WHILE",
    "NON_MAX_SUPPRESSION_V4",
    "NON_MAX_SUPPRESSION_V5",
    "SCATTER_ND",
    "SELECT_V2",
    "DENSIFY",
    "SEGMENT_SUM",
    "BATCH_MATMUL",
    "PLACEHOLDER_FOR_GREATER_OP_CODES",
    "CUMSUM",
    "CALL_ONCE",
    "BROADCAST_TO",
    "RFFT2D",
    "CONV_3D",
    "IMAG",
    "REAL",
    "COMPLEX_ABS",
    "HASHTABLE",
    "HASHTABLE_FIND",
    "HASHTABLE_IMPORT",
    "HASHTABLE_SIZE",
    "REDUCE_ALL",
    "CONV_3D_TRANSPOSE",
    "VAR_HANDLE",
    "READ_VARIABLE",
    "ASSIGN_VARIABLE",
    "BROADCAST_ARGS",
    "RANDOM_STANDARD_NORMAL",
    "BUCKETIZE",
    "RANDOM_UNIFORM",
    "MULTINOMIAL",
    "GELU",
    "DYNAMIC_UPDATE_SLICE",
    "RELU_0_TO_1",
    "UNSORTED_SEGMENT_PROD",
    "UNSORTED_SEGMENT_MAX",
    "UNSORTED_SEGMENT_SUM",
    "ATAN2",
    "UNSORTED_SEGMENT_MIN",
    "SIGN",
    "BITCAST",
    "BITWISE_XOR",
    "RIGHT_SHIFT",
];

/// A TFLite builtin operator id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuiltinOperator(pub i32);

impl BuiltinOperator {
    pub const CONV_2D: BuiltinOperator = BuiltinOperator(3);
    pub const DEPTHWISE_CONV_2D: BuiltinOperator = BuiltinOperator(4);
    pub const FULLY_CONNECTED: BuiltinOperator = BuiltinOperator(9);
    pub const SOFTMAX: BuiltinOperator = BuiltinOperator(25);
    pub const CUSTOM: BuiltinOperator = BuiltinOperator(32);
    pub const PLACEHOLDER_FOR_GREATER_OP_CODES: BuiltinOperator = BuiltinOperator(127);

    /// Resolve the id of an operator-code entry from its two encodings.
    ///
    /// Older writers only fill the 8-bit field, newer ones saturate it at
    /// `PLACEHOLDER_FOR_GREATER_OP_CODES` and use the 32-bit one.
    pub fn from_codes(deprecated: i8, extended: i32) -> BuiltinOperator {
        BuiltinOperator((deprecated as i32).max(extended))
    }

    /// Catalog name, `None` for ids the catalog does not know.
    pub fn known_name(&self) -> Option<&'static str> {
        usize::try_from(self.0).ok().and_then(|ix| BUILTIN_OPERATOR_NAMES.get(ix)).copied()
    }

    pub fn name(&self) -> Cow<'static, str> {
        match self.known_name() {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("BUILTIN_{}", self.0)),
        }
    }

    pub fn is_custom(&self) -> bool {
        *self == Self::CUSTOM
    }
}

impl fmt::Display for BuiltinOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_anchors() {
        assert_eq!(BuiltinOperator(0).name(), "ADD");
        assert_eq!(BuiltinOperator::CONV_2D.name(), "CONV_2D");
        assert_eq!(BuiltinOperator::CUSTOM.name(), "CUSTOM");
        assert_eq!(BuiltinOperator(114).name(), "QUANTIZE");
        assert_eq!(BuiltinOperator(126).name(), "BATCH_MATMUL");
        assert_eq!(BuiltinOperator(150).name(), "GELU");
        assert_eq!(BuiltinOperator(161).name(), "RIGHT_SHIFT");
    }

    #[test]
    fn unknown_ids() {
        assert_eq!(BuiltinOperator(500).known_name(), None);
        assert_eq!(BuiltinOperator(500).name(), "BUILTIN_500");
        assert_eq!(BuiltinOperator(-3).name(), "BUILTIN_-3");
    }

    #[test]
    fn extended_code_wins_over_saturated_legacy() {
        assert_eq!(BuiltinOperator::from_codes(127, 150), BuiltinOperator(150));
        assert_eq!(BuiltinOperator::from_codes(3, 0), BuiltinOperator::CONV_2D);
        assert_eq!(BuiltinOperator::from_codes(0, 9), BuiltinOperator::FULLY_CONNECTED);
    }
}
