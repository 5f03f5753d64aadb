//! Byte arrays as C++ initializer text.

use crate::internal::*;

pub const VALUES_PER_ROW: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteFormat {
    /// `{`, rows of `0xNN, ` each opened by a newline, then `};`.
    Hex,
    /// Bytes as signed chars, `, ` between values and `,\n` between rows.
    SignedDecimal,
}

pub fn encode_bytes(data: &[u8], format: ByteFormat) -> String {
    match format {
        ByteFormat::Hex => {
            let mut text = String::with_capacity(2 + data.len() * 6 + data.len() / VALUES_PER_ROW + 4);
            text.push('{');
            for row in data.chunks(VALUES_PER_ROW) {
                text.push('\n');
                for byte in row {
                    text.push_str(&format!("0x{byte:02x}, "));
                }
            }
            text.push_str("};\n");
            text
        }
        ByteFormat::SignedDecimal => data
            .chunks(VALUES_PER_ROW)
            .map(|row| row.iter().map(|b| (*b as i8).to_string()).collect::<Vec<_>>().join(", "))
            .collect::<Vec<_>>()
            .join(",\n"),
    }
}

/// Compiled model as a hex array, with its length in bytes.
pub fn encode_model(model_bytes: &[u8]) -> (String, usize) {
    (encode_bytes(model_bytes, ByteFormat::Hex), model_bytes.len())
}

/// Tensor payload as signed values, with its length in bytes.
pub fn encode_tensor(tensor_bytes: &[u8]) -> (String, usize) {
    (encode_bytes(tensor_bytes, ByteFormat::SignedDecimal), tensor_bytes.len())
}

/// Parse an array produced by `encode_bytes` (either format) back to bytes.
pub fn decode_bytes(text: &str) -> SrmcResult<Vec<u8>> {
    let body = text.trim().trim_start_matches('{').trim_end_matches(';').trim_end_matches('}');
    body.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            let value = if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
                u8::from_str_radix(hex, 16).map(|b| b as i16).ok()
            } else {
                token.parse::<i16>().ok()
            };
            match value {
                Some(v @ -128..=-1) => Ok(v as i8 as u8),
                Some(v @ 0..=255) => Ok(v as u8),
                _ => bail!("Invalid byte value `{token}'"),
            }
        })
        .collect()
}

pub fn write_binary(path: &Path, bytes: &[u8]) -> SrmcResult<()> {
    debug!("Writing {} bytes to {path:?}", bytes.len());
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hex_layout() {
        let data = (0u8..40).collect::<Vec<_>>();
        let (text, len) = encode_model(&data);
        assert_eq!(len, 40);
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "{");
        assert!(lines[1].starts_with("0x00, 0x01, "));
        assert_eq!(lines[1].matches("0x").count(), 32);
        assert_eq!(lines[2], "0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, };");
        assert!(text.ends_with("};\n"));
        assert_eq!(encode_model(&[]).0, "{};\n");
    }

    #[test]
    fn signed_layout() {
        let mut data = vec![0u8; 33];
        data[0] = 0xff;
        data[1] = 0x80;
        data[2] = 0x7f;
        let (text, len) = encode_tensor(&data);
        assert_eq!(len, 33);
        assert!(text.starts_with("-1, -128, 127, 0, "));
        let rows = text.split(",\n").collect::<Vec<_>>();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], "0");
        assert_eq!(encode_tensor(&[]).0, "");
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_bytes("{0x100, };").is_err());
        assert!(decode_bytes("1, 2, -129").is_err());
        assert!(decode_bytes("foo").is_err());
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(data in proptest::collection::vec(any::<u8>(), 0..200), hex in any::<bool>()) {
            let format = if hex { ByteFormat::Hex } else { ByteFormat::SignedDecimal };
            prop_assert_eq!(decode_bytes(&encode_bytes(&data, format)).unwrap(), data);
        }
    }
}
