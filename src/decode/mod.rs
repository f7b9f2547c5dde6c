//! Byte-decoding transforms.
//!
//! A decoder is applied to every reconstructed entry before diffing, e.g.
//! to strip a known XOR obfuscation layer. Decoders must preserve length so
//! that entry offsets stay meaningful for fragmentation rules.
//!
//! - **identity**: leaves bytes unchanged
//! - **xor**: XOR with a repeating key (`xor:5a`, `xor:0xdeadbeef`)
//! - **not**: bitwise complement

/// Trait for length-preserving payload transforms.
///
/// Implementations must be `Send + Sync` so flows can be loaded in
/// parallel.
///
/// # Examples
///
/// ```
/// use flowdiff::decode::create_decoder;
///
/// let decoder = create_decoder("xor:ff").unwrap();
/// assert_eq!(decoder.decode(vec![0x00, 0x0f]), vec![0xff, 0xf0]);
/// ```
pub trait Decoder: Send + Sync {
    /// Transforms one entry's payload.
    fn decode(&self, data: Vec<u8>) -> Vec<u8>;

    /// Returns the name of the decoder.
    fn name(&self) -> &'static str;
}

/// Passes bytes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDecoder;

impl Decoder for IdentityDecoder {
    fn decode(&self, data: Vec<u8>) -> Vec<u8> {
        data
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// XORs every byte with a repeating key.
///
/// The key restarts at the beginning of each entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorDecoder {
    key: Vec<u8>,
}

impl XorDecoder {
    /// Creates a decoder from a non-empty key.
    #[must_use]
    pub fn new(key: Vec<u8>) -> Option<Self> {
        (!key.is_empty()).then_some(Self { key })
    }
}

impl Decoder for XorDecoder {
    fn decode(&self, mut data: Vec<u8>) -> Vec<u8> {
        for (byte, k) in data.iter_mut().zip(self.key.iter().cycle()) {
            *byte ^= k;
        }
        data
    }

    fn name(&self) -> &'static str {
        "xor"
    }
}

/// Complements every byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotDecoder;

impl Decoder for NotDecoder {
    fn decode(&self, mut data: Vec<u8>) -> Vec<u8> {
        for byte in &mut data {
            *byte = !*byte;
        }
        data
    }

    fn name(&self) -> &'static str {
        "not"
    }
}

/// Creates a decoder from a spec string (`name` or `name:argument`).
///
/// # Errors
///
/// Returns [`crate::error::ParseError::UnknownDecoder`] for unknown names and
/// [`crate::error::ParseError::InvalidDecoderArgument`] for a missing or
/// malformed XOR key.
pub fn create_decoder(spec: &str) -> crate::error::Result<Box<dyn Decoder>> {
    let (name, arg) = spec
        .split_once(':')
        .map_or((spec, None), |(n, a)| (n, Some(a)));

    match name.to_lowercase().as_str() {
        "identity" | "none" => Ok(Box::new(IdentityDecoder)),
        "not" => Ok(Box::new(NotDecoder)),
        "xor" => {
            let invalid = |reason: String| crate::error::ParseError::InvalidDecoderArgument {
                name: "xor".to_string(),
                reason,
            };
            let arg = arg.ok_or_else(|| invalid("missing key, expected xor:<hex>".to_string()))?;
            let hex_key = arg
                .strip_prefix("0x")
                .or_else(|| arg.strip_prefix("0X"))
                .unwrap_or(arg);
            let key = hex::decode(hex_key).map_err(|e| invalid(e.to_string()))?;
            let decoder = XorDecoder::new(key).ok_or_else(|| invalid("empty key".to_string()))?;
            Ok(Box::new(decoder))
        }
        _ => Err(crate::error::ParseError::UnknownDecoder {
            name: spec.to_string(),
        }
        .into()),
    }
}

/// Lists available decoder names.
#[must_use]
pub fn available_decoders() -> Vec<&'static str> {
    vec!["identity", "xor", "not"]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ParseError};

    #[test]
    fn test_identity() {
        let decoder = create_decoder("identity").unwrap();
        assert_eq!(decoder.name(), "identity");
        assert_eq!(decoder.decode(vec![1, 2, 3]), vec![1, 2, 3]);
        assert_eq!(create_decoder("none").unwrap().name(), "identity");
    }

    #[test]
    fn test_xor_repeating_key() {
        let decoder = create_decoder("xor:0x0102").unwrap();
        assert_eq!(decoder.name(), "xor");
        assert_eq!(decoder.decode(vec![0, 0, 0, 0, 0]), vec![1, 2, 1, 2, 1]);
    }

    #[test]
    fn test_xor_is_involution() {
        let decoder = XorDecoder::new(vec![0x5a, 0xa5]).unwrap();
        let data = b"hello world".to_vec();
        assert_eq!(decoder.decode(decoder.decode(data.clone())), data);
    }

    #[test]
    fn test_not() {
        let decoder = create_decoder("NOT").unwrap();
        assert_eq!(decoder.decode(vec![0x00, 0xf0]), vec![0xff, 0x0f]);
    }

    #[test]
    fn test_xor_key_errors() {
        for spec in ["xor", "xor:", "xor:abc", "xor:zz"] {
            let err = create_decoder(spec).err().unwrap();
            assert!(matches!(
                err,
                Error::Parse(ParseError::InvalidDecoderArgument { .. })
            ));
        }
    }

    #[test]
    fn test_unknown_decoder() {
        let err = create_decoder("rot13").err().unwrap();
        assert!(matches!(
            err,
            Error::Parse(ParseError::UnknownDecoder { .. })
        ));
    }

    #[test]
    fn test_available_decoders() {
        for name in available_decoders() {
            if name != "xor" {
                assert!(create_decoder(name).is_ok());
            }
        }
    }
}
