//! Opaque proof bytes as carried in a claim request.

use std::borrow::Cow;
use std::fmt;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Proof bytes produced by a proving backend.
///
/// Serialized as a JSON array of byte values. Deserialization also accepts a `0x`-prefixed hex
/// string.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Proof(Vec<u8>);

impl Proof {
    /// Wrap raw proof bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The proof bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the proof has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Proof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Proof")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

impl Serialize for Proof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProofRepr {
    Bytes(Vec<u8>),
    Hex(String),
}

impl<'de> Deserialize<'de> for Proof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match ProofRepr::deserialize(deserializer)? {
            ProofRepr::Bytes(bytes) => Ok(Self(bytes)),
            ProofRepr::Hex(text) => {
                let digits = text
                    .strip_prefix("0x")
                    .ok_or_else(|| serde::de::Error::custom("hex proof must start with 0x"))?;
                hex::decode(digits)
                    .map(Self)
                    .map_err(serde::de::Error::custom)
            }
        }
    }
}

impl JsonSchema for Proof {
    fn schema_name() -> Cow<'static, str> {
        "Proof".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "description": "Proof bytes, as an array of byte values or a 0x-prefixed hex string",
            "oneOf": [
                {
                    "type": "array",
                    "items": { "type": "integer", "minimum": 0, "maximum": 255 }
                },
                {
                    "type": "string",
                    "pattern": "^0x([0-9a-fA-F]{2})*$"
                }
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_byte_array_and_hex() -> Result<(), serde_json::Error> {
        let from_array: Proof = serde_json::from_str("[1, 2, 255]")?;
        let from_hex: Proof = serde_json::from_str("\"0x0102ff\"")?;
        assert_eq!(from_array, from_hex);
        assert_eq!(serde_json::to_string(&from_hex)?, "[1,2,255]");
        assert_eq!(from_hex.as_bytes(), [1, 2, 255]);
        Ok(())
    }

    #[test]
    fn rejects_unprefixed_or_odd_hex() {
        assert!(serde_json::from_str::<Proof>("\"0102\"").is_err());
        assert!(serde_json::from_str::<Proof>("\"0x012\"").is_err());
        assert!(serde_json::from_str::<Proof>("[256]").is_err());
    }

    #[test]
    fn empty_proof_is_a_valid_value() -> Result<(), serde_json::Error> {
        let proof: Proof = serde_json::from_str("[]")?;
        assert!(proof.is_empty());
        Ok(())
    }
}
