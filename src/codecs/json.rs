//! JSON Codec using `serde_json`

use crate::traits::ValueCodec;
use crate::value::CacheValue;
use anyhow::Result;

/// JSON Codec using `serde_json`
///
/// Values are written in serde's externally tagged form
/// (`{"String":"5"}`, `"Null"`), which never collides with the ASCII
/// integer framing.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl ValueCodec for JsonCodec {
    fn serialize(&self, value: &CacheValue) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<CacheValue> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn name(&self) -> &'static str {
        "serde_json"
    }
}
