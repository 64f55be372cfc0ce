//! Postcard Codec using `postcard`
//!
//! This codec uses postcard for compact binary serialization with serde compatibility.

use crate::traits::ValueCodec;
use crate::value::CacheValue;
use anyhow::Result;

/// Postcard Codec using `postcard`
///
/// Smaller payloads than JSON, at the cost of values not being readable
/// with `telnet` against the memcached port.
///
/// # Format
///
/// The first byte is the enum variant index (0..=7), which is never an
/// ASCII digit, so postcard payloads cannot be mistaken for the integer
/// framing.
#[cfg_attr(docsrs, doc(cfg(feature = "postcard")))]
#[derive(Debug, Default, Clone)]
pub struct PostcardCodec;

impl ValueCodec for PostcardCodec {
    fn serialize(&self, value: &CacheValue) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(value)?)
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<CacheValue> {
        Ok(postcard::from_bytes(bytes)?)
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codecs::{decode, encode};

    #[test]
    fn test_postcard_round_trips_through_framing() {
        let codec = PostcardCodec;
        let value = CacheValue::Sequence(vec![CacheValue::from("a"), CacheValue::Float(1.5)]);
        let bytes = encode(&codec, &value).unwrap();
        assert!(!bytes.first().is_some_and(u8::is_ascii_digit));
        assert_eq!(decode(&codec, &bytes).unwrap(), value);
    }
}
