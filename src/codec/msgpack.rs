//! MsgPack codec using `rmp-serde`.
//!
//! Always use `to_vec_named`: structs are encoded as maps keyed by field
//! name, so an envelope decodes the same way regardless of field order.
//!
//! # Example
//!
//! ```
//! use renderwire::codec::MsgPackCodec;
//! use renderwire::protocol::{Opcode, RequestEnvelope};
//!
//! let req = RequestEnvelope::new(Opcode::Ping, None);
//! let encoded = MsgPackCodec::encode(&req).unwrap();
//! let decoded: RequestEnvelope = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, req);
//! ```

use bytes::Bytes;

use crate::error::Result;

/// MessagePack codec for envelopes crossing the worker boundary.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be serialized.
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Bytes> {
        Ok(Bytes::from(rmp_serde::to_vec_named(value)?))
    }

    /// Decode MsgPack bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
