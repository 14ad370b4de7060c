//! Codec module - serialization of messages that cross the worker boundary.
//!
//! Nothing is shared between the coordinator and the worker: every envelope
//! is encoded to bytes on one side and decoded into a fresh value on the
//! other.
//!
//! - [`MsgPackCodec`] - MessagePack using `rmp-serde` (`to_vec_named`)
//!
//! # Example
//!
//! ```
//! use renderwire::codec::MsgPackCodec;
//!
//! let encoded = MsgPackCodec::encode(&"hello").unwrap();
//! let decoded: String = MsgPackCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod msgpack;

pub use msgpack::MsgPackCodec;
