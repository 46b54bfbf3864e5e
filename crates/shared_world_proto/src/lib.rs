//! Wire types shared by every participant of a replicated session.
//!
//! Nothing in this crate simulates anything: it only describes what travels
//! through the ordering channel and how it is encoded.

pub mod codec;
pub mod error;
pub mod reflector;

pub use codec::{decode_cbor, decode_json, encode_cbor, encode_json};
pub use error::ProtoError;
pub use reflector::{
    session_scope, ClientId, LogicalTime, ReflectedMessage, ReflectorEnvelope, SeqNo,
    SESSION_SCOPE_PREFIX, VIEW_EXIT_EVENT, VIEW_JOIN_EVENT,
};
