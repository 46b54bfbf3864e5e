//! Deterministic replicated computation for a shared virtual world.
//!
//! Every client runs an identical [`Model`] fed by one totally ordered stream
//! of [`ReflectorEnvelope`]s. Model code mutates state only from those
//! envelopes and from future messages it scheduled itself, so replicas stay
//! bit-identical; each client's [`View`] reads the model and sends user
//! input back through the ordering channel.

pub mod runtime;

pub use runtime::*;
pub use shared_world_proto::{ClientId, LogicalTime, ReflectedMessage, ReflectorEnvelope, SeqNo};
pub use shared_world_text as text;
