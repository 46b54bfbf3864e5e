//! Encoding helpers for envelopes and arbitrary replicated payloads.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ProtoError;

pub fn encode_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtoError> {
    Ok(serde_cbor::to_vec(value)?)
}

pub fn decode_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtoError> {
    Ok(serde_cbor::from_slice(bytes)?)
}

pub fn encode_json<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtoError> {
    Ok(serde_json::to_vec(value)?)
}

pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtoError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflector::{ReflectedMessage, ReflectorEnvelope};
    use serde_json::json;

    fn sample() -> ReflectorEnvelope {
        ReflectorEnvelope {
            seq: 7,
            time: 1_250,
            sender: "view-a".to_string(),
            message: ReflectedMessage::publish("avatar-1", "move", json!({"x": 0.1, "y": -3.5})),
        }
    }

    #[test]
    fn cbor_preserves_float_payload_bits() {
        let envelope = sample();
        let bytes = encode_cbor(&envelope).expect("encode");
        let decoded: ReflectorEnvelope = decode_cbor(&bytes).expect("decode");
        assert_eq!(decoded, envelope);
        let x = decoded_payload_x(&decoded);
        assert_eq!(x.to_bits(), 0.1f64.to_bits());
    }

    #[test]
    fn json_decode_rejects_garbage() {
        let err = decode_json::<ReflectorEnvelope>(b"not json").unwrap_err();
        assert!(matches!(err, ProtoError::Serde(_)));
    }

    fn decoded_payload_x(envelope: &ReflectorEnvelope) -> f64 {
        match &envelope.message {
            ReflectedMessage::Publish { payload, .. } => payload["x"].as_f64().unwrap(),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
