use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    #[error("serde error: {0}")]
    Serde(String),
}

impl From<serde_cbor::Error> for ProtoError {
    fn from(error: serde_cbor::Error) -> Self {
        ProtoError::Serde(error.to_string())
    }
}

impl From<serde_json::Error> for ProtoError {
    fn from(error: serde_json::Error) -> Self {
        ProtoError::Serde(error.to_string())
    }
}
