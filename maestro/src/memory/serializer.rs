//! Serializer for checkpoint state (state <-> bytes). Used by `SqliteSaver`.

use crate::memory::checkpointer::CheckpointError;

/// Serializes and deserializes state for durable checkpoint storage.
pub trait Serializer<S>: Send + Sync {
    fn serialize(&self, state: &S) -> Result<Vec<u8>, CheckpointError>;
    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError>;
}

/// JSON serializer. Requires `S: Serialize + DeserializeOwned`.
pub struct JsonSerializer;

impl<S> Serializer<S> for JsonSerializer
where
    S: serde::Serialize + serde::de::DeserializeOwned,
{
    fn serialize(&self, state: &S) -> Result<Vec<u8>, CheckpointError> {
        serde_json::to_vec(state).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError> {
        serde_json::from_slice(bytes).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Garbage bytes surface as a Serialization error, not a panic.
    #[test]
    fn json_serializer_rejects_garbage() {
        let r: Result<Vec<String>, _> = JsonSerializer.deserialize(b"not json");
        assert!(matches!(r, Err(CheckpointError::Serialization(_))));
    }
}
