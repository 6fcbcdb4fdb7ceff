//! Codec trait and the JSON implementation.
//!
//! The gateway only sees [`Codec`]; swapping the wire format means writing
//! another implementation, nothing else changes.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts events to text frames and back.
///
/// `Send + Sync + 'static` because a single codec instance is shared by
/// every connection task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes one text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame is malformed or does
    /// not match the expected shape.
    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use summit_protocol::{Codec, JsonCodec, ServerEvent};
///
/// let codec = JsonCodec;
/// let frame = codec.encode(&ServerEvent::CurrentCountdown(7)).unwrap();
/// assert_eq!(frame, r#"{"event":"currentCountdown","data":7}"#);
///
/// let back: ServerEvent = codec.decode(&frame).unwrap();
/// assert_eq!(back, ServerEvent::CurrentCountdown(7));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}
