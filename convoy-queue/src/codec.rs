//! Wire codec for queue payloads.
//!
//! Everything on the queue is bincode. Because bincode will happily decode
//! one shape's bytes as another, a queue payload carries a single leading
//! discriminator byte telling the reader what follows: the message itself,
//! or an [`OverflowRef`] pointing at the blob store where the oversize
//! message body lives. Blob bodies are stored *untagged*, so the blob bytes
//! are exactly the encoding of the original message.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::SerializationError;

/// Payload tag: the remaining bytes are the message encoding.
const TAG_DIRECT: u8 = 0;
/// Payload tag: the remaining bytes are an [`OverflowRef`] encoding.
const TAG_OVERFLOW: u8 = 1;

/// Pointer to an overflowed message body in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverflowRef {
    /// Container holding the overflow blob.
    pub container: String,
    /// Blob name, date-prefixed for the expiry sweep.
    pub blob: String,
}

/// A decoded queue payload: either the message itself or a pointer to its
/// overflowed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueuePayload<T> {
    /// The message was small enough to ride the queue directly.
    Direct(T),
    /// The message body lives in the blob store.
    Overflow(OverflowRef),
}

/// Encode a value with the standard wire configuration.
///
/// # Errors
/// If the value cannot be encoded.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, SerializationError> {
    Ok(bincode::serde::encode_to_vec(
        value,
        bincode::config::standard(),
    )?)
}

/// Decode a value with the standard wire configuration.
///
/// # Errors
/// If the bytes are not a valid encoding of `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
    Ok(value)
}

/// Frame an already-encoded message body as a direct queue payload.
#[must_use]
pub fn frame_direct(body: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(1 + body.len());
    payload.push(TAG_DIRECT);
    payload.extend_from_slice(body);
    payload
}

/// Frame an overflow reference as a queue payload.
///
/// # Errors
/// If the reference cannot be encoded.
pub fn frame_overflow(reference: &OverflowRef) -> Result<Vec<u8>, SerializationError> {
    let body = encode(reference)?;
    let mut payload = Vec::with_capacity(1 + body.len());
    payload.push(TAG_OVERFLOW);
    payload.extend_from_slice(&body);
    Ok(payload)
}

/// Decode a queue payload into a message or an overflow reference.
///
/// # Errors
/// If the payload is empty, carries an unknown tag, or its body is not a
/// valid encoding of the tagged shape.
pub fn decode_payload<T: DeserializeOwned>(
    payload: &[u8],
) -> Result<QueuePayload<T>, SerializationError> {
    match payload.split_first() {
        None => Err(SerializationError::EmptyPayload),
        Some((&TAG_DIRECT, body)) => Ok(QueuePayload::Direct(decode(body)?)),
        Some((&TAG_OVERFLOW, body)) => Ok(QueuePayload::Overflow(decode(body)?)),
        Some((&tag, _)) => Err(SerializationError::UnknownTag(tag)),
    }
}

/// Decode a queue payload known to be an overflow reference.
///
/// Used at acknowledgement time, when the overflow flag is already known
/// from the in-flight record and only the blob coordinates are needed.
///
/// # Errors
/// If the payload is not an overflow payload.
pub fn decode_overflow_ref(payload: &[u8]) -> Result<OverflowRef, SerializationError> {
    match payload.split_first() {
        None => Err(SerializationError::EmptyPayload),
        Some((&TAG_OVERFLOW, body)) => decode(body),
        Some((&tag, _)) => Err(SerializationError::UnknownTag(tag)),
    }
}

/// The message-body bytes of a payload, without the discriminator tag.
///
/// For direct payloads this is the message encoding; for overflow payloads
/// it is the reference encoding. Either way it is the content-identity of
/// what was received, which is what the in-flight bookkeeping keys on.
#[must_use]
pub fn payload_body(payload: &[u8]) -> &[u8] {
    payload.split_first().map_or(payload, |(_, body)| body)
}
