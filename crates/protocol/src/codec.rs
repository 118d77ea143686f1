//! Message serialization and deserialization using postcard
//!
//! Notification-channel messages are serialized with postcard (compact
//! binary format) and framed with a length prefix:
//!
//! ```text
//! [Length: u32 (big-endian)][Message bytes (postcard serialized)]
//! ```
//!
//! Frames are small (stage reports and device notifications); the maximum
//! frame size is 64 KiB to bound what a completion payload can carry.

use crate::{CURRENT_VERSION, Message, ProtocolVersion, error::ProtocolError, error::Result};
use bytes::{BufMut, BytesMut};

/// Maximum allowed frame size (64 KiB)
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Encode a message to bytes using postcard
///
/// # Example
/// ```
/// use protocol::{Message, MessagePayload, CURRENT_VERSION, encode_message};
///
/// let msg = Message {
///     version: CURRENT_VERSION,
///     payload: MessagePayload::Error { message: "oops".into() },
/// };
/// let bytes = encode_message(&msg).unwrap();
/// assert!(!bytes.is_empty());
/// ```
pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    postcard::to_allocvec(message).map_err(ProtocolError::from)
}

/// Decode a message from bytes using postcard
pub fn decode_message(bytes: &[u8]) -> Result<Message> {
    postcard::from_bytes(bytes).map_err(ProtocolError::from)
}

/// Validate protocol version compatibility
///
/// Returns an error if the message version is incompatible with the current
/// version. Compatible if major versions match; minor differences are
/// allowed in both directions.
pub fn validate_version(message_version: &ProtocolVersion) -> Result<()> {
    if message_version.major != CURRENT_VERSION.major {
        return Err(ProtocolError::IncompatibleVersion {
            major: message_version.major,
            minor: message_version.minor,
            expected_major: CURRENT_VERSION.major,
            expected_minor: CURRENT_VERSION.minor,
        });
    }
    Ok(())
}

/// Encode a message with length prefix for framing
///
/// Frame format: `[4-byte length (big-endian)][postcard message bytes]`
pub fn encode_framed(message: &Message) -> Result<Vec<u8>> {
    let message_bytes = encode_message(message)?;
    let message_len = message_bytes.len();

    if message_len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: message_len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut frame = BytesMut::with_capacity(4 + message_len);
    frame.put_u32(message_len as u32);
    frame.put_slice(&message_bytes);

    Ok(frame.to_vec())
}

/// Decode a framed message
///
/// Expects frame format: `[4-byte length (big-endian)][postcard message bytes]`
pub fn decode_framed(frame: &[u8]) -> Result<Message> {
    // Need at least 4 bytes for the length prefix
    if frame.len() < 4 {
        return Err(ProtocolError::IncompleteFrame {
            expected: 4,
            actual: frame.len(),
        });
    }

    let length = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;

    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: length,
            max: MAX_FRAME_SIZE,
        });
    }

    if frame.len() < 4 + length {
        return Err(ProtocolError::IncompleteFrame {
            expected: 4 + length,
            actual: frame.len(),
        });
    }

    decode_message(&frame[4..4 + length])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessagePayload;
    use crate::types::{DeviceNotification, ProvisioningStage, StageOutcome, TargetFamily};

    fn stage_report() -> Message {
        Message {
            version: CURRENT_VERSION,
            payload: MessagePayload::StageReport {
                stage: ProvisioningStage::Create,
                serial: 7,
                outcome: StageOutcome::Success,
            },
        }
    }

    #[test]
    fn test_message_roundtrip() {
        let msg = stage_report();

        let bytes = encode_message(&msg).unwrap();
        let decoded = decode_message(&bytes).unwrap();

        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_framed_roundtrip() {
        let msg = Message {
            version: CURRENT_VERSION,
            payload: MessagePayload::DeviceNotification {
                notification: DeviceNotification::OutputReport {
                    serial: 3,
                    data: vec![0x01, 0x08, 0x00, 0xFF],
                },
            },
        };

        let framed = encode_framed(&msg).unwrap();
        assert!(framed.len() >= 4);

        let decoded = decode_framed(&framed).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_framed_length_prefix() {
        let msg = stage_report();
        let framed = encode_framed(&msg).unwrap();

        let length = u32::from_be_bytes([framed[0], framed[1], framed[2], framed[3]]) as usize;
        assert_eq!(length, framed.len() - 4);
    }

    #[test]
    fn test_decode_truncated_frame() {
        let msg = stage_report();
        let framed = encode_framed(&msg).unwrap();

        let err = decode_framed(&framed[..framed.len() - 1]).unwrap_err();
        assert!(matches!(err, ProtocolError::IncompleteFrame { .. }));

        let err = decode_framed(&framed[..2]).unwrap_err();
        assert!(matches!(err, ProtocolError::IncompleteFrame { .. }));
    }

    #[test]
    fn test_decode_oversized_length() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&((MAX_FRAME_SIZE as u32) + 1).to_be_bytes());
        frame.extend_from_slice(&[0u8; 8]);

        let err = decode_framed(&frame).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(&CURRENT_VERSION).is_ok());

        let incompatible = ProtocolVersion {
            major: CURRENT_VERSION.major + 1,
            minor: 0,
            patch: 0,
        };
        assert!(validate_version(&incompatible).is_err());
    }

    #[test]
    fn test_notification_variants_roundtrip() {
        let notifications = vec![
            DeviceNotification::PluggedIn {
                serial: 1,
                family: TargetFamily::Xbox360Wired,
            },
            DeviceNotification::PrepareHardwareComplete { serial: 1 },
            DeviceNotification::InitializationFinished { serial: 1 },
            DeviceNotification::OutputReport {
                serial: 1,
                data: vec![0u8; 32],
            },
        ];

        for notification in notifications {
            let msg = Message {
                version: CURRENT_VERSION,
                payload: MessagePayload::DeviceNotification { notification },
            };
            let decoded = decode_framed(&encode_framed(&msg).unwrap()).unwrap();
            assert_eq!(decoded, msg);
        }
    }
}
