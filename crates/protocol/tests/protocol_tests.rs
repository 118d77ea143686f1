//! Integration tests for protocol message serialization/deserialization
//!
//! Tests the message types defined in crates/protocol/src/messages.rs,
//! verifying codec round-trips, framing, and version compatibility.

use protocol::{
    CURRENT_VERSION, CompletionCode, CreationError, DeviceIdentity, DeviceNotification, Message,
    MessagePayload, ProtocolVersion, ProvisioningStage, SetupPacket, StageOutcome, TargetFamily,
    Urb,
};
use protocol::{decode_framed, decode_message, encode_framed, encode_message, validate_version};

fn make_identity(serial: u32) -> DeviceIdentity {
    DeviceIdentity {
        serial,
        family: TargetFamily::Xbox360Wired,
        vendor_id: 0x045E,
        product_id: 0x028E,
        owner_process_id: 1234,
    }
}

mod message_roundtrip {
    use super::*;

    #[test]
    fn test_stage_report_roundtrip() {
        for stage in [
            ProvisioningStage::Create,
            ProvisioningStage::PrepareHardware,
            ProvisioningStage::InitFinished,
        ] {
            let msg = Message {
                version: CURRENT_VERSION,
                payload: MessagePayload::StageReport {
                    stage,
                    serial: 42,
                    outcome: StageOutcome::Success,
                },
            };

            let bytes = encode_message(&msg).expect("Failed to encode");
            let decoded = decode_message(&bytes).expect("Failed to decode");

            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn test_failed_stage_report_roundtrip() {
        let msg = Message {
            version: CURRENT_VERSION,
            payload: MessagePayload::StageReport {
                stage: ProvisioningStage::Create,
                serial: 9,
                outcome: StageOutcome::from_result::<(), _>(&Err(
                    CreationError::DuplicateSerial { serial: 9 },
                )),
            },
        };

        let decoded = decode_message(&encode_message(&msg).unwrap()).unwrap();
        match decoded.payload {
            MessagePayload::StageReport { outcome, .. } => {
                assert!(!outcome.is_success());
            }
            _ => panic!("expected stage report"),
        }
    }

    #[test]
    fn test_output_report_notification_roundtrip() {
        let msg = Message {
            version: CURRENT_VERSION,
            payload: MessagePayload::DeviceNotification {
                notification: DeviceNotification::OutputReport {
                    serial: 5,
                    data: (0..64).collect(),
                },
            },
        };

        let framed = encode_framed(&msg).expect("Failed to encode framed");
        let decoded = decode_framed(&framed).expect("Failed to decode framed");

        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_error_message_roundtrip() {
        let msg = Message {
            version: CURRENT_VERSION,
            payload: MessagePayload::Error {
                message: "management channel closed".to_string(),
            },
        };

        let decoded = decode_message(&encode_message(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }
}

mod versioning {
    use super::*;

    #[test]
    fn test_current_version_is_valid() {
        assert!(validate_version(&CURRENT_VERSION).is_ok());
    }

    #[test]
    fn test_major_mismatch_rejected() {
        let other = ProtocolVersion {
            major: CURRENT_VERSION.major + 1,
            minor: 0,
            patch: 0,
        };
        assert!(validate_version(&other).is_err());
    }

    #[test]
    fn test_minor_mismatch_allowed() {
        let other = ProtocolVersion {
            major: CURRENT_VERSION.major,
            minor: CURRENT_VERSION.minor + 1,
            patch: 0,
        };
        assert!(validate_version(&other).is_ok());
    }
}

mod wire_model {
    use super::*;

    #[test]
    fn test_identity_serde_preserves_fields() {
        let identity = make_identity(17);

        // DeviceIdentity travels inside management commands; every field
        // must survive even though equality ignores all but the serial
        let decoded = postcard_roundtrip(&identity);
        assert_eq!(decoded.serial, 17);
        assert_eq!(decoded.vendor_id, 0x045E);
        assert_eq!(decoded.product_id, 0x028E);
        assert_eq!(decoded.owner_process_id, 1234);
        assert_eq!(decoded.family, TargetFamily::Xbox360Wired);
    }

    #[test]
    fn test_urb_serde_roundtrip() {
        let urbs = vec![
            Urb::ControlTransfer {
                setup: SetupPacket([0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x12, 0x00]),
                transfer_length: 18,
            },
            Urb::BulkOrInterruptTransfer {
                endpoint: 0x81,
                transfer_length: 32,
                data: Vec::new(),
            },
            Urb::AbortPipe { endpoint: 0x81 },
            Urb::Unknown { function: 0x0042 },
        ];

        for urb in urbs {
            let roundtripped = postcard_roundtrip(&urb);
            assert_eq!(roundtripped, urb);
        }
    }

    #[test]
    fn test_completion_code_roundtrip() {
        for code in [
            CompletionCode::Success,
            CompletionCode::Stall,
            CompletionCode::Unsupported,
            CompletionCode::Cancelled,
        ] {
            assert_eq!(postcard_roundtrip(&code), code);
        }
    }

    fn postcard_roundtrip<T>(value: &T) -> T
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
    {
        let bytes = postcard::to_allocvec(value).expect("Failed to serialize");
        postcard::from_bytes(&bytes).expect("Failed to deserialize")
    }
}
