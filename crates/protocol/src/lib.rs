//! Protocol library for rust-vpad-bus
//!
//! This crate defines the request and completion model shared between the
//! virtual gamepad bus core and its hosting layers: USB request blocks and
//! their bit-exact function codes, setup packets, completion codes, device
//! identity records, provisioning stages, and the notification messages
//! surfaced toward the management layer.
//!
//! # Example
//!
//! ```
//! use protocol::{Message, MessagePayload, ProvisioningStage, StageOutcome, CURRENT_VERSION};
//! use protocol::{encode_message, decode_message};
//!
//! // Create a message
//! let msg = Message {
//!     version: CURRENT_VERSION,
//!     payload: MessagePayload::StageReport {
//!         stage: ProvisioningStage::Create,
//!         serial: 1,
//!         outcome: StageOutcome::Success,
//!     },
//! };
//!
//! // Serialize
//! let bytes = encode_message(&msg).unwrap();
//!
//! // Deserialize
//! let decoded = decode_message(&bytes).unwrap();
//! assert_eq!(decoded.version, CURRENT_VERSION);
//! ```

pub mod codec;
pub mod error;
pub mod messages;
pub mod types;
pub mod urb;
pub mod version;

pub use codec::{
    MAX_FRAME_SIZE, decode_framed, decode_message, encode_framed, encode_message, validate_version,
};
pub use error::{ProtocolError, Result};
pub use messages::{Message, MessagePayload};
pub use types::{
    Completion, CompletionCode, CreationError, DeviceIdentity, DeviceNotification, PrepareError,
    ProvisioningStage, StageOutcome, TargetFamily,
};
pub use urb::{PortRequest, SetupPacket, Urb, descriptor_type, function, ioctl, port_status};
pub use version::{CURRENT_VERSION, ProtocolVersion};
