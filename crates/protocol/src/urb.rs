//! USB request block model
//!
//! This module defines the requests a host USB stack submits to a child
//! port: the top-level port-control requests and, for submit-URB, the URB
//! function sub-protocol. The numeric codes are part of the host-bus
//! interface contract and must match it bit-exactly; unrecognized codes are
//! representable so the dispatcher can honor them with its permissive
//! default instead of rejecting them at parse time.

use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};

/// Internal I/O control codes issued by the host USB stack
///
/// These are the CTL_CODE values of the host-bus interface contract.
pub mod ioctl {
    /// Submit a USB request block
    pub const SUBMIT_URB: u32 = 0x0022_0003;
    /// Reset the (virtual) port
    pub const RESET_PORT: u32 = 0x0022_0007;
    /// Query the port status word
    pub const GET_PORT_STATUS: u32 = 0x0022_0013;
    /// Register an idle/low-power notification
    pub const SUBMIT_IDLE_NOTIFICATION: u32 = 0x0022_0027;
}

/// URB function codes selecting the sub-protocol of a submitted URB
pub mod function {
    pub const SELECT_CONFIGURATION: u16 = 0x0000;
    pub const SELECT_INTERFACE: u16 = 0x0001;
    pub const ABORT_PIPE: u16 = 0x0002;
    pub const CONTROL_TRANSFER: u16 = 0x0008;
    pub const BULK_OR_INTERRUPT_TRANSFER: u16 = 0x0009;
    pub const GET_DESCRIPTOR_FROM_DEVICE: u16 = 0x000B;
    pub const GET_STATUS_FROM_DEVICE: u16 = 0x0013;
    pub const CLASS_INTERFACE: u16 = 0x001B;
    pub const GET_DESCRIPTOR_FROM_INTERFACE: u16 = 0x0028;
    pub const CONTROL_TRANSFER_EX: u16 = 0x0032;
}

/// USB descriptor types carried by get-descriptor requests
pub mod descriptor_type {
    pub const DEVICE: u8 = 0x01;
    pub const CONFIGURATION: u8 = 0x02;
    pub const STRING: u8 = 0x03;
    pub const INTERFACE: u8 = 0x04;
    pub const ENDPOINT: u8 = 0x05;
    /// HID report descriptor (requested from the interface)
    pub const HID_REPORT: u8 = 0x22;
}

/// Port status bits reported by get-port-status
pub mod port_status {
    /// Port is enabled
    pub const ENABLED: u32 = 0x0000_0001;
    /// A device is connected to the port
    pub const CONNECTED: u32 = 0x0000_0002;

    /// Encode a status word as the 4-byte little-endian payload the host
    /// expects
    pub fn encode(status: u32) -> Vec<u8> {
        use byteorder::{LittleEndian, WriteBytesExt};
        let mut buf = Vec::with_capacity(4);
        // Vec<u8> writes are infallible
        buf.write_u32::<LittleEndian>(status)
            .expect("writing to a Vec cannot fail");
        buf
    }
}

/// Fixed-format control-request header accompanying a control transfer
///
/// Layout: `[bmRequestType, bRequest, wValue_lo, wValue_hi, wIndex_lo,
/// wIndex_hi, wLength_lo, wLength_hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupPacket(pub [u8; 8]);

impl SetupPacket {
    /// bmRequestType
    pub fn request_type(&self) -> u8 {
        self.0[0]
    }

    /// bRequest
    pub fn request(&self) -> u8 {
        self.0[1]
    }

    /// wValue
    pub fn value(&self) -> u16 {
        u16::from_le_bytes([self.0[2], self.0[3]])
    }

    /// wIndex
    pub fn index(&self) -> u16 {
        u16::from_le_bytes([self.0[4], self.0[5]])
    }

    /// wLength
    pub fn length(&self) -> u16 {
        u16::from_le_bytes([self.0[6], self.0[7]])
    }

    /// Raw byte at `offset` (the dispatcher keys legacy-probe handling off
    /// byte 6)
    pub fn byte(&self, offset: usize) -> u8 {
        self.0[offset]
    }
}

/// A submitted USB request block
///
/// Each variant corresponds to one URB function code; `Unknown` preserves
/// function codes outside the honored set so they reach the dispatcher's
/// permissive default path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urb {
    /// Control transfer on the default pipe
    ControlTransfer {
        setup: SetupPacket,
        /// Host-side transfer buffer size
        transfer_length: u32,
    },
    /// Extended control transfer (not supported by the emulated devices)
    ControlTransferEx {
        setup: SetupPacket,
        transfer_length: u32,
    },
    /// Bulk or interrupt transfer; `data` carries the OUT payload and is
    /// empty for IN transfers, whose buffer size is `transfer_length`
    BulkOrInterruptTransfer {
        /// Endpoint address, direction bit included
        endpoint: u8,
        transfer_length: u32,
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
    /// Select a device configuration
    SelectConfiguration { value: u8 },
    /// Select an interface alternate setting
    SelectInterface { interface: u8 },
    /// Fetch a descriptor from the device
    GetDescriptorFromDevice {
        descriptor_type: u8,
        index: u8,
        language_id: u16,
        transfer_length: u32,
    },
    /// Query device status
    GetStatusFromDevice,
    /// Abort all outstanding transfers on a pipe
    AbortPipe { endpoint: u8 },
    /// Class-specific request addressed to the interface
    ClassInterface {
        request: u8,
        value: u16,
        index: u16,
        transfer_length: u32,
        #[serde(with = "serde_bytes")]
        data: Vec<u8>,
    },
    /// Fetch a descriptor from the interface
    GetDescriptorFromInterface {
        descriptor_type: u8,
        index: u8,
        language_id: u16,
        transfer_length: u32,
    },
    /// Function code outside the honored set
    Unknown { function: u16 },
}

impl Urb {
    /// The wire function code of this URB
    pub fn function(&self) -> u16 {
        match self {
            Urb::ControlTransfer { .. } => function::CONTROL_TRANSFER,
            Urb::ControlTransferEx { .. } => function::CONTROL_TRANSFER_EX,
            Urb::BulkOrInterruptTransfer { .. } => function::BULK_OR_INTERRUPT_TRANSFER,
            Urb::SelectConfiguration { .. } => function::SELECT_CONFIGURATION,
            Urb::SelectInterface { .. } => function::SELECT_INTERFACE,
            Urb::GetDescriptorFromDevice { .. } => function::GET_DESCRIPTOR_FROM_DEVICE,
            Urb::GetStatusFromDevice => function::GET_STATUS_FROM_DEVICE,
            Urb::AbortPipe { .. } => function::ABORT_PIPE,
            Urb::ClassInterface { .. } => function::CLASS_INTERFACE,
            Urb::GetDescriptorFromInterface { .. } => function::GET_DESCRIPTOR_FROM_INTERFACE,
            Urb::Unknown { function } => *function,
        }
    }
}

/// Top-level request a host submits to the child port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortRequest {
    /// Submit a USB request block
    SubmitUrb(Urb),
    /// Query the port status word
    GetPortStatus,
    /// Reset the port
    ResetPort,
    /// Register an idle notification
    SubmitIdleNotification,
    /// Control code outside the honored set
    Unknown { control_code: u32 },
}

impl PortRequest {
    /// Classify a raw control code; `urb` supplies the request block for
    /// submit-URB and is ignored otherwise
    pub fn classify(control_code: u32, urb: Option<Urb>) -> Self {
        match control_code {
            ioctl::SUBMIT_URB => match urb {
                Some(urb) => PortRequest::SubmitUrb(urb),
                None => PortRequest::Unknown { control_code },
            },
            ioctl::GET_PORT_STATUS => PortRequest::GetPortStatus,
            ioctl::RESET_PORT => PortRequest::ResetPort,
            ioctl::SUBMIT_IDLE_NOTIFICATION => PortRequest::SubmitIdleNotification,
            other => PortRequest::Unknown {
                control_code: other,
            },
        }
    }

    /// The wire control code of this request
    pub fn control_code(&self) -> u32 {
        match self {
            PortRequest::SubmitUrb(_) => ioctl::SUBMIT_URB,
            PortRequest::GetPortStatus => ioctl::GET_PORT_STATUS,
            PortRequest::ResetPort => ioctl::RESET_PORT,
            PortRequest::SubmitIdleNotification => ioctl::SUBMIT_IDLE_NOTIFICATION,
            PortRequest::Unknown { control_code } => *control_code,
        }
    }
}

/// Encode a 16-bit word as its little-endian wire bytes
pub fn encode_u16_le(value: u16) -> [u8; 2] {
    let mut buf = [0u8; 2];
    (&mut buf[..])
        .write_u16::<LittleEndian>(value)
        .expect("writing to a fixed buffer of sufficient size cannot fail");
    buf
}
