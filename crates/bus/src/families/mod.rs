//! Emulated controller families
//!
//! Family-specific behavior is tagged-variant dispatch over a closed enum:
//! each variant carries its own context data and implements the same fixed
//! capability set (identifier preparation, hardware preparation, context
//! population, descriptor tables, class-interface handling). The dispatcher
//! selects behavior by matching on the variant.

mod ds4;
mod xgip;
mod xusb;

pub use ds4::Ds4Context;
pub use xgip::XgipContext;
pub use xusb::XusbContext;

use protocol::urb::encode_u16_le;
use protocol::{CompletionCode, CreationError, DeviceIdentity, PrepareError, TargetFamily};
use protocol::descriptor_type;

/// Bus-visible identifier strings prepared for a child before creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdoDescription {
    /// Hardware identifier string
    pub device_id: String,
    /// Human-readable device description
    pub description: String,
}

/// Per-device family context
///
/// Allocated empty at creation and populated with identity data in a
/// separate step, mirroring the two-phase context setup of the bus.
#[derive(Debug)]
pub enum FamilyContext {
    Xusb(XusbContext),
    Ds4(Ds4Context),
    Xgip(XgipContext),
}

impl FamilyContext {
    /// The family this context belongs to
    pub fn kind(&self) -> TargetFamily {
        match self {
            FamilyContext::Xusb(_) => TargetFamily::Xbox360Wired,
            FamilyContext::Ds4(_) => TargetFamily::DualShock4Wired,
            FamilyContext::Xgip(_) => TargetFamily::XboxOneWired,
        }
    }

    /// Family-specific identifier/description preparation, the first
    /// creation step
    pub fn prepare_pdo(identity: &DeviceIdentity) -> Result<PdoDescription, CreationError> {
        match identity.family {
            TargetFamily::Xbox360Wired => xusb::prepare_pdo(identity),
            TargetFamily::DualShock4Wired => ds4::prepare_pdo(identity),
            TargetFamily::XboxOneWired => xgip::prepare_pdo(identity),
        }
    }

    /// Allocate an unpopulated context for the given family
    pub fn allocate(family: TargetFamily) -> Self {
        match family {
            TargetFamily::Xbox360Wired => FamilyContext::Xusb(XusbContext::allocate()),
            TargetFamily::DualShock4Wired => FamilyContext::Ds4(Ds4Context::allocate()),
            TargetFamily::XboxOneWired => FamilyContext::Xgip(XgipContext::allocate()),
        }
    }

    /// Populate the context with identity data
    pub fn assign(&mut self, identity: &DeviceIdentity) -> Result<(), CreationError> {
        match self {
            FamilyContext::Xusb(ctx) => ctx.assign(identity),
            FamilyContext::Ds4(ctx) => ctx.assign(identity),
            FamilyContext::Xgip(ctx) => ctx.assign(identity),
        }
    }

    /// Power-up hardware preparation hook
    pub fn prepare_hardware(&mut self) -> Result<(), PrepareError> {
        match self {
            FamilyContext::Xusb(ctx) => ctx.prepare_hardware(),
            FamilyContext::Ds4(ctx) => ctx.prepare_hardware(),
            FamilyContext::Xgip(ctx) => ctx.prepare_hardware(),
        }
    }

    /// Report staged by power-up, to be fed into the data path once
    pub fn take_startup_report(&mut self) -> Option<Vec<u8>> {
        match self {
            FamilyContext::Xgip(ctx) => ctx.take_announce(),
            _ => None,
        }
    }

    /// Descriptor table lookup for device-level get-descriptor requests
    pub fn descriptor(&self, descriptor_type: u8, index: u8, language_id: u16) -> Option<Vec<u8>> {
        match self {
            FamilyContext::Xusb(ctx) => ctx.descriptor(descriptor_type, index, language_id),
            FamilyContext::Ds4(ctx) => ctx.descriptor(descriptor_type, index, language_id),
            FamilyContext::Xgip(ctx) => ctx.descriptor(descriptor_type, index, language_id),
        }
    }

    /// Class-specific interface request
    pub fn class_interface(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
    ) -> (CompletionCode, Vec<u8>) {
        match self {
            FamilyContext::Xusb(ctx) => ctx.class_interface(request, value, index, data),
            FamilyContext::Ds4(ctx) => ctx.class_interface(request, value, index, data),
            FamilyContext::Xgip(ctx) => ctx.class_interface(request, value, index, data),
        }
    }

    /// Interface-level get-descriptor request
    pub fn interface_descriptor(&self, descriptor_type: u8, index: u8) -> (CompletionCode, Vec<u8>) {
        match self {
            FamilyContext::Xusb(ctx) => ctx.interface_descriptor(descriptor_type, index),
            FamilyContext::Ds4(ctx) => ctx.interface_descriptor(descriptor_type, index),
            FamilyContext::Xgip(ctx) => ctx.interface_descriptor(descriptor_type, index),
        }
    }

    /// The single configuration value this family exposes
    pub fn configuration_value(&self) -> u8 {
        match self {
            FamilyContext::Xusb(_) => xusb::CONFIGURATION_VALUE,
            FamilyContext::Ds4(_) => ds4::CONFIGURATION_VALUE,
            FamilyContext::Xgip(_) => xgip::CONFIGURATION_VALUE,
        }
    }

    /// The single interface number this family exposes
    pub fn interface_number(&self) -> u8 {
        match self {
            FamilyContext::Xusb(_) => xusb::INTERFACE_NUMBER,
            FamilyContext::Ds4(_) => ds4::INTERFACE_NUMBER,
            FamilyContext::Xgip(_) => xgip::INTERFACE_NUMBER,
        }
    }
}

/// Build a USB string descriptor from text (UTF-16LE payload)
pub(crate) fn string_descriptor(text: &str) -> Vec<u8> {
    let mut bytes = vec![0u8, descriptor_type::STRING];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&encode_u16_le(unit));
    }
    bytes[0] = bytes.len() as u8;
    bytes
}

/// String descriptor index 0: supported language IDs (US English)
pub(crate) fn language_descriptor() -> Vec<u8> {
    vec![0x04, descriptor_type::STRING, 0x09, 0x04]
}

/// Shared guard for the two-phase context setup
pub(crate) fn require_nonzero_ids(identity: &DeviceIdentity) -> Result<(), CreationError> {
    if identity.vendor_id == 0 || identity.product_id == 0 {
        return Err(CreationError::PreparePdo {
            reason: format!(
                "vendor/product id must be nonzero (got {:04X}:{:04X})",
                identity.vendor_id, identity.product_id
            ),
        });
    }
    Ok(())
}

/// Hardware id string in the form the host uses to match the device
pub(crate) fn hardware_id(identity: &DeviceIdentity) -> String {
    format!(
        "USB\\VID_{:04X}&PID_{:04X}",
        identity.vendor_id, identity.product_id
    )
}
