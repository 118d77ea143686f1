//! The USB request dispatcher
//!
//! Classifies every incoming host request in two levels (control code,
//! then URB function code) and produces an immediate completion or parks
//! the request on the transfer queues. Classification never completes a
//! request itself: every path produces a disposition, and a single exit
//! point turns it into exactly one completion or one queue entry. That
//! discipline is what rules out double completion, which the host's
//! request tracking does not survive.
//!
//! Codes outside the honored set complete with the permissive default
//! (success). Host stacks probe devices differently across versions, and
//! rejecting an unknown probe gets the device torn down; the leniency is
//! deliberate and must be preserved.

use crate::device::PdoDevice;
use crate::families::FamilyContext;
use crate::request::{DispatchOutcome, HostRequest};
use protocol::{
    CompletionCode, DeviceNotification, PortRequest, ProvisioningStage, SetupPacket, StageOutcome,
    TargetFamily, Urb, descriptor_type, port_status,
};
use tracing::{debug, trace};

/// Setup byte 6 values of the two legacy USB 1.x probes the emulated
/// device must reject with a stall
const LEGACY_PROBE_STALL_A: u8 = 0x08;
const LEGACY_PROBE_STALL_B: u8 = 0x14;

/// Setup byte 6 value of the short vendor probe answered from the XUSB
/// handshake blob
const XUSB_HANDSHAKE_PROBE: u8 = 0x04;

/// What classification decided to do with a request
enum Disposition {
    /// Complete now with this code and payload
    Complete(CompletionCode, Vec<u8>),
    /// Park on the data queue until report data arrives
    ParkData { endpoint: u8, capacity: usize },
}

impl Disposition {
    fn ack() -> Self {
        Disposition::Complete(CompletionCode::Success, Vec::new())
    }
}

impl PdoDevice {
    /// Dispatch one host request
    ///
    /// Never blocks. Returns `Pending` when the request was moved onto a
    /// queue; its completion then happens from the data-arrival or
    /// teardown path.
    pub fn dispatch(&mut self, request: HostRequest) -> DispatchOutcome {
        let (request, completer) = request.into_parts();
        trace!(
            serial = self.identity().serial,
            control_code = format_args!("{:#010X}", request.control_code()),
            "dispatching host request"
        );

        let disposition = match request {
            PortRequest::SubmitUrb(urb) => self.dispatch_urb(urb),

            PortRequest::GetPortStatus => {
                // The virtual port is always active
                let status = port_status::ENABLED | port_status::CONNECTED;
                Disposition::Complete(CompletionCode::Success, port_status::encode(status))
            }

            PortRequest::ResetPort => Disposition::ack(),

            // True idle/low-power emulation is not implemented; the
            // registration is acknowledged immediately
            PortRequest::SubmitIdleNotification => Disposition::ack(),

            PortRequest::Unknown { control_code } => {
                debug!(
                    control_code = format_args!("{:#010X}", control_code),
                    "unrecognized control code, completing with default status"
                );
                Disposition::ack()
            }
        };

        // Single completion point for every code path above
        match disposition {
            Disposition::Complete(code, data) => {
                let bytes_returned = data.len();
                completer.complete(code, data);
                DispatchOutcome::Completed {
                    code,
                    bytes_returned,
                }
            }
            Disposition::ParkData { endpoint, capacity } => {
                self.queues.data.park(endpoint, capacity, completer);
                DispatchOutcome::Pending
            }
        }
    }

    fn dispatch_urb(&mut self, urb: Urb) -> Disposition {
        trace!(
            function = format_args!("{:#06X}", urb.function()),
            "submit-urb"
        );

        match urb {
            Urb::ControlTransfer { setup, .. } => self.control_transfer(setup),

            Urb::ControlTransferEx { .. } => {
                Disposition::Complete(CompletionCode::Unsupported, Vec::new())
            }

            Urb::BulkOrInterruptTransfer {
                endpoint,
                transfer_length,
                data,
            } => self.bulk_or_interrupt(endpoint, transfer_length, data),

            Urb::SelectConfiguration { value } => {
                if value == self.family.configuration_value() {
                    Disposition::ack()
                } else {
                    debug!(
                        requested = value,
                        exposed = self.family.configuration_value(),
                        "configuration value mismatch"
                    );
                    Disposition::Complete(CompletionCode::Unsupported, Vec::new())
                }
            }

            Urb::SelectInterface { interface } => {
                if interface == self.family.interface_number() {
                    Disposition::ack()
                } else {
                    debug!(
                        requested = interface,
                        exposed = self.family.interface_number(),
                        "interface number mismatch"
                    );
                    Disposition::Complete(CompletionCode::Unsupported, Vec::new())
                }
            }

            Urb::GetDescriptorFromDevice {
                descriptor_type,
                index,
                language_id,
                transfer_length,
            } => self.get_descriptor(descriptor_type, index, language_id, transfer_length),

            // The emulated device is always self-powered and ready
            Urb::GetStatusFromDevice => Disposition::ack(),

            Urb::AbortPipe { endpoint } => {
                let cancelled = self.queues.data.cancel_pipe(endpoint);
                debug!(
                    endpoint = format_args!("{:#04X}", endpoint),
                    cancelled, "pipe aborted"
                );
                Disposition::ack()
            }

            Urb::ClassInterface {
                request,
                value,
                index,
                transfer_length,
                data,
            } => {
                let (code, mut reply) = self.family.class_interface(request, value, index, &data);
                reply.truncate(transfer_length as usize);
                Disposition::Complete(code, reply)
            }

            Urb::GetDescriptorFromInterface {
                descriptor_type,
                index,
                transfer_length,
                ..
            } => self.interface_descriptor(descriptor_type, index, transfer_length),

            Urb::Unknown { function } => {
                debug!(
                    function = format_args!("{:#06X}", function),
                    "unrecognized URB function, completing with default status"
                );
                Disposition::ack()
            }
        }
    }

    fn control_transfer(&mut self, setup: SetupPacket) -> Disposition {
        match setup.byte(6) {
            XUSB_HANDSHAKE_PROBE => match &self.family {
                FamilyContext::Xusb(ctx) => {
                    // Fixed 4-byte slice out of the handshake blob
                    Disposition::Complete(
                        CompletionCode::Success,
                        ctx.handshake_probe().to_vec(),
                    )
                }
                _ => Disposition::ack(),
            },

            LEGACY_PROBE_STALL_A | LEGACY_PROBE_STALL_B => {
                // Legacy USB 1.x probing; the device must refuse
                trace!(probe = setup.byte(6), "legacy probe stalled");
                Disposition::Complete(CompletionCode::Stall, Vec::new())
            }

            _ => Disposition::ack(),
        }
    }

    fn bulk_or_interrupt(&mut self, endpoint: u8, transfer_length: u32, data: Vec<u8>) -> Disposition {
        if endpoint & 0x80 == 0 {
            // OUT: rumble/LED traffic, surfaced toward the owning client
            trace!(
                endpoint = format_args!("{:#04X}", endpoint),
                len = data.len(),
                "output transfer"
            );
            self.publish(DeviceNotification::OutputReport {
                serial: self.identity().serial,
                data,
            });
            Disposition::ack()
        } else if let Some(mut report) = self.queues.data.take_ready() {
            report.truncate(transfer_length as usize);
            Disposition::Complete(CompletionCode::Success, report)
        } else {
            Disposition::ParkData {
                endpoint,
                capacity: transfer_length as usize,
            }
        }
    }

    fn get_descriptor(
        &self,
        descriptor_type: u8,
        index: u8,
        language_id: u16,
        transfer_length: u32,
    ) -> Disposition {
        match descriptor_type {
            descriptor_type::DEVICE | descriptor_type::CONFIGURATION | descriptor_type::STRING => {
                match self.family.descriptor(descriptor_type, index, language_id) {
                    Some(mut bytes) => {
                        bytes.truncate(transfer_length as usize);
                        Disposition::Complete(CompletionCode::Success, bytes)
                    }
                    None => {
                        debug!(descriptor_type, index, "no table entry for descriptor");
                        Disposition::ack()
                    }
                }
            }

            // Hosts take interface and endpoint descriptors out of the
            // configuration descriptor already returned
            descriptor_type::INTERFACE | descriptor_type::ENDPOINT => Disposition::ack(),

            other => {
                debug!(descriptor_type = other, "unknown descriptor type");
                Disposition::ack()
            }
        }
    }

    fn interface_descriptor(
        &mut self,
        descriptor_type: u8,
        index: u8,
        transfer_length: u32,
    ) -> Disposition {
        let (code, mut bytes) = self.family.interface_descriptor(descriptor_type, index);
        bytes.truncate(transfer_length as usize);

        // Completing this exchange is the DualShock enumeration milestone
        if self.family.kind() == TargetFamily::DualShock4Wired && code.is_success() {
            let serial = self.identity().serial;
            self.reporter
                .report_stage(ProvisioningStage::InitFinished, serial, &StageOutcome::Success);
            self.publish(DeviceNotification::InitializationFinished { serial });
        }

        Disposition::Complete(code, bytes)
    }
}
