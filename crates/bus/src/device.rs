//! Child device lifecycle
//!
//! A `PdoDevice` is the runtime state of one virtual controller: its
//! identity, its family context, and the two queues decoupling request
//! arrival from data production. Creation runs as a sequence of fallible
//! steps; when one fails, everything acquired by earlier steps is released
//! in reverse acquisition order (queue release cancels any parked request),
//! and the `Create` stage result is reported to the bus exactly once either
//! way.

use crate::config::QueueSettings;
use crate::families::FamilyContext;
use crate::queues::TransferQueues;
use crate::reporter::StageReporter;
use crate::request::Completer;
use protocol::{
    Completion, CreationError, DeviceIdentity, DeviceNotification, PrepareError,
    ProvisioningStage, StageOutcome,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Runtime state of one live virtual controller
pub struct PdoDevice {
    identity: DeviceIdentity,
    instance_id: String,
    device_id: String,
    description: String,
    pub(crate) reporter: Arc<dyn StageReporter>,
    pub(crate) queues: TransferQueues,
    pub(crate) family: FamilyContext,
    exposed: bool,
}

impl PdoDevice {
    /// Create and initialize a child device
    ///
    /// A `Create` stage result is reported to the bus after every attempt,
    /// success or failure; this is how the owning layer observes
    /// asynchronous provisioning failures.
    pub fn create(
        identity: DeviceIdentity,
        reporter: Arc<dyn StageReporter>,
        settings: &QueueSettings,
    ) -> Result<PdoDevice, CreationError> {
        let result = Self::create_inner(identity, Arc::clone(&reporter), settings);

        if let Err(e) = &result {
            warn!(
                serial = identity.serial,
                "device creation failed, partial resources released: {}", e
            );
        }
        reporter.report_stage(
            ProvisioningStage::Create,
            identity.serial,
            &StageOutcome::from_result(&result),
        );

        result
    }

    fn create_inner(
        identity: DeviceIdentity,
        reporter: Arc<dyn StageReporter>,
        settings: &QueueSettings,
    ) -> Result<PdoDevice, CreationError> {
        info!(
            serial = identity.serial,
            family = %identity.family,
            vid = format_args!("{:#06X}", identity.vendor_id),
            pid = format_args!("{:#06X}", identity.product_id),
            owner = identity.owner_process_id,
            "creating child device"
        );

        // Family-specific identifier/description preparation
        let pdo_description = FamilyContext::prepare_pdo(&identity)?;

        // Bus-visible instance id; the fixed 2-digit zero-padded form is
        // how the host distinguishes sibling devices
        let instance_id = format!("{:02}", identity.serial);

        // Resources acquired from here on drop in reverse order of
        // acquisition when a later step fails
        let mut family = FamilyContext::allocate(identity.family);
        let queues = TransferQueues::new(settings)?;
        family.assign(&identity)?;

        let mut device = PdoDevice {
            identity,
            instance_id,
            device_id: pdo_description.device_id,
            description: pdo_description.description,
            reporter,
            queues,
            family,
            exposed: false,
        };
        device.expose();

        Ok(device)
    }

    /// Final creation step: make the device visible to the host
    fn expose(&mut self) {
        self.exposed = true;
        debug!(
            serial = self.identity.serial,
            instance_id = %self.instance_id,
            device_id = %self.device_id,
            "child device exposed to host"
        );
        self.publish(DeviceNotification::PluggedIn {
            serial: self.identity.serial,
            family: self.identity.family,
        });
    }

    /// Power-up hardware preparation
    ///
    /// Delegates to the family hook, then unconditionally reports the
    /// `PrepareHardware` stage result.
    pub fn prepare_hardware(&mut self) -> Result<(), PrepareError> {
        let result = self.family.prepare_hardware();

        if result.is_ok() {
            if let Some(report) = self.family.take_startup_report() {
                debug!(
                    serial = self.identity.serial,
                    len = report.len(),
                    "feeding startup report into the data path"
                );
                self.queues.data.push_report(report);
            }
            self.publish(DeviceNotification::PrepareHardwareComplete {
                serial: self.identity.serial,
            });
        }

        self.reporter.report_stage(
            ProvisioningStage::PrepareHardware,
            self.identity.serial,
            &StageOutcome::from_result(&result),
        );

        result
    }

    /// Push a produced input report; pairs with the oldest pending host
    /// read or is buffered until one arrives
    pub fn submit_report(&mut self, report: Vec<u8>) -> bool {
        self.queues.data.push_report(report)
    }

    /// Park a management-layer request until the next lifecycle/state
    /// event; the sender is completed with the framed notification message,
    /// or with a cancellation result at teardown
    pub fn await_notification(&mut self, response: oneshot::Sender<Completion>) {
        self.queues
            .notifications
            .park(Completer::from_sender(response));
    }

    /// Publish a lifecycle/state event toward the management layer
    pub(crate) fn publish(&mut self, notification: DeviceNotification) {
        self.queues.notifications.publish(notification);
    }

    /// Tear the device down: complete every queued request with a
    /// cancellation result (FIFO order) and withdraw from the host
    pub fn teardown(&mut self) {
        let (data_cancelled, waiters_cancelled) = self.queues.drain_all();
        self.exposed = false;
        info!(
            serial = self.identity.serial,
            data_cancelled, waiters_cancelled, "child device torn down"
        );
    }

    /// Identity record this device was created from
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// Bus-visible instance id (2-digit zero-padded serial)
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Hardware identifier string
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the device is currently visible to the host
    pub fn is_exposed(&self) -> bool {
        self.exposed
    }
}

impl Drop for PdoDevice {
    fn drop(&mut self) {
        // Queues cancel their own entries on drop; this only records that a
        // still-exposed device is going away
        if self.exposed {
            debug!(serial = self.identity.serial, "exposed device dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::TargetFamily;
    use std::sync::Mutex;

    struct RecordingReporter {
        reports: Mutex<Vec<(ProvisioningStage, u32, bool)>>,
    }

    impl RecordingReporter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                reports: Mutex::new(Vec::new()),
            })
        }

        fn reports(&self) -> Vec<(ProvisioningStage, u32, bool)> {
            self.reports.lock().unwrap().clone()
        }
    }

    impl StageReporter for RecordingReporter {
        fn report_stage(&self, stage: ProvisioningStage, serial: u32, outcome: &StageOutcome) {
            self.reports
                .lock()
                .unwrap()
                .push((stage, serial, outcome.is_success()));
        }
    }

    fn identity(serial: u32, family: TargetFamily) -> DeviceIdentity {
        DeviceIdentity {
            serial,
            family,
            vendor_id: 0x045E,
            product_id: 0x028E,
            owner_process_id: 100,
        }
    }

    #[test]
    fn test_create_reports_stage_on_success() {
        let reporter = RecordingReporter::new();
        let device = PdoDevice::create(
            identity(7, TargetFamily::Xbox360Wired),
            reporter.clone(),
            &QueueSettings::default(),
        )
        .unwrap();

        assert_eq!(device.instance_id(), "07");
        assert_eq!(device.device_id(), "USB\\VID_045E&PID_028E");
        assert!(device.is_exposed());
        assert_eq!(
            reporter.reports(),
            vec![(ProvisioningStage::Create, 7, true)]
        );
    }

    #[test]
    fn test_create_reports_stage_on_failure() {
        let reporter = RecordingReporter::new();
        let mut bad = identity(9, TargetFamily::DualShock4Wired);
        bad.vendor_id = 0;

        let result = PdoDevice::create(bad, reporter.clone(), &QueueSettings::default());

        assert!(matches!(result, Err(CreationError::PreparePdo { .. })));
        assert_eq!(
            reporter.reports(),
            vec![(ProvisioningStage::Create, 9, false)]
        );
    }

    #[test]
    fn test_instance_id_is_two_digit_padded() {
        let reporter = RecordingReporter::new();
        let device = PdoDevice::create(
            identity(3, TargetFamily::XboxOneWired),
            reporter,
            &QueueSettings::default(),
        )
        .unwrap();

        assert_eq!(device.instance_id(), "03");
    }

    #[test]
    fn test_prepare_hardware_reports_stage() {
        let reporter = RecordingReporter::new();
        let mut device = PdoDevice::create(
            identity(4, TargetFamily::Xbox360Wired),
            reporter.clone(),
            &QueueSettings::default(),
        )
        .unwrap();

        device.prepare_hardware().unwrap();

        assert_eq!(
            reporter.reports(),
            vec![
                (ProvisioningStage::Create, 4, true),
                (ProvisioningStage::PrepareHardware, 4, true),
            ]
        );
    }

    #[test]
    fn test_xgip_power_up_stages_announce_report() {
        let reporter = RecordingReporter::new();
        let mut device = PdoDevice::create(
            identity(5, TargetFamily::XboxOneWired),
            reporter,
            &QueueSettings::default(),
        )
        .unwrap();

        assert_eq!(device.queues.data.ready_len(), 0);
        device.prepare_hardware().unwrap();
        assert_eq!(device.queues.data.ready_len(), 1);
    }

    #[test]
    fn test_teardown_clears_queues() {
        let reporter = RecordingReporter::new();
        let mut device = PdoDevice::create(
            identity(6, TargetFamily::Xbox360Wired),
            reporter,
            &QueueSettings::default(),
        )
        .unwrap();

        device.submit_report(vec![1, 2, 3]);
        device.teardown();

        assert!(!device.is_exposed());
        assert_eq!(device.queues.data.ready_len(), 0);
    }
}
