//! Live child device list
//!
//! Owns every live `PdoDevice`, keyed by serial number. A plug-in attempt
//! with a serial already on the bus is rejected by identity comparison
//! before any queue or context allocation happens; at most one runtime
//! state exists per live serial.

use crate::config::QueueSettings;
use crate::device::PdoDevice;
use crate::reporter::StageReporter;
use protocol::{CreationError, DeviceIdentity};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry of live children on the bus
pub struct ChildList {
    children: HashMap<u32, PdoDevice>,
    reporter: Arc<dyn StageReporter>,
    queue_settings: QueueSettings,
}

impl ChildList {
    /// Create an empty child list
    pub fn new(reporter: Arc<dyn StageReporter>, queue_settings: QueueSettings) -> Self {
        Self {
            children: HashMap::new(),
            reporter,
            queue_settings,
        }
    }

    /// Compare two children the way the bus deduplicates them: equal
    /// serial numbers mean the same child
    pub fn identical_children(lhs: &DeviceIdentity, rhs: &DeviceIdentity) -> bool {
        lhs == rhs
    }

    /// Create and expose a new child device
    pub fn plug_in(&mut self, identity: DeviceIdentity) -> Result<(), CreationError> {
        if self
            .children
            .values()
            .any(|child| Self::identical_children(child.identity(), &identity))
        {
            warn!(
                serial = identity.serial,
                "rejecting duplicate child before allocation"
            );
            return Err(CreationError::DuplicateSerial {
                serial: identity.serial,
            });
        }

        let device = PdoDevice::create(
            identity,
            Arc::clone(&self.reporter),
            &self.queue_settings,
        )?;
        self.children.insert(identity.serial, device);

        debug!(
            serial = identity.serial,
            live = self.children.len(),
            "child added to bus"
        );
        Ok(())
    }

    /// Tear down and remove a child; returns true when one existed
    pub fn unplug(&mut self, serial: u32) -> bool {
        match self.children.remove(&serial) {
            Some(mut device) => {
                device.teardown();
                debug!(serial, live = self.children.len(), "child removed from bus");
                true
            }
            None => false,
        }
    }

    /// Access a live child
    pub fn get_mut(&mut self, serial: u32) -> Option<&mut PdoDevice> {
        self.children.get_mut(&serial)
    }

    /// Serial numbers of every live child
    pub fn serials(&self) -> Vec<u32> {
        self.children.keys().copied().collect()
    }

    /// Number of live children
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the bus has no live children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
