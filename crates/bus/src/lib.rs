//! Virtual gamepad bus core
//!
//! Emulates plugged-in game controllers of three wired families toward a
//! host USB stack. The heart of the crate is the per-child USB request
//! dispatcher: every request the host would put on a physical wire is
//! classified and answered with byte-exact content, synchronously or
//! through the per-device transfer queues that decouple data production
//! from host polling.
//!
//! # Architecture
//!
//! ```text
//! host stack ──dispatch()──> PdoDevice ──queues──┐
//!                               │                │ pairing
//! management ──BusCommand──> worker ── producer ─┘
//!     ▲                         │
//!     └────── BusEvent / stage reports ──────────┘
//! ```
//!
//! - [`PdoDevice`] owns one child's runtime state and answers its requests
//! - [`ChildList`] holds the live children, deduplicated by serial number
//! - [`BusWorkerThread`] services producer/management commands off the
//!   bridge so completions happen outside the dispatch path
//! - [`StageReporter`] is the callback capability through which every
//!   provisioning milestone is reported to the parent bus

pub mod config;
pub mod device;
mod dispatch;
pub mod families;
pub mod queues;
pub mod registry;
pub mod reporter;
pub mod request;
pub mod worker;

pub use config::{BusConfig, QueueSettings, ServiceSettings};
pub use device::PdoDevice;
pub use families::{FamilyContext, PdoDescription};
pub use queues::{DataQueue, NotificationQueue, TransferQueues};
pub use registry::ChildList;
pub use reporter::{EventStageReporter, StageReporter};
pub use request::{DispatchOutcome, HostRequest, PendingRequest};
pub use worker::{BusWorkerThread, spawn_bus_worker};
