//! Bus worker integration tests
//!
//! Exercises the full producer/management path: commands over the bridge,
//! device provisioning, stage-report events, notification waits, and
//! teardown on shutdown.

use bus::{BusConfig, spawn_bus_worker};
use common::{BusCommand, BusEvent, create_bus_bridge};
use protocol::{
    CompletionCode, CreationError, DeviceIdentity, DeviceNotification, MessagePayload,
    ProvisioningStage, TargetFamily,
};
use tokio::sync::oneshot;

fn identity(serial: u32) -> DeviceIdentity {
    DeviceIdentity {
        serial,
        family: TargetFamily::Xbox360Wired,
        vendor_id: 0x045E,
        product_id: 0x028E,
        owner_process_id: 77,
    }
}

#[tokio::test]
async fn test_plug_in_reports_and_announces() {
    let (bridge, worker) = create_bus_bridge();
    let handle = spawn_bus_worker(worker, BusConfig::default());

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::PlugIn {
            identity: identity(1),
            response: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap().unwrap();

    // The Create stage report precedes the plugged-in event
    match bridge.recv_event().await.unwrap() {
        BusEvent::StageReported { stage, serial, outcome } => {
            assert_eq!(stage, ProvisioningStage::Create);
            assert_eq!(serial, 1);
            assert!(outcome.is_success());
        }
        other => panic!("unexpected event: {:?}", other),
    }
    match bridge.recv_event().await.unwrap() {
        BusEvent::DevicePluggedIn { serial, family } => {
            assert_eq!(serial, 1);
            assert_eq!(family, TargetFamily::Xbox360Wired);
        }
        other => panic!("unexpected event: {:?}", other),
    }

    bridge.send_command(BusCommand::Shutdown).await.unwrap();
    handle.join().unwrap().unwrap();
}

#[tokio::test]
async fn test_duplicate_plug_in_rejected() {
    let (bridge, worker) = create_bus_bridge();
    let handle = spawn_bus_worker(worker, BusConfig::default());

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::PlugIn {
            identity: identity(5),
            response: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap().unwrap();

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::PlugIn {
            identity: identity(5),
            response: tx,
        })
        .await
        .unwrap();

    assert_eq!(
        rx.await.unwrap(),
        Err(CreationError::DuplicateSerial { serial: 5 })
    );

    bridge.send_command(BusCommand::Shutdown).await.unwrap();
    handle.join().unwrap().unwrap();
}

#[tokio::test]
async fn test_notification_wait_and_prepare_hardware() {
    let (bridge, worker) = create_bus_bridge();
    let handle = spawn_bus_worker(worker, BusConfig::default());

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::PlugIn {
            identity: identity(2),
            response: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap().unwrap();

    // The PluggedIn event was buffered at creation and completes the first
    // notification wait immediately
    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::AwaitNotification {
            serial: 2,
            response: tx,
        })
        .await
        .unwrap();
    let completion = rx.await.unwrap();
    assert_eq!(completion.code, CompletionCode::Success);
    let message = protocol::decode_framed(&completion.data).unwrap();
    assert!(matches!(
        message.payload,
        MessagePayload::DeviceNotification {
            notification: DeviceNotification::PluggedIn { serial: 2, .. }
        }
    ));

    // Power-up completes and surfaces its own notification
    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::PrepareHardware {
            serial: 2,
            response: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap().unwrap();

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::AwaitNotification {
            serial: 2,
            response: tx,
        })
        .await
        .unwrap();
    let completion = rx.await.unwrap();
    let message = protocol::decode_framed(&completion.data).unwrap();
    assert!(matches!(
        message.payload,
        MessagePayload::DeviceNotification {
            notification: DeviceNotification::PrepareHardwareComplete { serial: 2 }
        }
    ));

    bridge.send_command(BusCommand::Shutdown).await.unwrap();
    handle.join().unwrap().unwrap();
}

#[tokio::test]
async fn test_report_for_unknown_serial_rejected() {
    let (bridge, worker) = create_bus_bridge();
    let handle = spawn_bus_worker(worker, BusConfig::default());

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::SubmitReport {
            serial: 99,
            report: vec![1, 2, 3],
            response: tx,
        })
        .await
        .unwrap();
    assert!(!rx.await.unwrap());

    bridge.send_command(BusCommand::Shutdown).await.unwrap();
    handle.join().unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_cancels_parked_notification_waits() {
    let (bridge, worker) = create_bus_bridge();
    let handle = spawn_bus_worker(worker, BusConfig::default());

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::PlugIn {
            identity: identity(3),
            response: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap().unwrap();

    // Drain the buffered PluggedIn event so the next wait parks
    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::AwaitNotification {
            serial: 3,
            response: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap();

    let (tx, parked_rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::AwaitNotification {
            serial: 3,
            response: tx,
        })
        .await
        .unwrap();

    bridge.send_command(BusCommand::Shutdown).await.unwrap();
    handle.join().unwrap().unwrap();

    // Teardown completed the parked wait with a cancellation result
    let completion = parked_rx.await.unwrap();
    assert_eq!(completion.code, CompletionCode::Cancelled);
}

#[tokio::test]
async fn test_unplug_tears_down_device() {
    let (bridge, worker) = create_bus_bridge();
    let handle = spawn_bus_worker(worker, BusConfig::default());

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::PlugIn {
            identity: identity(4),
            response: tx,
        })
        .await
        .unwrap();
    rx.await.unwrap().unwrap();

    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::Unplug {
            serial: 4,
            response: tx,
        })
        .await
        .unwrap();
    assert!(rx.await.unwrap());

    // Second unplug finds nothing
    let (tx, rx) = oneshot::channel();
    bridge
        .send_command(BusCommand::Unplug {
            serial: 4,
            response: tx,
        })
        .await
        .unwrap();
    assert!(!rx.await.unwrap());

    bridge.send_command(BusCommand::Shutdown).await.unwrap();
    handle.join().unwrap().unwrap();
}
