// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn commander_follows_availability_script() {
    let gateway = FakeDeviceGateway::new();
    gateway.script_availability("atlas-01", &[false, false, true]);

    assert!(gateway.commander("atlas-01").await.is_none());
    assert!(gateway.commander("atlas-01").await.is_none());
    assert!(gateway.commander("atlas-01").await.is_some());
    // Script exhausted → default (available)
    assert!(gateway.commander("atlas-01").await.is_some());
}

#[tokio::test]
async fn default_availability_is_configurable() {
    let gateway = FakeDeviceGateway::new();
    gateway.set_default_available(false);
    assert!(gateway.commander("atlas-01").await.is_none());
}

#[tokio::test]
async fn passthrough_pops_scripted_responses() {
    let gateway = FakeDeviceGateway::new();
    gateway.script_passthrough("atlas-01", "[arm64-v8a]");
    let device = gateway.commander("atlas-01").await.unwrap();

    assert_eq!(device.passthrough("getprop").await.unwrap(), "[arm64-v8a]");
    // Fallback once the script runs out
    assert_eq!(device.passthrough("getprop").await.unwrap(), "OK");
}

#[tokio::test]
async fn boolean_commands_pop_scripted_results() {
    let gateway = FakeDeviceGateway::new();
    gateway.script_result("atlas-01", false);
    let device = gateway.commander("atlas-01").await.unwrap();

    assert!(!device.reboot().await.unwrap());
    assert!(device.reboot().await.unwrap());
}

#[tokio::test]
async fn calls_are_recorded_per_origin() {
    let gateway = FakeDeviceGateway::new();
    let device = gateway.commander("atlas-01").await.unwrap();
    gateway.mark_busy("atlas-01").await;
    device.stop_app("com.example.app").await.unwrap();
    gateway.mark_free("atlas-01").await;

    let calls = gateway.calls_for("atlas-01");
    assert_eq!(
        calls,
        vec![
            DeviceCall::MarkBusy { origin: "atlas-01".to_string() },
            DeviceCall::StopApp {
                origin: "atlas-01".to_string(),
                package: "com.example.app".to_string()
            },
            DeviceCall::MarkFree { origin: "atlas-01".to_string() },
        ]
    );
    assert!(gateway.calls_for("atlas-02").is_empty());
}

#[tokio::test]
async fn max_active_tracks_concurrent_commands() {
    let gateway = FakeDeviceGateway::new();
    gateway.set_command_delay(Duration::from_millis(50));
    let a = gateway.commander("atlas-01").await.unwrap();
    let b = gateway.commander("atlas-01").await.unwrap();

    let (r1, r2) = tokio::join!(a.reboot(), b.reboot());
    r1.unwrap();
    r2.unwrap();
    assert_eq!(gateway.max_active("atlas-01"), 2);
}

#[test]
fn payload_describe() {
    let file = InstallPayload::File(PathBuf::from("/srv/apks/pogo.apk"));
    assert_eq!(file.describe(), "/srv/apks/pogo.apk");
    let bytes = InstallPayload::Bytes(vec![0; 16]);
    assert_eq!(bytes.describe(), "<16 bytes>");
}
