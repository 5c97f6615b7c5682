mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use common::*;
use remeha_home::clock::ManualClock;
use remeha_home::config::Config;
use remeha_home::error::RemehaError;
use remeha_home::host::{MemoryHost, Slot, SlotValue};
use remeha_home::plugin::{PluginState, RemehaPlugin};
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 01:30 in Amsterdam (winter time)
fn quiet_hour() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 0, 30, 0).unwrap()
}

/// 10:00 in Amsterdam (winter time)
fn day_hour() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap()
}

async fn started(config: Config, at: DateTime<Utc>) -> (RemehaPlugin<MemoryHost>, ManualClock) {
    let clock = ManualClock::new(at);
    let mut plugin =
        RemehaPlugin::with_clock(config, MemoryHost::new(), Arc::new(clock.clone()));
    plugin.on_start().await.unwrap();
    (plugin, clock)
}

#[tokio::test]
async fn start_creates_all_slots_and_requests_clamped_heartbeat() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.poll_interval_secs = 5;
    let (plugin, _) = started(config, day_hour()).await;

    for slot in Slot::ALL {
        assert!(plugin.host().has_slot(slot), "{:?}", slot);
    }
    assert_eq!(plugin.host().heartbeat(), Some(Duration::from_secs(30)));
    assert_eq!(plugin.state(), &PluginState::Running);
}

#[tokio::test]
async fn start_without_credentials_is_reported() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.credentials.password.clear();
    let mut plugin = RemehaPlugin::new(config, MemoryHost::new());

    let err = plugin.on_start().await.unwrap_err();
    assert!(matches!(err, RemehaError::Validation { .. }));
    assert_eq!(plugin.host().errors().len(), 1);
    assert!(!plugin.host().has_slot(Slot::RoomTemperature));
}

#[tokio::test]
async fn quiet_hour_heartbeat_pushes_dashboard_and_skips_energy() {
    let server = MockServer::start().await;
    mount_login(&server, 1, 3600).await;
    mount_dashboard(&server, dashboard_json("Scheduling"), 1).await;
    mount_energy(&server, 0).await;
    let (mut plugin, _) = started(config_for(&server), quiet_hour()).await;

    let report = plugin.on_heartbeat().await;
    assert!(report.authenticated);
    assert!(report.dashboard_pushed);
    assert!(report.energy_skipped_quiet_hours);
    assert!(!report.energy_pushed);
    assert_eq!(report.error, None);

    let host = plugin.host();
    assert_eq!(host.value(Slot::RoomTemperature), Some(&SlotValue::Number(20.5)));
    assert_eq!(host.value(Slot::OutdoorTemperature), Some(&SlotValue::Number(6.5)));
    assert_eq!(host.value(Slot::Setpoint), Some(&SlotValue::Number(21.0)));
    assert_eq!(host.value(Slot::ZoneMode), Some(&SlotValue::Level(0)));
    assert_eq!(host.value(Slot::EnergyConsumed), None);
}

#[tokio::test]
async fn daytime_heartbeats_push_energy_and_reuse_the_token() {
    let server = MockServer::start().await;
    mount_login(&server, 1, 3600).await;
    mount_dashboard(&server, dashboard_json("Scheduling"), 2).await;
    mount_energy(&server, 2).await;
    let (mut plugin, clock) = started(config_for(&server), day_hour()).await;

    let first = plugin.on_heartbeat().await;
    assert!(first.energy_pushed);
    assert!(!first.energy_skipped_quiet_hours);
    assert_eq!(first.slots_changed, 11);
    assert_eq!(
        plugin.host().value(Slot::EnergyConsumed).map(SlotValue::host_string),
        Some("250.0;3500.0".to_string())
    );

    clock.advance(chrono::Duration::seconds(60));
    let second = plugin.on_heartbeat().await;
    assert!(second.authenticated);
    assert!(second.energy_pushed);
    assert_eq!(second.slots_changed, 0);
    assert_eq!(plugin.auth().login_count(), 1);
}

#[tokio::test]
async fn failed_login_is_reported_and_nothing_is_read() {
    let server = MockServer::start().await;
    mount_authorize(&server, 1).await;
    mount_self_asserted(&server, json!({"status": "400"}), 1).await;
    mount_dashboard(&server, dashboard_json("Scheduling"), 0).await;
    let (mut plugin, _) = started(config_for(&server), day_hour()).await;

    let report = plugin.on_heartbeat().await;
    assert!(!report.authenticated);
    assert!(!report.dashboard_pushed);
    assert!(report.error.is_some());
    assert_eq!(plugin.host().errors().len(), 1);
    assert!(matches!(plugin.state(), PluginState::Error(_)));
    assert_eq!(plugin.host().value(Slot::RoomTemperature), None);
}

#[tokio::test]
async fn refused_token_is_dropped_and_replaced_next_cycle() {
    let server = MockServer::start().await;
    mount_login(&server, 2, 3600).await;
    Mock::given(method("GET"))
        .and(path("/api/homes/dashboard"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_dashboard(&server, dashboard_json("Scheduling"), 1).await;
    let (mut plugin, _) = started(config_for(&server), quiet_hour()).await;

    let first = plugin.on_heartbeat().await;
    assert!(first.authenticated);
    assert!(!first.dashboard_pushed);
    assert!(first.error.is_some());
    assert!(plugin.auth().cached_token().is_none());

    let second = plugin.on_heartbeat().await;
    assert!(second.dashboard_pushed);
    assert_eq!(second.error, None);
    assert_eq!(plugin.auth().login_count(), 2);
    assert_eq!(plugin.host().value(Slot::RoomTemperature), Some(&SlotValue::Number(20.5)));
}

#[tokio::test]
async fn setpoint_command_writes_and_updates_the_slot() {
    let server = MockServer::start().await;
    mount_login(&server, 1, 3600).await;
    mount_dashboard(&server, dashboard_json("Scheduling"), 1).await;
    Mock::given(method("POST"))
        .and(path("/api/climate-zones/zone-1/modes/temporary-override"))
        .and(body_json(json!({"roomTemperatureSetPoint": 19.5})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (mut plugin, _) = started(config_for(&server), day_hour()).await;

    plugin.on_command(4, "Set Level", 19.5).await.unwrap();
    assert_eq!(plugin.host().value(Slot::Setpoint), Some(&SlotValue::Number(19.5)));
    assert!(plugin.host().errors().is_empty());
}

#[tokio::test]
async fn mode_command_switches_to_schedule() {
    let server = MockServer::start().await;
    mount_login(&server, 1, 3600).await;
    mount_dashboard(&server, dashboard_json("Manual"), 1).await;
    Mock::given(method("POST"))
        .and(path("/api/climate-zones/zone-1/modes/schedule"))
        .and(body_json(json!({"heatingProgramId": 2})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (mut plugin, _) = started(config_for(&server), quiet_hour()).await;

    plugin.on_heartbeat().await;
    assert_eq!(plugin.host().value(Slot::ZoneMode), Some(&SlotValue::Level(10)));
    plugin.on_command(5, "Set Level", 0.0).await.unwrap();
    assert_eq!(plugin.host().value(Slot::ZoneMode), Some(&SlotValue::Level(0)));
}

#[tokio::test]
async fn invalid_commands_are_rejected_without_requests() {
    let server = MockServer::start().await;
    let (mut plugin, _) = started(config_for(&server), day_hour()).await;

    let err = plugin.on_command(5, "Set Level", 15.0).await.unwrap_err();
    assert!(matches!(err, RemehaError::Validation { .. }));
    let err = plugin.on_command(1, "Set Level", 21.0).await.unwrap_err();
    assert!(err.to_string().contains("read-only"));
    let err = plugin.on_command(4, "Toggle", 0.0).await.unwrap_err();
    assert!(matches!(err, RemehaError::Validation { .. }));

    assert_eq!(plugin.host().errors().len(), 3);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn rejected_write_is_reported_to_the_host() {
    let server = MockServer::start().await;
    mount_login(&server, 1, 3600).await;
    mount_dashboard(&server, dashboard_json("Manual"), 1).await;
    Mock::given(method("POST"))
        .and(path("/api/climate-zones/zone-1/modes/manual"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    let (mut plugin, _) = started(config_for(&server), quiet_hour()).await;

    plugin.on_heartbeat().await;
    let err = plugin.on_command(4, "Set Level", 17.0).await.unwrap_err();
    assert!(matches!(err, RemehaError::Write { .. }));
    assert_eq!(plugin.host().errors().len(), 1);
    // No optimistic update on failure
    assert_eq!(plugin.host().value(Slot::Setpoint), Some(&SlotValue::Number(21.0)));
}

#[tokio::test]
async fn credential_change_drops_the_session() {
    let server = MockServer::start().await;
    mount_login(&server, 1, 3600).await;
    mount_dashboard(&server, dashboard_json("Scheduling"), 1).await;
    let (mut plugin, _) = started(config_for(&server), quiet_hour()).await;
    plugin.on_heartbeat().await;
    assert!(plugin.auth().cached_token().is_some());

    // Poll interval only: session kept
    let mut config = plugin.config().clone();
    config.poll_interval_secs = 120;
    plugin.on_configuration_changed(config.clone()).await.unwrap();
    assert!(plugin.auth().cached_token().is_some());
    assert_eq!(plugin.host().heartbeat(), Some(Duration::from_secs(120)));

    config.credentials.email = "other@example.com".to_string();
    plugin.on_configuration_changed(config).await.unwrap();
    assert!(plugin.auth().cached_token().is_none());
    assert_eq!(plugin.device_sync().appliance_id(), None);
}

#[tokio::test]
async fn stop_clears_cached_state() {
    let server = MockServer::start().await;
    mount_login(&server, 1, 3600).await;
    mount_dashboard(&server, dashboard_json("Scheduling"), 1).await;
    let (mut plugin, _) = started(config_for(&server), quiet_hour()).await;
    plugin.on_heartbeat().await;

    plugin.on_stop().await;
    assert_eq!(plugin.state(), &PluginState::Stopped);
    assert!(plugin.auth().cached_token().is_none());
    assert_eq!(plugin.device_sync().climate_zone_id(), None);
}

#[tokio::test]
async fn run_loop_exits_on_shutdown() {
    let server = MockServer::start().await;
    mount_authorize(&server, 1).await;
    mount_self_asserted(&server, json!({"status": "200"}), 1).await;
    mount_confirmed(&server, "com.b2c.remehaapp://login-callback?code=XYZ", 1).await;
    mount_code_exchange(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(json!({"access_token": "tok1", "expires_in": 3600})),
        1,
    )
    .await;
    mount_dashboard(&server, dashboard_json("Scheduling"), 1).await;

    let clock = ManualClock::new(quiet_hour());
    let mut plugin = RemehaPlugin::with_clock(
        config_for(&server),
        MemoryHost::new(),
        Arc::new(clock),
    );
    let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = shutdown_tx.send(());
    });

    tokio::time::timeout(Duration::from_secs(10), plugin.run(cmd_rx, shutdown_rx))
        .await
        .unwrap()
        .unwrap();
    stopper.await.unwrap();

    assert_eq!(plugin.state(), &PluginState::Stopped);
    assert_eq!(plugin.host().value(Slot::RoomTemperature), Some(&SlotValue::Number(20.5)));
}
