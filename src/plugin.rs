//! Host-facing plugin adapter
//!
//! [`RemehaPlugin`] owns the token session, the device sync state and the
//! host. The host drives it through the lifecycle calls (`on_start`,
//! `on_stop`, `on_configuration_changed`), one `on_heartbeat` per poll
//! interval and `on_command` for device commands. The standalone binary uses
//! [`RemehaPlugin::run`], which does the same from a tokio loop.

use std::sync::Arc;

use chrono::Timelike;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::auth::{AuthSession, Credentials};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{RemehaError, Result};
use crate::host::{DeviceHost, Slot, SlotValue};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::sync::{DeviceSync, ZoneMode, in_quiet_hours};

mod commands;
mod types;

pub use types::{CycleReport, HostCommand, PluginState};

/// Command name the host sends for setpoint and selector changes
pub const SET_LEVEL: &str = "Set Level";

pub struct RemehaPlugin<H: DeviceHost> {
    config: Config,
    credentials: Credentials,
    auth: AuthSession,
    sync: DeviceSync,
    host: H,
    clock: Arc<dyn Clock>,
    state: PluginState,
    logger: StructuredLogger,
}

impl<H: DeviceHost> RemehaPlugin<H> {
    pub fn new(config: Config, host: H) -> Self {
        Self::with_clock(config, host, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, host: H, clock: Arc<dyn Clock>) -> Self {
        let logger = plugin_logger(&config);
        Self {
            credentials: Credentials::from(&config.credentials),
            auth: AuthSession::new(&config, clock.clone()),
            sync: DeviceSync::new(&config),
            config,
            host,
            clock,
            state: PluginState::Idle,
            logger,
        }
    }

    pub fn state(&self) -> &PluginState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn device_sync(&self) -> &DeviceSync {
        &self.sync
    }

    /// Create the slots and ask the host for heartbeats
    pub async fn on_start(&mut self) -> Result<()> {
        self.logger.info("Starting Remeha Home plugin");
        self.config.validate()?;
        if let Err(e) = self.config.validate_credentials() {
            self.host.report_error(&e.to_string()).await;
            self.state = PluginState::Error(e.to_string());
            return Err(e);
        }
        for slot in Slot::ALL {
            self.host.ensure_slot(slot).await?;
        }
        self.host.request_heartbeat(self.config.poll_interval()).await;
        self.state = PluginState::Running;
        self.logger.info(&format!(
            "Polling every {} s",
            self.config.poll_interval().as_secs()
        ));
        Ok(())
    }

    pub async fn on_stop(&mut self) {
        self.auth.invalidate();
        self.sync.clear();
        self.state = PluginState::Stopped;
        self.logger.info("Remeha Home plugin stopped");
    }

    /// Apply new settings; credentials or endpoint changes reset the session
    pub async fn on_configuration_changed(&mut self, config: Config) -> Result<()> {
        config.validate()?;
        config.validate_credentials()?;

        let session_changed = config.credentials != self.config.credentials
            || config.endpoints.identity_base_url != self.config.endpoints.identity_base_url
            || config.endpoints.api_base_url != self.config.endpoints.api_base_url
            || config.endpoints.http_timeout_secs != self.config.endpoints.http_timeout_secs
            || config.auth.use_refresh_token != self.config.auth.use_refresh_token;

        if session_changed {
            self.logger
                .info("Account or endpoints changed, dropping cached session");
            self.auth = AuthSession::new(&config, self.clock.clone());
            self.sync = DeviceSync::new(&config);
            self.credentials = Credentials::from(&config.credentials);
            self.logger = plugin_logger(&config);
        }

        self.config = config;
        self.host.request_heartbeat(self.config.poll_interval()).await;
        Ok(())
    }

    /// One poll cycle: token, dashboard, energy
    pub async fn on_heartbeat(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let token = match self.auth.ensure_token(&self.credentials).await {
            Ok(token) => token,
            Err(e) => {
                // Transient token failures are retried next cycle without alarming the host
                if !e.is_transient() {
                    self.host.report_error(&e.to_string()).await;
                }
                return self.finish(report, Some(e));
            }
        };
        report.authenticated = true;

        let mut failure = None;
        let mut refused = false;
        match self.sync.fetch_dashboard(&token).await {
            Ok(snapshot) => match self.sync.push_snapshot(&mut self.host, &snapshot).await {
                Ok(changed) => {
                    report.dashboard_pushed = true;
                    report.slots_changed += changed;
                }
                Err(e) => {
                    self.logger.error(&format!("Updating slots failed: {}", e));
                    failure = Some(e);
                }
            },
            Err(e) => {
                self.logger.error(&format!("Dashboard read failed: {}", e));
                refused |= e.is_unauthorized();
                failure = Some(e);
            }
        }

        if self.config.energy.enabled {
            let local = self.clock.now().with_timezone(&self.config.tz());
            if in_quiet_hours(local.hour()) {
                self.logger.debug(&format!(
                    "Skipping energy update during quiet hours (local {})",
                    local.format("%H:%M")
                ));
                report.energy_skipped_quiet_hours = true;
            } else if let Some(appliance_id) = self.sync.appliance_id().map(str::to_string) {
                match self
                    .sync
                    .fetch_energy(&token, &appliance_id, local.date_naive())
                    .await
                {
                    Ok(aggregate) => match self.sync.push_energy(&mut self.host, &aggregate).await {
                        Ok(changed) => {
                            report.energy_pushed = true;
                            report.slots_changed += changed;
                        }
                        Err(e) => {
                            self.logger.error(&format!("Updating meters failed: {}", e));
                            failure = failure.or(Some(e));
                        }
                    },
                    Err(e) => {
                        self.logger.error(&format!("Energy read failed: {}", e));
                        refused |= e.is_unauthorized();
                        failure = failure.or(Some(e));
                    }
                }
            }
        }

        if refused {
            self.logger
                .warn("Access token refused by the API, logging in again next cycle");
            self.auth.invalidate();
        }

        self.finish(report, failure)
    }

    fn finish(&mut self, mut report: CycleReport, failure: Option<RemehaError>) -> CycleReport {
        match failure {
            Some(e) => {
                report.error = Some(e.to_string());
                self.state = PluginState::Error(e.to_string());
            }
            None => {
                if self.state != PluginState::Stopped {
                    self.state = PluginState::Running;
                }
            }
        }
        report
    }

    /// Handle a device command from the host
    pub async fn on_command(&mut self, unit: u8, command: &str, level: f64) -> Result<()> {
        self.logger.debug(&format!(
            "Command '{}' level {} for unit {}",
            command, level, unit
        ));
        let result = self.apply_command(unit, command, level).await;
        if let Err(e) = &result {
            self.logger.error(&format!("Command failed: {}", e));
            self.host.report_error(&e.to_string()).await;
        }
        result
    }

    async fn apply_command(&mut self, unit: u8, command: &str, level: f64) -> Result<()> {
        if !command.trim().eq_ignore_ascii_case(SET_LEVEL) {
            return Err(RemehaError::validation(
                "command",
                format!("unsupported command '{}'", command),
            ));
        }
        let slot = Slot::from_unit(unit).ok_or_else(|| {
            RemehaError::validation("unit", format!("unknown unit {}", unit))
        })?;

        match slot {
            Slot::Setpoint => {
                if !level.is_finite() {
                    return Err(RemehaError::validation("level", "setpoint must be a number"));
                }
                let token = self.auth.ensure_token(&self.credentials).await?;
                self.sync.set_temperature(&token, level).await?;
                self.host
                    .update_slot(Slot::Setpoint, SlotValue::Number(level))
                    .await
            }
            Slot::ZoneMode => {
                let selector = selector_level(level)?;
                if ZoneMode::from_selector_level(selector).is_none() {
                    return Err(RemehaError::validation(
                        "level",
                        format!("no zone mode for selector level {}", selector),
                    ));
                }
                let token = self.auth.ensure_token(&self.credentials).await?;
                self.sync.set_zone_mode(&token, selector).await?;
                self.host
                    .update_slot(Slot::ZoneMode, SlotValue::Level(selector))
                    .await
            }
            other => Err(RemehaError::validation(
                "unit",
                format!("unit {} ({}) is read-only", unit, other.name()),
            )),
        }
    }

    /// Run standalone: heartbeat on every poll interval until shutdown
    pub async fn run(
        &mut self,
        mut commands_rx: mpsc::UnboundedReceiver<HostCommand>,
        mut shutdown_rx: mpsc::UnboundedReceiver<()>,
    ) -> Result<()> {
        self.on_start().await?;

        let mut period = self.config.poll_interval();
        let mut ticker = interval_at(Instant::now(), period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.on_heartbeat().await;
                    if let Some(err) = &report.error {
                        // Continue polling even on errors
                        self.logger.warn(&format!("Poll cycle finished with error: {}", err));
                    }
                }
                Some(cmd) = commands_rx.recv() => {
                    self.handle_command(cmd).await;
                    let wanted = self.config.poll_interval();
                    if wanted != period {
                        period = wanted;
                        ticker = interval_at(Instant::now() + period, period);
                        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    }
                }
                _ = shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.on_stop().await;
        Ok(())
    }
}

fn plugin_logger(config: &Config) -> StructuredLogger {
    get_logger_with_context(
        LogContext::new("plugin").with_account(config.credentials.email.trim()),
    )
}

/// Selector levels are whole numbers in 0..=255
fn selector_level(level: f64) -> Result<u8> {
    if !level.is_finite() || level.fract() != 0.0 || !(0.0..=255.0).contains(&level) {
        return Err(RemehaError::validation(
            "level",
            format!("{} is not a selector level", level),
        ));
    }
    Ok(level as u8)
}
