//! Dashboard and energy synchronisation with the vendor API
//!
//! [`DeviceSync`] reads the dashboard into an [`ApplianceSnapshot`], maps it
//! onto the host slots, aggregates the energy series and issues the zone
//! control writes. It remembers the appliance and climate-zone ids from the
//! first successful dashboard read so that commands can be sent without
//! another lookup.

use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;

use crate::config::Config;
use crate::error::{RemehaError, Result};
use crate::host::{DeviceHost, Slot, SlotValue};
use crate::logging::{StructuredLogger, get_logger};

pub mod client;
pub mod energy;
pub mod types;

pub use client::VendorClient;
pub use energy::{EnergyPeriod, EnergyWindow, in_quiet_hours};
pub use types::{
    ApplianceSnapshot, DashboardResponse, EnergyAggregate, EnergyEntry, EnergySeries,
    MeterReading, ZoneMode,
};

/// Program used for `schedule` when the dashboard did not name one
pub const DEFAULT_HEATING_PROGRAM_ID: u32 = 1;

pub struct DeviceSync {
    api_base_url: String,
    http_timeout: Duration,
    appliance_id: Option<String>,
    climate_zone_id: Option<String>,
    heating_program_id: Option<u32>,
    last_zone_mode: Option<ZoneMode>,
    last_setpoint: Option<f64>,
    logger: StructuredLogger,
}

impl DeviceSync {
    pub fn new(config: &Config) -> Self {
        Self {
            api_base_url: config.endpoints.api_base_url.clone(),
            http_timeout: config.http_timeout(),
            appliance_id: None,
            climate_zone_id: None,
            heating_program_id: None,
            last_zone_mode: None,
            last_setpoint: None,
            logger: get_logger("sync"),
        }
    }

    pub fn appliance_id(&self) -> Option<&str> {
        self.appliance_id.as_deref()
    }

    pub fn climate_zone_id(&self) -> Option<&str> {
        self.climate_zone_id.as_deref()
    }

    pub fn last_zone_mode(&self) -> Option<&ZoneMode> {
        self.last_zone_mode.as_ref()
    }

    pub fn last_setpoint(&self) -> Option<f64> {
        self.last_setpoint
    }

    /// Forget ids and last known control state
    pub fn clear(&mut self) {
        self.appliance_id = None;
        self.climate_zone_id = None;
        self.heating_program_id = None;
        self.last_zone_mode = None;
        self.last_setpoint = None;
    }

    fn client(&self, token: &str) -> Result<VendorClient> {
        VendorClient::new(&self.api_base_url, token, self.http_timeout)
    }

    /// Read the dashboard of the first appliance
    pub async fn fetch_dashboard(&mut self, token: &str) -> Result<ApplianceSnapshot> {
        let client = self.client(token)?;
        let dashboard: DashboardResponse = client.get_json("homes/dashboard", &[]).await?;
        let snapshot = snapshot_from_dashboard(dashboard)?;

        if self.appliance_id.is_none() {
            self.logger.info(&format!(
                "Using appliance {} / climate zone {}",
                snapshot.appliance_id, snapshot.climate_zone_id
            ));
        }
        self.appliance_id = Some(snapshot.appliance_id.clone());
        self.climate_zone_id = Some(snapshot.climate_zone_id.clone());
        if snapshot.heating_program_id.is_some() {
            self.heating_program_id = snapshot.heating_program_id;
        }
        if snapshot.zone_mode.is_some() {
            self.last_zone_mode = snapshot.zone_mode.clone();
        }
        if snapshot.set_point.is_some() {
            self.last_setpoint = snapshot.set_point;
        }
        Ok(snapshot)
    }

    /// Push present snapshot fields; returns the number of slots changed
    pub async fn push_snapshot<H: DeviceHost + ?Sized>(
        &self,
        host: &mut H,
        snapshot: &ApplianceSnapshot,
    ) -> Result<usize> {
        let mut values: Vec<(Slot, SlotValue)> = Vec::new();
        let numbers = [
            (Slot::RoomTemperature, snapshot.room_temperature),
            (Slot::OutdoorTemperature, snapshot.outdoor_temperature),
            (Slot::WaterPressure, snapshot.water_pressure),
            (Slot::Setpoint, snapshot.set_point),
            (Slot::HotWaterTemperature, snapshot.dhw_temperature),
            (Slot::GasCalorificValue, snapshot.gas_calorific_value),
        ];
        for (slot, value) in numbers {
            if let Some(v) = value {
                values.push((slot, SlotValue::Number(v)));
            }
        }

        if let Some(mode) = &snapshot.zone_mode {
            match mode.selector_level() {
                Some(level) => values.push((Slot::ZoneMode, SlotValue::Level(level))),
                None => self
                    .logger
                    .warn(&format!("Unknown zone mode '{}', selector left as is", mode)),
            }
        }
        if let Some(ok) = snapshot.water_pressure_ok {
            values.push((Slot::WaterPressureAlarm, SlotValue::Alarm(!ok)));
        }
        if let Some(mode) = &snapshot.active_thermal_mode {
            values.push((Slot::ThermalMode, SlotValue::Text(mode.clone())));
        }

        push_changed(host, values).await
    }

    /// Aggregate the yearly, monthly and daily series for `today` (local date)
    pub async fn fetch_energy(
        &self,
        token: &str,
        appliance_id: &str,
        today: NaiveDate,
    ) -> Result<EnergyAggregate> {
        if appliance_id.trim().is_empty() {
            return Err(RemehaError::validation("appliance_id", "must not be empty"));
        }
        let client = self.client(token)?;
        let mut series: [Vec<EnergyEntry>; 3] = Default::default();
        for (i, window) in energy::windows(today).into_iter().enumerate() {
            let path = format!(
                "appliances/{}/energyconsumption/{}",
                appliance_id,
                window.period.path_segment()
            );
            let resp: EnergySeries = client
                .get_json(
                    &path,
                    &[
                        ("startDate", window.start.as_str()),
                        ("endDate", window.end.as_str()),
                    ],
                )
                .await?;
            self.logger.trace(&format!(
                "{} energy: {} entries",
                window.period.path_segment(),
                resp.data.len()
            ));
            series[i] = resp.data;
        }
        let [yearly, monthly, daily] = series;
        Ok(energy::aggregate(&yearly, &monthly, &daily))
    }

    pub async fn push_energy<H: DeviceHost + ?Sized>(
        &self,
        host: &mut H,
        aggregate: &EnergyAggregate,
    ) -> Result<usize> {
        push_changed(
            host,
            vec![
                (Slot::EnergyConsumed, SlotValue::Meter(aggregate.consumed())),
                (Slot::EnergyDelivered, SlotValue::Meter(aggregate.delivered())),
            ],
        )
        .await
    }

    /// Resolve the climate zone id, reading the dashboard if needed
    async fn ensure_zone(&mut self, token: &str) -> Result<String> {
        if let Some(id) = &self.climate_zone_id {
            return Ok(id.clone());
        }
        let snapshot = self.fetch_dashboard(token).await?;
        Ok(snapshot.climate_zone_id)
    }

    /// Change the setpoint within the current mode
    pub async fn set_temperature(&mut self, token: &str, setpoint: f64) -> Result<()> {
        if !setpoint.is_finite() {
            return Err(RemehaError::validation("setpoint", "must be a number"));
        }
        let zone_id = self.ensure_zone(token).await?;
        let mode = if self.last_zone_mode == Some(ZoneMode::Manual) {
            ZoneMode::Manual
        } else {
            ZoneMode::TemporaryOverride
        };
        self.post_mode(token, &zone_id, &mode, Some(setpoint)).await?;
        self.last_setpoint = Some(setpoint);
        self.logger
            .info(&format!("Setpoint set to {} ({})", setpoint, mode));
        Ok(())
    }

    /// Switch the zone to the mode behind a selector level
    pub async fn set_zone_mode(&mut self, token: &str, level: u8) -> Result<ZoneMode> {
        let mode = ZoneMode::from_selector_level(level).ok_or_else(|| {
            RemehaError::validation("level", format!("no zone mode for selector level {}", level))
        })?;
        let zone_id = self.ensure_zone(token).await?;
        let setpoint = match mode {
            ZoneMode::Manual | ZoneMode::TemporaryOverride => Some(self.last_setpoint.ok_or_else(
                || RemehaError::validation("setpoint", "no known setpoint for this mode"),
            )?),
            _ => None,
        };
        self.post_mode(token, &zone_id, &mode, setpoint).await?;
        self.logger.info(&format!("Zone mode set to {}", mode));
        self.last_zone_mode = Some(mode.clone());
        Ok(mode)
    }

    async fn post_mode(
        &self,
        token: &str,
        zone_id: &str,
        mode: &ZoneMode,
        setpoint: Option<f64>,
    ) -> Result<()> {
        let endpoint = mode
            .endpoint()
            .ok_or_else(|| RemehaError::validation("mode", format!("cannot set {}", mode)))?;
        let body = match mode {
            ZoneMode::Scheduling => Some(json!({
                "heatingProgramId": self.heating_program_id.unwrap_or(DEFAULT_HEATING_PROGRAM_ID)
            })),
            ZoneMode::Manual | ZoneMode::TemporaryOverride => {
                setpoint.map(|sp| json!({ "roomTemperatureSetPoint": sp }))
            }
            _ => None,
        };
        let client = self.client(token)?;
        client
            .post(&format!("climate-zones/{}/modes/{}", zone_id, endpoint), body.as_ref())
            .await
    }
}

async fn push_changed<H: DeviceHost + ?Sized>(
    host: &mut H,
    values: Vec<(Slot, SlotValue)>,
) -> Result<usize> {
    let mut changed = 0;
    for (slot, value) in values {
        if host.current_value(slot).await.as_ref() == Some(&value) {
            continue;
        }
        host.update_slot(slot, value).await?;
        changed += 1;
    }
    Ok(changed)
}

/// First appliance, first climate zone, first hot-water zone
pub fn snapshot_from_dashboard(dashboard: DashboardResponse) -> Result<ApplianceSnapshot> {
    let appliance = dashboard
        .appliances
        .into_iter()
        .next()
        .ok_or_else(|| RemehaError::decode("dashboard lists no appliances"))?;
    let appliance_id = appliance
        .appliance_id
        .ok_or_else(|| RemehaError::decode("appliance has no applianceId"))?;
    let zone = appliance
        .climate_zones
        .into_iter()
        .next()
        .ok_or_else(|| RemehaError::decode("appliance has no climate zones"))?;
    let climate_zone_id = zone
        .climate_zone_id
        .ok_or_else(|| RemehaError::decode("climate zone has no climateZoneId"))?;

    let outdoor_temperature = appliance.outdoor_temperature.or_else(|| {
        appliance
            .outdoor_temperature_information
            .and_then(|info| info.cloud_outdoor_temperature)
    });

    Ok(ApplianceSnapshot {
        appliance_id,
        climate_zone_id,
        room_temperature: zone.room_temperature,
        outdoor_temperature,
        water_pressure: appliance.water_pressure,
        water_pressure_ok: appliance.water_pressure_ok,
        set_point: zone.set_point,
        zone_mode: zone.zone_mode.as_deref().map(ZoneMode::from_vendor),
        dhw_temperature: appliance
            .hot_water_zones
            .first()
            .and_then(|z| z.dhw_temperature),
        gas_calorific_value: appliance.gas_calorific_value,
        active_thermal_mode: appliance.active_thermal_mode,
        heating_program_id: zone.active_heating_climate_time_program_number,
    })
}
