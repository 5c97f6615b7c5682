use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `GET /homes/dashboard`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub appliances: Vec<ApplianceDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplianceDto {
    #[serde(default, deserialize_with = "lenient_id")]
    pub appliance_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub outdoor_temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub outdoor_temperature_information: Option<OutdoorTemperatureInformation>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub water_pressure: Option<f64>,
    #[serde(default, rename = "waterPressureOK", deserialize_with = "lenient")]
    pub water_pressure_ok: Option<bool>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub gas_calorific_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub active_thermal_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub climate_zones: Vec<ClimateZoneDto>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub hot_water_zones: Vec<HotWaterZoneDto>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutdoorTemperatureInformation {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cloud_outdoor_temperature: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClimateZoneDto {
    #[serde(default, deserialize_with = "lenient_id")]
    pub climate_zone_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub room_temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub set_point: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub zone_mode: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub active_heating_climate_time_program_number: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotWaterZoneDto {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub dhw_temperature: Option<f64>,
}

/// `GET /appliances/{id}/energyconsumption/{period}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnergySeries {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub data: Vec<EnergyEntry>,
}

/// One bucket of an energy series, in kWh
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyEntry {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub heating_energy_consumed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub heating_energy_delivered: Option<f64>,
}

/// Operating mode of a climate zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneMode {
    Scheduling,
    Manual,
    TemporaryOverride,
    FrostProtection,
    /// Any value the vendor sends that is not mapped to a selector level
    Unknown(String),
}

impl ZoneMode {
    pub fn from_vendor(value: &str) -> Self {
        match value {
            "Scheduling" => ZoneMode::Scheduling,
            "Manual" => ZoneMode::Manual,
            "TemporaryOverride" => ZoneMode::TemporaryOverride,
            "FrostProtection" => ZoneMode::FrostProtection,
            other => ZoneMode::Unknown(other.to_string()),
        }
    }

    pub fn as_vendor(&self) -> &str {
        match self {
            ZoneMode::Scheduling => "Scheduling",
            ZoneMode::Manual => "Manual",
            ZoneMode::TemporaryOverride => "TemporaryOverride",
            ZoneMode::FrostProtection => "FrostProtection",
            ZoneMode::Unknown(s) => s,
        }
    }

    /// Selector level on the host's mode switch
    pub fn selector_level(&self) -> Option<u8> {
        match self {
            ZoneMode::Scheduling => Some(0),
            ZoneMode::Manual => Some(10),
            ZoneMode::TemporaryOverride => Some(20),
            ZoneMode::FrostProtection => Some(30),
            ZoneMode::Unknown(_) => None,
        }
    }

    pub fn from_selector_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(ZoneMode::Scheduling),
            10 => Some(ZoneMode::Manual),
            20 => Some(ZoneMode::TemporaryOverride),
            30 => Some(ZoneMode::FrostProtection),
            _ => None,
        }
    }

    /// Path segment under `climate-zones/{id}/modes/`
    pub fn endpoint(&self) -> Option<&'static str> {
        match self {
            ZoneMode::Scheduling => Some("schedule"),
            ZoneMode::Manual => Some("manual"),
            ZoneMode::TemporaryOverride => Some("temporary-override"),
            ZoneMode::FrostProtection => Some("anti-frost"),
            ZoneMode::Unknown(_) => None,
        }
    }
}

impl std::fmt::Display for ZoneMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_vendor())
    }
}

/// Telemetry of the first appliance and its first zones.
///
/// Every telemetry field is optional; `None` means the slot is left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplianceSnapshot {
    pub appliance_id: String,
    pub climate_zone_id: String,
    pub room_temperature: Option<f64>,
    pub outdoor_temperature: Option<f64>,
    pub water_pressure: Option<f64>,
    pub water_pressure_ok: Option<bool>,
    pub set_point: Option<f64>,
    pub zone_mode: Option<ZoneMode>,
    pub dhw_temperature: Option<f64>,
    pub gas_calorific_value: Option<f64>,
    pub active_thermal_mode: Option<String>,
    pub heating_program_id: Option<u32>,
}

/// Energy totals in Wh
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnergyAggregate {
    pub today_consumed: f64,
    pub today_delivered: f64,
    pub year_to_date_consumed: f64,
    pub year_to_date_delivered: f64,
}

impl EnergyAggregate {
    pub fn consumed(&self) -> MeterReading {
        MeterReading {
            today: self.today_consumed,
            total: self.year_to_date_consumed,
        }
    }

    pub fn delivered(&self) -> MeterReading {
        MeterReading {
            today: self.today_delivered,
            total: self.year_to_date_delivered,
        }
    }
}

/// Value pair of a host energy meter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterReading {
    pub today: f64,
    pub total: f64,
}

// Vendor payloads drift: a field of the wrong shape reads as absent, never
// as a failed dashboard.

// Ids are GUID strings today; accept numbers too
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|f| f.is_finite()))
}

fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// `null` or a non-array is an empty list; malformed elements are dropped
fn lenient_vec<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}
