//! Host-side device registry
//!
//! The integration runs inside a home-automation host that owns the devices.
//! [`DeviceHost`] is the narrow surface the plugin needs from it; the
//! [`MemoryHost`] implementation backs the standalone binary and the tests.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::error::{RemehaError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::sync::MeterReading;

/// Fixed host slots, keyed by the host's unit number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    RoomTemperature = 1,
    OutdoorTemperature = 2,
    WaterPressure = 3,
    Setpoint = 4,
    ZoneMode = 5,
    WaterPressureAlarm = 6,
    ThermalMode = 7,
    HotWaterTemperature = 8,
    GasCalorificValue = 9,
    EnergyConsumed = 10,
    EnergyDelivered = 11,
}

/// Device type the host creates for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Temperature,
    Pressure,
    Thermostat,
    Selector,
    Alert,
    Text,
    Custom,
    EnergyMeter,
}

impl Slot {
    pub const ALL: [Slot; 11] = [
        Slot::RoomTemperature,
        Slot::OutdoorTemperature,
        Slot::WaterPressure,
        Slot::Setpoint,
        Slot::ZoneMode,
        Slot::WaterPressureAlarm,
        Slot::ThermalMode,
        Slot::HotWaterTemperature,
        Slot::GasCalorificValue,
        Slot::EnergyConsumed,
        Slot::EnergyDelivered,
    ];

    pub fn unit(self) -> u8 {
        self as u8
    }

    pub fn from_unit(unit: u8) -> Option<Slot> {
        Slot::ALL.into_iter().find(|s| s.unit() == unit)
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::RoomTemperature => "Room Temperature",
            Slot::OutdoorTemperature => "Outdoor Temperature",
            Slot::WaterPressure => "Water Pressure",
            Slot::Setpoint => "Setpoint",
            Slot::ZoneMode => "Zone Mode",
            Slot::WaterPressureAlarm => "Water Pressure Alarm",
            Slot::ThermalMode => "Thermal Mode",
            Slot::HotWaterTemperature => "Hot Water Temperature",
            Slot::GasCalorificValue => "Gas Calorific Value",
            Slot::EnergyConsumed => "Energy Consumed",
            Slot::EnergyDelivered => "Energy Delivered",
        }
    }

    pub fn kind(self) -> SlotKind {
        match self {
            Slot::RoomTemperature | Slot::OutdoorTemperature | Slot::HotWaterTemperature => {
                SlotKind::Temperature
            }
            Slot::WaterPressure => SlotKind::Pressure,
            Slot::Setpoint => SlotKind::Thermostat,
            Slot::ZoneMode => SlotKind::Selector,
            Slot::WaterPressureAlarm => SlotKind::Alert,
            Slot::ThermalMode => SlotKind::Text,
            Slot::GasCalorificValue => SlotKind::Custom,
            Slot::EnergyConsumed | Slot::EnergyDelivered => SlotKind::EnergyMeter,
        }
    }
}

/// Value held by a slot
#[derive(Debug, Clone, PartialEq)]
pub enum SlotValue {
    Number(f64),
    Level(u8),
    /// `true` raises the alarm
    Alarm(bool),
    Text(String),
    Meter(MeterReading),
}

impl SlotValue {
    /// Rendering used on the host wire (`sValue`)
    pub fn host_string(&self) -> String {
        match self {
            SlotValue::Number(v) => format_number(*v),
            SlotValue::Level(l) => l.to_string(),
            SlotValue::Alarm(true) => "Water pressure too low".to_string(),
            SlotValue::Alarm(false) => "Water pressure OK".to_string(),
            SlotValue::Text(s) => s.clone(),
            SlotValue::Meter(m) => format!("{};{}", format_number(m.today), format_number(m.total)),
        }
    }

    /// Numeric companion value (`nValue`)
    pub fn host_level(&self) -> i32 {
        match self {
            SlotValue::Level(l) => i32::from(*l),
            SlotValue::Alarm(true) => 4,
            SlotValue::Alarm(false) => 1,
            _ => 0,
        }
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

/// What the plugin needs from the host process
#[async_trait::async_trait]
pub trait DeviceHost: Send + Sync {
    /// Create the slot if the host does not have it yet
    async fn ensure_slot(&mut self, slot: Slot) -> Result<()>;
    async fn current_value(&self, slot: Slot) -> Option<SlotValue>;
    async fn update_slot(&mut self, slot: Slot, value: SlotValue) -> Result<()>;
    async fn report_error(&mut self, message: &str);
    async fn request_heartbeat(&mut self, interval: Duration);
}

/// In-process host keeping slots in a map
pub struct MemoryHost {
    slots: BTreeMap<Slot, Option<SlotValue>>,
    created: BTreeSet<Slot>,
    errors: Vec<String>,
    heartbeat: Option<Duration>,
    updates: u64,
    logger: StructuredLogger,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            created: BTreeSet::new(),
            errors: Vec::new(),
            heartbeat: None,
            updates: 0,
            logger: get_logger("host"),
        }
    }

    pub fn value(&self, slot: Slot) -> Option<&SlotValue> {
        self.slots.get(&slot).and_then(Option::as_ref)
    }

    pub fn has_slot(&self, slot: Slot) -> bool {
        self.created.contains(&slot)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn heartbeat(&self) -> Option<Duration> {
        self.heartbeat
    }

    /// Number of value changes applied so far
    pub fn update_count(&self) -> u64 {
        self.updates
    }
}

#[async_trait::async_trait]
impl DeviceHost for MemoryHost {
    async fn ensure_slot(&mut self, slot: Slot) -> Result<()> {
        if self.created.insert(slot) {
            self.slots.insert(slot, None);
            self.logger.debug(&format!(
                "Created unit {} '{}' ({:?})",
                slot.unit(),
                slot.name(),
                slot.kind()
            ));
        }
        Ok(())
    }

    async fn current_value(&self, slot: Slot) -> Option<SlotValue> {
        self.value(slot).cloned()
    }

    async fn update_slot(&mut self, slot: Slot, value: SlotValue) -> Result<()> {
        if !self.created.contains(&slot) {
            return Err(RemehaError::validation(
                "unit",
                format!("unit {} has not been created", slot.unit()),
            ));
        }
        self.logger.info(&format!(
            "{}: {} (nValue={})",
            slot.name(),
            value.host_string(),
            value.host_level()
        ));
        self.slots.insert(slot, Some(value));
        self.updates += 1;
        Ok(())
    }

    async fn report_error(&mut self, message: &str) {
        self.logger.error(message);
        self.errors.push(message.to_string());
    }

    async fn request_heartbeat(&mut self, interval: Duration) {
        self.heartbeat = Some(interval);
    }
}
