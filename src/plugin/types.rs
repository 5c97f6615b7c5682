use crate::config::Config;

/// Plugin lifecycle state
#[derive(Debug, Clone, PartialEq)]
pub enum PluginState {
    /// Created, `on_start` not called yet
    Idle,
    /// Slots exist and heartbeats are processed
    Running,
    /// Last cycle or command failed
    Error(String),
    /// `on_stop` was called
    Stopped,
}

/// Outcome of one heartbeat cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub authenticated: bool,
    pub dashboard_pushed: bool,
    /// Slots whose value changed this cycle
    pub slots_changed: usize,
    pub energy_pushed: bool,
    pub energy_skipped_quiet_hours: bool,
    pub error: Option<String>,
}

/// Events delivered to the run loop
#[derive(Debug, Clone)]
pub enum HostCommand {
    /// Device command from the host UI, e.g. `Set Level` on a unit
    Command {
        unit: u8,
        command: String,
        level: f64,
    },
    Reconfigure(Box<Config>),
}
