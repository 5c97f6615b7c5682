use super::{HostCommand, RemehaPlugin};
use crate::host::DeviceHost;

impl<H: DeviceHost> RemehaPlugin<H> {
    pub(crate) async fn handle_command(&mut self, cmd: HostCommand) {
        match cmd {
            HostCommand::Command {
                unit,
                command,
                level,
            } => {
                // Failures are already logged and reported by on_command
                let _ = self.on_command(unit, &command, level).await;
            }
            HostCommand::Reconfigure(config) => {
                if let Err(e) = self.on_configuration_changed(*config).await {
                    self.logger
                        .error(&format!("Configuration change rejected: {}", e));
                }
            }
        }
    }
}
