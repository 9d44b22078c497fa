//! Process configuration, read once from the environment at startup

use crate::chat::SlackConfig;
use crate::vehicle::TelloConfig;

/// Everything the relay needs from its environment
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    /// Chat side (Slack Socket Mode)
    pub slack: SlackConfig,
    /// Vehicle side (Tello SDK)
    pub drone: TelloConfig,
}

impl RelayConfig {
    /// Build the configuration from process environment variables.
    ///
    /// Missing values are not rejected here; the collaborator reports them
    /// on first use.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("SLACK_TOKEN") {
            config.slack.app_token = v;
        }
        if let Some(v) = lookup("DRONE_PORT") {
            config.drone.local_port = v;
        }
        if let Some(v) = lookup("DRONE_ADDR") {
            config.drone.drone_address = v;
        }

        config
    }
}
