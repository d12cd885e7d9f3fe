use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional append-only file receiving WARN and ERROR events.
    #[serde(default)]
    pub error_log: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            error_log: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
