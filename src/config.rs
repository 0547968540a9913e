use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_session_secret() -> String {
    // DEMO ONLY: override via POLLBOX_SESSION_SECRET in any real deployment.
    "demo-secret-key-change-me".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Set to "production" for JSON logging and Secure session cookies.
    #[serde(default)]
    pub env: String,
    /// HMAC key for session token signing.
    #[serde(default = "default_session_secret")]
    pub session_secret: String,
    /// When true, only admin accounts may create polls.
    #[serde(default)]
    pub admin_only_poll_creation: bool,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }
}
