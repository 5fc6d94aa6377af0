//! Server configuration

use anyhow::Result;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub openfga: OpenFgaSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    pub session: SessionSettings,
    pub controller: ControllerSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenFgaSettings {
    pub api_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    pub store_id: String,
    #[serde(default)]
    pub authorization_model_id: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct CacheSettings {
    pub enabled: bool,
    pub max_capacity: u64,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 10_000,
            ttl_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: i64,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_secs: i64,
    #[serde(default = "default_secure_cookie")]
    pub secure_cookie: bool,
}

#[derive(Debug, Deserialize)]
pub struct ControllerSettings {
    pub uuid: Uuid,
    #[serde(default = "default_controller_name")]
    pub name: String,
    /// Identities granted administrator on the controller at startup
    #[serde(default)]
    pub admins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_path() -> String {
    corral_api::state::DEFAULT_BASE_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_issuer() -> String {
    "corral".to_string()
}

fn default_token_expiry() -> i64 {
    3600
}

fn default_cookie_name() -> String {
    "corral-browser-session".to_string()
}

fn default_cookie_max_age() -> i64 {
    6 * 3600
}

fn default_secure_cookie() -> bool {
    true
}

fn default_controller_name() -> String {
    "corral".to_string()
}

impl Settings {
    pub fn load() -> Result<Self> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // CORRAL__OPENFGA__STORE_ID and friends
            .add_source(
                config::Environment::with_prefix("CORRAL")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("controller.admins")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
