use std::env;
use std::time::Duration;
use thiserror::Error;

use crate::api_connection::GatewaySettings;
use crate::cli::SettingsArgs;
use crate::location::Coordinates;
use crate::prompt_builder::SuggestionKind;
use crate::session::{ControllerSettings, MAX_REFRESH_INTERVAL};

pub const DEFAULT_API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("refresh interval must be between 1 and {max} seconds, got {0}", max = MAX_REFRESH_INTERVAL.as_secs())]
    InvalidRefreshInterval(u64),
}

/// Reads the completion API key from the named variable. A blank value
/// counts as missing.
pub fn load_api_key(env_var_name: &str) -> Result<String, ConfigError> {
    env::var(env_var_name)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingApiKey(env_var_name.to_string()))
}

/// Everything the binary needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub site_url: String,
    pub app_name: String,
    pub geocoder_url: String,
    pub user_agent: String,
    pub fixed_position: Option<Coordinates>,
    pub ip_location_url: Option<String>,
    pub refresh_interval: Duration,
    pub location_timeout: Duration,
    pub request_timeout: Duration,
    pub suggestion_kind: SuggestionKind,
}

impl Config {
    pub fn from_args(args: &SettingsArgs) -> Result<Self, ConfigError> {
        let api_key = load_api_key(&args.api_key_env)?;
        if args.refresh_secs == 0 || args.refresh_secs > MAX_REFRESH_INTERVAL.as_secs() {
            return Err(ConfigError::InvalidRefreshInterval(args.refresh_secs));
        }
        let fixed_position = match (args.lat, args.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        };

        Ok(Self {
            api_key,
            endpoint: args.endpoint.clone(),
            model: args.model.clone(),
            site_url: env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "RecipeMuse".to_string()),
            geocoder_url: args.geocoder_url.clone(),
            user_agent: format!("recipe_muse/{}", env!("CARGO_PKG_VERSION")),
            fixed_position,
            ip_location_url: args.ip_location_url.clone(),
            refresh_interval: Duration::from_secs(args.refresh_secs),
            location_timeout: Duration::from_secs(args.location_timeout_secs),
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            suggestion_kind: args.suggest.into(),
        })
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            site_url: self.site_url.clone(),
            app_name: self.app_name.clone(),
            temperature: None,
            max_tokens: None,
            request_timeout: self.request_timeout,
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            refresh_interval: self.refresh_interval,
            suggestion_kind: self.suggestion_kind,
        }
    }
}
