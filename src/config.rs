use anyhow::Result;
use std::env;
use std::path::PathBuf;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LARK_API_BASE_URL: &str = "https://open.larksuite.com";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub lark_app_id: Option<String>,
    pub lark_app_secret: Option<String>,
    pub lark_api_base_url: String,
    /// Shared secret for callback verification. `None` disables the check.
    pub verification_token: Option<String>,
    pub log_level: String,
    pub log_dir: PathBuf,
    pub log_retention_days: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            model: "gpt-5".to_string(),
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            lark_app_id: None,
            lark_app_secret: None,
            lark_api_base_url: DEFAULT_LARK_API_BASE_URL.to_string(),
            verification_token: None,
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            log_retention_days: 7,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self::from_inputs(EnvValues::from_env()))
    }

    /// Build a config from already-read environment values. Provider
    /// credentials are deliberately not validated here; a missing key
    /// surfaces as a provider-call error at request time.
    pub fn from_inputs(values: EnvValues) -> Self {
        let mut config = Self::default();

        if let Some(host) = values.host {
            config.host = host;
        }
        if let Some(port) = values.port.and_then(|raw| raw.parse().ok()) {
            config.port = port;
        }
        if let Some(model) = values.model {
            config.model = model;
        }
        config.openai_api_key = values.openai_api_key;
        if let Some(base_url) = values.openai_base_url {
            config.openai_base_url = base_url;
        }
        config.lark_app_id = values.lark_app_id;
        config.lark_app_secret = values.lark_app_secret;
        if let Some(base_url) = values.lark_api_base_url {
            config.lark_api_base_url = base_url;
        }
        config.verification_token = values.verification_token.filter(|token| !token.is_empty());
        if let Some(level) = values.log_level {
            config.log_level = level;
        }
        if let Some(dir) = values.log_dir {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(days) = values.log_retention_days.and_then(|raw| raw.parse().ok()) {
            config.log_retention_days = days;
        }

        config
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvValues {
    pub host: Option<String>,
    pub port: Option<String>,
    pub model: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub lark_app_id: Option<String>,
    pub lark_app_secret: Option<String>,
    pub lark_api_base_url: Option<String>,
    pub verification_token: Option<String>,
    pub log_level: Option<String>,
    pub log_dir: Option<String>,
    pub log_retention_days: Option<String>,
}

impl EnvValues {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").ok(),
            port: env::var("PORT").ok(),
            model: env::var("OPENAI_MODEL").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),
            lark_app_id: env::var("LARK_APP_ID").ok(),
            lark_app_secret: env::var("LARK_APP_SECRET").ok(),
            lark_api_base_url: env::var("LARK_API_BASE_URL").ok(),
            verification_token: env::var("LARK_VERIFICATION_TOKEN").ok(),
            log_level: env::var("LOG_LEVEL").ok(),
            log_dir: env::var("LOG_DIR").ok(),
            log_retention_days: env::var("LOG_RETENTION_DAYS").ok(),
        }
    }
}
