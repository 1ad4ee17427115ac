use crate::error::{Error, Result};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub meta_access_token: String,
    pub meta_phone_number_id: String,
    /// WhatsApp Business Account id. Only the template-listing endpoint
    /// needs it, so it is optional at startup and checked on that path.
    pub meta_waba_id: Option<String>,
    pub send_rps: u32,
    pub session_sweep_secs: u64,
    pub template_cost_estimate: Option<Decimal>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            meta_access_token: get_env("META_ACCESS_TOKEN")?,
            meta_phone_number_id: get_env("META_PHONE_NUMBER_ID")?,
            meta_waba_id: env::var("META_WABA_ID").ok(),
            send_rps: get_env_parse_or("SEND_RPS", 5)?,
            session_sweep_secs: get_env_parse_or("SESSION_SWEEP_SECS", 60)?,
            template_cost_estimate: match env::var("TEMPLATE_COST_ESTIMATE") {
                Ok(raw) => Some(raw.parse().map_err(|e| {
                    Error::Config(format!("Invalid value for TEMPLATE_COST_ESTIMATE: {}", e))
                })?),
                Err(_) => None,
            },
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
