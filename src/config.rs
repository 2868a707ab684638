use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub encryption_key: String,
    pub openai_api_key: String,
    pub uploads_dir: String,
    pub public_rps: u32,
    pub login_rps: u32,
    pub ingest_workers: usize,
    pub mail_gateway_url: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            encryption_key: get_env("ENCRYPTION_KEY")?,
            openai_api_key: get_env("OPENAI_API_KEY")?,
            uploads_dir: get_env("UPLOADS_DIR")?,
            public_rps: get_env_parse("PUBLIC_RPS")?,
            login_rps: get_env_parse("LOGIN_RPS")?,
            ingest_workers: get_env_parse("INGEST_WORKERS")?,
            mail_gateway_url: env::var("MAIL_GATEWAY_URL").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
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
