use std::env;

use bistro_common::{parse_boolean_flag, Secret};
use bistro_gateways::config::{EsewaConfig, KhaltiConfig};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

const DEFAULT_BISTRO_HOST: &str = "127.0.0.1";
const DEFAULT_BISTRO_PORT: u16 = 4000;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// When set, the order-ready notification hook is not installed. Lifecycle transitions still work; nothing gets
    /// paged.
    pub disable_notifications: bool,
    pub auth: AuthConfig,
    pub esewa: EsewaConfig,
    pub khalti: KhaltiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BISTRO_HOST.to_string(),
            port: DEFAULT_BISTRO_PORT,
            database_url: String::default(),
            disable_notifications: false,
            auth: AuthConfig::default(),
            esewa: EsewaConfig::default(),
            khalti: KhaltiConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BISTRO_HOST").ok().unwrap_or_else(|| DEFAULT_BISTRO_HOST.into());
        let port = env::var("BISTRO_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for BISTRO_PORT. {e} Using the default, {DEFAULT_BISTRO_PORT}, \
                         instead."
                    );
                    DEFAULT_BISTRO_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BISTRO_PORT);
        let database_url = env::var("BISTRO_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ BISTRO_DATABASE_URL is not set. Please set it to the URL for the orders database.");
            String::default()
        });
        let disable_notifications = parse_boolean_flag(env::var("BISTRO_DISABLE_NOTIFICATIONS").ok(), false);
        Self {
            host,
            port,
            database_url,
            disable_notifications,
            auth: AuthConfig::from_env_or_default(),
            esewa: EsewaConfig::from_env_or_default(),
            khalti: KhaltiConfig::from_env_or_default(),
        }
    }
}

/// Access-token verification configuration. The server only *verifies* tokens; issuing them is the identity
/// service's job, and the two sides share `BISTRO_JWT_SECRET`.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🪛️ BISTRO_JWT_SECRET is not set. Generating a random secret; tokens will not survive a restart and \
             cannot be issued by an external identity service."
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn from_env_or_default() -> Self {
        match env::var("BISTRO_JWT_SECRET") {
            Ok(s) if s.len() >= 32 => Self { jwt_secret: Secret::new(s) },
            Ok(_) => {
                error!("🪛️ BISTRO_JWT_SECRET must be at least 32 characters. Falling back to a random secret.");
                Self::default()
            },
            Err(_) => Self::default(),
        }
    }
}
