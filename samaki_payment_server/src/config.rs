use std::env;

use daraja_tools::DarajaConfig;
use log::*;

const DEFAULT_SMK_HOST: &str = "127.0.0.1";
const DEFAULT_SMK_PORT: u16 = 8460;
/// The marketplace commission, in basis points. 200 = 2%.
const DEFAULT_PLATFORM_FEE_BPS: u32 = 200;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Platform commission applied to every order and line, in basis points.
    pub platform_fee_bps: u32,
    /// Gateway client configuration, including the callback URL the gateway posts results to.
    pub daraja: DarajaConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMK_HOST.to_string(),
            port: DEFAULT_SMK_PORT,
            database_url: String::default(),
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            daraja: DarajaConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SMK_HOST").ok().unwrap_or_else(|| DEFAULT_SMK_HOST.into());
        let port = env::var("SMK_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SMK_PORT. {e} Using the default, {DEFAULT_SMK_PORT}, instead."
                    );
                    DEFAULT_SMK_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SMK_PORT);
        let database_url = env::var("SMK_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SMK_DATABASE_URL is not set. Please set it to the URL for the marketplace database.");
            String::default()
        });
        let platform_fee_bps = env::var("SMK_PLATFORM_FEE_BPS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>()
                    .map_err(|e| warn!("🪛️ Invalid value for SMK_PLATFORM_FEE_BPS ({s}): {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(DEFAULT_PLATFORM_FEE_BPS);
        let daraja = DarajaConfig::new_from_env_or_default();
        if !daraja.has_public_callback_url() {
            warn!(
                "🚨️ DARAJA_CALLBACK_URL ('{}') is not publicly reachable. The gateway cannot post payment results \
                 there, so checkout requests will be refused until it points at a live public URL.",
                daraja.callback_url
            );
        }
        Self { host, port, database_url, platform_fee_bps, daraja }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that route handlers need per-request. Kept small, and free of secrets, so
/// it can be cloned into every worker.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    /// Whether the configured gateway callback URL is publicly reachable. Checkout is refused when it is not,
    /// since the gateway could never report payment results back.
    pub callback_url_public: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { callback_url_public: config.daraja.has_public_callback_url() }
    }
}
