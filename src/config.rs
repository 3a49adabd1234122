use crate::errors::{EngineError, EngineResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Empty when unset; the narrative client then answers with its fallback text.
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub risk_free_rate: f64,
    pub default_days_to_expiry: u32,
    pub default_quantity: u32,
    pub default_underlying: String,
    pub dashboard_dir: PathBuf,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let risk_free_rate = env_var_or("RISK_FREE_RATE", "0.1075")
            .parse::<f64>()
            .map_err(|e| EngineError::Config(format!("RISK_FREE_RATE: {e}")))?;

        let default_days_to_expiry = env_var_or("DEFAULT_DAYS_TO_EXPIRY", "20")
            .parse::<u32>()
            .map_err(|e| EngineError::Config(format!("DEFAULT_DAYS_TO_EXPIRY: {e}")))?;

        let default_quantity = env_var_or("DEFAULT_QUANTITY", "100")
            .parse::<u32>()
            .map_err(|e| EngineError::Config(format!("DEFAULT_QUANTITY: {e}")))?;
        if default_quantity == 0 {
            return Err(EngineError::Config("DEFAULT_QUANTITY must be positive".into()));
        }

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        Ok(Self {
            gemini_api_key: env_var_or("GEMINI_API_KEY", ""),
            gemini_base_url: env_var_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            gemini_model: env_var_or("GEMINI_MODEL", "gemini-3-pro-preview"),
            risk_free_rate,
            default_days_to_expiry,
            default_quantity,
            default_underlying: env_var_or("DEFAULT_UNDERLYING", "PETR4"),
            dashboard_dir: PathBuf::from(env_var_or("DASHBOARD_DIR", "dashboard/dist")),
            server_port,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            gemini_model: "gemini-3-pro-preview".into(),
            risk_free_rate: 0.1075,
            default_days_to_expiry: 20,
            default_quantity: 100,
            default_underlying: "PETR4".into(),
            dashboard_dir: PathBuf::from("dashboard/dist"),
            server_port: 3001,
        }
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
