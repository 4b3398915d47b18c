use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub grid: GridConfig,
    pub item_api: ItemApiConfig,
    pub persistence: PersistenceConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Fridge interior constants the grid is derived from. Every client must use
/// the same table or stored positions stop lining up with cells.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridConfig {
    pub interior_width: f64,
    pub interior_height: f64,
    pub padding: f64,
    pub columns: u32,
    pub rows: u32,
    pub item_width: f64,
    pub item_height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub enable_request_logging: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            interior_width: 700.0,
            interior_height: 480.0,
            padding: 20.0,
            columns: 7,
            rows: 4,
            item_width: 64.0,
            item_height: 64.0,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Grid overrides
        if let Ok(v) = env::var("GRID_INTERIOR_WIDTH") {
            self.grid.interior_width = v.parse().unwrap_or(self.grid.interior_width);
        }
        if let Ok(v) = env::var("GRID_INTERIOR_HEIGHT") {
            self.grid.interior_height = v.parse().unwrap_or(self.grid.interior_height);
        }
        if let Ok(v) = env::var("GRID_PADDING") {
            self.grid.padding = v.parse().unwrap_or(self.grid.padding);
        }
        if let Ok(v) = env::var("GRID_COLUMNS") {
            self.grid.columns = v.parse().unwrap_or(self.grid.columns);
        }
        if let Ok(v) = env::var("GRID_ROWS") {
            self.grid.rows = v.parse().unwrap_or(self.grid.rows);
        }
        if let Ok(v) = env::var("GRID_ITEM_WIDTH") {
            self.grid.item_width = v.parse().unwrap_or(self.grid.item_width);
        }
        if let Ok(v) = env::var("GRID_ITEM_HEIGHT") {
            self.grid.item_height = v.parse().unwrap_or(self.grid.item_height);
        }

        // Item API overrides
        if let Ok(v) = env::var("ITEM_API_URL") {
            self.item_api.base_url = v;
        }
        if let Ok(v) = env::var("ITEM_API_TOKEN") {
            self.item_api.token = Some(v).filter(|t| !t.trim().is_empty());
        }
        if let Ok(v) = env::var("ITEM_API_TIMEOUT_SECS") {
            self.item_api.timeout_secs = v.parse().unwrap_or(self.item_api.timeout_secs);
        }

        // Persistence overrides
        if let Ok(v) = env::var("PERSIST_MAX_ATTEMPTS") {
            self.persistence.max_attempts = v.parse().unwrap_or(self.persistence.max_attempts);
        }
        if let Ok(v) = env::var("PERSIST_INITIAL_BACKOFF_MS") {
            self.persistence.initial_backoff_ms = v.parse().unwrap_or(self.persistence.initial_backoff_ms);
        }
        if let Ok(v) = env::var("PERSIST_MAX_BACKOFF_MS") {
            self.persistence.max_backoff_ms = v.parse().unwrap_or(self.persistence.max_backoff_ms);
        }
        if let Ok(v) = env::var("PERSIST_BACKOFF_MULTIPLIER") {
            self.persistence.backoff_multiplier = v.parse().unwrap_or(self.persistence.backoff_multiplier);
        }

        // Server overrides
        if let Ok(v) = env::var("FRIDGE_LAYOUT_PORT").or_else(|_| env::var("PORT")) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_ENABLE_CORS") {
            self.server.enable_cors = v.parse().unwrap_or(self.server.enable_cors);
        }
        if let Ok(v) = env::var("SERVER_CORS_ORIGINS") {
            self.server.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SERVER_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            grid: GridConfig::default(),
            item_api: ItemApiConfig {
                base_url: "http://localhost:3001/api".to_string(),
                token: None,
                timeout_secs: 10,
            },
            persistence: PersistenceConfig {
                max_attempts: 3,
                initial_backoff_ms: 200,
                max_backoff_ms: 2_000,
                backoff_multiplier: 2.0,
            },
            server: ServerConfig {
                port: 3002,
                enable_cors: true,
                cors_origins: vec!["http://localhost:5173".to_string()],
                enable_request_logging: true,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            grid: GridConfig::default(),
            item_api: ItemApiConfig {
                base_url: "https://staging.example.com/api".to_string(),
                token: None,
                timeout_secs: 5,
            },
            persistence: PersistenceConfig {
                max_attempts: 5,
                initial_backoff_ms: 250,
                max_backoff_ms: 8_000,
                backoff_multiplier: 2.0,
            },
            server: ServerConfig {
                port: 3002,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                enable_request_logging: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            grid: GridConfig::default(),
            item_api: ItemApiConfig {
                base_url: "https://app.example.com/api".to_string(),
                token: None,
                timeout_secs: 5,
            },
            persistence: PersistenceConfig {
                max_attempts: 6,
                initial_backoff_ms: 500,
                max_backoff_ms: 30_000,
                backoff_multiplier: 2.0,
            },
            server: ServerConfig {
                port: 3002,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                enable_request_logging: false,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
