//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — PostgreSQL connection string (required to start)
/// - `PAYMENT_APPROVAL_RATE` — simulated gateway approval probability
///   (default: `0.8`)
/// - `ADMIN_TOKEN` — optional bootstrap bearer token with the admin role
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub payment_approval_rate: f64,
    pub admin_token: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: std::env::var("DATABASE_URL").ok(),
            payment_approval_rate: std::env::var("PAYMENT_APPROVAL_RATE")
                .ok()
                .and_then(|r| r.parse().ok())
                .unwrap_or(0.8),
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            payment_approval_rate: 0.8,
            admin_token: None,
        }
    }
}
