use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub sweeper: SweeperSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    #[serde(default = "default_access_token_expiry_mins")]
    pub access_token_expiry_mins: i64, // minutes (default 60)
    pub refresh_token_expiry_mins: i64, // minutes (e.g., 10080 for 7 days)
}

fn default_access_token_expiry_mins() -> i64 {
    60
}

impl JwtSettings {
    /// Reject an empty or missing signing key at startup.
    /// An unset key must never silently sign tokens.
    pub fn ensure_usable(&self) -> Result<(), crate::error::ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(crate::error::ConfigError::MissingRequired(
                "jwt.secret".to_string(),
            ));
        }
        if self.access_token_expiry_mins <= 0 || self.refresh_token_expiry_mins <= 0 {
            return Err(crate::error::ConfigError::InvalidValue(
                "token validity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn access_token_expiry_secs(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }
}

/// Expired refresh-token sweeper settings
#[derive(serde::Deserialize, Clone)]
pub struct SweeperSettings {
    /// Seconds between sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
    /// Tokens expired longer than this are reclaimed. The slack keeps
    /// near-boundary rows around for in-flight refresh calls, which reject
    /// them by expiry check anyway.
    #[serde(default = "default_sweep_grace_secs")]
    pub grace_secs: i64,
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_sweep_grace_secs() -> i64 {
    3600
}

impl Default for SweeperSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
            grace_secs: default_sweep_grace_secs(),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("STUDYTRACK")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
