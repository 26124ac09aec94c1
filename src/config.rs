use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Bedboard";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Staff identifier recorded when an assign request names nobody.
pub const DEFAULT_ASSIGNED_BY: &str = "system";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

pub const ENV_DB_PATH: &str = "BEDBOARD_DB_PATH";
pub const ENV_BIND_ADDR: &str = "BEDBOARD_BIND_ADDR";
pub const ENV_DEPARTMENT_POLICY: &str = "BEDBOARD_DEPARTMENT_POLICY";

/// Get the application data directory
/// `<platform data dir>/bedboard`, falling back to the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bedboard")
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("bedboard.db")
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "bedboard_lib=info,tower_http=info"
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// What to do when a bed belongs to a department and the patient has none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepartmentPolicy {
    /// Skip the department check.
    #[default]
    AllowUnassigned,
    /// Reject with "patient has no department".
    RequireDepartment,
}

impl DepartmentPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllowUnassigned => "allow_unassigned",
            Self::RequireDepartment => "require_department",
        }
    }
}

impl FromStr for DepartmentPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "allow_unassigned" => Ok(Self::AllowUnassigned),
            "require_department" => Ok(Self::RequireDepartment),
            other => Err(ConfigError::InvalidValue {
                var: ENV_DEPARTMENT_POLICY,
                value: other.into(),
            }),
        }
    }
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub department_policy: DepartmentPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Unset or blank variables take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let db_path = get(ENV_DB_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let raw_addr = get(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                var: ENV_BIND_ADDR,
                value: raw_addr.clone(),
            })?;

        let department_policy = match get(ENV_DEPARTMENT_POLICY) {
            Some(value) => value.parse()?,
            None => DepartmentPolicy::default(),
        };

        Ok(Self {
            db_path,
            bind_addr,
            department_policy,
        })
    }
}
