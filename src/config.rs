use std::env;
use std::path::PathBuf;

// Defaults
const DATA_FILE: &str = "data/WMS.xlsm";
const SHEET_NAME: &str = "WMS";
const USERS_FILE: &str = "database/users.json";
const BIND_ADDR: &str = "127.0.0.1:3000";

/// Runtime settings, taken from the environment (and `.env`) with fixed defaults.
///
/// | variable         | default               |
/// |------------------|-----------------------|
/// | `WMS_DATA_FILE`  | `data/WMS.xlsm`       |
/// | `WMS_SHEET`      | `WMS`                 |
/// | `WMS_USERS_FILE` | `database/users.json` |
/// | `WMS_BIND`       | `127.0.0.1:3000`      |
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub data_file: PathBuf,
    pub sheet_name: String,
    pub users_file: PathBuf,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_file: PathBuf::from(DATA_FILE),
            sheet_name: SHEET_NAME.to_string(),
            users_file: PathBuf::from(USERS_FILE),
            bind_addr: BIND_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source; blank values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        Config {
            data_file: get("WMS_DATA_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_file),
            sheet_name: get("WMS_SHEET").unwrap_or(defaults.sheet_name),
            users_file: get("WMS_USERS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.users_file),
            bind_addr: get("WMS_BIND").unwrap_or(defaults.bind_addr),
        }
    }
}
