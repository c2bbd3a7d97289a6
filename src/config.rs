use dotenv::dotenv;
use std::env;

pub const DEFAULT_THRESHOLD: usize = 300;
pub const MAX_THRESHOLD: usize = 2000;
pub const ARTICLES_PER_PAGE: usize = 10;

const PRODUCTION_API_ROOT: &str = "https://api.newdrugtargets.org";
const STAGING_API_ROOT: &str = "https://api-staging.newdrugtargets.org";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub environment: String,
    pub api_root: String,
    pub share_origin: String,
    pub disease_root_doid: String,
    pub request_timeout_secs: u64,
}

lazy_static::lazy_static! {
    pub static ref CONFIG: Config = Config::from_env();
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("TINX_ENV").unwrap_or_else(|| "development".to_string());

        let default_root = match environment.as_str() {
            "staging" => STAGING_API_ROOT,
            _ => PRODUCTION_API_ROOT,
        };

        let api_root = lookup("TINX_API_ROOT")
            .filter(|root| !root.trim().is_empty())
            .unwrap_or_else(|| default_root.to_string());

        Self {
            environment,
            api_root: api_root.trim_end_matches('/').to_string(),
            share_origin: lookup("TINX_SHARE_ORIGIN")
                .unwrap_or_else(|| "https://newdrugtargets.org".to_string()),
            disease_root_doid: lookup("TINX_DISEASE_ROOT").unwrap_or_else(|| "DOID:4".to_string()),
            request_timeout_secs: match lookup("TINX_REQUEST_TIMEOUT_SECS") {
                Some(val) => val.parse::<u64>().unwrap_or(30),
                None => 30,
            },
        }
    }

    pub fn uses_https(&self) -> bool {
        self.api_root.starts_with("https")
    }
}
