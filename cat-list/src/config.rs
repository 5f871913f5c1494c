//! Configuration for the cat list.
//!
//! Loads configuration from environment variables with sensible defaults.
//! The binary loads a `.env` file first, so the same names work there.

use crate::types::DEFAULT_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.thecatapi.com/v1";

/// Default cache file location, relative to the working directory
pub const DEFAULT_CACHE_PATH: &str = "cat-cache.json";

/// Default HTTP timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration could not be loaded
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Raw value found
        value: String,
    },
}

/// Cat list configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatListConfig {
    /// Remote API settings
    pub api: CatApiConfig,
    /// Cats per page (`CAT_LIST_PAGE_SIZE`, default 20)
    pub page_size: u32,
    /// Cache file (`CAT_LIST_CACHE_PATH`, default `cat-cache.json`)
    pub cache_path: PathBuf,
}

/// Remote API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatApiConfig {
    /// API root (`CAT_API_BASE_URL`)
    pub base_url: String,
    /// API key sent as `x-api-key` (`THECATAPI_KEY`); requests are anonymous without one
    pub api_key: Option<String>,
    /// Whole-request timeout in seconds (`CAT_API_TIMEOUT_SECS`)
    pub timeout_secs: u64,
}

impl Default for CatApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for CatListConfig {
    fn default() -> Self {
        Self {
            api: CatApiConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
        }
    }
}

impl CatListConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a numeric variable is set but
    /// is not a valid number, or if the page size is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`CatListConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let page_size = parse_or(&get, "CAT_LIST_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "CAT_LIST_PAGE_SIZE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            api: CatApiConfig {
                base_url: get("CAT_API_BASE_URL")
                    .map_or_else(|| DEFAULT_BASE_URL.to_string(), |url| {
                        url.trim_end_matches('/').to_string()
                    }),
                api_key: get("THECATAPI_KEY"),
                timeout_secs: parse_or(&get, "CAT_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            },
            page_size,
            cache_path: get("CAT_LIST_CACHE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH), PathBuf::from),
        })
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
