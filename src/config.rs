//! Runtime settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_PAGE_TTL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaBackend {
    Fs,
    S3,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub port: u16,
    pub page_cache_ttl: Duration,
    pub page_cache_max_entries: usize,
    pub media_backend: MediaBackend,
    pub media_root: PathBuf,
    /// Directory for the in-memory store's JSON snapshot; `None` keeps state in RAM only.
    pub data_dir: Option<PathBuf>,
    pub database_url: Option<String>,
    pub enable_hsts: bool,
    pub cors_origins: Vec<String>,
    /// Usernames that become admins when they sign up.
    pub bootstrap_admins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: 8080,
            page_cache_ttl: DEFAULT_PAGE_TTL,
            page_cache_max_entries: DEFAULT_MAX_ENTRIES,
            media_backend: MediaBackend::Fs,
            media_root: PathBuf::from("media"),
            data_dir: None,
            database_url: None,
            enable_hsts: false,
            cors_origins: Vec::new(),
            bootstrap_admins: Vec::new(),
        }
    }
}

fn list_env(name: &str) -> Vec<String> {
    env::var(name)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn flag_env(name: &str) -> bool {
    env::var(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(defaults.port),
            page_cache_ttl: env::var("PAGE_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.page_cache_ttl),
            page_cache_max_entries: env::var("PAGE_CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.page_cache_max_entries),
            media_backend: match env::var("MEDIA_BACKEND").as_deref() {
                Ok("s3") | Ok("S3") => MediaBackend::S3,
                _ => MediaBackend::Fs,
            },
            media_root: env::var("MEDIA_ROOT").map(PathBuf::from).unwrap_or(defaults.media_root),
            data_dir: env::var("YATUBE_DATA_DIR").ok().map(PathBuf::from),
            database_url: env::var("DATABASE_URL").ok(),
            enable_hsts: flag_env("ENABLE_HSTS"),
            cors_origins: list_env("CORS_ORIGINS"),
            bootstrap_admins: list_env("BOOTSTRAP_ADMIN_USERNAMES"),
        }
    }

    pub fn is_bootstrap_admin(&self, username: &str) -> bool {
        self.bootstrap_admins.iter().any(|u| u == username)
    }
}
