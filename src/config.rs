// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/lead_router.toml";
pub const ENV_CONFIG_PATH: &str = "LEAD_ROUTER_CONFIG_PATH";
pub const ENV_ADMIN_TOKEN: &str = "LEAD_ROUTER_ADMIN_TOKEN";
pub const ENV_WEBHOOK_SECRET: &str = "LEAD_ROUTER_WEBHOOK_SECRET";

fn default_calendar_url() -> String {
    "https://calendly.com/".to_string()
}
fn default_calendar_source() -> String {
    "calendly".to_string()
}
fn default_owner() -> String {
    "system".to_string()
}
fn default_timeout_ms() -> u64 {
    5_000
}
fn default_pending_ttl_secs() -> u64 {
    24 * 3600
}
fn default_sweep_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CalendarConfig {
    /// Scheduling page prospects are redirected to.
    #[serde(default = "default_calendar_url")]
    pub url: String,
    /// Recorded as `source` on materialized meetings.
    #[serde(default = "default_calendar_source")]
    pub source: String,
    /// Placeholder owner for meetings nobody else is attributed to.
    #[serde(default = "default_owner")]
    pub default_owner: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            url: default_calendar_url(),
            source: default_calendar_source(),
            default_owner: default_owner(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStoreMode {
    /// Meetings live in this process.
    #[default]
    Local,
    /// Meetings are created through a remote Meeting API.
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeetingStoreConfig {
    #[serde(default)]
    pub mode: MeetingStoreMode,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Deadline for the materializer's outbound call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for MeetingStoreConfig {
    fn default() -> Self {
        Self {
            mode: MeetingStoreMode::Local,
            base_url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl MeetingStoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookingConfig {
    /// Pending sessions older than this are expired. 0 disables expiry.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecretsConfig {
    /// Admin bearer token. "ENV" means: read from LEAD_ROUTER_ADMIN_TOKEN.
    #[serde(default)]
    pub admin_token: Option<String>,
    /// Calendar webhook secret. "ENV" means: read from LEAD_ROUTER_WEBHOOK_SECRET.
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub meeting_store: MeetingStoreConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
    /// Optional JSON file with investors and clients loaded at boot.
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig = toml::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.finish()
    }

    /// Load using env var + fallbacks:
    /// 1) $LEAD_ROUTER_CONFIG_PATH (must exist)
    /// 2) config/lead_router.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        AppConfig::default().finish()
    }

    /// Resolve "ENV" secrets and sanitize out-of-range values.
    fn finish(mut self) -> Result<Self> {
        self.secrets.admin_token = resolve_secret(self.secrets.admin_token.take(), ENV_ADMIN_TOKEN)?;
        self.secrets.webhook_secret =
            resolve_secret(self.secrets.webhook_secret.take(), ENV_WEBHOOK_SECRET)?;

        if self.meeting_store.timeout_ms == 0 {
            self.meeting_store.timeout_ms = default_timeout_ms();
        }
        if self.booking.sweep_interval_secs == 0 {
            self.booking.sweep_interval_secs = default_sweep_interval_secs();
        }
        if self.calendar.source.trim().is_empty() {
            self.calendar.source = default_calendar_source();
        }
        if self.calendar.default_owner.trim().is_empty() {
            self.calendar.default_owner = default_owner();
        }
        if self.meeting_store.mode == MeetingStoreMode::Http
            && self
                .meeting_store
                .base_url
                .as_deref()
                .map_or(true, |u| u.trim().is_empty())
        {
            return Err(anyhow!(
                "meeting_store.mode = \"http\" requires meeting_store.base_url"
            ));
        }
        Ok(self)
    }
}

/// `"ENV"` (any case) is replaced by the value of `var`; blank values become `None`.
fn resolve_secret(raw: Option<String>, var: &str) -> Result<Option<String>> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.eq_ignore_ascii_case("env") => {
            let val = std::env::var(var).map_err(|_| anyhow!("Missing {var} env var"))?;
            Ok(Some(val).filter(|s| !s.trim().is_empty()))
        }
        Some(v) => Ok(Some(v.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        let cfg = cfg.finish().unwrap();
        assert_eq!(cfg.calendar.source, "calendly");
        assert_eq!(cfg.calendar.default_owner, "system");
        assert_eq!(cfg.meeting_store.mode, MeetingStoreMode::Local);
        assert_eq!(cfg.booking.pending_ttl_secs, 86_400);
        assert!(cfg.secrets.admin_token.is_none());
    }

    #[test]
    fn zero_values_are_sanitized() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [meeting_store]
            timeout_ms = 0
            [booking]
            sweep_interval_secs = 0
            pending_ttl_secs = 0
            "#,
        )
        .unwrap();
        let cfg = cfg.finish().unwrap();
        assert_eq!(cfg.meeting_store.timeout_ms, 5_000);
        assert_eq!(cfg.booking.sweep_interval_secs, 300);
        // 0 ttl is meaningful (disabled) and kept
        assert_eq!(cfg.booking.pending_ttl_secs, 0);
    }

    #[test]
    fn http_mode_requires_base_url() {
        let cfg: AppConfig = toml::from_str("[meeting_store]\nmode = \"http\"").unwrap();
        assert!(cfg.finish().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn env_secrets_are_resolved() {
        env::set_var(ENV_ADMIN_TOKEN, "from-env");
        let cfg: AppConfig = toml::from_str("[secrets]\nadmin_token = \"ENV\"").unwrap();
        let cfg = cfg.finish().unwrap();
        assert_eq!(cfg.secrets.admin_token.as_deref(), Some("from-env"));

        env::remove_var(ENV_ADMIN_TOKEN);
        let cfg: AppConfig = toml::from_str("[secrets]\nadmin_token = \"env\"").unwrap();
        assert!(cfg.finish().is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD in a temp dir so the repo's real config/ does not interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        // No files -> defaults
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg, AppConfig::default().finish().unwrap());

        // Env path wins
        let p = tmp.path().join("custom.toml");
        fs::write(&p, "[calendar]\nsource = \"savvycal\"").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.calendar.source, "savvycal");

        // Env path pointing nowhere is an error
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(AppConfig::load_default().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
