use std::{collections::HashMap, fs};

use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Origin of the backend, e.g. `http://localhost`. Paths under `/api`
    /// are joined onto this.
    pub api_base_url: String,
    /// Sqlite url for durable session storage. `None` keeps the session
    /// in memory only.
    pub session_database_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost".into(),
            session_database_url: None,
        }
    }
}

impl Settings {
    pub fn api_base(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.api_base_url)
    }
}

/// Layered settings: defaults, then `client.toml` in the working
/// directory, then environment variables. Last writer wins.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("client.toml") {
        apply_toml(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("ORDER_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("ORDER_SESSION_DB") {
        settings.session_database_url = Some(v);
    }

    settings
}

fn apply_toml(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("api_base_url") {
            settings.api_base_url = v.clone();
        }
        if let Some(v) = file_cfg.get("session_database_url") {
            settings.session_database_url = Some(v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_localhost_with_no_persistence() {
        let settings = Settings::default();
        assert_eq!(settings.api_base_url, "http://localhost");
        assert!(settings.session_database_url.is_none());
        settings.api_base().expect("default base url parses");
    }

    #[test]
    fn toml_overrides_defaults() {
        let mut settings = Settings::default();
        apply_toml(
            &mut settings,
            "api_base_url = \"https://orders.example.com\"\nsession_database_url = \"sqlite://./data/client.db\"\n",
        );
        assert_eq!(settings.api_base_url, "https://orders.example.com");
        assert_eq!(
            settings.session_database_url.as_deref(),
            Some("sqlite://./data/client.db")
        );
    }

    #[test]
    fn malformed_toml_is_ignored() {
        let mut settings = Settings::default();
        apply_toml(&mut settings, "api_base_url = [not toml");
        assert_eq!(settings.api_base_url, "http://localhost");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let settings = Settings {
            api_base_url: "not a url".into(),
            session_database_url: None,
        };
        assert!(settings.api_base().is_err());
    }
}
