use std::{collections::HashMap, env, fs};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub session_db: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".into(),
            session_db: "sqlite://./data/session.db".into(),
        }
    }
}

/// Defaults, overridden by `departures.toml` in the working directory,
/// overridden by environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("departures.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = env::var("DEPARTURES_SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = env::var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Ok(v) = env::var("DEPARTURES_SESSION_DB") {
        settings.session_db = v;
    }
    if let Ok(v) = env::var("APP__SESSION_DB") {
        settings.session_db = v;
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("server_url") {
            settings.server_url = v.clone();
        }
        if let Some(v) = file_cfg.get("session_db") {
            settings.session_db = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_local_service() {
        let settings = Settings::default();
        assert_eq!(settings.server_url, "http://localhost:8080");
        assert_eq!(settings.session_db, "sqlite://./data/session.db");
    }

    #[test]
    fn file_config_overrides_known_keys_and_ignores_the_rest() {
        let mut settings = Settings::default();
        apply_file_config(
            &mut settings,
            "server_url = \"https://departures.example\"\nunrelated = \"x\"\n",
        );
        assert_eq!(settings.server_url, "https://departures.example");
        assert_eq!(settings.session_db, Settings::default().session_db);
    }

    #[test]
    fn malformed_file_config_leaves_defaults_untouched() {
        let mut settings = Settings::default();
        apply_file_config(&mut settings, "server_url = [not toml");
        assert_eq!(settings, Settings::default());
    }
}
