//! Settings for the application, read from `settings.toml` and overridden by
//! `SPLITROOM__*` environment variables (e.g. `SPLITROOM__SERVER__PORT=8080`).
use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
    /// Room every new user joins.
    pub default_room: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("settings").required(false))
                .add_source(
                    Environment::with_prefix("SPLITROOM")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
            .unwrap()
    }

    #[test]
    fn server_section_is_optional() {
        let settings = parse("[app]\nlevel = \"debug\"\n");
        assert_eq!(settings.app.level, "debug");
        assert!(settings.server.is_none());
    }

    #[test]
    fn database_variants() {
        let settings = parse(
            "[server]\nport = 3000\ndatabase = \"memory\"\ndefault_room = \"Lobby\"\n",
        );
        let server = settings.server.unwrap();
        assert_eq!(server.database, Database::Memory);
        assert_eq!(server.default_room.as_deref(), Some("Lobby"));
        assert_eq!(settings.app.level, "info");

        let settings = parse("[server]\nport = 3000\ndatabase = { sqlite = \"split.db\" }\n");
        assert_eq!(
            settings.server.unwrap().database,
            Database::Sqlite("split.db".to_string())
        );
    }
}
