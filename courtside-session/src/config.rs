use std::env;
use std::io;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

macro_rules! from_environment {
    ($config:expr, $($key:expr, $name:tt),*$(,)?) => {{
        $(
            {
                if let Ok(value) = env::var($key) {
                    if let Ok(value) = value.parse() {
                        $config.$name = value;
                    }
                }
            }
        )*
    }};
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub loglevel: LevelFilter,
    pub store: Store,
    pub tournament: Tournament,
}

impl Config {
    pub async fn from_file<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let mut file = File::open(path).await?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;

        Ok(toml::from_slice(&buf)?)
    }

    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "CS_LOGLEVEL", loglevel);
        self.store = self.store.with_environment();
        self.tournament = self.tournament.with_environment();

        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            loglevel: LevelFilter::Info,
            store: Store::default(),
            tournament: Tournament::default(),
        }
    }
}

/// Location of the document store and the credential list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Store {
    pub root: PathBuf,
    pub users: PathBuf,
}

impl Store {
    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "CS_STORE_ROOT", root, "CS_STORE_USERS", users);

        self
    }
}

impl Default for Store {
    fn default() -> Self {
        Self {
            root: "store".into(),
            users: "users.json".into(),
        }
    }
}

/// The tournament this session edits.
///
/// `key` addresses the bracket document, `sport` addresses the contact
/// directory shared by every bracket of the same sport. `entrants` is only
/// used to seed the bracket on the first ever load.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Tournament {
    pub key: String,
    pub sport: String,
    #[serde(default)]
    pub entrants: Vec<String>,
}

impl Tournament {
    pub fn with_environment(mut self) -> Self {
        from_environment!(self, "CS_TOURNAMENT", key, "CS_SPORT", sport);

        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn test_config_parse() {
        let input = r#"
loglevel = "debug"

[store]
root = "/var/lib/courtside"
users = "/etc/courtside/users.json"

[tournament]
key = "chess"
sport = "chess"
entrants = ["Ana", "Ben", "Cleo", "Dev", "Edo"]
"#;

        let config: Config = toml::from_str(input).unwrap();
        assert_eq!(config.loglevel, log::LevelFilter::Debug);
        assert_eq!(config.tournament.key, "chess");
        assert_eq!(config.tournament.entrants.len(), 5);
    }

    #[test]
    fn test_config_environment_override() {
        let config: Config = toml::from_str(
            r#"
loglevel = "info"

[store]
root = "store"
users = "users.json"

[tournament]
key = "chess"
sport = "chess"
"#,
        )
        .unwrap();

        std::env::set_var("CS_TOURNAMENT", "foosball");
        let config = config.with_environment();
        std::env::remove_var("CS_TOURNAMENT");

        assert_eq!(config.tournament.key, "foosball");
    }
}
