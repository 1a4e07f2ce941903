use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Loads configuration into a struct.
///
/// Sources are layered: the optional file (TOML, YAML, JSON, ... by
/// extension) first, then environment variables named
/// `{PREFIX}_{SECTION}__{KEY}`. Missing keys fall back to the struct's serde
/// defaults.
pub fn load_config<T: DeserializeOwned>(path: Option<&Path>, env_prefix: &str) -> Result<T> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        let path_str = path.to_str().context("Invalid config path")?;
        builder = builder.add_source(File::with_name(path_str));
    }

    let settings = builder
        .add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    settings.try_deserialize::<T>().context("Failed to deserialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        server: ServerSection,
    }

    #[derive(Debug, Deserialize)]
    struct ServerSection {
        #[serde(default = "default_port")]
        port: u16,
        #[serde(default)]
        name: String,
    }

    impl Default for ServerSection {
        fn default() -> Self {
            Self { port: default_port(), name: String::new() }
        }
    }

    fn default_port() -> u16 { 8909 }

    #[test]
    fn test_defaults_without_file() {
        let sample: Sample = load_config(None, "XENIUM_COMMON_TEST_NONE").unwrap();
        assert_eq!(sample.server.port, 8909);
        assert!(sample.server.name.is_empty());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faucet.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[server]\nport = 9000\nname = \"drip\"").unwrap();

        let sample: Sample = load_config(Some(&path), "XENIUM_COMMON_TEST_FILE").unwrap();
        assert_eq!(sample.server.port, 9000);
        assert_eq!(sample.server.name, "drip");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let result: Result<Sample> = load_config(Some(&path), "XENIUM_COMMON_TEST_MISSING");
        assert!(result.is_err());
    }
}
