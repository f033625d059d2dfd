#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    BackendURL,
    ConfigFile,
    DataDir,
    PageSize,
    RequestTimeout,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    fn project_dir(base: Option<path::PathBuf>) -> path::PathBuf {
        return base
            .unwrap_or_else(|| return path::PathBuf::from("."))
            .join("bookworm");
    }

    pub fn default(key: ConfigKey) -> String {
        let config_path = Config::project_dir(dirs::config_dir()).join("config.toml");
        let data_path = Config::project_dir(dirs::data_dir());

        let res = match key {
            ConfigKey::BackendURL => "http://localhost:3000/api".to_string(),
            ConfigKey::PageSize => "2".to_string(),
            ConfigKey::RequestTimeout => "30000".to_string(),

            // Paths
            ConfigKey::ConfigFile => config_path.to_string_lossy().to_string(),
            ConfigKey::DataDir => data_path.to_string_lossy().to_string(),
        };

        return res;
    }

    /// Validates a value against the rules for its key before it is stored.
    fn validate(key: ConfigKey, val: &str) -> Result<()> {
        match key {
            ConfigKey::PageSize => {
                if !matches!(val.parse::<u32>(), Ok(size) if size > 0) {
                    bail!(format!("'{key}' must be a positive number, got: {val}"));
                }
            }
            ConfigKey::RequestTimeout => {
                if val.parse::<u64>().is_err() {
                    bail!(format!("'{key}' must be a number of milliseconds, got: {val}"));
                }
            }
            ConfigKey::BackendURL => {
                if !val.starts_with("http://") && !val.starts_with("https://") {
                    bail!(format!("'{key}' must be an http(s) URL, got: {val}"));
                }
            }
            _ => {}
        }

        return Ok(());
    }

    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if key == ConfigKey::ConfigFile {
                    continue;
                }

                if let Some(val) = doc.get(&key.to_string()) {
                    // Only keys with a matching CLI argument can be set from the file.
                    if !cmd
                        .get_arguments()
                        .any(|e| return e.get_long() == Some(key.to_string().as_str()))
                    {
                        bail!(format!("config.toml has an unsupported key '{key}'"));
                    }

                    let val_str = if let Some(val_int) = val.as_integer() {
                        val_int.to_string()
                    } else if let Some(val_str) = val.as_str() {
                        val_str.to_string()
                    } else {
                        bail!(format!("config.toml has an invalid value for key '{key}'"));
                    };

                    if val_str.is_empty() {
                        continue;
                    }
                    if let Err(err) = Config::validate(key, &val_str) {
                        bail!(format!("config.toml has an invalid value: {err}"));
                    }
                    Config::set(key, &val_str);
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::validate(key, val)?;
                    Config::set(key, val)
                }
            }
        }

        tracing::debug!(
            backend_url = %Config::get(ConfigKey::BackendURL),
            data_dir = %Config::get(ConfigKey::DataDir),
            page_size = %Config::get(ConfigKey::PageSize),
            request_timeout = %Config::get(ConfigKey::RequestTimeout),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|help| return help.to_string())
                    .unwrap_or_default();

                description = description
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i64>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{}\"", val.replace('\\', "\\\\"));
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
