use std::fs::File;
use std::io::{BufReader, Read};

use super::{Config, LogConfig, StorageConfig};

#[derive(Deserialize, Debug, Clone)]
pub struct ConfigFile {
    pub storage: Option<StorageConfigFile>,
    pub logs: Option<LogConfigFile>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StorageConfigFile {
    pub working_dir: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LogConfigFile {
    pub social_internals: Option<bool>,
}

impl ConfigFile {
    pub fn from_file_path(file_path: &str) -> Result<Config, String> {
        let file = File::open(file_path)
            .map_err(|e| format!("unable to read file {}\n{:?}", file_path, e))?;
        let mut file_reader = BufReader::new(file);
        let mut file_buffer = vec![];
        file_reader
            .read_to_end(&mut file_buffer)
            .map_err(|e| format!("unable to read file {}\n{:?}", file_path, e))?;

        let config_file: ConfigFile = match toml::from_slice(&file_buffer) {
            Ok(s) => s,
            Err(e) => {
                return Err(format!("Config file malformatted {}", e));
            }
        };
        ConfigFile::from_config_file(config_file)
    }

    pub fn from_config_file(config_file: ConfigFile) -> Result<Config, String> {
        let config = Config {
            storage: StorageConfig {
                working_dir: config_file
                    .storage
                    .and_then(|s| s.working_dir)
                    .unwrap_or(super::default_cache_path()),
            },
            logs: LogConfig {
                social_internals: config_file
                    .logs
                    .and_then(|l| l.social_internals)
                    .unwrap_or(true),
            },
        };
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::ConfigFile;

    #[test]
    fn applies_defaults_for_missing_sections() {
        let config_file: ConfigFile = toml::from_str("[storage]\nworking_dir = \"data\"").unwrap();
        let config = ConfigFile::from_config_file(config_file).unwrap();
        assert_eq!(config.storage.working_dir, "data");
        assert!(config.logs.social_internals);
    }
}
