//! INI file configuration adapter.

use crate::domain::error::TraderError;
use crate::domain::record::parse_decimal;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use rust_decimal::Decimal;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| TraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_uint(&self, section: &str, key: &str) -> Result<Option<u64>, String> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<u64>()
                .map(Some)
                .map_err(|_| format!("expected a non-negative integer, got '{raw}'")),
        }
    }

    fn get_decimal(&self, section: &str, key: &str) -> Result<Option<Decimal>, String> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(raw) => parse_decimal(&raw)
                .map(Some)
                .ok_or_else(|| format!("expected a decimal number, got '{raw}'")),
        }
    }
}
