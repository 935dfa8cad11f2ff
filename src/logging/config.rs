use std::{env, fs, io, path::PathBuf};

use serde::{Deserialize, Serialize};

/// Уровни, которые принимает [`LoggingConfig::level`].
const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// Периодичность ротации файла логов.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Настройки логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень для событий маршрутизатора; `RUST_LOG` имеет приоритет.
    pub level: String,
    /// Каталог для файлов логов.
    pub log_dir: PathBuf,
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_thread_ids: bool,
    pub with_line_numbers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    /// Префикс имени файла; суффикс с датой добавляет ротация.
    pub filename: String,
    pub format: LogFormat,
    pub rotation: Rotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            console: ConsoleConfig::default(),
            file: FileConfig::default(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            format: LogFormat::Compact,
            with_ansi: true,
            with_target: true,
            with_thread_ids: false,
            with_line_numbers: false,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filename: "switchyard.log".to_string(),
            format: LogFormat::Json,
            rotation: Rotation::Daily,
        }
    }
}

impl LoggingConfig {
    /// Переопределения из окружения: `SWITCHYARD_LOG_LEVEL`,
    /// `SWITCHYARD_LOG_DIR`, `SWITCHYARD_LOG_FORMAT`, `NO_COLOR`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("SWITCHYARD_LOG_LEVEL") {
            self.level = level.to_lowercase();
        }
        if let Ok(dir) = env::var("SWITCHYARD_LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Ok(format) = env::var("SWITCHYARD_LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "pretty" => self.console.format = LogFormat::Pretty,
                "compact" => self.console.format = LogFormat::Compact,
                "json" => self.console.format = LogFormat::Json,
                _ => {}
            }
        }
        if env::var_os("NO_COLOR").is_some() {
            self.console.with_ansi = false;
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !VALID_LEVELS.contains(&self.level.as_str()) {
            return Err(format!(
                "invalid log level '{}', expected one of {:?}",
                self.level, VALID_LEVELS
            ));
        }
        if self.file.enabled && self.file.filename.trim().is_empty() {
            return Err("logging.file.filename must not be empty".to_string());
        }
        Ok(())
    }

    /// Создаёт каталог логов, если включена запись в файл.
    pub fn ensure_log_dir(&self) -> io::Result<()> {
        if self.file.enabled {
            fs::create_dir_all(&self.log_dir)?;
        }
        Ok(())
    }

    /// Директива `EnvFilter`: зависимости на `warn`, сам крейт на `level`.
    pub fn build_filter_directive(&self) -> String {
        format!("warn,switchyard={}", self.level)
    }

    pub fn console_format(&self) -> LogFormat {
        self.console.format
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = LoggingConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(!cfg.file.enabled);
        assert_eq!(cfg.build_filter_directive(), "warn,switchyard=info");
    }

    #[test]
    fn test_invalid_level_rejected() {
        let cfg = LoggingConfig {
            level: "loud".into(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("SWITCHYARD_LOG_LEVEL", "DEBUG");
        env::set_var("SWITCHYARD_LOG_FORMAT", "json");
        env::set_var("NO_COLOR", "1");

        let mut cfg = LoggingConfig::default();
        cfg.apply_env_overrides();

        env::remove_var("SWITCHYARD_LOG_LEVEL");
        env::remove_var("SWITCHYARD_LOG_FORMAT");
        env::remove_var("NO_COLOR");

        assert_eq!(cfg.level, "debug");
        assert_eq!(cfg.console_format(), LogFormat::Json);
        assert!(!cfg.console.with_ansi);
    }

    #[test]
    fn test_ensure_log_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = LoggingConfig {
            log_dir: tmp.path().join("nested/logs"),
            ..Default::default()
        };

        cfg.ensure_log_dir().unwrap();
        assert!(!cfg.log_dir.exists());

        cfg.file.enabled = true;
        cfg.ensure_log_dir().unwrap();
        assert!(cfg.log_dir.is_dir());
    }
}
