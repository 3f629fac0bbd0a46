use std::path::{Path, PathBuf};
use std::time::Duration;

use tkd_engine::service::DEFAULT_TICK_INTERVAL;
use tkd_engine::ConfigPatch;

/// Error loading the match rules file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid match rules in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level host configuration.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Cadence of the round clock tick.
    pub tick_interval: Duration,
    /// Rules applied over the engine defaults at startup.
    pub match_rules: ConfigPatch,
}

impl Default for HostConfig {
    fn default() -> Self {
        let tick_interval = std::env::var("TKD_TICK_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TICK_INTERVAL);
        Self {
            tick_interval,
            match_rules: ConfigPatch::default(),
        }
    }
}

impl HostConfig {
    pub fn with_tick_ms(mut self, ms: u64) -> Self {
        self.tick_interval = Duration::from_millis(ms);
        self
    }

    /// Load starting rules from a TOML file.
    pub fn with_rules_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        self.match_rules = load_rules(path)?;
        Ok(self)
    }
}

/// Read a rules file. Keys use the same names as the wire config
/// (`roundDuration`, `consensusWindow`, a `[points]` table, ...).
pub fn load_rules(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_rules_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
rounds = 2
roundDuration = 90
consensusEnabled = false

[points]
head = 4
"#
        )
        .unwrap();

        let rules = load_rules(file.path()).unwrap();
        assert_eq!(rules.rounds, Some(2));
        assert_eq!(rules.round_duration, Some(90));
        assert_eq!(rules.consensus_enabled, Some(false));
        assert_eq!(rules.golden_point, None);
        assert_eq!(rules.points.unwrap().head, Some(4));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = load_rules(Path::new("/nonexistent/rules.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/rules.toml"));
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "rounds = -3").unwrap();
        let err = load_rules(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_tick_override() {
        let config = HostConfig::default().with_tick_ms(250);
        assert_eq!(config.tick_interval, Duration::from_millis(250));
    }
}
