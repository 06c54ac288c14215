/// CLI configuration
use crate::error::{CliError, Result};
use cadence_session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file, read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,
}

/// Behaviour of the simulated media resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Delay between a load and its metadata, in milliseconds
    #[serde(default = "default_load_latency_ms")]
    pub load_latency_ms: u64,

    /// Interval between time updates, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Locators whose load fails after the latency
    #[serde(default)]
    pub failing_urls: Vec<String>,
}

impl CliConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `cadence.toml` is read if
    /// present. Environment variables override both, e.g.
    /// `CADENCE_SESSION__SKIP_LIMIT=5`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with CADENCE_)
        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("simulation.failing_urls")
                .try_parsing(true),
        );

        let config = settings.build()?;
        config.try_deserialize().map_err(CliError::from)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.session.validate()?;

        if self.simulation.tick_ms == 0 {
            return Err(CliError::Config(
                "simulation.tick_ms must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.session.initial_volume) {
            return Err(CliError::Config(format!(
                "session.initial_volume must be within [0, 1], got {}",
                self.session.initial_volume
            )));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// Default values
fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        load_latency_ms: default_load_latency_ms(),
        tick_ms: default_tick_ms(),
        failing_urls: Vec::new(),
    }
}

fn default_load_latency_ms() -> u64 {
    150
}

fn default_tick_ms() -> u64 {
    250
}

impl Default for SimulationSettings {
    fn default() -> Self {
        default_simulation()
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            simulation: default_simulation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = CliConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.skip_limit, 10);
        assert_eq!(config.simulation.tick_ms, 250);
    }

    #[test]
    fn load_reads_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[session]\nskip_limit = 3\nloop_mode = \"all\"\n\n[simulation]\ntick_ms = 100\nfailing_urls = [\"sim://track/2\"]"
        )
        .unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.session.skip_limit, 3);
        assert_eq!(config.session.skip_window_secs, 3600);
        assert_eq!(config.session.loop_mode, cadence_session::LoopMode::All);
        assert_eq!(config.simulation.tick_ms, 100);
        assert_eq!(config.simulation.load_latency_ms, 150);
        assert_eq!(config.simulation.failing_urls, vec!["sim://track/2"]);
    }

    #[test]
    fn load_fails_for_missing_explicit_file() {
        let result = CliConfig::load(Some(Path::new("/definitely/not/here/cadence.toml")));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn validate_rejects_zero_tick() {
        let mut config = CliConfig::default();
        config.simulation.tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_surfaces_session_errors() {
        let mut config = CliConfig::default();
        config.session.skip_window_secs = 0;
        assert!(matches!(config.validate(), Err(CliError::Playback(_))));
    }

    #[test]
    fn renders_as_toml() {
        let rendered = CliConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[session]"));
        assert!(rendered.contains("skip_limit = 10"));
        assert!(rendered.contains("[simulation]"));

        let parsed: CliConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, CliConfig::default());
    }
}
