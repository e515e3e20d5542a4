/// Simulator configuration
use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tilawa_core::RepeatSettings;
use tilawa_playback::PlayerConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default = "default_simulation")]
    pub simulation: SimulationSettings,

    #[serde(default = "default_repeat")]
    pub repeat: RepeatDefaults,

    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationSettings {
    /// Clock step between two position ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Hard stop for a run, in simulated milliseconds
    #[serde(default = "default_max_duration_ms")]
    pub max_duration_ms: u64,

    /// Sleep for each tick instead of running as fast as possible
    #[serde(default)]
    pub realtime: bool,
}

/// Repeat settings used when the command line does not override them
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepeatDefaults {
    #[serde(default = "default_count")]
    pub verses_repeat_count: u32,

    #[serde(default = "default_count")]
    pub range_repeat_count: u32,

    #[serde(default)]
    pub delay_between_repetitions_ms: u64,
}

impl RepeatDefaults {
    /// Build validated settings, applying per-run overrides
    pub fn settings(
        &self,
        verses: Option<u32>,
        ranges: Option<u32>,
        delay_ms: Option<u64>,
    ) -> Result<RepeatSettings> {
        Ok(RepeatSettings::new(
            verses.unwrap_or(self.verses_repeat_count),
            ranges.unwrap_or(self.range_repeat_count),
            delay_ms.unwrap_or(self.delay_between_repetitions_ms),
        )?)
    }
}

impl SimConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `tilawa.toml` in the working
    /// directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let config_path = PathBuf::from("tilawa.toml");
                if config_path.exists() {
                    settings = settings.add_source(config::File::from(config_path));
                }
            }
        }

        // Override with environment variables, e.g. TILAWA_SIMULATION__TICK_INTERVAL_MS
        settings = settings.add_source(
            config::Environment::with_prefix("TILAWA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| SimError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| SimError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.simulation.tick_interval_ms == 0 {
            return Err(SimError::Config(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.simulation.max_duration_ms < self.simulation.tick_interval_ms {
            return Err(SimError::Config(format!(
                "max_duration_ms ({}) is shorter than one tick ({})",
                self.simulation.max_duration_ms, self.simulation.tick_interval_ms
            )));
        }

        self.repeat.settings(None, None, None)?;
        Ok(())
    }
}

// Default values
fn default_simulation() -> SimulationSettings {
    SimulationSettings {
        tick_interval_ms: default_tick_interval_ms(),
        max_duration_ms: default_max_duration_ms(),
        realtime: false,
    }
}

fn default_tick_interval_ms() -> u64 {
    250
}

fn default_max_duration_ms() -> u64 {
    // Longest chapter recitations run a little over two hours
    4 * 60 * 60 * 1000
}

fn default_repeat() -> RepeatDefaults {
    RepeatDefaults {
        verses_repeat_count: default_count(),
        range_repeat_count: default_count(),
        delay_between_repetitions_ms: 0,
    }
}

fn default_count() -> u32 {
    1
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            simulation: default_simulation(),
            repeat: default_repeat(),
            player: PlayerConfig::default(),
        }
    }
}
