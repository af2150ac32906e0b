/// Host configuration
use crate::{
    devices::{LoudnessFeed, ProgramLoudness, SimulatedDevices, SimulatedVolume},
    error::{HostError, Result},
    host::{SessionKind, SessionPlan},
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};
use volnorm_control::{AdaptiveTuning, LevelTable, Policy, LEVEL_MEDIUM};
use volnorm_core::{VolumeLevel, VolumeRange};

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "volnorm.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default = "default_session")]
    pub session: SessionSettings,

    #[serde(default)]
    pub adaptive: AdaptiveTuning,

    #[serde(default = "default_device")]
    pub device: DeviceSettings,

    /// Extra fixed-band levels, or new bands for built-in ones
    #[serde(default)]
    pub levels: Vec<LevelOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionSettings {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_kind")]
    pub kind: KindSetting,

    /// Overrides the per-policy tick interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_interval_ms: Option<u64>,

    /// Long-running sessions stop after this long; unset runs until cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,

    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// Periodic runs stop after this many sessions; unset runs until cancelled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeats: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum KindSetting {
    OneShot,
    Periodic,
    LongRunning,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceSettings {
    #[serde(default = "default_min_volume")]
    pub min_volume: i32,

    #[serde(default = "default_max_volume")]
    pub max_volume: i32,

    #[serde(default = "default_initial_volume")]
    pub initial_volume: i32,

    #[serde(default = "default_source")]
    pub source: SourceSetting,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_path: Option<PathBuf>,

    #[serde(default)]
    pub replay_loop: bool,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_jitter_mb")]
    pub jitter_mb: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSetting {
    Program,
    Replay,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LevelOverride {
    pub name: String,
    pub lower: i32,
    pub upper: i32,
}

impl HostConfig {
    /// Load configuration from file and environment
    ///
    /// An explicit `path` must exist; otherwise `volnorm.toml` in the working
    /// directory is used when present. Variables such as
    /// `VOLNORM_SESSION__LEVEL` override the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings =
                    settings.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with VOLNORM_)
        settings = settings.add_source(
            config::Environment::with_prefix("VOLNORM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.session.level.trim().is_empty() {
            return Err(HostError::Config("session.level must not be empty".to_string()));
        }

        if self.session.tick_interval_ms == Some(0) {
            return Err(HostError::Config(
                "session.tick_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.session.duration_secs == Some(0) {
            return Err(HostError::Config(
                "session.duration_secs must be greater than zero".to_string(),
            ));
        }

        if self.session.kind == KindSetting::Periodic {
            if self.session.period_secs == 0 {
                return Err(HostError::Config(
                    "session.period_secs must be greater than zero".to_string(),
                ));
            }
            if self.session.repeats == Some(0) {
                return Err(HostError::Config(
                    "session.repeats must be at least 1".to_string(),
                ));
            }
        }

        if self.device.min_volume > self.device.max_volume {
            return Err(HostError::Config(format!(
                "device volume range is inverted: min {} > max {}",
                self.device.min_volume, self.device.max_volume
            )));
        }

        if self.device.jitter_mb < 0 {
            return Err(HostError::Config(
                "device.jitter_mb must not be negative".to_string(),
            ));
        }

        if self.device.source == SourceSetting::Replay && self.device.replay_path.is_none() {
            return Err(HostError::Config(
                "device.replay_path is required for the replay source".to_string(),
            ));
        }

        self.adaptive.validate()?;
        self.level_table()?;

        Ok(())
    }

    /// Built-in levels with the configured overrides applied
    pub fn level_table(&self) -> Result<LevelTable> {
        let mut table = LevelTable::builtin();
        let mut seen = HashSet::new();

        for level in &self.levels {
            if !seen.insert(level.name.trim().to_ascii_lowercase()) {
                return Err(HostError::Config(format!(
                    "level '{}' is configured more than once",
                    level.name
                )));
            }
            table.upsert(&level.name, Policy::fixed(level.lower, level.upper)?)?;
        }

        Ok(table)
    }

    /// Session plan described by the `[session]` and `[adaptive]` sections
    pub fn plan(&self) -> SessionPlan {
        let session = &self.session;
        let kind = match session.kind {
            KindSetting::OneShot => SessionKind::OneShot,
            KindSetting::Periodic => SessionKind::Periodic {
                period: Duration::from_secs(session.period_secs),
                repeats: session.repeats,
            },
            KindSetting::LongRunning => SessionKind::LongRunning {
                duration: session.duration_secs.map(Duration::from_secs),
            },
        };

        let plan = SessionPlan::new(session.level.trim(), kind).with_tuning(self.adaptive);
        match session.tick_interval_ms {
            Some(ms) => plan.with_tick_interval(Duration::from_millis(ms)),
            None => plan,
        }
    }

    /// Simulated devices described by the `[device]` section
    pub fn devices(&self) -> Result<SimulatedDevices> {
        let device = &self.device;
        let range = VolumeRange::new(
            VolumeLevel(device.min_volume),
            VolumeLevel(device.max_volume),
        )?;
        let volume = SimulatedVolume::new(range, VolumeLevel(device.initial_volume));

        let source = match (device.source, &device.replay_path) {
            (SourceSetting::Replay, Some(path)) => LoudnessFeed::Replay {
                path: path.clone(),
                looping: device.replay_loop,
            },
            (SourceSetting::Replay, None) => {
                return Err(HostError::Config(
                    "device.replay_path is required for the replay source".to_string(),
                ))
            }
            (SourceSetting::Program, _) => LoudnessFeed::Program {
                program: ProgramLoudness::default_program(),
                jitter_mb: device.jitter_mb,
                seed: device.seed,
            },
        };

        Ok(SimulatedDevices::new(volume, source))
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HostError::Config(e.to_string()))
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            session: default_session(),
            adaptive: AdaptiveTuning::default(),
            device: default_device(),
            levels: Vec::new(),
        }
    }
}

// Default value functions
fn default_session() -> SessionSettings {
    SessionSettings {
        level: default_level(),
        kind: default_kind(),
        tick_interval_ms: None,
        duration_secs: None,
        period_secs: default_period_secs(),
        repeats: None,
    }
}

fn default_device() -> DeviceSettings {
    DeviceSettings {
        min_volume: default_min_volume(),
        max_volume: default_max_volume(),
        initial_volume: default_initial_volume(),
        source: default_source(),
        replay_path: None,
        replay_loop: false,
        seed: default_seed(),
        jitter_mb: default_jitter_mb(),
    }
}

fn default_level() -> String {
    LEVEL_MEDIUM.to_string()
}

fn default_kind() -> KindSetting {
    KindSetting::LongRunning
}

fn default_period_secs() -> u64 {
    900
}

fn default_min_volume() -> i32 {
    0
}

fn default_max_volume() -> i32 {
    15
}

fn default_initial_volume() -> i32 {
    7
}

fn default_source() -> SourceSetting {
    SourceSetting::Program
}

fn default_seed() -> u64 {
    7
}

fn default_jitter_mb() -> i32 {
    150
}
