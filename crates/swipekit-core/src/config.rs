use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::consumer::{ReleaseMode, ReleasePolicy};
use crate::motion::easing::EasingType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub consumer: ConsumerDefaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Touch and fling thresholds shared by every consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Distance in pixels a pointer must travel before a drag may start
    #[serde(default = "default_touch_slop")]
    pub touch_slop_px: f32,
    /// Release velocities below this (px/s) count as zero
    #[serde(default = "default_min_fling_velocity")]
    pub min_fling_velocity: f32,
    /// Release velocities are capped at this (px/s)
    #[serde(default = "default_max_fling_velocity")]
    pub max_fling_velocity: f32,
    /// Upper bound of a settle animation
    #[serde(default = "default_max_settle_duration")]
    pub max_settle_duration_ms: u64,
    /// Frame interval used when pacing replays
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            touch_slop_px: default_touch_slop(),
            min_fling_velocity: default_min_fling_velocity(),
            max_fling_velocity: default_max_fling_velocity(),
            max_settle_duration_ms: default_max_settle_duration(),
            frame_interval_ms: default_frame_interval(),
        }
    }
}

/// Initial settings applied to newly created consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumerDefaults {
    /// Distance in pixels at which progress reaches 1
    #[serde(default = "default_open_distance")]
    pub open_distance_px: f32,
    /// Extra distance allowed past fully open, as a fraction of the open distance
    #[serde(default)]
    pub over_swipe_factor: f32,
    /// Edge band width; 0 lets a swipe start anywhere
    #[serde(default)]
    pub edge_size_px: f32,
    /// Touch slop is divided by this value
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    /// What happens when the pointer is released
    #[serde(default = "default_release_policy")]
    pub release_mode: ReleasePolicy,
    /// Keep the surface open when released at or past fully open
    #[serde(default)]
    pub hold_open: bool,
    /// Settle curve
    #[serde(default)]
    pub easing: EasingType,
    /// Release velocity (px/s) that snaps a stay consumer open
    #[serde(default = "default_stay_min_velocity")]
    pub stay_min_velocity: f32,
    /// How far the previous screen travels relative to a back swipe
    #[serde(default = "default_relative_move_factor")]
    pub relative_move_factor: f32,
}

impl Default for ConsumerDefaults {
    fn default() -> Self {
        Self {
            open_distance_px: default_open_distance(),
            over_swipe_factor: 0.0,
            edge_size_px: 0.0,
            sensitivity: default_sensitivity(),
            release_mode: default_release_policy(),
            hold_open: false,
            easing: EasingType::default(),
            stay_min_velocity: default_stay_min_velocity(),
            relative_move_factor: default_relative_move_factor(),
        }
    }
}

impl ConsumerDefaults {
    pub fn release_mode(&self) -> ReleaseMode {
        ReleaseMode::from_policy(self.release_mode, self.hold_open)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_touch_slop() -> f32 {
    8.0
}

fn default_min_fling_velocity() -> f32 {
    50.0
}

fn default_max_fling_velocity() -> f32 {
    8000.0
}

fn default_max_settle_duration() -> u64 {
    600
}

fn default_frame_interval() -> u64 {
    16
}

fn default_open_distance() -> f32 {
    150.0
}

fn default_sensitivity() -> f32 {
    1.0
}

fn default_release_policy() -> ReleasePolicy {
    ReleasePolicy::AutoClose
}

fn default_stay_min_velocity() -> f32 {
    1000.0
}

fn default_relative_move_factor() -> f32 {
    0.5
}

impl GestureConfig {
    /// Replay frame interval, falling back to ~60fps
    pub fn frame_interval(&self) -> Duration {
        if self.frame_interval_ms == 0 {
            Duration::from_millis(16)
        } else {
            Duration::from_millis(self.frame_interval_ms)
        }
    }
}

impl AppConfig {
    /// Load configuration from file, or return defaults when it does not exist
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from an explicit path
    pub fn load_from(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to an explicit path, creating parent directories
    pub fn save_to(&self, path: &std::path::Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/swipekit/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("swipekit")
            .join("config.toml")
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        let gesture = &self.gesture;
        if !(gesture.touch_slop_px >= 0.0) {
            return Err(crate::Error::Config(format!(
                "gesture.touch_slop_px must be >= 0, got {}",
                gesture.touch_slop_px
            )));
        }
        if !(gesture.min_fling_velocity >= 0.0)
            || !(gesture.max_fling_velocity >= gesture.min_fling_velocity)
        {
            return Err(crate::Error::Config(format!(
                "fling velocity range [{}, {}] is invalid",
                gesture.min_fling_velocity, gesture.max_fling_velocity
            )));
        }

        let consumer = &self.consumer;
        if !(consumer.open_distance_px >= 0.0) {
            return Err(crate::Error::Config(format!(
                "consumer.open_distance_px must be >= 0, got {}",
                consumer.open_distance_px
            )));
        }
        if !(consumer.over_swipe_factor >= 0.0) || !consumer.over_swipe_factor.is_finite() {
            return Err(crate::Error::Config(format!(
                "consumer.over_swipe_factor must be >= 0, got {}",
                consumer.over_swipe_factor
            )));
        }
        if !(consumer.edge_size_px >= 0.0) {
            return Err(crate::Error::Config(format!(
                "consumer.edge_size_px must be >= 0, got {}",
                consumer.edge_size_px
            )));
        }
        if !(consumer.sensitivity > 0.0) {
            return Err(crate::Error::Config(format!(
                "consumer.sensitivity must be > 0, got {}",
                consumer.sensitivity
            )));
        }
        if !(consumer.relative_move_factor >= 0.0) || !consumer.relative_move_factor.is_finite() {
            return Err(crate::Error::Config(format!(
                "consumer.relative_move_factor must be >= 0, got {}",
                consumer.relative_move_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.gesture.touch_slop_px, 8.0);
        assert_eq!(config.gesture.max_settle_duration_ms, 600);
        assert_eq!(config.consumer.release_mode, ReleasePolicy::AutoClose);
        assert_eq!(config.consumer.easing, EasingType::Quintic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [gesture]
            touch_slop_px = 12.0

            [consumer]
            release_mode = "auto_open_close"
            hold_open = true
            "#,
        )
        .unwrap();
        assert_eq!(config.gesture.touch_slop_px, 12.0);
        assert_eq!(config.gesture.max_fling_velocity, 8000.0);
        assert_eq!(
            config.consumer.release_mode(),
            ReleaseMode::AUTO_OPEN_CLOSE | ReleaseMode::HOLD_OPEN
        );
        assert_eq!(config.consumer.open_distance_px, 150.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.consumer.sensitivity = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.consumer.over_swipe_factor = -0.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.gesture.min_fling_velocity = 9000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_interval_falls_back_to_60fps() {
        let mut gesture = GestureConfig::default();
        assert_eq!(gesture.frame_interval(), Duration::from_millis(gesture.frame_interval_ms));

        gesture.frame_interval_ms = 0;
        assert_eq!(gesture.frame_interval(), Duration::from_millis(16));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = AppConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.gesture, config.gesture);
        assert_eq!(parsed.consumer, config.consumer);
    }
}
