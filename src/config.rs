//! Configuration for sphere_seeker

use crate::core_modules::color_mask::HsvRange;
use crate::core_modules::controller::ControlGains;
use crate::core_modules::pixel::pixel::{HUE_RANGE, Hsv};
use crate::core_modules::target_detector::DetectorConfig;
use crate::error::{Result, SeekerError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted for a config path when none is given on the command line.
pub const CONFIG_ENV_VAR: &str = "SEEKER_CONFIG";

/// Complete runtime configuration. Every field has a default, so an empty
/// file (or no file at all) yields the stock yellow-sphere setup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeekerConfig {
    /// Frame source identifier. The bundled source reads it as a directory of images.
    pub image_topic: String,
    /// Velocity sink identifier.
    pub velocity_topic: String,
    /// Control tick cadence.
    pub control_period_ms: u64,
    /// Pacing of the bundled directory frame source.
    pub frame_interval_ms: u64,
    /// Depth of the frame queue between transport and detector.
    pub frame_queue_depth: usize,
    /// Inclusive lower HSV bound, `[hue, saturation, value]`.
    pub hsv_lower: [u8; 3],
    /// Inclusive upper HSV bound, `[hue, saturation, value]`.
    pub hsv_upper: [u8; 3],
    /// Blobs must be strictly larger than this, in pixels.
    pub min_blob_area: usize,
    pub centering_threshold_px: f64,
    pub angular_gain: f64,
    pub search_angular_speed: f64,
    pub creep_speed: f64,
    pub forward_speed: f64,
}

impl Default for SeekerConfig {
    fn default() -> Self {
        let gains = ControlGains::default();
        let detector = DetectorConfig::default();
        let HsvRange { lower, upper } = detector.hsv_range;
        Self {
            image_topic: "frames".to_string(),
            velocity_topic: "/cmd_vel".to_string(),
            control_period_ms: 100,
            frame_interval_ms: 33,
            frame_queue_depth: 10,
            hsv_lower: [lower.hue, lower.saturation, lower.value],
            hsv_upper: [upper.hue, upper.saturation, upper.value],
            min_blob_area: detector.min_blob_area,
            centering_threshold_px: gains.centering_threshold_px,
            angular_gain: gains.angular_gain,
            search_angular_speed: gains.search_angular_speed,
            creep_speed: gains.creep_speed,
            forward_speed: gains.forward_speed,
        }
    }
}

impl SeekerConfig {
    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.control_period_ms == 0 {
            return Err(SeekerError::Config("control_period_ms must be non-zero".to_string()));
        }

        if self.frame_queue_depth == 0 {
            return Err(SeekerError::Config("frame_queue_depth must be non-zero".to_string()));
        }

        for (channel, (lo, hi)) in ["hue", "saturation", "value"]
            .iter()
            .zip(self.hsv_lower.iter().zip(self.hsv_upper.iter()))
        {
            if lo > hi {
                return Err(SeekerError::Config(format!(
                    "hsv_lower {channel} ({lo}) is above hsv_upper {channel} ({hi})"
                )));
            }
        }

        if i32::from(self.hsv_upper[0]) >= HUE_RANGE {
            return Err(SeekerError::Config(format!(
                "hue bounds must be below {HUE_RANGE}, got {}",
                self.hsv_upper[0]
            )));
        }

        let finite = [
            ("centering_threshold_px", self.centering_threshold_px),
            ("angular_gain", self.angular_gain),
            ("search_angular_speed", self.search_angular_speed),
            ("creep_speed", self.creep_speed),
            ("forward_speed", self.forward_speed),
        ];
        if let Some((name, _)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SeekerError::Config(format!("{name} must be finite")));
        }

        if self.centering_threshold_px < 0.0 {
            return Err(SeekerError::Config("centering_threshold_px must not be negative".to_string()));
        }

        // Angular terms are signed (their sign picks the turn direction);
        // linear speeds only ever drive toward the target.
        for (name, speed) in [("creep_speed", self.creep_speed), ("forward_speed", self.forward_speed)] {
            if speed < 0.0 {
                return Err(SeekerError::Config(format!("{name} must not be negative, got {speed}")));
            }
        }

        Ok(())
    }

    pub fn control_period(&self) -> Duration {
        Duration::from_millis(self.control_period_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn hsv_range(&self) -> HsvRange {
        let [h0, s0, v0] = self.hsv_lower;
        let [h1, s1, v1] = self.hsv_upper;
        HsvRange::new(Hsv::new(h0, s0, v0), Hsv::new(h1, s1, v1))
    }

    pub fn detector(&self) -> DetectorConfig {
        DetectorConfig {
            hsv_range: self.hsv_range(),
            min_blob_area: self.min_blob_area,
        }
    }

    pub fn gains(&self) -> ControlGains {
        ControlGains {
            centering_threshold_px: self.centering_threshold_px,
            angular_gain: self.angular_gain,
            search_angular_speed: self.search_angular_speed,
            creep_speed: self.creep_speed,
            forward_speed: self.forward_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid_and_match_component_defaults() {
        let config = SeekerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detector(), DetectorConfig::default());
        assert_eq!(config.gains(), ControlGains::default());
        assert_eq!(config.control_period(), Duration::from_millis(100));
    }

    #[test]
    fn empty_toml_is_the_default() {
        assert_eq!(SeekerConfig::from_toml_str("").unwrap(), SeekerConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_given_fields() {
        let config = SeekerConfig::from_toml_str(
            r#"
            velocity_topic = "/robot/cmd_vel"
            min_blob_area = 200
            hsv_lower = [20, 100, 100]
            "#,
        )
        .unwrap();
        assert_eq!(config.velocity_topic, "/robot/cmd_vel");
        assert_eq!(config.min_blob_area, 200);
        assert_eq!(config.hsv_range().lower, Hsv::new(20, 100, 100));
        assert_eq!(config.hsv_range().upper, Hsv::new(30, 255, 255));
        assert_eq!(config.angular_gain, -0.002);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            SeekerConfig::from_toml_str("control_rate = 5"),
            Err(SeekerError::Toml(_))
        ));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = SeekerConfig::from_toml_str("hsv_lower = [40, 70, 70]").unwrap_err();
        assert!(err.to_string().contains("hue"));
    }

    #[test]
    fn hue_above_scale_is_rejected() {
        assert!(SeekerConfig::from_toml_str("hsv_upper = [180, 255, 255]").is_err());
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(SeekerConfig::from_toml_str("control_period_ms = 0").is_err());
    }

    #[test]
    fn non_finite_gain_is_rejected() {
        let config = SeekerConfig {
            angular_gain: f64::NAN,
            ..SeekerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_linear_speeds_are_rejected() {
        let err = SeekerConfig::from_toml_str("forward_speed = -0.2").unwrap_err();
        assert!(matches!(err, SeekerError::Config(msg) if msg.contains("forward_speed")));
        assert!(SeekerConfig::from_toml_str("creep_speed = -0.1").is_err());
        // Signed angular terms are fine either way round.
        assert!(SeekerConfig::from_toml_str("search_angular_speed = 0.3\nangular_gain = 0.002").is_ok());
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "control_period_ms = 50").unwrap();
        let config = SeekerConfig::load(file.path()).unwrap();
        assert_eq!(config.control_period(), Duration::from_millis(50));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            SeekerConfig::load("/definitely/not/here.toml"),
            Err(SeekerError::Io(_))
        ));
    }
}
