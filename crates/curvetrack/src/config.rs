use crate::error::TrackError;

/// Moving-edge search parameters consumed by the per-site tracker.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MovingEdgeConfig {
    /// Half-length (pixels) of the search segment along each site normal.
    pub range: u32,
    /// Side length of the square oriented masks (odd).
    pub mask_size: usize,
    /// Angular resolution of the mask bank, in degrees.
    pub angle_step_deg: u32,
    /// Extra border margin (pixels) kept around a mask when sampling.
    pub strip: u32,
    /// Minimum absolute mask response (intensity units) for a valid edge.
    pub threshold: f64,
    /// Lower contrast-ratio tolerance: ratio must be ≥ `1 − mu1`.
    pub mu1: f64,
    /// Upper contrast-ratio tolerance: ratio must be ≤ `1 + mu2`.
    pub mu2: f64,
}

impl Default for MovingEdgeConfig {
    fn default() -> Self {
        Self {
            range: 4,
            mask_size: 5,
            angle_step_deg: 1,
            strip: 2,
            threshold: 20.0,
            mu1: 0.5,
            mu2: 0.5,
        }
    }
}

/// Edge-detector thresholds for contour recovery at failing extremities.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            canny_low: 100.0,
            canny_high: 200.0,
        }
    }
}

/// Top-level tracker configuration.
///
/// Read-only for the tracker; pass a new value to
/// [`crate::CurveTracker::set_config`] to retune between frames.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum desired spacing (pixels) between consecutive sites.
    pub sample_step: f64,
    /// Nominal number of parameter samples used when (re)sampling the curve;
    /// also caps local resampling.
    pub points_to_track: usize,
    /// Control-point budget of the per-cycle least-squares curve fit.
    pub n_control_points: usize,
    /// Per-site moving-edge search.
    pub moving_edge: MovingEdgeConfig,
    /// Contour recovery (used only when an edge detector is attached).
    pub recovery: RecoveryConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sample_step: 10.0,
            points_to_track: 500,
            n_control_points: 20,
            moving_edge: MovingEdgeConfig::default(),
            recovery: RecoveryConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Check every field against its domain.
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.moving_edge.angle_step_deg == 0 {
            return Err(TrackError::ZeroAngleStep);
        }
        if !(self.sample_step.is_finite() && self.sample_step > 0.0) {
            return Err(TrackError::InvalidConfig {
                field: "sample_step",
                reason: "must be finite and > 0",
            });
        }
        if self.points_to_track == 0 {
            return Err(TrackError::InvalidConfig {
                field: "points_to_track",
                reason: "must be > 0",
            });
        }
        if self.n_control_points < 2 {
            return Err(TrackError::InvalidConfig {
                field: "n_control_points",
                reason: "must be >= 2",
            });
        }
        let me = &self.moving_edge;
        if me.mask_size == 0 || me.mask_size % 2 == 0 {
            return Err(TrackError::InvalidConfig {
                field: "moving_edge.mask_size",
                reason: "must be odd",
            });
        }
        if me.angle_step_deg >= 180 {
            return Err(TrackError::InvalidConfig {
                field: "moving_edge.angle_step_deg",
                reason: "must be < 180",
            });
        }
        if !(me.mu1 >= 0.0 && me.mu2 >= 0.0) {
            return Err(TrackError::InvalidConfig {
                field: "moving_edge.mu1/mu2",
                reason: "must be >= 0",
            });
        }
        if self.recovery.canny_low > self.recovery.canny_high {
            return Err(TrackError::InvalidConfig {
                field: "recovery.canny_low",
                reason: "must not exceed canny_high",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(TrackerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn zero_angle_step_is_rejected() {
        let mut cfg = TrackerConfig::default();
        cfg.moving_edge.angle_step_deg = 0;
        assert_eq!(cfg.validate(), Err(TrackError::ZeroAngleStep));
    }

    #[test]
    fn even_mask_is_rejected() {
        let mut cfg = TrackerConfig::default();
        cfg.moving_edge.mask_size = 4;
        assert!(matches!(
            cfg.validate(),
            Err(TrackError::InvalidConfig { field: "moving_edge.mask_size", .. })
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: TrackerConfig =
            serde_json::from_str(r#"{"sample_step": 6.0, "moving_edge": {"range": 7}}"#).unwrap();
        assert_eq!(cfg.sample_step, 6.0);
        assert_eq!(cfg.moving_edge.range, 7);
        assert_eq!(cfg.moving_edge.mask_size, 5);
        assert_eq!(cfg.n_control_points, 20);
    }
}
