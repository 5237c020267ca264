//! Error types surfaced by the curve model and the tracker.

// ── Curve fitting ──────────────────────────────────────────────────────────

/// Errors that can occur while fitting a B-spline to image points.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveFitError {
    /// Too few distinct points for the requested fit.
    TooFewPoints {
        /// Required minimum number of points.
        needed: usize,
        /// Provided number of distinct points.
        got: usize,
    },
    /// The collocation / normal-equation system could not be solved.
    Singular,
}

impl std::fmt::Display for CurveFitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { needed, got } => {
                write!(f, "too few points: need {}, got {}", needed, got)
            }
            Self::Singular => write!(f, "singular curve-fitting system"),
        }
    }
}

impl std::error::Error for CurveFitError {}

// ── Tracking ───────────────────────────────────────────────────────────────

/// Errors that abort a tracker operation and surface to the caller.
///
/// Site losses, recovery misses and refit failures inside a cycle are not
/// errors; they are absorbed and reported through [`crate::CycleStats`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackError {
    /// `track()` was called before any curve or initial points were supplied,
    /// or initialisation was attempted with an empty point set.
    NotInitialized,
    /// Angular resolution of the oriented-mask search is zero.
    ZeroAngleStep,
    /// A configuration value is outside its valid domain.
    InvalidConfig {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable constraint.
        reason: &'static str,
    },
    /// Initial curve could not be fitted.
    CurveFit(CurveFitError),
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "tracker has no curve: initialize it first"),
            Self::ZeroAngleStep => write!(f, "angle step is 0: oriented-mask search is undefined"),
            Self::InvalidConfig { field, reason } => {
                write!(f, "invalid configuration `{}`: {}", field, reason)
            }
            Self::CurveFit(e) => write!(f, "initial curve fit failed: {}", e),
        }
    }
}

impl std::error::Error for TrackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CurveFit(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CurveFitError> for TrackError {
    fn from(e: CurveFitError) -> Self {
        Self::CurveFit(e)
    }
}
