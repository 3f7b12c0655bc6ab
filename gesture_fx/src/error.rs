use hand_kinematics::LandmarkError;
use thiserror::Error;

/// A configuration value the engine cannot run with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be at least 1")]
    ZeroCapacity { name: &'static str },

    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("rise rate ({rise}/s) must exceed decay rate ({decay}/s)")]
    RiseNotAboveDecay { rise: f32, decay: f32 },
}

#[derive(Debug, Error)]
pub enum FxError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("rejected landmark frame: {0}")]
    Landmarks(#[from] LandmarkError),

    #[error("window error: {0}")]
    Window(String),

    #[error("landmark source error: {0}")]
    Source(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_field() {
        let e = ConfigError::ZeroCapacity { name: "bar_count" };
        assert_eq!(e.to_string(), "bar_count must be at least 1");
        let e: FxError = ConfigError::RiseNotAboveDecay { rise: 3.0, decay: 12.0 }.into();
        assert_eq!(
            e.to_string(),
            "invalid configuration: rise rate (3/s) must exceed decay rate (12/s)"
        );
    }
}
