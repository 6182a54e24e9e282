//! Simulation settings.

use crate::error::ConfigError;

/// Frames for a falling tile to cross one row.
pub const DEFAULT_FALL_TIME: u32 = 10;
/// Frames for a swap to complete.
pub const DEFAULT_SWAP_TIME: u32 = 8;
/// Clears needed to leave level 0.
pub const DEFAULT_NORMA: i64 = 100;

/// Options that shape a session. The front end builds this from its CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub fall_time: u32,
    pub swap_time: u32,
    pub initial_level: u32,
    pub initial_norma: i64,
    /// Seed for incoming-row rolls; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            fall_time: DEFAULT_FALL_TIME,
            swap_time: DEFAULT_SWAP_TIME,
            initial_level: 0,
            initial_norma: DEFAULT_NORMA,
            seed: None,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fall_time == 0 {
            return Err(ConfigError::ZeroFallTime);
        }
        if self.swap_time == 0 {
            return Err(ConfigError::ZeroSwapTime);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(GameConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let cfg = GameConfig {
            fall_time: 0,
            ..GameConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroFallTime));
        let cfg = GameConfig {
            swap_time: 0,
            ..GameConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroSwapTime));
    }
}
