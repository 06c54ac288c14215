//! Volume control
//!
//! Unit-range volume (0.0 = silent, 1.0 = full) with a mute flag that
//! preserves the level. The media resource is handed the effective value.

/// Clamp a volume request into [0, 1]
///
/// NaN is treated as silence.
pub fn clamp_volume(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

/// Volume controller
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    /// Volume level (0.0-1.0)
    level: f32,

    /// Mute state (preserves volume level)
    muted: bool,
}

impl Volume {
    /// Create new volume controller
    pub fn new(level: f32) -> Self {
        Self {
            level: clamp_volume(level),
            muted: false,
        }
    }

    /// Set volume level, clamped to [0, 1]
    pub fn set_level(&mut self, level: f32) {
        self.level = clamp_volume(level);
    }

    /// Get current volume level
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Mute audio (preserves volume level)
    pub fn mute(&mut self) {
        self.muted = true;
    }

    /// Unmute audio (restores previous volume)
    pub fn unmute(&mut self) {
        self.muted = false;
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Level the media resource should play at
    ///
    /// Returns 0.0 if muted.
    pub fn effective(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_volume_level_clamps() {
        let mut vol = Volume::new(0.5);
        assert_eq!(vol.level(), 0.5);

        vol.set_level(1.5);
        assert_eq!(vol.level(), 1.0);

        vol.set_level(-0.2);
        assert_eq!(vol.level(), 0.0);

        vol.set_level(f32::NAN);
        assert_eq!(vol.level(), 0.0);

        vol.set_level(f32::INFINITY);
        assert_eq!(vol.level(), 1.0);
    }

    #[test]
    fn mute_preserves_level() {
        let mut vol = Volume::new(0.8);

        vol.mute();
        assert!(vol.is_muted());
        assert_eq!(vol.effective(), 0.0);
        assert_eq!(vol.level(), 0.8);

        vol.unmute();
        assert_eq!(vol.effective(), 0.8);
    }

    #[test]
    fn toggle_mute() {
        let mut vol = Volume::default();
        vol.toggle_mute();
        assert!(vol.is_muted());
        vol.toggle_mute();
        assert!(!vol.is_muted());
    }
}
