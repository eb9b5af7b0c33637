//! Per-device timing thresholds and button roles.

use std::time::Duration;

use thiserror::Error;

use crate::device::buttons::Button;

/// Timing combinations the engine cannot run with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    /// Every press would resolve the instant it arrives.
    #[error("long_press must be greater than zero")]
    ZeroLongPress,

    /// A held repeatable button would re-arm its repeat task with no delay.
    #[error("repeat interval must be greater than zero")]
    ZeroRepeat,

    /// Taps resolve at `long_press`, so a longer double-tap window can never
    /// be used in full.
    #[error("double_tap ({double_tap:?}) must not exceed long_press ({long_press:?})")]
    DoubleTapExceedsLongPress {
        double_tap: Duration,
        long_press: Duration,
    },
}

/// Everything the gesture engine needs to know about one device class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GestureProfile {
    /// Maximum gap between two presses that still counts as a double tap.
    pub double_tap: Duration,
    /// Hold time after which a press becomes a long press.  A released press
    /// also resolves to `Tap` at this point, so it doubles as the single-tap
    /// threshold.
    pub long_press: Duration,
    /// Interval between `RepeatTick`s of a held repeatable button.
    pub repeat_interval: Duration,
    pub repeatable: Vec<Button>,
    pub combos: Vec<(Button, Button)>,
}

impl GestureProfile {
    pub fn is_repeatable(&self, button: Button) -> bool {
        self.repeatable.contains(&button)
    }

    /// Returns the registered pair containing `button` together with its
    /// partner, if any.
    pub fn combos_with(&self, button: Button) -> impl Iterator<Item = ((Button, Button), Button)> + '_ {
        self.combos.iter().filter_map(move |&(a, b)| {
            if a == button {
                Some(((a, b), b))
            } else if b == button {
                Some(((a, b), a))
            } else {
                None
            }
        })
    }

    /// Replaces the timing fields that are `Some`.
    pub fn with_timing(
        mut self,
        double_tap: Option<Duration>,
        long_press: Option<Duration>,
        repeat_interval: Option<Duration>,
    ) -> Self {
        if let Some(d) = double_tap {
            self.double_tap = d;
        }
        if let Some(d) = long_press {
            self.long_press = d;
        }
        if let Some(d) = repeat_interval {
            self.repeat_interval = d;
        }
        self
    }

    /// Checks that the timing can drive the engine.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProfileError`] found.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.long_press.is_zero() {
            return Err(ProfileError::ZeroLongPress);
        }
        if self.repeat_interval.is_zero() {
            return Err(ProfileError::ZeroRepeat);
        }
        if self.double_tap > self.long_press {
            return Err(ProfileError::DoubleTapExceedsLongPress {
                double_tap: self.double_tap,
                long_press: self.long_press,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> GestureProfile {
        GestureProfile {
            double_tap: Duration::from_millis(400),
            long_press: Duration::from_millis(600),
            repeat_interval: Duration::from_millis(100),
            repeatable: vec![Button::ScrollLeft],
            combos: vec![(Button::G1, Button::G2)],
        }
    }

    #[test]
    fn test_combo_partner_found_from_either_side() {
        let p = profile();
        assert_eq!(p.combos_with(Button::G2).next(), Some(((Button::G1, Button::G2), Button::G1)));
        assert_eq!(p.combos_with(Button::G1).next().map(|(_, partner)| partner), Some(Button::G2));
        assert!(p.combos_with(Button::A).next().is_none());
    }

    #[test]
    fn test_with_timing_overrides_only_given_fields() {
        // Act
        let p = profile().with_timing(None, Some(Duration::from_millis(800)), None);

        // Assert
        assert_eq!(p.double_tap, Duration::from_millis(400));
        assert_eq!(p.long_press, Duration::from_millis(800));
        assert_eq!(p.repeat_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_validate_accepts_built_in_timing() {
        assert_eq!(profile().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        // Arrange
        let no_repeat = profile().with_timing(None, None, Some(Duration::ZERO));
        let no_hold = profile().with_timing(Some(Duration::ZERO), Some(Duration::ZERO), None);

        // Act / Assert
        assert_eq!(no_repeat.validate(), Err(ProfileError::ZeroRepeat));
        assert_eq!(no_hold.validate(), Err(ProfileError::ZeroLongPress));
    }

    #[test]
    fn test_validate_rejects_double_tap_window_longer_than_long_press() {
        // Arrange
        let p = profile().with_timing(Some(Duration::from_millis(700)), None, None);

        // Act
        let result = p.validate();

        // Assert
        assert_eq!(
            result,
            Err(ProfileError::DoubleTapExceedsLongPress {
                double_tap: Duration::from_millis(700),
                long_press: Duration::from_millis(600),
            })
        );
    }
}
