//! One-shot auto-rotation.

/// Drives the globe's spin about its vertical axis.
///
/// Starts in `AutoRotating` and moves to `UserControlled` on the first
/// camera interaction; there is no way back.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RotationDriver {
    AutoRotating { rate_rad_per_s: f64 },
    UserControlled,
}

impl RotationDriver {
    pub fn new(rate_rad_per_s: f64) -> Self {
        RotationDriver::AutoRotating { rate_rad_per_s }
    }

    /// Angle to add this frame, proportional to elapsed time.
    pub fn advance(&self, dt_s: f64) -> f64 {
        match self {
            RotationDriver::AutoRotating { rate_rad_per_s } if dt_s > 0.0 => rate_rad_per_s * dt_s,
            _ => 0.0,
        }
    }

    /// Returns `true` only for the call that performs the transition.
    pub fn on_drag_start(&mut self) -> bool {
        match self {
            RotationDriver::AutoRotating { .. } => {
                *self = RotationDriver::UserControlled;
                true
            }
            RotationDriver::UserControlled => false,
        }
    }

    pub fn is_user_controlled(&self) -> bool {
        matches!(self, RotationDriver::UserControlled)
    }
}
