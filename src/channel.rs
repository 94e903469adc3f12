/// Logical actuator roles, mapped to fixed output channel indices
/// (wheels on 0-3, lift on 4). The mapping never changes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorChannel {
    WheelFrontLeft,
    WheelFrontRight,
    WheelRearLeft,
    WheelRearRight,
    Lift,
}

impl ActuatorChannel {
    pub const ALL: [ActuatorChannel; 5] = [
        ActuatorChannel::WheelFrontLeft,
        ActuatorChannel::WheelFrontRight,
        ActuatorChannel::WheelRearLeft,
        ActuatorChannel::WheelRearRight,
        ActuatorChannel::Lift,
    ];

    /// Wheel channels in the same order as `drive::wheel_magnitudes` output.
    pub const WHEELS: [ActuatorChannel; 4] = [
        ActuatorChannel::WheelFrontLeft,
        ActuatorChannel::WheelFrontRight,
        ActuatorChannel::WheelRearLeft,
        ActuatorChannel::WheelRearRight,
    ];

    pub fn index(&self) -> usize {
        match self {
            ActuatorChannel::WheelFrontLeft => 0,
            ActuatorChannel::WheelFrontRight => 1,
            ActuatorChannel::WheelRearLeft => 2,
            ActuatorChannel::WheelRearRight => 3,
            ActuatorChannel::Lift => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActuatorChannel::WheelFrontLeft => "WheelFrontLeft",
            ActuatorChannel::WheelFrontRight => "WheelFrontRight",
            ActuatorChannel::WheelRearLeft => "WheelRearLeft",
            ActuatorChannel::WheelRearRight => "WheelRearRight",
            ActuatorChannel::Lift => "Lift",
        }
    }
}

/// Pulse-width bounds for one servo channel, in microseconds.
/// `neutral` is the stop/centered position, written on init and on any stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBounds {
    pub min: u16,
    pub neutral: u16,
    pub max: u16,
}

impl Default for ChannelBounds {
    fn default() -> Self {
        ChannelBounds {
            min: 1000,
            neutral: 1500,
            max: 2000,
        }
    }
}

impl ChannelBounds {
    /// Map a normalized magnitude in [-1, 1] to a pulse width.
    ///
    /// Negative magnitudes interpolate toward `min`, positive toward `max`,
    /// and 0 yields exactly `neutral`. Out-of-range input is clamped and
    /// non-finite input falls back to neutral; remote input must never be
    /// able to drive a servo out of bounds.
    pub fn pulse_for(&self, magnitude: f32) -> u16 {
        if !magnitude.is_finite() {
            return self.neutral;
        }
        let m = magnitude.clamp(-1.0, 1.0);
        let neutral = self.neutral as f32;
        let delta = if m >= 0.0 {
            m * (self.max as f32 - neutral)
        } else {
            m * (neutral - self.min as f32)
        };
        ((neutral + delta).round() as i32).clamp(self.min as i32, self.max as i32) as u16
    }
}
