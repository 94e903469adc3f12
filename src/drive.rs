use serde::{Deserialize, Deserializer};

/// Convert a directional intent into per-wheel magnitudes, tank-steering
/// style: left side = throttle + turn, right side = throttle - turn, each
/// side clamped to [-1, 1] independently. Front and rear wheels on the same
/// side always receive the same value.
///
/// Clamping is per side, not a joint rescale: full turn at zero throttle
/// drives one side fully forward and the other fully in reverse.
///
/// Output order matches `ActuatorChannel::WHEELS`: FL, FR, RL, RR.
pub fn wheel_magnitudes(throttle: f32, turn: f32) -> [f32; 4] {
    let throttle = sanitize(throttle);
    let turn = sanitize(turn);
    let left = (throttle + turn).clamp(-1.0, 1.0);
    let right = (throttle - turn).clamp(-1.0, 1.0);
    [left, right, left, right]
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Discrete lift command. The lift is bang-bang, not proportional:
/// up drives to MAX, down to MIN, anything else holds NEUTRAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftCommand {
    Up,
    Down,
    Stop,
}

impl LiftCommand {
    pub fn magnitude(&self) -> f32 {
        match self {
            LiftCommand::Up => 1.0,
            LiftCommand::Down => -1.0,
            LiftCommand::Stop => 0.0,
        }
    }
}

// Unrecognized commands from the client must stop the lift, not error out.
impl<'de> Deserialize<'de> for LiftCommand {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Ok(match text.as_str() {
            "up" => LiftCommand::Up,
            "down" => LiftCommand::Down,
            _ => LiftCommand::Stop,
        })
    }
}
