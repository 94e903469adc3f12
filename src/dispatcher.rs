use crate::channel::{ActuatorChannel, ChannelBounds};
use crate::drive::{self, LiftCommand};
use crate::sink::ActuatorSink;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// One control event from the remote client. Every field is optional: the
/// client only sends what it wants to change, and anything missing or
/// malformed degrades to "no change" or neutral rather than an error.
///
/// `probe` is a diagnostic: drive a single wheel (index 0-3) to full while
/// the other wheels hold neutral, used to verify the wiring channel by
/// channel.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ControlIntent {
    pub throttle: Option<f32>,
    pub turn: Option<f32>,
    pub lift: Option<LiftCommand>,
    pub probe: Option<u8>,
}

impl ControlIntent {
    fn has_drive(&self) -> bool {
        self.throttle.is_some() || self.turn.is_some()
    }
}

/// Liveness state of the robot as the watchdog sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveState {
    /// The robot may be moving; the liveness clock is running.
    Armed,
    /// Every channel is at neutral after a stop.
    Stopped,
}

struct Inner<S> {
    sink: S,
    pulses: [u16; 5],
    last_accept: Instant,
    state: DriveState,
}

/// Single serialization point between the command channel and the watchdog.
///
/// All mutation goes through the internal mutex, so an `accept` and a
/// `force_stop` can never interleave and the sink never observes a
/// half-applied set of channel values.
pub struct Dispatcher<S> {
    bounds: [ChannelBounds; 5],
    inner: Mutex<Inner<S>>,
}

impl<S: ActuatorSink> Dispatcher<S> {
    pub fn new(sink: S, bounds: [ChannelBounds; 5]) -> Self {
        let pulses = [
            bounds[0].neutral,
            bounds[1].neutral,
            bounds[2].neutral,
            bounds[3].neutral,
            bounds[4].neutral,
        ];
        Dispatcher {
            bounds,
            inner: Mutex::new(Inner {
                sink,
                pulses,
                last_accept: Instant::now(),
                state: DriveState::Stopped,
            }),
        }
    }

    /// Apply one control intent: translate, push changed channels to the
    /// sink, record the acceptance time. Arms the watchdog whenever the
    /// resulting command is non-neutral on any channel.
    pub fn accept(&self, intent: &ControlIntent) {
        let mut inner = self.inner.lock().unwrap();

        let mut targets = inner.pulses;

        if intent.has_drive() {
            let magnitudes = drive::wheel_magnitudes(
                intent.throttle.unwrap_or(0.0),
                intent.turn.unwrap_or(0.0),
            );
            for (wheel, magnitude) in ActuatorChannel::WHEELS.iter().zip(magnitudes) {
                targets[wheel.index()] = self.bounds[wheel.index()].pulse_for(magnitude);
            }
        }

        if let Some(lift) = intent.lift {
            let index = ActuatorChannel::Lift.index();
            targets[index] = self.bounds[index].pulse_for(lift.magnitude());
        }

        if let Some(probe) = intent.probe {
            if (probe as usize) < ActuatorChannel::WHEELS.len() {
                for wheel in ActuatorChannel::WHEELS {
                    let magnitude = if wheel.index() == probe as usize { 1.0 } else { 0.0 };
                    targets[wheel.index()] = self.bounds[wheel.index()].pulse_for(magnitude);
                }
                log::debug!("probing wheel channel {}", probe);
            } else {
                log::warn!("ignoring probe for unknown channel {}", probe);
            }
        }

        inner.apply(&targets);
        inner.last_accept = Instant::now();

        let non_neutral = targets
            .iter()
            .zip(&self.bounds)
            .any(|(pulse, bounds)| *pulse != bounds.neutral);
        if non_neutral {
            inner.state = DriveState::Armed;
        }
    }

    /// Unconditionally command neutral on every channel. Idempotent: each
    /// call writes all channels so a repeated stop produces the same writes.
    pub fn force_stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.force_stop(&self.bounds);
    }

    /// Watchdog entry point. The elapsed check and the forced stop happen
    /// under one lock acquisition, so a fresh intent cannot slip in between
    /// the decision and the stop. Returns true if a stop was applied.
    pub fn stop_if_expired(&self, timeout: Duration) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == DriveState::Armed && inner.last_accept.elapsed() >= timeout {
            inner.force_stop(&self.bounds);
            true
        } else {
            false
        }
    }

    pub fn state(&self) -> DriveState {
        self.inner.lock().unwrap().state
    }

    /// Time since the last accepted intent.
    pub fn idle_for(&self) -> Duration {
        self.inner.lock().unwrap().last_accept.elapsed()
    }

    #[cfg(test)]
    pub fn pulses(&self) -> [u16; 5] {
        self.inner.lock().unwrap().pulses
    }
}

impl<S: ActuatorSink> Inner<S> {
    /// Write every channel whose target differs from the current command.
    /// A failed write is logged and does not abort the rest of the batch;
    /// the commanded value is kept so the next stop retries the channel.
    fn apply(&mut self, targets: &[u16; 5]) {
        for channel in ActuatorChannel::ALL {
            let index = channel.index();
            if targets[index] == self.pulses[index] {
                continue;
            }
            if let Err(e) = self.sink.write(channel, targets[index]) {
                log::warn!("servo write failed on {}: {}", channel.name(), e);
            }
            self.pulses[index] = targets[index];
        }
    }

    fn force_stop(&mut self, bounds: &[ChannelBounds; 5]) {
        for channel in ActuatorChannel::ALL {
            let index = channel.index();
            let neutral = bounds[index].neutral;
            if let Err(e) = self.sink.write(channel, neutral) {
                log::warn!("servo write failed on {}: {}", channel.name(), e);
            }
            self.pulses[index] = neutral;
        }
        self.state = DriveState::Stopped;
        log::info!("all channels forced to neutral");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::mock::RecordingSink;
    use std::sync::Arc;
    use std::thread;

    fn dispatcher() -> (Dispatcher<RecordingSink>, RecordingSink) {
        let sink = RecordingSink::new();
        let dispatcher = Dispatcher::new(sink.clone(), [ChannelBounds::default(); 5]);
        (dispatcher, sink)
    }

    fn drive_intent(throttle: f32, turn: f32) -> ControlIntent {
        ControlIntent {
            throttle: Some(throttle),
            turn: Some(turn),
            ..Default::default()
        }
    }

    #[test]
    fn test_full_forward() {
        let (dispatcher, sink) = dispatcher();
        dispatcher.accept(&drive_intent(1.0, 0.0));

        assert_eq!(dispatcher.pulses(), [2000, 2000, 2000, 2000, 1500]);
        assert_eq!(dispatcher.state(), DriveState::Armed);
        // Lift was not part of the intent: no write on channel 4.
        assert!(sink.writes().iter().all(|(c, _)| *c != ActuatorChannel::Lift));
    }

    #[test]
    fn test_turn_in_place() {
        let (dispatcher, _sink) = dispatcher();
        dispatcher.accept(&drive_intent(0.0, 1.0));
        assert_eq!(dispatcher.pulses(), [2000, 1000, 2000, 1000, 1500]);
    }

    #[test]
    fn test_lift_up_leaves_wheels_alone() {
        let (dispatcher, sink) = dispatcher();
        dispatcher.accept(&drive_intent(1.0, 0.0));
        sink.take_writes();

        dispatcher.accept(&ControlIntent {
            lift: Some(LiftCommand::Up),
            ..Default::default()
        });

        assert_eq!(sink.take_writes(), vec![(ActuatorChannel::Lift, 2000)]);
        assert_eq!(dispatcher.pulses(), [2000, 2000, 2000, 2000, 2000]);
    }

    #[test]
    fn test_neutral_intent_does_not_arm() {
        let (dispatcher, _sink) = dispatcher();
        dispatcher.accept(&drive_intent(0.0, 0.0));
        assert_eq!(dispatcher.state(), DriveState::Stopped);
        assert!(dispatcher.idle_for() < Duration::from_millis(100));
    }

    #[test]
    fn test_unchanged_channels_are_not_rewritten() {
        let (dispatcher, sink) = dispatcher();
        dispatcher.accept(&drive_intent(0.5, 0.0));
        sink.take_writes();

        dispatcher.accept(&drive_intent(0.5, 0.0));
        assert!(sink.take_writes().is_empty());
    }

    #[test]
    fn test_force_stop_is_idempotent() {
        let (dispatcher, sink) = dispatcher();
        dispatcher.accept(&drive_intent(1.0, 0.5));

        sink.take_writes();
        dispatcher.force_stop();
        let first = sink.take_writes();
        dispatcher.force_stop();
        let second = sink.take_writes();

        let all_neutral: Vec<_> = ActuatorChannel::ALL.iter().map(|c| (*c, 1500)).collect();
        assert_eq!(first, all_neutral);
        assert_eq!(second, all_neutral);
        assert_eq!(dispatcher.state(), DriveState::Stopped);
        assert_eq!(dispatcher.pulses(), [1500; 5]);
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        let (dispatcher, _sink) = dispatcher();
        dispatcher.accept(&drive_intent(5.0, 0.0));
        assert_eq!(dispatcher.pulses(), [2000, 2000, 2000, 2000, 1500]);

        dispatcher.accept(&drive_intent(f32::NAN, f32::NAN));
        assert_eq!(dispatcher.pulses(), [1500; 5]);
    }

    #[test]
    fn test_write_failure_does_not_abort_batch() {
        let (dispatcher, sink) = dispatcher();
        sink.fail_channel(ActuatorChannel::WheelFrontLeft);

        dispatcher.accept(&drive_intent(1.0, 0.0));

        // All four wheels were attempted despite the first one failing.
        assert_eq!(sink.writes().len(), 4);
        assert_eq!(dispatcher.pulses(), [2000, 2000, 2000, 2000, 1500]);

        // The stop path still attempts the broken channel too.
        sink.take_writes();
        dispatcher.force_stop();
        assert_eq!(sink.take_writes().len(), 5);
        assert_eq!(dispatcher.state(), DriveState::Stopped);
    }

    #[test]
    fn test_probe_drives_single_wheel() {
        let (dispatcher, sink) = dispatcher();
        dispatcher.accept(&ControlIntent {
            probe: Some(2),
            ..Default::default()
        });

        assert_eq!(sink.take_writes(), vec![(ActuatorChannel::WheelRearLeft, 2000)]);
        assert_eq!(dispatcher.pulses(), [1500, 1500, 2000, 1500, 1500]);
        assert_eq!(dispatcher.state(), DriveState::Armed);
    }

    #[test]
    fn test_probe_resets_other_wheels() {
        let (dispatcher, _sink) = dispatcher();
        dispatcher.accept(&drive_intent(1.0, 0.0));
        dispatcher.accept(&ControlIntent {
            probe: Some(1),
            ..Default::default()
        });
        assert_eq!(dispatcher.pulses(), [1500, 2000, 1500, 1500, 1500]);
    }

    #[test]
    fn test_probe_out_of_range_is_ignored() {
        let (dispatcher, sink) = dispatcher();
        dispatcher.accept(&ControlIntent {
            probe: Some(7),
            ..Default::default()
        });
        assert!(sink.writes().is_empty());
        assert_eq!(dispatcher.state(), DriveState::Stopped);
    }

    #[test]
    fn test_disconnect_stop_wins_over_inflight_intent() {
        let (dispatcher, _sink) = dispatcher();
        let dispatcher = Arc::new(dispatcher);

        let worker = {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                dispatcher.accept(&drive_intent(1.0, 0.0));
            })
        };
        worker.join().unwrap();

        // Disconnect is always delivered after the session's last intent.
        dispatcher.force_stop();
        assert_eq!(dispatcher.state(), DriveState::Stopped);
        assert_eq!(dispatcher.pulses(), [1500; 5]);
    }

    #[test]
    fn test_intent_json_shapes() {
        let intent: ControlIntent = serde_json::from_str(r#"{"throttle":0.8,"turn":-0.2}"#).unwrap();
        assert_eq!(intent.throttle, Some(0.8));
        assert_eq!(intent.turn, Some(-0.2));
        assert_eq!(intent.lift, None);

        let intent: ControlIntent = serde_json::from_str(r#"{"lift":"down"}"#).unwrap();
        assert_eq!(intent.lift, Some(LiftCommand::Down));
        assert!(!intent.has_drive());

        // Unknown fields from newer clients are ignored.
        let intent: ControlIntent = serde_json::from_str(r#"{"throttle":1,"camera":"on"}"#).unwrap();
        assert_eq!(intent.throttle, Some(1.0));
    }
}
