use crate::channel::ActuatorChannel;
use rppal::gpio::{Gpio, OutputPin};
use std::time::Duration;
use thiserror::Error;

// Standard 50Hz servo frame.
const PWM_PERIOD: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("actuator fault: {0}")]
    Fault(&'static str),
}

/// The single hardware seam of the controller: accepts one pulse-width
/// command per channel. Write failures are reported, never panicked on.
pub trait ActuatorSink {
    fn write(&mut self, channel: ActuatorChannel, pulse_us: u16) -> Result<(), SinkError>;
}

/// Software-PWM servo output, one GPIO pin per actuator channel.
pub struct GpioServoSink {
    pins: Vec<OutputPin>,
}

impl GpioServoSink {
    pub fn new(pin_numbers: [u8; 5]) -> Result<Self, SinkError> {
        let gpio = Gpio::new()?;
        let mut pins = Vec::with_capacity(pin_numbers.len());
        for &number in &pin_numbers {
            pins.push(gpio.get(number)?.into_output());
        }
        log::info!("servo outputs on GPIO pins {:?}", pin_numbers);
        Ok(GpioServoSink { pins })
    }
}

impl ActuatorSink for GpioServoSink {
    fn write(&mut self, channel: ActuatorChannel, pulse_us: u16) -> Result<(), SinkError> {
        let pin = &mut self.pins[channel.index()];
        pin.set_pwm(PWM_PERIOD, Duration::from_micros(pulse_us as u64))?;
        Ok(())
    }
}
