use crate::channel::{ActuatorChannel, ChannelBounds};
use serde::{Serialize, Deserialize};
use std::fs;
use std::io::{self, Write};
use std::time::Duration;

const DEFAULT_PINS: [u8; 5] = [12, 13, 18, 19, 23];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSetup {
    pub name: String,
    pub pin: u8,         // GPIO pin driving this servo
    pub min: u16,        // Minimum pulse width (us)
    pub neutral: u16,    // Stop/centered pulse width (us)
    pub max: u16,        // Maximum pulse width (us)
}

impl ChannelSetup {
    fn new(name: &'static str, pin: u8) -> Self {
        ChannelSetup {
            name: String::from(name),
            pin,
            min: 1000,
            neutral: 1500,
            max: 2000,
        }
    }

    pub fn bounds(&self) -> ChannelBounds {
        if self.min <= self.neutral && self.neutral <= self.max {
            ChannelBounds {
                min: self.min,
                neutral: self.neutral,
                max: self.max,
            }
        } else {
            log::warn!("inconsistent bounds for {}, using defaults", self.name);
            ChannelBounds::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listen_addr: String,
    pub watchdog_timeout_ms: u64,
    pub watchdog_interval_ms: u64,
    pub channels: Vec<ChannelSetup>,
    #[serde(skip)]
    settings_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        let channels = ActuatorChannel::ALL
            .iter()
            .map(|c| ChannelSetup::new(c.name(), DEFAULT_PINS[c.index()]))
            .collect();

        Settings {
            listen_addr: String::from("0.0.0.0:8080"),
            watchdog_timeout_ms: 1000,
            watchdog_interval_ms: 250,
            channels,
            settings_path: String::from("settings.json"),
        }
    }
}

impl Settings {
    pub fn new(settings_path: &str) -> Self {
        Settings {
            settings_path: settings_path.to_string(),
            ..Settings::default()
        }
    }

    /// Per-channel pulse bounds; a missing or inconsistent entry falls back
    /// to defaults so a hand-edited file cannot keep the robot from starting.
    pub fn bounds_array(&self) -> [ChannelBounds; 5] {
        let mut bounds = [ChannelBounds::default(); 5];
        for channel in ActuatorChannel::ALL {
            if let Some(setup) = self.channels.get(channel.index()) {
                bounds[channel.index()] = setup.bounds();
            } else {
                log::warn!("no bounds configured for {}, using defaults", channel.name());
            }
        }
        bounds
    }

    pub fn pins(&self) -> [u8; 5] {
        let mut pins = DEFAULT_PINS;
        for channel in ActuatorChannel::ALL {
            if let Some(setup) = self.channels.get(channel.index()) {
                pins[channel.index()] = setup.pin;
            }
        }
        pins
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }

    pub fn save(&self) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        let mut file = fs::File::create(self.settings_path.clone())?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    pub fn load(&mut self) -> io::Result<()> {
        let content = fs::read_to_string(self.settings_path.clone())?;
        let mut loaded: Settings = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        loaded.settings_path = self.settings_path.clone();
        *self = loaded;
        Ok(())
    }
}
