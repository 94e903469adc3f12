mod channel;
mod config;
mod dispatcher;
mod drive;
mod sink;
mod watchdog;
mod websocket;

use config::Settings;
use dispatcher::Dispatcher;
use sink::GpioServoSink;
use watchdog::Watchdog;

use anyhow::Result;
use std::sync::Arc;

const SETTINGS_PATH: &str = "settings.json";

fn main() -> Result<()> {
    env_logger::init();
    log::info!("Starting TerreBot teleoperation controller");

    let mut settings = Settings::new(SETTINGS_PATH);
    match settings.load() {
        Ok(_) => log::info!("loaded settings from {}", SETTINGS_PATH),
        Err(e) => log::warn!("could not load settings ({}), using defaults", e),
    }
    settings.save()?;

    let sink = GpioServoSink::new(settings.pins())?;
    let dispatcher = Arc::new(Dispatcher::new(sink, settings.bounds_array()));

    // Center every servo before accepting any client.
    dispatcher.force_stop();

    let _watchdog = Watchdog::spawn(
        Arc::clone(&dispatcher),
        settings.watchdog_timeout(),
        settings.watchdog_interval(),
    );

    websocket::serve(&settings.listen_addr, dispatcher)
}
