use crate::dispatcher::{ControlIntent, Dispatcher};
use crate::sink::ActuatorSink;
use anyhow::Result;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use tungstenite::{accept, Message};

/// WebSocket command channel: one thread per client connection, text frames
/// carrying `ControlIntent` JSON. Intents are applied in arrival order; when
/// the session ends (close frame, read error, dropped link) the dispatcher
/// is force-stopped exactly once, so a vanished client can never leave the
/// robot running.
pub fn serve<S>(addr: &str, dispatcher: Arc<Dispatcher<S>>) -> Result<()>
where
    S: ActuatorSink + Send + 'static,
{
    let server = TcpListener::bind(addr)?;
    log::info!("control server listening on {}", addr);

    for stream in server.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                log::warn!("connection error: {}", e);
                continue;
            }
        };

        let dispatcher = Arc::clone(&dispatcher);
        thread::spawn(move || {
            let mut websocket = match accept(stream) {
                Ok(ws) => ws,
                Err(e) => {
                    log::warn!("WebSocket handshake error: {}", e);
                    return;
                }
            };

            log::info!("client connected");

            loop {
                match websocket.read() {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ControlIntent>(&text) {
                            Ok(intent) => dispatcher.accept(&intent),
                            // Malformed input is dropped, never a session error.
                            Err(e) => log::warn!("ignoring malformed intent: {}", e),
                        }
                    }
                    Ok(Message::Close(_)) => {
                        log::info!("client sent close");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        log::info!("client connection lost: {}", e);
                        break;
                    }
                }
            }

            // The disconnect signal, distinct from the liveness timeout.
            dispatcher.force_stop();
        });
    }

    Ok(())
}
