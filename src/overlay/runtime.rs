use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};

use crate::overlay::api::OverlayHost;
use crate::overlay::present::default_backend;
use crate::overlay::settings::OverlaySettings;

const IDLE_WAIT: Duration = Duration::from_millis(16);

/// One host entry point plus its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    IsSupported,
    Start(Option<Value>),
    SetPointer(Option<Value>),
    SetPenStyle(Option<Value>),
    UndoStroke,
    ClearStrokes,
    Stop,
    DebugMetrics,
}

enum Command {
    Call(HostCall, Sender<Value>),
    Shutdown,
}

/// Runs an [`OverlayHost`] call against `host` and serialises the response.
pub fn dispatch(host: &mut OverlayHost, call: HostCall) -> Value {
    match call {
        HostCall::IsSupported => Value::Bool(host.is_supported()),
        HostCall::Start(payload) => to_json(host.start(payload.as_ref())),
        HostCall::SetPointer(payload) => to_json(host.set_pointer(payload.as_ref())),
        HostCall::SetPenStyle(payload) => to_json(host.set_pen_style(payload.as_ref())),
        HostCall::UndoStroke => to_json(host.undo_stroke()),
        HostCall::ClearStrokes => to_json(host.clear_strokes()),
        HostCall::Stop => to_json(host.stop()),
        HostCall::DebugMetrics => to_json(host.debug_metrics()),
    }
}

fn to_json<T: Serialize>(response: T) -> Value {
    serde_json::to_value(response).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "failed to serialize overlay response");
        json!({ "ok": false, "reason": "INTERNAL" })
    })
}

/// Owns the overlay thread. Every call and every frame tick runs on that thread.
pub struct OverlayRuntime {
    tx: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl OverlayRuntime {
    /// Starts the overlay thread with the platform backend.
    pub fn spawn(settings: OverlaySettings) -> Result<Self> {
        Self::spawn_with(move || OverlayHost::new(default_backend(), settings))
    }

    /// Starts the overlay thread; `make_host` runs on that thread so window handles never cross threads.
    pub fn spawn_with<F>(make_host: F) -> Result<Self>
    where
        F: FnOnce() -> OverlayHost + Send + 'static,
    {
        let (tx, rx) = channel::<Command>();
        let handle = thread::Builder::new()
            .name("overlay-host".to_string())
            .spawn(move || {
                let mut host = make_host();
                tracing::debug!(supported = host.is_supported(), "overlay thread started");
                loop {
                    host.backend_mut().pump_messages();

                    let wait = host.next_tick_in().unwrap_or(IDLE_WAIT);
                    match rx.recv_timeout(wait) {
                        Ok(Command::Call(call, reply)) => {
                            let _ = reply.send(dispatch(&mut host, call));
                        }
                        Ok(Command::Shutdown) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                    host.tick();
                }
                host.stop();
                tracing::debug!("overlay thread exited");
            })
            .map_err(|err| anyhow!("failed to spawn overlay thread: {err}"))?;

        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Sends `call` to the overlay thread and waits for its response.
    pub fn call(&self, call: HostCall) -> Result<Value> {
        let (reply_tx, reply_rx) = channel();
        self.tx
            .send(Command::Call(call, reply_tx))
            .map_err(|_| anyhow!("overlay thread is not running"))?;
        reply_rx.recv().context("overlay thread dropped the call")
    }

    /// Stops any session and joins the overlay thread.
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.tx.send(Command::Shutdown);
        handle
            .join()
            .map_err(|_| anyhow!("overlay thread panicked"))
    }
}

impl Drop for OverlayRuntime {
    fn drop(&mut self) {
        if let Err(err) = self.join() {
            tracing::warn!(error = %err, "overlay runtime shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::clock::ManualClock;
    use crate::overlay::model::OverlayBounds;
    use crate::overlay::present::HeadlessBackend;

    #[test]
    fn dispatch_maps_calls_to_json() {
        let backend = HeadlessBackend::new(OverlayBounds::new(0, 0, 64, 64));
        let mut host = OverlayHost::with_clock(
            Box::new(backend),
            Box::new(ManualClock::new(0)),
            OverlaySettings::default(),
        );
        assert_eq!(dispatch(&mut host, HostCall::IsSupported), json!(true));
        let start = dispatch(&mut host, HostCall::Start(None));
        assert_eq!(start["width"], json!(64));
        assert_eq!(
            dispatch(&mut host, HostCall::UndoStroke),
            json!({ "ok": true, "strokeCount": 0 })
        );
        assert_eq!(
            dispatch(&mut host, HostCall::Stop),
            json!({ "ok": true, "stopped": true })
        );
    }

    #[test]
    fn runtime_serialises_calls_on_its_thread() {
        let backend = HeadlessBackend::new(OverlayBounds::new(0, 0, 32, 32));
        let log = backend.clone();
        let runtime = OverlayRuntime::spawn_with(move || {
            OverlayHost::with_clock(
                Box::new(backend),
                Box::new(ManualClock::new(0)),
                OverlaySettings::default(),
            )
        })
        .expect("spawn");

        let start = runtime.call(HostCall::Start(None)).expect("start");
        assert_eq!(start["ok"], json!(true));
        let pointer = runtime
            .call(HostCall::SetPointer(Some(json!({
                "x": 4, "y": 4, "inside": true, "down": true, "drawActive": true
            }))))
            .expect("pointer");
        assert_eq!(pointer["strokeCount"], json!(1));

        runtime.shutdown().expect("shutdown");
        assert_eq!(log.snapshot().releases, 1);
    }
}
