//! Frame dispatch: wire frames in, named application events out.
//!
//! Inbound classification rules:
//! 1. payload is not syntactically valid JSON -> the whole payload is an
//!    unstructured command string, emitted verbatim as a `command` event
//! 2. payload is valid JSON carrying a non-empty string `name` -> emit an
//!    event of that name with the record's `data` field (`null` when absent)
//! 3. payload is valid JSON without a usable `name` (absent, non-string or
//!    empty) -> protocol violation, `InvalidResponse`
//!
//! Only syntax-level parse failures are recovered; any other parse failure
//! class propagates as a fatal error.

use crate::emitter::EventEmitter;
use crate::traits::{OutboundMessage, Result, ServiceWsError};
use parking_lot::Mutex;
use serde_json::{error::Category, Value};
use std::sync::Arc;
use tracing::debug;

/// Event name used for the connection-established emission
pub const CONNECTION_EVENT: &str = "connection";

/// Event name used for unstructured command frames
pub const COMMAND_EVENT: &str = "command";

/// Translates between wire frames and named application events
#[derive(Clone)]
pub struct EventDispatcher {
    emitter: Arc<Mutex<EventEmitter>>,
}

impl EventDispatcher {
    pub fn new(emitter: Arc<Mutex<EventEmitter>>) -> Self {
        Self { emitter }
    }

    /// Shared listener registry this dispatcher emits on
    pub fn emitter(&self) -> &Arc<Mutex<EventEmitter>> {
        &self.emitter
    }

    /// Emit the `connection` event (no payload)
    pub fn emit_connection(&self) {
        self.emit(CONNECTION_EVENT, &Value::Null);
    }

    /// Emit `name` to every registered listener
    ///
    /// The listener snapshot is taken under the registry lock, but the
    /// callbacks run without it, so a listener may subscribe or unsubscribe
    /// from inside its own callback.
    pub fn emit(&self, name: &str, payload: &Value) {
        let batch = self.emitter.lock().snapshot(name);
        if batch.is_empty() {
            debug!("no listeners for event {}", name);
            return;
        }

        let mut fired_once = Vec::new();
        for (id, once, callback) in batch {
            (*callback.lock())(payload);
            if once {
                fired_once.push(id);
            }
        }
        if !fired_once.is_empty() {
            self.emitter.lock().remove_fired(name, &fired_once);
        }
    }

    /// Classify and dispatch one inbound frame
    pub fn dispatch(&self, payload: &str) -> Result<()> {
        let frame = match serde_json::from_str::<Value>(payload) {
            Ok(frame) => frame,
            Err(e) if matches!(e.classify(), Category::Syntax | Category::Eof) => {
                // not structured data, the whole payload is a command string
                let raw = Value::String(payload.to_string());
                self.emit(COMMAND_EVENT, &raw);
                return Ok(());
            }
            Err(e) => return Err(ServiceWsError::Parse(e.to_string())),
        };

        match frame.get("name").and_then(Value::as_str) {
            Some(name) if !name.is_empty() => {
                let name = name.to_string();
                let data = frame.get("data").cloned().unwrap_or(Value::Null);
                debug!("emit {}({})", name, data);
                self.emit(&name, &data);
                Ok(())
            }
            _ => Err(ServiceWsError::InvalidResponse(format!(
                "structured frame without a usable name field: {}",
                frame
            ))),
        }
    }

    /// Encode an outbound call into wire-text parts
    ///
    /// The first part is serialized to JSON text when it is not already a
    /// string; extra parts are forwarded alongside it unchanged.
    pub fn encode_parts(
        &self,
        message: OutboundMessage,
        extras: Vec<OutboundMessage>,
    ) -> Result<Vec<String>> {
        let mut parts = Vec::with_capacity(1 + extras.len());
        parts.push(message.into_text()?);
        for extra in extras {
            parts.push(extra.into_text()?);
        }
        Ok(parts)
    }
}
