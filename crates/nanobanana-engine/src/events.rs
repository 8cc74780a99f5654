use serde_json::{Map, Value};

use nanobanana_contracts::events::EventWriter;

/// Event emitter scoped to one logical request.
///
/// Write failures never affect generation; they are only logged.
#[derive(Debug, Clone)]
pub struct RunEvents {
    writer: Option<EventWriter>,
    request_id: String,
}

impl RunEvents {
    pub fn new(writer: Option<EventWriter>, request_id: impl Into<String>) -> Self {
        Self {
            writer,
            request_id: request_id.into(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, String::new())
    }

    pub fn emit(&self, event_type: &str, payload: Value) {
        let Some(writer) = self.writer.as_ref() else {
            return;
        };
        let mut map = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert(
            "request_id".to_string(),
            Value::String(self.request_id.clone()),
        );
        if let Err(err) = writer.emit(event_type, map) {
            tracing::warn!(event_type, error = %err, "failed to write event");
        }
    }
}
