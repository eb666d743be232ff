//! Diagnostic event records.

use std::fmt;

use serde::Serialize;

/// Event id used by sources for control messages that carry no data.
pub const CONTROL_EVENT_ID: i32 = -1;

/// A single value in an event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl PayloadValue {
    /// The string content, if this value is string-typed.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadValue::Str(s) => f.write_str(s),
            PayloadValue::Int(v) => write!(f, "{v}"),
            PayloadValue::UInt(v) => write!(f, "{v}"),
            PayloadValue::Float(v) => write!(f, "{v}"),
            PayloadValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        PayloadValue::Str(s.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        PayloadValue::Str(s)
    }
}

impl From<i64> for PayloadValue {
    fn from(v: i64) -> Self {
        PayloadValue::Int(v)
    }
}

impl From<u64> for PayloadValue {
    fn from(v: u64) -> Self {
        PayloadValue::UInt(v)
    }
}

impl From<bool> for PayloadValue {
    fn from(v: bool) -> Self {
        PayloadValue::Bool(v)
    }
}

/// A named payload field.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadField {
    pub name: String,
    pub value: PayloadValue,
}

impl PayloadField {
    pub fn new(name: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An event written by a diagnostic source.
///
/// Events are transient: the registry hands them to listeners and drops
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticEvent {
    /// Name of the emitting source.
    pub source: String,
    /// Event name within the source.
    pub name: String,
    /// Event id; [`CONTROL_EVENT_ID`] marks control messages.
    pub id: i32,
    /// Ordered payload fields.
    pub payload: Vec<PayloadField>,
}

impl DiagnosticEvent {
    pub fn new(source: impl Into<String>, name: impl Into<String>, id: i32) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            id,
            payload: Vec::new(),
        }
    }

    /// Append a payload field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<PayloadValue>) -> Self {
        self.payload.push(PayloadField::new(name, value));
        self
    }

    /// Look up a payload value by field name.
    pub fn field(&self, name: &str) -> Option<&PayloadValue> {
        self.payload.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    pub fn is_control(&self) -> bool {
        self.id == CONTROL_EVENT_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_values_serialize_untagged() {
        let values = vec![
            PayloadValue::from("a"),
            PayloadValue::Int(-3),
            PayloadValue::UInt(7),
            PayloadValue::Bool(true),
        ];
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"["a",-3,7,true]"#);
    }

    #[test]
    fn field_lookup_by_name() {
        let event = DiagnosticEvent::new("network-sockets", "ConnectStart", 1)
            .with_field("address", "10.0.0.1:50051")
            .with_field("attempt", 2u64);

        assert_eq!(event.field("attempt"), Some(&PayloadValue::UInt(2)));
        assert!(event.field("missing").is_none());
        assert!(!event.is_control());
    }

    #[test]
    fn display_renders_plain_values() {
        assert_eq!(PayloadValue::from("x").to_string(), "x");
        assert_eq!(PayloadValue::Int(-1).to_string(), "-1");
        assert_eq!(PayloadValue::Float(0.5).to_string(), "0.5");
    }
}
