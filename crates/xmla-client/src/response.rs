//! Decoding of XMLA `ExecuteResponse` envelopes.
//!
//! Walks the rowset's inline XSD to learn the columns (display name from
//! `sql:field`, element name, and `xsd` type), then reads each `<row>`
//! against that schema. SOAP faults and exception rowsets become
//! [`XmlaError::Fault`].

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::Value;
use xmla_service::engine::Rowset;

use crate::error::XmlaError;

/// A decoded response envelope.
#[derive(Debug)]
pub(crate) struct ExecuteResponse {
    /// Session id from the SOAP header, if present.
    pub session_id: Option<String>,
    /// The tabular result, or the engine fault.
    pub result: Result<Rowset, XmlaError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Integer,
    Float,
    /// Exact numeric; kept as its lexical form.
    Decimal,
    Boolean,
    Text,
}

impl ValueKind {
    fn from_xsd(ty: &str) -> Self {
        let local = ty.rsplit(':').next().unwrap_or(ty);
        match local {
            "long" | "int" | "short" | "byte" | "integer" | "unsignedLong" | "unsignedInt"
            | "unsignedShort" | "unsignedByte" => Self::Integer,
            "double" | "float" => Self::Float,
            "decimal" => Self::Decimal,
            "boolean" => Self::Boolean,
            _ => Self::Text,
        }
    }

    fn decode(self, raw: &str) -> Value {
        if raw.is_empty() && self != Self::Text {
            return Value::Null;
        }
        let fallback = || Value::String(raw.to_owned());
        match self {
            Self::Integer => raw
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| raw.parse::<u64>().map(Value::from))
                .unwrap_or_else(|_| fallback()),
            Self::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map_or_else(fallback, Value::Number),
            Self::Boolean => match raw {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => fallback(),
            },
            Self::Decimal | Self::Text => fallback(),
        }
    }
}

struct Column {
    element: String,
    name: String,
    kind: ValueKind,
}

#[derive(Default)]
struct FaultState {
    seen: bool,
    code: Option<String>,
    description: Option<String>,
    faultstring: Option<String>,
}

impl FaultState {
    fn record_error(&mut self, e: &BytesStart<'_>) {
        self.seen = true;
        if self.description.is_none() {
            self.code = attr(e, b"ErrorCode");
            self.description = attr(e, b"Description");
        }
    }

    fn into_error(self) -> XmlaError {
        let message = self
            .description
            .or(self.faultstring)
            .unwrap_or_else(|| "XMLA engine returned an error".to_owned());
        XmlaError::Fault {
            code: self.code,
            message,
        }
    }
}

enum Capture {
    None,
    FaultString,
    Value(usize),
}

/// Decodes an `ExecuteResponse` (or SOAP fault) envelope.
pub(crate) fn parse(xml: &str) -> Result<ExecuteResponse, XmlaError> {
    let mut reader = Reader::from_str(xml);

    let mut session_id = None;
    let mut saw_envelope = false;
    let mut fault = FaultState::default();
    let mut columns: Vec<Column> = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::new();

    let mut in_row_type = false;
    let mut current_row: Option<Vec<Value>> = None;
    let mut capture = Capture::None;
    let mut text = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlaError::Decode(format!("at byte {}: {e}", reader.error_position())))?;

        match event {
            Event::Start(e) => {
                let local = e.local_name();
                if current_row.is_some() {
                    let idx = column_index(&mut columns, local.as_ref());
                    capture = if is_nil(&e) {
                        Capture::None
                    } else {
                        text.clear();
                        Capture::Value(idx)
                    };
                    continue;
                }
                match local.as_ref() {
                    b"Envelope" => saw_envelope = true,
                    b"Session" => session_id = session_id.or_else(|| attr(&e, b"SessionId")),
                    b"Fault" | b"Exception" => fault.seen = true,
                    b"Error" => fault.record_error(&e),
                    b"faultstring" => {
                        capture = Capture::FaultString;
                        text.clear();
                    }
                    b"complexType" => in_row_type = attr(&e, b"name").as_deref() == Some("row"),
                    b"element" if in_row_type => columns.push(column(&e)),
                    b"row" => current_row = Some(Vec::new()),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let local = e.local_name();
                if let Some(row) = current_row.as_mut() {
                    let idx = column_index(&mut columns, local.as_ref());
                    if !is_nil(&e) {
                        set_value(row, idx, columns[idx].kind.decode(""));
                    }
                    continue;
                }
                match local.as_ref() {
                    b"Session" => session_id = session_id.or_else(|| attr(&e, b"SessionId")),
                    b"Exception" => fault.seen = true,
                    b"Error" => fault.record_error(&e),
                    b"element" if in_row_type => columns.push(column(&e)),
                    b"row" => rows.push(Vec::new()),
                    _ => {}
                }
            }
            Event::Text(t) => {
                if !matches!(capture, Capture::None) {
                    let chunk = t
                        .unescape()
                        .map_err(|e| XmlaError::Decode(e.to_string()))?;
                    text.push_str(&chunk);
                }
            }
            Event::CData(c) => {
                if !matches!(capture, Capture::None) {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"complexType" => in_row_type = false,
                b"faultstring" => {
                    fault.faultstring = Some(text.trim().to_owned());
                    capture = Capture::None;
                }
                b"row" if matches!(capture, Capture::None) => {
                    if let Some(row) = current_row.take() {
                        rows.push(row);
                    }
                }
                _ => {
                    if let Capture::Value(idx) = capture
                        && let Some(row) = current_row.as_mut()
                    {
                        set_value(row, idx, columns[idx].kind.decode(&text));
                        capture = Capture::None;
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_envelope {
        return Err(XmlaError::Decode("missing SOAP envelope".into()));
    }

    let result = if fault.seen {
        Err(fault.into_error())
    } else {
        Ok(Rowset {
            columns: columns.into_iter().map(|c| c.name).collect(),
            rows,
        })
    };

    Ok(ExecuteResponse { session_id, result })
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(Cow::into_owned))
}

fn is_nil(e: &BytesStart<'_>) -> bool {
    attr(e, b"nil").is_some_and(|v| v == "true")
}

fn column(e: &BytesStart<'_>) -> Column {
    let element = attr(e, b"name").unwrap_or_default();
    let name = attr(e, b"field").unwrap_or_else(|| decode_name(&element));
    let kind = attr(e, b"type").map_or(ValueKind::Text, |t| ValueKind::from_xsd(&t));
    Column {
        element,
        name,
        kind,
    }
}

/// Finds the column for a row element, appending one for elements the
/// schema did not declare.
fn column_index(columns: &mut Vec<Column>, element: &[u8]) -> usize {
    let element = String::from_utf8_lossy(element);
    if let Some(idx) = columns.iter().position(|c| c.element == element) {
        return idx;
    }
    columns.push(Column {
        name: decode_name(&element),
        element: element.into_owned(),
        kind: ValueKind::Text,
    });
    columns.len() - 1
}

fn set_value(row: &mut Vec<Value>, idx: usize, value: Value) {
    if row.len() <= idx {
        row.resize(idx + 1, Value::Null);
    }
    row[idx] = value;
}

/// Reverses XML name encoding: `_x005B_` becomes `[`.
fn decode_name(encoded: &str) -> String {
    let mut out = String::with_capacity(encoded.len());
    let mut rest = encoded;
    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &candidate[7..];
            }
            None => {
                out.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    out.push_str(rest);
    out
}
