//! Message plumbing to the embedded editor.
//!
//! The editor only understands script strings and answers on a single
//! inbound channel with no request correlation. Inbound payloads are decoded
//! here into [`EditorMessage`] before anything else looks at them.

use crate::autosave::config::BlankDocument;
use crate::models::save_record::SNAPSHOT_EXTENSION;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::Value;
use tauri::ipc::InvokeBody;

pub const PSD_MIME: &str = "image/vnd.adobe.photoshop";
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Fire-and-forget outbound channel to the editor.
pub trait EditorBridge: Send + Sync + 'static {
    fn send(&self, script: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMessage {
    /// A finished serialization.
    Binary(Vec<u8>),
    /// Script echo or diagnostic output.
    Text(String),
    Other,
}

impl EditorMessage {
    pub fn from_invoke_body(body: &InvokeBody) -> Self {
        match body {
            InvokeBody::Raw(bytes) => EditorMessage::Binary(bytes.clone()),
            InvokeBody::Json(value) => Self::from_json(value),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::String(text) => EditorMessage::Text(text.clone()),
            Value::Object(map) => match map.get("text") {
                Some(Value::String(text)) => EditorMessage::Text(text.clone()),
                _ => EditorMessage::Other,
            },
            _ => EditorMessage::Other,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EditorMessage::Binary(_) => "binary",
            EditorMessage::Text(_) => "text",
            EditorMessage::Other => "other",
        }
    }
}

/// Serializes the active document, creating a blank one first if the
/// workspace is empty so the request always yields bytes.
pub fn save_script(blank: &BlankDocument) -> String {
    format!(
        r#"(function() {{
  app.echoToOE = true;
  if (app.documents.length === 0) {{
    app.documents.add({}, {}, {}, "Autosave", "rgb");
  }}
  var bytes = app.activeDocument.saveToOE("{SNAPSHOT_EXTENSION}");
  bytes;
}})();"#,
        blank.width, blank.height, blank.dpi
    )
}

/// Opens `bytes` as a new document; `false` keeps the current one open.
pub fn open_document_script(mime: &str, bytes: &[u8]) -> String {
    format!("app.open(\"{}\", null, false);", data_uri(mime, bytes))
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

pub fn mime_for_file_name(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "psd" => PSD_MIME,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => FALLBACK_MIME,
    }
}
