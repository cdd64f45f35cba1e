use std::convert::Infallible;

use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use serde::Serialize;
use serde_json::json;

pub const HX_TRIGGER: HeaderName = HeaderName::from_static("hx-trigger");
pub const HX_LOCATION: HeaderName = HeaderName::from_static("hx-location");

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Error,
}

/// Response headers that drive the htmx front end.
///
/// `HX-Trigger` raises a `showAlert` event carrying `{type, message, source}`;
/// `HX-Location` asks the client to navigate after the swap.
#[derive(Debug, Clone)]
pub struct HxResponse {
    trigger: serde_json::Value,
    location: Option<String>,
}

impl HxResponse {
    pub fn alert(kind: AlertKind, message: impl Into<String>, source: &str) -> Self {
        Self {
            trigger: json!({
                "showAlert": {
                    "type": kind,
                    "message": message.into(),
                    "source": source,
                }
            }),
            location: None,
        }
    }

    pub fn success(message: impl Into<String>, source: &str) -> Self {
        Self::alert(AlertKind::Success, message, source)
    }

    pub fn location(mut self, path: impl Into<String>) -> Self {
        self.location = Some(path.into());
        self
    }
}

/// Header values must be visible ASCII, so escape everything else as `\uXXXX`.
fn ascii_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    for c in value.to_string().chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

impl IntoResponseParts for HxResponse {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        match HeaderValue::from_str(&ascii_json(&self.trigger)) {
            Ok(value) => {
                res.headers_mut().insert(HX_TRIGGER, value);
            }
            Err(e) => tracing::warn!(error = %e, "Dropping unrepresentable HX-Trigger header"),
        }
        if let Some(location) = self.location
            && let Ok(value) = HeaderValue::from_str(&location)
        {
            res.headers_mut().insert(HX_LOCATION, value);
        }
        Ok(res)
    }
}
