//! Placeholder page templates.
//!
//! Templates are plain text with `{{ .Field }}` actions. Supported fields are
//! `ServiceName`, `Namespace`, `RefreshInterval`, `RequestID` and
//! `Timestamp`; values are HTML-escaped on render.

use std::fmt::Write as _;

/// Error parsing a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unterminated action starting at byte {0}")]
    Unterminated(usize),
    #[error("unknown field {0:?}")]
    UnknownField(String),
    #[error("malformed action {0:?}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ServiceName,
    Namespace,
    RefreshInterval,
    RequestId,
    Timestamp,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "ServiceName" => Some(Self::ServiceName),
            "Namespace" => Some(Self::Namespace),
            "RefreshInterval" => Some(Self::RefreshInterval),
            "RequestID" => Some(Self::RequestId),
            "Timestamp" => Some(Self::Timestamp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field(Field),
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    pub service_name: String,
    pub namespace: String,
    pub refresh_interval: u32,
    pub request_id: String,
    pub timestamp: String,
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            if start > 0 {
                segments.push(Segment::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or(TemplateError::Unterminated(offset + start))?;

            let action = after[..end].trim();
            let name = action
                .strip_prefix('.')
                .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_alphanumeric()))
                .ok_or_else(|| TemplateError::Malformed(action.to_string()))?;
            let field = Field::parse(name).ok_or_else(|| TemplateError::UnknownField(name.to_string()))?;
            segments.push(Segment::Field(field));

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Template with no actions.
    pub fn literal(text: &str) -> Self {
        Self {
            segments: vec![Segment::Text(text.to_string())],
        }
    }

    pub fn render(&self, data: &TemplateData) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(Field::ServiceName) => escape_into(&mut out, &data.service_name),
                Segment::Field(Field::Namespace) => escape_into(&mut out, &data.namespace),
                Segment::Field(Field::RefreshInterval) => {
                    let _ = write!(out, "{}", data.refresh_interval);
                }
                Segment::Field(Field::RequestId) => escape_into(&mut out, &data.request_id),
                Segment::Field(Field::Timestamp) => escape_into(&mut out, &data.timestamp),
            }
        }
        out
    }
}

fn escape_into(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}

/// Page used when a target configures no content of its own.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta http-equiv="refresh" content="{{ .RefreshInterval }}">
    <title>Service Starting</title>
    <style>
        body { font-family: sans-serif; display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; background: #f5f5f5; }
        .container { text-align: center; padding: 2rem; background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); }
        .spinner { width: 40px; height: 40px; margin: 1rem auto; border: 4px solid #eee; border-top-color: #326ce5; border-radius: 50%; animation: spin 1s linear infinite; }
        @keyframes spin { to { transform: rotate(360deg); } }
    </style>
</head>
<body>
    <div class="container">
        <h1>{{ .ServiceName }} is starting up...</h1>
        <div class="spinner"></div>
        <p>This page refreshes automatically every {{ .RefreshInterval }} seconds.</p>
    </div>
</body>
</html>
"#;

/// Last-resort page when a template cannot be resolved or parsed.
pub fn minimal_page(refresh_interval: u32) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta http-equiv=\"refresh\" content=\"{refresh_interval}\"><title>Service Starting</title></head><body><h1>Service is starting up...</h1></body></html>"
    )
}
