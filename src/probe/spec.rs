//! Probe specification: validated target, method and raw header block.

use std::collections::BTreeMap;

use super::ProbeError;

/// Method used when the caller does not name one.
pub const DEFAULT_METHOD: &str = "get";

/// Validated description of a single HTTP probe.
///
/// Construction through [`ProbeSpec::from_params`] either yields a fully
/// valid spec or fails. The raw header block is only checked when the probe
/// runs, see [`ProbeSpec::request_headers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSpec {
    url: String,
    method: String,
    headers: Option<String>,
}

impl ProbeSpec {
    /// Build a spec from the `url`, `method` and `headers` parameters.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self, ProbeError> {
        let url = params
            .get("url")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ProbeError::Validation("url for http probe is missing".to_string()))?;

        Ok(Self {
            url: normalize_url(url),
            method: params
                .get("method")
                .filter(|m| !m.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            headers: params.get("headers").cloned(),
        })
    }

    /// Restore a spec from already-normalized stored fields.
    ///
    /// The URL is kept verbatim; only an empty URL is rejected.
    pub fn from_stored(url: String, method: String, headers: Option<String>) -> Result<Self, ProbeError> {
        if url.is_empty() {
            return Err(ProbeError::Validation("stored url is empty".to_string()));
        }
        let method = if method.is_empty() { DEFAULT_METHOD.to_string() } else { method };
        Ok(Self { url, method, headers })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn headers(&self) -> Option<&str> {
        self.headers.as_deref()
    }

    /// Parse the raw header block into `(name, value)` pairs.
    ///
    /// Carriage returns are dropped and the block is split on newlines. Each
    /// line must split on `:` into exactly two tokens with a non-empty name,
    /// otherwise the whole block is rejected with the offending line in the
    /// message. A blank block yields no headers.
    pub fn request_headers(&self) -> Result<Vec<(String, String)>, ProbeError> {
        let Some(raw) = self.headers.as_deref() else {
            return Ok(Vec::new());
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        let cleaned = raw.replace('\r', "");
        let mut lines: Vec<&str> = cleaned.split('\n').collect();
        // Trailing newlines do not produce lines.
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }

        lines
            .into_iter()
            .map(|line| match split_header_line(line) {
                Some((name, value)) => Ok((name.to_string(), value.to_string())),
                None => Err(ProbeError::Validation(format!("Invalid header line: {}", line))),
            })
            .collect()
    }
}

/// Prefix `http://` unless the URL already names http or https.
fn normalize_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

/// Split `name:value`, ignoring trailing empty tokens, and require exactly two.
fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let mut tokens: Vec<&str> = line.trim().split(':').collect();
    while tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    match tokens.as_slice() {
        [name, value] if !name.trim().is_empty() => Some((name.trim(), value.trim())),
        _ => None,
    }
}
