//! HTTP transport backed by `reqwest`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH};
use reqwest::Method;

use super::{ProbeError, ProbeRequest, ProbeResponse, Transport};
use crate::config::ProbeSettings;

/// Production transport. One client is shared by every probe it runs.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(settings: &ProbeSettings) -> Result<Self, ProbeError> {
        let mut builder = reqwest::Client::builder().user_agent(settings.user_agent.clone());
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ProbeRequest) -> Result<Box<dyn ProbeResponse>, ProbeError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| ProbeError::Validation(format!("invalid method {:?}: {}", request.method, e)))?;

        let mut headers = HeaderMap::with_capacity(request.headers.len());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ProbeError::Validation(format!("invalid header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ProbeError::Validation(format!("invalid header value {:?}: {}", value, e)))?;
            headers.append(name, value);
        }

        let response = self
            .client
            .request(method, &request.url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Network(format!("request timed out: {}", e))
                } else {
                    ProbeError::Network(e.to_string())
                }
            })?;

        Ok(Box::new(ReqwestResponse {
            response: Some(response),
            pending: Vec::new(),
            offset: 0,
        }))
    }
}

/// A `reqwest` response drained in caller-sized reads.
struct ReqwestResponse {
    response: Option<reqwest::Response>,
    pending: Vec<u8>,
    offset: usize,
}

#[async_trait]
impl ProbeResponse for ReqwestResponse {
    fn status(&self) -> u16 {
        self.response
            .as_ref()
            .map(|r| r.status().as_u16())
            .unwrap_or_default()
    }

    fn content_length(&self) -> i64 {
        self.response
            .as_ref()
            .and_then(|r| r.headers().get(CONTENT_LENGTH))
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(-1)
    }

    fn headers(&self) -> Vec<(String, Vec<String>)> {
        let Some(response) = self.response.as_ref() else {
            return Vec::new();
        };
        let map = response.headers();
        map.keys()
            .map(|name| {
                let values = map
                    .get_all(name)
                    .iter()
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                    .collect();
                (name.as_str().to_string(), values)
            })
            .collect()
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ProbeError> {
        if self.offset >= self.pending.len() {
            let Some(response) = self.response.as_mut() else {
                return Ok(0);
            };
            match response
                .chunk()
                .await
                .map_err(|e| ProbeError::Network(format!("failed to read body: {}", e)))?
            {
                Some(chunk) => {
                    self.pending = chunk.to_vec();
                    self.offset = 0;
                }
                None => return Ok(0),
            }
        }

        let available = &self.pending[self.offset..];
        let n = buf.len().min(available.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.offset += n;
        Ok(n)
    }

    fn close(&mut self) -> Result<(), ProbeError> {
        self.pending.clear();
        self.offset = 0;
        Ok(())
    }

    fn disconnect(&mut self) {
        // Dropping the response hands the connection back to the client, or
        // closes it when the body was not fully read.
        self.response.take();
    }
}
