//! Declarative request bindings.
//!
//! Every remote call is an [`Operation`] constant: verb, path template,
//! media types, wire format and what a 404 means for it. The [`Invoker`]
//! turns an operation plus arguments into exactly one HTTP exchange.

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use stratus_common::{CloudError, Result};

use crate::session::Session;
use crate::transport::{HttpRequest, HttpResponse, Payload, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
}

/// How a 404 response is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnNotFound {
    /// The resource is absent: `None`, or an empty collection for lists.
    Absent,
    /// The server must know the target; 404 is an unexpected response.
    Fail,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: &'static str,
    pub method: Method,
    /// Suffix appended to the base URL; `{param}` segments are substituted
    /// with percent-encoded values.
    pub path: &'static str,
    pub accept: &'static str,
    pub content_type: Option<&'static str>,
    pub format: Format,
    pub on_not_found: OnNotFound,
}

impl Operation {
    pub fn url(&self, base: &str, params: &[(&str, &str)]) -> String {
        let mut path = self.path.to_string();
        for (name, value) in params {
            let placeholder = format!("{{{}}}", name);
            path = path.replace(&placeholder, &urlencoding::encode(value));
        }
        format!("{}{}", base.trim_end_matches('/'), path)
    }

    pub fn encode<B: Serialize>(&self, body: &B) -> Result<Payload> {
        let content_type = self.content_type.unwrap_or(match self.format {
            Format::Json => "application/json",
            Format::Xml => "application/xml",
        });
        let bytes = match self.format {
            Format::Json => {
                serde_json::to_vec(body).map_err(|e| CloudError::Encode(e.to_string()))?
            }
            Format::Xml => quick_xml::se::to_string(body)
                .map_err(|e| CloudError::Encode(e.to_string()))?
                .into_bytes(),
        };
        Ok(Payload::new(content_type, bytes))
    }

    pub fn decode<T: DeserializeOwned>(&self, url: &str, response: &HttpResponse) -> Result<T> {
        let decoded = match self.format {
            Format::Json => serde_json::from_slice(&response.body).map_err(|e| e.to_string()),
            Format::Xml => quick_xml::de::from_str(&response.text()).map_err(|e| e.to_string()),
        };
        decoded.map_err(|reason| CloudError::Decode {
            url: url.to_string(),
            reason,
        })
    }
}

/// Sends operations through a transport with the session's credentials.
#[derive(Clone)]
pub struct Invoker {
    transport: Arc<dyn Transport>,
    session: Arc<dyn Session>,
}

impl Invoker {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<dyn Session>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    /// Performs the exchange; `Ok(None)` is a 404 the operation treats as absent.
    pub async fn send(
        &self,
        op: &Operation,
        url: &str,
        body: Option<Payload>,
    ) -> Result<Option<HttpResponse>> {
        let (header, token) = self.session.auth_header();
        let mut request = HttpRequest::new(op.method.clone(), url)
            .header("Accept", op.accept)
            .header(header, token);
        if let Some(payload) = body {
            request = request.payload(payload);
        }

        tracing::debug!("{}: {} {}", op.name, op.method, url);
        let response = self.transport.send(request).await?;

        if response.is_success() {
            return Ok(Some(response));
        }
        if response.is_not_found() && op.on_not_found == OnNotFound::Absent {
            tracing::debug!("{}: {} not found", op.name, url);
            return Ok(None);
        }
        Err(CloudError::UnexpectedResponse {
            method: op.method.to_string(),
            url: url.to_string(),
            status: response.status,
            body: response.text(),
        })
    }

    pub async fn fetch<T: DeserializeOwned>(
        &self,
        op: &Operation,
        url: &str,
        body: Option<Payload>,
    ) -> Result<Option<T>> {
        match self.send(op, url, body).await? {
            Some(response) => op.decode(url, &response).map(Some),
            None => Ok(None),
        }
    }

    /// Decodes a payload that must be present, whatever the 404 policy.
    pub async fn call<T: DeserializeOwned>(
        &self,
        op: &Operation,
        url: &str,
        body: Option<Payload>,
    ) -> Result<T> {
        let response =
            self.send(op, url, body)
                .await?
                .ok_or_else(|| CloudError::UnexpectedResponse {
                    method: op.method.to_string(),
                    url: url.to_string(),
                    status: 404,
                    body: String::new(),
                })?;
        op.decode(url, &response)
    }

    /// Like [`Invoker::fetch`] for operations whose success carries no
    /// payload worth decoding.
    pub async fn execute(&self, op: &Operation, url: &str, body: Option<Payload>) -> Result<()> {
        self.send(op, url, body).await.map(|_| ())
    }
}
