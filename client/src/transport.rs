//! Access to the Auditor REST API
//!
//! [`EventApi`] is the seam between the buffering engine and the service;
//! [`HttpTransport`] is the production implementation over `reqwest`.

use async_trait::async_trait;
use auditor_shared::types::detail::DetailsBatch;
use auditor_shared::{
    DetailRecord, Envelope, EventId, EventPage, EventRecord, EventUpdate, NewEvent,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Operations the client needs from the Auditor service.
#[async_trait]
pub trait EventApi: Send + Sync {
    /// `POST /event/`
    async fn create_event(&self, event: &NewEvent) -> Result<EventRecord>;

    /// `PUT /event/{id}/`
    async fn update_event(&self, id: &EventId, update: &EventUpdate) -> Result<EventRecord>;

    /// `POST /event/{id}/details/`
    async fn append_details(&self, id: &EventId, details: &[DetailRecord]) -> Result<()>;

    /// `GET /event/?offset=&limit=`
    async fn list_events(&self, offset: u64, limit: u32) -> Result<EventPage>;
}

/// JSON-over-HTTP implementation of [`EventApi`]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Self::with_timeout(config.base_url(), config.request_timeout)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one request and unwrap the response envelope.
    async fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("{} {} -> {}", method, path, status);

        match serde_json::from_str::<Envelope>(&text) {
            Ok(envelope) => match envelope.into_result() {
                Ok(data) => Ok(data),
                Err(e) if status == StatusCode::CONFLICT => Err(Error::DetailConflict(e.msg)),
                Err(e) => Err(e.into()),
            },
            Err(_) if status == StatusCode::CONFLICT => Err(Error::DetailConflict(text)),
            Err(_) if !status.is_success() => {
                Err(Error::Remote(format!("HTTP {}: {}", status, text.trim())))
            }
            Err(e) => Err(Error::InvalidResponse(format!(
                "{} {}: {}",
                method, path, e
            ))),
        }
    }

    async fn call_as<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let data = self.call(method, path, body).await?;
        Ok(serde_json::from_value(data)?)
    }
}

#[async_trait]
impl EventApi for HttpTransport {
    async fn create_event(&self, event: &NewEvent) -> Result<EventRecord> {
        self.call_as(Method::POST, "/event/", Some(event)).await
    }

    async fn update_event(&self, id: &EventId, update: &EventUpdate) -> Result<EventRecord> {
        self.call_as(Method::PUT, &format!("/event/{}/", id), Some(update))
            .await
    }

    async fn append_details(&self, id: &EventId, details: &[DetailRecord]) -> Result<()> {
        let batch = DetailsBatch {
            details: details.to_vec(),
        };
        self.call(Method::POST, &format!("/event/{}/details/", id), Some(&batch))
            .await?;
        Ok(())
    }

    async fn list_events(&self, offset: u64, limit: u32) -> Result<EventPage> {
        let path = format!("/event/?offset={}&limit={}", offset, limit);
        self.call_as::<EventPage, ()>(Method::GET, &path, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let transport =
            HttpTransport::with_timeout("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_new_uses_config_url() {
        let config = ClientConfig::new("audit.internal", 9100);
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "http://audit.internal:9100");
    }
}
