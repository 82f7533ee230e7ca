//! Delivery of fact records to the ingestion endpoint.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Certificate, Client, ClientBuilder, StatusCode};
use thiserror::Error;
use tracing::{debug, error, instrument};
use url::Url;

use crate::fetcher::errors::{error_chain, is_tls_error};
use crate::record::FactRecord;

pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("factfeed/", env!("CARGO_PKG_VERSION"));

/// How the endpoint's certificate is verified.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TlsConfig {
    #[default]
    SystemTrust,
    /// Trust only the CA certificate (PEM) at this path.
    CustomCa(PathBuf),
}

/// The endpoint answered. Any status counts as a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub status: StatusCode,
    pub body: String,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// The request never produced a response.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("tls error: {0}")]
    Tls(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timeout")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),
}

impl DeliveryError {
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if is_tls_error(&err) {
            Self::Tls(error_chain(&err))
        } else if err.is_connect() {
            Self::Connect(error_chain(&err))
        } else {
            Self::Request(error_chain(&err))
        }
    }
}

/// Destination for built records.
#[async_trait]
pub trait FactSink: Send + Sync {
    async fn send(&self, record: &FactRecord) -> Result<DeliveryOutcome, DeliveryError>;
}

#[derive(Debug, Clone)]
enum Transport {
    Ready(Client),
    /// The TLS setup failed; every send reports this cause.
    Unusable(String),
}

/// POSTs records as JSON to a single endpoint.
#[derive(Debug, Clone)]
pub struct Deliverer {
    endpoint: Url,
    transport: Transport,
}

impl Deliverer {
    /// Never fails: a CA certificate that cannot be loaded turns every
    /// later `send` into a [`DeliveryError::Tls`].
    pub fn new(endpoint: Url, tls: TlsConfig) -> Self {
        let transport = match build_client(&tls) {
            Ok(client) => Transport::Ready(client),
            Err(reason) => {
                error!(%reason, "Delivery client unusable");
                Transport::Unusable(reason)
            }
        };

        Self {
            endpoint,
            transport,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl FactSink for Deliverer {
    #[instrument(skip_all, fields(record_id = %record.id, endpoint = %self.endpoint))]
    async fn send(&self, record: &FactRecord) -> Result<DeliveryOutcome, DeliveryError> {
        let client = match &self.transport {
            Transport::Ready(client) => client,
            Transport::Unusable(reason) => return Err(DeliveryError::Tls(reason.clone())),
        };

        let response = client
            .post(self.endpoint.clone())
            .json(&record.to_payload())
            .send()
            .await
            .map_err(DeliveryError::from_reqwest_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(DeliveryError::from_reqwest_error)?;

        debug!(status = %status, bytes = body.len(), "Endpoint responded");

        Ok(DeliveryOutcome { status, body })
    }
}

fn build_client(tls: &TlsConfig) -> Result<Client, String> {
    let mut builder = ClientBuilder::new()
        .connect_timeout(DELIVERY_TIMEOUT)
        .timeout(DELIVERY_TIMEOUT)
        .user_agent(USER_AGENT);

    if let TlsConfig::CustomCa(path) = tls {
        let pem = fs::read(path)
            .map_err(|e| format!("cannot read CA certificate {}: {e}", path.display()))?;
        let cert = Certificate::from_pem(&pem)
            .map_err(|e| format!("invalid CA certificate {}: {e}", path.display()))?;
        builder = builder
            .tls_built_in_root_certs(false)
            .add_root_certificate(cert);
    }

    builder
        .build()
        .map_err(|e| format!("cannot build delivery client: {e}"))
}
