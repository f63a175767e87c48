//! The HTTP capability consumed by the connectivity gate and the fetcher.
use async_trait::async_trait;
use reqwest::{Client, header};
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

use super::encoding::charset_from_content_type;

/// A response that reached the client, whatever its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub charset: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        let details = error_chain(&e);
        if e.is_timeout() {
            TransportError::Timeout(details)
        } else if e.is_connect() {
            TransportError::Connect(details)
        } else {
            TransportError::Request(details)
        }
    }
}

/// reqwest's top-level message rarely says what went wrong; the sources do.
fn error_chain(e: &dyn StdError) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Issues a single GET and hands back status, body and declared charset.
/// Any failure before a status line arrives is a `TransportError`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, verify_tls: bool) -> Result<RawResponse, TransportError>;
}

/// `HttpTransport` backed by two reqwest clients, one of which skips
/// certificate verification for targets that opt out of it.
pub struct ReqwestTransport {
    verified: Client,
    unverified: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        Ok(Self {
            verified: build_client(timeout, false)?,
            unverified: build_client(timeout, true)?,
        })
    }
}

fn build_client(timeout: Option<Duration>, accept_invalid_certs: bool) -> Result<Client, TransportError> {
    let mut builder = Client::builder()
        .user_agent(format!("sitewatch/{}", crate::version::VERSION))
        .danger_accept_invalid_certs(accept_invalid_certs);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, verify_tls: bool) -> Result<RawResponse, TransportError> {
        let client = if verify_tls { &self.verified } else { &self.unverified };
        let response = client.get(url).send().await?;

        let status = response.status().as_u16();
        let charset = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_from_content_type);
        let body = response.bytes().await?.to_vec();

        Ok(RawResponse {
            status,
            body,
            charset,
        })
    }
}
