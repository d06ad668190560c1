//! Reqwest based transport for awsign.
//!
//! `ReqwestHttpSend` implements [`HttpSend`] so a [`awsign_core::Context`] can
//! put signed requests on the wire.
//!
//! Failures to reach the server are reported as retryable
//! [`awsign_core::ErrorKind::Transport`] errors; requests reqwest refuses to
//! build are [`awsign_core::ErrorKind::RequestInvalid`].
//!
//! ## Example
//!
//! ```no_run
//! use awsign_core::Context;
//! use awsign_http_send_reqwest::ReqwestHttpSend;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), reqwest::Error> {
//! let client = reqwest::Client::builder()
//!     .timeout(Duration::from_secs(30))
//!     .build()?;
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::new(client));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use awsign_core::{Error, HttpSend, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use log::debug;
use reqwest::{Client, Request};

/// HttpSend implementation backed by a [`reqwest::Client`].
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> Error {
    if e.is_builder() {
        Error::request_invalid("failed to build http request").with_source(e)
    } else {
        Error::transport("failed to send http request").with_source(e)
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req).map_err(map_reqwest_error)?;
        debug!("sending {} {}", req.method(), req.url());
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(map_reqwest_error)?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(map_reqwest_error)?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
