// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::constants::{
    AWS_EC2_METADATA_DISABLED, AWS_EC2_METADATA_SERVICE_ENDPOINT, AWS_EC2_METADATA_V1_DISABLED,
};
use crate::Credential;
use async_trait::async_trait;
use awsign_core::time::{parse_rfc3339, DateTime};
use awsign_core::{Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use chrono::TimeDelta;
use http::header::CONTENT_LENGTH;
use http::{Method, StatusCode};
use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::Mutex;

const IMDS_ENDPOINT: &str = "http://169.254.169.254";
const TOKEN_TTL_HEADER: &str = "x-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "x-aws-ec2-metadata-token";
const TOKEN_TTL_SECS: i64 = 21600;
const SECURITY_CREDENTIALS_PATH: &str = "/latest/meta-data/iam/security-credentials/";

/// ImdsCredentialProvider loads the instance profile credentials of an EC2
/// instance from the instance metadata service.
///
/// A session token is fetched first (IMDSv2) and reused until shortly before
/// it expires. When the token endpoint answers 403, 404 or 405, or cannot be
/// reached, the provider falls back to IMDSv1 unless
/// `AWS_EC2_METADATA_V1_DISABLED` is `true`. `AWS_EC2_METADATA_DISABLED=true`
/// turns the provider off.
#[derive(Debug, Default)]
pub struct ImdsCredentialProvider {
    endpoint: Option<String>,
    token: Mutex<Option<(String, DateTime)>>,
}

impl ImdsCredentialProvider {
    /// Create a new `ImdsCredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metadata service endpoint, `http://169.254.169.254` by default.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn endpoint(&self, ctx: &Context) -> String {
        self.endpoint
            .clone()
            .or_else(|| ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| IMDS_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Session token, or `None` when falling back to IMDSv1.
    async fn load_token(&self, ctx: &Context, endpoint: &str) -> Result<Option<String>> {
        let mut cached = self.token.lock().await;
        if let Some((token, expires_at)) = cached.as_ref() {
            if *expires_at > ctx.now() {
                return Ok(Some(token.clone()));
            }
        }

        let req = http::Request::builder()
            .method(Method::PUT)
            .uri(format!("{endpoint}/latest/api/token"))
            .header(CONTENT_LENGTH, "0")
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECS.to_string())
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build IMDS token request").with_source(e)
            })?;

        let v1_disabled = ctx
            .env_var(AWS_EC2_METADATA_V1_DISABLED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let fallback = |reason: String| {
            if v1_disabled {
                Err(Error::credential_invalid(format!(
                    "failed to fetch IMDS token ({reason}) and fallback to IMDS v1 is disabled"
                )))
            } else {
                warn!("failed to fetch IMDS token ({reason}), falling back to IMDS v1");
                Ok(None)
            }
        };

        let resp = match ctx.http_send(req).await {
            Ok(resp) => resp,
            Err(err) => return fallback(err.to_string()),
        };
        match resp.status() {
            StatusCode::OK => {}
            s @ (StatusCode::FORBIDDEN
            | StatusCode::NOT_FOUND
            | StatusCode::METHOD_NOT_ALLOWED) => return fallback(format!("status {s}")),
            s => {
                return Err(imds_error("fetch token", s, resp.body()));
            }
        }

        let token = String::from_utf8_lossy(resp.body()).to_string();
        // Refresh ten minutes before the token expires.
        let expires_at = ctx.now() + TimeDelta::seconds(TOKEN_TTL_SECS - 600);
        *cached = Some((token.clone(), expires_at));
        Ok(Some(token))
    }

    async fn get(&self, ctx: &Context, url: String, token: Option<&str>) -> Result<Bytes> {
        let mut req = http::Request::get(&url);
        if let Some(token) = token {
            req = req.header(TOKEN_HEADER, token);
        }
        let req = req
            .body(Bytes::new())
            .map_err(|e| Error::request_invalid("failed to build IMDS request").with_source(e))?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::transport(format!("failed to reach IMDS at {url}"))
                .with_source(e)
                .set_retryable(true)
        })?;
        if resp.status() != StatusCode::OK {
            return Err(imds_error(&url, resp.status(), resp.body()));
        }
        Ok(resp.into_body())
    }
}

fn imds_error(what: &str, status: StatusCode, body: &[u8]) -> Error {
    let message = format!(
        "IMDS {what} returned {status}: {}",
        String::from_utf8_lossy(body)
    );
    let err = if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        Error::service(message).set_retryable(true)
    } else {
        Error::credential_invalid(message)
    };
    err.with_status(status)
}

#[async_trait]
impl ProvideCredential for ImdsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if ctx
            .env_var(AWS_EC2_METADATA_DISABLED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            debug!("IMDS is disabled by {AWS_EC2_METADATA_DISABLED}");
            return Ok(None);
        }

        let endpoint = self.endpoint(ctx);
        let token = self.load_token(ctx, &endpoint).await?;

        let base = format!("{endpoint}{SECURITY_CREDENTIALS_PATH}");
        let profiles = self.get(ctx, base.clone(), token.as_deref()).await?;
        let profiles = String::from_utf8_lossy(&profiles);
        let Some(profile) = profiles.lines().map(str::trim).find(|v| !v.is_empty()) else {
            return Err(Error::credential_invalid(
                "no IAM role is attached to this EC2 instance",
            ));
        };
        debug!("loading IMDS credentials of instance profile {profile}");

        let content = self
            .get(ctx, format!("{base}{profile}"), token.as_deref())
            .await?;
        let resp: InstanceCredentials = serde_json::from_slice(&content).map_err(|e| {
            Error::unexpected("failed to parse IMDS credentials").with_source(e)
        })?;

        match resp.code.as_str() {
            "Success" => {}
            "AssumeRoleUnauthorizedAccess" => {
                return Err(Error::credential_denied(format!(
                    "EC2 instance is not authorized to assume role {profile}: {}",
                    resp.message
                )))
            }
            code => {
                return Err(Error::credential_invalid(format!(
                    "IMDS returned [{code}] {}",
                    resp.message
                )))
            }
        }

        Ok(Some(
            Credential::new(resp.access_key_id, resp.secret_access_key)
                .with_session_token(resp.token)
                .with_expires_at(parse_rfc3339(&resp.expiration)?),
        ))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InstanceCredentials {
    code: String,
    message: String,
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,
}
