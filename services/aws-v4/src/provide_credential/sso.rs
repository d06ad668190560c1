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

use crate::constants::AWS_QUERY_ENCODE_SET;
use crate::Credential;
use async_trait::async_trait;
use awsign_core::hash::hex_sha1;
use awsign_core::time::parse_rfc3339;
use awsign_core::{Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use chrono::DateTime;
use http::StatusCode;
use log::debug;
use percent_encoding::utf8_percent_encode;
use serde::Deserialize;

const SSO_BEARER_TOKEN: &str = "x-amz-sso_bearer_token";

/// SsoCredentialProvider fetches role credentials from IAM Identity Center.
///
/// It reads the access token cached by `aws sso login` under
/// `~/.aws/sso/cache/` and exchanges it for credentials of the configured
/// account and role. The cache file is named after the SHA1 of the
/// sso-session name, or of the start URL for legacy profiles.
///
/// ```ini
/// [profile my-sso-profile]
/// sso_session = corp
/// sso_account_id = 123456789012
/// sso_role_name = MyRole
///
/// [sso-session corp]
/// sso_start_url = https://my-sso-portal.awsapps.com/start
/// sso_region = us-east-1
/// ```
#[derive(Debug, Clone)]
pub struct SsoCredentialProvider {
    account_id: String,
    role_name: String,
    region: String,
    start_url: String,
    session_name: Option<String>,
}

impl SsoCredentialProvider {
    /// Create a provider for the given account and role.
    pub fn new(
        account_id: impl Into<String>,
        role_name: impl Into<String>,
        region: impl Into<String>,
        start_url: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            role_name: role_name.into(),
            region: region.into(),
            start_url: start_url.into(),
            session_name: None,
        }
    }

    /// Use the token cached for the named sso-session.
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    async fn load_token(&self, ctx: &Context) -> Result<String> {
        let key = self.session_name.as_deref().unwrap_or(&self.start_url);
        let path = format!("~/.aws/sso/cache/{}.json", hex_sha1(key.as_bytes()));
        let path = ctx.expand_home_dir(&path).ok_or_else(|| {
            Error::config_invalid("home directory is required to locate the SSO token cache")
        })?;
        debug!("loading SSO token from {path}");

        let content = ctx.file_read(&path).await.map_err(|e| {
            Error::credential_invalid(format!(
                "no cached SSO token at {path}, run `aws sso login` first"
            ))
            .with_source(e)
        })?;
        let token: CachedToken = serde_json::from_slice(&content).map_err(|e| {
            Error::credential_invalid(format!("failed to parse SSO token cache {path}"))
                .with_source(e)
        })?;

        if parse_rfc3339(&token.expires_at)? <= ctx.now() {
            return Err(Error::credential_expired(format!(
                "cached SSO token at {path} has expired, run `aws sso login` again"
            )));
        }
        Ok(token.access_token)
    }
}

#[async_trait]
impl ProvideCredential for SsoCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let token = self.load_token(ctx).await?;

        let url = format!(
            "https://portal.sso.{}.amazonaws.com/federation/credentials?account_id={}&role_name={}",
            self.region,
            utf8_percent_encode(&self.account_id, &AWS_QUERY_ENCODE_SET),
            utf8_percent_encode(&self.role_name, &AWS_QUERY_ENCODE_SET),
        );
        let req = http::Request::get(url)
            .header(SSO_BEARER_TOKEN, token)
            .body(Bytes::new())
            .map_err(|e| Error::request_invalid("failed to build SSO request").with_source(e))?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::transport("failed to fetch SSO role credentials")
                .with_source(e)
                .set_retryable(true)
        })?;
        let status = resp.status();
        if status != StatusCode::OK {
            let message = format!(
                "SSO GetRoleCredentials failed with status {status}: {}",
                String::from_utf8_lossy(resp.body())
            );
            let err = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Error::credential_denied(message)
                }
                s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
                    Error::service(message).set_retryable(true)
                }
                _ => Error::credential_invalid(message),
            };
            return Err(err.with_status(status));
        }

        let resp: RoleCredentialsResponse = serde_json::from_slice(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse SSO role credentials").with_source(e)
        })?;
        let creds = resp.role_credentials;
        let expires_at = DateTime::from_timestamp_millis(creds.expiration).ok_or_else(|| {
            Error::unexpected(format!("invalid SSO expiration {}", creds.expiration))
        })?;

        Ok(Some(
            Credential::new(creds.access_key_id, creds.secret_access_key)
                .with_session_token(creds.session_token)
                .with_expires_at(expires_at),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedToken {
    access_token: String,
    expires_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleCredentialsResponse {
    role_credentials: RoleCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: i64,
}
