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
    AWS_CONTAINER_AUTHORIZATION_TOKEN, AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE,
    AWS_CONTAINER_CREDENTIALS_FULL_URI, AWS_CONTAINER_CREDENTIALS_RELATIVE_URI,
};
use crate::Credential;
use async_trait::async_trait;
use awsign_core::time::parse_rfc3339;
use awsign_core::{Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{StatusCode, Uri};
use log::debug;
use serde::Deserialize;
use std::net::IpAddr;

const ECS_ENDPOINT: &str = "http://169.254.170.2";

/// Link local addresses the container agents listen on.
const CONTAINER_HOSTS: &[&str] = &["169.254.170.2", "169.254.170.23", "fd00:ec2::23"];

/// EcsCredentialProvider loads credentials from the container credentials
/// endpoint of ECS tasks and EKS pod identities.
///
/// `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` is resolved against the ECS agent.
/// `AWS_CONTAINER_CREDENTIALS_FULL_URI` must use HTTPS or point at a loopback
/// or container agent address. An authorization token is read from
/// `AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE` first, then
/// `AWS_CONTAINER_AUTHORIZATION_TOKEN`.
///
/// References:
/// - [IAM roles for tasks](https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-iam-roles.html)
#[derive(Debug, Default, Clone)]
pub struct EcsCredentialProvider;

impl EcsCredentialProvider {
    /// Create a new `EcsCredentialProvider` instance.
    pub fn new() -> Self {
        Self
    }

    fn endpoint(&self, ctx: &Context) -> Result<Option<Uri>> {
        if let Some(relative) = ctx
            .env_var(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI)
            .filter(|v| !v.is_empty())
        {
            return parse_uri(&format!("{ECS_ENDPOINT}{relative}")).map(Some);
        }

        let Some(full) = ctx
            .env_var(AWS_CONTAINER_CREDENTIALS_FULL_URI)
            .filter(|v| !v.is_empty())
        else {
            return Ok(None);
        };

        let uri = parse_uri(&full)?;
        if uri.scheme_str() == Some("https") || uri.host().is_some_and(is_allowed_http_host) {
            Ok(Some(uri))
        } else {
            Err(Error::config_invalid(format!(
                "container credentials endpoint {full} must use HTTPS or a loopback address"
            )))
        }
    }

    async fn authorization(&self, ctx: &Context) -> Result<Option<String>> {
        if let Some(path) = ctx
            .env_var(AWS_CONTAINER_AUTHORIZATION_TOKEN_FILE)
            .filter(|v| !v.is_empty())
        {
            let token = ctx.file_read_as_string(&path).await.map_err(|e| {
                Error::config_invalid(format!("failed to read authorization token from {path}"))
                    .with_source(e)
            })?;
            return Ok(Some(token.trim().to_string()));
        }

        Ok(ctx
            .env_var(AWS_CONTAINER_AUTHORIZATION_TOKEN)
            .filter(|v| !v.is_empty()))
    }
}

fn parse_uri(uri: &str) -> Result<Uri> {
    uri.parse().map_err(|e| {
        Error::config_invalid(format!("invalid container credentials endpoint {uri}"))
            .with_source(anyhow::Error::new(e))
    })
}

fn is_allowed_http_host(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host == "localhost" || CONTAINER_HOSTS.contains(&host) {
        return true;
    }
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

#[async_trait]
impl ProvideCredential for EcsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(uri) = self.endpoint(ctx)? else {
            return Ok(None);
        };
        debug!("loading container credentials from {uri}");

        let mut req = http::Request::get(uri.clone());
        if let Some(token) = self.authorization(ctx).await? {
            req = req.header(AUTHORIZATION, token);
        }
        let req = req.body(Bytes::new()).map_err(|e| {
            Error::request_invalid("failed to build container credentials request").with_source(e)
        })?;

        let resp = ctx.http_send(req).await.map_err(|e| {
            Error::transport(format!("failed to reach container credentials endpoint {uri}"))
                .with_source(e)
                .set_retryable(true)
        })?;
        let status = resp.status();
        if status != StatusCode::OK {
            let message = format!(
                "container credentials endpoint returned {status}: {}",
                String::from_utf8_lossy(resp.body())
            );
            let err = if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                Error::service(message).set_retryable(true)
            } else {
                Error::credential_invalid(message)
            };
            return Err(err.with_status(status));
        }

        let cred: ContainerCredentials = serde_json::from_slice(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse container credentials").with_source(e)
        })?;
        Ok(Some(
            Credential::new(cred.access_key_id, cred.secret_access_key)
                .with_session_token(cred.token)
                .with_expires_at(parse_rfc3339(&cred.expiration)?),
        ))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,
}
