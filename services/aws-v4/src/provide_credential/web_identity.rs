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

use crate::constants::{AWS_ROLE_ARN, AWS_ROLE_SESSION_NAME, AWS_WEB_IDENTITY_TOKEN_FILE};
use crate::provide_credential::sts::{send_sts_request, sts_endpoint, sts_request};
use crate::Credential;
use async_trait::async_trait;
use awsign_core::{Context, Error, ProvideCredential, Result};
use log::debug;

/// AssumeRoleWithWebIdentityCredentialProvider trades an OIDC token file for
/// role credentials, as used by EKS service accounts.
///
/// Anything not configured is read from `AWS_ROLE_ARN`,
/// `AWS_WEB_IDENTITY_TOKEN_FILE` and `AWS_ROLE_SESSION_NAME`. Without a role
/// and a token file this provider has nothing to offer.
#[derive(Debug, Default, Clone)]
pub struct AssumeRoleWithWebIdentityCredentialProvider {
    role_arn: Option<String>,
    role_session_name: Option<String>,
    web_identity_token_file: Option<String>,
    region: Option<String>,
}

impl AssumeRoleWithWebIdentityCredentialProvider {
    /// Create a provider configured by the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role ARN.
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Set the web identity token file path.
    pub fn with_web_identity_token_file(mut self, path: impl Into<String>) -> Self {
        self.web_identity_token_file = Some(path.into());
        self
    }

    /// Set the role session name.
    pub fn with_role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = Some(name.into());
        self
    }

    /// Set the region whose STS endpoint is called.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for AssumeRoleWithWebIdentityCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let role_arn = self.role_arn.clone().or_else(|| ctx.env_var(AWS_ROLE_ARN));
        let token_file = self
            .web_identity_token_file
            .clone()
            .or_else(|| ctx.env_var(AWS_WEB_IDENTITY_TOKEN_FILE));
        let (Some(role_arn), Some(token_file)) = (role_arn, token_file) else {
            return Ok(None);
        };

        let path = ctx.expand_home_dir(&token_file).ok_or_else(|| {
            Error::config_invalid(format!("failed to expand homedir for {token_file}"))
        })?;
        let token = ctx.file_read_as_string(&path).await.map_err(|e| {
            Error::config_invalid(format!("failed to read web identity token file {path}"))
                .with_source(e)
        })?;

        let session_name = self
            .role_session_name
            .clone()
            .or_else(|| ctx.env_var(AWS_ROLE_SESSION_NAME))
            .unwrap_or_else(|| format!("awsign-{}", ctx.now().timestamp_millis()));

        let endpoint = sts_endpoint(ctx, self.region.as_deref());
        debug!("assuming role {role_arn} with web identity via {}", endpoint.host);
        let req = sts_request(
            &endpoint,
            "AssumeRoleWithWebIdentity",
            &[
                ("RoleArn", role_arn.as_str()),
                ("RoleSessionName", session_name.as_str()),
                ("WebIdentityToken", token.trim()),
            ],
        )?;

        send_sts_request(ctx, "AssumeRoleWithWebIdentity", req)
            .await
            .map(Some)
    }
}
