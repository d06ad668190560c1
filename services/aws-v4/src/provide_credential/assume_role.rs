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

use crate::provide_credential::sts::{send_sts_request, sts_endpoint, sts_request};
use crate::{Credential, RequestSigner};
use async_trait::async_trait;
use awsign_core::hash::EMPTY_SHA256;
use awsign_core::{Context, Error, ProvideCredential, Result, SignRequest, SigningProperties};
use log::debug;

/// AssumeRoleCredentialProvider exchanges a source credential for the
/// credentials of another role through STS `AssumeRole`.
///
/// The source credential comes from any other provider, for example the
/// profile named by `source_profile` or the one picked by `credential_source`.
#[derive(Debug)]
pub struct AssumeRoleCredentialProvider {
    role_arn: String,
    role_session_name: Option<String>,
    external_id: Option<String>,
    duration_seconds: Option<u32>,
    tags: Vec<(String, String)>,
    region: Option<String>,

    source: Box<dyn ProvideCredential<Credential = Credential>>,
}

impl AssumeRoleCredentialProvider {
    /// Assume `role_arn` using credentials from `source`.
    pub fn new(
        role_arn: impl Into<String>,
        source: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        Self::from_boxed(role_arn.into(), Box::new(source))
    }

    pub(crate) fn from_boxed(
        role_arn: String,
        source: Box<dyn ProvideCredential<Credential = Credential>>,
    ) -> Self {
        Self {
            role_arn,
            role_session_name: None,
            external_id: None,
            duration_seconds: None,
            tags: Vec::new(),
            region: None,
            source,
        }
    }

    /// Set the role session name, `awsign-<millis>` by default.
    pub fn with_role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = Some(name.into());
        self
    }

    /// Set the external ID required by the role's trust policy.
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    /// Set how long the assumed credentials live.
    pub fn with_duration_seconds(mut self, seconds: u32) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    /// Attach session tags.
    pub fn with_tags(mut self, tags: Vec<(String, String)>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the region whose STS endpoint is called.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for AssumeRoleCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(source) = self.source.provide_credential(ctx).await? else {
            return Err(Error::credential_invalid(format!(
                "no source credential found to assume role {}",
                self.role_arn
            )));
        };

        let session_name = self
            .role_session_name
            .clone()
            .unwrap_or_else(|| format!("awsign-{}", ctx.now().timestamp_millis()));
        let duration = self.duration_seconds.map(|v| v.to_string());
        let tag_keys: Vec<_> = (1..=self.tags.len())
            .map(|i| (format!("Tags.member.{i}.Key"), format!("Tags.member.{i}.Value")))
            .collect();

        let mut params = vec![
            ("RoleArn", self.role_arn.as_str()),
            ("RoleSessionName", session_name.as_str()),
        ];
        if let Some(v) = &self.external_id {
            params.push(("ExternalId", v.as_str()));
        }
        if let Some(v) = &duration {
            params.push(("DurationSeconds", v.as_str()));
        }
        for ((key_param, value_param), (key, value)) in tag_keys.iter().zip(&self.tags) {
            params.push((key_param.as_str(), key.as_str()));
            params.push((value_param.as_str(), value.as_str()));
        }

        let endpoint = sts_endpoint(ctx, self.region.as_deref());
        debug!("assuming role {} via {}", self.role_arn, endpoint.host);
        let (mut parts, body) = sts_request(&endpoint, "AssumeRole", &params)?.into_parts();
        RequestSigner::new("sts", &endpoint.signing_region)
            .sign_request(
                ctx,
                &mut parts,
                Some(&source),
                &SigningProperties::new().with_payload_hash(EMPTY_SHA256),
            )
            .await?;

        let cred =
            send_sts_request(ctx, "AssumeRole", http::Request::from_parts(parts, body)).await?;
        Ok(Some(cred))
    }

    async fn close(&self) {
        self.source.close().await
    }
}
