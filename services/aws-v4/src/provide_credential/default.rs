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

use crate::provide_credential::{
    AssumeRoleWithWebIdentityCredentialProvider, EcsCredentialProvider, EnvCredentialProvider,
    ImdsCredentialProvider, ProfileCredentialProvider,
};
use crate::Credential;
use async_trait::async_trait;
use awsign_core::provide_credential::ProvideCredentialChain;
use awsign_core::{Context, ProvideCredential, Result};

/// DefaultCredentialProvider will try to load credential from different sources.
///
/// Resolution order:
///
/// 1. Environment variables
/// 2. Shared config files (`~/.aws/credentials` and `~/.aws/config`)
/// 3. Web identity from `AWS_ROLE_ARN` and `AWS_WEB_IDENTITY_TOKEN_FILE`
/// 4. ECS container credentials
/// 5. EC2 instance metadata, unless `AWS_EC2_METADATA_DISABLED=true`
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new() -> Self {
        Self::with_profile_provider(ProfileCredentialProvider::new())
    }

    /// Use a customized profile provider as the second link.
    pub fn with_profile_provider(profile: ProfileCredentialProvider) -> Self {
        let chain = ProvideCredentialChain::new()
            .push(EnvCredentialProvider::new())
            .push(profile)
            .push(AssumeRoleWithWebIdentityCredentialProvider::new())
            .push(EcsCredentialProvider::new())
            .push(ImdsCredentialProvider::new());

        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain<Credential>) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }

    async fn close(&self) {
        self.chain.close().await
    }
}
