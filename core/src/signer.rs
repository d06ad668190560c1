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

use crate::provide_credential::CachedCredentialProvider;
use crate::{
    Context, ProvideCredential, Result, SignRequest, SigningCredential, SigningProperties,
};
use std::sync::Arc;

/// Signer signs standalone requests outside of the orchestrator.
///
/// Credentials are cached until they stop being valid.
#[derive(Clone, Debug)]
pub struct Signer<K: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = K>>,
    signer: Arc<dyn SignRequest<Credential = K>>,
    properties: SigningProperties,
}

impl<K: SigningCredential> Signer<K> {
    /// Create a new signer.
    pub fn new(
        ctx: Context,
        provider: impl ProvideCredential<Credential = K>,
        signer: impl SignRequest<Credential = K>,
    ) -> Self {
        Self {
            ctx,

            provider: Arc::new(CachedCredentialProvider::new(provider)),
            signer: Arc::new(signer),
            properties: SigningProperties::default(),
        }
    }

    /// Default signing properties used by [`Signer::sign`].
    pub fn with_properties(mut self, properties: SigningProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Sign a request with the default properties.
    pub async fn sign(&self, req: &mut http::request::Parts) -> Result<()> {
        self.sign_with(req, &self.properties).await
    }

    /// Sign a request with explicit properties.
    pub async fn sign_with(
        &self,
        req: &mut http::request::Parts,
        properties: &SigningProperties,
    ) -> Result<()> {
        let credential = self.provider.provide_credential(&self.ctx).await?;
        self.signer
            .sign_request(&self.ctx, req, credential.as_ref(), properties)
            .await
    }

    /// Release the credential provider's resources.
    pub async fn close(&self) {
        self.provider.close().await;
    }
}
