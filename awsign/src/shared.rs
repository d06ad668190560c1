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

use async_trait::async_trait;
use awsign_core::{Context, ProvideCredential, Result};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// SharedCredentialProvider is a cheaply cloneable handle to one provider.
///
/// Every clone resolves through the same inner provider, so caches and
/// background resources are shared between signers and orchestrators.
/// Closing a handle through [`ProvideCredential::close`] does nothing: the
/// owner of the provider releases it with [`SharedCredentialProvider::shutdown`].
pub struct SharedCredentialProvider<C> {
    inner: Arc<dyn ProvideCredential<Credential = C>>,
}

impl<C: Send + Sync + Unpin + 'static> SharedCredentialProvider<C> {
    /// Share the given provider.
    pub fn new(provider: impl ProvideCredential<Credential = C>) -> Self {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Close the inner provider for every handle.
    pub async fn shutdown(&self) {
        self.inner.close().await;
    }

    /// Whether both handles point at the same provider.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<C> Clone for SharedCredentialProvider<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C> Debug for SharedCredentialProvider<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCredentialProvider")
            .field("inner", &self.inner)
            .finish()
    }
}

#[async_trait]
impl<C: Send + Sync + Unpin + 'static> ProvideCredential for SharedCredentialProvider<C> {
    type Credential = C;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<C>> {
        self.inner.provide_credential(ctx).await
    }
}
