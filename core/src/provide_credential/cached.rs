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

use crate::{Context, ProvideCredential, Result, SigningCredential};
use async_trait::async_trait;
use log::debug;
use std::fmt::{self, Debug};
use tokio::sync::Mutex;

/// CachedCredentialProvider keeps the last credential until it stops being valid.
///
/// Concurrent callers queue on one async mutex, so an expired credential is
/// refreshed by exactly one of them and the rest observe the fresh value.
/// Dropping a caller mid-refresh leaves the previous cache content untouched.
pub struct CachedCredentialProvider<P: ProvideCredential> {
    inner: P,
    cache: Mutex<Option<P::Credential>>,
}

impl<P> CachedCredentialProvider<P>
where
    P: ProvideCredential,
    P::Credential: SigningCredential,
{
    /// Wrap a provider with a cache.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(None),
        }
    }

    /// Drop the cached credential so the next call resolves again.
    pub async fn invalidate(&self) {
        *self.cache.lock().await = None;
    }
}

impl<P: ProvideCredential> Debug for CachedCredentialProvider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedCredentialProvider")
            .field("inner", &self.inner)
            .finish()
    }
}

#[async_trait]
impl<P> ProvideCredential for CachedCredentialProvider<P>
where
    P: ProvideCredential,
    P::Credential: SigningCredential,
{
    type Credential = P::Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let mut cache = self.cache.lock().await;
        let now = ctx.now();
        if let Some(cred) = cache.as_ref().filter(|c| c.is_valid_at(now)) {
            return Ok(Some(cred.clone()));
        }

        debug!("cached credential missing or expired, resolving from {:?}", self.inner);
        let fresh = self.inner.provide_credential(ctx).await?;
        *cache = fresh.clone();
        Ok(fresh)
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
