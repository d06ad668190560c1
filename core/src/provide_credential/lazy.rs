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

use crate::{Context, Error, ProvideCredential, Result};
use async_trait::async_trait;
use log::debug;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::OnceCell;

type Factory<P> = Box<dyn Fn() -> Result<P> + Send + Sync>;

/// LazyCredentialProvider builds its inner provider on first use.
///
/// The factory runs at most once successfully; a failed build is reported to
/// the caller and attempted again on the next call. [`ProvideCredential::close`]
/// never runs the factory and closes a built provider exactly once, including
/// one whose build was still running when `close` was called.
pub struct LazyCredentialProvider<P> {
    factory: Factory<P>,
    inner: OnceCell<P>,
    closed: AtomicBool,
    inner_closed: AtomicBool,
}

impl<P: ProvideCredential> LazyCredentialProvider<P> {
    /// Create a lazy provider from a fallible factory.
    pub fn new(factory: impl Fn() -> Result<P> + Send + Sync + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            inner: OnceCell::new(),
            closed: AtomicBool::new(false),
            inner_closed: AtomicBool::new(false),
        }
    }

    /// Whether the inner provider has been built.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized()
    }

    async fn close_inner(&self, inner: &P) {
        if !self.inner_closed.swap(true, Ordering::SeqCst) {
            inner.close().await;
        }
    }
}

fn closed_error() -> Error {
    Error::unexpected("credential provider has been closed")
}

impl<P: Debug> Debug for LazyCredentialProvider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCredentialProvider")
            .field("inner", &self.inner.get())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl<P: ProvideCredential> ProvideCredential for LazyCredentialProvider<P> {
    type Credential = P::Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(closed_error());
        }

        let inner = self
            .inner
            .get_or_try_init(|| async {
                debug!("building lazily initialized credential provider");
                (self.factory)()
            })
            .await?;

        // close() may have run while the factory was building.
        if self.closed.load(Ordering::SeqCst) {
            debug!("provider was closed during initialization, closing the new instance");
            self.close_inner(inner).await;
            return Err(closed_error());
        }
        inner.provide_credential(ctx).await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.inner.get() {
            self.close_inner(inner).await;
        }
    }
}
