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

use crate::time::DateTime;
use crate::{Context, Result, SigningProperties};
use std::fmt::Debug;

/// SigningCredential is the trait used by signer as the signing credential.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the signing credential is valid.
    fn is_valid(&self) -> bool;

    /// Check if the signing credential is valid at `now`.
    ///
    /// Callers holding a [`Context`] pass [`Context::now`] so a custom clock
    /// decides expiry. Credentials without an expiry may keep the default.
    fn is_valid_at(&self, now: DateTime) -> bool {
        let _ = now;
        self.is_valid()
    }

    /// Instant after which the credential must not be used, if it expires at all.
    fn expires_at(&self) -> Option<DateTime> {
        None
    }
}

impl<T: SigningCredential> SigningCredential for Option<T> {
    fn is_valid(&self) -> bool {
        let Some(ctx) = self else {
            return false;
        };

        ctx.is_valid()
    }

    fn is_valid_at(&self, now: DateTime) -> bool {
        self.as_ref().is_some_and(|v| v.is_valid_at(now))
    }

    fn expires_at(&self) -> Option<DateTime> {
        self.as_ref().and_then(|v| v.expires_at())
    }
}

/// ProvideCredential is the trait used by signer to load the credential from the environment.
///
/// Returning `Ok(None)` means this source has nothing to offer and the caller may
/// try the next one; `Err` is a real failure.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this loader.
    ///
    /// Typically, it will be a credential.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load signing credential from current env.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;

    /// Release resources held by this provider.
    ///
    /// Must be safe to call more than once and must not fail.
    async fn close(&self) {}
}

/// SignRequest is the trait used by signer to sign the request.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this builder.
    ///
    /// Typically, it will be a credential.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request in place.
    ///
    /// ## Credential
    ///
    /// The `credential` parameter is the credential required by the signer to sign the request.
    /// Signers decide what a missing credential means for them.
    ///
    /// ## Properties
    ///
    /// `properties` carries per operation signing settings such as region, service
    /// name, payload hash and presign expiry. Signers read the current time from
    /// [`Context::now`].
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        credential: Option<&Self::Credential>,
        properties: &SigningProperties,
    ) -> Result<()>;
}
