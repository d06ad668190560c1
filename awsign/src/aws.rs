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

//! AWS signing with process-wide defaults.

pub use awsign_aws_v4::*;

use crate::SharedCredentialProvider;
use awsign_core::provide_credential::{CachedCredentialProvider, LazyCredentialProvider};
use log::debug;
use std::sync::{Mutex, PoisonError};

static DEFAULT_PROVIDER: Mutex<Option<SharedCredentialProvider<Credential>>> = Mutex::new(None);

/// The process-wide default credential provider.
///
/// Built on first call as a cached [`DefaultCredentialProvider`] which itself
/// initializes lazily, so creating the handle never touches the environment.
/// Every call until [`shutdown`] returns a handle to the same provider.
pub fn default_credential_provider() -> SharedCredentialProvider<Credential> {
    let mut slot = DEFAULT_PROVIDER
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    slot.get_or_insert_with(|| {
        debug!("initializing default aws credential provider");
        SharedCredentialProvider::new(LazyCredentialProvider::new(|| {
            Ok(CachedCredentialProvider::new(DefaultCredentialProvider::new()))
        }))
    })
    .clone()
}

/// Close the process-wide default credential provider.
///
/// Handles obtained before the call fail on their next lookup. The next call
/// to [`default_credential_provider`] builds a fresh provider. Calling this
/// when no provider was built is a no-op.
pub async fn shutdown() {
    let provider = DEFAULT_PROVIDER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(provider) = provider {
        debug!("shutting down default aws credential provider");
        provider.shutdown().await;
    }
}

/// Default AWS signer type.
pub type DefaultSigner = crate::Signer<Credential>;

/// Create a SigV4 signer for `service` in `region`.
///
/// The signer uses [`crate::default_context`] and the process-wide default
/// credential provider.
///
/// ```no_run
/// # async fn example() -> awsign::Result<()> {
/// let signer = awsign::aws::default_signer("s3", "us-east-1");
///
/// let mut parts = http::Request::get("https://s3.amazonaws.com/my-bucket/my-object")
///     .body(())?
///     .into_parts()
///     .0;
/// signer.sign(&mut parts).await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "default-context")]
pub fn default_signer(service: &str, region: &str) -> DefaultSigner {
    crate::Signer::new(
        crate::default_context(),
        default_credential_provider(),
        RequestSigner::new(service, region),
    )
}
