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

use crate::aws::{default_credential_provider, RequestSigner, V4aRequestSigner};
use awsign_core::auth_scheme::{AuthSchemeId, AuthSchemeRegistry, HttpAuthScheme};

/// Build the auth schemes most AWS services need.
///
/// - SigV4 and SigV4a share the process-wide default credential provider.
/// - SigV4a is skipped with a warning when this build lacks support for it.
/// - Bearer tokens come from `AWS_BEARER_TOKEN_<SERVICE>` when the `bearer`
///   feature is enabled.
pub fn default_registry(service: &str, region: &str) -> AuthSchemeRegistry {
    let provider = default_credential_provider();

    let registry = AuthSchemeRegistry::new()
        .register(HttpAuthScheme::new(
            AuthSchemeId::SIGV4,
            provider.clone(),
            RequestSigner::new(service, region),
        ))
        .register_fallible(
            AuthSchemeId::SIGV4A,
            V4aRequestSigner::new(service, ["*"])
                .map(|signer| HttpAuthScheme::new(AuthSchemeId::SIGV4A, provider, signer)),
        );

    #[cfg(feature = "bearer")]
    let registry = registry.register(HttpAuthScheme::new(
        AuthSchemeId::BEARER,
        awsign_bearer::EnvTokenProvider::new(service),
        awsign_bearer::RequestSigner::new(),
    ));

    registry
}

/// Create an orchestrator for `service` in `region` on the default context.
#[cfg(feature = "default-context")]
pub fn default_orchestrator(service: &str, region: &str) -> awsign_core::Orchestrator {
    awsign_core::Orchestrator::new(crate::default_context(), default_registry(service, region))
}
