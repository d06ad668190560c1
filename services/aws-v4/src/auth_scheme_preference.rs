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

use crate::constants::AWS_AUTH_SCHEME_PREFERENCE;
use crate::profile::{ProfileFileKind, ProfileFiles};
use awsign_core::auth_scheme::AuthSchemePreference;
use awsign_core::{Context, Result};
use log::debug;

const PROFILE_KEY: &str = "auth_scheme_preference";

/// AuthSchemePreferenceResolver finds the auth scheme preference of a client.
///
/// Sources, first non empty one wins:
///
/// 1. The value set with [`AuthSchemePreferenceResolver::with_preference`]
/// 2. The `AWS_AUTH_SCHEME_PREFERENCE` environment variable
/// 3. `auth_scheme_preference` in the active profile of the config file
#[derive(Debug, Clone, Default)]
pub struct AuthSchemePreferenceResolver {
    explicit: Option<AuthSchemePreference>,
    files: ProfileFiles,
}

impl AuthSchemePreferenceResolver {
    /// Create a resolver reading the environment and the default profile files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the preference configured on the client.
    pub fn with_preference(mut self, preference: AuthSchemePreference) -> Self {
        self.explicit = Some(preference);
        self
    }

    /// Read the profile from the given files.
    pub fn with_profile_files(mut self, files: ProfileFiles) -> Self {
        self.files = files;
        self
    }

    /// Resolve the preference, empty if no source sets one.
    pub async fn resolve(&self, ctx: &Context) -> Result<AuthSchemePreference> {
        if let Some(preference) = self.explicit.as_ref().filter(|v| !v.is_empty()) {
            debug!("using configured auth scheme preference: {preference:?}");
            return Ok(preference.clone());
        }

        if let Some(v) = ctx.env_var(AWS_AUTH_SCHEME_PREFERENCE) {
            let preference = AuthSchemePreference::parse(&v);
            if !preference.is_empty() {
                debug!(
                    "using auth scheme preference from {AWS_AUTH_SCHEME_PREFERENCE}: {preference:?}"
                );
                return Ok(preference);
            }
        }

        let section = self.files.load_section(ctx, ProfileFileKind::Config).await?;
        let preference = section
            .as_ref()
            .and_then(|s| s.get(PROFILE_KEY))
            .map(|v| AuthSchemePreference::parse(v))
            .unwrap_or_default();
        if !preference.is_empty() {
            debug!("using auth scheme preference from profile: {preference:?}");
        }
        Ok(preference)
    }
}
