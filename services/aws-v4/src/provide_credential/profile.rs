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

use crate::constants::*;
use crate::profile::{ProfileFiles, ProfileSet};
use crate::provide_credential::{
    AssumeRoleCredentialProvider, AssumeRoleWithWebIdentityCredentialProvider,
    EcsCredentialProvider, EnvCredentialProvider, ImdsCredentialProvider,
    ProcessCredentialProvider, SsoCredentialProvider, StaticCredentialProvider,
};
use crate::Credential;
use async_trait::async_trait;
use awsign_core::{Context, Error, ProvideCredential, Result};
use log::debug;
use std::collections::HashMap;

type BoxedProvider = Box<dyn ProvideCredential<Credential = Credential>>;

fn boxed(provider: impl ProvideCredential<Credential = Credential>) -> BoxedProvider {
    Box::new(provider)
}

/// ProfileCredentialProvider loads credentials the way the active profile of
/// the shared AWS files describes.
///
/// Both files are read and merged, keys in the credentials file winning:
/// - `~/.aws/credentials` (or the path specified by `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or the path specified by `AWS_CONFIG_FILE`)
///
/// The profile to use is determined by:
/// 1. The `AWS_PROFILE` environment variable
/// 2. The profile specified via `with_profile()`
/// 3. Default to "default"
///
/// The first matching rule decides where credentials come from:
///
/// 1. `role_arn` with `web_identity_token_file`: [`AssumeRoleWithWebIdentityCredentialProvider`].
/// 2. any `sso_*` key: [`SsoCredentialProvider`].
/// 3. `role_arn` with `source_profile` or `credential_source`:
///    [`AssumeRoleCredentialProvider`] on top of the source.
/// 4. `credential_process`: [`ProcessCredentialProvider`].
/// 5. `aws_session_token`: session credentials from the profile.
/// 6. `aws_access_key_id`: long lived credentials from the profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileCredentialProvider {
    files: ProfileFiles,
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.files = self.files.with_profile(profile);
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.files = self.files.with_config_file(path);
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.files = self.files.with_credentials_file(path);
        self
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let set = self.files.load(ctx).await?;
        let Some(provider) = resolve(&set, set.selected(), &mut Vec::new())? else {
            debug!("profile {} has no credentials", set.selected());
            return Ok(None);
        };

        debug!("loading credential of profile {} from {provider:?}", set.selected());
        provider.provide_credential(ctx).await
    }
}

/// Build the provider for profile `name`.
///
/// `children` holds the profiles already visited through `source_profile`.
fn resolve(
    set: &ProfileSet,
    name: &str,
    children: &mut Vec<String>,
) -> Result<Option<BoxedProvider>> {
    let Some(profile) = set.profile(name) else {
        return Ok(None);
    };
    let get = |key: &str| profile.get(key).map(String::as_str).filter(|v| !v.is_empty());
    let region = get(PROFILE_REGION);

    if let (Some(role_arn), Some(token_file)) =
        (get(PROFILE_ROLE_ARN), get(PROFILE_WEB_IDENTITY_TOKEN_FILE))
    {
        let mut provider = AssumeRoleWithWebIdentityCredentialProvider::new()
            .with_role_arn(role_arn)
            .with_web_identity_token_file(token_file);
        if let Some(v) = get(PROFILE_ROLE_SESSION_NAME) {
            provider = provider.with_role_session_name(v);
        }
        if let Some(v) = region {
            provider = provider.with_region(v);
        }
        return Ok(Some(boxed(provider)));
    }

    let sso_keys = [
        PROFILE_SSO_SESSION,
        PROFILE_SSO_ACCOUNT_ID,
        PROFILE_SSO_ROLE_NAME,
        PROFILE_SSO_REGION,
        PROFILE_SSO_START_URL,
    ];
    if sso_keys.iter().any(|k| profile.contains_key(*k)) {
        return sso_provider(set, name, profile).map(|v| Some(boxed(v)));
    }

    if let Some(role_arn) = get(PROFILE_ROLE_ARN) {
        let source = match (get(PROFILE_SOURCE_PROFILE), get(PROFILE_CREDENTIAL_SOURCE)) {
            (Some(_), Some(_)) => {
                return Err(Error::config_invalid(format!(
                    "profile {name} has both {PROFILE_SOURCE_PROFILE} and {PROFILE_CREDENTIAL_SOURCE}"
                )))
            }
            (Some(source), None) => {
                if children.iter().any(|v| v == name) {
                    return Err(Error::config_invalid(format!(
                        "circular relationship detected with profiles {}",
                        children.join(" -> ")
                    )));
                }
                children.push(name.to_string());
                Some(resolve(set, source, children)?.ok_or_else(|| {
                    Error::config_invalid(format!(
                        "source profile {source} of profile {name} has no credentials"
                    ))
                })?)
            }
            (None, Some(source)) => Some(credential_source(name, source)?),
            (None, None) => None,
        };

        if let Some(source) = source {
            let mut provider =
                AssumeRoleCredentialProvider::from_boxed(role_arn.to_string(), source);
            if let Some(v) = get(PROFILE_ROLE_SESSION_NAME) {
                provider = provider.with_role_session_name(v);
            }
            if let Some(v) = get(PROFILE_EXTERNAL_ID) {
                provider = provider.with_external_id(v);
            }
            if let Some(v) = get(PROFILE_DURATION_SECONDS) {
                let seconds = v.parse::<u32>().map_err(|e| {
                    Error::config_invalid(format!(
                        "profile {name} has invalid {PROFILE_DURATION_SECONDS} {v}"
                    ))
                    .with_source(anyhow::Error::new(e))
                })?;
                provider = provider.with_duration_seconds(seconds);
            }
            if let Some(v) = region {
                provider = provider.with_region(v);
            }
            return Ok(Some(boxed(provider)));
        }
    }

    if let Some(command) = get(PROFILE_CREDENTIAL_PROCESS) {
        return Ok(Some(boxed(ProcessCredentialProvider::new(command))));
    }

    let require = |key: &str| {
        get(key).ok_or_else(|| Error::config_invalid(format!("profile {name} is missing {key}")))
    };
    if profile.contains_key(PROFILE_SESSION_TOKEN) {
        let cred = Credential::new(
            require(PROFILE_ACCESS_KEY_ID)?,
            require(PROFILE_SECRET_ACCESS_KEY)?,
        )
        .with_session_token(require(PROFILE_SESSION_TOKEN)?);
        return Ok(Some(boxed(StaticCredentialProvider::from(cred))));
    }
    if profile.contains_key(PROFILE_ACCESS_KEY_ID) {
        let cred = Credential::new(
            require(PROFILE_ACCESS_KEY_ID)?,
            require(PROFILE_SECRET_ACCESS_KEY)?,
        );
        return Ok(Some(boxed(StaticCredentialProvider::from(cred))));
    }

    Ok(None)
}

fn credential_source(name: &str, source: &str) -> Result<BoxedProvider> {
    match source {
        "Environment" => Ok(boxed(EnvCredentialProvider::new())),
        "Ec2InstanceMetadata" => Ok(boxed(ImdsCredentialProvider::new())),
        "EcsContainer" => Ok(boxed(EcsCredentialProvider::new())),
        v => Err(Error::config_invalid(format!(
            "profile {name} has unsupported {PROFILE_CREDENTIAL_SOURCE} {v}"
        ))),
    }
}

fn sso_provider(
    set: &ProfileSet,
    name: &str,
    profile: &HashMap<String, String>,
) -> Result<SsoCredentialProvider> {
    let require = |props: &HashMap<String, String>, section: &str, key: &str| {
        props
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| Error::config_invalid(format!("{section} is missing {key}")))
    };
    let section = format!("profile {name}");
    let account_id = require(profile, &section, PROFILE_SSO_ACCOUNT_ID)?;
    let role_name = require(profile, &section, PROFILE_SSO_ROLE_NAME)?;

    let Some(session) = profile.get(PROFILE_SSO_SESSION).filter(|v| !v.is_empty()) else {
        let region = require(profile, &section, PROFILE_SSO_REGION)?;
        let start_url = require(profile, &section, PROFILE_SSO_START_URL)?;
        return Ok(SsoCredentialProvider::new(account_id, role_name, region, start_url));
    };

    let session_props = set.sso_session(session).ok_or_else(|| {
        Error::config_invalid(format!(
            "sso-session {session} referenced by profile {name} does not exist"
        ))
    })?;
    let session_section = format!("sso-session {session}");
    let region = require(session_props, &session_section, PROFILE_SSO_REGION)?;
    let start_url = require(session_props, &session_section, PROFILE_SSO_START_URL)?;

    for (key, expected) in [(PROFILE_SSO_REGION, &region), (PROFILE_SSO_START_URL, &start_url)] {
        if profile.get(key).is_some_and(|v| v != expected) {
            return Err(Error::config_invalid(format!(
                "profile {name} and {session_section} have different {key}"
            )));
        }
    }

    Ok(SsoCredentialProvider::new(account_id, role_name, region, start_url)
        .with_session_name(session))
}
