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

use crate::constants::{AWS_CONFIG_FILE, AWS_PROFILE, AWS_SHARED_CREDENTIALS_FILE};
use awsign_core::{Context, Error, Result};
use ini::{Ini, Properties};
use log::{debug, warn};
use std::collections::HashMap;

const DEFAULT_PROFILE: &str = "default";
const DEFAULT_CONFIG_FILE: &str = "~/.aws/config";
const DEFAULT_CREDENTIALS_FILE: &str = "~/.aws/credentials";

/// Which of the two shared files to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileFileKind {
    /// `~/.aws/config`, sections are named `[profile <name>]` except `[default]`.
    Config,
    /// `~/.aws/credentials`, sections are named `[<name>]`.
    Credentials,
}

/// ProfileFiles locates the shared AWS config files and the active profile.
///
/// Paths are taken from `AWS_CONFIG_FILE` / `AWS_SHARED_CREDENTIALS_FILE` first,
/// then from the configured paths, then from `~/.aws/`. The profile name is
/// taken from `AWS_PROFILE` first, then the configured name, then `default`.
#[derive(Debug, Clone, Default)]
pub struct ProfileFiles {
    profile: Option<String>,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl ProfileFiles {
    /// Create with all settings left to the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the profile name used when `AWS_PROFILE` is not set.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set the config file path used when `AWS_CONFIG_FILE` is not set.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the credentials file path used when `AWS_SHARED_CREDENTIALS_FILE` is not set.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// Name of the active profile.
    pub fn profile_name(&self, ctx: &Context) -> String {
        ctx.env_var(AWS_PROFILE)
            .filter(|v| !v.is_empty())
            .or_else(|| self.profile.clone())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
    }

    /// Path of the given file before home dir expansion.
    pub fn path(&self, ctx: &Context, kind: ProfileFileKind) -> String {
        let (env, configured, default) = match kind {
            ProfileFileKind::Config => (AWS_CONFIG_FILE, &self.config_file, DEFAULT_CONFIG_FILE),
            ProfileFileKind::Credentials => (
                AWS_SHARED_CREDENTIALS_FILE,
                &self.credentials_file,
                DEFAULT_CREDENTIALS_FILE,
            ),
        };

        ctx.env_var(env)
            .filter(|v| !v.is_empty())
            .or_else(|| configured.clone())
            .unwrap_or_else(|| default.to_string())
    }

    /// Load the active profile's section of the given file.
    ///
    /// A missing file or section yields `Ok(None)`; a file that cannot be
    /// parsed is an error.
    pub async fn load_section(
        &self,
        ctx: &Context,
        kind: ProfileFileKind,
    ) -> Result<Option<HashMap<String, String>>> {
        let Some(conf) = self.read(ctx, kind).await? else {
            return Ok(None);
        };

        let profile = self.profile_name(ctx);
        let section = match (kind, profile.as_str()) {
            (ProfileFileKind::Config, DEFAULT_PROFILE) | (ProfileFileKind::Credentials, _) => {
                profile.clone()
            }
            (ProfileFileKind::Config, name) => format!("profile {name}"),
        };

        match conf.section(Some(section.as_str())) {
            Some(props) => Ok(Some(to_map(props))),
            None => {
                debug!("section {section} not found in {kind:?} file");
                Ok(None)
            }
        }
    }

    /// Load every profile and sso-session of both files.
    ///
    /// For a profile present in both files, keys from the credentials file
    /// win. Missing files contribute nothing.
    pub async fn load(&self, ctx: &Context) -> Result<ProfileSet> {
        let mut set = ProfileSet {
            selected: self.profile_name(ctx),
            ..Default::default()
        };

        if let Some(conf) = self.read(ctx, ProfileFileKind::Config).await? {
            // `[profile default]` takes precedence over `[default]`.
            let mut sections: Vec<_> = conf.iter().collect();
            sections.sort_by_key(|(name, _)| *name == Some("profile default"));

            for (name, props) in sections {
                let Some(name) = name else { continue };
                if let Some(session) = name.strip_prefix("sso-session ") {
                    set.sso_sessions
                        .insert(session.trim().to_string(), to_map(props));
                } else if let Some(profile) = name.strip_prefix("profile ") {
                    set.profiles.insert(profile.trim().to_string(), to_map(props));
                } else if name == DEFAULT_PROFILE {
                    set.profiles.insert(name.to_string(), to_map(props));
                } else {
                    warn!("ignoring section [{name}] of config file without a profile prefix");
                }
            }
        }

        if let Some(conf) = self.read(ctx, ProfileFileKind::Credentials).await? {
            for (name, props) in conf.iter() {
                let Some(name) = name else { continue };
                set.profiles
                    .entry(name.trim().to_string())
                    .or_default()
                    .extend(to_map(props));
            }
        }

        Ok(set)
    }

    async fn read(&self, ctx: &Context, kind: ProfileFileKind) -> Result<Option<Ini>> {
        let path = self.path(ctx, kind);
        let Some(path) = ctx.expand_home_dir(&path) else {
            debug!("failed to expand homedir for path: {path}");
            return Ok(None);
        };

        let content = match ctx.file_read_as_string(&path).await {
            Ok(content) => content,
            Err(err) => {
                debug!("failed to read profile file {path}: {err:?}");
                return Ok(None);
            }
        };

        Ini::load_from_str(&content).map(Some).map_err(|e| {
            Error::config_invalid(format!("failed to parse profile file {path}"))
                .with_source(anyhow::Error::new(e))
        })
    }
}

fn to_map(props: &Properties) -> HashMap<String, String> {
    props
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Every profile and sso-session read from the shared files.
#[derive(Debug, Clone, Default)]
pub struct ProfileSet {
    selected: String,
    profiles: HashMap<String, HashMap<String, String>>,
    sso_sessions: HashMap<String, HashMap<String, String>>,
}

impl ProfileSet {
    /// Name of the active profile.
    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Properties of the named profile.
    pub fn profile(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.profiles.get(name)
    }

    /// Properties of the named `[sso-session]` section.
    pub fn sso_session(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.sso_sessions.get(name)
    }
}
