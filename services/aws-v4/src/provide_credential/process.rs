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

use crate::Credential;
use async_trait::async_trait;
use awsign_core::time::parse_rfc3339;
use awsign_core::{Context, Error, ProvideCredential, Result};
use log::debug;
use serde::Deserialize;

/// Largest stdout accepted from a credential process.
const PROCESS_OUTPUT_LIMIT: usize = 64 * 1024;

/// ProcessCredentialProvider runs a profile's `credential_process` and reads
/// credentials from its standard output.
///
/// The command line is handed to the platform shell, so quoting works the
/// same as in a terminal. The output must be JSON like:
///
/// ```json
/// {
///   "Version": 1,
///   "AccessKeyId": "access_key",
///   "SecretAccessKey": "secret_key",
///   "SessionToken": "session_token",
///   "Expiration": "2023-12-01T00:00:00Z"
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ProcessCredentialProvider {
    command: String,
}

impl ProcessCredentialProvider {
    /// Create a provider running `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProcessOutput {
    version: u32,
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    session_token: Option<String>,
    #[serde(default)]
    expiration: Option<String>,
}

#[async_trait]
impl ProvideCredential for ProcessCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if self.command.trim().is_empty() {
            return Err(Error::config_invalid("credential_process command is empty"));
        }
        debug!("executing credential process: {}", self.command);

        let output = if cfg!(windows) {
            ctx.command_execute("cmd.exe", &["/C", &self.command]).await?
        } else {
            ctx.command_execute("sh", &["-c", &self.command]).await?
        };

        if !output.success() {
            return Err(Error::credential_invalid(format!(
                "credential process exited with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if output.stdout.len() > PROCESS_OUTPUT_LIMIT {
            return Err(Error::credential_invalid(format!(
                "credential process output exceeds {PROCESS_OUTPUT_LIMIT} bytes"
            )));
        }

        let out: ProcessOutput = serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::credential_invalid("failed to parse credential process output").with_source(e)
        })?;
        if out.version != 1 {
            return Err(Error::credential_invalid(format!(
                "unsupported credential process output version {}",
                out.version
            )));
        }
        if out.access_key_id.is_empty() || out.secret_access_key.is_empty() {
            return Err(Error::credential_invalid(
                "credential process returned an empty access key",
            ));
        }

        let mut cred = Credential::new(out.access_key_id, out.secret_access_key);
        if let Some(token) = out.session_token.filter(|v| !v.is_empty()) {
            cred = cred.with_session_token(token);
        }
        if let Some(expiration) = out.expiration {
            cred = cred.with_expires_at(parse_rfc3339(&expiration)?);
        }
        Ok(Some(cred))
    }
}
