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

use crate::constants::AWS_BEARER_TOKEN_PREFIX;
use crate::Token;
use async_trait::async_trait;
use awsign_core::{Context, ProvideCredential, Result};
use log::debug;

/// EnvTokenProvider loads a service's bearer token from `AWS_BEARER_TOKEN_<SERVICE>`.
///
/// `<SERVICE>` is the signing name upper cased, with every character that is
/// not ASCII alphanumeric replaced by `_`. For `bedrock` this is
/// `AWS_BEARER_TOKEN_BEDROCK`.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    key: String,
}

impl EnvTokenProvider {
    /// Create a provider for the given signing name.
    pub fn new(service: &str) -> Self {
        let suffix: String = service
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();

        Self {
            key: format!("{AWS_BEARER_TOKEN_PREFIX}{suffix}"),
        }
    }

    /// Name of the environment variable read by this provider.
    pub fn env_key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl ProvideCredential for EnvTokenProvider {
    type Credential = Token;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        match ctx.env_var(&self.key).filter(|v| !v.is_empty()) {
            Some(token) => Ok(Some(Token::new(token))),
            None => {
                debug!("{} is not set", self.key);
                Ok(None)
            }
        }
    }
}
