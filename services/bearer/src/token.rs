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

use awsign_core::time::{now, DateTime};
use awsign_core::utils::Redact;
use awsign_core::SigningCredential;
use chrono::TimeDelta;
use std::fmt::{self, Debug, Formatter};

/// Token is a bearer token with an optional expiry.
#[derive(Clone, Default)]
pub struct Token {
    /// The access token.
    pub token: String,
    /// The expiration time of the token.
    pub expires_at: Option<DateTime>,
}

impl Token {
    /// Create a token that never expires.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    /// Set the expiration time.
    pub fn with_expires_at(mut self, expires_at: DateTime) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("token", &Redact::from(&self.token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl SigningCredential for Token {
    fn is_valid(&self) -> bool {
        self.is_valid_at(now())
    }

    /// Tokens expiring within two minutes of `at` are treated as expired.
    fn is_valid_at(&self, at: DateTime) -> bool {
        if self.token.is_empty() {
            return false;
        }

        match self.expires_at {
            Some(expires_at) => at + TimeDelta::minutes(2) < expires_at,
            None => true,
        }
    }

    fn expires_at(&self) -> Option<DateTime> {
        self.expires_at
    }
}
