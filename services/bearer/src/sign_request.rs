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

use crate::Token;
use async_trait::async_trait;
use awsign_core::{Context, Error, Result, SignRequest, SigningProperties};
use http::request::Parts;
use http::{header, HeaderValue};

/// RequestSigner writes `Authorization: Bearer <token>`.
///
/// Signing fails with [`awsign_core::ErrorKind::CredentialInvalid`] when no
/// token or an empty token is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSigner;

impl RequestSigner {
    /// Create a new bearer signer.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Token;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        _: &SigningProperties,
    ) -> Result<()> {
        let Some(token) = credential.filter(|v| !v.token.is_empty()) else {
            return Err(Error::credential_invalid(
                "bearer signing requires a non empty token",
            ));
        };

        let mut value = HeaderValue::try_from(format!("Bearer {}", token.token))?;
        value.set_sensitive(true);
        req.headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awsign_core::ErrorKind;
    use pretty_assertions::assert_eq;

    fn parts() -> Parts {
        http::Request::get("https://example.com/")
            .header(header::AUTHORIZATION, "stale")
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0
    }

    #[tokio::test]
    async fn test_sign_request() -> Result<()> {
        let mut p = parts();
        RequestSigner::new()
            .sign_request(
                &Context::new(),
                &mut p,
                Some(&Token::new("abc123")),
                &SigningProperties::new(),
            )
            .await?;

        assert_eq!(p.headers[header::AUTHORIZATION], "Bearer abc123");
        assert_eq!(p.headers.get_all(header::AUTHORIZATION).iter().count(), 1);
        assert!(p.headers[header::AUTHORIZATION].is_sensitive());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_token() {
        for token in [None, Some(Token::new(""))] {
            let err = RequestSigner::new()
                .sign_request(
                    &Context::new(),
                    &mut parts(),
                    token.as_ref(),
                    &SigningProperties::new(),
                )
                .await
                .expect_err("must fail");
            assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
        }
    }

    #[tokio::test]
    async fn test_token_with_newline_is_rejected() {
        let err = RequestSigner::new()
            .sign_request(
                &Context::new(),
                &mut parts(),
                Some(&Token::new("abc\n123")),
                &SigningProperties::new(),
            )
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    }
}
