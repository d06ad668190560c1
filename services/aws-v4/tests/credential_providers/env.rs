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

use super::create_test_context_with_env;
use anyhow::Result;
use awsign_aws_v4::{DefaultCredentialProvider, RequestSigner};
use awsign_core::hash::EMPTY_SHA256;
use awsign_core::{Signer, SigningProperties};
use http::header::AUTHORIZATION;

#[tokio::test]
async fn test_sign_with_env_credential() -> Result<()> {
    let ctx = create_test_context_with_env(&[
        ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
        ("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
        ("AWS_CONFIG_FILE", "/not/here/config"),
        ("AWS_SHARED_CREDENTIALS_FILE", "/not/here/credentials"),
    ]);

    let signer = Signer::new(
        ctx,
        DefaultCredentialProvider::new(),
        RequestSigner::new("service", "us-east-1"),
    )
    .with_properties(SigningProperties::new().with_payload_hash(EMPTY_SHA256));

    let (mut parts, _) = http::Request::get("https://example.amazonaws.com/")
        .body(())?
        .into_parts();
    signer.sign(&mut parts).await?;

    assert_eq!(
        parts.headers[AUTHORIZATION],
        "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, SignedHeaders=host;x-amz-date, Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
    );
    Ok(())
}

#[tokio::test]
async fn test_sign_without_any_credential() -> Result<()> {
    let ctx = create_test_context_with_env(&[
        ("AWS_CONFIG_FILE", "/not/here/config"),
        ("AWS_SHARED_CREDENTIALS_FILE", "/not/here/credentials"),
    ]);

    let signer = Signer::new(
        ctx,
        DefaultCredentialProvider::new(),
        RequestSigner::new("service", "us-east-1"),
    );

    let (mut parts, _) = http::Request::get("https://example.amazonaws.com/")
        .body(())?
        .into_parts();
    signer.sign(&mut parts).await?;
    assert!(!parts.headers.contains_key(AUTHORIZATION));
    Ok(())
}
