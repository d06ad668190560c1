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

use super::{create_test_context_with_env, path_of, write_file};
use anyhow::Result;
use awsign_aws_v4::{DefaultCredentialProvider, ProfileCredentialProvider, RequestSigner};
use awsign_core::{ProvideCredential, Signer, SigningProperties};
use http::header::AUTHORIZATION;

#[tokio::test]
async fn test_sign_with_profile_session_credential() -> Result<()> {
    let credentials = write_file(
        "[default]\naws_access_key_id = DEFAULT_AK\naws_secret_access_key = DEFAULT_SK\n\n[ci]\naws_access_key_id = CI_AK\naws_secret_access_key = CI_SK\naws_session_token = CI_TOKEN\n",
    );
    let credentials_path = path_of(&credentials);
    let ctx = create_test_context_with_env(&[
        ("AWS_SHARED_CREDENTIALS_FILE", credentials_path.as_str()),
        ("AWS_CONFIG_FILE", "/not/here/config"),
        ("AWS_PROFILE", "ci"),
    ]);

    let signer = Signer::new(
        ctx,
        DefaultCredentialProvider::new(),
        RequestSigner::new("s3", "us-east-1"),
    )
    .with_properties(SigningProperties::s3("us-east-1"));

    let (mut parts, _) = http::Request::get("https://examplebucket.s3.amazonaws.com/test.txt")
        .body(())?
        .into_parts();
    signer.sign(&mut parts).await?;

    let auth = parts.headers[AUTHORIZATION].to_str()?;
    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=CI_AK/20150830/us-east-1/s3/aws4_request, SignedHeaders=host;x-amz-content-sha256;x-amz-date;x-amz-security-token, "));
    assert_eq!(parts.headers["x-amz-security-token"], "CI_TOKEN");
    assert_eq!(parts.headers["x-amz-content-sha256"], "UNSIGNED-PAYLOAD");
    Ok(())
}

#[tokio::test]
async fn test_env_credential_wins_over_profile() -> Result<()> {
    let credentials =
        write_file("[default]\naws_access_key_id = FILE_AK\naws_secret_access_key = FILE_SK\n");
    let credentials_path = path_of(&credentials);
    let ctx = create_test_context_with_env(&[
        ("AWS_SHARED_CREDENTIALS_FILE", credentials_path.as_str()),
        ("AWS_ACCESS_KEY_ID", "ENV_AK"),
        ("AWS_SECRET_ACCESS_KEY", "ENV_SK"),
    ]);

    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?
        .expect("credential must be loaded");
    assert_eq!(cred.access_key_id, "ENV_AK");
    Ok(())
}

#[tokio::test]
async fn test_custom_profile_provider_in_default_chain() -> Result<()> {
    let config = write_file(
        "[profile staging]\naws_access_key_id = STAGING_AK\naws_secret_access_key = STAGING_SK\n",
    );
    let ctx = create_test_context_with_env(&[(
        "AWS_SHARED_CREDENTIALS_FILE",
        "/not/here/credentials",
    )]);

    let provider = DefaultCredentialProvider::with_profile_provider(
        ProfileCredentialProvider::new()
            .with_profile("staging")
            .with_config_file(path_of(&config)),
    );
    let cred = provider
        .provide_credential(&ctx)
        .await?
        .expect("credential must be loaded");
    assert_eq!(cred.access_key_id, "STAGING_AK");
    assert_eq!(cred.secret_access_key, "STAGING_SK");
    Ok(())
}
