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
use awsign_aws_v4::DefaultCredentialProvider;
use awsign_command_execute_tokio::TokioCommandExecute;
use awsign_core::ProvideCredential;
use pretty_assertions::assert_eq;

#[cfg(unix)]
#[tokio::test]
async fn test_credential_process_runs_through_shell() -> Result<()> {
    let config = write_file(
        r#"[profile tool]
credential_process = echo '{"Version": 1, "AccessKeyId": "PROC_AK", "SecretAccessKey": "PROC_SK", "SessionToken": "PROC_TOKEN", "Expiration": "2099-01-01T00:00:00Z"}'
"#,
    );
    let config_path = path_of(&config);
    let ctx = create_test_context_with_env(&[
        ("AWS_SHARED_CREDENTIALS_FILE", "/not/here/credentials"),
        ("AWS_CONFIG_FILE", config_path.as_str()),
        ("AWS_PROFILE", "tool"),
    ])
    .with_command_execute(TokioCommandExecute);

    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?
        .expect("credential must be loaded");
    assert_eq!(cred.access_key_id, "PROC_AK");
    assert_eq!(cred.secret_access_key, "PROC_SK");
    assert_eq!(cred.session_token.as_deref(), Some("PROC_TOKEN"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_credential_process_failure_is_reported() {
    let config = write_file("[default]\ncredential_process = sh -c 'echo denied >&2; exit 7'\n");
    let config_path = path_of(&config);
    let ctx = create_test_context_with_env(&[
        ("AWS_SHARED_CREDENTIALS_FILE", "/not/here/credentials"),
        ("AWS_CONFIG_FILE", config_path.as_str()),
    ])
    .with_command_execute(TokioCommandExecute);

    let err = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await
        .expect_err("process exits with failure");
    assert!(err.message().contains("status 7: denied"), "{err}");
}
