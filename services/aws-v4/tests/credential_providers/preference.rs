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
use awsign_aws_v4::{AuthSchemePreferenceResolver, ProfileFiles};
use awsign_core::auth_scheme::{AuthSchemeId, AuthSchemeOption};
use awsign_core::SigningProperties;

fn options() -> Vec<AuthSchemeOption> {
    vec![
        AuthSchemeOption::new(AuthSchemeId::SIGV4, SigningProperties::new()),
        AuthSchemeOption::new(AuthSchemeId::SIGV4A, SigningProperties::new()),
        AuthSchemeOption::new(AuthSchemeId::BEARER, SigningProperties::new()),
    ]
}

#[tokio::test]
async fn test_env_preference_reorders_options() -> Result<()> {
    let config = write_file("[profile dev]\nauth_scheme_preference = bearer\n");
    let config_path = path_of(&config);
    let ctx = create_test_context_with_env(&[
        ("AWS_CONFIG_FILE", config_path.as_str()),
        ("AWS_PROFILE", "dev"),
        ("AWS_AUTH_SCHEME_PREFERENCE", "sigv4a, sigv4"),
    ]);

    let preference = AuthSchemePreferenceResolver::new().resolve(&ctx).await?;
    let ordered = preference.apply(&options());
    let ids = ordered
        .iter()
        .map(|o| o.scheme_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        ids,
        ["aws.auth#sigv4a", "aws.auth#sigv4", "smithy.api#httpBearerAuth"]
    );
    Ok(())
}

#[tokio::test]
async fn test_profile_preference_without_env() -> Result<()> {
    let config = write_file("[profile dev]\nauth_scheme_preference = bearer, unknown\n");
    let ctx = create_test_context_with_env(&[]);

    let preference = AuthSchemePreferenceResolver::new()
        .with_profile_files(
            ProfileFiles::new()
                .with_profile("dev")
                .with_config_file(path_of(&config)),
        )
        .resolve(&ctx)
        .await?;
    assert_eq!(preference.entries(), ["bearer", "unknown"]);

    let ordered = preference.apply(&options());
    assert_eq!(ordered[0].scheme_id, AuthSchemeId::BEARER);
    assert_eq!(ordered[1].scheme_id, AuthSchemeId::SIGV4);
    Ok(())
}
