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

use anyhow::Result;
use awsign_aws_v4::{DefaultCredentialProvider, RequestSigner};
use awsign_core::{Context, OsEnv, Signer, SigningProperties};
use awsign_file_read_tokio::TokioFileRead;
use awsign_http_send_reqwest::ReqwestHttpSend;
use bytes::Bytes;
use http::{Method, Request, StatusCode};
use log::{debug, warn};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Initialize the live test environment, `None` unless `AWSIGN_AWS_V4_TEST=on`.
fn init_live_test() -> Option<(Context, Signer<awsign_aws_v4::Credential>, String)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("AWSIGN_AWS_V4_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let region = env::var("AWSIGN_AWS_V4_REGION").expect("AWSIGN_AWS_V4_REGION must be set");
    let service = env::var("AWSIGN_AWS_V4_SERVICE").unwrap_or_else(|_| "s3".to_string());
    let url = env::var("AWSIGN_AWS_V4_URL").expect("AWSIGN_AWS_V4_URL must be set");

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv);
    let signer = Signer::new(
        ctx.clone(),
        DefaultCredentialProvider::new(),
        RequestSigner::new(&service, &region),
    )
    .with_properties(SigningProperties::s3(region));

    Some((ctx, signer, url))
}

async fn send(
    ctx: &Context,
    signer: &Signer<awsign_aws_v4::Credential>,
    method: Method,
    uri: &str,
    props: Option<SigningProperties>,
) -> Result<StatusCode> {
    let (mut parts, _) = Request::new(()).into_parts();
    parts.method = method;
    parts.uri = http::Uri::from_str(uri)?;

    match props {
        Some(props) => signer.sign_with(&mut parts, &props).await?,
        None => signer.sign(&mut parts).await?,
    }

    let resp = ctx
        .http_send(Request::from_parts(parts, Bytes::new()))
        .await?;
    debug!("got response: {resp:?}");
    Ok(resp.status())
}

#[tokio::test]
async fn test_head_not_exist_object() -> Result<()> {
    let Some((ctx, signer, url)) = init_live_test() else {
        warn!("AWSIGN_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    for key in [
        "not_exist_file",
        "!@#$%^&*()_+-=;:'><,/?.txt",
        "test file with spaces.txt",
        "文件名.txt",
    ] {
        let uri = format!("{url}/{}", utf8_percent_encode(key, NON_ALPHANUMERIC));
        let status = send(&ctx, &signer, Method::HEAD, &uri, None).await?;
        assert_eq!(StatusCode::NOT_FOUND, status, "head {key}");
    }
    Ok(())
}

#[tokio::test]
async fn test_presigned_head_not_exist_object() -> Result<()> {
    let Some((ctx, signer, url)) = init_live_test() else {
        warn!("AWSIGN_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let region = env::var("AWSIGN_AWS_V4_REGION")?;
    let props = SigningProperties::s3(region).with_expires_in(Duration::from_secs(3600));
    let status = send(
        &ctx,
        &signer,
        Method::HEAD,
        &format!("{url}/not_exist_file"),
        Some(props),
    )
    .await?;
    assert_eq!(StatusCode::NOT_FOUND, status);
    Ok(())
}

#[tokio::test]
async fn test_list_objects() -> Result<()> {
    let Some((ctx, signer, url)) = init_live_test() else {
        warn!("AWSIGN_AWS_V4_TEST is not set, skipped");
        return Ok(());
    };

    let status = send(
        &ctx,
        &signer,
        Method::GET,
        &format!("{url}?list-type=2&delimiter=/&encoding-type=url"),
        None,
    )
    .await?;
    assert_eq!(StatusCode::OK, status);
    Ok(())
}
