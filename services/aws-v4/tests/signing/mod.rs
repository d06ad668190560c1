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

mod live;
mod presigned;
mod special_chars;
mod standard;

use anyhow::Result;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SignatureLocation,
    SigningSettings,
};
use aws_sigv4::sign::v4;
use awsign_aws_v4::{Credential, RequestSigner};
use awsign_core::time::{now, DateTime, FixedClock};
use awsign_core::{Context, SignRequest, SigningProperties};
use http::header::CONTENT_LENGTH;
use http::{HeaderValue, Request};
use pretty_assertions::assert_eq;
use std::time::{Duration, SystemTime};

const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";

/// (name, request_builder)
pub type TestCase = (&'static str, fn() -> Request<&'static str>);

pub fn test_cases() -> Vec<TestCase> {
    vec![
        ("get_request", get_request),
        ("get_request_with_sse", get_request_with_sse),
        ("get_request_with_query", get_request_with_query),
        ("get_request_virtual_host", get_request_virtual_host),
        ("put_request", put_request),
        ("put_request_with_body_digest", put_request_with_body_digest),
    ]
}

pub fn request(method: http::Method, uri: &str, body: &'static str) -> Request<&'static str> {
    let mut req = Request::new(body);
    *req.method_mut() = method;
    *req.uri_mut() = uri.parse().expect("url must be valid");
    req
}

fn get_request() -> Request<&'static str> {
    request(http::Method::GET, "http://127.0.0.1:9000/hello", "")
}

fn get_request_with_sse() -> Request<&'static str> {
    let mut req = get_request();
    for (k, v) in [
        ("x-amz-server-side-encryption", "a"),
        ("x-amz-server-side-encryption-customer-algorithm", "b"),
        ("x-amz-server-side-encryption-customer-key", "c"),
        ("x-amz-server-side-encryption-customer-key-md5", "d"),
        ("x-amz-server-side-encryption-aws-kms-key-id", "e"),
    ] {
        req.headers_mut().insert(k, HeaderValue::from_static(v));
    }
    req
}

fn get_request_with_query() -> Request<&'static str> {
    request(
        http::Method::GET,
        "http://127.0.0.1:9000/hello?list-type=2&max-keys=3&prefix=CI/&start-after=ExampleGuide.pdf",
        "",
    )
}

fn get_request_virtual_host() -> Request<&'static str> {
    request(http::Method::GET, "http://hello.s3.test.example.com", "")
}

fn put_request() -> Request<&'static str> {
    let content = "Hello,World!";
    let mut req = request(http::Method::PUT, "http://127.0.0.1:9000/hello", content);
    req.headers_mut().insert(
        CONTENT_LENGTH,
        HeaderValue::from_str(&content.len().to_string()).expect("must be valid"),
    );
    req
}

fn put_request_with_body_digest() -> Request<&'static str> {
    let mut req = put_request();
    let digest = awsign_core::hash::hex_sha256(req.body().as_bytes());
    req.headers_mut().insert(
        X_AMZ_CONTENT_SHA_256,
        HeaderValue::from_str(&digest).expect("must be valid"),
    );
    req
}

/// Sign with the aws-sigv4 crate, the result every awsign signature is checked against.
pub fn sign_with_aws_sigv4(
    mut req: Request<&'static str>,
    token: Option<&str>,
    expires_in: Option<Duration>,
    now: DateTime,
) -> Result<Request<&'static str>> {
    let mut ss = SigningSettings::default();
    ss.percent_encoding_mode = PercentEncodingMode::Double;
    ss.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
    if let Some(expires_in) = expires_in {
        ss.signature_location = SignatureLocation::QueryParams;
        ss.expires_in = Some(expires_in);
    }

    let id = Credentials::new(
        "access_key_id",
        "secret_access_key",
        token.map(|v| v.to_string()),
        None,
        "hardcoded-credentials",
    )
    .into();
    let sp = v4::SigningParams::builder()
        .identity(&id)
        .region("test")
        .name("s3")
        .time(SystemTime::from(now))
        .settings(ss)
        .build()
        .expect("signing params must be valid");

    let body = if req.headers().contains_key(X_AMZ_CONTENT_SHA_256) {
        SignableBody::Bytes(req.body().as_bytes())
    } else {
        SignableBody::UnsignedPayload
    };

    let headers = req
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str(),
                v.to_str().expect("header value must be valid"),
            )
        })
        .collect::<Vec<_>>();
    let output = aws_sigv4::http_request::sign(
        SignableRequest::new(
            req.method().as_str(),
            req.uri().to_string(),
            headers.into_iter(),
            body,
        )?,
        &sp.into(),
    )?;
    let (aws_sig, _) = output.into_parts();
    aws_sig.apply_to_request_http1x(&mut req);
    Ok(req)
}

/// Sign with awsign using the same settings as [`sign_with_aws_sigv4`].
pub async fn sign_with_awsign(
    req: Request<&'static str>,
    token: Option<&str>,
    expires_in: Option<Duration>,
    now: DateTime,
) -> Result<Request<&'static str>> {
    let ctx = Context::new().with_clock(FixedClock(now));
    let mut props = SigningProperties::new().with_content_sha256_header(true);
    if let Some(expires_in) = expires_in {
        props = props.with_expires_in(expires_in);
    }
    let mut cred = Credential::new("access_key_id", "secret_access_key");
    if let Some(token) = token {
        cred = cred.with_session_token(token);
    }

    let (mut parts, body) = req.into_parts();
    RequestSigner::new("s3", "test")
        .sign_request(&ctx, &mut parts, Some(&cred), &props)
        .await?;
    Ok(Request::from_parts(parts, body))
}

/// Sign `req_fn()` with both implementations and compare the outcome.
pub async fn compare_with_aws_sigv4(
    name: &str,
    req_fn: fn() -> Request<&'static str>,
    token: Option<&str>,
    expires_in: Option<Duration>,
) -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let now = now();
    let expected = sign_with_aws_sigv4(req_fn(), token, expires_in, now)?;
    let actual = sign_with_awsign(req_fn(), token, expires_in, now).await?;
    compare_request(name, &expected, &actual);
    Ok(())
}

#[track_caller]
pub fn compare_request(name: &str, l: &Request<&str>, r: &Request<&str>) {
    fn format_headers(req: &Request<&str>) -> Vec<String> {
        let mut hs = req
            .headers()
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v.to_str().expect("must be valid")))
            .collect::<Vec<_>>();

        // Insert host if original request doesn't have it.
        let authority = req.uri().authority().expect("authority must exist");
        if !hs.contains(&format!("host:{authority}")) {
            hs.push(format!("host:{authority}"))
        }

        hs.sort();
        hs
    }

    assert_eq!(
        format_headers(l),
        format_headers(r),
        "{name} header mismatch"
    );

    fn format_query(req: &Request<&str>) -> Vec<String> {
        let query = req.uri().query().unwrap_or_default();
        let mut query = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| format!("{}={}", &k, &v))
            .collect::<Vec<_>>();
        query.sort();
        query
    }

    assert_eq!(format_query(l), format_query(r), "{name} query mismatch");
}
