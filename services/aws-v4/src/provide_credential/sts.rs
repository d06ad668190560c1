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

use crate::constants::{
    AWS_DEFAULT_REGION, AWS_QUERY_ENCODE_SET, AWS_REGION, AWS_STS_REGIONAL_ENDPOINTS,
};
use crate::Credential;
use awsign_core::time::parse_rfc3339;
use awsign_core::{Context, Error, Result};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use log::debug;
use percent_encoding::utf8_percent_encode;
use serde::Deserialize;

const STS_VERSION: &str = "2011-06-15";

/// Where STS calls for a region go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StsEndpoint {
    /// Region used in the SigV4 scope.
    pub signing_region: String,
    pub host: String,
}

/// Pick the STS endpoint.
///
/// A known region uses the regional endpoint unless `AWS_STS_REGIONAL_ENDPOINTS`
/// is `legacy`. Without a region the global endpoint signs for `us-east-1`.
pub(crate) fn sts_endpoint(ctx: &Context, region: Option<&str>) -> StsEndpoint {
    let region = region
        .map(str::to_string)
        .or_else(|| ctx.env_var(AWS_REGION))
        .or_else(|| ctx.env_var(AWS_DEFAULT_REGION))
        .filter(|v| !v.is_empty());
    let legacy = ctx
        .env_var(AWS_STS_REGIONAL_ENDPOINTS)
        .is_some_and(|v| v.eq_ignore_ascii_case("legacy"));

    match region {
        Some(region) if region.starts_with("cn-") => StsEndpoint {
            host: format!("sts.{region}.amazonaws.com.cn"),
            signing_region: region,
        },
        Some(region) if !legacy => StsEndpoint {
            host: format!("sts.{region}.amazonaws.com"),
            signing_region: region,
        },
        _ => StsEndpoint {
            signing_region: "us-east-1".to_string(),
            host: "sts.amazonaws.com".to_string(),
        },
    }
}

/// Build a query style STS request for `action`.
pub(crate) fn sts_request(
    endpoint: &StsEndpoint,
    action: &str,
    params: &[(&str, &str)],
) -> Result<http::Request<Bytes>> {
    let mut query = format!("Action={action}&Version={STS_VERSION}");
    for (k, v) in params {
        query.push('&');
        query.push_str(k);
        query.push('=');
        query.extend(utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET));
    }

    http::Request::get(format!("https://{}/?{query}", endpoint.host))
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Bytes::new())
        .map_err(|e| {
            Error::request_invalid(format!("failed to build STS {action} request")).with_source(e)
        })
}

/// Send an STS request and read the credentials out of its result.
pub(crate) async fn send_sts_request(
    ctx: &Context,
    action: &str,
    req: http::Request<Bytes>,
) -> Result<Credential> {
    let resp = ctx.http_send(req).await.map_err(|e| {
        Error::transport(format!("failed to send {action} request to STS"))
            .with_source(e)
            .set_retryable(true)
    })?;

    let status = resp.status();
    let body = String::from_utf8_lossy(resp.body());
    if status != StatusCode::OK {
        return Err(sts_error(action, status, &body));
    }

    let parsed: StsResponse = quick_xml::de::from_str(&body).map_err(|e| {
        Error::unexpected(format!("failed to parse STS {action} response")).with_source(e)
    })?;
    let creds = parsed.result.credentials;
    debug!("STS {action} returned credentials expiring at {}", creds.expiration);

    let expires_at = parse_rfc3339(creds.expiration.trim())?;
    Ok(Credential::new(creds.access_key_id.trim(), creds.secret_access_key.trim())
        .with_session_token(creds.session_token.trim())
        .with_expires_at(expires_at))
}

fn sts_error(action: &str, status: StatusCode, body: &str) -> Error {
    let detail = quick_xml::de::from_str::<StsErrorResponse>(body)
        .map(|v| v.error)
        .unwrap_or_default();
    let message = format!(
        "STS {action} failed with status {status}: [{}] {}",
        detail.code, detail.message
    );

    let err = match detail.code.as_str() {
        "ExpiredToken" | "ExpiredTokenException" => Error::credential_expired(message),
        "AccessDenied" | "InvalidClientTokenId" | "InvalidIdentityToken" => {
            Error::credential_denied(message)
        }
        "Throttling" | "IDPCommunicationError" => Error::service(message).set_retryable(true),
        _ if status.is_server_error() => Error::service(message).set_retryable(true),
        _ => Error::credential_invalid(message),
    };
    err.with_status(status)
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsResponse {
    #[serde(alias = "AssumeRoleResult", alias = "AssumeRoleWithWebIdentityResult")]
    result: StsResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsResult {
    credentials: StsCredentials,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorResponse {
    error: StsErrorDetail,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorDetail {
    code: String,
    message: String,
}
