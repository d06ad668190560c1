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

//! Classification of responses and errors for retries.

use crate::retry::RetryKind;
use crate::time::DateTime;
use crate::{Error, ErrorKind};
use bytes::Bytes;
use chrono::{TimeDelta, Utc};
use http::StatusCode;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

/// Error codes services use to signal throttling.
pub const THROTTLING_ERROR_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "TransactionInProgressException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "LimitExceededException",
    "RequestThrottled",
    "SlowDown",
    "PriorRequestNotComplete",
    "EC2ThrottledException",
];

/// Error codes of transient service failures.
pub const TRANSIENT_ERROR_CODES: &[&str] = &["RequestTimeout", "RequestTimeoutException"];

/// Error codes a service may return when the request time is off.
pub const CLOCK_SKEW_ERROR_CODES: &[&str] = &[
    "AuthFailure",
    "InvalidSignatureException",
    "RequestExpired",
    "RequestInTheFuture",
    "RequestTimeTooSkewed",
    "SignatureDoesNotMatch",
];

/// Smallest gap, in seconds, between our clock and the server's that counts
/// as skew.
pub const CLOCK_SKEW_THRESHOLD_SECS: i64 = 240;

const TRANSIENT_STATUS: &[u16] = &[500, 502, 503, 504];

/// Outcome of one attempt's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// 2xx.
    Success,
    /// A failure worth another attempt.
    Retry(RetryKind),
    /// A failure that will not change on retry.
    Terminal,
}

/// Whether `code` is a throttling error code.
pub fn is_throttling_code(code: &str) -> bool {
    THROTTLING_ERROR_CODES.contains(&code)
}

/// Classify a received response.
pub fn classify_response(resp: &http::Response<Bytes>) -> ResponseClass {
    let status = resp.status();
    if status.is_success() {
        return ResponseClass::Success;
    }

    let code = error_code(resp);
    if status == StatusCode::TOO_MANY_REQUESTS || code.as_deref().is_some_and(is_throttling_code) {
        return ResponseClass::Retry(RetryKind::Throttling);
    }
    if TRANSIENT_STATUS.contains(&status.as_u16())
        || code
            .as_deref()
            .is_some_and(|c| TRANSIENT_ERROR_CODES.contains(&c))
    {
        return ResponseClass::Retry(RetryKind::Transient);
    }
    ResponseClass::Terminal
}

/// Offset between the server's clock and `now`, when `resp` failed because
/// of it.
///
/// Only a clock skew error code with a parseable `Date` header at least
/// [`CLOCK_SKEW_THRESHOLD_SECS`] away from `now` yields an offset.
pub fn clock_skew(resp: &http::Response<Bytes>, now: DateTime) -> Option<TimeDelta> {
    if resp.status().is_success() {
        return None;
    }
    let code = error_code(resp)?;
    if !CLOCK_SKEW_ERROR_CODES.contains(&code.as_str()) {
        return None;
    }
    let server = resp
        .headers()
        .get(http::header::DATE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| chrono::DateTime::parse_from_rfc2822(v).ok())?
        .with_timezone(&Utc);
    let skew = server - now;
    (skew.num_seconds().abs() >= CLOCK_SKEW_THRESHOLD_SECS).then_some(skew)
}

/// Classify an error raised before a response was received.
pub fn classify_error(err: &Error) -> Option<RetryKind> {
    match err.kind() {
        ErrorKind::Transport if err.is_retryable() => Some(RetryKind::Transient),
        _ => None,
    }
}

/// Extract the service error code of a failed response.
///
/// Looked up in the `x-amzn-errortype` header, then a JSON body's `__type` or
/// `code`, then an XML body's `<Code>` element.
pub fn error_code(resp: &http::Response<Bytes>) -> Option<String> {
    if let Some(v) = resp
        .headers()
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
    {
        return Some(sanitize_error_code(v));
    }

    let body = resp.body();
    let start = body.iter().position(|b| !b.is_ascii_whitespace())?;
    match body[start] {
        b'{' => json_error_code(body),
        b'<' => xml_error_code(body),
        _ => None,
    }
}

/// Strip a `namespace#` prefix and a `:uri` suffix from an error code.
fn sanitize_error_code(raw: &str) -> String {
    let code = raw.split(':').next().unwrap_or(raw);
    let code = code.rsplit('#').next().unwrap_or(code);
    code.trim().to_string()
}

#[derive(Deserialize)]
struct JsonError {
    #[serde(rename = "__type")]
    type_: Option<String>,
    #[serde(alias = "Code")]
    code: Option<String>,
}

fn json_error_code(body: &[u8]) -> Option<String> {
    let v: JsonError = serde_json::from_slice(body).ok()?;
    v.type_.or(v.code).map(|c| sanitize_error_code(&c))
}

fn xml_error_code(body: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(body);
    let mut buf = Vec::new();
    let mut in_code = false;
    loop {
        match reader.read_event_into(&mut buf).ok()? {
            Event::Start(e) if e.local_name().as_ref() == b"Code" => in_code = true,
            Event::Text(t) if in_code => {
                return t.unescape().ok().map(|c| c.trim().to_string());
            }
            Event::End(_) => in_code = false,
            Event::Eof => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Build the error reported for a failed response.
pub fn service_error(resp: &http::Response<Bytes>) -> Error {
    let status = resp.status();
    let code = error_code(resp).unwrap_or_else(|| "Unknown".to_string());
    let body = String::from_utf8_lossy(resp.body());
    Error::service(format!(
        "service responded with {status} ({code}): {}",
        body.trim()
    ))
    .with_status(status)
}
