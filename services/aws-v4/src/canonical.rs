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

//! Canonical request construction shared by SigV4 and SigV4a.

use crate::constants::*;
use awsign_core::time::{format_iso8601, DateTime};
use awsign_core::{Error, Result, SigningProperties, SigningRequest, UNSIGNED_PAYLOAD};
use http::{header, HeaderValue};
use percent_encoding::{percent_decode_str, utf8_percent_encode};
use std::borrow::Cow;
use std::fmt::Write;
use std::time::Duration;

/// Where the signature is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignatureLocation {
    Headers,
    Query(Duration),
}

impl SignatureLocation {
    pub(crate) fn from_properties(props: &SigningProperties) -> Result<Self> {
        match props.expires_in {
            None => Ok(SignatureLocation::Headers),
            Some(d) if d.as_secs() > MAX_PRESIGN_EXPIRES_SECS => Err(Error::request_invalid(
                format!(
                    "presign expiry of {}s exceeds the maximum of {MAX_PRESIGN_EXPIRES_SECS}s",
                    d.as_secs()
                ),
            )),
            Some(d) => Ok(SignatureLocation::Query(d)),
        }
    }
}

pub(crate) fn is_signed_header(name: &str) -> bool {
    !UNSIGNED_HEADERS.contains(&name)
}

/// Normalize header values and make sure `host` is present.
pub(crate) fn prepare_headers(req: &mut SigningRequest) -> Result<()> {
    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in req.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)?;
    }

    if !req.headers.contains_key(header::HOST) {
        let host = HeaderValue::try_from(req.authority.as_str())?;
        req.headers.insert(header::HOST, host);
    }
    Ok(())
}

/// Insert `x-amz-date` and, for session credentials, `x-amz-security-token`.
pub(crate) fn insert_date_and_token(
    req: &mut SigningRequest,
    now: DateTime,
    session_token: Option<&str>,
) -> Result<()> {
    req.header_insert_if_absent(
        header::HeaderName::from_static(X_AMZ_DATE),
        HeaderValue::try_from(format_iso8601(now))?,
    );
    if let Some(token) = session_token {
        let mut value = HeaderValue::try_from(token)?;
        // Set token value sensitive to avoid leaking.
        value.set_sensitive(true);
        req.header_insert_if_absent(header::HeaderName::from_static(X_AMZ_SECURITY_TOKEN), value);
    }
    Ok(())
}

/// Payload hash: `x-amz-content-sha256` header, then the properties, then `UNSIGNED-PAYLOAD`.
pub(crate) fn payload_hash(req: &SigningRequest, props: &SigningProperties) -> Result<String> {
    if let Some(v) = req.headers.get(X_AMZ_CONTENT_SHA_256) {
        return Ok(v.to_str()?.to_string());
    }
    Ok(props
        .payload_hash
        .clone()
        .unwrap_or_else(|| UNSIGNED_PAYLOAD.to_string()))
}

/// Canonical URI of an already percent encoded path.
pub(crate) fn canonical_path(path: &str, props: &SigningProperties) -> Result<String> {
    let path = if props.disable_normalize_path {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(normalize_path(path))
    };

    if props.disable_double_encoding {
        let decoded = percent_decode_str(&path).decode_utf8().map_err(|e| {
            Error::request_invalid(format!("path {path} is not valid utf-8")).with_source(e)
        })?;
        Ok(utf8_percent_encode(&decoded, &AWS_URI_ENCODE_SET).to_string())
    } else {
        Ok(utf8_percent_encode(&path, &AWS_URI_ENCODE_SET).to_string())
    }
}

/// Remove empty, `.` and `..` segments, keeping the leading and trailing slash.
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(path.len());
    for s in segments {
        out.push('/');
        out.push_str(s);
    }
    if out.is_empty() || (path.ends_with('/') && !out.ends_with('/')) {
        out.push('/');
    }
    out
}

/// Encode every query pair and sort them.
pub(crate) fn canonicalize_query(req: &mut SigningRequest) {
    let mut query: Vec<(String, String)> = req
        .query
        .drain(..)
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(&v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();
    query.sort();
    req.query = query;
}

/// Build the canonical request. The query must already be canonicalized.
pub(crate) fn canonical_request_string(
    req: &SigningRequest,
    path: &str,
    signed_headers: &[&str],
    payload_hash: &str,
) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    writeln!(f, "{}", req.method)?;
    writeln!(f, "{path}")?;
    for (i, (k, v)) in req.query.iter().enumerate() {
        if i > 0 {
            f.push('&');
        }
        write!(f, "{k}={v}")?;
    }
    f.push('\n');
    for name in signed_headers {
        writeln!(f, "{name}:{}", req.header_joined(name)?)?;
    }
    f.push('\n');
    writeln!(f, "{}", signed_headers.join(";"))?;
    f.push_str(payload_hash);

    Ok(f)
}

/// StringToSign:
///
/// ```text
/// <algorithm>
/// 20220313T072004Z
/// <scope>
/// <hashed_canonical_request>
/// ```
pub(crate) fn string_to_sign(
    algorithm: &str,
    now: DateTime,
    scope: &str,
    hashed_canonical_request: &str,
) -> String {
    format!(
        "{algorithm}\n{}\n{scope}\n{hashed_canonical_request}",
        format_iso8601(now)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case("/", "/")]
    #[test_case("", "/")]
    #[test_case("/example/./sub/../", "/example/")]
    #[test_case("/a//b", "/a/b")]
    #[test_case("/../foo", "/foo")]
    #[test_case("/foo/bar/..", "/foo")]
    fn test_normalize_path(input: &str, expected: &str) {
        assert_eq!(normalize_path(input), expected);
    }

    #[test_case("/a%20b/c", false, "/a%2520b/c"; "double encoded")]
    #[test_case("/a%20b/c", true, "/a%20b/c"; "single encoded")]
    #[test_case("/a(b)", true, "/a%28b%29"; "reserved characters encoded once")]
    #[test_case("/~user/file.txt", false, "/~user/file.txt"; "unreserved kept")]
    fn test_canonical_path(path: &str, disable_double_encoding: bool, expected: &str) {
        let props = SigningProperties::new().with_disable_double_encoding(disable_double_encoding);
        assert_eq!(canonical_path(path, &props).expect("must succeed"), expected);
    }

    #[test]
    fn test_canonical_path_keeps_dots_when_disabled() {
        let props = SigningProperties::new()
            .with_disable_normalize_path(true)
            .with_disable_double_encoding(true);
        assert_eq!(
            canonical_path("/a/./b/../c", &props).expect("must succeed"),
            "/a/./b/../c"
        );
    }

    #[test]
    fn test_presign_expiry_limit() {
        let props = SigningProperties::new()
            .with_expires_in(Duration::from_secs(MAX_PRESIGN_EXPIRES_SECS + 1));
        let err = SignatureLocation::from_properties(&props).expect_err("must fail");
        assert_eq!(err.kind(), awsign_core::ErrorKind::RequestInvalid);

        let props = SigningProperties::new().with_expires_in(Duration::from_secs(3600));
        assert_eq!(
            SignatureLocation::from_properties(&props).expect("must succeed"),
            SignatureLocation::Query(Duration::from_secs(3600))
        );
    }

    #[test]
    fn test_canonicalize_query_sorts_encoded_pairs() -> Result<()> {
        let mut parts = http::Request::get("https://example.com/?b=2&a=x%20y&A=1&acl")
            .body(())?
            .into_parts()
            .0;
        let mut req = SigningRequest::build(&mut parts)?;
        canonicalize_query(&mut req);
        assert_eq!(
            req.query,
            vec![
                ("A".to_string(), "1".to_string()),
                ("a".to_string(), "x%20y".to_string()),
                ("acl".to_string(), "".to_string()),
                ("b".to_string(), "2".to_string()),
            ]
        );
        Ok(())
    }
}
