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

use crate::canonical::{
    canonical_path, canonical_request_string, canonicalize_query, insert_date_and_token,
    is_signed_header, payload_hash, prepare_headers, string_to_sign, SignatureLocation,
};
use crate::constants::{AWS4_HMAC_SHA256, X_AMZ_CONTENT_SHA_256};
use crate::Credential;
use async_trait::async_trait;
use awsign_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use awsign_core::time::{format_date, format_iso8601, DateTime};
use awsign_core::{Context, Error, Result, SignRequest, SigningProperties, SigningRequest};
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;

/// RequestSigner that implement AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
///
/// `service` and `region` are defaults; [`SigningProperties::service`] and
/// [`SigningProperties::region`] override them per request.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: String,
}

impl RequestSigner {
    /// Create a new builder for AWS V4 signer.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),
        }
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut Parts,
        credential: Option<&Self::Credential>,
        props: &SigningProperties,
    ) -> Result<()> {
        let Some(cred) = credential else {
            debug!("no credential provided, leaving request unsigned");
            return Ok(());
        };

        let service = props.service.as_deref().unwrap_or(&self.service);
        let region = props.region.as_deref().unwrap_or(&self.region);
        if service.is_empty() || region.is_empty() {
            return Err(Error::config_invalid(
                "sigv4 signing requires both a service name and a region",
            ));
        }

        let now = ctx.now();
        let location = SignatureLocation::from_properties(props)?;
        let mut signed_req = SigningRequest::build(req)?;
        prepare_headers(&mut signed_req)?;
        let payload_hash = payload_hash(&signed_req, props)?;

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!("{}/{region}/{service}/aws4_request", format_date(now));
        debug!("calculated scope: {scope}");

        match location {
            SignatureLocation::Headers => {
                insert_date_and_token(&mut signed_req, now, cred.session_token.as_deref())?;
                if props.content_sha256_header {
                    signed_req.header_insert_if_absent(
                        header::HeaderName::from_static(X_AMZ_CONTENT_SHA_256),
                        HeaderValue::try_from(payload_hash.as_str())?,
                    );
                }
            }
            SignatureLocation::Query(expires_in) => {
                let signed_headers = signed_req
                    .header_name_to_vec_sorted(is_signed_header)
                    .join(";");
                signed_req.query_push("X-Amz-Algorithm", AWS4_HMAC_SHA256);
                signed_req.query_push(
                    "X-Amz-Credential",
                    format!("{}/{scope}", cred.access_key_id),
                );
                signed_req.query_push("X-Amz-Date", format_iso8601(now));
                signed_req.query_push("X-Amz-Expires", expires_in.as_secs().to_string());
                signed_req.query_push("X-Amz-SignedHeaders", signed_headers);
                if let Some(token) = &cred.session_token {
                    signed_req.query_push("X-Amz-Security-Token", token);
                }
            }
        }

        canonicalize_query(&mut signed_req);
        let path = canonical_path(&signed_req.path, props)?;
        let signed_headers = signed_req.header_name_to_vec_sorted(is_signed_header).join(";");
        let creq = {
            let names: Vec<&str> = signed_headers.split(';').collect();
            canonical_request_string(&signed_req, &path, &names, &payload_hash)?
        };

        let string_to_sign =
            string_to_sign(AWS4_HMAC_SHA256, now, &scope, &hex_sha256(creq.as_bytes()));
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key = generate_signing_key(&cred.secret_access_key, now, region, service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        match location {
            SignatureLocation::Query(_) => signed_req.query_push("X-Amz-Signature", signature),
            SignatureLocation::Headers => {
                let mut authorization = HeaderValue::try_from(format!(
                    "{AWS4_HMAC_SHA256} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                    cred.access_key_id,
                ))?;
                authorization.set_sensitive(true);
                signed_req
                    .headers
                    .insert(header::AUTHORIZATION, authorization);
            }
        }

        // Apply to the request.
        signed_req.apply(req)
    }
}

/// Signing key: HMAC chain over date, region, service and `aws4_request`.
pub(crate) fn generate_signing_key(
    secret: &str,
    time: DateTime,
    region: &str,
    service: &str,
) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
