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
use crate::constants::{AWS4_ECDSA_P256_SHA256, X_AMZ_CONTENT_SHA_256, X_AMZ_REGION_SET};
use crate::Credential;
use async_trait::async_trait;
use awsign_core::hash::hex_sha256;
use awsign_core::time::{format_date, format_iso8601};
use awsign_core::{Context, Error, Result, SignRequest, SigningProperties, SigningRequest};
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;

/// RequestSigner that implement AWS SigV4a, the multi region variant of SigV4.
///
/// Requests are signed with an ECDSA P-256 key derived from the secret access
/// key, and are valid in every region of the region set.
///
/// Only available with the `sigv4a` feature; [`V4aRequestSigner::new`] fails
/// with [`awsign_core::ErrorKind::ConfigInvalid`] otherwise.
#[derive(Debug, Clone)]
pub struct V4aRequestSigner {
    service: String,
    region_set: Vec<String>,
}

impl V4aRequestSigner {
    /// Create a new SigV4a signer.
    pub fn new<I, S>(service: &str, region_set: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !cfg!(feature = "sigv4a") {
            return Err(Error::config_invalid("sigv4a support is not enabled"));
        }

        Ok(Self {
            service: service.into(),
            region_set: region_set.into_iter().map(Into::into).collect(),
        })
    }
}

#[async_trait]
impl SignRequest for V4aRequestSigner {
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
        if service.is_empty() {
            return Err(Error::config_invalid(
                "sigv4a signing requires a service name",
            ));
        }
        let region_set = if !props.region_set.is_empty() {
            props.region_set.join(",")
        } else if !self.region_set.is_empty() {
            self.region_set.join(",")
        } else {
            "*".to_string()
        };

        let now = ctx.now();
        let location = SignatureLocation::from_properties(props)?;
        let mut signed_req = SigningRequest::build(req)?;
        prepare_headers(&mut signed_req)?;
        let payload_hash = payload_hash(&signed_req, props)?;

        // Scope: "20220313/<service>/aws4_request", the region set replaces the region.
        let scope = format!("{}/{service}/aws4_request", format_date(now));
        debug!("calculated scope: {scope}, region set: {region_set}");

        match location {
            SignatureLocation::Headers => {
                insert_date_and_token(&mut signed_req, now, cred.session_token.as_deref())?;
                signed_req.header_insert_if_absent(
                    header::HeaderName::from_static(X_AMZ_REGION_SET),
                    HeaderValue::try_from(region_set.as_str())?,
                );
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
                signed_req.query_push("X-Amz-Algorithm", AWS4_ECDSA_P256_SHA256);
                signed_req.query_push(
                    "X-Amz-Credential",
                    format!("{}/{scope}", cred.access_key_id),
                );
                signed_req.query_push("X-Amz-Date", format_iso8601(now));
                signed_req.query_push("X-Amz-Expires", expires_in.as_secs().to_string());
                signed_req.query_push("X-Amz-Region-Set", region_set.as_str());
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

        let string_to_sign = string_to_sign(
            AWS4_ECDSA_P256_SHA256,
            now,
            &scope,
            &hex_sha256(creq.as_bytes()),
        );
        debug!("calculated string to sign: {string_to_sign}");

        let signature = ecdsa::sign(
            &cred.access_key_id,
            &cred.secret_access_key,
            string_to_sign.as_bytes(),
        )?;

        match location {
            SignatureLocation::Query(_) => signed_req.query_push("X-Amz-Signature", signature),
            SignatureLocation::Headers => {
                let mut authorization = HeaderValue::try_from(format!(
                    "{AWS4_ECDSA_P256_SHA256} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                    cred.access_key_id,
                ))?;
                authorization.set_sensitive(true);
                signed_req
                    .headers
                    .insert(header::AUTHORIZATION, authorization);
            }
        }

        signed_req.apply(req)
    }
}

#[cfg(feature = "sigv4a")]
mod ecdsa {
    use crate::constants::AWS4_ECDSA_P256_SHA256;
    use awsign_core::hash::hmac_sha256_parts;
    use awsign_core::{Error, Result};
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::{Signature, SigningKey};
    use p256::elliptic_curve::{Field, PrimeField};
    use p256::{FieldBytes, Scalar};

    /// Derive the P-256 signing key with the NIST SP 800-108 counter mode KDF.
    ///
    /// The HMAC output is used as the private key plus one if it is below
    /// `n - 1`, otherwise the counter is bumped and the derivation repeated.
    pub(super) fn derive_signing_key(access_key_id: &str, secret: &str) -> Result<SigningKey> {
        let key = format!("AWS4A{secret}");
        let iteration = 1i32.to_be_bytes();
        let key_length = 256i32.to_be_bytes();
        for counter in 1..=u8::MAX {
            let counter = [counter];
            let parts: [&[u8]; 6] = [
                &iteration,
                AWS4_ECDSA_P256_SHA256.as_bytes(),
                &[0],
                access_key_id.as_bytes(),
                &counter,
                &key_length,
            ];
            let k0 = hmac_sha256_parts(key.as_bytes(), &parts);

            let Some(scalar) =
                Option::<Scalar>::from(Scalar::from_repr(FieldBytes::clone_from_slice(&k0)))
            else {
                continue;
            };
            let candidate = scalar + Scalar::ONE;
            if bool::from(candidate.is_zero()) {
                continue;
            }
            return SigningKey::from_bytes(&candidate.to_repr()).map_err(|e| {
                Error::unexpected("derived sigv4a key is invalid").with_source(e)
            });
        }

        Err(Error::unexpected("failed to derive a sigv4a signing key"))
    }

    /// Hex of the DER encoded ECDSA signature.
    pub(super) fn sign(access_key_id: &str, secret: &str, content: &[u8]) -> Result<String> {
        let key = derive_signing_key(access_key_id, secret)?;
        let signature: Signature = key.sign(content);
        Ok(hex::encode(signature.to_der().as_bytes()))
    }
}

#[cfg(not(feature = "sigv4a"))]
mod ecdsa {
    use awsign_core::{Error, Result};

    pub(super) fn sign(_: &str, _: &str, _: &[u8]) -> Result<String> {
        Err(Error::config_invalid("sigv4a support is not enabled"))
    }
}
