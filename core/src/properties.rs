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

use std::time::Duration;

/// Payload hash used when the body is not part of the signature.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Payload hash used for aws-chunked bodies with an unsigned trailer.
pub const STREAMING_UNSIGNED_PAYLOAD_TRAILER: &str = "STREAMING-UNSIGNED-PAYLOAD-TRAILER";

/// SigningProperties carries the per operation settings a signer needs.
///
/// Fields left unset fall back to whatever the signer was constructed with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningProperties {
    /// Signing name of the service, e.g. `s3`.
    pub service: Option<String>,
    /// Region used in the credential scope.
    pub region: Option<String>,
    /// Region set for SigV4a, joined with `,` in `x-amz-region-set`.
    pub region_set: Vec<String>,
    /// Skip the second round of path encoding (S3 style).
    pub disable_double_encoding: bool,
    /// Keep `.` and `..` segments in the canonical path.
    pub disable_normalize_path: bool,
    /// Hex SHA256 of the payload, or a sentinel like [`UNSIGNED_PAYLOAD`].
    pub payload_hash: Option<String>,
    /// Also send the payload hash as `x-amz-content-sha256`.
    pub content_sha256_header: bool,
    /// Presign with query parameters instead of an `Authorization` header.
    pub expires_in: Option<Duration>,
}

impl SigningProperties {
    /// Create empty properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signing name.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the signing region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the SigV4a region set.
    pub fn with_region_set<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.region_set = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Disable double URI encoding of the path.
    pub fn with_disable_double_encoding(mut self, v: bool) -> Self {
        self.disable_double_encoding = v;
        self
    }

    /// Disable path normalization.
    pub fn with_disable_normalize_path(mut self, v: bool) -> Self {
        self.disable_normalize_path = v;
        self
    }

    /// Set the payload hash.
    pub fn with_payload_hash(mut self, hash: impl Into<String>) -> Self {
        self.payload_hash = Some(hash.into());
        self
    }

    /// Emit the `x-amz-content-sha256` header.
    pub fn with_content_sha256_header(mut self, v: bool) -> Self {
        self.content_sha256_header = v;
        self
    }

    /// Presign the request for the given duration.
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    /// S3 style properties: no double encoding, no path normalization and the
    /// payload hash sent as a header.
    pub fn s3(region: impl Into<String>) -> Self {
        Self::new()
            .with_service("s3")
            .with_region(region)
            .with_disable_double_encoding(true)
            .with_disable_normalize_path(true)
            .with_content_sha256_header(true)
    }
}
