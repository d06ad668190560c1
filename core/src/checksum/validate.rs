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

use super::{ChecksumAlgorithm, ChecksumStream, DEFAULT_HEADER_PREFIX};
use crate::hash::base64_encode;
use crate::{Error, Result};
use bytes::Bytes;
use futures::{stream, StreamExt};
use log::debug;

const READ_CHUNK: usize = 16 * 1024;

/// Order in which response checksum headers are looked up.
const VALIDATION_ORDER: [ChecksumAlgorithm; 5] = [
    ChecksumAlgorithm::Crc64Nvme,
    ChecksumAlgorithm::Crc32c,
    ChecksumAlgorithm::Crc32,
    ChecksumAlgorithm::Sha1,
    ChecksumAlgorithm::Sha256,
];

/// Outcome of [`validate_response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumValidation {
    /// The body matched the checksum header of this algorithm.
    Validated(ChecksumAlgorithm),
    /// The response carried no checksum we can verify.
    AlgorithmNotFound,
}

/// Verify a response body against its `x-amz-checksum-*` header.
///
/// Only the first algorithm present in the headers is checked. Composite
/// checksums of multipart objects (`<b64>-<parts>`) cannot be recomputed from
/// the body and are skipped.
pub async fn validate_response(resp: &http::Response<Bytes>) -> Result<ChecksumValidation> {
    let Some((algorithm, expected)) = VALIDATION_ORDER.iter().find_map(|a| {
        let v = resp
            .headers()
            .get(a.header_name_with_prefix(DEFAULT_HEADER_PREFIX))?
            .to_str()
            .ok()?;
        Some((*a, v.to_string()))
    }) else {
        return Ok(ChecksumValidation::AlgorithmNotFound);
    };
    if expected.contains('-') {
        debug!("skip validating composite {algorithm} checksum {expected}");
        return Ok(ChecksumValidation::AlgorithmNotFound);
    }

    let body = resp.body();
    let chunks = (0..body.len())
        .step_by(READ_CHUNK)
        .map(|start| Ok(body.slice(start..body.len().min(start + READ_CHUNK))));
    let mut s = ChecksumStream::new(stream::iter(chunks), algorithm);
    while let Some(chunk) = s.next().await {
        chunk?;
    }

    let actual = s.checksum_value().map(|v| base64_encode(&v)).ok_or_else(|| {
        Error::unexpected(format!("{algorithm} checksum of the response was not computed"))
    })?;
    if actual != expected {
        return Err(Error::unexpected(format!(
            "data read has a different checksum than expected. Was {actual}, but expected {expected}"
        ))
        .with_status(resp.status()));
    }
    debug!("validated {algorithm} checksum of {} byte response", body.len());
    Ok(ChecksumValidation::Validated(algorithm))
}
