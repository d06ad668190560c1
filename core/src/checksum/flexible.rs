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

use super::{Checksum, ChecksumAlgorithm, DEFAULT_HEADER_PREFIX};
use crate::Result;
use http::header::{HeaderName, HeaderValue};
use log::debug;

const READ_CHUNK: usize = 16 * 1024;

const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

/// FlexibleChecksummer adds `x-amz-checksum-*` headers to a request before it is signed.
///
/// The body is read once and every requested checksum is fed from that pass.
/// Headers the caller already set are left alone.
#[derive(Debug, Clone, Default)]
pub struct FlexibleChecksummer {
    algorithms: Vec<ChecksumAlgorithm>,
    content_md5: bool,
    prefix: Option<String>,
}

impl FlexibleChecksummer {
    /// Compute the given algorithms.
    pub fn new(algorithms: impl IntoIterator<Item = ChecksumAlgorithm>) -> Self {
        let mut deduped = Vec::new();
        for a in algorithms {
            if !deduped.contains(&a) {
                deduped.push(a);
            }
        }
        Self {
            algorithms: deduped,
            ..Default::default()
        }
    }

    /// Also add `Content-MD5`, for operations that still require it.
    pub fn with_content_md5(mut self) -> Self {
        self.content_md5 = true;
        self
    }

    /// Use `x-<prefix>-checksum-*` instead of `x-amz-checksum-*`.
    pub fn with_header_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Whether there is anything to compute.
    pub fn is_empty(&self) -> bool {
        self.algorithms.is_empty() && !self.content_md5
    }

    /// Compute the checksums over `body` and insert their headers.
    pub fn apply(&self, parts: &mut http::request::Parts, body: &[u8]) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }

        let prefix = self.prefix.as_deref().unwrap_or(DEFAULT_HEADER_PREFIX);
        let mut pending: Vec<(HeaderName, Checksum)> =
            Vec::with_capacity(self.algorithms.len() + 1);
        for algorithm in &self.algorithms {
            let name = HeaderName::try_from(algorithm.header_name_with_prefix(prefix))?;
            if parts.headers.contains_key(&name) {
                debug!("checksum header {name} supplied by caller, keeping it");
                continue;
            }
            pending.push((name, Checksum::new(*algorithm)));
        }
        if self.content_md5 && !parts.headers.contains_key(CONTENT_MD5) {
            pending.push((CONTENT_MD5, Checksum::new(ChecksumAlgorithm::Md5)));
        }

        for chunk in body.chunks(READ_CHUNK) {
            for (_, c) in pending.iter_mut() {
                c.update(chunk);
            }
        }

        for (name, c) in pending {
            let value = HeaderValue::try_from(c.header_value())?;
            debug!("computed {} checksum for {} byte body", c.algorithm(), body.len());
            parts.headers.insert(name, value);
        }
        Ok(())
    }
}
