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

use super::{ChecksumAlgorithm, ChecksumSubscriber};
use crate::hash::base64_encode;
use crate::properties::STREAMING_UNSIGNED_PAYLOAD_TRAILER;
use crate::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use http::header::{HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH};

/// Default size of one aws-chunked data chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const CRLF: &[u8] = b"\r\n";

/// AwsChunkedEncoder frames a payload as `aws-chunked` with an unsigned
/// trailing checksum.
///
/// ```text
/// <hex len>\r\n<data>\r\n ... 0\r\n<checksum header>:<base64>\r\n\r\n
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AwsChunkedEncoder {
    algorithm: ChecksumAlgorithm,
    chunk_size: usize,
}

impl AwsChunkedEncoder {
    /// Encoder for the given trailer checksum.
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self {
            algorithm,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the chunk size. Zero is rejected.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config_invalid("aws-chunked chunk size must be positive"));
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    /// Encode `body` and set the headers describing the encoding.
    ///
    /// The returned bytes replace the request body.
    pub fn encode(&self, parts: &mut http::request::Parts, body: &[u8]) -> Result<Bytes> {
        let trailer = self.algorithm.header_name();
        let mut checksum = ChecksumSubscriber::new(&[self.algorithm]);
        let mut out = BytesMut::with_capacity(self.encoded_len(body.len(), &trailer));

        for chunk in body.chunks(self.chunk_size) {
            checksum.on_next(chunk);
            out.put_slice(format!("{:x}", chunk.len()).as_bytes());
            out.put_slice(CRLF);
            out.put_slice(chunk);
            out.put_slice(CRLF);
        }
        let value = checksum
            .on_complete()
            .pop()
            .map(|(_, v)| base64_encode(&v))
            .unwrap_or_default();
        out.put_slice(b"0");
        out.put_slice(CRLF);
        out.put_slice(trailer.as_bytes());
        out.put_u8(b':');
        out.put_slice(value.as_bytes());
        out.put_slice(CRLF);
        out.put_slice(CRLF);

        let headers = &mut parts.headers;
        headers.append(CONTENT_ENCODING, HeaderValue::from_static("aws-chunked"));
        headers.insert(
            "x-amz-decoded-content-length",
            HeaderValue::from(body.len() as u64),
        );
        headers.insert("x-amz-trailer", HeaderValue::try_from(trailer)?);
        headers.insert(
            "x-amz-content-sha256",
            HeaderValue::from_static(STREAMING_UNSIGNED_PAYLOAD_TRAILER),
        );
        headers.insert(CONTENT_LENGTH, HeaderValue::from(out.len() as u64));

        Ok(out.freeze())
    }

    fn encoded_len(&self, body_len: usize, trailer: &str) -> usize {
        let full = body_len / self.chunk_size;
        let rest = body_len % self.chunk_size;
        let frame = |n: usize| format!("{n:x}").len() + 2 * CRLF.len() + n;

        let mut len = full * frame(self.chunk_size);
        if rest > 0 {
            len += frame(rest);
        }
        // "0\r\n" + "<name>:<b64>\r\n" + "\r\n"
        let b64 = self.algorithm_b64_len();
        len + 1 + CRLF.len() + trailer.len() + 1 + b64 + 2 * CRLF.len()
    }

    fn algorithm_b64_len(&self) -> usize {
        let raw: usize = match self.algorithm {
            ChecksumAlgorithm::Crc32 | ChecksumAlgorithm::Crc32c => 4,
            ChecksumAlgorithm::Crc64Nvme => 8,
            ChecksumAlgorithm::Sha1 => 20,
            ChecksumAlgorithm::Sha256 => 32,
            ChecksumAlgorithm::Md5 => 16,
        };
        raw.div_ceil(3) * 4
    }
}
