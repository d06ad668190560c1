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

//! Payload checksums for flexible checksum headers, aws-chunked trailers and
//! response validation.
//!
//! Every [`Checksum`] is owned by one request body. Nothing here is shared
//! between requests or threads.

mod aws_chunked;
pub use aws_chunked::AwsChunkedEncoder;
mod flexible;
pub use flexible::FlexibleChecksummer;
mod stream;
pub use stream::{ChecksumStream, ChecksumSubscriber};
mod validate;
pub use validate::{validate_response, ChecksumValidation};

use crate::hash::base64_encode;
use crate::{Error, Result};
use bytes::Bytes;
use crc::{Crc, Digest as CrcDigest, CRC_32_ISCSI};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// CRC-64/NVME as used by S3.
const CRC_64_NVME: crc::Algorithm<u64> = crc::Algorithm {
    width: 64,
    poly: 0xad93d23594c93659,
    init: 0xffffffffffffffff,
    refin: true,
    refout: true,
    xorout: 0xffffffffffffffff,
    check: 0xae8b14860a799888,
    residue: 0xf310303b2b6f6e42,
};

static CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);
static CRC64NVME: Crc<u64> = Crc::<u64>::new(&CRC_64_NVME);

/// Header prefix used when none is given.
pub const DEFAULT_HEADER_PREFIX: &str = "amz";

/// Supported checksum algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    /// CRC32 (ISO-HDLC).
    Crc32,
    /// CRC32C (Castagnoli).
    Crc32c,
    /// CRC64/NVME.
    Crc64Nvme,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
    /// MD5, only used for `Content-MD5`.
    Md5,
}

impl ChecksumAlgorithm {
    /// Identifier as written on the wire, e.g. `CRC32C`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Crc32 => "CRC32",
            ChecksumAlgorithm::Crc32c => "CRC32C",
            ChecksumAlgorithm::Crc64Nvme => "CRC64NVME",
            ChecksumAlgorithm::Sha1 => "SHA1",
            ChecksumAlgorithm::Sha256 => "SHA256",
            ChecksumAlgorithm::Md5 => "MD5",
        }
    }

    /// `x-amz-checksum-<algorithm>`.
    pub fn header_name(&self) -> String {
        self.header_name_with_prefix(DEFAULT_HEADER_PREFIX)
    }

    /// `x-<prefix>-checksum-<algorithm>`.
    pub fn header_name_with_prefix(&self, prefix: &str) -> String {
        format!("x-{prefix}-checksum-{}", self.as_str().to_ascii_lowercase())
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let algorithm = match s.to_ascii_uppercase().as_str() {
            "CRC32" => ChecksumAlgorithm::Crc32,
            "CRC32C" => ChecksumAlgorithm::Crc32c,
            "CRC64NVME" => ChecksumAlgorithm::Crc64Nvme,
            "SHA1" => ChecksumAlgorithm::Sha1,
            "SHA256" => ChecksumAlgorithm::Sha256,
            "MD5" => ChecksumAlgorithm::Md5,
            _ => {
                return Err(Error::config_invalid(format!(
                    "unknown checksum algorithm: {s}"
                )))
            }
        };
        Ok(algorithm)
    }
}

#[derive(Clone)]
enum State {
    Crc32(crc32fast::Hasher),
    Crc32c(CrcDigest<'static, u32>),
    Crc64Nvme(CrcDigest<'static, u64>),
    Sha1(Sha1),
    Sha256(Sha256),
    Md5(Md5),
}

impl State {
    fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Crc32 => State::Crc32(crc32fast::Hasher::new()),
            ChecksumAlgorithm::Crc32c => State::Crc32c(CRC32C.digest()),
            ChecksumAlgorithm::Crc64Nvme => State::Crc64Nvme(CRC64NVME.digest()),
            ChecksumAlgorithm::Sha1 => State::Sha1(Sha1::new()),
            ChecksumAlgorithm::Sha256 => State::Sha256(Sha256::new()),
            ChecksumAlgorithm::Md5 => State::Md5(Md5::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            State::Crc32(h) => h.update(data),
            State::Crc32c(h) => h.update(data),
            State::Crc64Nvme(h) => h.update(data),
            State::Sha1(h) => Digest::update(h, data),
            State::Sha256(h) => Digest::update(h, data),
            State::Md5(h) => Digest::update(h, data),
        }
    }

    /// Digest of everything seen so far, leaving `self` untouched.
    fn value(&self) -> Vec<u8> {
        match self.clone() {
            State::Crc32(h) => h.finalize().to_be_bytes().to_vec(),
            State::Crc32c(h) => h.finalize().to_be_bytes().to_vec(),
            State::Crc64Nvme(h) => h.finalize().to_be_bytes().to_vec(),
            State::Sha1(h) => h.finalize().to_vec(),
            State::Sha256(h) => h.finalize().to_vec(),
            State::Md5(h) => h.finalize().to_vec(),
        }
    }
}

/// Checksum is a running digest with mark and reset support.
///
/// `reset` rewinds to the last `mark`, or to the empty state when nothing was
/// marked, so a replayed body produces the same value as the first pass.
#[derive(Clone)]
pub struct Checksum {
    algorithm: ChecksumAlgorithm,
    state: State,
    marked: Option<Mark>,
}

#[derive(Clone)]
struct Mark {
    state: State,
    read_limit: usize,
    /// Bytes fed since the mark was taken.
    read: usize,
}

impl Checksum {
    /// Create an empty checksum.
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        Self {
            algorithm,
            state: State::new(algorithm),
            marked: None,
        }
    }

    /// Algorithm of this checksum.
    pub fn algorithm(&self) -> ChecksumAlgorithm {
        self.algorithm
    }

    /// Feed bytes.
    pub fn update(&mut self, data: &[u8]) {
        if let Some(mark) = self.marked.as_mut() {
            mark.read = mark.read.saturating_add(data.len());
        }
        self.state.update(data);
    }

    /// Big-endian digest of everything fed since creation or the last reset.
    ///
    /// Reading the value does not consume the state.
    pub fn checksum_value(&self) -> Bytes {
        Bytes::from(self.state.value())
    }

    /// Base64 of [`Checksum::checksum_value`], the form used in headers.
    pub fn header_value(&self) -> String {
        base64_encode(&self.state.value())
    }

    /// Remember the current state.
    ///
    /// The mark stays valid for at most `read_limit` more bytes, the same
    /// limit the body stream being replayed was marked with.
    pub fn mark(&mut self, read_limit: usize) {
        self.marked = Some(Mark {
            state: self.state.clone(),
            read_limit,
            read: 0,
        });
    }

    /// Rewind to the last mark, or to the empty state.
    ///
    /// Fails when more than `read_limit` bytes were fed since the mark. The
    /// running state is left untouched in that case.
    pub fn reset(&mut self) -> Result<()> {
        match self.marked.as_mut() {
            Some(mark) if mark.read > mark.read_limit => Err(Error::unexpected(format!(
                "checksum mark invalidated: {} bytes read past a limit of {}",
                mark.read, mark.read_limit
            ))),
            Some(mark) => {
                self.state = mark.state.clone();
                mark.read = 0;
                Ok(())
            }
            None => {
                self.state = State::new(self.algorithm);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checksum")
            .field("algorithm", &self.algorithm)
            .field("marked", &self.marked.is_some())
            .finish()
    }
}
