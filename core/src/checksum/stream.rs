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

use super::{Checksum, ChecksumAlgorithm};
use crate::Result;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// ChecksumSubscriber folds chunks pushed by a publisher into one checksum per algorithm.
#[derive(Debug, Clone)]
pub struct ChecksumSubscriber {
    checksums: Vec<Checksum>,
    completed: bool,
}

impl ChecksumSubscriber {
    /// Subscribe with the given algorithms.
    pub fn new(algorithms: &[ChecksumAlgorithm]) -> Self {
        Self {
            checksums: algorithms.iter().map(|a| Checksum::new(*a)).collect(),
            completed: false,
        }
    }

    /// Consume the next chunk.
    pub fn on_next(&mut self, chunk: &[u8]) {
        debug_assert!(!self.completed, "chunk delivered after completion");
        for c in self.checksums.iter_mut() {
            c.update(chunk);
        }
    }

    /// Mark the publisher as finished and return `(algorithm, digest)` pairs.
    pub fn on_complete(&mut self) -> Vec<(ChecksumAlgorithm, Bytes)> {
        self.completed = true;
        self.checksums
            .iter()
            .map(|c| (c.algorithm(), c.checksum_value()))
            .collect()
    }

    /// Whether [`ChecksumSubscriber::on_complete`] has been called.
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

/// ChecksumStream computes a checksum over a body stream as it is polled.
///
/// The value is available once the inner stream has been drained. Errors from
/// the inner stream are passed through and leave the value unset.
#[derive(Debug)]
pub struct ChecksumStream<S> {
    inner: S,
    checksum: Checksum,
    value: Option<Bytes>,
}

impl<S> ChecksumStream<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    /// Wrap a stream.
    pub fn new(inner: S, algorithm: ChecksumAlgorithm) -> Self {
        Self {
            inner,
            checksum: Checksum::new(algorithm),
            value: None,
        }
    }

    /// Final digest, `None` until the stream is exhausted.
    pub fn checksum_value(&self) -> Option<Bytes> {
        self.value.clone()
    }
}

impl<S> Stream for ChecksumStream<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.checksum.update(&chunk);
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                if this.value.is_none() {
                    this.value = Some(this.checksum.checksum_value());
                }
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
