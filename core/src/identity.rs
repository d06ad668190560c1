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

use crate::time::DateTime;
use crate::SigningCredential;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Identity is a type erased credential passed between an auth scheme's
/// resolver and its signer.
///
/// The concrete credential is recovered with [`Identity::data`].
#[derive(Clone)]
pub struct Identity {
    data: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    expires_at: Option<DateTime>,
}

impl Identity {
    /// Wrap a credential.
    pub fn new<C: SigningCredential>(credential: C) -> Self {
        let expires_at = credential.expires_at();
        Self {
            data: Arc::new(credential),
            type_name: std::any::type_name::<C>(),
            expires_at,
        }
    }

    /// Borrow the wrapped credential if it is a `C`.
    pub fn data<C: 'static>(&self) -> Option<&C> {
        self.data.downcast_ref::<C>()
    }

    /// Expiry of the wrapped credential.
    pub fn expires_at(&self) -> Option<DateTime> {
        self.expires_at
    }
}

impl Debug for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // The wrapped credential is never printed.
        f.debug_struct("Identity")
            .field("type", &self.type_name)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
