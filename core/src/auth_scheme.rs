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

//! Auth scheme selection.
//!
//! An operation lists the [`AuthSchemeOption`]s it accepts, in the service's
//! order. The [`AuthSchemeRegistry`] reorders them by the user's
//! [`AuthSchemePreference`] and picks the first one it has a scheme for.

use crate::{
    Context, Error, Identity, ProvideCredential, Result, SignRequest, SigningCredential,
    SigningProperties,
};
use async_trait::async_trait;
use log::{debug, warn};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display, Write};
use std::sync::Arc;

/// Identifier of an auth scheme, e.g. `aws.auth#sigv4`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthSchemeId(Cow<'static, str>);

impl AuthSchemeId {
    /// AWS Signature Version 4.
    pub const SIGV4: AuthSchemeId = AuthSchemeId(Cow::Borrowed("aws.auth#sigv4"));
    /// AWS Signature Version 4a.
    pub const SIGV4A: AuthSchemeId = AuthSchemeId(Cow::Borrowed("aws.auth#sigv4a"));
    /// HTTP bearer token.
    pub const BEARER: AuthSchemeId = AuthSchemeId(Cow::Borrowed("smithy.api#httpBearerAuth"));
    /// Anonymous requests.
    pub const NO_AUTH: AuthSchemeId = AuthSchemeId(Cow::Borrowed("smithy.api#noAuth"));

    /// Create an id from a string.
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    /// Full id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after `#`, or the full id when there is none.
    pub fn short_name(&self) -> &str {
        match self.0.rsplit_once('#') {
            Some((_, name)) => name,
            None => &self.0,
        }
    }

    /// Whether a preference entry names this scheme.
    ///
    /// Entries match the full id or the short name, ignoring ASCII case.
    /// `bearer` is accepted for [`AuthSchemeId::BEARER`].
    pub fn matches(&self, entry: &str) -> bool {
        entry.eq_ignore_ascii_case(self.as_str())
            || entry.eq_ignore_ascii_case(self.short_name())
            || (*self == Self::BEARER && entry.eq_ignore_ascii_case("bearer"))
    }
}

impl Display for AuthSchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One acceptable way to authenticate an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSchemeOption {
    /// Scheme this option refers to.
    pub scheme_id: AuthSchemeId,
    /// Signing properties the scheme's signer receives.
    pub properties: SigningProperties,
}

impl AuthSchemeOption {
    /// Create an option.
    pub fn new(scheme_id: AuthSchemeId, properties: SigningProperties) -> Self {
        Self {
            scheme_id,
            properties,
        }
    }

    /// Option for anonymous requests.
    pub fn no_auth() -> Self {
        Self::new(AuthSchemeId::NO_AUTH, SigningProperties::default())
    }
}

/// Ordered list of preferred scheme names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSchemePreference(Vec<String>);

impl AuthSchemePreference {
    /// Parse a comma separated list such as `"sigv4a, sigv4"`.
    ///
    /// Whitespace around entries is stripped and empty entries are dropped.
    pub fn parse(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Whether no preference is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in order.
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Reorder `options`: options named by the preference come first, in
    /// preference order; the rest keep their original order.
    ///
    /// Entries that match no option are ignored.
    pub fn apply(&self, options: &[AuthSchemeOption]) -> Vec<AuthSchemeOption> {
        let mut taken = vec![false; options.len()];
        let mut ordered = Vec::with_capacity(options.len());

        for entry in &self.0 {
            for (i, option) in options.iter().enumerate() {
                if !taken[i] && option.scheme_id.matches(entry) {
                    taken[i] = true;
                    ordered.push(option.clone());
                }
            }
        }
        for (i, option) in options.iter().enumerate() {
            if !taken[i] {
                ordered.push(option.clone());
            }
        }
        ordered
    }
}

impl<S: Into<String>> FromIterator<S> for AuthSchemePreference {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// AuthScheme pairs an identity resolver with a signer.
#[async_trait]
pub trait AuthScheme: Debug + Send + Sync + 'static {
    /// Id of this scheme.
    fn scheme_id(&self) -> AuthSchemeId;

    /// Resolve the identity used to sign with this scheme.
    async fn resolve_identity(&self, ctx: &Context) -> Result<Option<Identity>>;

    /// Sign the request.
    async fn sign(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        identity: Option<&Identity>,
        properties: &SigningProperties,
    ) -> Result<()>;

    /// Release the resolver's resources.
    async fn close(&self) {}
}

/// HttpAuthScheme adapts a typed credential provider and signer to [`AuthScheme`].
pub struct HttpAuthScheme<C> {
    id: AuthSchemeId,
    provider: Arc<dyn ProvideCredential<Credential = C>>,
    signer: Arc<dyn SignRequest<Credential = C>>,
}

impl<C: SigningCredential> HttpAuthScheme<C> {
    /// Create a scheme.
    pub fn new(
        id: AuthSchemeId,
        provider: impl ProvideCredential<Credential = C>,
        signer: impl SignRequest<Credential = C>,
    ) -> Self {
        Self {
            id,
            provider: Arc::new(provider),
            signer: Arc::new(signer),
        }
    }
}

impl<C> Debug for HttpAuthScheme<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpAuthScheme")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("signer", &self.signer)
            .finish()
    }
}

#[async_trait]
impl<C: SigningCredential> AuthScheme for HttpAuthScheme<C> {
    fn scheme_id(&self) -> AuthSchemeId {
        self.id.clone()
    }

    async fn resolve_identity(&self, ctx: &Context) -> Result<Option<Identity>> {
        Ok(self
            .provider
            .provide_credential(ctx)
            .await?
            .map(Identity::new))
    }

    async fn sign(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        identity: Option<&Identity>,
        properties: &SigningProperties,
    ) -> Result<()> {
        let credential = match identity {
            None => None,
            Some(identity) => Some(identity.data::<C>().ok_or_else(|| {
                Error::unexpected(format!(
                    "identity {identity:?} cannot be used by auth scheme {}",
                    self.id
                ))
            })?),
        };
        self.signer
            .sign_request(ctx, req, credential, properties)
            .await
    }

    async fn close(&self) {
        self.provider.close().await;
    }
}

/// NoAuthScheme leaves requests unsigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthScheme;

#[async_trait]
impl AuthScheme for NoAuthScheme {
    fn scheme_id(&self) -> AuthSchemeId {
        AuthSchemeId::NO_AUTH
    }

    async fn resolve_identity(&self, _: &Context) -> Result<Option<Identity>> {
        Ok(None)
    }

    async fn sign(
        &self,
        _: &Context,
        _: &mut http::request::Parts,
        _: Option<&Identity>,
        _: &SigningProperties,
    ) -> Result<()> {
        Ok(())
    }
}

/// The scheme picked for an operation together with the option that chose it.
#[derive(Debug, Clone)]
pub struct SelectedScheme {
    /// Scheme to resolve identities and sign with.
    pub scheme: Arc<dyn AuthScheme>,
    /// Option the scheme was selected for.
    pub option: AuthSchemeOption,
}

/// AuthSchemeRegistry holds the schemes a client can use.
///
/// [`NoAuthScheme`] is always registered.
#[derive(Debug, Clone)]
pub struct AuthSchemeRegistry {
    schemes: HashMap<AuthSchemeId, Arc<dyn AuthScheme>>,
}

impl Default for AuthSchemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSchemeRegistry {
    /// Registry with only [`NoAuthScheme`].
    pub fn new() -> Self {
        let mut schemes: HashMap<AuthSchemeId, Arc<dyn AuthScheme>> = HashMap::new();
        schemes.insert(AuthSchemeId::NO_AUTH, Arc::new(NoAuthScheme));
        Self { schemes }
    }

    /// Register a scheme, replacing any scheme with the same id.
    pub fn register(mut self, scheme: impl AuthScheme) -> Self {
        self.schemes.insert(scheme.scheme_id(), Arc::new(scheme));
        self
    }

    /// Register a scheme whose construction may have failed.
    ///
    /// A failed construction is logged and the scheme stays unregistered, so
    /// selection falls through to the next acceptable option.
    pub fn register_fallible<S: AuthScheme>(self, id: AuthSchemeId, scheme: Result<S>) -> Self {
        match scheme {
            Ok(scheme) => self.register(scheme),
            Err(err) => {
                warn!("auth scheme {id} is unavailable and will be skipped: {err}");
                self
            }
        }
    }

    /// Whether a scheme with this id is registered.
    pub fn contains(&self, id: &AuthSchemeId) -> bool {
        self.schemes.contains_key(id)
    }

    /// Pick the scheme for an operation.
    pub fn select(
        &self,
        options: &[AuthSchemeOption],
        preference: &AuthSchemePreference,
    ) -> Result<SelectedScheme> {
        let ordered = preference.apply(options);
        let mut rejected = Vec::with_capacity(ordered.len());

        for option in ordered {
            match self.schemes.get(&option.scheme_id) {
                Some(scheme) => {
                    debug!("selected auth scheme {}", option.scheme_id);
                    return Ok(SelectedScheme {
                        scheme: scheme.clone(),
                        option,
                    });
                }
                None => {
                    debug!("auth scheme {} is not registered, skipping", option.scheme_id);
                    rejected.push(format!("{}: not registered", option.scheme_id));
                }
            }
        }

        let mut msg = String::from("no auth scheme could be resolved");
        if rejected.is_empty() {
            msg.push_str("; the operation lists no auth scheme options");
        }
        for r in rejected {
            write!(msg, "; {r}")?;
        }
        Err(Error::config_invalid(msg))
    }

    /// Close every registered scheme.
    pub async fn close(&self) {
        for scheme in self.schemes.values() {
            scheme.close().await;
        }
    }
}
