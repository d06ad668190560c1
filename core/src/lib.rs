//! Core components for signing and executing AWS API requests.
//!
//! This crate holds everything that is independent of a particular auth scheme:
//!
//! - **Context**: file reading, HTTP sending, command execution, environment access
//!   and the clock, as pluggable implementations.
//! - **Traits**: [`ProvideCredential`] resolves identities, [`SignRequest`] signs
//!   requests with them.
//! - **Resolver combinators**: chain, lazy and cached providers in
//!   [`provide_credential`].
//! - **Checksums**: the flexible checksum engine in [`checksum`].
//! - **Auth schemes**: selection between signing schemes in [`auth_scheme`].
//! - **Orchestrator**: drives one call through scheme selection, identity
//!   resolution, signing, transmission and retries.
//!
//! ## Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use awsign_core::auth_scheme::{
//!     AuthSchemeId, AuthSchemeOption, AuthSchemeRegistry, HttpAuthScheme,
//! };
//! use awsign_core::{
//!     Context, Operation, Orchestrator, ProvideCredential, Result, SignRequest,
//!     SigningCredential, SigningProperties,
//! };
//! use bytes::Bytes;
//!
//! #[derive(Clone, Debug)]
//! struct Key(String);
//!
//! impl SigningCredential for Key {
//!     fn is_valid(&self) -> bool {
//!         !self.0.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct KeyProvider;
//!
//! #[async_trait]
//! impl ProvideCredential for KeyProvider {
//!     type Credential = Key;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Key>> {
//!         Ok(Some(Key("my-key".to_string())))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct KeySigner;
//!
//! #[async_trait]
//! impl SignRequest for KeySigner {
//!     type Credential = Key;
//!
//!     async fn sign_request(
//!         &self,
//!         _: &Context,
//!         req: &mut http::request::Parts,
//!         key: Option<&Key>,
//!         _: &SigningProperties,
//!     ) -> Result<()> {
//!         if let Some(key) = key {
//!             req.headers.insert("x-my-key", key.0.parse()?);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let registry = AuthSchemeRegistry::new().register(HttpAuthScheme::new(
//!     AuthSchemeId::new("my.auth#key"),
//!     KeyProvider,
//!     KeySigner,
//! ));
//! let orchestrator = Orchestrator::new(ctx, registry);
//!
//! let req = http::Request::get("https://example.com").body(Bytes::new())?;
//! let op = Operation::new(
//!     req,
//!     vec![AuthSchemeOption::new(
//!         AuthSchemeId::new("my.auth#key"),
//!         SigningProperties::default(),
//!     )],
//! );
//! let resp = orchestrator.execute(op).await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod auth_scheme;
pub mod checksum;
pub mod classify;
pub mod hash;
pub mod provide_credential;
pub mod retry;
pub mod time;
pub mod utils;

mod command;
pub use command::{CommandExecute, CommandOutput, NoopCommandExecute};
mod context;
pub use context::Context;
mod fs;
pub use fs::{FileRead, NoopFileRead};
mod http;
pub use http::{HttpSend, NoopHttpSend};
mod env;
pub use env::{Env, NoopEnv, OsEnv, StaticEnv};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod error;
pub use error::{Error, ErrorKind, Result};
mod identity;
pub use identity::Identity;
mod properties;
pub use properties::{SigningProperties, STREAMING_UNSIGNED_PAYLOAD_TRAILER, UNSIGNED_PAYLOAD};
mod request;
pub use request::SigningRequest;
mod signer;
pub use signer::Signer;
mod orchestrator;
pub use orchestrator::{Operation, Orchestrator, PayloadSigning};
pub use retry::{RetryContext, RetryPolicy};
