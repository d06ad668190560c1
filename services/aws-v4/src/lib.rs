//! AWS SigV4 and SigV4a signing for awsign.
//!
//! This crate provides:
//!
//! - [`Credential`]: access key, secret key and optional session token.
//! - [`RequestSigner`]: AWS Signature Version 4.
//! - [`V4aRequestSigner`]: the multi region SigV4a, behind the `sigv4a` feature.
//! - Credential providers: [`StaticCredentialProvider`], [`EnvCredentialProvider`],
//!   [`ProfileCredentialProvider`], [`AssumeRoleCredentialProvider`],
//!   [`AssumeRoleWithWebIdentityCredentialProvider`], [`SsoCredentialProvider`],
//!   [`ProcessCredentialProvider`], [`EcsCredentialProvider`],
//!   [`ImdsCredentialProvider`] and the [`DefaultCredentialProvider`] chain.
//! - [`AuthSchemePreferenceResolver`]: reads the preferred auth schemes from the
//!   client, the environment or the shared config file.
//!
//! ## Example
//!
//! ```no_run
//! use awsign_aws_v4::{DefaultCredentialProvider, RequestSigner};
//! use awsign_core::{Context, OsEnv, Signer, SigningProperties};
//!
//! # async fn example() -> awsign_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let signer = Signer::new(
//!     ctx,
//!     DefaultCredentialProvider::new(),
//!     RequestSigner::new("s3", "us-east-1"),
//! );
//!
//! let req = http::Request::get("https://examplebucket.s3.amazonaws.com/test.txt").body(())?;
//! let (mut parts, _) = req.into_parts();
//! signer
//!     .sign_with(&mut parts, &SigningProperties::s3("us-east-1"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

mod constants;

mod auth_scheme_preference;
pub use auth_scheme_preference::AuthSchemePreferenceResolver;
mod canonical;
mod credential;
pub use credential::Credential;
mod profile;
pub use profile::{ProfileFileKind, ProfileFiles, ProfileSet};
mod provide_credential;
pub use provide_credential::*;
mod sign_request;
pub use sign_request::RequestSigner;
mod sign_request_v4a;
pub use sign_request_v4a::V4aRequestSigner;

/// Whether this build can sign with SigV4a.
pub const fn sigv4a_enabled() -> bool {
    cfg!(feature = "sigv4a")
}
