//! Bearer token signing for awsign.
//!
//! Services that authenticate with OAuth or OIDC tokens take an
//! `Authorization: Bearer <token>` header instead of a SigV4 signature.
//!
//! - [`Token`]: the bearer token identity.
//! - [`RequestSigner`]: writes the `Authorization` header.
//! - [`StaticTokenProvider`] and [`EnvTokenProvider`]: token sources.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

mod constants;

mod token;
pub use token::Token;
mod sign_request;
pub use sign_request::RequestSigner;
mod provide_credential;
pub use provide_credential::*;
