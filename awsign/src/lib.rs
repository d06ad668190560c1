//! Sign and execute AWS API requests without effort.
//!
//! `awsign` bundles the scheme crates behind features and adds defaults that
//! suit most applications:
//!
//! - [`default_context`]: tokio file reading and process execution, reqwest
//!   transport and the OS environment.
//! - [`aws::default_signer`]: a SigV4 signer backed by the process-wide default
//!   credential provider.
//! - [`default_registry`] and [`default_orchestrator`]: SigV4, SigV4a and bearer
//!   schemes wired for one service.
//!
//! ## Example
//!
//! ```no_run
//! use awsign::auth_scheme::{AuthSchemeId, AuthSchemeOption};
//! use awsign::{default_orchestrator, Operation, SigningProperties};
//! use bytes::Bytes;
//!
//! # async fn example() -> awsign::Result<()> {
//! let orchestrator = default_orchestrator("execute-api", "us-east-1");
//!
//! let req = http::Request::get("https://abc.execute-api.us-east-1.amazonaws.com/prod/items")
//!     .body(Bytes::new())?;
//! let op = Operation::new(
//!     req,
//!     vec![AuthSchemeOption::new(AuthSchemeId::SIGV4, SigningProperties::new())],
//! );
//! let resp = orchestrator.execute(op).await?;
//! println!("{}", resp.status());
//!
//! // Release the process-wide credential provider before exiting.
//! awsign::aws::shutdown().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use awsign_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::{default_context, default_context_with_client};

mod shared;
pub use shared::SharedCredentialProvider;

#[cfg(feature = "aws")]
pub mod aws;

#[cfg(feature = "bearer")]
pub mod bearer {
    pub use awsign_bearer::*;
}

#[cfg(feature = "aws")]
mod registry;
#[cfg(all(feature = "aws", feature = "default-context"))]
pub use registry::default_orchestrator;
#[cfg(feature = "aws")]
pub use registry::default_registry;
