//! AWS SigV4 support for federate.
//!
//! This crate resolves ambient AWS credentials (environment variables, then
//! EC2 IMDSv2) and signs requests with AWS Signature Version 4. Google's
//! token exchange accepts such a signed `GetCallerIdentity` request as proof
//! of an AWS identity.
//!
//! ## Example
//!
//! ```no_run
//! use federate_aws_v4::{DefaultCredentialProvider, RequestSigner};
//! use federate_core::{Context, OsEnv, ProvideCredential, SignRequest};
//!
//! # async fn example() -> federate_core::Result<()> {
//! let ctx = Context::new().with_env(OsEnv);
//! let cred = DefaultCredentialProvider::new()
//!     .provide_credential(&ctx)
//!     .await?;
//!
//! let mut parts = http::Request::post(
//!     "https://sts.us-east-1.amazonaws.com?Action=GetCallerIdentity&Version=2011-06-15",
//! )
//! .body(())?
//! .into_parts()
//! .0;
//! RequestSigner::new("sts", "us-east-1")
//!     .sign_request(&ctx, &mut parts, cred.as_ref())
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod constants;
pub use constants::{AWS_DEFAULT_REGION, AWS_REGION};

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::*;

mod sign_request;
pub use sign_request::RequestSigner;
