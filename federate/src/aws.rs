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

//! AWS credentials and SigV4 signing
//!
//! Exposed so that callers can resolve AWS credentials their own way and
//! hand them to [`crate::google::SignedRequestSource`].

// Re-export all AWS signing types
pub use federate_aws_v4::*;

#[cfg(feature = "default-context")]
use crate::{default_context, ProvideCredential, Result};

/// Resolve AWS credentials from the environment, then EC2 instance metadata.
///
/// # Example
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> federate::Result<()> {
/// match federate::aws::default_credential().await? {
///     Some(cred) => println!("found AWS credential {cred:?}"),
///     None => println!("no AWS credential in this environment"),
/// }
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "default-context")]
pub async fn default_credential() -> Result<Option<Credential>> {
    DefaultCredentialProvider::new()
        .provide_credential(&default_context())
        .await
}
