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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use federate_core::{Context, Error, ProvideCredential, Result};
use log::{debug, error, warn};

use crate::config::CredentialConfiguration;
use crate::impersonate::ImpersonationClient;
use crate::source::SubjectTokenSource;
use crate::sts::StsTokenExchanger;
use crate::token::AccessToken;

/// Consecutive `invalid_grant` answers after which retrying is pointless.
const INVALID_GRANT_ESCALATION: usize = 2;

/// Loads an [`AccessToken`] through workload identity federation.
///
/// One call fetches a fresh subject token, exchanges it at the security
/// token service and, when configured, impersonates a service account.
#[derive(Debug)]
pub struct ExternalAccountCredentialProvider {
    config: Arc<CredentialConfiguration>,
    source: SubjectTokenSource,
    exchanger: StsTokenExchanger,
    impersonation: Option<ImpersonationClient>,
    step_timeout: Option<Duration>,
    invalid_grants: AtomicUsize,
}

impl ExternalAccountCredentialProvider {
    /// Create a new ExternalAccountCredentialProvider.
    pub fn new(config: CredentialConfiguration) -> Self {
        let source = SubjectTokenSource::from_config(&config);
        let impersonation = ImpersonationClient::from_config(&config);
        Self {
            config: Arc::new(config),
            source,
            exchanger: StsTokenExchanger::new(),
            impersonation,
            step_timeout: None,
            invalid_grants: AtomicUsize::new(0),
        }
    }

    /// Replace the subject token source derived from the configuration.
    pub fn with_subject_token_source(mut self, source: SubjectTokenSource) -> Self {
        self.source = source;
        self
    }

    /// Bound each network step (fetch, exchange, impersonation) separately.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// The configuration this provider exchanges with.
    pub fn config(&self) -> &Arc<CredentialConfiguration> {
        &self.config
    }

    fn track_exchange_failure(&self, err: Error) -> Error {
        if err.oauth_error().as_deref() != Some("invalid_grant") {
            self.invalid_grants.store(0, Ordering::SeqCst);
            return err;
        }

        let n = self.invalid_grants.fetch_add(1, Ordering::SeqCst) + 1;
        if n >= INVALID_GRANT_ESCALATION {
            error!(
                "token exchange rejected the subject token with invalid_grant {n} times in a row, \
                 check the audience and the workload identity provider attribute conditions"
            );
            err.set_retryable(false)
        } else {
            warn!("token exchange rejected the subject token with invalid_grant, will retry");
            err
        }
    }
}

#[async_trait]
impl ProvideCredential for ExternalAccountCredentialProvider {
    type Credential = AccessToken;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let subject_token = self.source.fetch(ctx, self.step_timeout).await?;

        let federated = match self
            .exchanger
            .exchange(ctx, &self.config, &subject_token, self.step_timeout)
            .await
        {
            Ok(token) => {
                self.invalid_grants.store(0, Ordering::SeqCst);
                token
            }
            Err(err) => return Err(self.track_exchange_failure(err)),
        };

        let token: AccessToken = match &self.impersonation {
            Some(client) => client
                .impersonate(ctx, &federated, self.step_timeout)
                .await?
                .into(),
            None => federated.into(),
        };
        debug!(
            "loaded access token {} valid until {}",
            token.prefix(),
            token.expires_at
        );

        Ok(Some(token))
    }
}
