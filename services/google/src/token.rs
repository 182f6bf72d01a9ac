use std::fmt::{self, Debug};
use std::time::Duration;

use chrono::TimeDelta;
use federate_core::time::DateTime;
use federate_core::utils::{secret_prefix, Redact};
use federate_core::SigningCredential;

use crate::constants::MIN_EXPIRY_MARGIN;

/// Number of leading characters [`AccessToken::prefix`] reveals.
const PREFIX_LEN: usize = 8;

/// Token returned by the security token service.
#[derive(Clone)]
pub struct FederatedToken {
    /// The bearer token.
    pub access_token: String,
    /// When the token stops being used, already reduced by the safety margin.
    pub expires_at: DateTime,
    /// Scopes requested for this token.
    pub scopes: Vec<String>,
}

impl Debug for FederatedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedToken")
            .field("access_token", &Redact::from(&self.access_token))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Token issued for a service account on behalf of a federated identity.
#[derive(Clone)]
pub struct ImpersonatedToken {
    /// The bearer token.
    pub access_token: String,
    /// When the token stops being used, already reduced by the safety margin.
    pub expires_at: DateTime,
    /// Scopes granted to this token.
    pub scopes: Vec<String>,
    /// Email of the impersonated service account.
    pub service_account: String,
}

impl Debug for ImpersonatedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpersonatedToken")
            .field("access_token", &Redact::from(&self.access_token))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("service_account", &self.service_account)
            .finish()
    }
}

/// Where an [`AccessToken`] came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provenance {
    /// Issued directly by the token exchange.
    Federated,
    /// Issued by impersonating the given service account.
    Impersonated {
        /// Email of the impersonated service account.
        service_account: String,
    },
}

/// The client-facing token handed out by [`crate::CredentialProvider`].
#[derive(Clone)]
pub struct AccessToken {
    /// The bearer token.
    pub token: String,
    /// When the token stops being used, already reduced by the safety margin.
    pub expires_at: DateTime,
    /// Scopes of this token.
    pub scopes: Vec<String>,
    /// How the token was obtained.
    pub provenance: Provenance,
}

impl AccessToken {
    /// A short prefix of the token that is safe to log.
    pub fn prefix(&self) -> String {
        secret_prefix(&self.token, PREFIX_LEN)
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &Redact::from(&self.token))
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("provenance", &self.provenance)
            .finish()
    }
}

impl SigningCredential for AccessToken {
    fn is_valid(&self, now: DateTime) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }
}

impl From<FederatedToken> for AccessToken {
    fn from(token: FederatedToken) -> Self {
        Self {
            token: token.access_token,
            expires_at: token.expires_at,
            scopes: token.scopes,
            provenance: Provenance::Federated,
        }
    }
}

impl From<ImpersonatedToken> for AccessToken {
    fn from(token: ImpersonatedToken) -> Self {
        Self {
            token: token.access_token,
            expires_at: token.expires_at,
            scopes: token.scopes,
            provenance: Provenance::Impersonated {
                service_account: token.service_account,
            },
        }
    }
}

/// Safety margin for a token living `lifetime`: `max(30s, lifetime / 10)`.
pub(crate) fn expiry_margin(lifetime: Duration) -> Duration {
    (lifetime / 10).max(MIN_EXPIRY_MARGIN)
}

/// `now + lifetime - margin`.
///
/// The result may lie in the past for very short lifetimes; such tokens are
/// never valid.
pub(crate) fn expiry_with_margin(now: DateTime, lifetime: Duration) -> DateTime {
    TimeDelta::from_std(lifetime)
        .ok()
        .zip(TimeDelta::from_std(expiry_margin(lifetime)).ok())
        .and_then(|(lifetime, margin)| now.checked_add_signed(lifetime - margin))
        .unwrap_or(now)
}
