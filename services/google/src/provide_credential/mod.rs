mod external_account;
pub use external_account::ExternalAccountCredentialProvider;
