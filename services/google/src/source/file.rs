use federate_core::{Context, Error, Result};
use log::debug;

use super::SubjectToken;
use crate::config::{FileCredentialSource, SubjectTokenType};

/// Reads the subject token from a local file, for example a projected
/// service account token.
#[derive(Debug, Clone)]
pub struct FileSource {
    source: FileCredentialSource,
    token_type: SubjectTokenType,
}

impl FileSource {
    /// Create a source reading `source`.
    pub fn new(source: FileCredentialSource, token_type: SubjectTokenType) -> Self {
        Self { source, token_type }
    }

    pub(crate) async fn fetch(&self, ctx: &Context) -> Result<SubjectToken> {
        let path = ctx.expand_home_dir(self.source.path()).ok_or_else(|| {
            Error::io("home directory is unknown")
                .with_context(format!("path: {}", self.source.path()))
        })?;
        debug!("loading subject token from file: {path}");

        let content = ctx.file_read(&path).await.map_err(|e| {
            Error::io("failed to read subject token file")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })?;
        let value = self
            .source
            .format()
            .parse(&content)
            .map_err(|e| e.with_context(format!("path: {path}")))?;

        Ok(SubjectToken {
            value,
            token_type: self.token_type,
        })
    }
}
