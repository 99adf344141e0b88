//! The static document served for plain GET requests.

use std::path::Path;
use std::sync::Arc;

use snafu::ResultExt;

use super::ReadBootstrapSnafu;
use super::ServerError;

const BUILTIN: &str = include_str!("../../static/index.html");

/// HTML returned for every GET. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BootstrapDocument {
    html: Arc<str>,
}

impl BootstrapDocument {
    /// The console page compiled into the binary.
    pub fn builtin() -> Self {
        Self { html: Arc::from(BUILTIN) }
    }

    /// Load the document from disk once, at startup.
    pub fn from_file(path: &Path) -> Result<Self, ServerError> {
        let html = std::fs::read_to_string(path).context(ReadBootstrapSnafu { path })?;
        Ok(Self { html: Arc::from(html) })
    }

    /// Use `path` when given, otherwise the built-in page.
    pub fn load(path: Option<&Path>) -> Result<Self, ServerError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }
}

impl Default for BootstrapDocument {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_builtin_is_html() {
        let doc = BootstrapDocument::builtin();
        assert!(doc.as_str().contains("<html"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<p>custom</p>").unwrap();

        let doc = BootstrapDocument::load(Some(file.path())).unwrap();
        assert_eq!(doc.as_str(), "<p>custom</p>");
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = BootstrapDocument::load(Some(Path::new("/nonexistent/index.html"))).unwrap_err();
        assert!(matches!(err, ServerError::ReadBootstrap { .. }));
    }
}
