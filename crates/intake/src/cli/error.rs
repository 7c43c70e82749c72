//! CLI errors that end in commands worth trying

use crate::cli::output::display_id;
use intake::IntakeError;
use std::fmt;
use std::path::Path;

/// A user-facing failure: what broke, where, and commands worth trying
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    /// Rendered as `TRY: ...` lines
    pub tries: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            tries: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_tries<I, T>(mut self, tries: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tries.extend(tries.into_iter().map(Into::into));
        self
    }

    /// Local directory to import does not exist
    pub fn path_not_found(path: &Path) -> Self {
        Self::new(format!("No such directory: {}", path.display()))
            .with_context("import mirrors an existing local directory into the catalog")
            .with_tries([format!("ls -la {}", path.display())])
    }

    /// Catalog path given to a command is unknown
    pub fn catalog_path_not_found(path: &str) -> Self {
        Self::new(format!("Not in the catalog: {}", path))
            .with_context("catalog paths are the logical paths given to 'intake import'")
            .with_tries([
                "intake import <dir> <logical-root>",
                "intake datasets <root>",
            ])
    }

    /// No dataset with this id under the root
    pub fn dataset_not_found(id: &str, root: &str) -> Self {
        Self::new(format!("Dataset not found: {}", display_id(id)))
            .with_context(format!(
                "no boundary under {} carries this id; fields are tab separated, '\\t' works on the command line",
                root
            ))
            .with_tries([
                format!("intake datasets {} --json", root),
                format!("intake scan {}", root),
            ])
    }

    /// Lock state forbids the action
    pub fn lock_state(message: String) -> Self {
        Self::new(message)
            .with_context("frozen datasets can only be melted; freezing needs a lock first")
            .with_tries(["intake details <root> <dataset-id>"])
    }

    /// Configuration could not be read
    pub fn invalid_config(path: &Path, details: &str) -> Self {
        Self::new(format!("Invalid configuration in {}: {}", path.display(), details))
            .with_tries(["intake config show", "intake config init --force"])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR: {}", self.message)?;
        if let Some(context) = &self.context {
            write!(f, "\n  ({})", context)?;
        }
        for cmd in &self.tries {
            write!(f, "\nTRY: {}", cmd)?;
        }
        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Turn engine errors a user can act on into [`HelpfulError`]s
pub fn explain(err: IntakeError, root: &str) -> anyhow::Error {
    match err {
        IntakeError::DatasetNotFound(id) | IntakeError::MalformedDatasetId { id, .. } => {
            HelpfulError::dataset_not_found(&id, root).into()
        }
        IntakeError::Store(intake::store::StoreError::NodeNotFound(path)) => {
            HelpfulError::catalog_path_not_found(&path).into()
        }
        err @ (IntakeError::Frozen { .. } | IntakeError::NotLocked(_)) => {
            HelpfulError::lock_state(err.to_string()).into()
        }
        other => other.into(),
    }
}

/// Print a failure as `{"status": "error", ...}` on stdout
pub fn print_json_error(err: &anyhow::Error) {
    let value = serde_json::json!({
        "status": "error",
        "status_info": format!("{:#}", err),
    });
    println!("{}", value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpful_error_display() {
        let err = HelpfulError::new("Scan failed")
            .with_context("while tagging /z/p")
            .with_tries(["intake scan /z/p"]);

        assert_eq!(
            err.to_string(),
            "ERROR: Scan failed\n  (while tagging /z/p)\nTRY: intake scan /z/p"
        );
    }

    #[test]
    fn test_dataset_not_found_shows_escaped_id() {
        let display = HelpfulError::dataset_not_found("10w\techo", "/z/p").to_string();
        assert!(display.contains("10w\\techo"));
        assert!(display.contains("intake datasets /z/p"));
    }

    #[test]
    fn test_explain_keeps_other_errors() {
        let err = explain(IntakeError::Config("bad".into()), "/z/p");
        assert!(err.downcast_ref::<HelpfulError>().is_none());

        let err = explain(IntakeError::NotLocked("x".into()), "/z/p");
        assert!(err.downcast_ref::<HelpfulError>().is_some());
    }
}
