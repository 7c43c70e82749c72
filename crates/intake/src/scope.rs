//! Classification scope carried down the tree during a scan
//!
//! A `Scope` is a value: each branch of the walk owns its own copy, so
//! sibling subtrees are classified independently.

use crate::token::{Classifier, Token, TokenKind};
use serde::{Deserialize, Serialize};

/// Partially resolved WEPV classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub wave: Option<String>,
    pub experiment_type: Option<String>,
    pub pseudocode: Option<String>,
    pub version: Option<String>,
    /// Path at which the dataset boundary was detected
    pub dataset_directory: Option<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: TokenKind) -> &mut Option<String> {
        match kind {
            TokenKind::Wave => &mut self.wave,
            TokenKind::ExperimentType => &mut self.experiment_type,
            TokenKind::Pseudocode => &mut self.pseudocode,
            TokenKind::Version => &mut self.version,
        }
    }

    /// Value for a token kind
    pub fn get(&self, kind: TokenKind) -> Option<&str> {
        match kind {
            TokenKind::Wave => self.wave.as_deref(),
            TokenKind::ExperimentType => self.experiment_type.as_deref(),
            TokenKind::Pseudocode => self.pseudocode.as_deref(),
            TokenKind::Version => self.version.as_deref(),
        }
    }

    /// Merge a token; a kind that already has a value keeps it.
    ///
    /// Returns whether the scope changed.
    pub fn absorb(&mut self, token: Token) -> bool {
        let slot = self.slot(token.kind);
        if slot.is_some() {
            return false;
        }
        *slot = Some(token.value);
        true
    }

    /// Copy of this scope extended with the tokens of one name
    pub fn extended(&self, classifier: &Classifier, name: &str) -> Scope {
        let mut scope = self.clone();
        for token in classifier.tokens(name) {
            scope.absorb(token);
        }
        scope
    }

    /// Dataset-complete iff wave, experiment type and pseudocode are known
    pub fn is_complete(&self) -> bool {
        self.wave.is_some() && self.experiment_type.is_some() && self.pseudocode.is_some()
    }

    /// Copy marked as a dataset rooted at `directory`
    pub fn at_boundary(&self, directory: &str) -> Scope {
        Scope {
            dataset_directory: Some(directory.to_string()),
            ..self.clone()
        }
    }

    /// `(kind, value)` for each resolved WEPV token
    pub fn resolved(&self) -> impl Iterator<Item = (TokenKind, &str)> {
        [
            TokenKind::Wave,
            TokenKind::ExperimentType,
            TokenKind::Pseudocode,
            TokenKind::Version,
        ]
        .into_iter()
        .filter_map(move |kind| self.get(kind).map(|value| (kind, value)))
    }
}
