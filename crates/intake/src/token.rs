//! Classification tokens extracted from path-segment names
//!
//! A name is split on `_` and then `-`; each fragment yields at most one
//! token. The grammar for waves, pseudocodes and versions is fixed; the
//! experiment-type vocabulary comes from [`IntakeConfig`].

use crate::config::IntakeConfig;
use crate::error::{IntakeError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

static WAVE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[0-9]{1,2}[wmy]$").unwrap());
static PSEUDOCODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[bap][0-9]{5}$").unwrap());
static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[Vv][Ee][Rr][A-Z][A-Za-z0-9-]*$").unwrap());

/// The four WEPV token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Wave,
    ExperimentType,
    Pseudocode,
    Version,
}

impl TokenKind {
    /// Attribute name the token is stored under
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Wave => "wave",
            TokenKind::ExperimentType => "experiment_type",
            TokenKind::Pseudocode => "pseudocode",
            TokenKind::Version => "version",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

/// Compiled classification tables.
///
/// Cheap to share by reference across a whole scan.
#[derive(Debug, Clone)]
pub struct Classifier {
    experiment_types: HashSet<String>,
    filename: Regex,
}

impl Classifier {
    pub fn new(config: &IntakeConfig) -> Result<Self> {
        let filename = Regex::new(&config.filename_pattern)
            .map_err(|e| IntakeError::Pattern(format!("{}: {}", config.filename_pattern, e)))?;
        Ok(Self {
            experiment_types: config.experiment_types.iter().cloned().collect(),
            filename,
        })
    }

    /// Classify one fragment. First match wins: wave, pseudocode, version,
    /// experiment type.
    pub fn extract(&self, fragment: &str) -> Option<Token> {
        if WAVE_RE.is_match(fragment) {
            return Some(Token::new(TokenKind::Wave, fragment.to_lowercase()));
        }
        if PSEUDOCODE_RE.is_match(fragment) {
            return Some(Token::new(TokenKind::Pseudocode, fragment.to_uppercase()));
        }
        if VERSION_RE.is_match(fragment) {
            return Some(Token::new(TokenKind::Version, &fragment[3..]));
        }
        if self.experiment_types.contains(fragment) {
            return Some(Token::new(TokenKind::ExperimentType, fragment));
        }
        None
    }

    /// All tokens found in a name, in fragment order
    pub fn tokens<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Token> + 'a {
        fragments(name).filter_map(move |fragment| self.extract(fragment))
    }

    /// Whether a name contains only allowed characters
    pub fn is_valid_name(&self, name: &str) -> bool {
        self.filename.is_match(name)
    }
}

/// Split a name on `_`, then each piece on `-`, dropping empty fragments
pub fn fragments(name: &str) -> impl Iterator<Item = &str> {
    name.split('_')
        .flat_map(|part| part.split('-'))
        .filter(|fragment| !fragment.is_empty())
}
