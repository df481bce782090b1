//! Extension descriptor declaration and validation.

use crate::extension::contract::{Extension, ExtensionCollaborators};
use crate::llm::LlmProcessor;
use crate::sse::NotificationSender;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use thiserror::Error;

// Lowercase ascii words joined by single `.`, `_` or `-`.
static EXTENSION_ID_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$").ok());

/// Identifier rejected by [`ExtensionId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("extension id is invalid: `{0}` (expected lowercase words joined by `.`, `_` or `-`)")]
pub struct InvalidExtensionId(pub String);

/// Stable extension identifier, e.g. `builtin.clipboard.echo`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExtensionId(String);

impl ExtensionId {
    pub fn parse(value: &str) -> Result<Self, InvalidExtensionId> {
        let normalized = value.trim();
        if is_valid_extension_id(normalized) {
            Ok(Self(normalized.to_string()))
        } else {
            Err(InvalidExtensionId(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ExtensionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExtensionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExtensionId {
    type Error = InvalidExtensionId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExtensionId> for String {
    fn from(value: ExtensionId) -> Self {
        value.0
    }
}

fn is_valid_extension_id(value: &str) -> bool {
    EXTENSION_ID_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}

/// Builds a concrete extension from its injected collaborators.
pub type ExtensionFactory = fn(ExtensionCollaborators) -> Arc<dyn Extension>;

/// Static registration metadata for one extension.
#[derive(Clone)]
pub struct ExtensionDescriptor {
    pub extension_id: ExtensionId,
    /// Human-readable summary of what the extension does.
    pub description: String,
    /// Extensions that must be initialized before this one.
    pub dependencies: BTreeSet<ExtensionId>,
    /// Concrete implementation reference.
    pub extension_class: ExtensionFactory,
}

impl ExtensionDescriptor {
    pub fn new(
        extension_id: &str,
        description: impl Into<String>,
        extension_class: ExtensionFactory,
    ) -> Result<Self, InvalidExtensionId> {
        Ok(Self {
            extension_id: ExtensionId::parse(extension_id)?,
            description: description.into(),
            dependencies: BTreeSet::new(),
            extension_class,
        })
    }

    /// Declares one dependency on another extension.
    pub fn depends_on(mut self, extension_id: &str) -> Result<Self, InvalidExtensionId> {
        self.dependencies.insert(ExtensionId::parse(extension_id)?);
        Ok(self)
    }

    /// Builds the extension with collaborators stamped with this id.
    pub fn instantiate(
        &self,
        sse_sender: Arc<dyn NotificationSender>,
        llm_processor: Arc<dyn LlmProcessor>,
    ) -> Arc<dyn Extension> {
        let collaborators =
            ExtensionCollaborators::new(sse_sender, llm_processor, self.extension_id.as_str());
        (self.extension_class)(collaborators)
    }
}

impl Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("extension_id", &self.extension_id)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtensionId, InvalidExtensionId};

    #[test]
    fn accepts_dotted_lowercase_ids() {
        for value in ["builtin.clipboard.echo", "notes", "web-search_v2", "a1.b2"] {
            assert!(ExtensionId::parse(value).is_ok(), "{value} should be valid");
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = ExtensionId::parse("  builtin.notes ").expect("trimmed id");
        assert_eq!(id.as_str(), "builtin.notes");
    }

    #[test]
    fn rejects_malformed_ids() {
        for value in ["", "Builtin", "two words", "a..b", ".lead", "trail-", "emoji✨"] {
            assert_eq!(
                ExtensionId::parse(value),
                Err(InvalidExtensionId(value.to_string())),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn serde_rejects_invalid_ids() {
        let err = serde_json::from_str::<ExtensionId>("\"Bad Id\"")
            .expect_err("invalid id must not decode");
        assert!(err.to_string().contains("extension id is invalid"));
        let id: ExtensionId = serde_json::from_str("\"builtin.ok\"").expect("valid id");
        assert_eq!(id.to_string(), "builtin.ok");
    }
}
