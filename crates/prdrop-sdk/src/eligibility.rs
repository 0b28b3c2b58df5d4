//! Which repositories may claim the airdrop.
//!
//! The repository name is always taken from the proof's public inputs, never from anything the
//! client asserts alongside it.

use std::collections::HashSet;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Owner wildcard suffix in an allow list entry.
pub const OWNER_WILDCARD: &str = "/*";

/// Policy deciding whether a proven repository may claim.
pub trait EligibilityGate: Send + Sync {
    /// Whether `repo_name` (`owner/repo`) is eligible. Must be pure.
    fn is_eligible(&self, repo_name: &str) -> bool;
}

impl<F> EligibilityGate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_eligible(&self, repo_name: &str) -> bool {
        self(repo_name)
    }
}

/// Errors produced while loading an allow list.
#[derive(Error, Debug)]
pub enum EligibilityError {
    /// The allow list file could not be read.
    #[error("failed to read allow list: {0}")]
    Io(#[from] std::io::Error),

    /// The allow list file is not valid JSON.
    #[error("malformed allow list: {0}")]
    Json(#[from] serde_json::Error),

    /// An entry is neither `owner/repo` nor `owner/*`.
    #[error("allow list entry {0:?} is neither `owner/repo` nor `owner/*`")]
    InvalidEntry(String),
}

/// On-disk allow list.
///
/// ```json
/// { "repositories": ["acme/widgets", "octo-org/*"] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AllowListConfig {
    /// Exact `owner/repo` names, or `owner/*` for every repository of an owner.
    pub repositories: Vec<String>,
}

/// Allow list of repositories and owners. Matching ignores ASCII case, as GitHub names do.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    repositories: HashSet<String>,
    owners: HashSet<String>,
}

impl AllowList {
    /// Build an allow list from entries.
    ///
    /// # Errors
    /// Returns [`EligibilityError::InvalidEntry`] for the first malformed entry.
    pub fn new<I, S>(entries: I) -> Result<Self, EligibilityError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::default();
        for entry in entries {
            let entry = entry.as_ref();
            let invalid = || EligibilityError::InvalidEntry(entry.to_owned());

            if let Some(owner) = entry.strip_suffix(OWNER_WILDCARD) {
                if !is_name(owner) {
                    return Err(invalid());
                }
                list.owners.insert(owner.to_ascii_lowercase());
            } else {
                split_repo(entry).ok_or_else(invalid)?;
                list.repositories.insert(entry.to_ascii_lowercase());
            }
        }
        Ok(list)
    }

    /// Load an allow list from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains a malformed entry.
    pub async fn load(path: &Path) -> Result<Self, EligibilityError> {
        let raw = tokio::fs::read(path).await?;
        let config: AllowListConfig = serde_json::from_slice(&raw)?;
        let list = Self::new(&config.repositories)?;
        info!(
            path = %path.display(),
            repositories = list.repositories.len(),
            owners = list.owners.len(),
            "Loaded allow list"
        );
        Ok(list)
    }
}

impl EligibilityGate for AllowList {
    fn is_eligible(&self, repo_name: &str) -> bool {
        let Some((owner, _)) = split_repo(repo_name) else {
            return false;
        };
        self.repositories.contains(&repo_name.to_ascii_lowercase())
            || self.owners.contains(&owner.to_ascii_lowercase())
    }
}

/// Split a well-formed `owner/repo` name.
fn split_repo(name: &str) -> Option<(&str, &str)> {
    let (owner, repo) = name.split_once('/')?;
    (is_name(owner) && is_name(repo)).then_some((owner, repo))
}

fn is_name(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> AllowList {
        AllowList::new(["acme/widgets", "octo-org/*"]).expect("valid entries")
    }

    #[test]
    fn exact_and_owner_entries() {
        let list = list();
        assert!(list.is_eligible("acme/widgets"));
        assert!(list.is_eligible("ACME/Widgets"));
        assert!(!list.is_eligible("acme/gadgets"));
        assert!(list.is_eligible("octo-org/anything"));
        assert!(list.is_eligible("Octo-Org/hello.world"));
    }

    #[test]
    fn malformed_names_are_never_eligible() {
        let list = list();
        for name in ["", "acme", "acme/", "/widgets", "acme/widgets/extra", "octo-org/*", "octo-org/ x"] {
            assert!(!list.is_eligible(name), "{name:?} must not be eligible");
        }
    }

    #[test]
    fn rejects_malformed_entries() {
        for entry in ["", "*", "acme", "acme/widgets/pull", "*/widgets", "a b/c"] {
            assert!(
                matches!(AllowList::new([entry]), Err(EligibilityError::InvalidEntry(_))),
                "{entry:?} must be rejected"
            );
        }
    }

    #[test]
    fn closures_are_gates() {
        let gate = |repo: &str| repo.starts_with("acme/");
        assert!(gate.is_eligible("acme/widgets"));
        assert!(!gate.is_eligible("other/widgets"));
    }

    #[tokio::test]
    async fn loads_from_json() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("allow-list.json");
        tokio::fs::write(&path, r#"{ "repositories": ["acme/widgets"] }"#).await?;
        let list = AllowList::load(&path).await?;
        assert!(list.is_eligible("acme/widgets"));
        assert!(!list.is_eligible("acme/other"));
        Ok(())
    }
}
