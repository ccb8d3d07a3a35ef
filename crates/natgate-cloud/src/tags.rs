//! Tag bookkeeping
//!
//! Computes minimal tag deltas, applies them through the Remote Client and
//! handles provider-level default and ignored tags.

use crate::client::RemoteClient;
use crate::error::Result;
use crate::model::Tags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Prefix reserved by AWS for tags it manages itself
pub const AWS_TAG_PREFIX: &str = "aws:";

/// Minimal set of operations turning one tag set into another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Keys to add or overwrite, with their new values
    pub to_set: Tags,
    /// Keys to remove
    pub to_remove: BTreeSet<String>,
}

impl TagDiff {
    pub fn between(old: &Tags, new: &Tags) -> Self {
        let to_set = new
            .iter()
            .filter(|(k, v)| old.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let to_remove = old
            .keys()
            .filter(|k| !new.contains_key(*k))
            .cloned()
            .collect();

        Self { to_set, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_set.is_empty() && self.to_remove.is_empty()
    }

    /// Apply the diff to a local tag set
    pub fn apply_to(&self, old: &Tags) -> Tags {
        let mut tags = old.clone();
        for key in &self.to_remove {
            tags.remove(key);
        }
        tags.extend(self.to_set.clone());
        tags
    }
}

/// Push a diff to the remote object
///
/// Issues at most one untag and one tag call, skipping empty operands.
pub async fn apply_tag_diff(client: &dyn RemoteClient, id: &str, diff: &TagDiff) -> Result<()> {
    if !diff.to_remove.is_empty() {
        tracing::debug!("Removing tags from {}: {:?}", id, diff.to_remove);
        client.untag_object(id, &diff.to_remove).await?;
    }

    if !diff.to_set.is_empty() {
        tracing::debug!("Setting tags on {}: {:?}", id, diff.to_set);
        client.tag_object(id, &diff.to_set).await?;
    }

    Ok(())
}

/// Tags matched by key or key prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreTags {
    #[serde(default)]
    pub keys: BTreeSet<String>,
    #[serde(default)]
    pub key_prefixes: Vec<String>,
}

impl IgnoreTags {
    pub fn matches(&self, key: &str) -> bool {
        self.keys.contains(key) || self.key_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

/// Provider-wide tag settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagConfig {
    /// Tags added to every gateway unless the gateway overrides them
    #[serde(default)]
    pub default_tags: Tags,
    /// Tags never read back nor managed
    #[serde(default)]
    pub ignore_tags: IgnoreTags,
}

impl TagConfig {
    /// Effective tags for a gateway: defaults overridden by user tags
    pub fn merge(&self, user: &Tags) -> Tags {
        let mut tags = self.default_tags.clone();
        tags.extend(user.iter().map(|(k, v)| (k.clone(), v.clone())));
        tags
    }

    /// Drop AWS-managed and configured ignored tags from a remote tag set
    pub fn filter_ignored(&self, remote: &Tags) -> Tags {
        remote
            .iter()
            .filter(|(k, _)| !k.starts_with(AWS_TAG_PREFIX) && !self.ignore_tags.matches(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// User view of a full tag set: keys carrying their default value are dropped
    pub fn remove_defaults(&self, all: &Tags) -> Tags {
        all.iter()
            .filter(|(k, v)| self.default_tags.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
