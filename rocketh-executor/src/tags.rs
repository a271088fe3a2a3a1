//! Tag index
//!
//! Maps every tag to the scripts carrying it. Dependencies name tags, so the
//! resolver goes through this index to find the scripts a script needs.

use rocketh_core::domain::script::ScriptMetadata;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{ExecutorError, Result};

#[derive(Debug, Default, Clone)]
pub struct TagIndex {
    bags: BTreeMap<String, Vec<PathBuf>>,
}

impl TagIndex {
    /// Builds the index from scripts in discovery order
    ///
    /// Each bag keeps the scripts in the order they are given.
    ///
    /// # Errors
    /// Returns [`ExecutorError::InvalidTag`] for a tag containing a comma,
    /// since the tag filter is comma-separated.
    pub fn build<'a, I>(scripts: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a ScriptMetadata>,
    {
        let mut bags: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for script in scripts {
            for tag in &script.tags {
                if tag.contains(',') {
                    return Err(ExecutorError::InvalidTag {
                        path: script.path.clone(),
                        tag: tag.clone(),
                    });
                }
                let bag = bags.entry(tag.clone()).or_default();
                if !bag.contains(&script.path) {
                    bag.push(script.path.clone());
                }
            }
        }
        Ok(Self { bags })
    }

    /// Scripts carrying `tag`; empty for an unknown tag
    pub fn paths(&self, tag: &str) -> &[PathBuf] {
        self.bags.get(tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// All known tags, sorted
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.bags.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bags_follow_discovery_order() {
        let scripts = vec![
            ScriptMetadata::new("/d/01_token.lua").with_tags(["token", "core"]),
            ScriptMetadata::new("/d/02_pool.lua").with_tags(["pool", "core"]),
        ];

        let index = TagIndex::build(&scripts).unwrap();
        assert_eq!(
            index.paths("core"),
            &[
                PathBuf::from("/d/01_token.lua"),
                PathBuf::from("/d/02_pool.lua")
            ]
        );
        assert_eq!(index.paths("token"), &[PathBuf::from("/d/01_token.lua")]);
        assert!(index.paths("unknown").is_empty());
        assert_eq!(index.tags().collect::<Vec<_>>(), vec!["core", "pool", "token"]);
    }

    #[test]
    fn test_rejects_comma_in_tag() {
        let scripts = vec![ScriptMetadata::new("/d/01_token.lua").with_tags(["a,b"])];
        let err = TagIndex::build(&scripts).unwrap_err();
        assert!(matches!(err, ExecutorError::InvalidTag { ref tag, .. } if tag == "a,b"));
    }
}
