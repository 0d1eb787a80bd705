//! Global image whitelist.
//!
//! Pods whose images are all whitelisted skip policy evaluation entirely.
//! Typically this holds the cluster's own system images.

use crate::policy::image_matches;

/// Predicate deciding whether a pod's images are exempt from policy checks.
pub trait WhitelistChecker: Send + Sync {
    /// True when every image is whitelisted. An empty list is whitelisted.
    fn all_whitelisted(&self, images: &[String]) -> bool;
}

/// Process-wide whitelist of image patterns.
///
/// Entries match an image exactly, by repository (tag and digest ignored),
/// or by prefix when the entry ends in `*`.
#[derive(Debug, Clone, Default)]
pub struct GlobalWhitelist {
    entries: Vec<String>,
}

impl GlobalWhitelist {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(Into::into)
                .filter(|e: &String| !e.is_empty())
                .collect(),
        }
    }

    pub fn is_whitelisted(&self, image: &str) -> bool {
        self.entries.iter().any(|entry| image_matches(entry, image))
    }
}

impl WhitelistChecker for GlobalWhitelist {
    fn all_whitelisted(&self, images: &[String]) -> bool {
        images.iter().all(|image| self.is_whitelisted(image))
    }
}
