//! Container image reference parsing.

use std::sync::LazyLock;

use regex::Regex;

// Pattern: ^sha256:[a-f0-9]{64}$
static SHA256_DIGEST: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^sha256:[a-f0-9]{64}$").ok());

/// A parsed image reference: `repository[:tag][@digest]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub repository: String,
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageReference {
    /// Split an image reference into repository, tag and digest.
    ///
    /// A colon only starts a tag when it follows the last `/`, so registry
    /// ports (`localhost:5000/app`) stay part of the repository.
    pub fn parse(image: &str) -> Self {
        let (name, digest) = match image.split_once('@') {
            Some((name, digest)) => (name, Some(digest.to_string())),
            None => (image, None),
        };

        let last_slash = name.rfind('/').map_or(0, |i| i + 1);
        let (repository, tag) = match name[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&name[..split], Some(name[split + 1..].to_string()))
            }
            None => (name, None),
        };

        Self {
            repository: repository.to_string(),
            tag,
            digest,
        }
    }

    /// True when the image is pinned to a valid sha256 content digest.
    pub fn is_fully_qualified(&self) -> bool {
        self.digest
            .as_deref()
            .is_some_and(|d| SHA256_DIGEST.as_ref().is_some_and(|re| re.is_match(d)))
    }
}

/// Whether `image` is covered by an image allowlist `entry`.
///
/// An entry matches on the exact reference or on the repository alone. A
/// trailing `*` turns the entry into a prefix match.
pub fn image_matches(entry: &str, image: &str) -> bool {
    if let Some(prefix) = entry.strip_suffix('*') {
        return image.starts_with(prefix);
    }
    entry == image || ImageReference::parse(image).repository == entry
}
