//! Hierarchical names and the sequenced-name identifier.
//!
//! A [`Name`] is an ordered list of components, written `/like/this`. The
//! table never stores names, only 32-bit keys derived from them, so
//! [`SeqName`] carries the canonical (prefix, sequence number) pair and owns
//! the key derivation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::{murmur3, CHECK_SEED};
use crate::iblt::Key;

/// A hierarchical name: an ordered list of UTF-8 components.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    components: Vec<String>,
}

impl Name {
    /// The empty (root) name, `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse from URI form. Empty components are skipped, so `/a//b`,
    /// `a/b`, and `/a/b/` all parse to the same name.
    pub fn from_uri(uri: &str) -> Self {
        Self {
            components: uri
                .split('/')
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Append a component, returning the extended name.
    pub fn append(mut self, component: impl Into<String>) -> Self {
        self.components.push(component.into());
        self
    }

    /// Append a sequence number as a decimal component.
    pub fn append_number(self, number: u32) -> Self {
        self.append(number.to_string())
    }

    /// URI form, `/a/b`. The root name renders as `/`.
    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        let mut uri = String::new();
        for component in &self.components {
            uri.push('/');
            uri.push_str(component);
        }
        uri
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether this is the root name.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl From<&str> for Name {
    fn from(uri: &str) -> Self {
        Self::from_uri(uri)
    }
}

/// A producer prefix paired with a sequence number.
///
/// This is the identifier the reconciliation core synchronizes. Its [`key`]
/// is what actually enters the table; recovering a `SeqName` from a decoded
/// key requires the forward index maintained by the tracking layer.
///
/// [`key`]: SeqName::key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeqName {
    /// The producer prefix.
    pub prefix: Name,
    /// The publication counter under that prefix.
    pub seq: u32,
}

impl SeqName {
    /// Create from a prefix and sequence number.
    pub fn new(prefix: Name, seq: u32) -> Self {
        Self { prefix, seq }
    }

    /// The full name, `<prefix>/<seq>`.
    pub fn to_name(&self) -> Name {
        self.prefix.clone().append_number(self.seq)
    }

    /// The 32-bit table key for this identifier.
    ///
    /// Fixed by the wire contract: murmur3 of the full name's URI bytes
    /// under [`CHECK_SEED`]. All nodes must derive the same key for the
    /// same (prefix, seq) pair or decoded differences become meaningless.
    pub fn key(&self) -> Key {
        murmur3(CHECK_SEED, self.to_name().to_uri().as_bytes())
    }
}

impl fmt::Display for SeqName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix.to_uri(), self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_roundtrip() {
        let name = Name::from_uri("/node/alpha");
        assert_eq!(name.to_uri(), "/node/alpha");
        assert_eq!(Name::from_uri(&name.to_uri()), name);
    }

    #[test]
    fn test_uri_normalization() {
        assert_eq!(Name::from_uri("a/b"), Name::from_uri("/a//b/"));
        assert_eq!(Name::from_uri(""), Name::root());
        assert_eq!(Name::root().to_uri(), "/");
    }

    #[test]
    fn test_append_number() {
        let name = Name::from_uri("/node").append_number(42);
        assert_eq!(name.to_uri(), "/node/42");
    }

    #[test]
    fn test_seq_name_key_deterministic() {
        let a = SeqName::new(Name::from_uri("/node/alpha"), 7);
        let b = SeqName::new(Name::from_uri("/node/alpha"), 7);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_seq_name_key_varies() {
        let prefix = Name::from_uri("/node/alpha");
        let k7 = SeqName::new(prefix.clone(), 7).key();
        let k8 = SeqName::new(prefix, 8).key();
        let other = SeqName::new(Name::from_uri("/node/beta"), 7).key();
        assert_ne!(k7, k8);
        assert_ne!(k7, other);
    }

    #[test]
    fn test_display() {
        let sn = SeqName::new(Name::from_uri("/a"), 5);
        assert_eq!(sn.to_string(), "/a/5");
        assert_eq!(sn.to_name().to_uri(), "/a/5");
    }
}
