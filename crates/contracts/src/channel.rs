//! ChannelName - normalized, cheap-to-clone channel identifier
//!
//! Uses Arc<str> internally so a name can be handed to the join queue,
//! the plan and the report without reallocating.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Normalized channel name.
///
/// The only way to build one is [`ChannelName::parse`], which trims
/// surrounding whitespace, strips one leading `#` and lower-cases the rest.
/// Blank input never produces a name.
///
/// # Examples
/// ```
/// use contracts::ChannelName;
///
/// let name = ChannelName::parse("#Foo ").unwrap();
/// assert_eq!(name, "foo");
/// assert_eq!(name.join_target(), "#foo");
/// assert!(ChannelName::parse("   ").is_none());
/// ```
#[derive(Clone)]
pub struct ChannelName(Arc<str>);

impl ChannelName {
    /// Normalize raw input into a channel name.
    ///
    /// Returns `None` for empty, whitespace-only or `#`-only input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let stripped = trimmed.strip_prefix('#').unwrap_or(trimmed).trim();
        if stripped.is_empty() {
            return None;
        }
        Some(Self(Arc::from(stripped.to_lowercase())))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name with the `#` prefix, as sent in a JOIN command.
    pub fn join_target(&self) -> String {
        format!("#{}", self.0)
    }
}

/// Normalize a batch of raw inputs.
///
/// Blank entries are dropped. Duplicates (after normalization) keep their
/// first position; the dropped duplicates are returned alongside.
pub fn normalize_channels<I, S>(raw: I) -> (Vec<ChannelName>, Vec<ChannelName>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut duplicates = Vec::new();

    for name in raw.into_iter().filter_map(|s| ChannelName::parse(s.as_ref())) {
        if seen.insert(name.clone()) {
            kept.push(name);
        } else {
            duplicates.push(name);
        }
    }

    (kept, duplicates)
}

impl Deref for ChannelName {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ChannelName {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ChannelName {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelName({:?})", self.0)
    }
}

impl PartialEq for ChannelName {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for ChannelName {}

impl PartialEq<str> for ChannelName {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for ChannelName {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Hash for ChannelName {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for ChannelName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChannelName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).ok_or_else(|| de::Error::custom("channel name is blank"))
    }
}
