//! Hierarchical content names.
//!
//! A [`Name`] is an immutable sequence of string components such as
//! `/video/cam1/42`. Names are cheap to clone and compare structurally.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

#[cfg(test)]
mod tests;

#[derive(Debug)]
struct NameInner {
    components: Vec<String>,
    parent: OnceLock<Name>,
}

/// Represents a content name, which is a sequence of name components.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct Name {
    inner: Arc<NameInner>,
}

impl Name {
    /// Creates the root name `/`.
    pub fn new() -> Self {
        Self::from_components(Vec::<String>::new())
    }

    /// Creates a name from already separated components.
    pub fn from_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(NameInner {
                components: components.into_iter().map(Into::into).collect(),
                parent: OnceLock::new(),
            }),
        }
    }

    /// Creates a name from a string representation with '/' as component separator.
    ///
    /// Empty segments are skipped, so `/a//b/` and `a/b` both yield `/a/b`.
    pub fn from_string(s: &str) -> Self {
        Self::from_components(s.split('/').filter(|comp| !comp.is_empty()))
    }

    /// Returns the number of components in the name.
    pub fn len(&self) -> usize {
        self.inner.components.len()
    }

    /// Returns true if this is the root name.
    pub fn is_empty(&self) -> bool {
        self.inner.components.is_empty()
    }

    /// Returns the name components.
    pub fn components(&self) -> &[String] {
        &self.inner.components
    }

    /// Gets a component at the specified index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.inner.components.get(index).map(String::as_str)
    }

    /// Returns the name with its last component dropped.
    ///
    /// The root is its own parent. The result is computed once per name.
    pub fn parent(&self) -> Name {
        if self.is_empty() {
            return self.clone();
        }
        self.inner
            .parent
            .get_or_init(|| self.prefix(self.len() - 1))
            .clone()
    }

    /// Returns a prefix of this name with at most `len` components.
    pub fn prefix(&self, len: usize) -> Self {
        if len >= self.len() {
            return self.clone();
        }
        Self::from_components(self.inner.components[..len].iter().cloned())
    }

    /// Returns a new name with `suffix` appended.
    pub fn child<I, S>(&self, suffix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let components = self
            .inner
            .components
            .iter()
            .cloned()
            .chain(suffix.into_iter().map(Into::into));
        Self::from_components(components)
    }

    /// Checks if this name is a prefix of another name.
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.len() <= other.len()
            && self
                .components()
                .iter()
                .zip(other.components())
                .all(|(a, b)| a == b)
    }

    /// Returns the components beyond `prefix`, or `None` if `prefix` does not match.
    pub fn suffix(&self, prefix: &Name) -> Option<&[String]> {
        if !prefix.is_prefix_of(self) {
            return None;
        }
        Some(&self.inner.components[prefix.len()..])
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.components() == other.components()
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components().hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "/");
        }

        for component in self.components() {
            write!(f, "/{}", component)?;
        }

        Ok(())
    }
}

impl Default for Name {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Self::from_string(&s)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.to_string()
    }
}

impl FromStr for Name {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_string(s))
    }
}
