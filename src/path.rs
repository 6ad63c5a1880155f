//! Tree paths
//!
//! Breadcrumb trail from a root entity to the field being visited. Used for
//! reporting only. A path is never mutated in place: descending produces a new
//! path, so sibling branches of a walk cannot see each other's crumbs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used when rendering a path for display
pub const TREE_SEPARATOR: &str = " ➜ ";

/// A single breadcrumb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crumb {
    pub uid: String,
    pub name: String,
}

impl Crumb {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }
}

/// Ordered, append-only sequence of crumbs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreePath(Vec<Crumb>);

impl TreePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// A new path with `crumb` appended
    pub fn child(&self, crumb: Crumb) -> Self {
        let mut crumbs = Vec::with_capacity(self.0.len() + 1);
        crumbs.extend(self.0.iter().cloned());
        crumbs.push(crumb);
        Self(crumbs)
    }

    /// Shorthand for `child(Crumb::new(uid, name))`
    pub fn join(&self, uid: impl Into<String>, name: impl Into<String>) -> Self {
        self.child(Crumb::new(uid, name))
    }

    pub fn crumbs(&self) -> &[Crumb] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Display form: crumb names joined by an arrow
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|c| if c.name.is_empty() { c.uid.as_str() } else { c.name.as_str() })
            .collect::<Vec<_>>()
            .join(TREE_SEPARATOR)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_leaves_parent_untouched() {
        let parent = TreePath::root().join("page", "Page");
        let left = parent.join("a", "A");
        let right = parent.join("b", "B");
        assert_eq!(parent.len(), 1);
        assert_eq!(left.render(), "Page ➜ A");
        assert_eq!(right.render(), "Page ➜ B");
    }

    #[test]
    fn test_render_falls_back_to_uid() {
        let path = TreePath::root().join("ct", "").join("field", "Field");
        assert_eq!(path.to_string(), "ct ➜ Field");
    }
}
