use indexmap::IndexSet;

use crate::canonical::CanonicalPath;

/// An insertion-ordered, de-duplicating set of canonical paths.
///
/// This is the fundamental currency of the API: every input accepted by
/// [`crate::PathContext::pathset`] is coerced into one. Iteration order is
/// guaranteed to equal first-insertion order (`IndexSet` gives us this for
/// free, which is exactly why it was picked over `HashSet`).
pub type PathSet = IndexSet<CanonicalPath>;

/// The shapes accepted as input to [`crate::PathContext::pathset`]:
/// a single path-like string, an already-built [`PathSet`], or a finite
/// iterable of any of the preceding, recursively.
pub enum PathInput {
    Str(String),
    Set(PathSet),
    Iter(Vec<PathInput>),
}

impl From<&str> for PathInput {
    fn from(s: &str) -> Self {
        PathInput::Str(s.to_string())
    }
}

impl From<String> for PathInput {
    fn from(s: String) -> Self {
        PathInput::Str(s)
    }
}

impl From<&String> for PathInput {
    fn from(s: &String) -> Self {
        PathInput::Str(s.clone())
    }
}

impl From<PathSet> for PathInput {
    fn from(set: PathSet) -> Self {
        PathInput::Set(set)
    }
}

impl From<&PathSet> for PathInput {
    fn from(set: &PathSet) -> Self {
        PathInput::Set(set.clone())
    }
}

impl<T: Into<PathInput>> From<Vec<T>> for PathInput {
    fn from(items: Vec<T>) -> Self {
        PathInput::Iter(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PathInput> + Clone, const N: usize> From<[T; N]> for PathInput {
    fn from(items: [T; N]) -> Self {
        PathInput::Iter(items.into_iter().map(Into::into).collect())
    }
}
