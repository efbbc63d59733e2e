//! Opaque value marks and the marked-value wrapper.
//!
//! A mark is a tag (for example a sensitivity label) that travels with a
//! value through every transformation. The renderer never interprets
//! marks; it only guarantees they survive from inputs to output.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Kind, Value};

/// An opaque mark attached to a value.
///
/// Marks carry no meaning inside the renderer. An embedding runtime
/// assigns them meaning, e.g. `Mark::new("sensitive")`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Mark(String);

impl Mark {
    /// Create a new mark from any string-like value.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the mark as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for Mark {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<&str> for Mark {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Mark {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The set of marks on a value.
pub type Marks = BTreeSet<Mark>;

/// A [`Value`] together with its marks.
///
/// All evaluation in this crate flows through `Marked` rather than bare
/// `Value`, so mark preservation is structural instead of a convention
/// each call site must remember. Stripping and reattaching are explicit:
///
/// ```
/// use stencil::{Mark, Marked};
///
/// let greeting = Marked::new("hello").mark("sensitive");
/// let (value, marks) = greeting.unmark();
/// assert_eq!(value.as_str(), Some("hello"));
/// assert!(marks.contains(&Mark::new("sensitive")));
///
/// let restored = Marked::with_marks(value, marks);
/// assert!(restored.has_mark("sensitive"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Marked {
    /// The underlying value.
    pub value: Value,

    /// Marks attached to the value as a whole. Elements of container
    /// values carry their own marks independently.
    pub marks: Marks,
}

impl Marked {
    /// Wrap a value with no marks.
    pub fn new(value: impl Into<Value>) -> Self {
        Self { value: value.into(), marks: Marks::new() }
    }

    /// Wrap a value with an existing mark set.
    pub fn with_marks(value: impl Into<Value>, marks: Marks) -> Self {
        Self { value: value.into(), marks }
    }

    /// Attach one additional mark, consuming and returning the wrapper.
    pub fn mark(mut self, mark: impl Into<Mark>) -> Self {
        self.marks.insert(mark.into());
        self
    }

    /// Strip the marks, returning the bare value and the stripped set.
    pub fn unmark(self) -> (Value, Marks) {
        (self.value, self.marks)
    }

    /// Reattach a previously stripped mark set, unioning it with any
    /// marks already present.
    pub fn remark(mut self, marks: Marks) -> Self {
        self.marks.extend(marks);
        self
    }

    /// Union another mark set into this wrapper in place.
    pub fn absorb(&mut self, marks: &Marks) {
        self.marks.extend(marks.iter().cloned());
    }

    /// Whether a mark with the given text is present.
    pub fn has_mark(&self, mark: &str) -> bool {
        self.marks.contains(&Mark::new(mark))
    }

    /// The kind of the underlying value.
    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// Whether the underlying value is not yet determined.
    pub fn is_unknown(&self) -> bool {
        self.value.is_unknown()
    }
}

impl From<Value> for Marked {
    fn from(value: Value) -> Self {
        Marked::new(value)
    }
}

impl From<&str> for Marked {
    fn from(s: &str) -> Self {
        Marked::new(s)
    }
}

impl From<String> for Marked {
    fn from(s: String) -> Self {
        Marked::new(s)
    }
}

impl From<i64> for Marked {
    fn from(n: i64) -> Self {
        Marked::new(n)
    }
}

impl From<i32> for Marked {
    fn from(n: i32) -> Self {
        Marked::new(n)
    }
}

impl From<f64> for Marked {
    fn from(n: f64) -> Self {
        Marked::new(n)
    }
}

impl From<bool> for Marked {
    fn from(b: bool) -> Self {
        Marked::new(b)
    }
}
