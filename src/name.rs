//! Names - fully-qualified, delimiter-aware identifiers
//!
//! A `Name` is a list of segments plus the delimiter of the language it came
//! from (`::` for C/C++, `.` for Java, Python, Go). Two names are equal when
//! their segments are equal; the delimiter only affects display.
//!
//! Examples:
//! - `std::vector` → segments `["std", "vector"]`
//! - `java.util.List` → segments `["java", "util", "List"]`

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default delimiter used when a name is created without a language
pub const DEFAULT_DELIMITER: &str = "::";

/// A possibly qualified name such as `A::B::c`.
#[derive(Debug, Clone, Eq)]
pub struct Name {
    segments: Vec<String>,
    delimiter: String,
}

impl Name {
    /// Create a single-segment name
    pub fn local(name: impl Into<String>) -> Self {
        Self::from_segments(vec![name.into()], DEFAULT_DELIMITER)
    }

    /// Create a name from already split segments
    pub fn from_segments(segments: Vec<String>, delimiter: impl Into<String>) -> Self {
        Self {
            segments: segments.into_iter().filter(|s| !s.is_empty()).collect(),
            delimiter: delimiter.into(),
        }
    }

    /// Parse `text` using the given delimiter
    pub fn parse(text: &str, delimiter: &str) -> Self {
        let text = text.trim();
        let text = text.strip_prefix(delimiter).unwrap_or(text);
        Self::from_segments(
            text.split(delimiter).map(|s| s.trim().to_string()).collect(),
            delimiter,
        )
    }

    /// The empty name (used by the global scope)
    pub fn root(delimiter: impl Into<String>) -> Self {
        Self::from_segments(Vec::new(), delimiter)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the name has a parent component (`A::b` but not `b`)
    pub fn is_qualified(&self) -> bool {
        self.segments.len() > 1
    }

    /// The last segment, or `""` for the empty name
    pub fn local_name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Everything but the last segment
    pub fn parent(&self) -> Option<Name> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
            delimiter: self.delimiter.clone(),
        })
    }

    /// Append a (possibly qualified) name to this one
    pub fn join(&self, other: &Name) -> Name {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self {
            segments,
            delimiter: self.delimiter.clone(),
        }
    }

    /// Append a single segment
    pub fn child(&self, segment: impl Into<String>) -> Name {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self {
            segments,
            delimiter: self.delimiter.clone(),
        }
    }

    /// Same segments rendered with another delimiter
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// True if `self` starts with all segments of `prefix`
    pub fn starts_with(&self, prefix: &Name) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl std::hash::Hash for Name {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join(&self.delimiter))
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name::parse(value, DEFAULT_DELIMITER)
    }
}

impl Serialize for Name {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let delimiter = if s.contains("::") { "::" } else if s.contains('.') { "." } else { DEFAULT_DELIMITER };
        Ok(Name::parse(&s, delimiter))
    }
}
