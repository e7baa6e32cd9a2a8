//! cross-reference syntax
//!
//! A cross-reference is a string of the form `<scheme>:/<segment>(/<segment>)*`, for example
//! `ydl:/lawyers/ded/address`. It names an absolute position in the tree, starting at the
//! root. Segments that are decimal numbers select a sequence element (0-based) or the mapping
//! key written the same way, everything else names a mapping key.
//!
//! Strings that do not match the syntax are plain data, never an error.
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// One step from a node to one of its children
///
/// Segments compare by their text: `Index(3)` and `Key("3")` are the same step, while
/// `Key("03")` or `Key(" 3")` are distinct keys that never match an index.
#[derive(Debug, Clone)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    /// Interpret a segment of a reference
    ///
    /// Decimal digits without leading zeros (surrounding whitespace is allowed) become an
    /// [Segment::Index], everything else is a [Segment::Key].
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let canonical = trimmed == "0" || !trimmed.starts_with('0');
        if canonical && !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = trimmed.parse() {
                return Segment::Index(index);
            }
        }

        Segment::Key(text.to_string())
    }

    fn text(&self) -> Cow<'_, str> {
        match self {
            Segment::Key(key) => Cow::Borrowed(key.as_str()),
            Segment::Index(index) => Cow::Owned(index.to_string()),
        }
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Segment::Index(a), Segment::Index(b)) => a == b,
            (Segment::Key(a), Segment::Key(b)) => a == b,
            _ => self.text() == other.text(),
        }
    }
}

impl Eq for Segment {}

impl Hash for Segment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text().hash(state)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Segment {
    fn from(value: &str) -> Self {
        Segment::parse(value)
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        Segment::parse(&value)
    }
}

impl From<usize> for Segment {
    fn from(value: usize) -> Self {
        Segment::Index(value)
    }
}

/// Position in a tree, as seen from the root
///
/// Two nodes are the same place iff their paths are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(segments: Vec<Segment>) -> Self {
        Self(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn parent(&self) -> Option<Path> {
        self.0
            .split_last()
            .map(|(_, parent)| Path(parent.to_vec()))
    }

    /// Path of the child at `segment`
    pub fn join(&self, segment: impl Into<Segment>) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }

    /// The first `len` segments (all of them if `len` is too large)
    pub fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Whether `prefix` is an ancestor of (or equal to) this path
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }

        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl<S: Into<Segment>, const N: usize> From<[S; N]> for Path {
    fn from(segments: [S; N]) -> Self {
        segments.into_iter().map(Into::into).collect()
    }
}

/// The reference notation of one tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    scheme: String,
    /// `<scheme>:/`
    marker: String,
}

impl Syntax {
    pub const DEFAULT_SCHEME: &'static str = "ydl";

    pub fn new(scheme: impl Into<String>) -> Self {
        let scheme = scheme.into();
        let marker = format!("{scheme}:/");
        Self { scheme, marker }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn is_reference(&self, text: &str) -> bool {
        self.parse(text).is_some()
    }

    /// Path named by a reference string, `None` for anything that is not a reference
    pub fn parse(&self, text: &str) -> Option<Path> {
        let rest = text.trim().strip_prefix(self.marker.as_str())?;

        let mut segments = Vec::new();
        for segment in rest.split('/') {
            if segment.trim().is_empty() {
                return None;
            }
            segments.push(Segment::parse(segment));
        }

        Some(Path(segments))
    }

    /// Reference string for a path
    pub fn format(&self, path: &Path) -> String {
        let segments: Vec<String> = path.segments().iter().map(ToString::to_string).collect();
        format!("{}{}", self.marker, segments.join("/"))
    }
}

impl Default for Syntax {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SCHEME)
    }
}
