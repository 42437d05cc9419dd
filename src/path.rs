//! Hierarchical addresses and the container state machine.
//!
//! A [`Path`] addresses a value as `SEG[element][component]`. Indices are
//! zero-based; `ElementStart` increments the element index and
//! `ComponentStart` the component index, and both reset when a new segment
//! name begins.
//!
//! [`PathCursor`] holds the nesting state shared by the writer and the reader,
//! so both sides walk the exact same transitions:
//!
//! ```text
//! None --SegmentName--> Segment --ElementStart--> Element --ComponentStart--> Component
//!   ^                      |                        |                            |
//!   +-------------------SegmentTerminator-----------+----------------------------+
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use edi_codec::Path;
//!
//! let path: Path = "UNB[2][1]".parse().unwrap();
//! assert_eq!(path.segment(), "UNB");
//! assert_eq!(path.element(), Some(2));
//! assert_eq!(path.component(), Some(1));
//! assert_eq!(path.to_string(), "UNB[2][1]");
//!
//! // The first component of an element is index 0
//! assert_eq!("UNB[2]".parse::<Path>().unwrap(), "UNB[2][0]".parse::<Path>().unwrap());
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Kind of container the cursor is currently in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ContainerType {
    #[default]
    None,
    Segment,
    Element,
    Component,
}

/// Address of a value: segment tag plus optional element and component index.
///
/// Equality and hashing treat an absent index as 0.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Path {
    segment: String,
    element: Option<usize>,
    component: Option<usize>,
}

impl Path {
    /// The empty path, outside of any segment.
    #[must_use]
    pub fn root() -> Self {
        Path::default()
    }

    #[must_use]
    pub fn segment_only(segment: &str) -> Self {
        Path {
            segment: segment.to_string(),
            element: None,
            component: None,
        }
    }

    #[must_use]
    pub fn new(segment: &str, element: usize, component: usize) -> Self {
        Path {
            segment: segment.to_string(),
            element: Some(element),
            component: Some(component),
        }
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn element(&self) -> Option<usize> {
        self.element
    }

    pub fn component(&self) -> Option<usize> {
        self.component
    }

    pub fn is_root(&self) -> bool {
        self.segment.is_empty()
    }

    fn key(&self) -> (&str, usize, usize) {
        (
            &self.segment,
            self.element.unwrap_or(0),
            self.component.unwrap_or(0),
        )
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segment)?;
        if let Some(element) = self.element {
            write!(f, "[{}]", element)?;
            if let Some(component) = self.component {
                write!(f, "[{}]", component)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::configuration(format!("invalid path '{}'", s));
        let s_trim = s.trim();
        let (segment, mut rest) = match s_trim.find('[') {
            Some(i) => (&s_trim[..i], &s_trim[i..]),
            None => (s_trim, ""),
        };
        if segment.contains(']') || (segment.is_empty() && !rest.is_empty()) {
            return Err(invalid());
        }

        let mut indices = Vec::with_capacity(2);
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[').ok_or_else(invalid)?;
            let close = inner.find(']').ok_or_else(invalid)?;
            let index = inner[..close].parse::<usize>().map_err(|_| invalid())?;
            indices.push(index);
            rest = &inner[close + 1..];
        }
        if indices.len() > 2 {
            return Err(invalid());
        }

        Ok(Path {
            segment: segment.to_string(),
            element: indices.first().copied(),
            component: indices.get(1).copied(),
        })
    }
}

impl TryFrom<String> for Path {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Path> for String {
    fn from(path: Path) -> Self {
        path.to_string()
    }
}

impl TryFrom<&str> for Path {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

/// Nesting state of one stream: container type and current indices.
///
/// Pure state machine; it never touches text. The writer and the reader
/// drive it with the same calls.
#[derive(Clone, Debug, Default)]
pub struct PathCursor {
    container: ContainerType,
    segment: Option<String>,
    element: Option<usize>,
    component: Option<usize>,
    value_written: bool,
}

impl PathCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(&self) -> ContainerType {
        self.container
    }

    pub fn in_segment(&self) -> bool {
        self.container != ContainerType::None
    }

    /// Enters a new segment and resets both indices.
    pub fn start_segment(&mut self, name: &str) -> Result<()> {
        if self.in_segment() {
            return Err(Error::structural(
                Some(self.path().to_string()),
                "segment name inside an open segment",
            ));
        }
        self.container = ContainerType::Segment;
        self.segment = Some(name.to_string());
        self.element = None;
        self.component = None;
        self.value_written = false;
        Ok(())
    }

    /// Advances to the next element. Directly after the segment name the
    /// first element is implicitly open, so the new element is index 1.
    pub fn start_element(&mut self) -> Result<()> {
        if !self.in_segment() {
            return Err(Error::structural(None, "element start outside of a segment"));
        }
        self.element = Some(self.element.map_or(1, |e| e + 1));
        self.component = None;
        self.value_written = false;
        self.container = ContainerType::Element;
        Ok(())
    }

    /// Advances to the next component of the current element.
    pub fn start_component(&mut self) -> Result<()> {
        match self.container {
            ContainerType::Element | ContainerType::Component => {
                self.component = Some(self.component.map_or(1, |c| c + 1));
                self.value_written = false;
                self.container = ContainerType::Component;
                Ok(())
            }
            ContainerType::Segment => Err(Error::structural(
                Some(self.path().to_string()),
                "component start directly inside a segment",
            )),
            ContainerType::None => Err(Error::structural(
                None,
                "component start outside of a segment",
            )),
        }
    }

    /// Moves to the position of the next value.
    ///
    /// Returns true when a second value in the same element implicitly
    /// started a new component.
    pub fn advance_value(&mut self) -> Result<bool> {
        if !self.in_segment() {
            return Err(Error::structural(None, "value outside of a segment"));
        }
        if self.element.is_none() {
            self.element = Some(0);
        }
        let implicit = match self.component {
            None => {
                self.component = Some(0);
                false
            }
            Some(c) if self.value_written => {
                self.component = Some(c + 1);
                true
            }
            Some(_) => false,
        };
        self.value_written = true;
        self.container = ContainerType::Component;
        Ok(implicit)
    }

    /// Leaves the current segment.
    pub fn end_segment(&mut self) -> Result<()> {
        if !self.in_segment() {
            return Err(Error::structural(
                None,
                "segment terminator outside of a segment",
            ));
        }
        *self = PathCursor::default();
        Ok(())
    }

    /// Path of the current position.
    pub fn path(&self) -> Path {
        match &self.segment {
            Some(segment) if self.in_segment() => Path {
                segment: segment.clone(),
                element: self.element,
                component: self.element.and(self.component),
            },
            _ => Path::root(),
        }
    }

    /// Current segment tag, if inside a segment.
    pub fn segment(&self) -> Option<&str> {
        if self.in_segment() {
            self.segment.as_deref()
        } else {
            None
        }
    }
}
