use crate::error::PathError;
use std::fmt;
use std::str::FromStr;

/// Dot-separated sequence of qualified element names, starting at the root.
///
/// Segments may carry a namespace prefix (`qemu:arg`); the colon is part of
/// the name and never a separator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    /// Segments between the root and the terminal segment.
    pub fn intermediate(&self) -> &[String] {
        match self.segments.len() {
            0..=2 => &[],
            n => &self.segments[1..n - 1],
        }
    }

    pub fn terminal(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(PathError::Empty);
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}
