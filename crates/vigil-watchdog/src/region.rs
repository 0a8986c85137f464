//! Region paths
//!
//! A [`RegionPath`] names the DOM container a watchdog repairs, as the chain
//! of container ids from the body down (`body/mainContent/tabContent`).
//! Two regions conflict when one is a prefix of the other: repairing
//! `body` rewrites everything below it.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Hierarchical container path used as the mutual-exclusion key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionPath(Vec<String>);

impl RegionPath {
    /// Create a path from container ids
    ///
    /// # Errors
    /// Returns error if any segment is empty or contains characters other
    /// than alphanumerics, `_` and `-`.
    pub fn new<I, S>(segments: I) -> Result<Self, RegionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(RegionError::Empty);
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self(segments))
    }

    /// The `body` region
    #[inline]
    #[must_use]
    pub fn body() -> Self {
        Self(vec!["body".to_string()])
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Innermost container id
    #[inline]
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Enclosing region, `None` at the top
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Nested region
    ///
    /// # Errors
    /// Returns error if `segment` is not a valid container id.
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, RegionError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut next = self.clone();
        next.0.push(segment);
        Ok(next)
    }

    /// Check if this region contains `other` (or is the same region)
    #[inline]
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0 == other.0[..self.0.len()]
    }

    /// Check if two regions conflict (one contains the other)
    #[inline]
    #[must_use]
    pub fn conflicts_with(&self, other: &Self) -> bool {
        self.contains(other) || other.contains(self)
    }
}

fn validate_segment(segment: &str) -> Result<(), RegionError> {
    if segment.is_empty() {
        return Err(RegionError::EmptySegment);
    }
    if segment
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && c != '_' && c != '-')
    {
        return Err(RegionError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

impl Display for RegionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for RegionPath {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.split('/'))
    }
}

impl TryFrom<String> for RegionPath {
    type Error = RegionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RegionPath> for String {
    fn from(value: RegionPath) -> Self {
        value.to_string()
    }
}

/// Errors related to region paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    /// No segments at all
    #[error("region path is empty")]
    Empty,

    /// Empty segment in path
    #[error("region path contains empty segment")]
    EmptySegment,

    /// Invalid segment characters
    #[error("invalid region segment: {0} (must be alphanumeric, '_' or '-')")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(s: &str) -> RegionPath {
        s.parse().unwrap()
    }

    #[test]
    fn parses_and_displays() {
        let p = path("body/mainContent/tabContent");
        assert_eq!(p.depth(), 3);
        assert_eq!(p.leaf(), "tabContent");
        assert_eq!(p.to_string(), "body/mainContent/tabContent");
    }

    #[test]
    fn rejects_bad_segments() {
        assert_eq!("".parse::<RegionPath>(), Err(RegionError::EmptySegment));
        assert_eq!("a//b".parse::<RegionPath>(), Err(RegionError::EmptySegment));
        assert!(matches!(
            "body/tab content".parse::<RegionPath>(),
            Err(RegionError::InvalidSegment(_))
        ));
    }

    #[test]
    fn dashed_ids_are_valid() {
        assert!("body/main-nav".parse::<RegionPath>().is_ok());
    }

    #[test]
    fn nested_regions_conflict() {
        let body = RegionPath::body();
        let tab = path("body/mainContent/tabContent");
        let nav = path("body/main-nav");

        assert!(body.conflicts_with(&tab));
        assert!(tab.conflicts_with(&body));
        assert!(tab.conflicts_with(&tab));
        assert!(!tab.conflicts_with(&nav));
    }

    #[test]
    fn sibling_prefix_strings_do_not_conflict() {
        // "tab" is a string prefix of "tabContent" but not a path prefix
        let a = path("body/tab");
        let b = path("body/tabContent");
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn parent_and_child() {
        let tab = path("body/mainContent/tabContent");
        assert_eq!(tab.parent(), Some(path("body/mainContent")));
        assert_eq!(RegionPath::body().parent(), None);
        assert_eq!(RegionPath::body().child("mainContent").unwrap(), path("body/mainContent"));
    }
}
