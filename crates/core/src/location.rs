//! Normalized artifact coordinates.
//!
//! A [`Location`] is the slash-separated path of an artifact inside a single
//! repository (the "gav" coordinate space, e.g. `com/acme/lib/1.0/lib-1.0.jar`).
//! It is always stored without leading or trailing slashes and can never
//! contain `.` or `..` segments, so it is safe to hand to storage backends.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the Maven metadata index file.
///
/// Deploys of this file are exempt from the redeployment restriction because
/// build tools rewrite it on every publish.
pub const METADATA_FILE: &str = "maven-metadata.xml";

/// A normalized, slash-separated artifact path relative to one repository.
///
/// Equality and hashing are based on the normalized path string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location(String);

impl Location {
    /// The empty location, addressing the root of a repository.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Parse and normalize a raw path.
    ///
    /// Leading/trailing slashes and empty segments are stripped; `.` and `..`
    /// segments, backslashes and NUL bytes are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.contains('\\') || raw.contains('\0') {
            return Err(Error::InvalidLocation(format!(
                "illegal character in path: {raw:?}"
            )));
        }

        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" => continue,
                "." | ".." => {
                    return Err(Error::InvalidLocation(format!(
                        "path traversal not allowed: {raw}"
                    )));
                }
                other => segments.push(other),
            }
        }

        Ok(Self(segments.join("/")))
    }

    /// The normalized path string, without a leading slash.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the repository root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Last path segment, or the empty string for the root location.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Parent location, or `None` for the root.
    pub fn parent(&self) -> Option<Location> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Location(self.0[..idx].to_string())),
            None => Some(Location::root()),
        }
    }

    /// File extension of the last segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.simple_name();
        match name.rfind('.') {
            Some(idx) if idx + 1 < name.len() => Some(&name[idx + 1..]),
            _ => None,
        }
    }

    /// Append a child path, normalizing the result.
    pub fn resolve(&self, child: &str) -> Result<Location> {
        if self.is_root() {
            Location::parse(child)
        } else {
            Location::parse(&format!("{}/{}", self.0, child))
        }
    }

    /// Whether this location lies at or under the given prefix location.
    pub fn starts_with(&self, prefix: &Location) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.0 == prefix.0 || self.0.starts_with(&format!("{}/", prefix.0))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({})", self.0)
    }
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Location::parse(s)
    }
}

impl TryFrom<String> for Location {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Location::parse(&value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.0
    }
}
