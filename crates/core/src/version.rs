//! Version domains.
//!
//! Dogus and components are versioned differently and the two must never be
//! compared with each other:
//! - [`DoguVersion`]: `major[.minor[.patch[.extra]]][-nano]`, e.g. `1.2.3-4`
//! - [`ComponentVersion`]: strict semantic versioning (the `semver` crate)

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use semver::Version as ComponentVersion;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("dogu version must not be empty")]
    Empty,
    #[error("dogu version {raw:?}: invalid number {part:?}")]
    InvalidNumber { raw: String, part: String },
    #[error("dogu version {0:?} has more than four dot separated parts")]
    TooManyParts(String),
}

/// Dogu version. Ordering compares `major, minor, patch, extra, nano` in that
/// order; the raw string is kept for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DoguVersion {
    raw: String,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub extra: u64,
    pub nano: u64,
}

impl DoguVersion {
    pub fn raw(&self) -> &str { &self.raw }

    fn key(&self) -> (u64, u64, u64, u64, u64) {
        (self.major, self.minor, self.patch, self.extra, self.nano)
    }

    pub fn is_newer_than(&self, other: &DoguVersion) -> bool { self > other }
}

fn parse_number(raw: &str, part: &str) -> Result<u64, VersionError> {
    part.parse::<u64>().map_err(|_| VersionError::InvalidNumber { raw: raw.to_string(), part: part.to_string() })
}

impl FromStr for DoguVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() { return Err(VersionError::Empty); }
        let (core, nano) = match raw.split_once('-') {
            Some((core, nano)) => (core, parse_number(raw, nano)?),
            None => (raw, 0),
        };
        let mut nums = [0u64; 4];
        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() > nums.len() { return Err(VersionError::TooManyParts(raw.to_string())); }
        for (slot, part) in nums.iter_mut().zip(parts.iter()) {
            *slot = parse_number(raw, part)?;
        }
        Ok(Self { raw: raw.to_string(), major: nums[0], minor: nums[1], patch: nums[2], extra: nums[3], nano })
    }
}

impl fmt::Display for DoguVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.raw) }
}

impl TryFrom<String> for DoguVersion {
    type Error = VersionError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<DoguVersion> for String {
    fn from(v: DoguVersion) -> Self { v.raw }
}

impl PartialEq for DoguVersion {
    fn eq(&self, other: &Self) -> bool { self.key() == other.key() }
}

impl Eq for DoguVersion {}

impl Hash for DoguVersion {
    fn hash<H: Hasher>(&self, state: &mut H) { self.key().hash(state) }
}

impl PartialOrd for DoguVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for DoguVersion {
    fn cmp(&self, other: &Self) -> Ordering { self.key().cmp(&other.key()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DoguVersion { s.parse().unwrap() }

    #[test]
    fn parses_full_version() {
        let x = v("1.2.3-4");
        assert_eq!((x.major, x.minor, x.patch, x.extra, x.nano), (1, 2, 3, 0, 4));
        assert_eq!(x.to_string(), "1.2.3-4");
    }

    #[test]
    fn nano_and_extra_take_part_in_ordering() {
        assert!(v("1.2.3-2") > v("1.2.3-1"));
        assert!(v("1.2.3.1-1") > v("1.2.3-9"));
        assert!(v("1.10.0-1") > v("1.9.9-9"));
        assert!(v("1.2.3-4").is_newer_than(&v("1.1.1-1")));
        assert_eq!(v("1.2.3"), v("1.2.3-0"));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<DoguVersion>().unwrap_err(), VersionError::Empty);
        assert!("1.x.3-1".parse::<DoguVersion>().is_err());
        assert!("1.2.3-a".parse::<DoguVersion>().is_err());
        assert!("1.2.3.4.5".parse::<DoguVersion>().is_err());
    }

    #[test]
    fn component_versions_are_strict_semver() {
        assert!("1.2".parse::<ComponentVersion>().is_err());
        assert!("1.2.3-1".parse::<ComponentVersion>().unwrap() < "1.2.3".parse::<ComponentVersion>().unwrap());
    }
}
