//! Qualified names (`namespace/name`) for dogus and components.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("qualified name {0:?} must have the form \"namespace/name\"")]
    Malformed(String),
}

/// Name of a dogu or component without its namespace, e.g. `ldap`.
///
/// Used as the map key everywhere: two entries with the same simple name are the
/// same entity, even if their namespaces differ.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct SimpleName(String);

impl SimpleName {
    pub fn new(s: impl Into<String>) -> Self { Self(s.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for SimpleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for SimpleName {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl From<String> for SimpleName {
    fn from(s: String) -> Self { Self(s) }
}

impl std::borrow::Borrow<str> for SimpleName {
    fn borrow(&self) -> &str { &self.0 }
}

/// Namespace part of a qualified name, e.g. `official` or `k8s`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(s: impl Into<String>) -> Self { Self(s.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// `namespace/simpleName`. Serialized as a single string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    pub namespace: Namespace,
    pub simple_name: SimpleName,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, simple_name: impl Into<String>) -> Self {
        Self { namespace: Namespace::new(namespace), simple_name: SimpleName::new(simple_name) }
    }

    /// Empty-part checks; returns one message per missing part.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.namespace.is_empty() { out.push("namespace must not be empty".to_string()); }
        if self.simple_name.is_empty() { out.push("name must not be empty".to_string()); }
        out
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.simple_name)
    }
}

/// Parses `namespace/name`. Empty parts are accepted here and reported by validation.
impl FromStr for QualifiedName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((ns, name)) if !name.contains('/') => Ok(Self::new(ns, name)),
            _ => Err(NameError::Malformed(s.to_string())),
        }
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = NameError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<QualifiedName> for String {
    fn from(n: QualifiedName) -> Self { n.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespace_and_name() {
        let n: QualifiedName = "official/ldap".parse().unwrap();
        assert_eq!(n.namespace.as_str(), "official");
        assert_eq!(n.simple_name.as_str(), "ldap");
        assert_eq!(n.to_string(), "official/ldap");
    }

    #[test]
    fn rejects_missing_or_extra_separators() {
        assert!("ldap".parse::<QualifiedName>().is_err());
        assert!("a/b/c".parse::<QualifiedName>().is_err());
    }

    #[test]
    fn empty_parts_are_problems_not_parse_errors() {
        let n: QualifiedName = "/ldap".parse().unwrap();
        assert_eq!(n.problems(), vec!["namespace must not be empty".to_string()]);
        assert_eq!(QualifiedName::default().problems().len(), 2);
    }

    #[test]
    fn serde_uses_string_form() {
        let n = QualifiedName::new("k8s", "k8s-dogu-operator");
        let s = serde_json::to_string(&n).unwrap();
        assert_eq!(s, "\"k8s/k8s-dogu-operator\"");
        let back: QualifiedName = serde_json::from_str(&s).unwrap();
        assert_eq!(back, n);
    }
}
