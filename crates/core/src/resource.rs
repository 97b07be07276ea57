// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource cache identity and type-resolution chain.
//!
//! A resource cache is identified by its declared type, version, source,
//! params, and the versioned-resource-type graph used to resolve custom
//! types down to a base resource type. The resolution collaborator supplies
//! all of it pre-resolved; this module only walks the graph.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Resource version: an ordered map of version fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub BTreeMap<String, String>);

impl Version {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Single-field version, the common case in fixtures.
    pub fn single(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.into(), value.into());
        Self(map)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{}:{}", k, v)?;
            first = false;
        }
        Ok(())
    }
}

/// Opaque resource source configuration. Ordered for stable cache keys.
pub type Source = BTreeMap<String, String>;
/// Opaque resource params. Ordered for stable cache keys.
pub type Params = BTreeMap<String, String>;

/// One hop in the type-resolution graph: a custom resource type pinned at a
/// version, declared in terms of another (custom or base) type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedResourceType {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub source: Source,
    pub version: Version,
}

/// Identity of a resource cache, supplied opaquely by the resource
/// configuration collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCache {
    /// Declared resource type name (possibly a custom type)
    pub resource_type: String,
    pub version: Version,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub params: Params,
    /// Versioned-resource-type graph used to resolve `resource_type` down
    /// to a base resource type
    #[serde(default)]
    pub resource_types: Vec<VersionedResourceType>,
}

impl ResourceCache {
    /// Stable logical key for this cache.
    ///
    /// Covers every identity field, including the resolution graph; all
    /// maps are ordered so equal descriptors render the same key on every
    /// worker.
    pub fn cache_key(&self) -> String {
        let mut key = String::new();
        key.push_str(&self.resource_type);
        key.push('|');
        push_map(&mut key, &self.version.0);
        key.push('|');
        push_map(&mut key, &self.source);
        key.push('|');
        push_map(&mut key, &self.params);
        for t in &self.resource_types {
            key.push('|');
            key.push_str(&t.name);
            key.push(':');
            key.push_str(&t.type_name);
            key.push(':');
            push_map(&mut key, &t.version.0);
            push_map(&mut key, &t.source);
        }
        key
    }

    /// Walk the type graph from the declared type down to its base type.
    ///
    /// The base type is the first name with no entry in `resource_types`.
    /// Returns `None` on a malformed graph (a custom-type cycle).
    pub fn resolve_base_type(&self) -> Option<BaseTypeResolution> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = self.resource_type.as_str();
        let mut custom_type_version = None;

        loop {
            match self.resource_types.iter().find(|t| t.name == current) {
                Some(hop) => {
                    if !seen.insert(current) {
                        return None;
                    }
                    // The declared type's own version is the lineage answer
                    if custom_type_version.is_none() {
                        custom_type_version = Some(hop.version.clone());
                    }
                    current = hop.type_name.as_str();
                }
                None => {
                    return Some(BaseTypeResolution {
                        base_type_name: current.to_string(),
                        custom_type_version,
                    });
                }
            }
        }
    }
}

fn push_map(out: &mut String, map: &BTreeMap<String, String>) {
    for (k, v) in map {
        out.push_str(k);
        out.push('=');
        out.push_str(v);
        out.push(';');
    }
}

/// Result of resolving a resource cache's type chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTypeResolution {
    /// Name of the base resource type the chain bottoms out at
    pub base_type_name: String,
    /// Version of the declared custom type, `None` when the declared type
    /// is itself a base type
    pub custom_type_version: Option<Version>,
}

/// A base resource type as currently advertised by a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResourceTypeRef {
    pub name: String,
    pub version: String,
}

/// Full lineage of a resource cache volume: enough for a caller to verify
/// cache validity without a second round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeResourceType {
    /// Base type name and the version currently advertised at the chain
    /// origin worker
    pub base_resource_type: BaseResourceTypeRef,
    /// The declared custom type's own version, if the type is custom
    pub resource_type_version: Option<Version>,
    /// The resource cache's version
    pub version: Version,
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
