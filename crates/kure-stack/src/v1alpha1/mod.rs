//! Version `v1alpha1` of the stack records.
//!
//! Each level of the tree is stored as its own record, see [`ClusterRecord`],
//! [`NodeRecord`] and [`BundleRecord`]. Records refer to each other by name
//! and locate themselves in the tree through their `spec.parentPath`.

use kure_gvk::{Registry, TypeTag};
use serde::{Deserialize, Serialize};

use crate::{config::StackConfig, tree};

mod bundle;
mod cluster;
mod node;

pub use bundle::*;
pub use cluster::*;
pub use node::*;

pub const GROUP: &str = "stack.kure.dev";
pub const VERSION: &str = "v1alpha1";
pub const API_VERSION: &str = "stack.kure.dev/v1alpha1";

/// Registers the factories of all `v1alpha1` records.
pub fn register(registry: &Registry<Box<dyn StackConfig>>) {
    registry.register(ClusterRecord::type_tag(), || -> Box<dyn StackConfig> {
        Box::new(ClusterRecord::default())
    });
    registry.register(NodeRecord::type_tag(), || -> Box<dyn StackConfig> {
        Box::new(NodeRecord::default())
    });
    registry.register(BundleRecord::type_tag(), || -> Box<dyn StackConfig> {
        Box::new(BundleRecord::default())
    });
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
        }
    }
}

/// Refers to another [`NodeRecord`] by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

impl NodeReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_version: API_VERSION.to_owned(),
        }
    }
}

/// Refers to a [`BundleRecord`] by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

impl BundleReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_version: API_VERSION.to_owned(),
        }
    }
}

/// Refers to an application by name, together with the generator which
/// produces it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationReference {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// The type tag of a package, spelled out field by field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub kind: String,
}

impl From<&TypeTag> for PackageRef {
    fn from(tag: &TypeTag) -> Self {
        Self {
            group: tag.group.clone(),
            version: tag.version.clone(),
            kind: tag.kind.clone(),
        }
    }
}

impl From<&PackageRef> for TypeTag {
    fn from(package_ref: &PackageRef) -> Self {
        Self::new(
            &package_ref.group,
            &package_ref.version,
            &package_ref.kind,
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub branch: String,
}

impl From<&tree::SourceRef> for SourceRef {
    fn from(source_ref: &tree::SourceRef) -> Self {
        let tree::SourceRef {
            kind,
            name,
            namespace,
            url,
            tag,
            branch,
        } = source_ref.clone();

        Self {
            kind,
            name,
            namespace,
            url,
            tag,
            branch,
        }
    }
}

impl From<&SourceRef> for tree::SourceRef {
    fn from(source_ref: &SourceRef) -> Self {
        let SourceRef {
            kind,
            name,
            namespace,
            url,
            tag,
            branch,
        } = source_ref.clone();

        Self {
            kind,
            name,
            namespace,
            url,
            tag,
            branch,
        }
    }
}
