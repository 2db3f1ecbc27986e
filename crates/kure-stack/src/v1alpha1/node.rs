use std::collections::BTreeMap;

use kure_gvk::TypeTag;
use serde::{Deserialize, Serialize};

use crate::{
    config::{impl_stack_config, join_path},
    v1alpha1::{API_VERSION, BundleReference, GROUP, NodeReference, ObjectMeta, PackageRef, VERSION},
    validation::{Errors, Validator},
};

/// One position in the tree, linking to its children and its bundle.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub api_version: String,
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: NodeSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    /// The path of the parent node, empty for the root node.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<BundleReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_ref: Option<PackageRef>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Default for NodeRecord {
    fn default() -> Self {
        Self::new("")
    }
}

impl NodeRecord {
    pub const KIND: &str = "Node";

    pub fn type_tag() -> TypeTag {
        TypeTag::new(GROUP, VERSION, Self::KIND)
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
            kind: Self::KIND.to_owned(),
            metadata: ObjectMeta::new(name),
            spec: NodeSpec::default(),
        }
    }

    pub fn path(&self) -> String {
        join_path(&self.spec.parent_path, &self.metadata.name)
    }

    /// The paths of the child nodes this record refers to.
    pub fn child_paths(&self) -> impl Iterator<Item = String> {
        let path = self.path();
        self.spec
            .children
            .iter()
            .map(move |child| join_path(&path, &child.name))
    }

    pub fn validate(&self) -> Result<(), Errors> {
        let mut validator = Validator::new(Self::KIND, &self.metadata.name);

        if self.metadata.name.contains('/') {
            validator.error("metadata.name", "name must not contain '/'");
        }

        for (index, child) in self.spec.children.iter().enumerate() {
            let field = format!("spec.children[{index}].name");
            validator.require(&child.name, field.clone());

            if child.name.contains('/') {
                validator.error(field, "name must not contain '/'");
            }
        }

        validator.unique(
            "spec.children",
            self.spec.children.iter().map(|child| child.name.as_str()),
            |name| format!("child {name:?}"),
        );

        if let Some(bundle) = &self.spec.bundle {
            validator.require(&bundle.name, "spec.bundle.name");
        }

        if let Some(package_ref) = &self.spec.package_ref {
            validator.require(&package_ref.version, "spec.packageRef.version");
            validator.require(&package_ref.kind, "spec.packageRef.kind");
        }

        validator.finish()
    }
}

impl_stack_config!(NodeRecord, VERSION);
