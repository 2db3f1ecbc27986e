use std::collections::BTreeMap;

use kure_gvk::TypeTag;
use serde::{Deserialize, Serialize};

use crate::{
    config::{impl_stack_config, join_path},
    v1alpha1::{
        API_VERSION, ApplicationReference, BundleReference, GROUP, ObjectMeta, SourceRef, VERSION,
    },
    validation::{Errors, Validator},
};

/// A deployment unit with its applications, source and reconcile settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleRecord {
    pub api_version: String,
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: BundleSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSpec {
    /// The path of the node owning this bundle.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent_path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<BundleReference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applications: Vec<ApplicationReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref: Option<SourceRef>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub interval: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timeout: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub retry_interval: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub prune: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub wait: bool,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Default for BundleRecord {
    fn default() -> Self {
        Self::new("")
    }
}

impl BundleRecord {
    pub const KIND: &str = "Bundle";

    pub fn type_tag() -> TypeTag {
        TypeTag::new(GROUP, VERSION, Self::KIND)
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
            kind: Self::KIND.to_owned(),
            metadata: ObjectMeta::new(name),
            spec: BundleSpec::default(),
        }
    }

    pub fn path(&self) -> String {
        join_path(&self.spec.parent_path, &self.metadata.name)
    }

    pub fn validate(&self) -> Result<(), Errors> {
        let name = &self.metadata.name;
        let mut validator = Validator::new(Self::KIND, name);

        validator.interval(&self.spec.interval, "spec.interval");
        validator.interval(&self.spec.timeout, "spec.timeout");
        validator.interval(&self.spec.retry_interval, "spec.retryInterval");

        if let Some(source_ref) = &self.spec.source_ref {
            validator.require(&source_ref.kind, "spec.sourceRef.kind");
            validator.require(&source_ref.name, "spec.sourceRef.name");
        }

        for (index, application) in self.spec.applications.iter().enumerate() {
            validator.require(&application.name, format!("spec.applications[{index}].name"));
        }

        validator.unique(
            "spec.applications",
            self.spec.applications.iter().map(|application| {
                (
                    application.api_version.as_str(),
                    application.kind.as_str(),
                    application.name.as_str(),
                )
            }),
            |(api_version, kind, name)| {
                format!("application {name:?} of kind {kind:?} in {api_version:?}")
            },
        );

        for (index, dependency) in self.spec.depends_on.iter().enumerate() {
            let field = format!("spec.dependsOn[{index}].name");
            validator.require(&dependency.name, field.clone());

            if !name.is_empty() && dependency.name == *name {
                validator.error(field, "bundle must not depend on itself");
            }
        }

        validator.unique(
            "spec.dependsOn",
            self.spec
                .depends_on
                .iter()
                .map(|dependency| dependency.name.as_str()),
            |name| format!("dependency {name:?}"),
        );

        validator.finish()
    }
}

impl_stack_config!(BundleRecord, VERSION);
