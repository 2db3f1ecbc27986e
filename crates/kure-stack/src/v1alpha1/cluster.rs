use kure_gvk::TypeTag;
use serde::{Deserialize, Serialize};

use crate::{
    config::impl_stack_config,
    tree,
    v1alpha1::{API_VERSION, GROUP, NodeReference, ObjectMeta, VERSION},
    validation::{Errors, Validator},
};

/// The top of a stack, pointing at the root node and carrying the GitOps
/// settings of the cluster.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRecord {
    pub api_version: String,
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: ClusterSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// The root node of the tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitops: Option<GitOpsConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitOpsConfig {
    #[serde(rename = "type")]
    pub tool: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<BootstrapConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BootstrapConfig {
    pub enabled: bool,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub flux_mode: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub flux_version: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub registry: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_url: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub source_ref: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub argocd_version: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub argocd_namespace: String,
}

impl Default for ClusterRecord {
    fn default() -> Self {
        Self::new("")
    }
}

impl ClusterRecord {
    pub const KIND: &str = "Cluster";

    pub fn type_tag() -> TypeTag {
        TypeTag::new(GROUP, VERSION, Self::KIND)
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_owned(),
            kind: Self::KIND.to_owned(),
            metadata: ObjectMeta::new(name),
            spec: ClusterSpec::default(),
        }
    }

    /// Clusters are the top of the tree, their path is their name.
    pub fn path(&self) -> String {
        self.metadata.name.clone()
    }

    pub fn validate(&self) -> Result<(), Errors> {
        let mut validator = Validator::new(Self::KIND, &self.metadata.name);

        if let Some(node) = &self.spec.node {
            validator.require(&node.name, "spec.node.name");
        }

        validator.finish()
    }
}

impl_stack_config!(ClusterRecord, VERSION);

impl From<&tree::GitOpsConfig> for GitOpsConfig {
    fn from(gitops: &tree::GitOpsConfig) -> Self {
        Self {
            tool: gitops.tool.clone(),
            bootstrap: gitops.bootstrap.as_ref().map(BootstrapConfig::from),
        }
    }
}

impl From<&GitOpsConfig> for tree::GitOpsConfig {
    fn from(gitops: &GitOpsConfig) -> Self {
        Self {
            tool: gitops.tool.clone(),
            bootstrap: gitops.bootstrap.as_ref().map(tree::BootstrapConfig::from),
        }
    }
}

impl From<&tree::BootstrapConfig> for BootstrapConfig {
    fn from(bootstrap: &tree::BootstrapConfig) -> Self {
        let tree::BootstrapConfig {
            enabled,
            flux_mode,
            flux_version,
            components,
            registry,
            image_pull_secrets,
            source_url,
            source_ref,
            argocd_version,
            argocd_namespace,
        } = bootstrap.clone();

        Self {
            enabled,
            flux_mode,
            flux_version,
            components,
            registry,
            image_pull_secrets,
            source_url,
            source_ref,
            argocd_version,
            argocd_namespace,
        }
    }
}

impl From<&BootstrapConfig> for tree::BootstrapConfig {
    fn from(bootstrap: &BootstrapConfig) -> Self {
        let BootstrapConfig {
            enabled,
            flux_mode,
            flux_version,
            components,
            registry,
            image_pull_secrets,
            source_url,
            source_ref,
            argocd_version,
            argocd_namespace,
        } = bootstrap.clone();

        Self {
            enabled,
            flux_mode,
            flux_version,
            components,
            registry,
            image_pull_secrets,
            source_url,
            source_ref,
            argocd_version,
            argocd_namespace,
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    fn cluster(tool: &str, flux_mode: &str) -> ClusterRecord {
        let mut record = ClusterRecord::new("prod");
        record.spec.node = Some(NodeReference::new("root"));
        record.spec.gitops = Some(GitOpsConfig {
            tool: tool.to_owned(),
            bootstrap: Some(BootstrapConfig {
                enabled: true,
                flux_mode: flux_mode.to_owned(),
                ..BootstrapConfig::default()
            }),
        });
        record
    }

    // The GitOps settings are handed to the workflow generators as they are
    #[rstest]
    #[case("flux", "")]
    #[case("flux", "flux-operator")]
    #[case("argocd", "")]
    #[case("jenkins", "helm")]
    fn valid_cluster(#[case] tool: &str, #[case] flux_mode: &str) {
        cluster(tool, flux_mode).validate().expect("cluster is valid");
    }

    #[rstest]
    #[case::name(|r: &mut ClusterRecord| r.metadata.name.clear(), "metadata.name")]
    #[case::root(|r: &mut ClusterRecord| r.spec.node = Some(NodeReference::new("")), "spec.node.name")]
    fn invalid_cluster(#[case] mutate: fn(&mut ClusterRecord), #[case] field: &str) {
        let mut record = cluster("flux", "");
        mutate(&mut record);

        let errors = record.validate().expect_err("cluster is invalid");
        assert_eq!(errors.len(), 1, "{errors}");
        assert!(errors.has_field(field), "{errors}");
    }

    #[test]
    fn root_reference_is_optional() {
        ClusterRecord::new("empty").validate().expect("cluster is valid");
    }

    #[test]
    fn gitops_type_field() {
        let spec: ClusterSpec = serde_yaml::from_str(indoc! {"
            node:
              name: root
            gitops:
              type: flux
              bootstrap:
                enabled: true
                fluxVersion: v2.4.0
                components: [source-controller, kustomize-controller]
        "})
        .expect("spec is valid");

        let gitops = spec.gitops.expect("gitops is set");
        assert_eq!(gitops.tool, "flux");

        let bootstrap = gitops.bootstrap.expect("bootstrap is set");
        assert_eq!(bootstrap.flux_version, "v2.4.0");
        assert_eq!(bootstrap.components.len(), 2);
    }

    #[test]
    fn gitops_round_trips_through_the_tree_model() {
        let gitops = cluster("flux", "flux-operator")
            .spec
            .gitops
            .expect("gitops is set");

        let model = tree::GitOpsConfig::from(&gitops);
        assert_eq!(GitOpsConfig::from(&model), gitops);
    }
}
