//! Conversion between the in-memory [`Cluster`] tree and its flat list of
//! versioned records.
//!
//! Flattening walks the tree in pre-order, so parents always precede their
//! children in the output. Reconstruction builds all bundles first, then wires
//! bundle dependencies, then creates all nodes and finally links every node to
//! its children. Nodes are keyed by their path, which keeps equally named
//! nodes below different parents apart.

use std::collections::{HashMap, hash_map::Entry};

use kure_gvk::TypeTag;
use serde::{Deserialize, Serialize};
use snafu::{Snafu, ensure};
use strum::Display;
use tracing::{debug, instrument, warn};

use crate::{
    config::join_path,
    flat::FlatStack,
    tree::{Application, Bundle, BundleId, Cluster, Node, NodeId},
    v1alpha1::{
        ApplicationReference, BundleRecord, BundleReference, BundleSpec, ClusterRecord,
        ClusterSpec, NodeRecord, NodeReference, NodeSpec, PackageRef,
    },
};

pub const DEFAULT_APPLICATION_API_VERSION: &str = "generators.kure.dev/v1alpha1";
pub const DEFAULT_APPLICATION_KIND: &str = "AppWorkload";

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("{referenced_by:?} refers to {kind} {name:?} which does not exist"))]
    DanglingReference {
        kind: ReferenceKind,
        name: String,
        referenced_by: String,
    },

    #[snafu(display("{kind} {name:?} is defined more than once"))]
    DuplicateRecord { kind: &'static str, name: String },

    #[snafu(display("node {path:?} refers to itself or one of its ancestors as a child"))]
    CyclicReference { path: String },
}

/// The kind of object a record refers to by name.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ReferenceKind {
    Application,
    Bundle,
    Node,
}

/// How reconstruction treats references to objects which are not part of the
/// input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceMode {
    /// Fail with [`Error::DanglingReference`].
    #[default]
    Strict,

    /// Drop the reference and log a warning.
    Lenient,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConverterOptions {
    pub reference_mode: ReferenceMode,

    /// The generator recorded for applications which don't name one.
    pub default_application_api_version: String,
    pub default_application_kind: String,
}

impl Default for ConverterOptions {
    fn default() -> Self {
        Self {
            reference_mode: ReferenceMode::default(),
            default_application_api_version: DEFAULT_APPLICATION_API_VERSION.to_owned(),
            default_application_kind: DEFAULT_APPLICATION_KIND.to_owned(),
        }
    }
}

/// Moves a stack between its [`Cluster`] tree and its [`FlatStack`] of
/// records. The converter keeps no state between calls.
#[derive(Clone, Debug, Default)]
pub struct TreeConverter {
    options: ConverterOptions,
}

impl TreeConverter {
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Flattens `cluster` into one record per cluster, node and bundle.
    ///
    /// Only nodes reachable from the root are emitted, together with the
    /// bundles attached to them. Nodes and bundles appear in pre-order.
    #[instrument(skip_all, fields(cluster = %cluster.name))]
    pub fn tree_to_records(&self, cluster: &Cluster) -> FlatStack {
        let mut stack = FlatStack {
            cluster: ClusterRecord::new(&cluster.name),
            ..FlatStack::default()
        };

        stack.cluster.spec = ClusterSpec {
            node: cluster
                .root()
                .map(|root| NodeReference::new(&cluster.node(root).name)),
            gitops: cluster.gitops.as_ref().map(Into::into),
        };

        for id in cluster.walk() {
            let node = cluster.node(id);
            let path = cluster.node_path(id);

            let mut record = NodeRecord::new(&node.name);
            record.spec = NodeSpec {
                parent_path: cluster.parent_path(id),
                children: node
                    .children()
                    .iter()
                    .map(|&child| NodeReference::new(&cluster.node(child).name))
                    .collect(),
                bundle: cluster
                    .node_bundle(id)
                    .map(|bundle| BundleReference::new(&bundle.name)),
                package_ref: node.package_ref.as_ref().map(PackageRef::from),
                labels: node.labels.clone(),
                annotations: node.annotations.clone(),
            };
            stack.nodes.push(record);

            if let Some(bundle) = node.bundle() {
                stack.bundles.push(self.bundle_record(cluster, bundle, path));
            }
        }

        debug!(
            nodes = stack.nodes.len(),
            bundles = stack.bundles.len(),
            "flattened cluster"
        );

        stack
    }

    fn bundle_record(&self, cluster: &Cluster, id: BundleId, parent_path: String) -> BundleRecord {
        let bundle = cluster.bundle(id);

        let mut record = BundleRecord::new(&bundle.name);
        record.spec = BundleSpec {
            parent_path,
            depends_on: bundle
                .depends_on()
                .iter()
                .map(|&dependency| BundleReference::new(&cluster.bundle(dependency).name))
                .collect(),
            applications: bundle
                .applications
                .iter()
                .map(|application| self.application_reference(application))
                .collect(),
            source_ref: bundle.source_ref.as_ref().map(Into::into),
            interval: bundle.interval.clone(),
            timeout: bundle.timeout.clone(),
            retry_interval: bundle.retry_interval.clone(),
            prune: bundle.prune,
            wait: bundle.wait,
            labels: bundle.labels.clone(),
            annotations: bundle.annotations.clone(),
        };

        record
    }

    fn application_reference(&self, application: &Application) -> ApplicationReference {
        match &application.generator {
            Some(generator) => ApplicationReference {
                name: application.name.clone(),
                api_version: generator.api_version(),
                kind: generator.kind.clone(),
            },
            None => ApplicationReference {
                name: application.name.clone(),
                api_version: self.options.default_application_api_version.clone(),
                kind: self.options.default_application_kind.clone(),
            },
        }
    }

    /// Reconstructs the tree from its records.
    ///
    /// `applications` supplies the application objects bundles refer to by
    /// name. Records may be given in any order. References to missing records
    /// or applications are handled according to the configured
    /// [`ReferenceMode`]. If several applications share a name, the first one
    /// is used. A child link which would close a cycle always fails with
    /// [`Error::CyclicReference`].
    #[instrument(skip_all, fields(cluster = %cluster.metadata.name))]
    pub fn records_to_tree(
        &self,
        cluster: &ClusterRecord,
        nodes: &[NodeRecord],
        bundles: &[BundleRecord],
        applications: &[Application],
    ) -> Result<Cluster, Error> {
        let mut tree = Cluster::new(&cluster.metadata.name);
        tree.gitops = cluster.spec.gitops.as_ref().map(Into::into);

        // The first application with a given name wins
        let mut by_name: HashMap<&str, &Application> = HashMap::new();
        for application in applications {
            by_name.entry(application.name.as_str()).or_insert(application);
        }

        // Bundles, with their applications resolved
        let mut bundle_ids: HashMap<&str, BundleId> = HashMap::new();

        for record in bundles {
            let mut bundle = bundle_from_record(record);

            for reference in &record.spec.applications {
                match by_name.get(reference.name.as_str()) {
                    Some(&application) => bundle.applications.push(application.clone()),
                    None => self.dangling(
                        ReferenceKind::Application,
                        &reference.name,
                        &record.path(),
                    )?,
                }
            }

            match bundle_ids.entry(&record.metadata.name) {
                Entry::Occupied(_) => {
                    return DuplicateRecordSnafu {
                        kind: BundleRecord::KIND,
                        name: &record.metadata.name,
                    }
                    .fail();
                }
                Entry::Vacant(entry) => {
                    entry.insert(tree.add_bundle(bundle));
                }
            }
        }

        // Bundle dependencies
        for record in bundles {
            let id = bundle_ids[record.metadata.name.as_str()];

            for dependency in &record.spec.depends_on {
                match bundle_ids.get(dependency.name.as_str()) {
                    Some(&dependency) => tree.add_dependency(id, dependency),
                    None => {
                        self.dangling(ReferenceKind::Bundle, &dependency.name, &record.path())?;
                    }
                }
            }
        }

        // Nodes, with their bundles attached
        let mut node_ids: HashMap<String, NodeId> = HashMap::new();

        for record in nodes {
            let path = record.path();
            let id = match node_ids.entry(path) {
                Entry::Occupied(entry) => {
                    return DuplicateRecordSnafu {
                        kind: NodeRecord::KIND,
                        name: entry.key(),
                    }
                    .fail();
                }
                Entry::Vacant(entry) => *entry.insert(tree.add_node(node_from_record(record))),
            };

            if let Some(reference) = &record.spec.bundle {
                match bundle_ids.get(reference.name.as_str()) {
                    Some(&bundle) => tree.attach_bundle(id, bundle),
                    None => {
                        self.dangling(ReferenceKind::Bundle, &reference.name, &record.path())?;
                    }
                }
            }
        }

        // Parent and child links
        for record in nodes {
            let path = record.path();
            let id = node_ids[&path];

            for child in &record.spec.children {
                match node_ids.get(&join_path(&path, &child.name)) {
                    Some(&child) => {
                        ensure!(tree.attach_child(id, child), CyclicReferenceSnafu { path: &path });
                    }
                    None => self.dangling(ReferenceKind::Node, &child.name, &path)?,
                }
            }
        }

        if let Some(root) = &cluster.spec.node {
            match node_ids.get(&root.name) {
                Some(&root) => tree.set_root(root),
                None => self.dangling(
                    ReferenceKind::Node,
                    &root.name,
                    &cluster.metadata.name,
                )?,
            }
        }

        debug!(
            nodes = node_ids.len(),
            bundles = bundle_ids.len(),
            "reconstructed cluster"
        );

        Ok(tree)
    }

    /// Reconstructs the tree from a [`FlatStack`].
    pub fn stack_to_tree(
        &self,
        stack: &FlatStack,
        applications: &[Application],
    ) -> Result<Cluster, Error> {
        self.records_to_tree(&stack.cluster, &stack.nodes, &stack.bundles, applications)
    }

    fn dangling(&self, kind: ReferenceKind, name: &str, referenced_by: &str) -> Result<(), Error> {
        match self.options.reference_mode {
            ReferenceMode::Strict => DanglingReferenceSnafu {
                kind,
                name,
                referenced_by,
            }
            .fail(),
            ReferenceMode::Lenient => {
                warn!(%kind, name, referenced_by, "dropping reference to missing object");
                Ok(())
            }
        }
    }
}

fn node_from_record(record: &NodeRecord) -> Node {
    let mut node = Node::new(&record.metadata.name);
    node.package_ref = record.spec.package_ref.as_ref().map(TypeTag::from);
    node.labels.clone_from(&record.spec.labels);
    node.annotations.clone_from(&record.spec.annotations);
    node
}

fn bundle_from_record(record: &BundleRecord) -> Bundle {
    let spec = &record.spec;

    let mut bundle = Bundle::new(&record.metadata.name);
    bundle.source_ref = spec.source_ref.as_ref().map(Into::into);
    bundle.interval.clone_from(&spec.interval);
    bundle.timeout.clone_from(&spec.timeout);
    bundle.retry_interval.clone_from(&spec.retry_interval);
    bundle.prune = spec.prune;
    bundle.wait = spec.wait;
    bundle.labels.clone_from(&spec.labels);
    bundle.annotations.clone_from(&spec.annotations);
    bundle
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::tree::GitOpsConfig;

    fn converter(reference_mode: ReferenceMode) -> TreeConverter {
        TreeConverter::new(ConverterOptions {
            reference_mode,
            ..ConverterOptions::default()
        })
    }

    fn sample() -> Cluster {
        let mut cluster = Cluster::new("prod").with_gitops(GitOpsConfig {
            tool: "flux".to_owned(),
            bootstrap: None,
        });

        let root = cluster.add_root(Node::new("root"));
        let infra = cluster.add_child(root, Node::new("infra"));
        let infra_bundle = cluster.set_bundle(
            infra,
            Bundle::new("infra-bundle").with_application(Application::new("cert-manager")),
        );

        let apps = cluster.add_child(root, Node::new("apps"));
        let apps_bundle = cluster.set_bundle(
            apps,
            Bundle::new("apps-bundle").with_application(
                Application::new("web").with_generator(TypeTag::new("generators.kure.dev", "v1", "HelmChart")),
            ),
        );
        cluster.add_dependency(apps_bundle, infra_bundle);

        cluster
    }

    fn applications() -> Vec<Application> {
        vec![
            Application::new("cert-manager"),
            Application::new("web").with_generator(TypeTag::new("generators.kure.dev", "v1", "HelmChart")),
        ]
    }

    #[test]
    fn flattens_in_pre_order() {
        let stack = TreeConverter::default().tree_to_records(&sample());

        let paths: Vec<_> = stack.nodes.iter().map(NodeRecord::path).collect();
        assert_eq!(paths, ["root", "root/infra", "root/apps"]);

        let bundles: Vec<_> = stack.bundles.iter().map(BundleRecord::path).collect();
        assert_eq!(bundles, ["root/infra/infra-bundle", "root/apps/apps-bundle"]);

        assert_eq!(stack.cluster.spec.node, Some(NodeReference::new("root")));
        assert_eq!(stack.bundles[1].spec.depends_on, [BundleReference::new("infra-bundle")]);
    }

    #[test]
    fn application_generators() {
        let stack = TreeConverter::default().tree_to_records(&sample());

        let defaulted = &stack.bundles[0].spec.applications[0];
        assert_eq!(defaulted.api_version, DEFAULT_APPLICATION_API_VERSION);
        assert_eq!(defaulted.kind, DEFAULT_APPLICATION_KIND);

        let explicit = &stack.bundles[1].spec.applications[0];
        assert_eq!(explicit.api_version, "generators.kure.dev/v1");
        assert_eq!(explicit.kind, "HelmChart");
    }

    #[test]
    fn round_trip() {
        let original = sample();
        let converter = TreeConverter::default();

        let stack = converter.tree_to_records(&original);
        let rebuilt = converter
            .stack_to_tree(&stack, &applications())
            .expect("records are complete");

        // Both trees were built in pre-order, so even the ids line up
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn records_in_any_order() {
        let converter = TreeConverter::default();
        let mut stack = converter.tree_to_records(&sample());
        stack.nodes.reverse();
        stack.bundles.reverse();

        let rebuilt = converter
            .stack_to_tree(&stack, &applications())
            .expect("records are complete");

        let paths: Vec<_> = rebuilt.walk().into_iter().map(|id| rebuilt.node_path(id)).collect();
        assert_eq!(paths, ["root", "root/infra", "root/apps"]);

        let apps = rebuilt.find_node("root/apps").expect("apps exists");
        let bundle = rebuilt.node_bundle(apps).expect("apps has a bundle");
        let dependency = rebuilt.bundle(bundle.depends_on()[0]);
        assert_eq!(dependency.name, "infra-bundle");
    }

    #[test]
    fn same_name_under_different_parents() {
        let mut cluster = Cluster::new("prod");
        let root = cluster.add_root(Node::new("root"));
        let team_a = cluster.add_child(root, Node::new("team-a"));
        cluster.add_child(team_a, Node::new("monitoring").with_label("team", "a"));
        let team_b = cluster.add_child(root, Node::new("team-b"));
        cluster.add_child(team_b, Node::new("monitoring").with_label("team", "b"));

        let converter = TreeConverter::default();
        let rebuilt = converter
            .stack_to_tree(&converter.tree_to_records(&cluster), &[])
            .expect("records are complete");

        assert_eq!(rebuilt, cluster);
        let b = rebuilt.find_node("root/team-b/monitoring").expect("node exists");
        assert_eq!(rebuilt.node(b).labels["team"], "b");
    }

    #[rstest]
    #[case::application(
        |stack: &mut FlatStack| stack.bundles[0].spec.applications[0].name = "missing".to_owned(),
        ReferenceKind::Application
    )]
    #[case::dependency(
        |stack: &mut FlatStack| stack.bundles[1].spec.depends_on[0].name = "missing".to_owned(),
        ReferenceKind::Bundle
    )]
    #[case::bundle(
        |stack: &mut FlatStack| stack.nodes[1].spec.bundle = Some(BundleReference::new("missing")),
        ReferenceKind::Bundle
    )]
    #[case::child(
        |stack: &mut FlatStack| stack.nodes[0].spec.children[0].name = "missing".to_owned(),
        ReferenceKind::Node
    )]
    #[case::root(
        |stack: &mut FlatStack| stack.cluster.spec.node = Some(NodeReference::new("missing")),
        ReferenceKind::Node
    )]
    fn dangling_references(#[case] mutate: fn(&mut FlatStack), #[case] expected: ReferenceKind) {
        let mut stack = TreeConverter::default().tree_to_records(&sample());
        mutate(&mut stack);

        let err = converter(ReferenceMode::Strict)
            .stack_to_tree(&stack, &applications())
            .expect_err("reference dangles");
        assert!(
            matches!(&err, Error::DanglingReference { kind, name, .. } if *kind == expected && name == "missing"),
            "{err}"
        );

        converter(ReferenceMode::Lenient)
            .stack_to_tree(&stack, &applications())
            .expect("lenient mode drops the reference");
    }

    #[test]
    fn lenient_mode_drops_references() {
        let mut stack = TreeConverter::default().tree_to_records(&sample());
        stack.nodes[0].spec.children[0].name = "missing".to_owned();

        let rebuilt = converter(ReferenceMode::Lenient)
            .stack_to_tree(&stack, &applications())
            .expect("lenient mode drops the reference");

        let paths: Vec<_> = rebuilt.walk().into_iter().map(|id| rebuilt.node_path(id)).collect();
        assert_eq!(paths, ["root", "root/apps"]);
    }

    #[test]
    fn first_application_with_a_name_wins() {
        let mut first = Application::new("cert-manager");
        first.namespace = "first".to_owned();
        let mut second = Application::new("cert-manager");
        second.namespace = "second".to_owned();

        let stack = TreeConverter::default().tree_to_records(&sample());
        let rebuilt = TreeConverter::default()
            .stack_to_tree(&stack, &[first, second, applications()[1].clone()])
            .expect("records are complete");

        let bundle = rebuilt.find_bundle("infra-bundle").expect("bundle exists");
        assert_eq!(rebuilt.bundle(bundle).applications[0].namespace, "first");
    }

    #[rstest]
    #[case(ReferenceMode::Strict)]
    #[case(ReferenceMode::Lenient)]
    fn unnamed_node_cannot_be_its_own_child(#[case] reference_mode: ReferenceMode) {
        let mut cluster = ClusterRecord::new("prod");
        cluster.spec.node = Some(NodeReference::new(""));

        // Both the node and its child reference resolve to the empty path
        let mut node = NodeRecord::new("");
        node.spec.children = vec![NodeReference::new("")];

        let err = converter(reference_mode)
            .records_to_tree(&cluster, &[node], &[], &[])
            .expect_err("node refers to itself");
        assert_eq!(err, Error::CyclicReference {
            path: String::new()
        });
    }

    #[test]
    fn duplicate_bundle() {
        let mut stack = TreeConverter::default().tree_to_records(&sample());
        stack.bundles.push(stack.bundles[0].clone());

        let err = TreeConverter::default()
            .stack_to_tree(&stack, &applications())
            .expect_err("bundle is duplicated");
        assert_eq!(err, Error::DuplicateRecord {
            kind: "Bundle",
            name: "infra-bundle".to_owned(),
        });
    }

    #[test]
    fn duplicate_node_path() {
        let mut stack = TreeConverter::default().tree_to_records(&sample());
        stack.nodes.push(stack.nodes[1].clone());

        let err = TreeConverter::default()
            .stack_to_tree(&stack, &applications())
            .expect_err("node is duplicated");
        assert_eq!(err, Error::DuplicateRecord {
            kind: "Node",
            name: "root/infra".to_owned(),
        });
    }

    #[test]
    fn options_from_yaml() {
        let options: ConverterOptions =
            serde_yaml::from_str("referenceMode: lenient\n").expect("options are valid");

        assert_eq!(options.reference_mode, ReferenceMode::Lenient);
        assert_eq!(options.default_application_kind, DEFAULT_APPLICATION_KIND);
    }

    #[test]
    fn empty_cluster() {
        let converter = TreeConverter::default();
        let stack = converter.tree_to_records(&Cluster::new("empty"));

        assert!(stack.nodes.is_empty());
        assert_eq!(stack.cluster.spec.node, None);

        let rebuilt = converter.stack_to_tree(&stack, &[]).expect("nothing to resolve");
        assert_eq!(rebuilt, Cluster::new("empty"));
    }
}
