//! The unversioned, in-memory stack hierarchy.
//!
//! A [`Cluster`] owns every [`Node`] and [`Bundle`] of its tree. Nodes and
//! bundles refer to each other through [`NodeId`]s and [`BundleId`]s handed
//! out by the cluster, which keeps parent links, child lists and bundle
//! dependencies free of ownership cycles. Ids are only meaningful for the
//! cluster which created them.

use std::collections::BTreeMap;

use kure_gvk::TypeTag;

/// Identifies a [`Node`] within its [`Cluster`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Identifies a [`Bundle`] within its [`Cluster`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId(usize);

/// The root of a stack hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cluster {
    pub name: String,
    pub gitops: Option<GitOpsConfig>,

    root: Option<NodeId>,
    nodes: Vec<Node>,
    bundles: Vec<Bundle>,
}

impl Cluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_gitops(mut self, gitops: GitOpsConfig) -> Self {
        self.gitops = Some(gitops);
        self
    }

    /// Adds `node` and makes it the root of the tree. A previous root stays
    /// in the cluster but is no longer reachable through [`walk`](Self::walk).
    pub fn add_root(&mut self, node: Node) -> NodeId {
        let id = self.add_node(node);
        self.set_root(id);
        id
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Adds `node` without attaching it to any parent.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            ..node
        });
        id
    }

    /// Adds `node` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.add_node(node);
        self.attach_child(parent, id);
        id
    }

    /// Appends `child` to the children of `parent` and points its parent link
    /// back, detaching it from a previous parent. Attaching a child twice to
    /// the same parent has no effect.
    ///
    /// Returns `false` and leaves the tree untouched if `child` is `parent`
    /// itself or one of its ancestors, as the link would close a cycle.
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.is_ancestor(child, parent) {
            return false;
        }

        if let Some(previous) = self.nodes[child.0].parent.filter(|&p| p != parent) {
            self.nodes[previous.0].children.retain(|&id| id != child);
        }

        let children = &mut self.nodes[parent.0].children;
        if !children.contains(&child) {
            children.push(child);
        }
        self.nodes[child.0].parent = Some(parent);
        true
    }

    /// Returns `true` if `ancestor` is `id` or lies on its parent chain.
    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);

        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes[node.0].parent;
        }

        false
    }

    /// Adds `bundle` without attaching it to any node.
    pub fn add_bundle(&mut self, bundle: Bundle) -> BundleId {
        let id = BundleId(self.bundles.len());
        self.bundles.push(bundle);
        id
    }

    /// Adds `bundle` and attaches it to `node`, replacing the link to a
    /// previously attached bundle.
    pub fn set_bundle(&mut self, node: NodeId, bundle: Bundle) -> BundleId {
        let id = self.add_bundle(bundle);
        self.attach_bundle(node, id);
        id
    }

    /// Attaches an already added bundle to `node`.
    pub fn attach_bundle(&mut self, node: NodeId, bundle: BundleId) {
        self.nodes[node.0].bundle = Some(bundle);
    }

    /// Records that `bundle` must be reconciled after `depends_on`.
    pub fn add_dependency(&mut self, bundle: BundleId, depends_on: BundleId) {
        let dependencies = &mut self.bundles[bundle.0].depends_on;
        if !dependencies.contains(&depends_on) {
            dependencies.push(depends_on);
        }
    }

    /// # Panics
    ///
    /// Panics if `id` was not created by this cluster.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not created by this cluster.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not created by this cluster.
    pub fn bundle(&self, id: BundleId) -> &Bundle {
        &self.bundles[id.0]
    }

    /// # Panics
    ///
    /// Panics if `id` was not created by this cluster.
    pub fn bundle_mut(&mut self, id: BundleId) -> &mut Bundle {
        &mut self.bundles[id.0]
    }

    /// Returns the bundle attached to `node`, if any.
    pub fn node_bundle(&self, node: NodeId) -> Option<&Bundle> {
        self.node(node).bundle.map(|id| self.bundle(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn bundles(&self) -> impl Iterator<Item = (BundleId, &Bundle)> {
        self.bundles
            .iter()
            .enumerate()
            .map(|(i, bundle)| (BundleId(i), bundle))
    }

    /// Returns the slash-joined names of all ancestors of `id`, or an empty
    /// string for a node without parent.
    pub fn parent_path(&self, id: NodeId) -> String {
        self.node(id)
            .parent
            .map(|parent| self.node_path(parent))
            .unwrap_or_default()
    }

    /// Returns the slash-joined names from the topmost ancestor down to `id`,
    /// e.g. `root/apps/frontend`.
    pub fn node_path(&self, id: NodeId) -> String {
        let mut names = vec![self.node(id).name.as_str()];
        let mut current = self.node(id).parent;

        while let Some(parent) = current {
            let node = self.node(parent);
            names.push(&node.name);
            current = node.parent;
        }

        names.reverse();
        names.join("/")
    }

    /// Returns the ids of all nodes reachable from the root in pre-order,
    /// parents before their children and siblings in insertion order.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();

        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev());
        }

        order
    }

    /// Looks up a reachable node by its path, see [`node_path`](Self::node_path).
    pub fn find_node(&self, path: &str) -> Option<NodeId> {
        self.walk().into_iter().find(|&id| self.node_path(id) == path)
    }

    /// Looks up a bundle by name. Bundle names are unique within a cluster.
    pub fn find_bundle(&self, name: &str) -> Option<BundleId> {
        self.bundles().find(|(_, bundle)| bundle.name == name).map(|(id, _)| id)
    }
}

/// A named position in the tree. A node may own one [`Bundle`] and any
/// number of child nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub name: String,

    /// The package this node and everything below it is rendered into.
    pub package_ref: Option<TypeTag>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,

    parent: Option<NodeId>,
    children: Vec<NodeId>,
    bundle: Option<BundleId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_package_ref(mut self, package_ref: TypeTag) -> Self {
        self.package_ref = Some(package_ref);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn bundle(&self) -> Option<BundleId> {
        self.bundle
    }
}

/// A deployment unit: a set of applications reconciled together by the
/// GitOps tool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bundle {
    pub name: String,
    pub applications: Vec<Application>,
    pub source_ref: Option<SourceRef>,

    /// How often the bundle is reconciled, e.g. `10m`.
    pub interval: String,
    pub timeout: String,
    pub retry_interval: String,
    pub prune: bool,
    pub wait: bool,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,

    depends_on: Vec<BundleId>,
}

impl Bundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_application(mut self, application: Application) -> Self {
        self.applications.push(application);
        self
    }

    pub fn with_source_ref(mut self, source_ref: SourceRef) -> Self {
        self.source_ref = Some(source_ref);
        self
    }

    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }

    /// The bundles which must be reconciled before this one.
    pub fn depends_on(&self) -> &[BundleId] {
        &self.depends_on
    }
}

/// A leaf workload. The generator configuration is opaque to the stack and
/// carried along untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    pub namespace: String,

    /// The generator producing this application. Records fall back to the
    /// configured default generator when unset.
    pub generator: Option<TypeTag>,
    pub config: serde_yaml::Value,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_generator(mut self, generator: TypeTag) -> Self {
        self.generator = Some(generator);
        self
    }
}

/// Where the GitOps tool fetches a bundle's manifests from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceRef {
    /// The source kind, e.g. `GitRepository` or `OCIRepository`.
    pub kind: String,
    pub name: String,
    pub namespace: String,
    pub url: String,
    pub tag: String,
    pub branch: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GitOpsConfig {
    /// The GitOps tool, `flux` or `argocd`.
    pub tool: String,
    pub bootstrap: Option<BootstrapConfig>,
}

/// Settings for installing the GitOps tool into the cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootstrapConfig {
    pub enabled: bool,
    pub flux_mode: String,
    pub flux_version: String,
    pub components: Vec<String>,
    pub registry: String,
    pub image_pull_secrets: Vec<String>,
    pub source_url: String,
    pub source_ref: String,
    pub argocd_version: String,
    pub argocd_namespace: String,
}
