//! Versioned configuration records for Kure stacks.
//!
//! A stack describes what gets deployed to a cluster as a tree of
//! [`Cluster`](tree::Cluster) → [`Node`](tree::Node) →
//! [`Bundle`](tree::Bundle) → [`Application`](tree::Application). On disk the
//! tree is stored as a flat list of versioned records, one document per
//! cluster, node and bundle, which refer to each other by name.
//!
//! - [`tree`] holds the unversioned in-memory model.
//! - [`v1alpha1`] holds the records of version `v1alpha1`.
//! - [`convert::TreeConverter`] moves a stack between both forms.
//! - [`flat::FlatStack`] reads, validates and writes record streams.
//!
//! ```
//! use kure_stack::{
//!     convert::TreeConverter,
//!     tree::{Bundle, Cluster, Node},
//! };
//!
//! let mut cluster = Cluster::new("prod");
//! let root = cluster.add_root(Node::new("root"));
//! let apps = cluster.add_child(root, Node::new("apps"));
//! cluster.set_bundle(apps, Bundle::new("apps-bundle").with_interval("10m"));
//!
//! let converter = TreeConverter::default();
//! let stack = converter.tree_to_records(&cluster);
//! stack.validate().expect("records are valid");
//!
//! let rebuilt = converter.stack_to_tree(&stack, &[]).expect("records are complete");
//! assert_eq!(rebuilt, cluster);
//! ```

use kure_gvk::Registry;

pub mod config;
pub mod convert;
pub mod flat;
pub mod tree;
pub mod v1alpha1;
pub mod validation;

pub use config::StackConfig;
pub use convert::{ConverterOptions, ReferenceMode, TreeConverter};
pub use flat::FlatStack;

/// Returns a registry knowing every stack record of every version.
pub fn scheme() -> Registry<Box<dyn StackConfig>> {
    let registry = Registry::new();
    v1alpha1::register(&registry);
    registry
}
