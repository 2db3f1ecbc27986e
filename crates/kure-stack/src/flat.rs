use kure_gvk::{Registry, TypedEnvelope, parse};
use kure_shared::yaml::{self, SerializeOptions};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::debug;

use crate::{
    config::StackConfig,
    v1alpha1::{BundleRecord, ClusterRecord, NodeRecord},
    validation::Errors,
};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse stack documents"))]
    ParseDocuments { source: parse::Error },

    #[snafu(display("stack contains no Cluster record"))]
    MissingCluster,

    #[snafu(display("stack contains more than one Cluster record, found {first:?} and {second:?}"))]
    MultipleClusters { first: String, second: String },

    #[snafu(display("record {name:?} of type {tag} is not a stack record"))]
    UnsupportedRecord { name: String, tag: String },

    #[snafu(display("failed to encode stack record {name:?}"))]
    EncodeRecord {
        source: kure_gvk::envelope::Error,
        name: String,
    },

    #[snafu(display("failed to write stack documents"))]
    WriteDocuments { source: yaml::Error },
}

/// The flat, versioned form of a stack: one cluster record plus all node and
/// bundle records, each kept in the order they were produced or read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatStack {
    pub cluster: ClusterRecord,
    pub nodes: Vec<NodeRecord>,
    pub bundles: Vec<BundleRecord>,
}

impl FlatStack {
    /// Sorts decoded records by kind. Exactly one cluster record is required.
    pub fn from_envelopes<I>(envelopes: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = TypedEnvelope<Box<dyn StackConfig>>>,
    {
        let mut cluster: Option<ClusterRecord> = None;
        let mut nodes = Vec::new();
        let mut bundles = Vec::new();

        for envelope in envelopes {
            let record = envelope.spec;
            let name = record.name().to_owned();
            let tag = record.tag();

            if tag == ClusterRecord::type_tag() {
                let record = record
                    .downcast::<ClusterRecord>()
                    .context(UnsupportedRecordSnafu { name, tag: tag.to_string() })?;

                if let Some(first) = &cluster {
                    return MultipleClustersSnafu {
                        first: &first.metadata.name,
                        second: &record.metadata.name,
                    }
                    .fail();
                }
                cluster = Some(*record);
            } else if tag == NodeRecord::type_tag() {
                let record = record
                    .downcast::<NodeRecord>()
                    .context(UnsupportedRecordSnafu { name, tag: tag.to_string() })?;
                nodes.push(*record);
            } else if tag == BundleRecord::type_tag() {
                let record = record
                    .downcast::<BundleRecord>()
                    .context(UnsupportedRecordSnafu { name, tag: tag.to_string() })?;
                bundles.push(*record);
            } else {
                return UnsupportedRecordSnafu { name, tag: tag.to_string() }.fail();
            }
        }

        let cluster = cluster.context(MissingClusterSnafu)?;
        debug!(
            cluster = %cluster.metadata.name,
            nodes = nodes.len(),
            bundles = bundles.len(),
            "collected stack records"
        );

        Ok(Self {
            cluster,
            nodes,
            bundles,
        })
    }

    /// Decodes a multi-document YAML stream into a stack.
    pub fn decode(registry: &Registry<Box<dyn StackConfig>>, input: &[u8]) -> Result<Self, Error> {
        let envelopes = parse::parse_multiple(registry, input).context(ParseDocumentsSnafu)?;
        Self::from_envelopes(envelopes)
    }

    /// Validates every record and returns all findings at once.
    pub fn validate(&self) -> Result<(), Errors> {
        let mut errors = Errors::default();

        for record in self.records() {
            if let Err(err) = record.validate() {
                errors.extend(err);
            }
        }

        errors.into_result()
    }

    /// Returns all records, cluster first, then nodes, then bundles.
    pub fn records(&self) -> impl Iterator<Item = &dyn StackConfig> {
        std::iter::once(&self.cluster as &dyn StackConfig)
            .chain(self.nodes.iter().map(|record| record as &dyn StackConfig))
            .chain(self.bundles.iter().map(|record| record as &dyn StackConfig))
    }

    /// Wraps every record in an envelope carrying its name and namespace.
    pub fn envelopes(&self) -> Vec<TypedEnvelope<Box<dyn StackConfig>>> {
        self.records()
            .map(|record| {
                let envelope = TypedEnvelope::new(&record.tag(), record.clone_box())
                    .with_name(record.name());

                match record.namespace() {
                    "" => envelope,
                    namespace => envelope.with_namespace(namespace),
                }
            })
            .collect()
    }

    /// Encodes the stack as a multi-document YAML stream.
    pub fn to_yaml(&self) -> Result<String, Error> {
        let documents = self
            .envelopes()
            .iter()
            .map(|envelope| {
                envelope.encode().context(EncodeRecordSnafu {
                    name: envelope.name().unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        yaml::to_string_documents(&documents, SerializeOptions::default())
            .context(WriteDocumentsSnafu)
    }
}
