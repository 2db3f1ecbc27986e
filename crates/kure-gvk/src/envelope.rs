//! The [`TypedEnvelope`] codec.
//!
//! Decoding is an explicit two-step pipeline. The first pass only reads the
//! `apiVersion` and `kind` of a document, which are used to ask the
//! [`Registry`] for a fresh value of the matching schema. The second pass reads
//! `metadata` as an untyped mapping and decodes the `spec` subtree into that
//! value. The dispatch table lives in the registry, so new schemas never
//! require changes to the codec.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::{
    Registry, TypeTag,
    gvk::ParseTypeTagError,
    registry,
    schema::Schema,
};

type Result<T, E = Error> = std::result::Result<T, E>;

const API_VERSION_KEY: &str = "apiVersion";
const KIND_KEY: &str = "kind";
const METADATA_KEY: &str = "metadata";
const SPEC_KEY: &str = "spec";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to deserialize document type information"))]
    DeserializeTypeMeta { source: serde_yaml::Error },

    #[snafu(display("document has no valid type tag"))]
    MissingTag { source: ParseTypeTagError },

    #[snafu(display("failed to resolve schema for document"))]
    UnknownType { source: registry::Error },

    #[snafu(display("failed to deserialize document"))]
    DeserializeDocument { source: serde_yaml::Error },

    #[snafu(display("failed to decode spec of {tag}"))]
    SpecDecode {
        source: serde_yaml::Error,
        tag: TypeTag,
    },

    #[snafu(display("failed to encode spec of {api_version}, Kind={kind}"))]
    EncodeSpec {
        source: serde_yaml::Error,
        api_version: String,
        kind: String,
    },

    #[snafu(display("failed to serialize document"))]
    SerializeDocument { source: serde_yaml::Error },
}

/// Only the type information of a document, read during the first decoding
/// pass. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeMeta {
    #[serde(default)]
    api_version: String,

    #[serde(default)]
    kind: String,
}

/// The untyped parts of a document, read during the second decoding pass.
#[derive(Debug, Default, Deserialize)]
struct RawDocument {
    #[serde(default)]
    metadata: Option<Mapping>,

    #[serde(default)]
    spec: Option<Value>,
}

/// A decoded value together with the type tag and metadata of the document it
/// came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedEnvelope<T> {
    pub api_version: String,
    pub kind: String,

    /// Untyped document metadata. At least `name` and `namespace` are
    /// recognized, everything else is carried along untouched.
    pub metadata: Mapping,

    pub spec: T,
}

impl<T> TypedEnvelope<T> {
    /// Wraps `spec` in an envelope tagged with `tag` and empty metadata.
    pub fn new(tag: &TypeTag, spec: T) -> Self {
        Self {
            api_version: tag.api_version(),
            kind: tag.kind.clone(),
            metadata: Mapping::new(),
            spec,
        }
    }

    /// Sets a metadata field, replacing a previous value.
    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(Value::from(key), value.into());
        self
    }

    pub fn with_name(self, name: &str) -> Self {
        self.with_metadata("name", name)
    }

    pub fn with_namespace(self, namespace: &str) -> Self {
        self.with_metadata("namespace", namespace)
    }

    /// Returns the `metadata.name` string field, if any.
    pub fn name(&self) -> Option<&str> {
        self.metadata_str("name")
    }

    /// Returns the `metadata.namespace` string field, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.metadata_str("namespace")
    }

    /// Parses the type tag of this envelope.
    pub fn tag(&self) -> Result<TypeTag, ParseTypeTagError> {
        TypeTag::from_api_version(&self.api_version, &self.kind)
    }

    /// Replaces the spec, keeping tag and metadata.
    pub fn map_spec<U>(self, f: impl FnOnce(T) -> U) -> TypedEnvelope<U> {
        TypedEnvelope {
            api_version: self.api_version,
            kind: self.kind,
            metadata: self.metadata,
            spec: f(self.spec),
        }
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

impl<T: Schema> TypedEnvelope<T> {
    /// Decodes a single document, resolving its schema through `registry`.
    pub fn decode(registry: &Registry<T>, input: &[u8]) -> Result<Self> {
        // First pass: detect the type tag
        let type_meta: TypeMeta =
            serde_yaml::from_slice(input).context(DeserializeTypeMetaSnafu)?;

        let tag = TypeTag::from_api_version(&type_meta.api_version, &type_meta.kind)
            .context(MissingTagSnafu)?;

        let mut spec = registry.create(&tag).context(UnknownTypeSnafu)?;

        // Second pass: decode the full document
        let document: RawDocument =
            serde_yaml::from_slice(input).context(DeserializeDocumentSnafu)?;

        match document.spec {
            None | Some(Value::Null) => {}
            Some(value) => spec
                .decode_spec(value)
                .context(SpecDecodeSnafu { tag: tag.clone() })?,
        }

        let metadata = document.metadata.unwrap_or_default();

        // Metadata is authoritative over anything the spec carried
        if let Some(named) = spec.named_mut() {
            if let Some(name) = metadata.get("name").and_then(Value::as_str) {
                named.set_name(name);
            }
            if let Some(namespace) = metadata.get("namespace").and_then(Value::as_str) {
                named.set_namespace(namespace);
            }
        }

        debug!(%tag, "decoded document");

        Ok(Self {
            api_version: type_meta.api_version,
            kind: type_meta.kind,
            metadata,
            spec,
        })
    }

    /// Encodes the envelope as an ordered mapping of `apiVersion`, `kind`,
    /// `metadata` and `spec`.
    ///
    /// `metadata` is omitted when empty and `spec` is omitted when it equals
    /// the default value of its type.
    pub fn encode(&self) -> Result<Value> {
        let mut document = Mapping::new();
        document.insert(API_VERSION_KEY.into(), self.api_version.clone().into());
        document.insert(KIND_KEY.into(), self.kind.clone().into());

        if !self.metadata.is_empty() {
            document.insert(METADATA_KEY.into(), Value::Mapping(self.metadata.clone()));
        }

        if !self.spec.is_default_spec() {
            let spec = self.spec.encode_spec().context(EncodeSpecSnafu {
                api_version: self.api_version.clone(),
                kind: self.kind.clone(),
            })?;
            document.insert(SPEC_KEY.into(), spec);
        }

        Ok(Value::Mapping(document))
    }

    /// Encodes the envelope as a YAML document.
    pub fn to_yaml(&self) -> Result<String> {
        let document = self.encode()?;
        serde_yaml::to_string(&document).context(SerializeDocumentSnafu)
    }
}

impl<T: Schema> Serialize for TypedEnvelope<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.encode()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde::Deserialize;

    use super::*;
    use crate::schema::{Named, decode_spec_value, encode_spec_value, is_default_value};

    #[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    struct AppSpec {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        image: String,

        #[serde(default)]
        replicas: u32,

        #[serde(skip)]
        name: String,

        #[serde(skip)]
        namespace: String,
    }

    impl Named for AppSpec {
        fn set_name(&mut self, name: &str) {
            name.clone_into(&mut self.name);
        }

        fn set_namespace(&mut self, namespace: &str) {
            namespace.clone_into(&mut self.namespace);
        }
    }

    impl Schema for AppSpec {
        fn decode_spec(&mut self, spec: Value) -> Result<(), serde_yaml::Error> {
            decode_spec_value(self, spec)
        }

        fn encode_spec(&self) -> Result<Value, serde_yaml::Error> {
            encode_spec_value(self)
        }

        fn is_default_spec(&self) -> bool {
            is_default_value(self)
        }

        fn named_mut(&mut self) -> Option<&mut dyn Named> {
            Some(self)
        }
    }

    fn app_tag() -> TypeTag {
        TypeTag::new("apps.example.dev", "v1", "App")
    }

    fn registry() -> Registry<AppSpec> {
        let registry = Registry::new();
        registry.register(app_tag(), AppSpec::default);
        registry
    }

    #[test]
    fn decode() {
        let input = indoc! {"
            apiVersion: apps.example.dev/v1
            kind: App
            metadata:
              name: frontend
              namespace: web
              labels:
                tier: edge
            spec:
              image: nginx:1.27
              replicas: 3
        "};

        let envelope =
            TypedEnvelope::decode(&registry(), input.as_bytes()).expect("document must decode");

        assert_eq!(envelope.name(), Some("frontend"));
        assert_eq!(envelope.namespace(), Some("web"));
        assert_eq!(envelope.tag().expect("tag is valid"), app_tag());
        assert_eq!(envelope.spec.image, "nginx:1.27");
        assert_eq!(envelope.spec.replicas, 3);
        assert_eq!(envelope.spec.name, "frontend");
        assert_eq!(envelope.spec.namespace, "web");
        assert!(envelope.metadata.contains_key("labels"));
    }

    #[test]
    fn decode_without_spec() {
        let input = "apiVersion: apps.example.dev/v1\nkind: App\n";
        let envelope =
            TypedEnvelope::decode(&registry(), input.as_bytes()).expect("document must decode");

        assert!(envelope.metadata.is_empty());
        assert_eq!(envelope.spec, AppSpec::default());
    }

    #[test]
    fn missing_tag() {
        let input = "kind: App\nspec:\n  replicas: 1\n";
        let err = TypedEnvelope::decode(&registry(), input.as_bytes())
            .expect_err("apiVersion is missing");
        assert!(matches!(err, Error::MissingTag { .. }));
    }

    #[test]
    fn unknown_type() {
        let input = "apiVersion: apps.example.dev/v2\nkind: App\n";
        let err = TypedEnvelope::decode(&registry(), input.as_bytes())
            .expect_err("version is not registered");
        assert!(matches!(err, Error::UnknownType { .. }));
    }

    #[test]
    fn spec_decode_error() {
        let input = "apiVersion: apps.example.dev/v1\nkind: App\nspec:\n  replicas: many\n";
        let err = TypedEnvelope::decode(&registry(), input.as_bytes())
            .expect_err("replicas is not a number");
        assert!(matches!(err, Error::SpecDecode { tag, .. } if tag == app_tag()));
    }

    #[test]
    fn encode_omits_default_spec_and_empty_metadata() {
        let envelope = TypedEnvelope::new(&app_tag(), AppSpec::default());
        assert_eq!(
            envelope.to_yaml().expect("envelope must encode"),
            "apiVersion: apps.example.dev/v1\nkind: App\n"
        );
    }

    #[test]
    fn encode_is_ordered() {
        let envelope = TypedEnvelope::new(
            &app_tag(),
            AppSpec {
                image: "nginx".to_owned(),
                replicas: 2,
                ..AppSpec::default()
            },
        )
        .with_name("frontend");

        assert_eq!(
            envelope.to_yaml().expect("envelope must encode"),
            indoc! {"
                apiVersion: apps.example.dev/v1
                kind: App
                metadata:
                  name: frontend
                spec:
                  image: nginx
                  replicas: 2
            "}
        );
    }

    #[test]
    fn round_trip() {
        let envelope = TypedEnvelope::new(
            &app_tag(),
            AppSpec {
                image: "redis:7".to_owned(),
                replicas: 1,
                name: "cache".to_owned(),
                namespace: "data".to_owned(),
            },
        )
        .with_name("cache")
        .with_namespace("data");

        let yaml = envelope.to_yaml().expect("envelope must encode");
        let decoded =
            TypedEnvelope::decode(&registry(), yaml.as_bytes()).expect("document must decode");

        assert_eq!(decoded, envelope);
    }
}
