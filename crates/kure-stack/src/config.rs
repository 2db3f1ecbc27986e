use std::any::Any;

use kure_gvk::{Named, Schema, TypeTag};
use snafu::Snafu;

use crate::validation;

#[derive(Debug, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConversionError {
    #[snafu(display("cannot convert {tag} to version {version:?}, no such version exists"))]
    UnsupportedVersion { tag: TypeTag, version: String },

    #[snafu(display("cannot convert a {from} into a {to}"))]
    IncompatibleRecord { from: TypeTag, to: TypeTag },
}

/// The common surface of every versioned stack record.
///
/// Records are handed out as `Box<dyn StackConfig>` by the registry returned
/// from [`scheme`](crate::scheme). Concrete records are recovered with
/// [`downcast_ref`](dyn StackConfig::downcast_ref) or
/// [`downcast`](dyn StackConfig::downcast).
pub trait StackConfig: Schema + Named + 'static {
    fn api_version(&self) -> &str;
    fn kind(&self) -> &str;
    fn tag(&self) -> TypeTag;
    fn name(&self) -> &str;
    fn namespace(&self) -> &str;

    /// The slash-joined position of this record in the tree, e.g.
    /// `root/apps/frontend`.
    fn path(&self) -> String;

    /// Checks the record in isolation, references to other records are not
    /// resolved.
    fn validate(&self) -> Result<(), validation::Errors>;

    /// Converts this record into `version` of its kind.
    fn convert_to(&self, version: &str) -> Result<Box<dyn StackConfig>, ConversionError>;

    /// Replaces the contents of `self` with `from`, which may be any version
    /// of the same kind.
    fn convert_from(&mut self, from: &dyn StackConfig) -> Result<(), ConversionError>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn clone_box(&self) -> Box<dyn StackConfig>;
}

impl dyn StackConfig {
    pub fn downcast_ref<T: StackConfig>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Recovers the concrete record, or [`None`] if `self` is of another
    /// type.
    pub fn downcast<T: StackConfig>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast().ok()
    }
}

impl Clone for Box<dyn StackConfig> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Joins a parent path and a name the way record paths are built.
pub(crate) fn join_path(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() {
        name.to_owned()
    } else {
        format!("{parent_path}/{name}")
    }
}

/// Implements [`Schema`], [`Named`] and [`StackConfig`] for a record with
/// `metadata` and `spec` fields.
macro_rules! impl_stack_config {
    ($record:ty, $version:expr) => {
        impl ::kure_gvk::Named for $record {
            fn set_name(&mut self, name: &str) {
                name.clone_into(&mut self.metadata.name);
            }

            fn set_namespace(&mut self, namespace: &str) {
                namespace.clone_into(&mut self.metadata.namespace);
            }
        }

        impl ::kure_gvk::Schema for $record {
            fn decode_spec(&mut self, spec: ::serde_yaml::Value) -> Result<(), ::serde_yaml::Error> {
                ::kure_gvk::schema::decode_spec_value(&mut self.spec, spec)
            }

            fn encode_spec(&self) -> Result<::serde_yaml::Value, ::serde_yaml::Error> {
                ::kure_gvk::schema::encode_spec_value(&self.spec)
            }

            fn is_default_spec(&self) -> bool {
                ::kure_gvk::schema::is_default_value(&self.spec)
            }

            fn named_mut(&mut self) -> Option<&mut dyn ::kure_gvk::Named> {
                Some(self)
            }
        }

        impl $crate::config::StackConfig for $record {
            fn api_version(&self) -> &str {
                &self.api_version
            }

            fn kind(&self) -> &str {
                &self.kind
            }

            fn tag(&self) -> ::kure_gvk::TypeTag {
                <$record>::type_tag()
            }

            fn name(&self) -> &str {
                &self.metadata.name
            }

            fn namespace(&self) -> &str {
                &self.metadata.namespace
            }

            fn path(&self) -> String {
                <$record>::path(self)
            }

            fn validate(&self) -> Result<(), $crate::validation::Errors> {
                <$record>::validate(self)
            }

            fn convert_to(
                &self,
                version: &str,
            ) -> Result<Box<dyn $crate::config::StackConfig>, $crate::config::ConversionError> {
                ::snafu::ensure!(
                    version == $version,
                    $crate::config::UnsupportedVersionSnafu {
                        tag: <$record>::type_tag(),
                        version,
                    }
                );
                Ok(Box::new(self.clone()))
            }

            fn convert_from(
                &mut self,
                from: &dyn $crate::config::StackConfig,
            ) -> Result<(), $crate::config::ConversionError> {
                match from.downcast_ref::<$record>() {
                    Some(record) => {
                        self.clone_from(record);
                        Ok(())
                    }
                    None => $crate::config::IncompatibleRecordSnafu {
                        from: from.tag(),
                        to: <$record>::type_tag(),
                    }
                    .fail(),
                }
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: Box<Self>) -> Box<dyn ::std::any::Any> {
                self
            }

            fn clone_box(&self) -> Box<dyn $crate::config::StackConfig> {
                Box::new(self.clone())
            }
        }
    };
}

pub(crate) use impl_stack_config;
