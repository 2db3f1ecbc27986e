//! The capability surface a schema exposes to [`TypedEnvelope`](crate::TypedEnvelope).
//!
//! [`Schema`] is object-safe, so registries can hand out trait objects like
//! `Box<dyn Schema>` (or any trait extending it). Types which are plain serde
//! data can implement the codec methods with the generic helpers in this
//! module.

use serde::{Serialize, de::DeserializeOwned};

/// Mutators for object metadata. Schemas which implement this receive the
/// `metadata.name` and `metadata.namespace` of the document they were decoded
/// from.
pub trait Named {
    fn set_name(&mut self, name: &str);
    fn set_namespace(&mut self, namespace: &str);
}

/// Codec operations used when decoding and encoding the `spec` of a
/// document.
pub trait Schema: std::fmt::Debug + Send + Sync {
    /// Replaces the contents of `self` with the decoded `spec` subtree.
    fn decode_spec(&mut self, spec: serde_yaml::Value) -> Result<(), serde_yaml::Error>;

    /// Encodes the `spec` subtree of `self`.
    fn encode_spec(&self) -> Result<serde_yaml::Value, serde_yaml::Error>;

    /// Returns `true` if the spec is structurally equal to its type's default
    /// value, in which case encoding omits it.
    fn is_default_spec(&self) -> bool;

    /// Returns the metadata mutators if this schema supports them.
    fn named_mut(&mut self) -> Option<&mut dyn Named> {
        None
    }
}

impl<S: Schema + ?Sized> Schema for Box<S> {
    fn decode_spec(&mut self, spec: serde_yaml::Value) -> Result<(), serde_yaml::Error> {
        (**self).decode_spec(spec)
    }

    fn encode_spec(&self) -> Result<serde_yaml::Value, serde_yaml::Error> {
        (**self).encode_spec()
    }

    fn is_default_spec(&self) -> bool {
        (**self).is_default_spec()
    }

    fn named_mut(&mut self) -> Option<&mut dyn Named> {
        (**self).named_mut()
    }
}

/// Decodes `spec` into `target`, replacing its previous value.
pub fn decode_spec_value<T>(target: &mut T, spec: serde_yaml::Value) -> Result<(), serde_yaml::Error>
where
    T: DeserializeOwned,
{
    *target = serde_yaml::from_value(spec)?;
    Ok(())
}

/// Encodes `value` as an untyped YAML value.
pub fn encode_spec_value<T>(value: &T) -> Result<serde_yaml::Value, serde_yaml::Error>
where
    T: Serialize,
{
    serde_yaml::to_value(value)
}

/// Returns `true` if `value` equals `T::default()`.
pub fn is_default_value<T>(value: &T) -> bool
where
    T: Default + PartialEq,
{
    *value == T::default()
}
