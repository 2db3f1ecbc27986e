use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock},
};

use snafu::Snafu;
use tracing::{debug, warn};

use crate::TypeTag;

/// The error type converter functions may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A function migrating a value from one [`TypeTag`] to another.
pub type Converter<T> = Arc<dyn Fn(T) -> Result<T, BoxError> + Send + Sync>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("no conversion path from {from} to {to} is registered"))]
    NoConversionPath { from: TypeTag, to: TypeTag },

    #[snafu(display("failed to convert from {from} to {to}"))]
    Converter {
        source: BoxError,
        from: TypeTag,
        to: TypeTag,
    },
}

/// Holds the converter functions which migrate values of type `T` between
/// schema versions.
///
/// Converters are keyed by their source and target tags directly, so listing
/// the targets of a source never needs to parse tags back from strings.
/// Converting a tag into itself is always possible and returns the value
/// unchanged, identity converters are never stored.
///
/// Like [`Registry`](crate::Registry), registration takes an exclusive lock
/// and all other operations share a read lock.
pub struct ConversionRegistry<T> {
    converters: RwLock<HashMap<TypeTag, HashMap<TypeTag, Converter<T>>>>,
}

impl<T> Default for ConversionRegistry<T> {
    fn default() -> Self {
        Self {
            converters: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Debug for ConversionRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let converters = self
            .converters
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let mut paths: Vec<_> = converters
            .iter()
            .flat_map(|(from, targets)| targets.keys().map(move |to| format!("{from} -> {to}")))
            .collect();
        paths.sort();

        f.debug_struct("ConversionRegistry")
            .field("paths", &paths)
            .finish()
    }
}

impl<T> ConversionRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `converter` for the path from `from` to `to`, replacing any
    /// previously registered converter for the same path.
    ///
    /// Registering an identity path has no effect.
    pub fn register<F>(&self, from: TypeTag, to: TypeTag, converter: F)
    where
        F: Fn(T) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        if from == to {
            debug!(%from, "ignoring identity converter");
            return;
        }

        let mut converters = self
            .converters
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let replaced = converters
            .entry(from.clone())
            .or_default()
            .insert(to.clone(), Arc::new(converter))
            .is_some();

        if replaced {
            warn!(%from, %to, "replaced previously registered converter");
        } else {
            debug!(%from, %to, "registered converter");
        }
    }

    /// Converts `value` from `from` to `to`.
    pub fn convert(&self, from: &TypeTag, to: &TypeTag, value: T) -> Result<T, Error> {
        if from == to {
            return Ok(value);
        }

        // Run the converter without holding the lock
        let converter = self.converter(from, to);

        match converter {
            Some(converter) => converter(value).map_err(|source| Error::Converter {
                source,
                from: from.clone(),
                to: to.clone(),
            }),
            None => NoConversionPathSnafu {
                from: from.clone(),
                to: to.clone(),
            }
            .fail(),
        }
    }

    /// Returns `true` if [`convert`](Self::convert) would find a path from
    /// `from` to `to`, without running any converter.
    pub fn has_conversion(&self, from: &TypeTag, to: &TypeTag) -> bool {
        from == to || self.converter(from, to).is_some()
    }

    /// Returns every tag `from` can be converted into directly, in a stable
    /// order. The identity path is not included.
    pub fn list_conversions(&self, from: &TypeTag) -> Vec<TypeTag> {
        let mut targets: Vec<_> = self
            .converters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(from)
            .map(|targets| targets.keys().cloned().collect())
            .unwrap_or_default();

        targets.sort();
        targets
    }

    fn converter(&self, from: &TypeTag, to: &TypeTag) -> Option<Converter<T>> {
        self.converters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(from)
            .and_then(|targets| targets.get(to))
            .cloned()
    }
}
