use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock},
};

use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};

use crate::{
    TypeTag,
    gvk::ParseTypeTagError,
    order::sort_tags_by_version,
};

type Result<T, E = Error> = std::result::Result<T, E>;

/// A zero-argument constructor producing a fresh value for one [`TypeTag`].
pub type Factory<T> = Arc<dyn Fn() -> T + Send + Sync>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("unknown type {tag}, no factory is registered for it"))]
    UnknownType { tag: TypeTag },

    #[snafu(display("failed to parse type tag"))]
    InvalidTag { source: ParseTypeTagError },
}

/// Maps [`TypeTag`]s to factories producing values of type `T`.
///
/// Registries are meant to be created once at startup and shared by
/// reference. Registration takes an exclusive lock, all other operations
/// share a read lock, so concurrent registration and creation is safe.
///
/// Registering a second factory for the same tag replaces the first one.
pub struct Registry<T> {
    factories: RwLock<HashMap<TypeTag, Factory<T>>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.tags())
            .finish()
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for `tag`, replacing any previously registered
    /// factory.
    pub fn register<F>(&self, tag: TypeTag, factory: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if factories.insert(tag.clone(), Arc::new(factory)).is_some() {
            warn!(%tag, "replaced previously registered factory");
        } else {
            debug!(%tag, "registered factory");
        }
    }

    /// Creates a fresh value for `tag`.
    pub fn create(&self, tag: &TypeTag) -> Result<T> {
        // The factory is cloned out of the map so it runs without holding the
        // lock. Factories may therefore use the registry themselves.
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tag)
            .cloned();

        match factory {
            Some(factory) => Ok(factory()),
            None => UnknownTypeSnafu { tag: tag.clone() }.fail(),
        }
    }

    /// Creates a fresh value for the tag described by the raw `apiVersion` and
    /// `kind` fields of a document.
    ///
    /// See [`TypeTag::from_api_version`] for how `api_version` is split.
    pub fn create_from_api_version(&self, api_version: &str, kind: &str) -> Result<T> {
        let tag = TypeTag::from_api_version(api_version, kind).context(InvalidTagSnafu)?;
        self.create(&tag)
    }

    /// Returns `true` if a factory is registered for `tag`.
    pub fn has(&self, tag: &TypeTag) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(tag)
    }

    /// Returns all registered tags in a stable order.
    pub fn tags(&self) -> Vec<TypeTag> {
        let mut tags: Vec<_> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();

        tags.sort();
        tags
    }

    /// Returns all registered versions of `group` and `kind`, oldest first.
    pub fn versions_of(&self, group: &str, kind: &str) -> Vec<TypeTag> {
        let mut tags: Vec<_> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|tag| tag.group == group && tag.kind == kind)
            .cloned()
            .collect();

        sort_tags_by_version(&mut tags);
        tags
    }

    /// Returns the newest registered version of `group` and `kind`.
    pub fn preferred(&self, group: &str, kind: &str) -> Option<TypeTag> {
        self.versions_of(group, kind).pop()
    }

    pub fn len(&self) -> usize {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
