use std::fmt::Display;

use snafu::{Snafu, ensure};

/// Error variants which can be encountered when creating a [`TypeTag`] from
/// unparsed input.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseTypeTagError {
    #[snafu(display(
        "document type tag is incomplete, apiVersion {api_version:?} and kind {kind:?} must both be set"
    ))]
    MissingTag { api_version: String, kind: String },
}

/// Identifies a wire schema by its group, version and kind (GVK).
///
/// The group may be empty for core kinds. Version and kind are required for a
/// tag to be valid, which [`TypeTag::try_new`] and
/// [`TypeTag::from_api_version`] enforce.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeTag {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl TypeTag {
    /// Creates a new tag without validation. Use this for statically known
    /// tags.
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Creates a new tag, making sure version and kind are not empty.
    pub fn try_new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Result<Self, ParseTypeTagError> {
        let tag = Self::new(group, version, kind);

        ensure!(
            !tag.version.is_empty() && !tag.kind.is_empty(),
            MissingTagSnafu {
                api_version: tag.api_version(),
                kind: tag.kind.clone(),
            }
        );

        Ok(tag)
    }

    /// Parses a tag from the combined `apiVersion` field and the `kind` of a
    /// document.
    ///
    /// If `api_version` contains exactly one `/`, the left part is the group
    /// and the right part is the version. Otherwise the whole string is the
    /// version and the group is empty. Multi-slash input therefore ends up as
    /// a version which no registered schema will match.
    pub fn from_api_version(api_version: &str, kind: &str) -> Result<Self, ParseTypeTagError> {
        ensure!(
            !api_version.is_empty() && !kind.is_empty(),
            MissingTagSnafu { api_version, kind }
        );

        match api_version.split_once('/') {
            Some((group, version)) if !version.contains('/') => {
                Self::try_new(group, version, kind)
            }
            _ => Self::try_new("", api_version, kind),
        }
    }

    /// Returns the `apiVersion` wire form, `<group>/<version>` or just
    /// `<version>` for the core group.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Returns group and kind, the part of a tag shared by all versions of a
    /// schema.
    pub fn group_kind(&self) -> (&str, &str) {
        (&self.group, &self.kind)
    }

    /// Returns `true` if both tags share group and kind, which means they are
    /// versions of the same schema.
    pub fn same_group_kind(&self, other: &Self) -> bool {
        self.group_kind() == other.group_kind()
    }

    /// Returns a copy of this tag pointing at another version of the same
    /// group and kind.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            group: self.group.clone(),
            version: version.into(),
            kind: self.kind.clone(),
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}
