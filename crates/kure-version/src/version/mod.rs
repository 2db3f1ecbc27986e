use std::{cmp::Ordering, fmt::Display, num::ParseIntError, str::FromStr, sync::LazyLock};

use regex::Regex;
use snafu::{OptionExt, ResultExt, Snafu};

use crate::{Level, ParseLevelError};

static VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v(?P<major>\d+)(?:\.(?P<minor>\d+)(?:\.(?P<patch>\d+))?)?(?P<level>[a-z][a-z0-9]*)?$",
    )
    .expect("failed to compile version regex")
});

/// Error variants which can be encountered when creating a new [`Version`] from
/// unparsed input.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseVersionError {
    #[snafu(display(
        "invalid version format {input:?}, expected v<MAJOR>(.<MINOR>(.<PATCH>))(alpha|beta<LEVEL>)"
    ))]
    InvalidFormat { input: String },

    #[snafu(display("failed to parse {component} version component"))]
    ParseComponent {
        source: ParseIntError,
        component: &'static str,
    },

    #[snafu(display("failed to parse version level"))]
    ParseLevel { source: ParseLevelError },
}

/// A Kubernetes-style resource version, for example `v1`, `v2beta1` or
/// `v1alpha2`. Minor and patch components are optional and default to `0`.
///
/// Versions are totally ordered. The numeric components are compared first,
/// then the level, where a missing level (stable) ranks above any beta, and
/// any beta ranks above any alpha:
///
/// `v1alpha1 < v1alpha2 < v1beta1 < v1 < v2alpha1 < v2`
///
/// ### See
///
/// - <https://kubernetes.io/docs/tasks/extend-kubernetes/custom-resources/custom-resource-definition-versioning/#version-priority>
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub level: Option<Level>,
}

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let captures = VERSION_REGEX
            .captures(input)
            .context(InvalidFormatSnafu { input })?;

        let component = |name: &'static str| -> Result<u64, ParseVersionError> {
            captures.name(name).map_or(Ok(0), |m| {
                m.as_str()
                    .parse::<u64>()
                    .context(ParseComponentSnafu { component: name })
            })
        };

        let major = component("major")?;
        let minor = component("minor")?;
        let patch = component("patch")?;

        let level = captures
            .name("level")
            .map(|level| Level::from_str(level.as_str()))
            .transpose()
            .context(ParseLevelSnafu)?;

        Ok(Self {
            major,
            minor,
            patch,
            level,
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.level, &other.level) {
                (Some(lhs), Some(rhs)) => lhs.cmp(rhs),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.major)?;

        if self.patch > 0 {
            write!(f, ".{}.{}", self.minor, self.patch)?;
        } else if self.minor > 0 {
            write!(f, ".{}", self.minor)?;
        }

        match &self.level {
            Some(level) => write!(f, "{level}"),
            None => Ok(()),
        }
    }
}

impl Version {
    pub fn new(major: u64, level: Option<Level>) -> Self {
        Self {
            major,
            minor: 0,
            patch: 0,
            level,
        }
    }

    /// Returns `true` if this version has no alpha or beta level.
    pub fn is_stable(&self) -> bool {
        self.level.is_none()
    }
}
