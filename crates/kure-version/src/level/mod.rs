use std::{cmp::Ordering, fmt::Display, num::ParseIntError, str::FromStr, sync::LazyLock};

use regex::Regex;
use snafu::{OptionExt, ResultExt, Snafu};

static LEVEL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<identifier>[a-z]+)(?P<version>\d*)$").expect("failed to compile level regex")
});

/// Error variants which can be encountered when creating a new [`Level`] from
/// unparsed input.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseLevelError {
    #[snafu(display("invalid level format, expected beta<VERSION>/alpha<VERSION>"))]
    InvalidFormat,

    #[snafu(display("failed to parse level version"))]
    ParseVersion { source: ParseIntError },

    #[snafu(display("unknown level identifier {identifier:?}"))]
    UnknownIdentifier { identifier: String },
}

/// The pre-release level of a version, `alpha<N>` or `beta<N>`.
///
/// The numeric suffix is optional and defaults to `0`, so `alpha` sorts below
/// `alpha1`. Any beta sorts above any alpha.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Level {
    /// Beta-level pre-release, `beta<VERSION>`.
    Beta(u64),

    /// Alpha-level pre-release, `alpha<VERSION>`.
    Alpha(u64),
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let captures = LEVEL_REGEX.captures(input).context(InvalidFormatSnafu)?;

        let identifier = captures
            .name("identifier")
            .map(|m| m.as_str())
            .context(InvalidFormatSnafu)?;

        let version = match captures.name("version").map(|m| m.as_str()) {
            None | Some("") => 0,
            Some(version) => version.parse::<u64>().context(ParseVersionSnafu)?,
        };

        match identifier {
            "alpha" => Ok(Self::Alpha(version)),
            "beta" => Ok(Self::Beta(version)),
            _ => UnknownIdentifierSnafu { identifier }.fail(),
        }
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Beta(lhs), Self::Beta(rhs)) | (Self::Alpha(lhs), Self::Alpha(rhs)) => {
                lhs.cmp(rhs)
            }
            (Self::Beta(_), Self::Alpha(_)) => Ordering::Greater,
            (Self::Alpha(_), Self::Beta(_)) => Ordering::Less,
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beta(beta) => write!(f, "beta{beta}"),
            Self::Alpha(alpha) => write!(f, "alpha{alpha}"),
        }
    }
}
