use kure_version::compare_versions;
use snafu::{OptionExt, Snafu, ensure};

use crate::TypeTag;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("cannot pick the latest version from an empty list of tags"))]
    EmptyTagList,

    #[snafu(display(
        "cannot compare versions of different schemas, expected group/kind of {expected} but found {found}"
    ))]
    MismatchedGroupKind { expected: TypeTag, found: TypeTag },
}

/// Returns the tag with the newest version.
///
/// All tags must share group and kind. Versions are ranked with
/// [`compare_versions`], so `v1alpha1 < v1beta1 < v1 < v2alpha1`. A single
/// tag is returned unchanged.
pub fn latest_version(tags: &[TypeTag]) -> Result<TypeTag, Error> {
    let (first, rest) = tags.split_first().context(EmptyTagListSnafu)?;

    let mut latest = first;
    for tag in rest {
        ensure!(
            tag.same_group_kind(first),
            MismatchedGroupKindSnafu {
                expected: first.clone(),
                found: tag.clone(),
            }
        );

        if compare_versions(&tag.version, &latest.version).is_gt() {
            latest = tag;
        }
    }

    Ok(latest.clone())
}

/// Sorts tags by version, oldest first. Tags of different groups or kinds are
/// grouped by group and kind before their versions are compared.
pub fn sort_tags_by_version(tags: &mut [TypeTag]) {
    tags.sort_by(|lhs, rhs| {
        lhs.group
            .cmp(&rhs.group)
            .then_with(|| lhs.kind.cmp(&rhs.kind))
            .then_with(|| compare_versions(&lhs.version, &rhs.version))
    });
}
