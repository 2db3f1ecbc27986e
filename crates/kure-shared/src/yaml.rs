//! Utility functions for writing data in the YAML file format.
use std::io::Write;

use snafu::{ResultExt, Snafu};

/// The line which separates documents in a multi-document YAML stream.
pub const DOCUMENT_SEPARATOR: &str = "---";

type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents every error which can be encountered during YAML serialization.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },

    #[snafu(display("failed to parse bytes as valid UTF-8 string"))]
    ParseUtf8Bytes { source: std::string::FromUtf8Error },
}

/// Provides configurable options during YAML serialization.
#[derive(Clone, Copy, Debug)]
pub struct SerializeOptions {
    /// Adds leading triple dashes (`---`) in front of every document.
    pub explicit_document: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            explicit_document: true,
        }
    }
}

/// Serializes the given data structure and writes it to a [`Writer`](Write).
pub fn serialize<T, W>(value: &T, mut writer: W, options: SerializeOptions) -> Result<()>
where
    T: serde::Serialize,
    W: Write,
{
    if options.explicit_document {
        writeln!(writer, "{DOCUMENT_SEPARATOR}").context(WriteDocumentSeparatorSnafu)?;
    }

    let mut serializer = serde_yaml::Serializer::new(writer);
    value
        .serialize(&mut serializer)
        .context(SerializeYamlSnafu)?;

    Ok(())
}

/// Serializes every value as its own document into a single YAML stream.
///
/// Documents are always separated by `---` lines. The first document only
/// carries a leading separator if [`SerializeOptions::explicit_document`] is
/// set.
pub fn serialize_documents<'a, T, I, W>(
    values: I,
    mut writer: W,
    options: SerializeOptions,
) -> Result<()>
where
    T: serde::Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
    W: Write,
{
    for (index, value) in values.into_iter().enumerate() {
        let explicit_document = options.explicit_document || index > 0;
        serialize(value, &mut writer, SerializeOptions { explicit_document })?;
    }

    Ok(())
}

/// Serializes every value as its own document and returns the YAML stream as
/// a [`String`].
pub fn to_string_documents<'a, T, I>(values: I, options: SerializeOptions) -> Result<String>
where
    T: serde::Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut buffer = Vec::new();
    serialize_documents(values, &mut buffer, options)?;
    String::from_utf8(buffer).context(ParseUtf8BytesSnafu)
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Named {
        name: &'static str,
    }

    #[test]
    fn multiple_documents() {
        let values = [Named { name: "infra" }, Named { name: "apps" }];
        let yaml = to_string_documents(&values, SerializeOptions::default())
            .expect("documents must serialize");

        assert_eq!(
            yaml,
            indoc! {"
                ---
                name: infra
                ---
                name: apps
            "}
        );
    }

    #[test]
    fn implicit_first_document() {
        let values = [Named { name: "infra" }, Named { name: "apps" }];
        let yaml = to_string_documents(
            &values,
            SerializeOptions {
                explicit_document: false,
            },
        )
        .expect("documents must serialize");

        assert_eq!(yaml, "name: infra\n---\nname: apps\n");
    }
}
