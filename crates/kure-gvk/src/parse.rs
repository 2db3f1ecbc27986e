//! Batch decoding of multi-document YAML streams into [`TypedEnvelope`]s.
//!
//! Documents are separated by lines consisting of exactly `---`. Blank
//! documents are skipped. All batch functions stop at the first malformed
//! document and report its 0-based position in the input, counting skipped
//! blank documents as well.

use std::io::{BufRead, BufReader, Read};

use kure_shared::yaml::DOCUMENT_SEPARATOR;
use snafu::{ResultExt, Snafu};

use crate::{Registry, TypedEnvelope, envelope, schema::Schema};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to decode document at index {index}"))]
    Document {
        source: envelope::Error,
        index: usize,
    },

    #[snafu(display("failed to read document at index {index}"))]
    ReadDocument {
        source: std::io::Error,
        index: usize,
    },
}

impl Error {
    /// Returns the 0-based index of the offending document. A single document
    /// is always at index `0`.
    pub fn index(&self) -> usize {
        match self {
            Self::Document { index, .. } | Self::ReadDocument { index, .. } => *index,
        }
    }
}

/// Splits a byte stream into raw documents at `---` separator lines.
///
/// The reader is pulled one line at a time, so only the current document is
/// held in memory. Blank documents are yielded as well, callers decide
/// whether to skip them.
#[derive(Debug)]
pub struct DocumentReader<R> {
    reader: R,
    line: String,
    done: bool,
}

impl<R: BufRead> DocumentReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for DocumentReader<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut document = String::new();

        loop {
            self.line.clear();

            match self.reader.read_line(&mut self.line) {
                Ok(0) => {
                    self.done = true;
                    return Some(Ok(document));
                }
                Ok(_) if is_separator(&self.line) => return Some(Ok(document)),
                Ok(_) => document.push_str(&self.line),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

fn is_separator(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']) == DOCUMENT_SEPARATOR
}

/// Returns `true` if the document contains nothing but whitespace and
/// comments.
pub fn is_blank_document(document: &str) -> bool {
    document
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}

/// Decodes exactly one document, errors are reported at index `0`.
pub fn parse_single<T: Schema>(registry: &Registry<T>, input: &[u8]) -> Result<TypedEnvelope<T>> {
    TypedEnvelope::decode(registry, input).context(DocumentSnafu { index: 0_usize })
}

/// Decodes every non-blank document of a multi-document input.
pub fn parse_multiple<T: Schema>(
    registry: &Registry<T>,
    input: &[u8],
) -> Result<Vec<TypedEnvelope<T>>> {
    decode_documents(registry, input).collect()
}

/// Decodes every non-blank document pulled from `reader`.
pub fn parse_stream<T: Schema, R: Read>(
    registry: &Registry<T>,
    reader: R,
) -> Result<Vec<TypedEnvelope<T>>> {
    decode_documents(registry, BufReader::new(reader)).collect()
}

/// Returns a lazy iterator decoding one envelope per non-blank document.
///
/// Documents are only read from `reader` when the next envelope is
/// requested. The iterator ends cleanly at the end of the stream.
pub fn decode_documents<'a, T, R>(
    registry: &'a Registry<T>,
    reader: R,
) -> impl Iterator<Item = Result<TypedEnvelope<T>>> + 'a
where
    T: Schema + 'a,
    R: BufRead + 'a,
{
    DocumentReader::new(reader)
        .enumerate()
        .filter_map(move |(index, document)| match document {
            Ok(document) if is_blank_document(&document) => None,
            Ok(document) => Some(
                TypedEnvelope::decode(registry, document.as_bytes())
                    .context(DocumentSnafu { index }),
            ),
            Err(source) => Some(Err(Error::ReadDocument { source, index })),
        })
}
