//! Tag-driven type dispatch for versioned configuration documents.
//!
//! Every document on the wire carries a type tag, its `apiVersion` and
//! `kind`. This crate resolves such tags to concrete schemas and moves values
//! between schema versions:
//!
//! - [`TypeTag`] identifies a schema by group, version and kind.
//! - [`Registry`] maps tags to factories producing fresh schema values.
//! - [`TypedEnvelope`] decodes a document by first detecting its tag and then
//!   decoding the `spec` into the schema the [`Registry`] hands out.
//! - [`ConversionRegistry`] holds the functions migrating values between tags.
//! - [`latest_version`] picks the newest of several versions of one kind.
//!
//! ```
//! use kure_gvk::{Registry, TypeTag};
//!
//! let registry = Registry::<String>::new();
//! registry.register(TypeTag::new("example.dev", "v1", "Greeting"), || "hello".to_owned());
//!
//! let value = registry
//!     .create_from_api_version("example.dev/v1", "Greeting")
//!     .expect("tag is registered");
//! assert_eq!(value, "hello");
//! ```

pub mod conversion;
pub mod envelope;
pub mod gvk;
pub mod order;
pub mod parse;
pub mod registry;
pub mod schema;

pub use conversion::ConversionRegistry;
pub use envelope::TypedEnvelope;
pub use gvk::TypeTag;
pub use order::latest_version;
pub use parse::{DocumentReader, parse_multiple, parse_single, parse_stream};
pub use registry::Registry;
pub use schema::{Named, Schema};
