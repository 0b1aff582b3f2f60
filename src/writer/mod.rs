//! The PDF writing core.
//!
//! ```text
//! producer calls (ref_with / write / end)
//!     ↓
//! [Document] (header, emission order, xref, trailer)
//!     ↓
//! [Registry] (object numbers, lifecycle, offsets)
//!     ↓
//! [ObjectSerializer] (value tree → tokens, per-object encryption)
//!     ↓
//! [tokens::CountingWriter] (escaping, byte accounting)
//!     ↓
//! PDF bytes
//! ```
//!
//! Stream payloads additionally pass through the filter and encryption
//! pipeline in [`stream`] before emission.

pub mod document;
pub mod object_serializer;
pub(crate) mod registry;
pub(crate) mod stream;
pub mod tokens;

pub use document::{generate_file_id, Document, DocumentConfig, PdfVersion};
pub use object_serializer::ObjectSerializer;
pub use tokens::CountingWriter;
