#![allow(clippy::write_with_newline)]
#![cfg_attr(test, allow(dead_code))]

//! # pdf_scribe
//!
//! A streaming PDF writer. Producers allocate cross-referenced indirect
//! objects, fill them incrementally, and the document emits byte-exact
//! ISO 32000 output as each object is ended: the cross-reference table is
//! assembled from recorded offsets rather than emission order.
//!
//! ## Features
//!
//! - **Typed object model**: names, strings, dates, arrays,
//!   insertion-ordered dictionaries, indirect references
//! - **Streaming emission**: objects leave the process as soon as they are
//!   ended; stream payload buffers are released immediately
//! - **FlateDecode filter** for stream payloads (on by default)
//! - **Standard Security Handler**: 40-bit RC4 (R2) through AES-256 (R5),
//!   with permission flags and per-object key derivation
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_scribe::{Document, DocumentConfig, Object};
//!
//! # fn main() -> pdf_scribe::Result<()> {
//! let config = DocumentConfig::default().with_title("Hello");
//! let mut doc = Document::with_config(config, Vec::new())?;
//!
//! let contents = doc.ref_with(Default::default());
//! doc.write(contents, b"BT /F1 24 Tf 72 720 Td (Hello, World!) Tj ET")?;
//! doc.end(contents)?;
//!
//! let bytes = doc.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! Passwords switch on encryption; the PDF version selects the scheme:
//!
//! ```ignore
//! use pdf_scribe::{Document, DocumentConfig, PdfVersion};
//!
//! let config = DocumentConfig::default()
//!     .with_pdf_version(PdfVersion::V1_7Ext3)
//!     .with_user_password("secret");
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core object model
pub mod object;

// Writing core
pub mod writer;

// Encryption support
pub mod encryption;

// Re-exports
pub use encryption::{Algorithm, Permissions, Printing, SecurityHandler};
pub use error::{Error, Result};
pub use object::{Dictionary, Object, ObjectRef};
pub use writer::{generate_file_id, Document, DocumentConfig, PdfVersion};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
