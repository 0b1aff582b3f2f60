//! Error types for the PDF writer.

/// Result type alias for PDF writer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while authoring a PDF document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Legacy (R2-R4) passwords are Latin-1 only; SASLprep rejected an R5 password.
    #[error("password contains characters outside the supported range")]
    InvalidPassword,

    /// The security handler was constructed without a user or owner password.
    #[error("encryption requires a user password or an owner password")]
    NoPasswordConfigured,

    /// An indirect object was mutated or written to after it was emitted.
    #[error("object {id} {gen} R was modified after end")]
    WriteAfterEnd {
        /// Object number of the offending handle
        id: u32,
        /// Generation number of the offending handle
        gen: u16,
    },

    /// A handle does not resolve to an allocated indirect object.
    #[error("object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// The document was finished without any page in the page tree.
    #[error("document has no pages")]
    EmptyDocument,

    /// IO error from the output sink; the document is poisoned.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal misuse guard (key-length mismatch and the like).
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
