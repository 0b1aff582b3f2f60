//! Streaming PDF document assembler.
//!
//! Assembles complete PDF documents with proper structure: header, body,
//! xref table, trailer and startxref footer. Unlike a batch writer, objects
//! are emitted the moment a producer ends them; the registry records each
//! object's byte offset so the cross-reference table can be built at the end
//! regardless of emission order.

use std::io::Write;

use bytes::BytesMut;
use chrono::Utc;
use md5::{Digest, Md5};

use crate::encryption::{Permissions, SecurityHandler};
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::writer::object_serializer::ObjectSerializer;
use crate::writer::registry::Registry;
use crate::writer::stream;
use crate::writer::tokens::CountingWriter;

/// Target PDF version.
///
/// Also selects the encryption scheme when a password is configured; see
/// [`crate::encryption`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PdfVersion {
    /// PDF 1.3 (the default)
    #[default]
    V1_3,
    /// PDF 1.4
    V1_4,
    /// PDF 1.5
    V1_5,
    /// PDF 1.6
    V1_6,
    /// PDF 1.7
    V1_7,
    /// PDF 1.7, Adobe Extension Level 3
    V1_7Ext3,
}

impl PdfVersion {
    /// The version string written in the `%PDF-` header line.
    pub fn header_version(&self) -> &'static str {
        match self {
            PdfVersion::V1_3 => "1.3",
            PdfVersion::V1_4 => "1.4",
            PdfVersion::V1_5 => "1.5",
            PdfVersion::V1_6 => "1.6",
            PdfVersion::V1_7 | PdfVersion::V1_7Ext3 => "1.7",
        }
    }
}

/// Configuration for document construction.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Target PDF version
    pub pdf_version: PdfVersion,
    /// Whether stream payloads are deflated (FlateDecode)
    pub compress: bool,
    /// Whether a default Letter-sized page is created up front
    pub auto_first_page: bool,
    /// Document information dictionary entries
    pub info: Dictionary,
    /// User password; enables encryption when present
    pub user_password: Option<String>,
    /// Owner password; enables encryption when present
    pub owner_password: Option<String>,
    /// User access permissions, honored only when encryption is enabled
    pub permissions: Permissions,
    /// Whether metadata streams are encrypted (R4+)
    pub encrypt_metadata: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            pdf_version: PdfVersion::default(),
            compress: true,
            auto_first_page: true,
            info: Dictionary::new(),
            user_password: None,
            owner_password: None,
            permissions: Permissions::default(),
            encrypt_metadata: true,
        }
    }
}

impl DocumentConfig {
    /// Set the target PDF version.
    pub fn with_pdf_version(mut self, version: PdfVersion) -> Self {
        self.pdf_version = version;
        self
    }

    /// Enable or disable stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Enable or disable the automatic first page.
    pub fn with_auto_first_page(mut self, auto: bool) -> Self {
        self.auto_first_page = auto;
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.info.insert("Title".to_string(), Object::string(title.into()));
        self
    }

    /// Set the document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.info.insert("Author".to_string(), Object::string(author.into()));
        self
    }

    /// Set the document subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.info.insert("Subject".to_string(), Object::string(subject.into()));
        self
    }

    /// Add an arbitrary info dictionary entry.
    pub fn with_info_entry(mut self, key: impl Into<String>, value: Object) -> Self {
        self.info.insert(key.into(), value);
        self
    }

    /// Set the user password. Enables encryption.
    pub fn with_user_password(mut self, password: impl Into<String>) -> Self {
        self.user_password = Some(password.into());
        self
    }

    /// Set the owner password. Enables encryption.
    pub fn with_owner_password(mut self, password: impl Into<String>) -> Self {
        self.owner_password = Some(password.into());
        self
    }

    /// Set the user access permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Control metadata encryption (R4+).
    pub fn with_encrypt_metadata(mut self, encrypt: bool) -> Self {
        self.encrypt_metadata = encrypt;
        self
    }
}

/// A streaming PDF document writer.
///
/// Producers allocate indirect objects with [`ref_with`](Self::ref_with),
/// mutate their dictionaries or append stream bytes, and emit them with
/// [`end`](Self::end) in any order. [`finish`](Self::finish) flushes
/// whatever is still open and writes the cross-reference table and trailer.
pub struct Document<W: Write> {
    sink: CountingWriter<W>,
    serializer: ObjectSerializer,
    registry: Registry,
    security: Option<SecurityHandler>,
    compress: bool,
    file_id: [u8; 16],
    catalog: ObjectRef,
    pages: ObjectRef,
    info: ObjectRef,
    encrypt: Option<ObjectRef>,
    page_count: usize,
}

impl<W: Write> Document<W> {
    /// Create a document with default configuration.
    ///
    /// Writes the header to the sink immediately.
    pub fn new(sink: W) -> Result<Self> {
        Self::with_config(DocumentConfig::default(), sink)
    }

    /// Create a document with the given configuration.
    ///
    /// Writes the header to the sink immediately. Fails when a configured
    /// password is not representable for the selected revision.
    pub fn with_config(config: DocumentConfig, sink: W) -> Result<Self> {
        let DocumentConfig {
            pdf_version,
            compress,
            auto_first_page,
            mut info,
            user_password,
            owner_password,
            permissions,
            encrypt_metadata,
        } = config;

        let producer = format!("{} {}", crate::NAME, crate::VERSION);
        if !info.contains_key("Producer") {
            info.insert("Producer".to_string(), Object::string(producer.clone()));
        }
        if !info.contains_key("Creator") {
            info.insert("Creator".to_string(), Object::string(producer));
        }
        if !info.contains_key("CreationDate") {
            info.insert("CreationDate".to_string(), Object::date(Utc::now()));
        }

        let file_id = generate_file_id(&info);
        let security = if user_password.is_some() || owner_password.is_some() {
            Some(SecurityHandler::new(
                pdf_version,
                user_password.as_deref(),
                owner_password.as_deref(),
                &permissions,
                encrypt_metadata,
                &file_id,
            )?)
        } else {
            None
        };

        let mut sink = CountingWriter::new(sink);
        write!(sink, "%PDF-{}\n", pdf_version.header_version())?;
        // binary marker: four bytes above 0x80 so transports treat the file
        // as binary
        sink.write_all(b"%\xE2\xE3\xCF\xD3\n")?;

        let mut registry = Registry::new();
        let info_ref = registry.alloc(info);
        let pages_ref = registry.alloc(Object::dict(vec![
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(Vec::new())),
            ("Count", Object::Integer(0)),
        ]));
        let catalog_ref = registry.alloc(Object::dict(vec![
            ("Type", Object::name("Catalog")),
            ("Pages", Object::reference(pages_ref)),
        ]));
        let encrypt_ref = security
            .as_ref()
            .map(|handler| registry.alloc(handler.encrypt_dict()));

        let mut document = Self {
            sink,
            serializer: ObjectSerializer::new(),
            registry,
            security,
            compress,
            file_id,
            catalog: catalog_ref,
            pages: pages_ref,
            info: info_ref,
            encrypt: encrypt_ref,
            page_count: 0,
        };

        if auto_first_page {
            document.add_page(612.0, 792.0)?;
        }
        Ok(document)
    }

    /// Allocate a new indirect object around `dict` and return its handle.
    ///
    /// Nothing is written until [`end`](Self::end).
    pub fn ref_with(&mut self, dict: Dictionary) -> ObjectRef {
        self.registry.alloc(dict)
    }

    /// Mutable access to an open object's dictionary.
    pub fn dict_mut(&mut self, r: ObjectRef) -> Result<&mut Dictionary> {
        let entry = self
            .registry
            .get_mut(r.id)
            .ok_or(Error::ObjectNotFound(r.id, r.gen))?;
        if entry.written {
            return Err(Error::WriteAfterEnd { id: r.id, gen: r.gen });
        }
        Ok(&mut entry.dict)
    }

    /// Append bytes to an object's pending stream payload.
    ///
    /// Turns the object into a stream object on first use.
    pub fn write(&mut self, r: ObjectRef, bytes: &[u8]) -> Result<()> {
        let entry = self
            .registry
            .get_mut(r.id)
            .ok_or(Error::ObjectNotFound(r.id, r.gen))?;
        if entry.written {
            return Err(Error::WriteAfterEnd { id: r.id, gen: r.gen });
        }
        entry
            .payload
            .get_or_insert_with(BytesMut::new)
            .extend_from_slice(bytes);
        Ok(())
    }

    /// Emit an indirect object.
    ///
    /// Records the current sink offset, writes `N G obj`, the dictionary
    /// (and the filtered, encrypted stream payload, if any) and `endobj`.
    /// Calling `end` again on a written object is a no-op.
    pub fn end(&mut self, r: ObjectRef) -> Result<()> {
        let compress = self.compress;
        let encrypt_id = self.encrypt.map(|e| e.id);

        let entry = self
            .registry
            .get_mut(r.id)
            .ok_or(Error::ObjectNotFound(r.id, r.gen))?;
        if entry.written {
            log::debug!("object {} {} already written; end ignored", r.id, r.gen);
            return Ok(());
        }
        entry.written = true;
        entry.offset = Some(self.sink.bytes_written());
        log::debug!(
            "writing object {} {} at offset {}",
            entry.id,
            entry.gen,
            self.sink.bytes_written()
        );

        write!(self.sink, "{} {} obj\n", entry.id, entry.gen)?;

        // the encryption dictionary itself must stay readable
        let security = match (&self.security, encrypt_id) {
            (Some(_), Some(id)) if id == entry.id => None,
            (handler, _) => handler.as_ref(),
        };

        if let Some(payload) = entry.payload.take() {
            let data = stream::apply_filter_stage(&mut entry.dict, payload.freeze(), compress)?;
            let data = match security {
                Some(handler) => handler.encrypt(&data, entry.id, entry.gen)?.into(),
                None => data,
            };
            entry
                .dict
                .insert("Length".to_string(), Object::Integer(data.len() as i64));
            match security {
                Some(handler) => self.serializer.write_dictionary_encrypted(
                    &mut self.sink,
                    &entry.dict,
                    entry.id,
                    entry.gen,
                    handler,
                )?,
                None => self.serializer.write_dictionary(&mut self.sink, &entry.dict)?,
            }
            self.sink.write_all(b"\nstream\n")?;
            self.sink.write_all(&data)?;
            self.sink.write_all(b"\nendstream")?;
        } else {
            match security {
                Some(handler) => self.serializer.write_dictionary_encrypted(
                    &mut self.sink,
                    &entry.dict,
                    entry.id,
                    entry.gen,
                    handler,
                )?,
                None => self.serializer.write_dictionary(&mut self.sink, &entry.dict)?,
            }
        }
        self.sink.write_all(b"\nendobj\n")?;
        Ok(())
    }

    /// Add a page of the given size to the page tree.
    ///
    /// The page dictionary stays open, so producers may attach `/Contents`
    /// or `/Resources` through [`dict_mut`](Self::dict_mut) before the
    /// document is finished.
    pub fn add_page(&mut self, width: f64, height: f64) -> Result<ObjectRef> {
        let pages = self.pages;
        let page = self.registry.alloc(Object::dict(vec![
            ("Type", Object::name("Page")),
            ("Parent", Object::reference(pages)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
        ]));

        let tree = self
            .registry
            .get_mut(pages.id)
            .ok_or(Error::ObjectNotFound(pages.id, pages.gen))?;
        if tree.written {
            return Err(Error::WriteAfterEnd {
                id: pages.id,
                gen: pages.gen,
            });
        }
        if let Some(Object::Array(kids)) = tree.dict.get_mut("Kids") {
            kids.push(Object::reference(page));
        }
        if let Some(Object::Integer(count)) = tree.dict.get_mut("Count") {
            *count += 1;
        }

        self.page_count += 1;
        Ok(page)
    }

    /// Finish the document: flush open objects, then write the xref table,
    /// trailer and startxref footer. Returns the sink.
    pub fn finish(mut self) -> Result<W> {
        if self.page_count == 0 {
            return Err(Error::EmptyDocument);
        }

        // ending an object may allocate further objects, so loop until the
        // registry is stable
        loop {
            let open = self.registry.open_ids();
            if open.is_empty() {
                break;
            }
            for id in open {
                self.end(ObjectRef::new(id, 0))?;
            }
        }

        let startxref = self.sink.bytes_written();
        let count = self.registry.len() as u64 + 1;
        log::debug!("xref at {} with {} entries", startxref, count);

        write!(self.sink, "xref\n0 {}\n", count)?;
        self.sink.write_all(b"0000000000 65535 f \n")?;
        for entry in self.registry.iter() {
            // every entry was just finalized, so the offset is present
            let offset = entry.offset.unwrap_or(0);
            write!(self.sink, "{:010} {:05} n \n", offset, entry.gen)?;
        }

        let mut trailer = Dictionary::new();
        trailer.insert("Size".to_string(), Object::Integer(count as i64));
        trailer.insert("Root".to_string(), Object::reference(self.catalog));
        trailer.insert("Info".to_string(), Object::reference(self.info));
        trailer.insert(
            "ID".to_string(),
            Object::Array(vec![
                Object::hex_string(self.file_id.to_vec()),
                Object::hex_string(self.file_id.to_vec()),
            ]),
        );
        if let Some(encrypt) = self.encrypt {
            trailer.insert("Encrypt".to_string(), Object::reference(encrypt));
        }

        self.sink.write_all(b"trailer\n")?;
        self.serializer.write_dictionary(&mut self.sink, &trailer)?;
        self.sink.write_all(b"\n")?;
        write!(self.sink, "startxref\n{}\n%%EOF\n", startxref)?;

        self.sink.flush()?;
        Ok(self.sink.into_inner())
    }

    /// Handle of the document catalog.
    pub fn catalog(&self) -> ObjectRef {
        self.catalog
    }

    /// Handle of the page tree root.
    pub fn pages(&self) -> ObjectRef {
        self.pages
    }

    /// Handle of the information dictionary.
    pub fn info(&self) -> ObjectRef {
        self.info
    }

    /// The file identifier used in the trailer and key derivation.
    pub fn file_id(&self) -> &[u8; 16] {
        &self.file_id
    }

    /// The security handler, when encryption is enabled.
    pub fn security(&self) -> Option<&SecurityHandler> {
        self.security.as_ref()
    }
}

impl Document<std::io::BufWriter<std::fs::File>> {
    /// Create a document writing to a file at `path`.
    pub fn create<P: AsRef<std::path::Path>>(path: P, config: DocumentConfig) -> Result<Self> {
        let file = std::fs::File::create(path)?;
        Self::with_config(config, std::io::BufWriter::new(file))
    }
}

/// Derive the 16-byte file identifier from the info dictionary.
///
/// The digest input is the creation instant in epoch milliseconds followed
/// by every info entry in its natural textual form, one per line. The result
/// is deterministic in the info dictionary; both trailer ID halves reuse it.
pub fn generate_file_id(info: &Dictionary) -> [u8; 16] {
    let creation_millis = match info.get("CreationDate") {
        Some(Object::Date(date)) => date.timestamp_millis(),
        _ => 0,
    };

    let mut text = format!("{}\n", creation_millis);
    for (key, value) in info {
        text.push_str(key);
        text.push_str(": ");
        text.push_str(&stringify_info_value(value));
        text.push('\n');
    }

    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut id = [0u8; 16];
    id.copy_from_slice(&digest);
    id
}

fn stringify_info_value(value: &Object) -> String {
    match value {
        Object::String(s) => s.clone(),
        Object::Name(n) => n.clone(),
        Object::Date(d) => d.timestamp_millis().to_string(),
        Object::Integer(i) => i.to_string(),
        Object::Real(r) => r.to_string(),
        Object::Boolean(b) => b.to_string(),
        other => {
            log::warn!("unexpected {} info value in file-ID input", other.type_name());
            String::new()
        },
    }
}
