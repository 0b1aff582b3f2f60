//! PDF object serialization.
//!
//! Serializes [`Object`] trees to their byte representation according to
//! PDF specification ISO 32000-1:2008. When a security handler is supplied,
//! every string, buffer and date is replaced by its ciphertext under the
//! enclosing object's key before tokenization.

use std::io::{self, Write};

use crate::encryption::SecurityHandler;
use crate::object::{Dictionary, Object};
use crate::writer::tokens;

/// Serializer for PDF objects.
///
/// Output is compact: the only whitespace emitted is the single space that
/// separates adjacent tokens where the syntax demands one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

/// Encryption context for one indirect object.
#[derive(Clone, Copy)]
struct Encryption<'a> {
    handler: &'a SecurityHandler,
    id: u32,
    gen: u16,
}

impl ObjectSerializer {
    /// Create a new object serializer.
    pub fn new() -> Self {
        Self
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        // writes to a Vec cannot fail
        self.write_value(&mut buf, obj, None).unwrap();
        buf
    }

    /// Serialize an object to a string (for debugging and tests).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).to_string()
    }

    /// Write an object without encryption.
    pub fn write_object<W: Write>(&self, w: &mut W, obj: &Object) -> io::Result<()> {
        self.write_value(w, obj, None)
    }

    /// Write an object, encrypting strings under the `(id, gen)` object key.
    pub fn write_object_encrypted<W: Write>(
        &self,
        w: &mut W,
        obj: &Object,
        id: u32,
        gen: u16,
        handler: &SecurityHandler,
    ) -> io::Result<()> {
        self.write_value(w, obj, Some(Encryption { handler, id, gen }))
    }

    /// Write a dictionary without encryption.
    pub fn write_dictionary<W: Write>(&self, w: &mut W, dict: &Dictionary) -> io::Result<()> {
        self.write_dict_value(w, dict, None)
    }

    /// Write a dictionary, encrypting strings under the `(id, gen)` object key.
    pub fn write_dictionary_encrypted<W: Write>(
        &self,
        w: &mut W,
        dict: &Dictionary,
        id: u32,
        gen: u16,
        handler: &SecurityHandler,
    ) -> io::Result<()> {
        self.write_dict_value(w, dict, Some(Encryption { handler, id, gen }))
    }

    fn write_value<W: Write>(
        &self,
        w: &mut W,
        obj: &Object,
        enc: Option<Encryption<'_>>,
    ) -> io::Result<()> {
        match obj {
            Object::Null => w.write_all(b"null"),
            Object::Boolean(b) => w.write_all(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::Real(r) => tokens::write_real(w, *r),
            Object::Name(n) => tokens::write_name(w, n),
            Object::String(s) => self.write_string_bytes(w, tokens::encode_text_string(s), enc),
            Object::Buffer(b) => self.write_string_bytes(w, b.clone(), enc),
            Object::Date(d) => {
                self.write_string_bytes(w, tokens::format_date(d).into_bytes(), enc)
            },
            Object::HexString(b) => {
                let bytes = apply_encryption(b.clone(), enc)?;
                tokens::write_hex_string(w, &bytes)
            },
            Object::Array(items) => {
                w.write_all(b"[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        w.write_all(b" ")?;
                    }
                    self.write_value(w, item, enc)?;
                }
                w.write_all(b"]")
            },
            Object::Dictionary(dict) => self.write_dict_value(w, dict, enc),
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen),
        }
    }

    fn write_string_bytes<W: Write>(
        &self,
        w: &mut W,
        bytes: Vec<u8>,
        enc: Option<Encryption<'_>>,
    ) -> io::Result<()> {
        let bytes = apply_encryption(bytes, enc)?;
        tokens::write_literal_string(w, &bytes)
    }

    fn write_dict_value<W: Write>(
        &self,
        w: &mut W,
        dict: &Dictionary,
        enc: Option<Encryption<'_>>,
    ) -> io::Result<()> {
        w.write_all(b"<<")?;
        for (key, value) in dict {
            tokens::write_name(w, key)?;
            w.write_all(b" ")?;
            self.write_value(w, value, enc)?;
        }
        w.write_all(b">>")
    }
}

fn apply_encryption(bytes: Vec<u8>, enc: Option<Encryption<'_>>) -> io::Result<Vec<u8>> {
    match enc {
        Some(e) => e
            .handler
            .encrypt(&bytes, e.id, e.gen)
            .map_err(io::Error::other),
        None => Ok(bytes),
    }
}
