//! Standard Security Handler for PDF writing.
//!
//! Implements document encryption according to the PDF specification
//! (ISO 32000-1:2008, Section 7.6). The revision is selected by the target
//! PDF version:
//!
//! | PDF version | V | R | key bits | cipher        |
//! |-------------|---|---|----------|---------------|
//! | 1.3         | 1 | 2 | 40       | RC4           |
//! | 1.4, 1.5    | 2 | 3 | 128      | RC4           |
//! | 1.6, 1.7    | 4 | 4 | 128      | AES-CBC (AESV2) |
//! | 1.7 ext 3   | 5 | 5 | 256      | AES-CBC (AESV3) |
//!
//! The handler is constructed once per document and fixed for the document's
//! lifetime: it derives the file encryption key, the owner and user entries,
//! and hands out the per-object encryption transform that the serializer and
//! the stream pipeline apply to every string and stream payload.

mod aes;
mod algorithms;
mod rc4;

use md5::{Digest, Md5};

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};
use crate::writer::document::PdfVersion;

/// Encryption algorithm selected by the target PDF version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// RC4 with 40-bit key (V=1, R=2)
    Rc4_40,
    /// RC4 with 128-bit key (V=2, R=3)
    Rc4_128,
    /// AES-128 in CBC mode (V=4, R=4, AESV2)
    Aes128,
    /// AES-256 in CBC mode (V=5, R=5, AESV3)
    Aes256,
}

impl Algorithm {
    pub(crate) fn from_pdf_version(version: PdfVersion) -> Self {
        match version {
            PdfVersion::V1_3 => Algorithm::Rc4_40,
            PdfVersion::V1_4 | PdfVersion::V1_5 => Algorithm::Rc4_128,
            PdfVersion::V1_6 | PdfVersion::V1_7 => Algorithm::Aes128,
            PdfVersion::V1_7Ext3 => Algorithm::Aes256,
        }
    }

    /// Key length in bytes.
    pub fn key_length(&self) -> usize {
        match self {
            Algorithm::Rc4_40 => 5,
            Algorithm::Rc4_128 | Algorithm::Aes128 => 16,
            Algorithm::Aes256 => 32,
        }
    }

    /// Key length in bits, as recorded in the encryption dictionary.
    pub fn key_bits(&self) -> u32 {
        self.key_length() as u32 * 8
    }

    /// Algorithm version (the V entry).
    pub fn version(&self) -> u8 {
        match self {
            Algorithm::Rc4_40 => 1,
            Algorithm::Rc4_128 => 2,
            Algorithm::Aes128 => 4,
            Algorithm::Aes256 => 5,
        }
    }

    /// Security handler revision (the R entry).
    pub fn revision(&self) -> u8 {
        match self {
            Algorithm::Rc4_40 => 2,
            Algorithm::Rc4_128 => 3,
            Algorithm::Aes128 => 4,
            Algorithm::Aes256 => 5,
        }
    }

    /// Check if this is an AES algorithm.
    pub fn is_aes(&self) -> bool {
        matches!(self, Algorithm::Aes128 | Algorithm::Aes256)
    }
}

/// Printing permission granularity.
///
/// Revision 2 only knows on/off; revision 3 and later distinguish degraded
/// from full-resolution printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Printing {
    /// Degraded-resolution printing only
    LowResolution,
    /// Full-quality printing
    HighResolution,
}

/// User access permissions packed into the P entry.
///
/// The default grants nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    /// Allow printing, at the given resolution
    pub printing: Option<Printing>,
    /// Allow modifying document contents
    pub modifying: bool,
    /// Allow copying text and graphics
    pub copying: bool,
    /// Allow adding or modifying annotations
    pub annotating: bool,
    /// Allow filling in form fields (R3+)
    pub filling_forms: bool,
    /// Allow extraction for accessibility (R3+)
    pub content_accessibility: bool,
    /// Allow page assembly (R3+)
    pub document_assembly: bool,
}

impl Permissions {
    /// Grant every capability.
    pub fn all() -> Self {
        Self {
            printing: Some(Printing::HighResolution),
            modifying: true,
            copying: true,
            annotating: true,
            filling_forms: true,
            content_accessibility: true,
            document_assembly: true,
        }
    }
}

/// Handler for encrypting PDF objects during write operations.
///
/// Constructed once per document; all key material is fixed afterwards.
pub struct SecurityHandler {
    algorithm: Algorithm,
    encryption_key: Vec<u8>,
    owner_entry: Vec<u8>,
    user_entry: Vec<u8>,
    permissions: i32,
    owner_key_entry: Option<Vec<u8>>,
    user_key_entry: Option<Vec<u8>>,
    perms_entry: Option<Vec<u8>>,
    encrypt_metadata: bool,
}

impl SecurityHandler {
    /// Create a security handler for a document.
    ///
    /// At least one password must be provided. When the owner password is
    /// absent the user password stands in for it. `file_id` is the first
    /// element of the file identifier; it salts the R2-R4 key derivation.
    pub fn new(
        pdf_version: PdfVersion,
        user_password: Option<&str>,
        owner_password: Option<&str>,
        permissions: &Permissions,
        encrypt_metadata: bool,
        file_id: &[u8],
    ) -> Result<Self> {
        if user_password.is_none() && owner_password.is_none() {
            return Err(Error::NoPasswordConfigured);
        }
        let user_password = user_password.unwrap_or("");
        let owner_password = owner_password
            .filter(|p| !p.is_empty())
            .unwrap_or(user_password);

        let algorithm = Algorithm::from_pdf_version(pdf_version);
        log::debug!(
            "security handler: V={} R={} ({} bit)",
            algorithm.version(),
            algorithm.revision(),
            algorithm.key_bits()
        );

        if algorithm.revision() >= 5 {
            Self::setup_r5(algorithm, user_password, owner_password, permissions, encrypt_metadata)
        } else {
            Self::setup_r2_r4(
                algorithm,
                user_password,
                owner_password,
                permissions,
                encrypt_metadata,
                file_id,
            )
        }
    }

    fn setup_r2_r4(
        algorithm: Algorithm,
        user_password: &str,
        owner_password: &str,
        permissions: &Permissions,
        encrypt_metadata: bool,
        file_id: &[u8],
    ) -> Result<Self> {
        let revision = algorithm.revision();
        let key_length = algorithm.key_length();

        let padded_user = algorithms::process_password(user_password)?;
        let padded_owner = algorithms::process_password(owner_password)?;

        let permissions = if revision == 2 {
            algorithms::permission_bits_r2(permissions)
        } else {
            algorithms::permission_bits_r3(permissions)
        };

        let owner_entry =
            algorithms::compute_owner_entry(&padded_user, &padded_owner, revision, key_length);
        let encryption_key = algorithms::compute_file_key(
            &padded_user,
            &owner_entry,
            permissions,
            file_id,
            revision,
            key_length,
            encrypt_metadata,
        );
        let user_entry = algorithms::compute_user_entry(&encryption_key, file_id, revision);

        Ok(Self {
            algorithm,
            encryption_key,
            owner_entry,
            user_entry,
            permissions,
            owner_key_entry: None,
            user_key_entry: None,
            perms_entry: None,
            encrypt_metadata,
        })
    }

    fn setup_r5(
        algorithm: Algorithm,
        user_password: &str,
        owner_password: &str,
        permissions: &Permissions,
        encrypt_metadata: bool,
    ) -> Result<Self> {
        let user_password = algorithms::prepare_password_r5(user_password)?;
        let owner_password = algorithms::prepare_password_r5(owner_password)?;
        let permissions = algorithms::permission_bits_r3(permissions);

        // the file key is random; passwords only wrap it via UE/OE
        let encryption_key = algorithms::random_bytes(32);
        let (user_entry, user_key_entry) =
            algorithms::compute_user_entries_r5(&user_password, &encryption_key)?;
        let (owner_entry, owner_key_entry) =
            algorithms::compute_owner_entries_r5(&owner_password, &user_entry, &encryption_key)?;
        let perms_entry = algorithms::compute_perms_entry_r5(permissions, &encryption_key)?;

        Ok(Self {
            algorithm,
            encryption_key,
            owner_entry,
            user_entry,
            permissions,
            owner_key_entry: Some(owner_key_entry),
            user_key_entry: Some(user_key_entry),
            perms_entry: Some(perms_entry),
            encrypt_metadata,
        })
    }

    /// Encrypt string or stream bytes belonging to object `(obj_num, gen_num)`.
    ///
    /// RC4 output has the input's length; AES output is a fresh 16-byte IV
    /// followed by the PKCS#7-padded ciphertext.
    pub fn encrypt(&self, data: &[u8], obj_num: u32, gen_num: u16) -> Result<Vec<u8>> {
        match self.algorithm {
            Algorithm::Rc4_40 | Algorithm::Rc4_128 => {
                let key = self.object_key(obj_num, gen_num);
                Ok(rc4::rc4(&key, data))
            },
            Algorithm::Aes128 => {
                let key = self.object_key(obj_num, gen_num);
                let iv = algorithms::generate_iv();
                let ciphertext = aes::aes128_cbc_encrypt(&key, &iv, data)
                    .map_err(|m| Error::Unsupported(m.to_string()))?;
                let mut out = iv.to_vec();
                out.extend(ciphertext);
                Ok(out)
            },
            Algorithm::Aes256 => {
                let iv = algorithms::generate_iv();
                let ciphertext = aes::aes256_cbc_encrypt(&self.encryption_key, &iv, data)
                    .map_err(|m| Error::Unsupported(m.to_string()))?;
                let mut out = iv.to_vec();
                out.extend(ciphertext);
                Ok(out)
            },
        }
    }

    /// Derive the per-object key for revisions 2-4.
    ///
    /// Appends the object number (3 bytes LE) and generation (2 bytes LE) to
    /// the file key, plus the `sAlT` marker for AES, and truncates the MD5
    /// digest to `min(16, key length + 5)` bytes. Revision 5 uses the file
    /// key unchanged.
    fn object_key(&self, obj_num: u32, gen_num: u16) -> Vec<u8> {
        if self.algorithm.revision() >= 5 {
            return self.encryption_key.clone();
        }

        log::trace!("deriving object key for {} {}", obj_num, gen_num);
        let mut hasher = Md5::new();
        hasher.update(&self.encryption_key);
        hasher.update(&obj_num.to_le_bytes()[..3]);
        hasher.update(gen_num.to_le_bytes());
        if self.algorithm.is_aes() {
            hasher.update(b"sAlT");
        }
        let digest = hasher.finalize();

        let key_length = (self.encryption_key.len() + 5).min(16);
        digest[..key_length].to_vec()
    }

    /// Build the /Encrypt dictionary for the document trailer.
    pub fn encrypt_dict(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert("Filter".to_string(), Object::name("Standard"));
        dict.insert("V".to_string(), Object::Integer(self.algorithm.version() as i64));

        if self.algorithm.version() >= 2 {
            dict.insert("Length".to_string(), Object::Integer(self.algorithm.key_bits() as i64));
        }

        if self.algorithm.is_aes() {
            let cfm = match self.algorithm {
                Algorithm::Aes128 => "AESV2",
                _ => "AESV3",
            };
            let std_cf = Object::dict(vec![
                ("AuthEvent", Object::name("DocOpen")),
                ("CFM", Object::name(cfm)),
                ("Length", Object::Integer(self.algorithm.key_length() as i64)),
            ]);
            dict.insert(
                "CF".to_string(),
                Object::Dictionary(Object::dict(vec![("StdCF", Object::Dictionary(std_cf))])),
            );
            dict.insert("StmF".to_string(), Object::name("StdCF"));
            dict.insert("StrF".to_string(), Object::name("StdCF"));
        }

        dict.insert("R".to_string(), Object::Integer(self.algorithm.revision() as i64));
        dict.insert("O".to_string(), Object::buffer(self.owner_entry.clone()));
        if let Some(oe) = &self.owner_key_entry {
            dict.insert("OE".to_string(), Object::buffer(oe.clone()));
        }
        dict.insert("U".to_string(), Object::buffer(self.user_entry.clone()));
        if let Some(ue) = &self.user_key_entry {
            dict.insert("UE".to_string(), Object::buffer(ue.clone()));
        }
        dict.insert("P".to_string(), Object::Integer(self.permissions as i64));
        if let Some(perms) = &self.perms_entry {
            dict.insert("Perms".to_string(), Object::buffer(perms.clone()));
        }
        if self.algorithm.revision() >= 4 && !self.encrypt_metadata {
            dict.insert("EncryptMetadata".to_string(), Object::Boolean(false));
        }
        dict
    }

    /// The encryption algorithm in use.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The packed permission bits (the P entry).
    pub fn permission_bits(&self) -> i32 {
        self.permissions
    }

    /// The owner password entry (the O entry).
    pub fn owner_entry(&self) -> &[u8] {
        &self.owner_entry
    }

    /// The user password entry (the U entry).
    pub fn user_entry(&self) -> &[u8] {
        &self.user_entry
    }

    #[cfg(test)]
    pub(crate) fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }
}

impl std::fmt::Debug for SecurityHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // key material is deliberately not printed
        f.debug_struct("SecurityHandler")
            .field("algorithm", &self.algorithm)
            .field("permissions", &self.permissions)
            .field("encrypt_metadata", &self.encrypt_metadata)
            .finish()
    }
}
