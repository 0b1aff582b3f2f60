//! Key derivation and entry computation for the Standard Security Handler.
//!
//! Implements the password, key and dictionary-entry algorithms of
//! ISO 32000-1:2008 Section 7.6.3 for revisions 2-4 and the AES-256
//! revision 5 scheme from the Adobe 1.7 Extension Level 3 supplement.

use md5::{Digest, Md5};
use sha2::Sha256;

use super::{aes, rc4, Permissions, Printing};
use crate::error::{Error, Result};

/// Padding string used when processing R2-R4 passwords (32 bytes).
pub(crate) const PADDING: &[u8; 32] = b"\x28\xBF\x4E\x5E\x4E\x75\x8A\x41\
                                        \x64\x00\x4E\x56\xFF\xFA\x01\x08\
                                        \x2E\x2E\x00\xB6\xD0\x68\x3E\x80\
                                        \x2F\x0C\xA9\xFE\x64\x53\x69\x7A";

/// Encode and pad an R2-R4 password.
///
/// Legacy revisions operate on single-byte strings: any code point above
/// U+00FF cannot be represented and fails with [`Error::InvalidPassword`].
pub(crate) fn process_password(password: &str) -> Result<[u8; 32]> {
    let mut bytes = Vec::with_capacity(password.len());
    for c in password.chars() {
        let code = c as u32;
        if code > 0xFF {
            return Err(Error::InvalidPassword);
        }
        bytes.push(code as u8);
    }
    Ok(pad_password(&bytes))
}

/// Pad or truncate a password to 32 bytes using the standard padding.
pub(crate) fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Prepare an R5 password: SASLprep, UTF-8 encode, truncate to 127 bytes.
pub(crate) fn prepare_password_r5(password: &str) -> Result<Vec<u8>> {
    let prepared = stringprep::saslprep(password).map_err(|_| Error::InvalidPassword)?;
    let mut bytes = prepared.as_bytes().to_vec();
    if bytes.len() > 127 {
        // do not split a UTF-8 sequence when truncating
        let mut end = 127;
        while end > 0 && (bytes[end] & 0xC0) == 0x80 {
            end -= 1;
        }
        bytes.truncate(end);
    }
    Ok(bytes)
}

/// Pack the permission flags for revision 2.
///
/// Bits 1-2 are reserved clear, bits 7-8 reserved set, and every bit above
/// the defined range stays set.
pub(crate) fn permission_bits_r2(permissions: &Permissions) -> i32 {
    let mut bits: u32 = 0xFFFF_FFC0;
    if permissions.printing.is_some() {
        bits |= 1 << 2;
    }
    if permissions.modifying {
        bits |= 1 << 3;
    }
    if permissions.copying {
        bits |= 1 << 4;
    }
    if permissions.annotating {
        bits |= 1 << 5;
    }
    bits as i32
}

/// Pack the permission flags for revision 3 and later.
pub(crate) fn permission_bits_r3(permissions: &Permissions) -> i32 {
    let mut bits: u32 = 0xFFFF_F0C0;
    match permissions.printing {
        Some(Printing::LowResolution) => bits |= 1 << 2,
        Some(Printing::HighResolution) => bits |= (1 << 2) | (1 << 11),
        None => {},
    }
    if permissions.modifying {
        bits |= 1 << 3;
    }
    if permissions.copying {
        bits |= 1 << 4;
    }
    if permissions.annotating {
        bits |= 1 << 5;
    }
    if permissions.filling_forms {
        bits |= 1 << 8;
    }
    if permissions.content_accessibility {
        bits |= 1 << 9;
    }
    if permissions.document_assembly {
        bits |= 1 << 10;
    }
    bits as i32
}

/// Compute the owner password entry (O value) for R2-R4.
pub(crate) fn compute_owner_entry(
    padded_user: &[u8; 32],
    padded_owner: &[u8; 32],
    revision: u8,
    key_length: usize,
) -> Vec<u8> {
    let mut digest = Md5::digest(padded_owner).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            digest = Md5::digest(&digest).to_vec();
        }
    }
    let key = &digest[..key_length];

    let mut cipher = rc4::rc4(key, padded_user);
    if revision >= 3 {
        for i in 1..=19u8 {
            let xored: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            cipher = rc4::rc4(&xored, &cipher);
        }
    }
    cipher
}

/// Compute the file encryption key for R2-R4.
pub(crate) fn compute_file_key(
    padded_user: &[u8; 32],
    owner_entry: &[u8],
    permissions: i32,
    file_id: &[u8],
    revision: u8,
    key_length: usize,
    encrypt_metadata: bool,
) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(padded_user);
    hasher.update(owner_entry);
    hasher.update(permissions.to_le_bytes());
    hasher.update(file_id);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut digest = hasher.finalize().to_vec();

    if revision >= 3 {
        for _ in 0..50 {
            digest = Md5::digest(&digest[..key_length]).to_vec();
        }
    }
    digest[..key_length].to_vec()
}

/// Compute the user password entry (U value) for R2-R4.
///
/// Always 32 bytes: R2 encrypts the padding string directly, R3/R4 hash the
/// padding and file ID and append 16 zero bytes.
pub(crate) fn compute_user_entry(key: &[u8], file_id: &[u8], revision: u8) -> Vec<u8> {
    if revision == 2 {
        return rc4::rc4(key, PADDING);
    }

    let mut hasher = Md5::new();
    hasher.update(PADDING);
    hasher.update(file_id);
    let mut entry = hasher.finalize().to_vec();

    for i in 0..20u8 {
        let xored: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        entry = rc4::rc4(&xored, &entry);
    }

    entry.extend_from_slice(&[0u8; 16]);
    entry
}

/// Compute the R5 user entries: the 48-byte U value and the 32-byte UE value.
pub(crate) fn compute_user_entries_r5(password: &[u8], file_key: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let validation_salt = random_bytes(8);
    let key_salt = random_bytes(8);

    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(&validation_salt);
    let mut entry = hasher.finalize().to_vec();
    entry.extend_from_slice(&validation_salt);
    entry.extend_from_slice(&key_salt);

    let mut key_hasher = Sha256::new();
    key_hasher.update(password);
    key_hasher.update(&key_salt);
    let intermediate = key_hasher.finalize();

    let wrapped = aes::aes256_cbc_encrypt_no_pad(&intermediate, &[0u8; 16], file_key)
        .map_err(|m| Error::Unsupported(m.to_string()))?;

    Ok((entry, wrapped))
}

/// Compute the R5 owner entries: the 48-byte O value and the 32-byte OE value.
///
/// Both hashes bind the full 48-byte U entry, so the user entries must be
/// computed first.
pub(crate) fn compute_owner_entries_r5(
    password: &[u8],
    user_entry: &[u8],
    file_key: &[u8],
) -> Result<(Vec<u8>, Vec<u8>)> {
    let validation_salt = random_bytes(8);
    let key_salt = random_bytes(8);

    let mut hasher = Sha256::new();
    hasher.update(password);
    hasher.update(&validation_salt);
    hasher.update(user_entry);
    let mut entry = hasher.finalize().to_vec();
    entry.extend_from_slice(&validation_salt);
    entry.extend_from_slice(&key_salt);

    let mut key_hasher = Sha256::new();
    key_hasher.update(password);
    key_hasher.update(&key_salt);
    key_hasher.update(user_entry);
    let intermediate = key_hasher.finalize();

    let wrapped = aes::aes256_cbc_encrypt_no_pad(&intermediate, &[0u8; 16], file_key)
        .map_err(|m| Error::Unsupported(m.to_string()))?;

    Ok((entry, wrapped))
}

/// Compute the R5 Perms entry: a 16-byte block encrypted with the file key.
///
/// Layout before encryption: bytes 0-3 permissions (little-endian), 4-7
/// `FF FF FF FF`, 8-11 the ASCII marker `Tadb`, 12-15 random.
pub(crate) fn compute_perms_entry_r5(permissions: i32, file_key: &[u8]) -> Result<Vec<u8>> {
    let mut block = [0u8; 16];
    block[..4].copy_from_slice(&permissions.to_le_bytes());
    block[4..8].copy_from_slice(&[0xFF; 4]);
    block[8..12].copy_from_slice(b"Tadb");
    block[12..16].copy_from_slice(&random_bytes(4));

    aes::aes256_ecb_encrypt_block(file_key, &block).map_err(|m| Error::Unsupported(m.to_string()))
}

/// Generate pseudo-random bytes by hashing fresh UUIDs with a nanosecond
/// timestamp.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(uuid::Uuid::new_v4().as_bytes());
        hasher.update(uuid::Uuid::new_v4().as_bytes());

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        hasher.update(now.as_nanos().to_le_bytes());

        let digest = hasher.finalize();
        let take = (len - out.len()).min(digest.len());
        out.extend_from_slice(&digest[..take]);
    }
    out
}

/// Generate a fresh 16-byte AES initialization vector.
pub(crate) fn generate_iv() -> [u8; 16] {
    let bytes = random_bytes(16);
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&bytes);
    iv
}
