//! AES encryption for PDF.
//!
//! PDF uses AES in CBC mode with PKCS#7 padding for object data (V4/V5).
//! The AES-256 handler additionally needs raw CBC without padding for the
//! OE/UE entries and a single ECB block for the Perms entry.

use aes::cipher::block_padding::NoPadding;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use aes::{Aes128, Aes256};
use cbc::Encryptor;

type Aes128CbcEnc = Encryptor<Aes128>;
type Aes256CbcEnc = Encryptor<Aes256>;

/// PKCS#7-pad `data` to the AES block size. A full padding block is added
/// when the input is already block-aligned.
fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad = 16 - data.len() % 16;
    let mut padded = Vec::with_capacity(data.len() + pad);
    padded.extend_from_slice(data);
    padded.extend(std::iter::repeat(pad as u8).take(pad));
    padded
}

/// Encrypt data with AES-128-CBC and PKCS#7 padding.
pub(crate) fn aes128_cbc_encrypt(
    key: &[u8],
    iv: &[u8; 16],
    data: &[u8],
) -> Result<Vec<u8>, &'static str> {
    if key.len() != 16 {
        return Err("AES-128 key must be 16 bytes");
    }

    let mut padded = pkcs7_pad(data);
    let len = padded.len();
    let cipher = Aes128CbcEnc::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
    cipher
        .encrypt_padded_mut::<NoPadding>(&mut padded, len)
        .map_err(|_| "AES-128 encryption failed")?;
    Ok(padded)
}

/// Encrypt data with AES-256-CBC and PKCS#7 padding.
pub(crate) fn aes256_cbc_encrypt(
    key: &[u8],
    iv: &[u8; 16],
    data: &[u8],
) -> Result<Vec<u8>, &'static str> {
    if key.len() != 32 {
        return Err("AES-256 key must be 32 bytes");
    }

    let mut padded = pkcs7_pad(data);
    let len = padded.len();
    let cipher = Aes256CbcEnc::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
    cipher
        .encrypt_padded_mut::<NoPadding>(&mut padded, len)
        .map_err(|_| "AES-256 encryption failed")?;
    Ok(padded)
}

/// Encrypt block-aligned data with AES-256-CBC and no padding.
///
/// Used for the OE and UE entries, which wrap the 32-byte file key under a
/// zero IV.
pub(crate) fn aes256_cbc_encrypt_no_pad(
    key: &[u8],
    iv: &[u8; 16],
    data: &[u8],
) -> Result<Vec<u8>, &'static str> {
    if key.len() != 32 {
        return Err("AES-256 key must be 32 bytes");
    }
    if data.len() % 16 != 0 {
        return Err("unpadded AES input must be block-aligned");
    }

    let mut buffer = data.to_vec();
    let len = buffer.len();
    let cipher = Aes256CbcEnc::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
    cipher
        .encrypt_padded_mut::<NoPadding>(&mut buffer, len)
        .map_err(|_| "AES-256 encryption failed")?;
    Ok(buffer)
}

/// Encrypt a single 16-byte block with AES-256 in ECB mode.
///
/// Used for the Perms entry of the AES-256 encryption dictionary.
pub(crate) fn aes256_ecb_encrypt_block(
    key: &[u8],
    block: &[u8; 16],
) -> Result<Vec<u8>, &'static str> {
    if key.len() != 32 {
        return Err("AES-256 key must be 32 bytes");
    }

    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut out = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut out);
    Ok(out.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::BlockDecrypt;

    fn aes128_cbc_decrypt(key: &[u8], iv: &[u8; 16], data: &[u8]) -> Vec<u8> {
        use aes::cipher::BlockDecryptMut;
        type Aes128CbcDec = cbc::Decryptor<Aes128>;

        let mut buffer = data.to_vec();
        let cipher = Aes128CbcDec::new(GenericArray::from_slice(key), GenericArray::from_slice(iv));
        let decrypted = cipher
            .decrypt_padded_mut::<NoPadding>(&mut buffer)
            .unwrap()
            .to_vec();
        let pad = *decrypted.last().unwrap() as usize;
        decrypted[..decrypted.len() - pad].to_vec()
    }

    #[test]
    fn test_aes128_ecb_known_vector() {
        // FIPS-197 derived vector: all-zero key, all-zero block
        let cipher = Aes128::new(GenericArray::from_slice(&[0u8; 16]));
        let mut block = GenericArray::clone_from_slice(&[0u8; 16]);
        cipher.encrypt_block(&mut block);
        assert_eq!(
            block.to_vec(),
            vec![
                0x66, 0xE9, 0x4B, 0xD4, 0xEF, 0x8A, 0x2C, 0x3B, 0x88, 0x4C, 0xFA, 0x59, 0xCA,
                0x34, 0x2B, 0x2E
            ]
        );
    }

    #[test]
    fn test_aes128_round_trip() {
        let key = b"0123456789abcdef";
        let iv = *b"fedcba9876543210";
        let plaintext = b"Hello, AES encryption!";

        let ciphertext = aes128_cbc_encrypt(key, &iv, plaintext).unwrap();
        assert_ne!(&ciphertext[..], &plaintext[..]);

        let decrypted = aes128_cbc_decrypt(key, &iv, &ciphertext);
        assert_eq!(&decrypted[..], plaintext);
    }

    #[test]
    fn test_pkcs7_always_pads() {
        // block-aligned input still gains a full padding block
        let key = b"0123456789abcdef";
        let iv = [0u8; 16];
        let aligned = [0x42u8; 16];
        let ciphertext = aes128_cbc_encrypt(key, &iv, &aligned).unwrap();
        assert_eq!(ciphertext.len(), 32);
    }

    #[test]
    fn test_ciphertext_length_formula() {
        let key = b"0123456789abcdef";
        let iv = [0u8; 16];
        for n in [0usize, 1, 15, 16, 17, 100] {
            let data = vec![0u8; n];
            let ciphertext = aes128_cbc_encrypt(key, &iv, &data).unwrap();
            assert_eq!(ciphertext.len(), ((n + 1) + 15) / 16 * 16);
        }
    }

    #[test]
    fn test_aes256_no_pad_preserves_length() {
        let key = [7u8; 32];
        let iv = [0u8; 16];
        let data = [1u8; 32];
        let ciphertext = aes256_cbc_encrypt_no_pad(&key, &iv, &data).unwrap();
        assert_eq!(ciphertext.len(), 32);
        assert_ne!(&ciphertext[..], &data[..]);
    }

    #[test]
    fn test_aes256_no_pad_rejects_unaligned_input() {
        let key = [7u8; 32];
        let iv = [0u8; 16];
        assert!(aes256_cbc_encrypt_no_pad(&key, &iv, &[0u8; 30]).is_err());
    }

    #[test]
    fn test_aes256_ecb_block_round_trip() {
        let key = [9u8; 32];
        let block = *b"0123456789abcdef";
        let ciphertext = aes256_ecb_encrypt_block(&key, &block).unwrap();
        assert_eq!(ciphertext.len(), 16);

        let cipher = Aes256::new(GenericArray::from_slice(&key));
        let mut decrypted = GenericArray::clone_from_slice(&ciphertext);
        cipher.decrypt_block(&mut decrypted);
        assert_eq!(decrypted.to_vec(), block.to_vec());
    }

    #[test]
    fn test_key_length_checks() {
        let iv = [0u8; 16];
        assert!(aes128_cbc_encrypt(b"short", &iv, b"data").is_err());
        assert!(aes256_cbc_encrypt(b"short", &iv, b"data").is_err());
        assert!(aes256_ecb_encrypt_block(b"short", &[0u8; 16]).is_err());
    }
}
