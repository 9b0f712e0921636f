//! AES-128-CBC helpers for the back office login form.
//!
//! The login page encrypts the password in the browser with a key and IV
//! that ship in the page's JavaScript. The server decrypts with the same
//! constants, so anyone reading the page source can forge ciphertexts.

use aes::Aes128;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use thiserror::Error;

/// Key embedded in `static/js/admin-login.js`.
pub const ADMIN_AES_KEY: &[u8; 16] = b"HackShopAdminKey";

/// IV embedded in `static/js/admin-login.js`.
pub const ADMIN_AES_IV: &[u8; 16] = b"1234567890123456";

type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;

/// Errors from decrypting a submitted password.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("ciphertext is empty")]
    Empty,

    #[error("ciphertext is not valid base64")]
    Base64,

    #[error("bad block length or padding")]
    Padding,

    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

/// Decrypt a base64 AES-128-CBC/PKCS7 ciphertext with the admin key and IV.
///
/// # Errors
///
/// Returns a `CryptoError` for empty input, bad base64, bad padding or
/// non-UTF-8 plaintext.
pub fn decrypt_admin_password(ciphertext: &str) -> Result<String, CryptoError> {
    decrypt(ciphertext, ADMIN_AES_KEY, ADMIN_AES_IV)
}

/// Decrypt a base64 AES-128-CBC/PKCS7 ciphertext.
///
/// # Errors
///
/// See [`decrypt_admin_password`].
pub fn decrypt(ciphertext: &str, key: &[u8; 16], iv: &[u8; 16]) -> Result<String, CryptoError> {
    let ciphertext = ciphertext.trim();
    if ciphertext.is_empty() {
        return Err(CryptoError::Empty);
    }

    let bytes = BASE64.decode(ciphertext).map_err(|_| CryptoError::Base64)?;
    let plain = Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&bytes)
        .map_err(|_| CryptoError::Padding)?;

    String::from_utf8(plain).map_err(|_| CryptoError::Utf8)
}

/// Encrypt like the login page does. Used by the CLI and tests.
#[must_use]
pub fn encrypt_admin_password(plaintext: &str) -> String {
    let bytes = Aes128CbcEnc::new(ADMIN_AES_KEY.into(), ADMIN_AES_IV.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    BASE64.encode(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_with_lab_key() {
        let ct = encrypt_admin_password("admin123");
        assert_eq!(decrypt_admin_password(&ct).unwrap(), "admin123");
    }

    #[test]
    fn test_short_password_is_one_block() {
        let ct = encrypt_admin_password("admin123");
        assert_eq!(BASE64.decode(&ct).unwrap().len(), 16);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(decrypt_admin_password(""), Err(CryptoError::Empty));
        assert_eq!(decrypt_admin_password("not base64!"), Err(CryptoError::Base64));
        assert_eq!(
            decrypt_admin_password(&BASE64.encode(b"short")),
            Err(CryptoError::Padding)
        );
    }

    #[test]
    fn test_wrong_key_fails_or_differs() {
        let ct = encrypt_admin_password("admin123");
        let other = decrypt(&ct, b"0000000000000000", ADMIN_AES_IV);
        assert_ne!(other.ok().as_deref(), Some("admin123"));
    }
}
