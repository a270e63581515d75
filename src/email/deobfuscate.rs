//! Cloudflare email obfuscation
//!
//! Cloudflare's "email address obfuscation" replaces each address with a hex
//! payload. The first byte is a single-byte XOR key; every following byte,
//! XORed with that key, is one character of the address.

use crate::DecodeError;

/// Decodes a Cloudflare-style obfuscated email payload
///
/// # Arguments
///
/// * `encoded` - Hex string: two digits of key followed by two digits per character
///
/// # Returns
///
/// * `Ok(String)` - The recovered address
/// * `Err(DecodeError)` - Empty payload, odd length or non-hex characters
///
/// # Example
///
/// ```
/// use ripple_harvest::decode_cf_email;
///
/// assert_eq!(decode_cf_email("107150723e73").unwrap(), "a@b.c");
/// assert!(decode_cf_email("10715").is_err());
/// ```
pub fn decode_cf_email(encoded: &str) -> Result<String, DecodeError> {
    let bytes = hex::decode(encoded.trim())?;
    let (key, payload) = bytes.split_first().ok_or(DecodeError::Empty)?;

    Ok(payload.iter().map(|b| char::from(b ^ key)).collect())
}

/// Produces the obfuscated payload for `address` under `key`
///
/// The inverse of [`decode_cf_email`] for ASCII input.
pub fn encode_cf_email(address: &str, key: u8) -> String {
    let mut bytes = Vec::with_capacity(address.len() + 1);
    bytes.push(key);
    bytes.extend(address.bytes().map(|b| b ^ key));
    hex::encode(bytes)
}
