//! Hashing, signing and URL-safe base64 primitives
//!
//! Pure functions with no state. The site's signing scheme mixes MD5 content
//! hashes with an HMAC-SHA256 signature, all carried in URL-safe base64.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex MD5 digest of the UTF-8 bytes of `text`.
pub fn md5_hex(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// HMAC-SHA256 of `message` keyed by `key`.
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::signing(format!("HMAC key rejected: {}", e)))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Standard base64 with `+`→`-`, `/`→`_` and padding stripped.
pub fn base64_url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode URL-safe or standard base64, re-padding as needed.
///
/// Surrounding whitespace is ignored. A length residue of 1 can never be valid
/// base64 and is rejected before decoding.
pub fn base64_url_decode(input: &str) -> Result<Vec<u8>> {
    let normalized: String = input
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let unpadded = normalized.trim_end_matches('=');

    if unpadded.len() % 4 == 1 {
        return Err(Error::decode(format!(
            "invalid base64 length {} for input {:?}",
            unpadded.len(),
            input
        )));
    }

    let mut padded = unpadded.to_string();
    let missing = (4 - padded.len() % 4) % 4;
    padded.extend(std::iter::repeat_n('=', missing));

    STANDARD
        .decode(padded.as_bytes())
        .map_err(|e| Error::decode(format!("{} (input {:?})", e, input)))
}

/// Constant-time check of an HMAC-SHA256 tag.
pub fn verify_hmac_sha256(key: &[u8], message: &[u8], tag: &[u8]) -> Result<bool> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::signing(format!("HMAC key rejected: {}", e)))?;
    mac.update(message);
    Ok(mac.verify_slice(tag).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_md5_hex_known_vectors() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_md5_hex_is_lowercase() {
        let digest = md5_hex("saltAfalsesaltB");
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_hmac_sha256_rfc4231_case_2() {
        let tag = hmac_sha256(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(tag),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_hmac_rejects_other_message() {
        let tag = hmac_sha256(b"key", b"message").unwrap();
        assert!(verify_hmac_sha256(b"key", b"message", &tag).unwrap());
        assert!(!verify_hmac_sha256(b"key", b"messagf", &tag).unwrap());
    }

    #[rstest]
    #[case::no_padding(b"abc".as_slice())]
    #[case::one_pad(b"abcde".as_slice())]
    #[case::two_pad(b"abcd".as_slice())]
    #[case::empty(b"".as_slice())]
    #[case::url_specials(&[0xfb, 0xff, 0xbf, 0x3e])]
    fn test_base64_url_idempotence(#[case] input: &[u8]) {
        let encoded = base64_url_encode(input);
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert_eq!(base64_url_decode(&encoded).unwrap(), input);
    }

    #[test]
    fn test_base64_url_decode_accepts_standard_alphabet() {
        assert_eq!(base64_url_decode("+/+/").unwrap(), vec![0xfb, 0xff, 0xbf]);
        assert_eq!(base64_url_decode("-_-_").unwrap(), vec![0xfb, 0xff, 0xbf]);
        assert_eq!(base64_url_decode("c2VjcmV0a2V5").unwrap(), b"secretkey");
        assert_eq!(base64_url_decode("YQ==").unwrap(), b"a");
    }

    #[rstest]
    #[case::residue_one("abcde")]
    #[case::bad_alphabet("ab$d")]
    #[case::single_char("a")]
    fn test_base64_url_decode_rejects(#[case] input: &str) {
        let err = base64_url_decode(input).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
