// crypto.rs - RADIUS authenticator and attribute-encryption primitives
//
// MD5 and HMAC-MD5 are delegated to the RustCrypto `md-5`/`hmac` crates
// rather than hand-rolled, the same way `sile-stun_codec` and
// `Vagr9K-rust-stun-coder` in the reference pack reach for a dedicated
// crate instead of implementing MD5 inline.

use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use rand::RngCore;

use crate::error::EncodeError;

type HmacMd5 = Hmac<Md5>;

pub fn md5(chunks: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

/// HMAC-MD5(key = secret, data = message).
pub fn hmac_md5(secret: &[u8], message: &[u8]) -> [u8; 16] {
    let mut mac = HmacMd5::new_from_slice(secret).expect("HMAC accepts keys of any length");
    mac.update(message);
    mac.finalize().into_bytes().into()
}

/// Fill a buffer with cryptographically strong random bytes (Request
/// Authenticator generation, RFC 2865 §3: "unpredictability is essential").
pub fn fill_random(rng: &mut dyn RngCore, buf: &mut [u8]) {
    rng.fill_bytes(buf);
}

const MAX_PASSWORD_LEN: usize = 128;

/// RFC 2865 §5.2 User-Password obfuscation.
pub fn pw_crypt(password: &[u8], secret: &[u8], request_authenticator: &[u8; 16]) -> Result<Vec<u8>, EncodeError> {
    if password.len() > MAX_PASSWORD_LEN {
        return Err(EncodeError::PasswordTooLong(password.len()));
    }
    let padded_len = padded_len(password.len());
    let mut padded = vec![0u8; padded_len];
    padded[..password.len()].copy_from_slice(password);

    let mut out = Vec::with_capacity(padded_len);
    let mut prev_slice: Vec<u8> = request_authenticator.to_vec();
    for chunk in padded.chunks(16) {
        let b = md5(&[secret, &prev_slice]);
        let mut c = [0u8; 16];
        for i in 0..16 {
            c[i] = chunk[i] ^ b[i];
        }
        out.extend_from_slice(&c);
        prev_slice = c.to_vec();
    }
    Ok(out)
}

/// Symmetric decrypt of `pw_crypt`'s output, truncating at the first NUL
/// pad byte.
pub fn pw_decrypt(ciphertext: &[u8], secret: &[u8], request_authenticator: &[u8; 16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ciphertext.len());
    let mut prev_slice: Vec<u8> = request_authenticator.to_vec();
    for chunk in ciphertext.chunks(16) {
        let b = md5(&[secret, &prev_slice]);
        for i in 0..chunk.len() {
            out.push(chunk[i] ^ b[i]);
        }
        prev_slice = chunk.to_vec();
    }
    if let Some(nul) = out.iter().position(|&b| b == 0) {
        out.truncate(nul);
    }
    out
}

fn padded_len(len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    ((len + 15) / 16) * 16
}

/// RFC 2868 §3.5 Tunnel-Password obfuscation: a 2-octet salt (MSB of the
/// first octet set) followed by a 1-octet length prefix, then MD5-chained
/// ciphertext blocks seeded by `secret || request_authenticator || salt`.
pub fn tunnel_pw_crypt(
    password: &[u8],
    secret: &[u8],
    request_authenticator: &[u8; 16],
    salt: [u8; 2],
) -> Result<Vec<u8>, EncodeError> {
    if password.len() > MAX_PASSWORD_LEN {
        return Err(EncodeError::PasswordTooLong(password.len()));
    }
    let mut plain = Vec::with_capacity(1 + password.len());
    plain.push(password.len() as u8);
    plain.extend_from_slice(password);
    let padded_len = padded_len_min16(plain.len());
    let mut padded = vec![0u8; padded_len];
    padded[..plain.len()].copy_from_slice(&plain);

    let mut out = Vec::with_capacity(2 + padded_len);
    out.extend_from_slice(&salt);
    let mut prev_slice: Vec<u8> = {
        let mut v = request_authenticator.to_vec();
        v.extend_from_slice(&salt);
        v
    };
    for chunk in padded.chunks(16) {
        let b = md5(&[secret, &prev_slice]);
        let mut c = [0u8; 16];
        for i in 0..16 {
            c[i] = chunk[i] ^ b[i];
        }
        out.extend_from_slice(&c);
        prev_slice = c.to_vec();
    }
    Ok(out)
}

/// Decrypt a Tunnel-Password value produced by `tunnel_pw_crypt`.
pub fn tunnel_pw_decrypt(value: &[u8], secret: &[u8], request_authenticator: &[u8; 16]) -> Option<Vec<u8>> {
    if value.len() < 2 {
        return None;
    }
    let salt = [value[0], value[1]];
    let ciphertext = &value[2..];
    let mut plain = Vec::with_capacity(ciphertext.len());
    let mut prev_slice: Vec<u8> = {
        let mut v = request_authenticator.to_vec();
        v.extend_from_slice(&salt);
        v
    };
    for chunk in ciphertext.chunks(16) {
        if chunk.len() != 16 {
            return None;
        }
        let b = md5(&[secret, &prev_slice]);
        for i in 0..16 {
            plain.push(chunk[i] ^ b[i]);
        }
        prev_slice = chunk.to_vec();
    }
    let len = *plain.first()? as usize;
    if len + 1 > plain.len() {
        return None;
    }
    Some(plain[1..1 + len].to_vec())
}

fn padded_len_min16(len: usize) -> usize {
    let rounded = ((len + 15) / 16) * 16;
    rounded.max(16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2865_appendix_vector() {
        // RFC 2865 Appendix: secret "xyzzy5461", RA all-zero, password
        // "arctangent" -> the well-known worked example.
        let secret = b"xyzzy5461";
        let ra = [0u8; 16];
        let ciphertext = pw_crypt(b"arctangent", secret, &ra).unwrap();
        assert_eq!(
            ciphertext,
            vec![
                0x58, 0x9e, 0xc9, 0x42, 0x32, 0x50, 0xd8, 0x15, 0xba, 0x0c, 0xe2, 0x55, 0x03,
                0x4b, 0xf5, 0x21,
            ]
        );
        let decrypted = pw_decrypt(&ciphertext, secret, &ra);
        assert_eq!(decrypted, b"arctangent");
    }

    #[test]
    fn password_symmetry_property() {
        let secret = b"some shared secret";
        let ra = [7u8; 16];
        for len in [0, 1, 5, 16, 17, 32, 100, 128] {
            let password: Vec<u8> = (0..len).map(|i| (i % 251) as u8 + 1).collect();
            let ct = pw_crypt(&password, secret, &ra).unwrap();
            let pt = pw_decrypt(&ct, secret, &ra);
            assert_eq!(pt, password, "length {len} round-trip failed");
        }
    }

    #[test]
    fn password_over_128_rejected() {
        let secret = b"secret";
        let ra = [0u8; 16];
        let password = vec![b'x'; 129];
        assert!(pw_crypt(&password, secret, &ra).is_err());
    }

    #[test]
    fn accounting_request_authenticator_vector() {
        // code 4, id 0, length 0x0014, 16 zero bytes, secret "s"
        let header = [4u8, 0, 0, 0x14];
        let zero16 = [0u8; 16];
        let expect_input: Vec<u8> = header
            .iter()
            .chain(zero16.iter())
            .chain(b"s".iter())
            .copied()
            .collect();
        let expected = md5(&[&expect_input]);
        let got = md5(&[&header, &zero16, b"s"]);
        assert_eq!(got, expected);
    }

    #[test]
    fn tunnel_password_round_trips() {
        let secret = b"shared";
        let ra = [9u8; 16];
        let salt = [0x80, 0x01];
        for len in [0usize, 3, 16, 40] {
            let password: Vec<u8> = (0..len).map(|i| (i % 250) as u8 + 1).collect();
            let ct = tunnel_pw_crypt(&password, secret, &ra, salt).unwrap();
            let pt = tunnel_pw_decrypt(&ct, secret, &ra).unwrap();
            assert_eq!(pt, password);
        }
    }
}
