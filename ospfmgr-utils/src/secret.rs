//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

use sha2::{Digest, Sha256};

// Payloads are padded with NUL bytes up to a multiple of this size before
// encryption, so the visible cipher length only leaks a coarse length range.
const BLOCK_SIZE: usize = 16;

// Length of the key-check header prepended to the payload.
const HEADER_SIZE: usize = 16;

// Length of the integrity tag appended to the payload.
const MAC_SIZE: usize = 32;

// Secret-key codec.
//
// Deterministic symmetric encryption for authentication key material, keyed
// by a single process-wide passphrase. The cipher text is lowercase hex of
// `header(16) || payload || mac(32)`, where the header and the NUL-padded
// payload are XOR-encrypted with a SHA-256 counter keystream. The header lets
// decryption detect a wrong passphrase early, the MAC detects corruption.
#[derive(Clone, Debug)]
pub struct SecretCodec {
    key: [u8; 32],
}

// Errors signaled by the codec.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SecretError {
    TooLong,
    InvalidFormat,
}

// ===== impl SecretCodec =====

impl SecretCodec {
    pub fn new(passphrase: &str) -> SecretCodec {
        let mut hasher = Sha256::new();
        hasher.update(passphrase.as_bytes());
        SecretCodec {
            key: hasher.finalize().into(),
        }
    }

    // Number of hex characters produced when encrypting a plaintext of the
    // given length.
    pub const fn encrypted_len(plain_len: usize) -> usize {
        (HEADER_SIZE + plain_len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE + MAC_SIZE)
            * 2
    }

    // Encrypts `plain` into hex form. `out_len` is the caller's plaintext
    // buffer capacity, including the terminator, and bounds the accepted
    // plaintext length.
    pub fn encrypt(
        &self,
        plain: &str,
        out_len: usize,
    ) -> Result<String, SecretError> {
        if plain.len() + 1 > out_len {
            return Err(SecretError::TooLong);
        }

        let mut padded = plain.as_bytes().to_vec();
        padded.resize(plain.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);

        let mut buf = Vec::with_capacity(HEADER_SIZE + padded.len() + MAC_SIZE);
        buf.extend_from_slice(&self.header());
        buf.extend_from_slice(&padded);
        buf.extend_from_slice(&self.mac(&padded));
        self.apply_keystream(&mut buf);

        Ok(to_hex(&buf))
    }

    // Decrypts a hex cipher produced by `encrypt`. Decryption always targets
    // the full padded capacity; `out_len` (including the terminator) only
    // bounds the recovered plaintext length.
    pub fn decrypt(
        &self,
        cipher: &str,
        out_len: usize,
    ) -> Result<String, SecretError> {
        let mut buf = from_hex(cipher)?;
        if buf.len() < HEADER_SIZE + MAC_SIZE
            || (buf.len() - HEADER_SIZE - MAC_SIZE) % BLOCK_SIZE != 0
        {
            return Err(SecretError::InvalidFormat);
        }
        self.apply_keystream(&mut buf);

        let (header, rest) = buf.split_at(HEADER_SIZE);
        let (padded, mac) = rest.split_at(rest.len() - MAC_SIZE);
        if header != self.header() || mac != self.mac(padded) {
            return Err(SecretError::InvalidFormat);
        }

        // The padded buffer is NUL-terminated unless the plaintext fills it
        // exactly.
        let plain = match padded.iter().position(|byte| *byte == 0) {
            Some(pos) => &padded[..pos],
            None => padded,
        };
        if plain.len() + 1 > out_len {
            return Err(SecretError::TooLong);
        }
        String::from_utf8(plain.to_vec())
            .map_err(|_| SecretError::InvalidFormat)
    }

    // Key-check value, constant for a given passphrase.
    fn header(&self) -> [u8; HEADER_SIZE] {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(b"header");
        let digest = hasher.finalize();
        let mut header = [0; HEADER_SIZE];
        header.copy_from_slice(&digest[..HEADER_SIZE]);
        header
    }

    fn mac(&self, padded: &[u8]) -> [u8; MAC_SIZE] {
        let mut hasher = Sha256::new();
        hasher.update(self.key);
        hasher.update(b"mac");
        hasher.update(padded);
        hasher.finalize().into()
    }

    // XORs the buffer with a SHA-256 counter keystream. Symmetric, so the
    // same routine both encrypts and decrypts.
    fn apply_keystream(&self, buf: &mut [u8]) {
        for (counter, chunk) in buf.chunks_mut(MAC_SIZE).enumerate() {
            let mut hasher = Sha256::new();
            hasher.update(self.key);
            hasher.update(b"keystream");
            hasher.update((counter as u32).to_be_bytes());
            let block = hasher.finalize();
            for (byte, key_byte) in chunk.iter_mut().zip(block.iter()) {
                *byte ^= key_byte;
            }
        }
    }
}

// ===== impl SecretError =====

impl std::fmt::Display for SecretError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretError::TooLong => {
                write!(f, "key is too long")
            }
            SecretError::InvalidFormat => {
                write!(f, "invalid key format")
            }
        }
    }
}

impl std::error::Error for SecretError {}

// ===== helper functions =====

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn from_hex(input: &str) -> Result<Vec<u8>, SecretError> {
    if input.len() % 2 != 0
        || !input.bytes().all(|byte| byte.is_ascii_hexdigit())
    {
        return Err(SecretError::InvalidFormat);
    }
    input
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            let pair =
                std::str::from_utf8(pair).map_err(|_| SecretError::InvalidFormat)?;
            u8::from_str_radix(pair, 16).map_err(|_| SecretError::InvalidFormat)
        })
        .collect()
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> SecretCodec {
        SecretCodec::new("test passphrase")
    }

    #[test]
    fn round_trip() {
        let codec = codec();
        for plain in ["a", "hunter2", "0123456789abcdef"] {
            let cipher = codec.encrypt(plain, 17).unwrap();
            assert!(cipher.bytes().all(|byte| byte.is_ascii_hexdigit()));
            assert_eq!(cipher.len(), SecretCodec::encrypted_len(plain.len()));
            assert_eq!(codec.decrypt(&cipher, 17).unwrap(), plain);
            // Deterministic in both directions.
            assert_eq!(codec.encrypt(plain, 17).unwrap(), cipher);
        }
    }

    #[test]
    fn encrypt_too_long() {
        let codec = codec();
        assert_eq!(codec.encrypt("123456789", 9), Err(SecretError::TooLong));
        assert!(codec.encrypt("12345678", 9).is_ok());
    }

    #[test]
    fn decrypt_rejects_malformed() {
        let codec = codec();

        // Not hex.
        assert_eq!(codec.decrypt("zz", 9), Err(SecretError::InvalidFormat));
        // Too short to hold the header and MAC.
        assert_eq!(codec.decrypt("00ff", 9), Err(SecretError::InvalidFormat));
        // Valid structure but wrong key material.
        let cipher = SecretCodec::new("other").encrypt("secret", 9).unwrap();
        assert_eq!(codec.decrypt(&cipher, 9), Err(SecretError::InvalidFormat));
        // Corrupted payload.
        let mut cipher = codec.encrypt("secret", 9).unwrap();
        cipher.replace_range(40..41, if &cipher[40..41] == "0" { "1" } else { "0" });
        assert_eq!(codec.decrypt(&cipher, 9), Err(SecretError::InvalidFormat));
    }

    #[test]
    fn decrypt_too_long_for_capacity() {
        let codec = codec();
        let cipher = codec.encrypt("0123456789abcdef", 17).unwrap();
        assert_eq!(codec.decrypt(&cipher, 9), Err(SecretError::TooLong));
    }

    #[test]
    fn expansion_formula() {
        assert_eq!(SecretCodec::encrypted_len(1), 128);
        assert_eq!(SecretCodec::encrypted_len(8), 128);
        assert_eq!(SecretCodec::encrypted_len(16), 128);
        assert_eq!(SecretCodec::encrypted_len(17), 160);
    }
}
