#![forbid(unsafe_code)]

//! Key derivation, MACs and bag decryption for PKCS#12.
//!
//! - PKCS#12 KDF (RFC 7292 Appendix B), used for the MAC key and the
//!   legacy PBE scheme
//! - PBKDF2 for PBES2 (RFC 8018)
//! - CBC decryption with PKCS#7 padding

use cipher::{block_padding::Pkcs7, BlockCipher, BlockDecryptMut, KeyInit, KeyIvInit};
use digest::{core_api::BlockSizeUser, Digest, FixedOutputReset};
use firma_core::Error;
use hmac::{Hmac, Mac};

/// What a PKCS#12 KDF invocation derives (RFC 7292 B.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfPurpose {
    Key = 1,
    Iv = 2,
    Mac = 3,
}

/// Hash functions used by PKCS#12 MACs, the PKCS#12 KDF and PBKDF2 PRFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PbeHash {
    Sha1,
    Sha256,
}

impl PbeHash {
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }

    /// PKCS#12 KDF with this hash.
    pub fn pkcs12_kdf(
        self,
        purpose: KdfPurpose,
        password: &BmpPassword,
        salt: &[u8],
        iterations: u32,
        output_len: usize,
    ) -> Vec<u8> {
        match self {
            Self::Sha1 => {
                pkcs12_kdf::<sha1::Sha1>(purpose, password.as_bytes(), salt, iterations, output_len)
            }
            Self::Sha256 => {
                pkcs12_kdf::<sha2::Sha256>(purpose, password.as_bytes(), salt, iterations, output_len)
            }
        }
    }

    /// HMAC of `data` under `key`.
    pub fn hmac(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        macro_rules! mac {
            ($hasher:ty) => {{
                let mut mac = <Hmac<$hasher> as Mac>::new_from_slice(key)
                    .map_err(|e| Error::Pkcs12(format!("HMAC key rejected: {e}")))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }};
        }
        match self {
            Self::Sha1 => mac!(sha1::Sha1),
            Self::Sha256 => mac!(sha2::Sha256),
        }
    }

    /// PBKDF2 with HMAC over this hash as PRF.
    pub fn pbkdf2(self, password: &[u8], salt: &[u8], iterations: u32, out: &mut [u8]) {
        match self {
            Self::Sha1 => pbkdf2::pbkdf2_hmac::<sha1::Sha1>(password, salt, iterations, out),
            Self::Sha256 => pbkdf2::pbkdf2_hmac::<sha2::Sha256>(password, salt, iterations, out),
        }
    }
}

/// A password encoded as BMPString (UTF-16BE plus a two-byte terminator).
///
/// The empty password encodes to zero bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct BmpPassword(Vec<u8>);

impl BmpPassword {
    pub fn new(password: &str) -> Self {
        if password.is_empty() {
            return Self(Vec::new());
        }
        let mut bmp: Vec<u8> = password.encode_utf16().flat_map(u16::to_be_bytes).collect();
        bmp.extend_from_slice(&[0, 0]);
        Self(bmp)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for BmpPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BmpPassword(..)")
    }
}

/// PKCS#12 KDF (RFC 7292 Appendix B.2) over hash `D`.
fn pkcs12_kdf<D>(
    purpose: KdfPurpose,
    password: &[u8],
    salt: &[u8],
    iterations: u32,
    output_len: usize,
) -> Vec<u8>
where
    D: Digest + FixedOutputReset + BlockSizeUser,
{
    let u = <D as Digest>::output_size();
    let v = <D as BlockSizeUser>::block_size();

    let diversifier = vec![purpose as u8; v];
    let mut input = repeat_to_multiple(salt, v);
    input.extend(repeat_to_multiple(password, v));

    let rounds = output_len.div_ceil(u);
    let mut result = Vec::with_capacity(rounds * u);
    let mut hasher = D::new();

    for round in 0..rounds {
        Digest::update(&mut hasher, &diversifier);
        Digest::update(&mut hasher, &input);
        let mut a = hasher.finalize_reset();
        for _ in 1..iterations {
            Digest::update(&mut hasher, &a);
            a = hasher.finalize_reset();
        }
        result.extend_from_slice(&a);

        if round + 1 < rounds {
            let b = repeat_to_multiple(&a, v);
            for chunk in input.chunks_mut(v) {
                add_with_carry(chunk, &b);
            }
        }
    }

    result.truncate(output_len);
    result
}

/// Concatenate copies of `data` up to the next multiple of `v` bytes.
fn repeat_to_multiple(data: &[u8], v: usize) -> Vec<u8> {
    let len = data.len().div_ceil(v) * v;
    data.iter().copied().cycle().take(len).collect()
}

/// `block = (block + b + 1) mod 2^(8 * len)`.
fn add_with_carry(block: &mut [u8], b: &[u8]) {
    let mut carry: u16 = 1;
    for (x, y) in block.iter_mut().rev().zip(b.iter().rev()) {
        let sum = *x as u16 + *y as u16 + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

/// CBC-decrypt with PKCS#7 unpadding.
pub fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let decryptor = cbc::Decryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| Error::Pkcs12(format!("CBC init failed: {e}")))?;
    let mut buf = ciphertext.to_vec();
    let plaintext = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| Error::Pkcs12("decryption failed (bad padding or wrong password)".into()))?;
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bmp_password_encoding() {
        assert!(BmpPassword::new("").as_bytes().is_empty());
        assert_eq!(BmpPassword::new("A").as_bytes(), [0x00, 0x41, 0x00, 0x00]);
        assert_eq!(
            BmpPassword::new("8753").as_bytes(),
            [0x00, 0x38, 0x00, 0x37, 0x00, 0x35, 0x00, 0x33, 0x00, 0x00]
        );
        assert_eq!(BmpPassword::new("\u{f1}").as_bytes(), [0x00, 0xf1, 0x00, 0x00]);
    }

    #[test]
    fn kdf_output_is_sized_and_purpose_bound() {
        let password = BmpPassword::new("8753");
        let salt = b"saltsalt";
        let key = PbeHash::Sha1.pkcs12_kdf(KdfPurpose::Key, &password, salt, 2048, 24);
        let again = PbeHash::Sha1.pkcs12_kdf(KdfPurpose::Key, &password, salt, 2048, 24);
        let iv = PbeHash::Sha1.pkcs12_kdf(KdfPurpose::Iv, &password, salt, 2048, 8);
        assert_eq!(key.len(), 24);
        assert_eq!(key, again);
        assert_eq!(iv.len(), 8);
        assert_ne!(&key[..8], &iv[..]);

        let mac = PbeHash::Sha256.pkcs12_kdf(KdfPurpose::Mac, &password, salt, 2048, 32);
        assert_eq!(mac.len(), PbeHash::Sha256.output_len());
    }

    #[test]
    fn carry_propagates() {
        let mut block = [0x00, 0xff, 0xff];
        add_with_carry(&mut block, &[0x00, 0x00, 0x00]);
        assert_eq!(block, [0x01, 0x00, 0x00]);
    }

    #[test]
    fn repeat_fills_block() {
        assert_eq!(repeat_to_multiple(b"abc", 4), b"abca");
        assert_eq!(repeat_to_multiple(b"ab", 2), b"ab");
        assert!(repeat_to_multiple(b"", 64).is_empty());
    }

    #[test]
    fn hmac_lengths() {
        assert_eq!(PbeHash::Sha1.hmac(b"k", b"d").unwrap().len(), 20);
        assert_eq!(PbeHash::Sha256.hmac(b"k", b"d").unwrap().len(), 32);
    }

    #[test]
    fn hmac_known_answers() {
        // RFC 2202 and RFC 4231, test case 2
        let data = b"what do ya want for nothing?";
        assert_eq!(
            PbeHash::Sha1.hmac(b"Jefe", data).unwrap(),
            [
                0xef, 0xfc, 0xdf, 0x6a, 0xe5, 0xeb, 0x2f, 0xa2, 0xd2, 0x74, 0x16, 0xd5, 0xf1, 0x84,
                0xdf, 0x9c, 0x25, 0x9a, 0x7c, 0x79,
            ]
        );
        assert_eq!(
            PbeHash::Sha256.hmac(b"Jefe", data).unwrap(),
            [
                0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95,
                0x75, 0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9,
                0x64, 0xec, 0x38, 0x43,
            ]
        );
    }
}
