#![forbid(unsafe_code)]

//! BER parsing of PKCS#12 (PFX) structures (RFC 7292).
//!
//! Uses `yasna::parse_ber` since PKCS#12 files use BER encoding, not strict DER.

use firma_core::Error;
use yasna::models::ObjectIdentifier;
use yasna::{ASN1Error, ASN1ErrorKind, BERReader, BERReaderSeq, Tag};

use crate::kdf::{self, BmpPassword, KdfPurpose, PbeHash};
use crate::Pkcs12Contents;

// ── OID constants ──────────────────────────────────────────────────────────

// Content types (PKCS#7)
const OID_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 1];
const OID_ENCRYPTED_DATA: &[u64] = &[1, 2, 840, 113549, 1, 7, 6];

// Bag types (PKCS#12)
const OID_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 1];
const OID_PKCS8_SHROUDED_KEY_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 2];
const OID_CERT_BAG: &[u64] = &[1, 2, 840, 113549, 1, 12, 10, 1, 3];
const OID_X509_CERTIFICATE: &[u64] = &[1, 2, 840, 113549, 1, 9, 22, 1];

// Password-based encryption
const OID_PBE_SHA1_3DES: &[u64] = &[1, 2, 840, 113549, 1, 12, 1, 3];
const OID_PBES2: &[u64] = &[1, 2, 840, 113549, 1, 5, 13];
const OID_PBKDF2: &[u64] = &[1, 2, 840, 113549, 1, 5, 12];

// PBES2 ciphers
const OID_AES_128_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 2];
const OID_AES_192_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 22];
const OID_AES_256_CBC: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 1, 42];
const OID_DES_EDE3_CBC: &[u64] = &[1, 2, 840, 113549, 3, 7];

// Hash / HMAC
const OID_SHA1: &[u64] = &[1, 3, 14, 3, 2, 26];
const OID_SHA256: &[u64] = &[2, 16, 840, 1, 101, 3, 4, 2, 1];
const OID_HMAC_SHA1: &[u64] = &[1, 2, 840, 113549, 2, 7];
const OID_HMAC_SHA256: &[u64] = &[1, 2, 840, 113549, 2, 9];

fn oid(components: &[u64]) -> ObjectIdentifier {
    ObjectIdentifier::from_slice(components)
}

fn invalid() -> ASN1Error {
    ASN1Error::new(ASN1ErrorKind::Invalid)
}

// ── Passwords ──────────────────────────────────────────────────────────────

/// The two encodings a PFX password is used in.
struct Password<'a> {
    /// PBES2 feeds the UTF-8 bytes to PBKDF2.
    utf8: &'a str,
    /// The PKCS#12 KDF takes the BMPString form.
    bmp: BmpPassword,
}

impl<'a> Password<'a> {
    fn new(utf8: &'a str) -> Self {
        Self {
            utf8,
            bmp: BmpPassword::new(utf8),
        }
    }
}

// ── Encryption schemes ─────────────────────────────────────────────────────

#[derive(Debug)]
enum EncryptionScheme {
    /// pbeWithSHAAnd3-KeyTripleDES-CBC
    PbeSha1TripleDes { salt: Vec<u8>, iterations: u32 },
    /// PBES2 with PBKDF2
    Pbes2 { kdf: Pbkdf2Params, cipher: Pbes2Cipher },
}

#[derive(Debug)]
struct Pbkdf2Params {
    salt: Vec<u8>,
    iterations: u32,
    prf: PbeHash,
}

#[derive(Debug)]
enum Pbes2Cipher {
    Aes128Cbc { iv: Vec<u8> },
    Aes192Cbc { iv: Vec<u8> },
    Aes256Cbc { iv: Vec<u8> },
    DesEde3Cbc { iv: Vec<u8> },
}

impl Pbes2Cipher {
    fn key_len(&self) -> usize {
        match self {
            Self::Aes128Cbc { .. } => 16,
            Self::Aes192Cbc { .. } | Self::DesEde3Cbc { .. } => 24,
            Self::Aes256Cbc { .. } => 32,
        }
    }

    fn decrypt(&self, key: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        match self {
            Self::Aes128Cbc { iv } => kdf::cbc_decrypt::<aes::Aes128>(key, iv, ciphertext),
            Self::Aes192Cbc { iv } => kdf::cbc_decrypt::<aes::Aes192>(key, iv, ciphertext),
            Self::Aes256Cbc { iv } => kdf::cbc_decrypt::<aes::Aes256>(key, iv, ciphertext),
            Self::DesEde3Cbc { iv } => kdf::cbc_decrypt::<des::TdesEde3>(key, iv, ciphertext),
        }
    }
}

impl EncryptionScheme {
    fn decrypt(&self, ciphertext: &[u8], password: &Password<'_>) -> Result<Vec<u8>, Error> {
        match self {
            Self::PbeSha1TripleDes { salt, iterations } => {
                let key = PbeHash::Sha1.pkcs12_kdf(KdfPurpose::Key, &password.bmp, salt, *iterations, 24);
                let iv = PbeHash::Sha1.pkcs12_kdf(KdfPurpose::Iv, &password.bmp, salt, *iterations, 8);
                kdf::cbc_decrypt::<des::TdesEde3>(&key, &iv, ciphertext)
            }
            Self::Pbes2 { kdf, cipher } => {
                let mut key = vec![0u8; cipher.key_len()];
                kdf.prf
                    .pbkdf2(password.utf8.as_bytes(), &kdf.salt, kdf.iterations, &mut key);
                cipher.decrypt(&key, ciphertext)
            }
        }
    }
}

// ── Parsed structures ──────────────────────────────────────────────────────

struct MacData {
    hash: PbeHash,
    digest: Vec<u8>,
    salt: Vec<u8>,
    iterations: u32,
}

impl MacData {
    fn verify(&self, auth_safe: &[u8], password: &Password<'_>) -> Result<(), Error> {
        let key = self.hash.pkcs12_kdf(
            KdfPurpose::Mac,
            &password.bmp,
            &self.salt,
            self.iterations,
            self.hash.output_len(),
        );
        if self.hash.hmac(&key, auth_safe)? != self.digest {
            return Err(Error::Pkcs12(
                "MAC verification failed (wrong password?)".into(),
            ));
        }
        Ok(())
    }
}

enum ContentInfo {
    Data(Vec<u8>),
    EncryptedData {
        scheme: EncryptionScheme,
        ciphertext: Vec<u8>,
    },
}

enum SafeBag {
    Key { pkcs8_der: Vec<u8> },
    ShroudedKey {
        scheme: EncryptionScheme,
        ciphertext: Vec<u8>,
    },
    Cert { cert_der: Vec<u8> },
    Other,
}

// ── Top-level parser ───────────────────────────────────────────────────────

pub fn parse_pfx(data: &[u8], password: &str) -> Result<Pkcs12Contents, Error> {
    let (auth_safe, mac) = yasna::parse_ber(data, |r| {
        r.read_sequence(|r| {
            let version = r.next().read_u32()?;
            if version != 3 {
                return Err(invalid());
            }
            let auth_safe = parse_data_content_info(r.next())?;
            let mac = r.read_optional(parse_mac_data)?;
            Ok((auth_safe, mac))
        })
    })
    .map_err(|e| Error::Pkcs12(format!("failed to parse PFX: {e}")))?;

    let password = Password::new(password);
    match &mac {
        Some(mac) => mac.verify(&auth_safe, &password)?,
        None => tracing::debug!("PKCS#12 bundle carries no MAC"),
    }

    let content_infos = yasna::parse_ber(&auth_safe, |r| r.collect_sequence_of(parse_content_info))
        .map_err(|e| Error::Pkcs12(format!("failed to parse authSafe contents: {e}")))?;

    let mut contents = Pkcs12Contents::default();
    for ci in content_infos {
        let bags_der = match ci {
            ContentInfo::Data(data) => data,
            ContentInfo::EncryptedData { scheme, ciphertext } => {
                scheme.decrypt(&ciphertext, &password)?
            }
        };

        let bags = yasna::parse_ber(&bags_der, |r| r.collect_sequence_of(parse_safe_bag))
            .map_err(|e| Error::Pkcs12(format!("failed to parse SafeBags: {e}")))?;

        for bag in bags {
            match bag {
                SafeBag::Key { pkcs8_der } => contents.private_keys.push(pkcs8_der),
                SafeBag::ShroudedKey { scheme, ciphertext } => {
                    contents
                        .private_keys
                        .push(scheme.decrypt(&ciphertext, &password)?);
                }
                SafeBag::Cert { cert_der } => contents.certificates.push(cert_der),
                SafeBag::Other => {}
            }
        }
    }

    tracing::debug!(
        keys = contents.private_keys.len(),
        certificates = contents.certificates.len(),
        "parsed PKCS#12 bundle"
    );
    Ok(contents)
}

// ── ContentInfo parsing ────────────────────────────────────────────────────

/// The authSafe wrapper: a `data` ContentInfo holding an OCTET STRING.
fn parse_data_content_info(r: BERReader) -> Result<Vec<u8>, ASN1Error> {
    r.read_sequence(|r| {
        if r.next().read_oid()? != oid(OID_DATA) {
            return Err(invalid());
        }
        r.next().read_tagged(Tag::context(0), |r| r.read_bytes())
    })
}

fn parse_content_info(r: BERReader) -> Result<ContentInfo, ASN1Error> {
    r.read_sequence(|r| {
        let content_type = r.next().read_oid()?;
        if content_type == oid(OID_DATA) {
            let data = r.next().read_tagged(Tag::context(0), |r| r.read_bytes())?;
            return Ok(ContentInfo::Data(data));
        }
        if content_type != oid(OID_ENCRYPTED_DATA) {
            return Err(invalid());
        }
        r.next().read_tagged(Tag::context(0), |r| {
            r.read_sequence(|r| {
                let _version = r.next().read_u32()?;
                r.next().read_sequence(|r| {
                    let _content_type = r.next().read_oid()?;
                    let scheme = parse_encryption_scheme(r.next())?;
                    let ciphertext = r
                        .next()
                        .read_tagged_implicit(Tag::context(0), |r| r.read_bytes())?;
                    Ok(ContentInfo::EncryptedData { scheme, ciphertext })
                })
            })
        })
    })
}

// ── SafeBag parsing ────────────────────────────────────────────────────────

fn parse_safe_bag(r: BERReader) -> Result<SafeBag, ASN1Error> {
    r.read_sequence(|r| {
        let bag_type = r.next().read_oid()?;
        let bag = if bag_type == oid(OID_PKCS8_SHROUDED_KEY_BAG) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let scheme = parse_encryption_scheme(r.next())?;
                    let ciphertext = r.next().read_bytes()?;
                    Ok(SafeBag::ShroudedKey { scheme, ciphertext })
                })
            })?
        } else if bag_type == oid(OID_KEY_BAG) {
            let pkcs8_der = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            SafeBag::Key { pkcs8_der }
        } else if bag_type == oid(OID_CERT_BAG) {
            r.next().read_tagged(Tag::context(0), |r| {
                r.read_sequence(|r| {
                    let cert_type = r.next().read_oid()?;
                    let value = r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
                    if cert_type != oid(OID_X509_CERTIFICATE) {
                        return Ok(SafeBag::Other);
                    }
                    let cert_der = yasna::parse_ber(&value, |r| r.read_bytes())?;
                    Ok(SafeBag::Cert { cert_der })
                })
            })?
        } else {
            r.next().read_tagged(Tag::context(0), |r| r.read_der())?;
            SafeBag::Other
        };
        skip_bag_attributes(r)?;
        Ok(bag)
    })
}

/// Consume the optional `bagAttributes` SET (friendlyName, localKeyId, ...).
fn skip_bag_attributes(r: &mut BERReaderSeq) -> Result<(), ASN1Error> {
    r.read_optional(|r| {
        r.read_set_of(|r| {
            r.read_sequence(|r| {
                let _attr_type = r.next().read_oid()?;
                r.next().read_set_of(|r| r.read_der().map(|_| ()))
            })
        })
    })?;
    Ok(())
}

// ── AlgorithmIdentifier parsing ────────────────────────────────────────────

fn parse_encryption_scheme(r: BERReader) -> Result<EncryptionScheme, ASN1Error> {
    r.read_sequence(|r| {
        let alg = r.next().read_oid()?;
        if alg == oid(OID_PBE_SHA1_3DES) {
            r.next().read_sequence(|r| {
                let salt = r.next().read_bytes()?;
                let iterations = r.next().read_u32()?;
                Ok(EncryptionScheme::PbeSha1TripleDes { salt, iterations })
            })
        } else if alg == oid(OID_PBES2) {
            r.next().read_sequence(|r| {
                let kdf = r.next().read_sequence(|r| {
                    if r.next().read_oid()? != oid(OID_PBKDF2) {
                        return Err(invalid());
                    }
                    r.next().read_sequence(parse_pbkdf2_params)
                })?;
                let cipher = r.next().read_sequence(|r| {
                    let cipher_oid = r.next().read_oid()?;
                    let iv = r.next().read_bytes()?;
                    if cipher_oid == oid(OID_AES_256_CBC) {
                        Ok(Pbes2Cipher::Aes256Cbc { iv })
                    } else if cipher_oid == oid(OID_AES_192_CBC) {
                        Ok(Pbes2Cipher::Aes192Cbc { iv })
                    } else if cipher_oid == oid(OID_AES_128_CBC) {
                        Ok(Pbes2Cipher::Aes128Cbc { iv })
                    } else if cipher_oid == oid(OID_DES_EDE3_CBC) {
                        Ok(Pbes2Cipher::DesEde3Cbc { iv })
                    } else {
                        Err(invalid())
                    }
                })?;
                Ok(EncryptionScheme::Pbes2 { kdf, cipher })
            })
        } else {
            Err(invalid())
        }
    })
}

/// PBKDF2-params: `SEQUENCE { salt, iterationCount, keyLength?, prf? }`.
fn parse_pbkdf2_params(r: &mut BERReaderSeq) -> Result<Pbkdf2Params, ASN1Error> {
    let salt = r.next().read_bytes()?;
    let iterations = r.next().read_u32()?;

    // keyLength (INTEGER) and prf (SEQUENCE) are both optional; read raw
    // and dispatch on the tag byte.
    let mut prf = PbeHash::Sha1;
    if let Some(first) = r.read_optional(|r| r.read_der())? {
        let prf_der = if first.first() == Some(&0x30) {
            Some(first)
        } else {
            r.read_optional(|r| r.read_der())?
        };
        if let Some(der) = prf_der {
            prf = parse_prf(&der)?;
        }
    }

    Ok(Pbkdf2Params {
        salt,
        iterations,
        prf,
    })
}

fn parse_prf(der: &[u8]) -> Result<PbeHash, ASN1Error> {
    yasna::parse_der(der, |r| {
        r.read_sequence(|r| {
            let prf_oid = r.next().read_oid()?;
            r.read_optional(|r| r.read_null())?;
            if prf_oid == oid(OID_HMAC_SHA256) {
                Ok(PbeHash::Sha256)
            } else if prf_oid == oid(OID_HMAC_SHA1) {
                Ok(PbeHash::Sha1)
            } else {
                Err(invalid())
            }
        })
    })
}

// ── MacData parsing ────────────────────────────────────────────────────────

fn parse_mac_data(r: BERReader) -> Result<MacData, ASN1Error> {
    r.read_sequence(|r| {
        let (hash, digest) = r.next().read_sequence(|r| {
            let hash = r.next().read_sequence(|r| {
                let hash_oid = r.next().read_oid()?;
                r.read_optional(|r| r.read_null())?;
                if hash_oid == oid(OID_SHA256) {
                    Ok(PbeHash::Sha256)
                } else if hash_oid == oid(OID_SHA1) {
                    Ok(PbeHash::Sha1)
                } else {
                    Err(invalid())
                }
            })?;
            let digest = r.next().read_bytes()?;
            Ok((hash, digest))
        })?;
        let salt = r.next().read_bytes()?;
        let iterations = r.read_optional(|r| r.read_u32())?.unwrap_or(1);
        Ok(MacData {
            hash,
            digest,
            salt,
            iterations,
        })
    })
}
