#![forbid(unsafe_code)]

//! X.509 certificate helpers: parsing, distinguished-name rendering,
//! serial numbers and RSA public keys.

use der::{Decode, Encode, Tag, Tagged};
use firma_core::Error;
use rsa::pkcs8::DecodePublicKey;
use x509_cert::name::Name;
use x509_cert::Certificate;

/// Parse a DER-encoded certificate.
pub fn parse_certificate(der_bytes: &[u8]) -> Result<Certificate, Error> {
    Certificate::from_der(der_bytes)
        .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))
}

/// The RSA public key of a certificate, or `None` for other key types.
pub fn rsa_public_key(cert: &Certificate) -> Result<Option<rsa::RsaPublicKey>, Error> {
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| Error::Certificate(format!("failed to encode SPKI: {e}")))?;
    Ok(rsa::RsaPublicKey::from_public_key_der(&spki_der).ok())
}

/// Render a distinguished name as `KEY=VALUE` pairs joined by `", "`.
///
/// Attributes are listed in reverse encoding order, so the most specific
/// component (usually `CN`) comes first. Values are not escaped.
pub fn render_name(name: &Name) -> String {
    let mut parts: Vec<String> = name
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .map(|atv| format!("{}={}", short_name(&atv.oid.to_string()), attribute_value(&atv.value)))
        .collect();
    parts.reverse();
    parts.join(", ")
}

/// Short attribute name for a dotted OID, or the OID itself.
pub fn short_name(oid: &str) -> &str {
    match oid {
        "2.5.4.3" => "CN",
        "2.5.4.4" => "SN",
        "2.5.4.5" => "serialNumber",
        "2.5.4.6" => "C",
        "2.5.4.7" => "L",
        "2.5.4.8" => "ST",
        "2.5.4.9" => "street",
        "2.5.4.10" => "O",
        "2.5.4.11" => "OU",
        "2.5.4.12" => "title",
        "2.5.4.42" => "GN",
        "1.2.840.113549.1.9.1" => "emailAddress",
        "0.9.2342.19200300.100.1.1" => "UID",
        "0.9.2342.19200300.100.1.25" => "DC",
        other => other,
    }
}

/// Text of a directory string attribute value.
fn attribute_value(value: &der::Any) -> String {
    let bytes = value.value();
    match value.tag() {
        Tag::BmpString => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        Tag::TeletexString => bytes.iter().map(|&b| b as char).collect(),
        _ => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_owned(),
            Err(_) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                format!("#{hex}")
            }
        },
    }
}

/// Decimal rendering of a DER INTEGER's content bytes (two's complement).
pub fn integer_to_decimal(bytes: &[u8]) -> String {
    let magnitude = rsa::BigUint::from_bytes_be(bytes);
    match bytes.first() {
        Some(b) if b & 0x80 != 0 => {
            let modulus = rsa::BigUint::from(1u8) << (8 * bytes.len());
            format!("-{}", modulus - magnitude)
        }
        _ => magnitude.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_serials() {
        assert_eq!(
            integer_to_decimal(&[0x4a, 0x3f, 0x9c, 0x00, 0x12, 0x34, 0x56, 0x78]),
            "5350166406458791544"
        );
        assert_eq!(integer_to_decimal(&[0x00, 0xff]), "255");
        assert_eq!(integer_to_decimal(&[0xff]), "-1");
        assert_eq!(integer_to_decimal(&[0x01]), "1");
    }

    #[test]
    fn short_names() {
        assert_eq!(short_name("2.5.4.3"), "CN");
        assert_eq!(short_name("1.2.840.113549.1.9.1"), "emailAddress");
        assert_eq!(short_name("1.3.6.1.4.1.99"), "1.3.6.1.4.1.99");
    }

    #[test]
    fn decodes_bmp_strings() {
        let any = der::Any::new(Tag::BmpString, vec![0x00, 0x4a, 0x00, 0xf3, 0x00, 0x73, 0x00, 0xe9]).unwrap();
        assert_eq!(attribute_value(&any), "J\u{f3}s\u{e9}");
    }
}
