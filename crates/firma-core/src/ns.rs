#![forbid(unsafe_code)]

//! XML namespace constants used across the engine.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Exclusive C14N namespace (carries `InclusiveNamespaces`)
pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";

/// XAdES 1.3.2 namespace
pub const XADES: &str = "http://uri.etsi.org/01903/v1.3.2#";

/// XAdES 1.4.1 namespace
pub const XADES141: &str = "http://uri.etsi.org/01903/v1.4.1#";

/// XML namespace
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";

// ── Prefixes ─────────────────────────────────────────────────────────

pub mod prefix {
    pub const DS: &str = "ds";
    pub const EC: &str = "ec";
    pub const XADES: &str = "xades";
    pub const XADES141: &str = "xades141";
}

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    // DSig elements
    pub const SIGNATURE: &str = "Signature";
    pub const SIGNED_INFO: &str = "SignedInfo";
    pub const CANONICALIZATION_METHOD: &str = "CanonicalizationMethod";
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    pub const SIGNATURE_VALUE: &str = "SignatureValue";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const DIGEST_VALUE: &str = "DigestValue";
    pub const OBJECT: &str = "Object";
    pub const REFERENCE: &str = "Reference";
    pub const TRANSFORMS: &str = "Transforms";
    pub const TRANSFORM: &str = "Transform";
    pub const INCLUSIVE_NAMESPACES: &str = "InclusiveNamespaces";

    // KeyInfo elements
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_VALUE: &str = "KeyValue";
    pub const RSA_KEY_VALUE: &str = "RSAKeyValue";
    pub const RSA_MODULUS: &str = "Modulus";
    pub const RSA_EXPONENT: &str = "Exponent";
    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
    pub const X509_ISSUER_NAME: &str = "X509IssuerName";
    pub const X509_SERIAL_NUMBER: &str = "X509SerialNumber";

    // XAdES elements
    pub const QUALIFYING_PROPERTIES: &str = "QualifyingProperties";
    pub const SIGNED_PROPERTIES: &str = "SignedProperties";
    pub const SIGNED_SIGNATURE_PROPERTIES: &str = "SignedSignatureProperties";
    pub const SIGNING_TIME: &str = "SigningTime";
    pub const SIGNING_CERTIFICATE: &str = "SigningCertificate";
    pub const CERT: &str = "Cert";
    pub const CERT_DIGEST: &str = "CertDigest";
    pub const ISSUER_SERIAL: &str = "IssuerSerial";
    pub const SIGNATURE_POLICY_IDENTIFIER: &str = "SignaturePolicyIdentifier";
    pub const SIGNATURE_POLICY_ID: &str = "SignaturePolicyId";
    pub const SIG_POLICY_ID: &str = "SigPolicyId";
    pub const IDENTIFIER: &str = "Identifier";
    pub const SIG_POLICY_HASH: &str = "SigPolicyHash";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const TYPE: &str = "Type";
    pub const ALGORITHM: &str = "Algorithm";
    pub const TARGET: &str = "Target";
    pub const PREFIX_LIST: &str = "PrefixList";
}
