#![forbid(unsafe_code)]

//! `xades:SignedProperties`: signing time, signing certificate and the
//! signature policy.

use base64::Engine;
use chrono::SecondsFormat;
use firma_core::ns::{self, node, prefix};
use firma_core::{algorithm, Error};
use firma_crypto::HashAlgorithm;
use firma_xml::Element;

use crate::context::SigningContext;
use crate::fragment::{DocumentNamespaces, Fragment};
use crate::options::SignatureOptions;

/// Suffix of the SignedProperties id.
pub const SIGNED_PROPS_SUFFIX: &str = "signedprops";

fn ds(name: &str) -> String {
    format!("{}:{name}", prefix::DS)
}

fn xades(name: &str) -> String {
    format!("{}:{name}", prefix::XADES)
}

fn digest_pair(method: &str, value: String) -> [Element; 2] {
    [
        Element::new(ds(node::DIGEST_METHOD)).attr(ns::attr::ALGORITHM, method),
        Element::new(ds(node::DIGEST_VALUE)).text(value),
    ]
}

/// Signing time as RFC 3339 with seconds precision and a numeric offset.
pub fn format_signing_time(ctx: &SigningContext) -> String {
    ctx.signing_time().to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn signing_certificate(ctx: &SigningContext, options: &SignatureOptions) -> Element {
    let bundle = ctx.bundle();
    let hash = HashAlgorithm::resolve(&options.digest_method);
    let cert_digest = base64::engine::general_purpose::STANDARD
        .encode(firma_crypto::digest(hash, bundle.certificate_der()));

    let [method, value] = digest_pair(&options.digest_method, cert_digest);
    let cert = Element::new(xades(node::CERT))
        .child(Element::new(xades(node::CERT_DIGEST)).child(method).child(value))
        .child(
            Element::new(xades(node::ISSUER_SERIAL))
                .child(Element::new(ds(node::X509_ISSUER_NAME)).text(bundle.issuer_name()))
                .child(Element::new(ds(node::X509_SERIAL_NUMBER)).text(bundle.serial_number())),
        );

    Element::new(xades(node::SIGNING_CERTIFICATE)).child(cert)
}

fn signature_policy() -> Element {
    let [method, value] = digest_pair(
        algorithm::SIGNATURE_POLICY_DIGEST_METHOD,
        algorithm::SIGNATURE_POLICY_DIGEST.to_owned(),
    );
    let policy_id = Element::new(xades(node::SIGNATURE_POLICY_ID))
        .child(
            Element::new(xades(node::SIG_POLICY_ID))
                .child(Element::new(xades(node::IDENTIFIER)).text(algorithm::SIGNATURE_POLICY)),
        )
        .child(Element::new(xades(node::SIG_POLICY_HASH)).child(method).child(value));

    Element::new(xades(node::SIGNATURE_POLICY_IDENTIFIER)).child(policy_id)
}

/// Build `xades:SignedProperties` tagged `xmldsig-<id>-signedprops` and
/// digest it.
pub fn build_signed_properties(
    ctx: &SigningContext,
    namespaces: &DocumentNamespaces,
    options: &SignatureOptions,
) -> Result<Fragment, Error> {
    let signature_properties = Element::new(xades(node::SIGNED_SIGNATURE_PROPERTIES))
        .child(Element::new(xades(node::SIGNING_TIME)).text(format_signing_time(ctx)))
        .child(signing_certificate(ctx, options))
        .child(signature_policy());

    let signed_properties = namespaces
        .declare(
            Element::new(xades(node::SIGNED_PROPERTIES)),
            &[
                (prefix::DS, ns::DSIG),
                (prefix::XADES, ns::XADES),
                (prefix::XADES141, ns::XADES141),
            ],
        )
        .attr(ns::attr::ID, ctx.part_id(SIGNED_PROPS_SUFFIX))
        .child(signature_properties);

    Fragment::digest(signed_properties, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FixedId;
    use chrono::{DateTime, FixedOffset};

    fn context() -> SigningContext {
        let data = std::fs::read(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-data/keys/signer.p12"),
        )
        .unwrap();
        let time = DateTime::<FixedOffset>::parse_from_rfc3339("2019-03-05T10:22:33-06:00").unwrap();
        SigningContext::from_pkcs12(&data, "8753", &FixedId::new("abc123"))
            .unwrap()
            .with_signing_time(time)
    }

    fn build() -> Fragment {
        build_signed_properties(&context(), &DocumentNamespaces::default(), &SignatureOptions::default())
            .unwrap()
    }

    #[test]
    fn signing_time_keeps_offset() {
        assert_eq!(format_signing_time(&context()), "2019-03-05T10:22:33-06:00");
    }

    #[test]
    fn properties_layout() {
        let frag = build();
        let el = &frag.element;
        assert_eq!(el.name(), "xades:SignedProperties");
        assert_eq!(el.get_attr("Id"), Some("xmldsig-abc123-signedprops"));
        assert_eq!(el.get_attr("xmlns:xades141"), Some(ns::XADES141));

        let ssp = el.child_elements().next().unwrap();
        let names: Vec<_> = ssp.child_elements().map(|c| c.name().to_owned()).collect();
        assert_eq!(
            names,
            ["xades:SigningTime", "xades:SigningCertificate", "xades:SignaturePolicyIdentifier"]
        );
    }

    #[test]
    fn embeds_certificate_and_policy_values() {
        let xml = build().element.to_xml();
        assert!(xml.contains("<xades:SigningTime>2019-03-05T10:22:33-06:00</xades:SigningTime>"));
        assert!(xml.contains(
            "<ds:DigestValue>eYXSN26tUiZDm+W5rpb7MjQwuNUc5BtROG1tGnS08tM=</ds:DigestValue>"
        ));
        assert!(xml.contains(
            "<ds:X509IssuerName>CN=CA PERSONA JURIDICA - SANDBOX, OU=DGT, O=MINISTERIO DE HACIENDA - SANDBOX, C=CR</ds:X509IssuerName>"
        ));
        assert!(xml.contains("<ds:X509SerialNumber>5350166406458791544</ds:X509SerialNumber>"));
        assert!(xml.contains(&format!(
            "<xades:Identifier>{}</xades:Identifier>",
            algorithm::SIGNATURE_POLICY
        )));
        assert!(xml.contains(&format!(
            "<ds:DigestMethod Algorithm=\"{}\"/><ds:DigestValue>V8lVVNGDCPen6VELRD1Ja8HARFk=</ds:DigestValue>",
            algorithm::SHA1
        )));
    }

    #[test]
    fn certificate_digest_follows_digest_method() {
        let opts = SignatureOptions::default().with_digest_method(algorithm::SHA1);
        let frag = build_signed_properties(&context(), &DocumentNamespaces::default(), &opts).unwrap();
        let xml = frag.element.to_xml();
        let cert_sha1 = base64::engine::general_purpose::STANDARD.encode(firma_crypto::digest(
            HashAlgorithm::Sha1,
            context().bundle().certificate_der(),
        ));
        assert!(xml.contains(&cert_sha1));
        assert_ne!(frag.digest, build().digest);
    }

    #[test]
    fn digest_is_stable() {
        assert_eq!(build().digest, build().digest);
    }
}
