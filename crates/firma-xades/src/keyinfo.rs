#![forbid(unsafe_code)]

//! `ds:KeyInfo`: the signing certificate and its RSA key value.

use firma_core::ns::{self, node, prefix};
use firma_core::Error;
use firma_xml::Element;

use crate::context::SigningContext;
use crate::fragment::{DocumentNamespaces, Fragment};
use crate::options::SignatureOptions;

/// Suffix of the KeyInfo id.
pub const KEY_INFO_SUFFIX: &str = "keyinfo";

fn ds(name: &str) -> String {
    format!("{}:{name}", prefix::DS)
}

/// Build `ds:KeyInfo` tagged `xmldsig-<id>-keyinfo` and digest it.
pub fn build_key_info(
    ctx: &SigningContext,
    namespaces: &DocumentNamespaces,
    options: &SignatureOptions,
) -> Result<Fragment, Error> {
    let bundle = ctx.bundle();

    let x509_data = Element::new(ds(node::X509_DATA))
        .child(Element::new(ds(node::X509_CERTIFICATE)).text(bundle.certificate_base64()));

    let key_value = Element::new(ds(node::KEY_VALUE)).child(
        Element::new(ds(node::RSA_KEY_VALUE))
            .child(Element::new(ds(node::RSA_MODULUS)).text(bundle.modulus_base64()))
            .child(Element::new(ds(node::RSA_EXPONENT)).text(bundle.exponent_base64())),
    );

    let key_info = namespaces
        .declare(Element::new(ds(node::KEY_INFO)), &[(prefix::DS, ns::DSIG)])
        .attr(ns::attr::ID, ctx.part_id(KEY_INFO_SUFFIX))
        .child(x509_data)
        .child(key_value);

    Fragment::digest(key_info, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FixedId;

    fn context() -> SigningContext {
        let data = std::fs::read(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-data/keys/signer.p12"),
        )
        .unwrap();
        SigningContext::from_pkcs12(&data, "8753", &FixedId::new("abc123")).unwrap()
    }

    #[test]
    fn key_info_layout() {
        let ctx = context();
        let frag = build_key_info(&ctx, &DocumentNamespaces::default(), &SignatureOptions::default()).unwrap();
        let el = &frag.element;
        assert_eq!(el.name(), "ds:KeyInfo");
        assert_eq!(el.get_attr("Id"), Some("xmldsig-abc123-keyinfo"));
        let names: Vec<_> = el.child_elements().map(|c| c.name().to_owned()).collect();
        assert_eq!(names, ["ds:X509Data", "ds:KeyValue"]);

        let xml = el.to_xml();
        assert!(xml.contains("<ds:Exponent>AQAB</ds:Exponent>"));
        assert!(xml.contains(&format!(
            "<ds:X509Certificate>{}</ds:X509Certificate>",
            ctx.bundle().certificate_base64()
        )));
    }

    #[test]
    fn digest_matches_canonical_text() {
        let ctx = context();
        let opts = SignatureOptions::default();
        let frag = build_key_info(&ctx, &DocumentNamespaces::default(), &opts).unwrap();
        // Compact output with only a ds binding is already canonical.
        let expected = firma_crypto::digest_base64(frag.element.to_xml().as_bytes(), &opts.digest_method);
        assert_eq!(frag.digest, expected);
    }
}
