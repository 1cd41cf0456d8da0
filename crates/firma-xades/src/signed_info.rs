#![forbid(unsafe_code)]

//! `ds:SignedInfo` and the whole-document digest.

use firma_core::ns::{self, node, prefix};
use firma_core::{algorithm, Error};
use firma_xml::{Element, NodeSet};

use crate::context::SigningContext;
use crate::fragment::{self, DocumentNamespaces, Fragment};
use crate::keyinfo::KEY_INFO_SUFFIX;
use crate::options::SignatureOptions;
use crate::reference::{self, Reference};
use crate::signed_props::SIGNED_PROPS_SUFFIX;

/// Suffix of the document Reference id.
pub const DOCUMENT_REF_SUFFIX: &str = "ref0";

/// Digest of the unsigned document as the enveloped transform presents it
/// once the signature is attached: every node except comments.
pub fn document_digest(doc: &roxmltree::Document<'_>, options: &SignatureOptions) -> Result<String, Error> {
    let nodes = NodeSet::all_without_comments(doc);
    let canonical = firma_c14n::canonicalize_doc(
        doc,
        options.canonicalization.without_comments(),
        Some(&nodes),
        options.prefixes(),
    )?;
    let digest = firma_crypto::digest_base64(canonical.as_bytes(), &options.digest_method);
    tracing::debug!(%digest, bytes = canonical.len(), "document digest");
    Ok(digest)
}

/// The three References in protocol order: document, KeyInfo,
/// SignedProperties.
pub fn references(
    ctx: &SigningContext,
    document_digest: String,
    key_info: &Fragment,
    signed_properties: &Fragment,
    options: &SignatureOptions,
) -> [Reference; 3] {
    [
        Reference::enveloped(ctx.part_id(DOCUMENT_REF_SUFFIX), document_digest, options),
        Reference::fragment(&ctx.part_id(KEY_INFO_SUFFIX), key_info.digest.clone(), options),
        Reference::fragment(
            &ctx.part_id(SIGNED_PROPS_SUFFIX),
            signed_properties.digest.clone(),
            options,
        )
        .with_type(algorithm::SIGNED_PROPERTIES_TYPE),
    ]
}

/// Build `ds:SignedInfo` over `references`.
pub fn build_signed_info(
    references: &[Reference],
    namespaces: &DocumentNamespaces,
    options: &SignatureOptions,
) -> Element {
    let ds = |name: &str| format!("{}:{name}", prefix::DS);

    let mut c14n_method = Element::new(ds(node::CANONICALIZATION_METHOD))
        .attr(ns::attr::ALGORITHM, options.canonicalization.uri());
    if let Some(list) = reference::inclusive_prefix_list(options) {
        c14n_method.push(reference::inclusive_namespaces(&list));
    }

    let signed_info = namespaces
        .declare(Element::new(ds(node::SIGNED_INFO)), &[(prefix::DS, ns::DSIG)])
        .child(c14n_method)
        .child(Element::new(ds(node::SIGNATURE_METHOD)).attr(ns::attr::ALGORITHM, &options.signature_method));

    references
        .iter()
        .fold(signed_info, |si, r| si.child(r.to_element()))
}

/// Canonical bytes of SignedInfo, the input to the signature primitive.
pub fn canonical_signed_info(signed_info: &Element, options: &SignatureOptions) -> Result<Vec<u8>, Error> {
    fragment::canonical_bytes(signed_info, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use firma_c14n::C14nMode;

    #[test]
    fn document_digest_ignores_comments_and_signature_position() {
        let opts = SignatureOptions::default();
        let plain = firma_xml::parse("<r xmlns=\"urn:d\"><a>1</a>\n</r>").unwrap();
        let commented = firma_xml::parse("<r xmlns=\"urn:d\"><!-- c --><a>1</a>\n</r>").unwrap();
        assert_eq!(
            document_digest(&plain, &opts).unwrap(),
            document_digest(&commented, &opts).unwrap()
        );
    }

    #[test]
    fn document_digest_of_known_text() {
        let opts = SignatureOptions::default();
        let doc = firma_xml::parse("<?xml version=\"1.0\"?>\n<r b=\"2\" a=\"1\"/>").unwrap();
        let expected = firma_crypto::digest_base64(b"<r a=\"1\" b=\"2\"></r>", algorithm::SHA256);
        assert_eq!(document_digest(&doc, &opts).unwrap(), expected);
    }

    #[test]
    fn signed_info_declares_methods() {
        let opts = SignatureOptions::default();
        let si = build_signed_info(&[], &DocumentNamespaces::default(), &opts);
        assert_eq!(
            si.to_xml(),
            format!(
                "<ds:SignedInfo xmlns:ds=\"{}\"><ds:CanonicalizationMethod Algorithm=\"{}\"/>\
                 <ds:SignatureMethod Algorithm=\"{}\"/></ds:SignedInfo>",
                ns::DSIG,
                algorithm::C14N,
                algorithm::RSA_SHA256
            )
        );
    }

    #[test]
    fn exclusive_canonicalization_method_carries_prefix_list() {
        let opts = SignatureOptions::default().with_canonicalization(C14nMode::Exclusive);
        let si = build_signed_info(&[], &DocumentNamespaces::default(), &opts);
        let method = si.child_elements().next().unwrap();
        assert_eq!(method.get_attr("Algorithm"), Some(algorithm::EXC_C14N));
        let inc = method.child_elements().next().unwrap();
        assert_eq!(inc.get_attr("PrefixList"), Some(algorithm::DEFAULT_INCLUSIVE_PREFIXES));
    }
}
