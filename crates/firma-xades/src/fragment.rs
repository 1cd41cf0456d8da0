#![forbid(unsafe_code)]

//! Detached signature fragments and their canonical digests.
//!
//! Fragments are built outside the target document and spliced in later.
//! Each fragment root re-declares the namespaces that will be in scope at
//! its final position, and for C14N 1.x carries the root's inheritable
//! `xml:*` attributes, so its standalone canonical form is the one a
//! verifier computes after attachment.

use std::collections::BTreeMap;

use firma_c14n::C14nMode;
use firma_core::{ns, Error};
use firma_xml::Element;

use crate::options::SignatureOptions;

/// A built fragment and the digest of its canonical form.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub element: Element,
    pub digest: String,
}

impl Fragment {
    /// Canonicalize and digest `element` under `options`.
    pub fn digest(element: Element, options: &SignatureOptions) -> Result<Self, Error> {
        let canonical = canonical_bytes(&element, options)?;
        let digest = firma_crypto::digest_base64(&canonical, &options.digest_method);
        tracing::debug!(element = element.name(), %digest, "fragment digest");
        Ok(Self { element, digest })
    }
}

/// Canonical form of a detached element.
pub(crate) fn canonical_bytes(element: &Element, options: &SignatureOptions) -> Result<Vec<u8>, Error> {
    let text = element.to_xml();
    let doc = firma_xml::parse(&text)?;
    let form = firma_c14n::canonicalize_node(
        doc.root_element(),
        options.canonicalization,
        options.prefixes(),
    )?;
    Ok(form.into_bytes())
}

/// Namespace bindings and inherited `xml:*` attributes in scope on the
/// target document's root element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentNamespaces {
    bindings: BTreeMap<String, String>,
    xml_attrs: BTreeMap<String, String>,
}

impl DocumentNamespaces {
    /// Collect the root's in-scope bindings, and the `xml:*` attributes
    /// that `mode` passes down to a signature fragment.
    ///
    /// Fails when the root binds a prefix the signature needs to a
    /// different namespace.
    pub fn of_root(doc: &roxmltree::Document<'_>, mode: C14nMode) -> Result<Self, Error> {
        let root = doc.root_element();
        let bindings = firma_c14n::render::inscope_namespaces(&root);
        for (prefix, uri) in [
            (ns::prefix::DS, ns::DSIG),
            (ns::prefix::XADES, ns::XADES),
            (ns::prefix::XADES141, ns::XADES141),
        ] {
            if let Some(bound) = bindings.get(prefix) {
                if bound != uri {
                    return Err(Error::XmlStructure(format!(
                        "document binds prefix '{prefix}' to {bound}, expected {uri}"
                    )));
                }
            }
        }

        let xml_attrs = root
            .attributes()
            .filter(|a| a.namespace() == Some(ns::XML) && mode.inherits_xml_attr(a.name()))
            .map(|a| (a.name().to_owned(), a.value().to_owned()))
            .collect();
        Ok(Self { bindings, xml_attrs })
    }

    /// Declare the document bindings plus `extra` on `element`, and copy
    /// the inherited `xml:*` attributes onto it.
    pub fn declare(&self, element: Element, extra: &[(&str, &str)]) -> Element {
        let mut element = self
            .bindings
            .iter()
            .fold(element, |el, (prefix, uri)| el.ns(prefix, uri));
        for (prefix, uri) in extra {
            if !self.bindings.contains_key(*prefix) {
                element = element.ns(prefix, uri);
            }
        }
        self.xml_attrs
            .iter()
            .fold(element, |el, (name, value)| el.attr(format!("xml:{name}"), value))
    }

    /// Number of namespace bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_root_bindings() {
        let doc = firma_xml::parse(
            r#"<r xmlns="urn:doc" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><c/></r>"#,
        )
        .unwrap();
        let nss = DocumentNamespaces::of_root(&doc, C14nMode::Inclusive).unwrap();
        assert_eq!(nss.len(), 2);
        let el = nss.declare(Element::new("ds:KeyInfo"), &[(ns::prefix::DS, ns::DSIG)]);
        assert_eq!(el.get_attr("xmlns"), Some("urn:doc"));
        assert_eq!(el.get_attr("xmlns:ds"), Some(ns::DSIG));
    }

    #[test]
    fn conflicting_ds_binding_is_rejected() {
        let doc = firma_xml::parse(r#"<r xmlns:ds="urn:other"/>"#).unwrap();
        assert!(matches!(
            DocumentNamespaces::of_root(&doc, C14nMode::Inclusive),
            Err(Error::XmlStructure(_))
        ));
    }

    #[test]
    fn matching_ds_binding_is_not_redeclared() {
        let text = format!(r#"<r xmlns:ds="{}"/>"#, ns::DSIG);
        let doc = firma_xml::parse(&text).unwrap();
        let el = DocumentNamespaces::of_root(&doc, C14nMode::Inclusive)
            .unwrap()
            .declare(Element::new("ds:SignedInfo"), &[(ns::prefix::DS, ns::DSIG)]);
        assert_eq!(el.to_xml(), format!(r#"<ds:SignedInfo xmlns:ds="{}"/>"#, ns::DSIG));
    }

    #[test]
    fn root_xml_attrs_follow_the_mode() {
        let doc = firma_xml::parse(r#"<r xml:lang="es" xml:id="r1" xml:space="preserve"/>"#).unwrap();

        let el = DocumentNamespaces::of_root(&doc, C14nMode::Inclusive)
            .unwrap()
            .declare(Element::new("ds:KeyInfo"), &[(ns::prefix::DS, ns::DSIG)]);
        assert_eq!(el.get_attr("xml:lang"), Some("es"));
        assert_eq!(el.get_attr("xml:id"), Some("r1"));
        assert_eq!(el.get_attr("xml:space"), Some("preserve"));

        let el = DocumentNamespaces::of_root(&doc, C14nMode::Inclusive11)
            .unwrap()
            .declare(Element::new("ds:KeyInfo"), &[]);
        assert_eq!(el.get_attr("xml:lang"), Some("es"));
        assert_eq!(el.get_attr("xml:id"), None);

        let el = DocumentNamespaces::of_root(&doc, C14nMode::Exclusive)
            .unwrap()
            .declare(Element::new("ds:KeyInfo"), &[]);
        assert_eq!(el.get_attr("xml:lang"), None);
    }

    #[test]
    fn standalone_digest_ignores_declaration_order() {
        let opts = SignatureOptions::default();
        let a = Element::new("ds:X").ns("ds", ns::DSIG).ns("", "urn:doc").text("v");
        let b = Element::new("ds:X").ns("", "urn:doc").ns("ds", ns::DSIG).text("v");
        assert_eq!(
            Fragment::digest(a, &opts).unwrap().digest,
            Fragment::digest(b, &opts).unwrap().digest
        );
    }
}
