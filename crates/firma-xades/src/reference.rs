#![forbid(unsafe_code)]

//! `ds:Reference` values.

use firma_core::algorithm;
use firma_core::ns::{self, node, prefix};
use firma_xml::Element;

use crate::options::SignatureOptions;

fn ds(name: &str) -> String {
    format!("{}:{name}", prefix::DS)
}

/// One `ds:Transform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    pub algorithm: String,
    /// `ec:InclusiveNamespaces PrefixList`, exclusive canonicalization only.
    pub prefix_list: Option<String>,
}

impl Transform {
    pub fn enveloped() -> Self {
        Self {
            algorithm: algorithm::ENVELOPED_SIGNATURE.to_owned(),
            prefix_list: None,
        }
    }

    /// Canonicalization transform matching `options`.
    pub fn canonicalization(options: &SignatureOptions) -> Self {
        Self {
            algorithm: options.canonicalization.uri().to_owned(),
            prefix_list: inclusive_prefix_list(options),
        }
    }

    pub fn to_element(&self) -> Element {
        let el = Element::new(ds(node::TRANSFORM)).attr(ns::attr::ALGORITHM, &self.algorithm);
        match &self.prefix_list {
            Some(list) => el.child(inclusive_namespaces(list)),
            None => el,
        }
    }
}

/// `PrefixList` value when the configured method is exclusive.
pub(crate) fn inclusive_prefix_list(options: &SignatureOptions) -> Option<String> {
    if options.canonicalization.is_exclusive() && !options.inclusive_prefixes.is_empty() {
        Some(options.inclusive_prefixes.join(" "))
    } else {
        None
    }
}

/// `<ec:InclusiveNamespaces xmlns:ec=".." PrefixList=".."/>`.
pub(crate) fn inclusive_namespaces(list: &str) -> Element {
    Element::new(format!("{}:{}", prefix::EC, node::INCLUSIVE_NAMESPACES))
        .ns(prefix::EC, ns::EXC_C14N)
        .attr(ns::attr::PREFIX_LIST, list)
}

/// One signed object: where it is, how it is transformed, and its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: Option<String>,
    pub uri: String,
    pub ref_type: Option<String>,
    pub transforms: Vec<Transform>,
    pub digest_method: String,
    pub digest_value: String,
}

impl Reference {
    /// Reference to the whole enclosing document.
    pub fn enveloped(id: String, digest_value: String, options: &SignatureOptions) -> Self {
        let mut transforms = vec![Transform::enveloped()];
        if options.needs_c14n_transform() {
            transforms.push(Transform::canonicalization(options));
        }
        Self {
            id: Some(id),
            uri: String::new(),
            ref_type: None,
            transforms,
            digest_method: options.digest_method.clone(),
            digest_value,
        }
    }

    /// Reference to an element of the signature by its `Id`.
    pub fn fragment(target_id: &str, digest_value: String, options: &SignatureOptions) -> Self {
        let transforms = if options.needs_c14n_transform() {
            vec![Transform::canonicalization(options)]
        } else {
            Vec::new()
        };
        Self {
            id: None,
            uri: format!("#{target_id}"),
            ref_type: None,
            transforms,
            digest_method: options.digest_method.clone(),
            digest_value,
        }
    }

    pub fn with_type(mut self, ref_type: &str) -> Self {
        self.ref_type = Some(ref_type.to_owned());
        self
    }

    pub fn to_element(&self) -> Element {
        let mut el = Element::new(ds(node::REFERENCE));
        if let Some(id) = &self.id {
            el.set_attr(ns::attr::ID, id);
        }
        if let Some(ref_type) = &self.ref_type {
            el.set_attr(ns::attr::TYPE, ref_type);
        }
        el.set_attr(ns::attr::URI, &self.uri);

        if !self.transforms.is_empty() {
            let transforms = self
                .transforms
                .iter()
                .fold(Element::new(ds(node::TRANSFORMS)), |t, tr| t.child(tr.to_element()));
            el.push(transforms);
        }
        el.child(Element::new(ds(node::DIGEST_METHOD)).attr(ns::attr::ALGORITHM, &self.digest_method))
            .child(Element::new(ds(node::DIGEST_VALUE)).text(&self.digest_value))
    }
}
