#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.1 (C14N 1.1).
//!
//! Algorithm URI: `http://www.w3.org/2006/12/xml-c14n11`
//! With comments: `http://www.w3.org/2006/12/xml-c14n11#WithComments`
//!
//! Identical to C14N 1.0 except that `xml:id` is never inherited by the
//! apex of a document subset. `xml:base` values are inherited verbatim
//! rather than resolved against each other.

use firma_core::Error;
use firma_xml::NodeSet;

/// Canonicalize using Inclusive C14N 1.1.
pub fn canonicalize(
    doc: &roxmltree::Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    crate::inclusive::canonicalize_with(
        doc,
        with_comments,
        node_set,
        crate::INCLUSIVE11_NON_INHERITABLE,
    )
}
