#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for the firma signing engine.
//!
//! Implements the three W3C canonicalization families, each with and
//! without comments:
//! - Canonical XML 1.0
//! - Canonical XML 1.1
//! - Exclusive Canonical XML 1.0
//!
//! Unknown algorithm URIs select Exclusive C14N 1.0.

pub mod exclusive;
pub mod inclusive;
pub mod inclusive11;
pub mod render;

/// `xml:*` attributes C14N 1.1 never passes down to a subset apex.
pub(crate) const INCLUSIVE11_NON_INHERITABLE: &[&str] = &["id"];

use firma_core::{algorithm, Error};
use firma_xml::NodeSet;

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Canonical XML 1.1
    Inclusive11,
    /// Canonical XML 1.1 with comments
    Inclusive11WithComments,
    /// Exclusive Canonical XML 1.0
    #[default]
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Inclusive11 => algorithm::C14N11,
            Self::Inclusive11WithComments => algorithm::C14N11_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a C14N mode from an exact algorithm URI.
    pub fn parse_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N => Some(Self::Inclusive),
            algorithm::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            algorithm::C14N11 => Some(Self::Inclusive11),
            algorithm::C14N11_WITH_COMMENTS => Some(Self::Inclusive11WithComments),
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    /// Select a mode from an algorithm URI, falling back to Exclusive C14N
    /// 1.0 for anything unrecognized.
    pub fn from_uri(uri: &str) -> Self {
        Self::parse_uri(uri).unwrap_or_else(|| {
            tracing::warn!(uri, "unrecognized canonicalization method, using exclusive c14n");
            Self::Exclusive
        })
    }

    pub fn with_comments(&self) -> bool {
        matches!(
            self,
            Self::InclusiveWithComments | Self::Inclusive11WithComments | Self::ExclusiveWithComments
        )
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }

    /// Whether the apex of a document subset inherits the ancestor
    /// attribute `xml:<name>` under this mode.
    pub fn inherits_xml_attr(&self, name: &str) -> bool {
        match self.without_comments() {
            Self::Inclusive => true,
            Self::Inclusive11 => !INCLUSIVE11_NON_INHERITABLE.contains(&name),
            _ => false,
        }
    }

    /// The same algorithm family without comments.
    pub fn without_comments(&self) -> Self {
        match self {
            Self::Inclusive | Self::InclusiveWithComments => Self::Inclusive,
            Self::Inclusive11 | Self::Inclusive11WithComments => Self::Inclusive11,
            Self::Exclusive | Self::ExclusiveWithComments => Self::Exclusive,
        }
    }
}

impl std::fmt::Display for C14nMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.uri())
    }
}

/// Canonical bytes of a subtree or document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalForm(Vec<u8>);

impl CanonicalForm {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalForm {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Split an `InclusiveNamespaces` `PrefixList` value into prefixes.
pub fn parse_prefix_list(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_owned).collect()
}

/// Canonicalize a pre-parsed document.
pub fn canonicalize_doc(
    doc: &roxmltree::Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<CanonicalForm, Error> {
    let bytes = match mode {
        C14nMode::Inclusive | C14nMode::InclusiveWithComments => {
            inclusive::canonicalize(doc, mode.with_comments(), node_set)?
        }
        C14nMode::Inclusive11 | C14nMode::Inclusive11WithComments => {
            inclusive11::canonicalize(doc, mode.with_comments(), node_set)?
        }
        C14nMode::Exclusive | C14nMode::ExclusiveWithComments => {
            exclusive::canonicalize(doc, mode.with_comments(), node_set, inclusive_prefixes)?
        }
    };
    Ok(CanonicalForm(bytes))
}

/// Canonicalize the subtree rooted at `node`.
///
/// The subtree is treated as a document subset: ancestors are not output,
/// but their in-scope namespaces (and, for C14N 1.x, inherited `xml:*`
/// attributes) still apply to the apex element.
pub fn canonicalize_node(
    node: roxmltree::Node<'_, '_>,
    mode: C14nMode,
    inclusive_prefixes: &[String],
) -> Result<CanonicalForm, Error> {
    if !node.is_element() {
        return Err(Error::Canonicalization(
            "only element subtrees can be canonicalized".into(),
        ));
    }
    let set = if mode.with_comments() {
        NodeSet::tree_with_comments(node)
    } else {
        NodeSet::tree_without_comments(node)
    };
    canonicalize_doc(node.document(), mode, Some(&set), inclusive_prefixes)
}
