#![forbid(unsafe_code)]

//! The signature assembler.
//!
//! Signing runs four stages in order, with no way back:
//! 1. build the KeyInfo and SignedProperties fragments and the document digest
//! 2. canonicalize SignedInfo and sign it
//! 3. assemble the `ds:Signature` element
//! 4. splice it in as the last child of the document root
//!
//! A failure in any stage aborts the operation and nothing is returned but
//! the error. Writing the optional output file happens afterwards; a write
//! failure still hands back the signed document.

use std::path::{Path, PathBuf};

use base64::Engine;
use firma_c14n::C14nMode;
use firma_core::ns::{self, node, prefix};
use firma_core::Error;
use firma_crypto::HashAlgorithm;
use firma_xml::{Element, XmlDocument};

use crate::context::SigningContext;
use crate::fragment::{DocumentNamespaces, Fragment};
use crate::keyinfo::build_key_info;
use crate::options::SignatureOptions;
use crate::signed_info::{self, build_signed_info};
use crate::signed_props::build_signed_properties;

/// Suffix of the SignatureValue id.
pub const SIGNATURE_VALUE_SUFFIX: &str = "sigvalue";

// ── Errors ───────────────────────────────────────────────────────────

/// Broad failure class of a [`SignError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Crypto,
    Io,
}

/// Failure of a signing operation.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// Malformed document, unusable key material or an unsupported
    /// document layout.
    #[error("invalid input: {0}")]
    Input(#[source] Error),

    /// The signature primitive failed.
    #[error("signing failed: {0}")]
    Crypto(#[source] Error),

    /// The document was signed but could not be written out.
    #[error("failed to write signed document to {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        signed: Box<SignedDocument>,
    },
}

impl SignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(_) => ErrorKind::Input,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::Output { .. } => ErrorKind::Io,
        }
    }

    /// The signed document carried by an output error.
    pub fn into_signed_document(self) -> Option<SignedDocument> {
        match self {
            Self::Output { signed, .. } => Some(*signed),
            _ => None,
        }
    }
}

// ── Documents ────────────────────────────────────────────────────────

/// An unsigned document and where to write it once signed.
#[derive(Debug, Clone)]
pub struct TargetDocument {
    pub document: XmlDocument,
    pub output: Option<PathBuf>,
}

impl TargetDocument {
    pub fn new(document: XmlDocument) -> Self {
        Self {
            document,
            output: None,
        }
    }

    /// Parse `xml` into a target document.
    pub fn parse(xml: impl Into<String>) -> Result<Self, SignError> {
        XmlDocument::parse(xml.into())
            .map(Self::new)
            .map_err(SignError::Input)
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }
}

/// The signed result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedDocument {
    document: XmlDocument,
    signature_id: String,
}

impl SignedDocument {
    pub fn as_str(&self) -> &str {
        self.document.text()
    }

    pub fn into_string(self) -> String {
        self.document.into_text()
    }

    pub fn document(&self) -> &XmlDocument {
        &self.document
    }

    /// `Id` of the appended `ds:Signature`.
    pub fn signature_id(&self) -> &str {
        &self.signature_id
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.as_str())
    }

    /// Check SignatureValue against `public_key` over the canonical form of
    /// SignedInfo as found in the output.
    ///
    /// Only the engine's own signature is examined; References are not
    /// dereferenced.
    pub fn verify_signature_value(&self, public_key: &rsa::RsaPublicKey) -> Result<bool, Error> {
        let doc = self.document.parse_doc()?;
        let signature = XmlDocument::find_by_id(&doc, &self.signature_id)
            .filter(|n| n.tag_name().namespace() == Some(ns::DSIG))
            .ok_or_else(|| Error::XmlStructure(format!("signature {} not found", self.signature_id)))?;

        let signed_info = ds_child(signature, node::SIGNED_INFO)?;
        let c14n_method = ds_child(signed_info, node::CANONICALIZATION_METHOD)?;
        let mode = C14nMode::from_uri(c14n_method.attribute(ns::attr::ALGORITHM).unwrap_or_default());
        let prefixes = c14n_method
            .children()
            .find(|n| n.is_element() && n.tag_name().name() == node::INCLUSIVE_NAMESPACES)
            .and_then(|n| n.attribute(ns::attr::PREFIX_LIST))
            .map(firma_c14n::parse_prefix_list)
            .unwrap_or_default();
        let signature_method = ds_child(signed_info, node::SIGNATURE_METHOD)?
            .attribute(ns::attr::ALGORITHM)
            .unwrap_or_default();

        let canonical = firma_c14n::canonicalize_node(signed_info, mode, &prefixes)?;

        let value: String = ds_child(signature, node::SIGNATURE_VALUE)?
            .text()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let signature_value = base64::engine::general_purpose::STANDARD
            .decode(value)
            .map_err(|e| Error::Base64(e.to_string()))?;

        firma_crypto::verify_pkcs1v15(
            public_key,
            HashAlgorithm::resolve(signature_method),
            canonical.as_bytes(),
            &signature_value,
        )
    }
}

impl std::fmt::Display for SignedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn ds_child<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    local_name: &str,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    parent
        .children()
        .find(|n| {
            n.is_element() && n.tag_name().name() == local_name && n.tag_name().namespace() == Some(ns::DSIG)
        })
        .ok_or_else(|| Error::XmlStructure(format!("missing ds:{local_name}")))
}

// ── Signer ───────────────────────────────────────────────────────────

/// The parts of a signature before assembly.
struct SignatureBundle {
    key_info: Fragment,
    signed_properties: Fragment,
    signed_info: Element,
    signature_value: String,
}

/// Produces enveloped XAdES-BES signatures.
#[derive(Debug, Clone, Default)]
pub struct Signer {
    options: SignatureOptions,
}

impl Signer {
    pub fn new(options: SignatureOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SignatureOptions {
        &self.options
    }

    /// Sign `target` and append the signature to its root element.
    ///
    /// When `target` names an output path the signed document is written
    /// there; a write failure is reported as [`SignError::Output`], which
    /// still carries the signed document.
    #[tracing::instrument(skip_all, fields(id = ctx.id()))]
    pub fn sign(&self, ctx: SigningContext, target: TargetDocument) -> Result<SignedDocument, SignError> {
        let TargetDocument { document, output } = target;

        let (document_digest, key_info, signed_properties, namespaces) =
            self.build_fragments(&ctx, &document).map_err(SignError::Input)?;
        tracing::debug!("fragments built");

        let bundle = self.compute_signature(&ctx, document_digest, key_info, signed_properties, &namespaces)?;
        tracing::debug!("signature computed");

        let signature = self.assemble(&ctx, bundle);
        let signed = document
            .append_to_root(&signature.to_xml())
            .map_err(SignError::Input)?;
        let signed = SignedDocument {
            document: signed,
            signature_id: ctx.signature_id(),
        };
        tracing::info!(signature = signed.signature_id(), "document signed");

        if let Some(path) = output {
            if let Err(source) = signed.write_to(&path) {
                tracing::warn!(path = %path.display(), error = %source, "failed to write signed document");
                return Err(SignError::Output {
                    path,
                    source,
                    signed: Box::new(signed),
                });
            }
            tracing::info!(path = %path.display(), "signed document written");
        }
        Ok(signed)
    }

    fn build_fragments(
        &self,
        ctx: &SigningContext,
        document: &XmlDocument,
    ) -> Result<(String, Fragment, Fragment, DocumentNamespaces), Error> {
        let doc = document.parse_doc()?;
        let namespaces = DocumentNamespaces::of_root(&doc, self.options.canonicalization)?;
        let document_digest = signed_info::document_digest(&doc, &self.options)?;
        let key_info = build_key_info(ctx, &namespaces, &self.options)?;
        let signed_properties = build_signed_properties(ctx, &namespaces, &self.options)?;
        Ok((document_digest, key_info, signed_properties, namespaces))
    }

    fn compute_signature(
        &self,
        ctx: &SigningContext,
        document_digest: String,
        key_info: Fragment,
        signed_properties: Fragment,
        namespaces: &DocumentNamespaces,
    ) -> Result<SignatureBundle, SignError> {
        let references = signed_info::references(
            ctx,
            document_digest,
            &key_info,
            &signed_properties,
            &self.options,
        );
        let signed_info = build_signed_info(&references, namespaces, &self.options);
        let canonical =
            signed_info::canonical_signed_info(&signed_info, &self.options).map_err(SignError::Input)?;

        let hash = HashAlgorithm::resolve(&self.options.signature_method);
        let raw = ctx
            .bundle()
            .sign(hash, &canonical)
            .map_err(SignError::Crypto)?;
        let signature_value = base64::engine::general_purpose::STANDARD.encode(raw);

        Ok(SignatureBundle {
            key_info,
            signed_properties,
            signed_info,
            signature_value,
        })
    }

    fn assemble(&self, ctx: &SigningContext, bundle: SignatureBundle) -> Element {
        let ds = |name: &str| format!("{}:{name}", prefix::DS);
        let xades = |name: &str| format!("{}:{name}", prefix::XADES);

        let qualifying_properties = Element::new(xades(node::QUALIFYING_PROPERTIES))
            .ns(prefix::XADES, ns::XADES)
            .ns(prefix::XADES141, ns::XADES141)
            .attr(ns::attr::TARGET, format!("#{}", ctx.signature_id()))
            .child(bundle.signed_properties.element);

        Element::new(ds(node::SIGNATURE))
            .ns(prefix::DS, ns::DSIG)
            .attr(ns::attr::ID, ctx.signature_id())
            .child(bundle.signed_info)
            .child(
                Element::new(ds(node::SIGNATURE_VALUE))
                    .attr(ns::attr::ID, ctx.part_id(SIGNATURE_VALUE_SUFFIX))
                    .text(bundle.signature_value),
            )
            .child(bundle.key_info.element)
            .child(Element::new(ds(node::OBJECT)).child(qualifying_properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds() {
        let input = SignError::Input(Error::XmlParse("x".into()));
        assert_eq!(input.kind(), ErrorKind::Input);
        assert!(input.into_signed_document().is_none());

        let crypto = SignError::Crypto(Error::Crypto("x".into()));
        assert_eq!(crypto.kind(), ErrorKind::Crypto);
        assert!(crypto.to_string().starts_with("signing failed"));
    }

    #[test]
    fn altered_signed_info_fails_self_check() {
        let p12 = std::fs::read(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../test-data/keys/signer.p12"),
        )
        .unwrap();
        let key = std::sync::Arc::new(firma_keys::KeyBundle::from_pkcs12(&p12, "8753").unwrap());
        let ctx = SigningContext::new(key.clone(), &crate::FixedId::new("t1"));
        let signed = Signer::default()
            .sign(ctx, TargetDocument::parse("<r><a>1</a></r>").unwrap())
            .unwrap();
        assert!(signed.verify_signature_value(key.public_key()).unwrap());

        let text = signed.as_str();
        let at = text.find("<ds:DigestValue>").unwrap() + "<ds:DigestValue>".len();
        let flipped = if text[at..].starts_with('A') { "B" } else { "A" };
        let tampered = format!("{}{}{}", &text[..at], flipped, &text[at + 1..]);
        let tampered = SignedDocument {
            document: XmlDocument::parse(tampered).unwrap(),
            signature_id: signed.signature_id().to_owned(),
        };
        assert!(!tampered.verify_signature_value(key.public_key()).unwrap());
    }

    #[test]
    fn malformed_target_is_input_error() {
        let err = TargetDocument::parse("<a><b></a>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }
}
