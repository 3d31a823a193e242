//! Password protection
//!
//! Copies the pages of a PDF into a fresh page tree and encrypts the result
//! with the standard security handler (RC4, 128-bit key).

use crate::error::ConvertError;
use crate::merge::{flatten_inherited, rebuild_page_tree};
use lopdf::{
    Dictionary, Document, EncryptionState, EncryptionVersion, Object, ObjectId, Permissions,
    StringFormat,
};
use tracing::debug;

const KEY_LENGTH_BITS: usize = 128;

/// Copy every page of `pdf` into a new document and encrypt it with `password`.
///
/// The password is used as both the user and the owner password, and all
/// permissions are granted once the document is opened.
pub fn protect_pdf(pdf: &[u8], password: &str) -> Result<Vec<u8>, ConvertError> {
    if password.is_empty() {
        return Err(ConvertError::Encrypt("password must not be empty".into()));
    }

    let source = Document::load_mem(pdf).map_err(|e| ConvertError::Parse(e.to_string()))?;
    if source.is_encrypted() {
        return Err(ConvertError::Encrypt("document is already encrypted".into()));
    }

    let mut doc = copy_pages(source)?;
    set_file_id(&mut doc);

    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password: password,
        user_password: password,
        key_length: KEY_LENGTH_BITS,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version)
        .map_err(|e| ConvertError::Encrypt(e.to_string()))?;
    doc.encrypt(&state)
        .map_err(|e| ConvertError::Encrypt(e.to_string()))?;

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ConvertError::Operation(format!("Failed to save protected PDF: {}", e)))?;
    Ok(buffer)
}

/// Rebuild `source` so it holds only its pages under a new catalog.
///
/// Inherited attributes are copied onto each page before the old tree is
/// dropped, so pages render the same once re-parented.
fn copy_pages(mut source: Document) -> Result<Document, ConvertError> {
    let page_ids: Vec<ObjectId> = source.get_pages().values().copied().collect();
    debug!("Copying {} pages", page_ids.len());

    flatten_inherited(&mut source, &page_ids);

    let pages_id = source.new_object_id();
    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    source.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = source.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    source.objects.insert(catalog_id, Object::Dictionary(catalog));

    source.trailer = Dictionary::new();
    source.trailer.set("Root", Object::Reference(catalog_id));

    rebuild_page_tree(&mut source, &page_ids)?;
    source.prune_objects();
    Ok(source)
}

/// The RC4 key derivation needs the first element of the trailer ID.
fn set_file_id(doc: &mut Document) {
    let id = uuid::Uuid::new_v4().as_bytes().to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}
