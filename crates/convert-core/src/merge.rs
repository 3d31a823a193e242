//! PDF merge
//!
//! Concatenates the pages of several PDFs into a single document, in the
//! order the inputs are given.

use crate::error::ConvertError;
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Merge PDFs into one document, preserving input order.
///
/// The first document becomes the destination. Every further document has
/// its object ids shifted past the destination's current `max_id`, its
/// objects copied over, and its pages appended to the destination page tree.
/// Fails if `documents` is empty or any input does not parse.
pub fn merge_pdfs(documents: &[Vec<u8>]) -> Result<Vec<u8>, ConvertError> {
    if documents.is_empty() {
        return Err(ConvertError::Operation("No documents to merge".into()));
    }

    let mut loaded = Vec::with_capacity(documents.len());
    for (i, bytes) in documents.iter().enumerate() {
        let doc = Document::load_mem(bytes).map_err(|e| {
            ConvertError::Parse(format!("document {} could not be loaded: {}", i + 1, e))
        })?;
        loaded.push(doc);
    }

    let mut sources = loaded.into_iter();
    let Some(mut dest) = sources.next() else {
        return Err(ConvertError::Operation("No documents to merge".into()));
    };
    let mut page_refs: Vec<ObjectId> = dest.get_pages().values().copied().collect();
    flatten_inherited(&mut dest, &page_refs);

    for mut source in sources {
        let offset = dest.max_id;
        let source_pages: Vec<ObjectId> = source.get_pages().values().copied().collect();
        flatten_inherited(&mut source, &source_pages);
        debug!(
            "Appending {} pages (id offset {})",
            source_pages.len(),
            offset
        );

        for ((num, gen), object) in source.objects {
            dest.objects
                .insert((num + offset, gen), shift_refs(object, offset));
        }
        page_refs.extend(source_pages.iter().map(|&(num, gen)| (num + offset, gen)));
        dest.max_id = dest.max_id.max(source.max_id + offset);
    }

    rebuild_page_tree(&mut dest, &page_refs)?;
    dest.prune_objects();
    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer)
        .map_err(|e| ConvertError::Operation(format!("Failed to save merged PDF: {}", e)))?;
    Ok(buffer)
}

/// Shift every indirect reference inside `obj` by `offset`.
fn shift_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference((num, gen)) => Object::Reference((num + offset, gen)),
        Object::Array(items) => {
            Object::Array(items.into_iter().map(|o| shift_refs(o, offset)).collect())
        }
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = shift_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = shift_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Collect inheritable attributes missing on the page from its ancestors.
pub(crate) fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let Ok(page) = doc.get_object(page_id).and_then(Object::as_dict) else {
        return Vec::new();
    };

    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        // Guard against cyclic Parent chains in malformed files.
        depth += 1;
        if depth > 64 {
            break;
        }
        let Ok(node) = doc.get_object(parent_id).and_then(Object::as_dict) else {
            break;
        };
        for key in INHERITABLE {
            let missing = !page.has(key) && !found.iter().any(|(k, _)| k.as_slice() == key);
            if missing {
                if let Ok(value) = node.get(key) {
                    found.push((key.to_vec(), value.clone()));
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    found
}

/// Copy inherited attributes onto each page so it no longer depends on the
/// page tree it came from.
pub(crate) fn flatten_inherited(doc: &mut Document, page_ids: &[ObjectId]) {
    for &page_id in page_ids {
        let inherited = inherited_attributes(doc, page_id);
        if let Some(Object::Dictionary(page)) = doc.objects.get_mut(&page_id) {
            for (key, value) in inherited {
                page.set(key, value);
            }
        }
    }
}

/// Resolve the id of the root `Pages` node through the trailer and catalog.
pub(crate) fn pages_root(doc: &Document) -> Result<ObjectId, ConvertError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| ConvertError::Operation("No Root in trailer".into()))?;

    doc.get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| ConvertError::Operation("Catalog has no Pages reference".into()))
}

/// Replace the root page tree's Kids with `page_refs` and re-parent each page.
pub(crate) fn rebuild_page_tree(
    doc: &mut Document,
    page_refs: &[ObjectId],
) -> Result<(), ConvertError> {
    let pages_id = pages_root(doc)?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages)) => {
            let kids = page_refs.iter().map(|&id| Object::Reference(id)).collect();
            pages.set("Kids", Object::Array(kids));
            pages.set("Count", Object::Integer(page_refs.len() as i64));
        }
        _ => {
            return Err(ConvertError::Operation(
                "Invalid pages dictionary".into(),
            ))
        }
    }

    for page_id in page_refs {
        if let Some(Object::Dictionary(page)) = doc.objects.get_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{create_test_pdf, page_markers};

    #[test]
    fn test_merge_empty_fails() {
        let err = merge_pdfs(&[]).unwrap_err();
        assert!(err.to_string().contains("No documents to merge"));
    }

    #[test]
    fn test_merge_two_documents_combines_pages() {
        let merged = merge_pdfs(&[create_test_pdf(2, "DocA"), create_test_pdf(3, "DocB")]).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        assert_eq!(doc.get_pages().len(), 5);
    }

    #[test]
    fn test_merge_preserves_input_order() {
        let merged = merge_pdfs(&[
            create_test_pdf(2, "First"),
            create_test_pdf(1, "Second"),
            create_test_pdf(2, "Third"),
        ])
        .unwrap();

        pretty_assertions::assert_eq!(
            page_markers(&merged),
            vec![
                "First-Page-1",
                "First-Page-2",
                "Second-Page-1",
                "Third-Page-1",
                "Third-Page-2",
            ]
        );
    }

    #[test]
    fn test_merge_handles_different_sizes() {
        let merged = merge_pdfs(&[
            create_test_pdf(10, "Large"),
            create_test_pdf(1, "Small"),
            create_test_pdf(5, "Medium"),
        ])
        .unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        assert_eq!(doc.get_pages().len(), 16);
    }

    #[test]
    fn test_merged_pages_point_at_single_page_tree() {
        let merged = merge_pdfs(&[create_test_pdf(1, "A"), create_test_pdf(1, "B")]).unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        let root = pages_root(&doc).unwrap();
        for page_id in doc.get_pages().values() {
            let parent = doc
                .get_object(*page_id)
                .and_then(Object::as_dict)
                .and_then(|d| d.get(b"Parent"))
                .and_then(Object::as_reference)
                .unwrap();
            assert_eq!(parent, root);
        }
    }

    /// A one-page PDF whose MediaBox and Resources live only on the Pages node.
    fn pdf_with_inherited_attributes(prefix: &str) -> Vec<u8> {
        let mut doc = Document::load_mem(&create_test_pdf(1, prefix)).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let pages_id = pages_root(&doc).unwrap();

        let media_box = match doc.objects.get_mut(&page_id) {
            Some(Object::Dictionary(page)) => page.remove(b"MediaBox").unwrap(),
            _ => panic!("page is not a dictionary"),
        };
        let mut font = lopdf::Dictionary::new();
        font.set("F1", Object::Name(b"Helvetica".to_vec()));
        let mut resources = lopdf::Dictionary::new();
        resources.set("Font", Object::Dictionary(font));

        if let Some(Object::Dictionary(pages)) = doc.objects.get_mut(&pages_id) {
            pages.set("MediaBox", media_box);
            pages.set("Resources", Object::Dictionary(resources));
        }

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_merge_keeps_attributes_inherited_from_page_tree() {
        let merged = merge_pdfs(&[
            create_test_pdf(1, "A"),
            pdf_with_inherited_attributes("B"),
        ])
        .unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
        assert_eq!(pages.len(), 2);

        let b_page = doc.get_object(pages[1]).and_then(Object::as_dict).unwrap();
        let media_box = b_page.get(b"MediaBox").and_then(Object::as_array).unwrap();
        assert_eq!(media_box.len(), 4);
        let resources = b_page.get(b"Resources").and_then(Object::as_dict).unwrap();
        assert!(resources.has(b"Font"));

        // The first input's page is unaffected.
        let a_page = doc.get_object(pages[0]).and_then(Object::as_dict).unwrap();
        assert!(a_page.has(b"MediaBox"));
        assert!(!a_page.has(b"Resources"));
    }

    #[test]
    fn test_destination_pages_keep_inherited_attributes() {
        let merged = merge_pdfs(&[
            pdf_with_inherited_attributes("A"),
            create_test_pdf(1, "B"),
        ])
        .unwrap();

        let doc = Document::load_mem(&merged).unwrap();
        pretty_assertions::assert_eq!(page_markers(&merged), vec!["A-Page-1", "B-Page-1"]);
        for page_id in doc.get_pages().values() {
            let page = doc.get_object(*page_id).and_then(Object::as_dict).unwrap();
            assert!(page.has(b"MediaBox"));
        }
    }

    #[test]
    fn test_merge_rejects_garbage_input() {
        let err = merge_pdfs(&[create_test_pdf(1, "Ok"), b"not a pdf".to_vec()]).unwrap_err();
        assert!(matches!(err, ConvertError::Parse(_)));
        assert!(err.to_string().contains("document 2"));
    }
}
