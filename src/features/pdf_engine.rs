use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::{ToolboxError, ToolboxResult};

/// Document operations the PDF workflow needs from a PDF library.
pub trait PdfBackend: Send + Sync + 'static {
    type Document: Send + 'static;

    fn create(&self) -> ToolboxResult<Self::Document>;
    fn load(&self, bytes: &[u8]) -> ToolboxResult<Self::Document>;
    fn page_count(&self, doc: &Self::Document) -> usize;
    /// Width and height in points, in page order.
    fn page_sizes(&self, doc: &Self::Document) -> Vec<(f64, f64)>;
    /// Moves every page of `source` to the end of `target`, keeping order.
    fn append_pages(&self, target: &mut Self::Document, source: Self::Document) -> ToolboxResult<()>;
    fn set_page_size(&self, doc: &mut Self::Document, width: f64, height: f64) -> ToolboxResult<()>;
    /// Scales page boxes and content uniformly.
    fn scale_pages(&self, doc: &mut Self::Document, factor: f64) -> ToolboxResult<()>;
    fn save(&self, doc: Self::Document, optimize: bool) -> ToolboxResult<Vec<u8>>;
}

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl PdfBackend for LopdfBackend {
    type Document = Document;

    fn create(&self) -> ToolboxResult<Document> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Ok(doc)
    }

    fn load(&self, bytes: &[u8]) -> ToolboxResult<Document> {
        Document::load_mem(bytes).map_err(|e| ToolboxError::service("pdf", format!("pdf_parse_failed:{e}")))
    }

    fn page_count(&self, doc: &Document) -> usize {
        doc.get_pages().len()
    }

    fn page_sizes(&self, doc: &Document) -> Vec<(f64, f64)> {
        doc.get_pages()
            .values()
            .map(|id| page_dimensions(doc, *id).unwrap_or((595.0, 842.0)))
            .collect()
    }

    fn append_pages(&self, target: &mut Document, mut source: Document) -> ToolboxResult<()> {
        flatten_inherited_attributes(&mut source)?;

        let start_id = target.max_id + 1;
        source.renumber_objects_with(start_id);
        let source_page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

        for (id, obj) in source.objects.into_iter() {
            if is_catalog(&obj) {
                continue;
            }
            target.objects.insert(id, obj);
        }
        if source.max_id > target.max_id {
            target.max_id = source.max_id;
        }

        let pages_root_id = pages_root(target)?;
        {
            let pages_dict = target
                .get_object_mut(pages_root_id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|_| merge_error("missing_pages_dict"))?;
            let kids = pages_dict
                .get_mut(b"Kids")
                .and_then(|o| o.as_array_mut())
                .map_err(|_| merge_error("missing_kids"))?;
            for page_id in &source_page_ids {
                kids.push(Object::Reference(*page_id));
            }
            let count = pages_dict
                .get(b"Count")
                .and_then(|c| c.as_i64())
                .unwrap_or(0);
            pages_dict.set("Count", count + source_page_ids.len() as i64);
        }

        for page_id in source_page_ids {
            if let Ok(page_dict) = target.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
                page_dict.set("Parent", pages_root_id);
            }
        }
        Ok(())
    }

    fn set_page_size(&self, doc: &mut Document, width: f64, height: f64) -> ToolboxResult<()> {
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for page_id in page_ids {
            let page = doc
                .get_object_mut(page_id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|_| ToolboxError::service("pdf", "resize_page_missing_dict"))?;
            page.set("MediaBox", rect(0.0, 0.0, width, height));
            if page.has(b"CropBox") {
                page.set("CropBox", rect(0.0, 0.0, width, height));
            }
        }
        Ok(())
    }

    fn scale_pages(&self, doc: &mut Document, factor: f64) -> ToolboxResult<()> {
        if !(factor > 0.0) {
            return Err(ToolboxError::service("pdf", format!("invalid_scale:{factor}")));
        }
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for page_id in page_ids {
            let [llx, lly, urx, ury] = page_box(doc, page_id)?;
            let mut contents = page_contents(doc, page_id);
            let prefix = doc.add_object(Stream::new(
                dictionary! {},
                format!("q {factor} 0 0 {factor} 0 0 cm\n").into_bytes(),
            ));
            let suffix = doc.add_object(Stream::new(dictionary! {}, b"\nQ".to_vec()));
            contents.insert(0, Object::Reference(prefix));
            contents.push(Object::Reference(suffix));

            let page = doc
                .get_object_mut(page_id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|_| ToolboxError::service("pdf", "scale_page_missing_dict"))?;
            page.set("Contents", contents);
            // The content matrix scales about the origin, so the box corners scale with it.
            page.set("MediaBox", rect(llx * factor, lly * factor, urx * factor, ury * factor));
            page.remove(b"CropBox");
        }
        Ok(())
    }

    fn save(&self, mut doc: Document, optimize: bool) -> ToolboxResult<Vec<u8>> {
        if optimize {
            doc.prune_objects();
            doc.delete_zero_length_streams();
            doc.compress();
        }
        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| ToolboxError::service("pdf", format!("pdf_save_failed:{e}")))?;
        Ok(out)
    }
}

fn merge_error(what: &str) -> ToolboxError {
    ToolboxError::service("pdf", format!("pdf_merge_{what}"))
}

fn rect(llx: f64, lly: f64, urx: f64, ury: f64) -> Object {
    Object::Array(vec![
        Object::Real(llx as _),
        Object::Real(lly as _),
        Object::Real(urx as _),
        Object::Real(ury as _),
    ])
}

fn is_catalog(obj: &Object) -> bool {
    match obj.as_dict() {
        Ok(dict) => matches!(dict.get(b"Type").and_then(|t| t.as_name()), Ok(name) if name == b"Catalog"),
        Err(_) => false,
    }
}

fn pages_root(doc: &Document) -> ToolboxResult<ObjectId> {
    doc.catalog()
        .map_err(|e| merge_error(&format!("no_catalog:{e}")))?
        .get(b"Pages")
        .and_then(|o| o.as_reference())
        .map_err(|_| merge_error("missing_pages_root"))
}

/// Copies inherited page attributes onto each page so pages can be moved to
/// another page tree without losing their size or resources.
fn flatten_inherited_attributes(doc: &mut Document) -> ToolboxResult<()> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in page_ids {
        let mut inherited: Vec<(&[u8], Object)> = Vec::new();
        for key in INHERITABLE {
            if let Some(value) = find_inherited(doc, page_id, key) {
                inherited.push((key, value));
            }
        }
        let page = doc
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|_| merge_error("page_missing_dict"))?;
        for (key, value) in inherited {
            if !page.has(key) {
                page.set(key.to_vec(), value);
            }
        }
    }
    Ok(())
}

fn find_inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_object(id).and_then(|o| o.as_dict()).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    None
}

fn page_dimensions(doc: &Document, page_id: ObjectId) -> ToolboxResult<(f64, f64)> {
    let [llx, lly, urx, ury] = page_box(doc, page_id)?;
    Ok((urx - llx, ury - lly))
}

/// The page's MediaBox corners, following inheritance up the page tree.
fn page_box(doc: &Document, page_id: ObjectId) -> ToolboxResult<[f64; 4]> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc
            .get_object(id)
            .and_then(|o| o.as_dict())
            .map_err(|_| ToolboxError::service("pdf", "page_missing_dict"))?;
        if let Some(corners) = extract_media_box(doc, dict) {
            return Ok(corners);
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    // US Letter is the PDF default when no MediaBox is present anywhere.
    Ok([0.0, 0.0, 612.0, 792.0])
}

fn extract_media_box(doc: &Document, dict: &lopdf::Dictionary) -> Option<[f64; 4]> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    Some([
        obj_to_f64(&arr[0])?,
        obj_to_f64(&arr[1])?,
        obj_to_f64(&arr[2])?,
        obj_to_f64(&arr[3])?,
    ])
}

/// Content stream references of a page, with an indirect array flattened.
fn page_contents(doc: &Document, page_id: ObjectId) -> Vec<Object> {
    let Ok(page) = doc.get_object(page_id).and_then(|o| o.as_dict()) else {
        return Vec::new();
    };
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn obj_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}
