//! Positionally addressable page arena and document writer.
//!
//! Pages live in a `Vec` of [`PageRecord`]s and are referred to by index
//! until [`PdfBuilder::finish`] writes the page tree. Overlays are drawn
//! onto a page's canvas before it enters the arena, so nothing holds a
//! pointer back into the document.

use super::{
    Font, PdfError, RasterImage,
    canvas::{CanvasParts, PageCanvas, XObjectRef, opacity_resource_name, opacity_value},
};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, content::Content, dictionary};
use std::collections::BTreeSet;

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Upper bound on page-tree depth when walking `Parent` links.
const MAX_TREE_DEPTH: usize = 64;

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    /// Width in points.
    pub width: f32,
    /// Height in points.
    pub height: f32,
}

impl PageSize {
    /// ISO A4 portrait.
    pub const A4: Self = Self::new(595.28, 841.89);

    /// Creates a page size.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// One entry of the page arena.
#[derive(Debug)]
enum PageRecord {
    /// A page drawn by this builder.
    Drawn { size: PageSize, canvas: PageCanvas },
    /// A page object that already exists in a loaded document.
    Existing(ObjectId),
}

/// A page of a foreign document, imported as a form XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedPage {
    /// The form XObject holding the page content.
    pub xobject: XObjectRef,
    /// Source page size, taken from its media box.
    pub size: PageSize,
}

/// Builds a page-based document from drawn and existing pages.
#[derive(Debug)]
pub struct PdfBuilder {
    document: Document,
    pages: Vec<PageRecord>,
    catalog: Option<ObjectId>,
    fonts: ObjectId,
    next_xobject: usize,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::from_document(Document::with_version("1.7"), Vec::new(), None)
    }

    /// Loads an existing document; its pages enter the arena in source
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] when the bytes cannot be parsed or the page tree
    /// is malformed.
    pub fn load(bytes: &[u8]) -> Result<Self, PdfError> {
        let mut document = Document::load_mem(bytes)?;
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        for page_id in &page_ids {
            flatten_inherited(&mut document, *page_id)?;
        }
        let catalog = root_catalog(&document)?;
        let records = page_ids.into_iter().map(PageRecord::Existing).collect();
        Ok(Self::from_document(document, records, Some(catalog)))
    }

    fn from_document(
        mut document: Document,
        pages: Vec<PageRecord>,
        catalog: Option<ObjectId>,
    ) -> Self {
        let mut font_entries = Dictionary::new();
        for font in Font::ALL {
            let font_id = document.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            font_entries.set(font.resource_name(), font_id);
        }
        let fonts = document.add_object(font_entries);
        Self {
            document,
            pages,
            catalog,
            fonts,
            next_xobject: 0,
        }
    }

    /// Number of pages currently in the arena.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Appends a drawn page and returns its index.
    pub fn push_page(&mut self, size: PageSize, canvas: PageCanvas) -> usize {
        self.pages.push(PageRecord::Drawn { size, canvas });
        self.pages.len() - 1
    }

    /// Inserts drawn pages so the first of them lands at index `at`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PageOutOfRange`] when `at` is past the end of the
    /// arena.
    pub fn insert_pages(
        &mut self,
        at: usize,
        pages: impl IntoIterator<Item = (PageSize, PageCanvas)>,
    ) -> Result<(), PdfError> {
        if at > self.pages.len() {
            return Err(PdfError::PageOutOfRange {
                index: at,
                len: self.pages.len(),
            });
        }
        let records = pages
            .into_iter()
            .map(|(size, canvas)| PageRecord::Drawn { size, canvas });
        self.pages.splice(at..at, records);
        Ok(())
    }

    /// Returns the canvas of a drawn page.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::PageOutOfRange`] when no drawn page exists at
    /// `index`.
    pub fn canvas_mut(&mut self, index: usize) -> Result<&mut PageCanvas, PdfError> {
        let len = self.pages.len();
        match self.pages.get_mut(index) {
            Some(PageRecord::Drawn { canvas, .. }) => Ok(canvas),
            _ => Err(PdfError::PageOutOfRange { index, len }),
        }
    }

    fn next_name(&mut self, prefix: &str) -> String {
        self.next_xobject += 1;
        format!("{prefix}{}", self.next_xobject)
    }

    /// Registers a raster as an image XObject.
    pub fn add_image(&mut self, image: RasterImage) -> XObjectRef {
        let (width, height) = (image.width(), image.height());
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            image.into_samples(),
        );
        let id = self.document.add_object(stream);
        XObjectRef::new(self.next_name("Im"), id)
    }

    /// Imports every page of `bytes` as a form XObject.
    ///
    /// The source is fully parsed and validated before anything is copied,
    /// so a failure leaves this builder untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] when the source cannot be parsed, has no pages,
    /// or a page lacks usable content or a media box.
    pub fn import_pages(&mut self, bytes: &[u8]) -> Result<Vec<ImportedPage>, PdfError> {
        let mut source = Document::load_mem(bytes)?;
        source.renumber_objects_with(self.document.max_id + 1);

        let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PdfError::malformed("document has no pages"));
        }
        let captured = page_ids
            .iter()
            .map(|page_id| SourcePage::capture(&source, *page_id))
            .collect::<Result<Vec<_>, _>>()?;

        let skipped = page_tree_objects(&source);
        self.document.max_id = self.document.max_id.max(source.max_id);
        for (id, object) in source.objects {
            if !skipped.contains(&id) {
                self.document.objects.insert(id, object);
            }
        }

        Ok(captured
            .into_iter()
            .map(|page| self.add_form(page))
            .collect())
    }

    fn add_form(&mut self, page: SourcePage) -> ImportedPage {
        let [llx, lly, urx, ury] = page.media_box;
        let (width, height) = (urx - llx, ury - lly);
        // Maps the media box onto the origin, turned clockwise by `/Rotate`.
        let (matrix, size) = match page.rotation {
            90 => ([0.0, -1.0, 1.0, 0.0, -lly, width + llx], PageSize::new(height, width)),
            180 => (
                [-1.0, 0.0, 0.0, -1.0, width + llx, height + lly],
                PageSize::new(width, height),
            ),
            270 => ([0.0, 1.0, -1.0, 0.0, height + lly, -llx], PageSize::new(height, width)),
            _ => ([1.0, 0.0, 0.0, 1.0, -llx, -lly], PageSize::new(width, height)),
        };
        let mut form = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![llx.into(), lly.into(), urx.into(), ury.into()],
            "Matrix" => matrix.into_iter().map(Object::from).collect::<Vec<_>>(),
        };
        form.set(
            "Resources",
            page.resources
                .unwrap_or_else(|| Object::Dictionary(Dictionary::new())),
        );
        let id = self.document.add_object(Stream::new(form, page.content));
        ImportedPage {
            xobject: XObjectRef::new(self.next_name("Bp"), id),
            size,
        }
    }

    /// Writes the page tree and serializes the document.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError`] when content encoding or serialization fails.
    pub fn finish(mut self) -> Result<Vec<u8>, PdfError> {
        let pages_id = self.document.new_object_id();
        let records = std::mem::take(&mut self.pages);
        let mut kids = Vec::with_capacity(records.len());
        for record in records {
            let page_id = match record {
                PageRecord::Drawn { size, canvas } => self.write_page(pages_id, size, canvas)?,
                PageRecord::Existing(page_id) => {
                    self.document
                        .get_object_mut(page_id)?
                        .as_dict_mut()?
                        .set("Parent", pages_id);
                    page_id
                }
            };
            kids.push(Object::Reference(page_id));
        }
        let count = i64::try_from(kids.len())
            .map_err(|_| PdfError::malformed("too many pages"))?;
        self.document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = if let Some(catalog_id) = self.catalog {
            self.document
                .get_object_mut(catalog_id)?
                .as_dict_mut()?
                .set("Pages", pages_id);
            catalog_id
        } else {
            self.document.add_object(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            })
        };
        self.document.trailer.set("Root", catalog_id);
        self.document.prune_objects();
        self.document.compress();

        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn write_page(
        &mut self,
        parent: ObjectId,
        size: PageSize,
        canvas: PageCanvas,
    ) -> Result<ObjectId, PdfError> {
        let CanvasParts {
            operations,
            opacities,
            xobjects,
        } = canvas.into_parts();
        let content = Content { operations }.encode()?;
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), content));

        let mut resources = dictionary! { "Font" => self.fonts };
        if !opacities.is_empty() {
            let mut states = Dictionary::new();
            for permille in opacities {
                let alpha = opacity_value(permille);
                states.set(
                    opacity_resource_name(permille),
                    dictionary! { "Type" => "ExtGState", "ca" => alpha, "CA" => alpha },
                );
            }
            resources.set("ExtGState", states);
        }
        if !xobjects.is_empty() {
            let mut entries = Dictionary::new();
            for (name, id) in xobjects {
                entries.set(name, id);
            }
            resources.set("XObject", entries);
        }

        Ok(self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => parent,
            "MediaBox" => vec![0.into(), 0.into(), size.width.into(), size.height.into()],
            "Contents" => content_id,
            "Resources" => resources,
        }))
    }
}

/// Content and geometry captured from one page of a foreign document.
struct SourcePage {
    media_box: [f32; 4],
    /// Clockwise display rotation in degrees: 0, 90, 180 or 270.
    rotation: i64,
    resources: Option<Object>,
    content: Vec<u8>,
}

impl SourcePage {
    fn capture(document: &Document, page_id: ObjectId) -> Result<Self, PdfError> {
        let media_box = inherited(document, page_id, b"MediaBox")?
            .ok_or_else(|| PdfError::malformed(format!("page {page_id:?} has no media box")))
            .and_then(|value| parse_media_box(document, &value))?;
        let rotation = inherited(document, page_id, b"Rotate")?
            .map(|value| parse_rotation(document, &value))
            .transpose()?
            .unwrap_or(0);
        let resources = inherited(document, page_id, b"Resources")?;

        let mut content = Vec::new();
        for stream_id in document.get_page_contents(page_id) {
            let stream = document.get_object(stream_id)?.as_stream()?;
            if stream.dict.has(b"Filter") {
                content.extend(stream.decompressed_content()?);
            } else {
                content.extend_from_slice(&stream.content);
            }
            content.push(b'\n');
        }
        Ok(Self {
            media_box,
            rotation,
            resources,
            content,
        })
    }
}

fn resolve<'a>(document: &'a Document, value: &'a Object) -> Result<&'a Object, PdfError> {
    match value {
        Object::Reference(id) => Ok(document.get_object(*id)?),
        other => Ok(other),
    }
}

fn parse_media_box(document: &Document, value: &Object) -> Result<[f32; 4], PdfError> {
    let entries = resolve(document, value)?.as_array()?;
    let mut corners = [0.0_f32; 4];
    if entries.len() != corners.len() {
        return Err(PdfError::malformed("media box must have four entries"));
    }
    for (slot, entry) in corners.iter_mut().zip(entries) {
        *slot = resolve(document, entry)?.as_float()?;
    }
    let [llx, lly, urx, ury] = corners;
    if urx - llx <= 0.0 || ury - lly <= 0.0 {
        return Err(PdfError::malformed("media box has no area"));
    }
    Ok(corners)
}

fn parse_rotation(document: &Document, value: &Object) -> Result<i64, PdfError> {
    let degrees = resolve(document, value)?.as_i64()?;
    match degrees.rem_euclid(360) {
        normalized @ (0 | 90 | 180 | 270) => Ok(normalized),
        _ => Err(PdfError::malformed(format!(
            "page rotation {degrees} is not a multiple of 90"
        ))),
    }
}

/// Looks up `key` on the page or the nearest ancestor that defines it.
fn inherited(
    document: &Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<Object>, PdfError> {
    let mut node = document.get_dictionary(page_id)?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Ok(Some(value.clone()));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => node = document.get_dictionary(parent)?,
            Err(_) => return Ok(None),
        }
    }
    Err(PdfError::malformed("page tree is too deep"))
}

/// Copies inheritable attributes onto the page so it survives being
/// re-parented under a flat page tree.
fn flatten_inherited(document: &mut Document, page_id: ObjectId) -> Result<(), PdfError> {
    let mut resolved = Vec::new();
    for key in INHERITABLE_KEYS {
        if let Some(value) = inherited(document, page_id, key)? {
            resolved.push((key, value));
        }
    }
    let page = document.get_object_mut(page_id)?.as_dict_mut()?;
    for (key, value) in resolved {
        page.set(key, value);
    }
    Ok(())
}

fn root_catalog(document: &Document) -> Result<ObjectId, PdfError> {
    Ok(document.trailer.get(b"Root")?.as_reference()?)
}

/// Identifies the catalog and page-tree nodes, which are never copied out
/// of an imported document.
fn page_tree_objects(document: &Document) -> BTreeSet<ObjectId> {
    let mut skipped: BTreeSet<ObjectId> = document
        .objects
        .iter()
        .filter(|(_, object)| is_page_tree_node(object))
        .map(|(id, _)| *id)
        .collect();
    if let Ok(catalog) = root_catalog(document) {
        skipped.insert(catalog);
    }
    skipped
}

fn is_page_tree_node(object: &Object) -> bool {
    let Object::Dictionary(dict) = object else {
        return false;
    };
    matches!(
        dict.get(b"Type"),
        Ok(Object::Name(name)) if name.as_slice() == b"Page" || name.as_slice() == b"Pages"
    )
}
