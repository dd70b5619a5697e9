//! PDF/A document: object graph, conformance checks and output in one place.
//!
//! A [`PdfADocument`] is bound to one [`ConformanceLevel`] for its whole life.
//! Every mutation that can break conformance is checked when it happens,
//! every indirect object is checked once when it is flushed, and document
//! level requirements are swept when the document closes.
//!
//! ```ignore
//! use pdfa_oxide::{ConformanceLevel, DocumentConfig, IccProfile, OutputIntent, PageSize, PdfADocument};
//!
//! let intent = OutputIntent::new("sRGB IEC61966-2.1", IccProfile::parse(icc_bytes)?);
//! let mut doc = PdfADocument::new(Vec::new(), ConformanceLevel::A2b, Some(intent), DocumentConfig::new())?;
//! doc.set_lang("en-US")?;
//! let page = doc.add_page(PageSize::A4)?;
//! let mut canvas = doc.canvas(page.index)?;
//! canvas.save_state()?.set_fill_color_rgb(1.0, 0.0, 0.0)?.rectangle(72.0, 72.0, 100.0, 50.0).fill();
//! canvas.restore_state()?;
//! canvas.release()?;
//! let bytes = doc.close()?.into_inner();
//! ```

use crate::canvas::PdfCanvas;
use crate::compliance::{
    BoundIntent, ConformanceChecker, ConformanceLevel, ConformanceViolation, DocumentView, IsoCheck, MetadataBinder,
    OutputIntent, RuleId, ValidationReport,
};
use crate::config::DocumentConfig;
use crate::error::{Error, Result};
use crate::graph::{FlushState, ObjectGraph};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::page::{add_resource, page_dictionary, PageRef, PageSize};
use crate::reader::PdfReader;
use crate::writer::{
    compress_data, pdf_date, AcroFormBuilder, FlushCoordinator, FlushOutcome, FlushPolicy, Layer, LayerSet,
    PdfWriter, TextField, XmpWriter,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::Write;

/// Lifecycle of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Accepting mutations
    Open,
    /// Running the close sweep and final flush
    Closing,
    /// Fully written
    Closed,
    /// Close failed; the document is unusable
    Failed,
}

/// A PDF/A document being built or rewritten.
pub struct PdfADocument<W: Write> {
    graph: ObjectGraph,
    writer: PdfWriter<W>,
    coordinator: FlushCoordinator,
    checker: ConformanceChecker,
    binder: MetadataBinder,
    config: DocumentConfig,
    state: DocumentState,
    catalog: ObjectRef,
    pages_root: ObjectRef,
    pages: Vec<PageRef>,
    info: Option<ObjectRef>,
    metadata: Option<ObjectRef>,
    generate_metadata: bool,
    layers: LayerSet,
    oc_properties: Option<ObjectRef>,
    acroform: Option<(ObjectRef, AcroFormBuilder)>,
    /// Content streams created here; compressed at flush when configured
    own_content: HashSet<ObjectRef>,
    created: DateTime<Utc>,
    original_id: Option<Vec<u8>>,
    encrypted: bool,
}

impl<W: Write> std::fmt::Debug for PdfADocument<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfADocument")
            .field("level", &self.checker.level())
            .field("state", &self.state)
            .field("objects", &self.graph.len())
            .field("pages", &self.pages.len())
            .field("policy", &self.coordinator.policy_name())
            .finish()
    }
}

impl<W: Write> PdfADocument<W> {
    /// Create an empty document writing to `sink`.
    ///
    /// The output intent may be bound later with
    /// [`bind_output_intent`](Self::bind_output_intent), but pages cannot be
    /// added until one is bound.
    pub fn new(sink: W, level: ConformanceLevel, intent: Option<OutputIntent>, config: DocumentConfig) -> Result<Self> {
        let mut graph = ObjectGraph::new();
        let catalog = graph.add_object(Object::Null);
        let mut pages = Dictionary::new();
        pages.insert("Type".to_string(), Object::name("Pages"));
        pages.insert("Kids".to_string(), Object::Array(Vec::new()));
        pages.insert("Count".to_string(), Object::Integer(0));
        let pages_root = graph.add_object(Object::Dictionary(pages));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.insert("Type".to_string(), Object::name("Catalog"));
        catalog_dict.insert("Pages".to_string(), Object::Reference(pages_root));
        *graph.get_object_mut(catalog)? = Object::Dictionary(catalog_dict);
        let info = graph.add_object(Object::Dictionary(Dictionary::new()));

        let writer = PdfWriter::new(sink, level.pdf_version(), config.writer.clone());
        let mut coordinator = FlushCoordinator::new();
        for r in [catalog, pages_root, info] {
            coordinator.pin(r);
        }
        log::info!("New {} document, PDF-{}", level, writer.version());

        let mut doc = Self {
            graph,
            writer,
            coordinator,
            checker: ConformanceChecker::new(level, config.conformance.clone()),
            binder: MetadataBinder::new(),
            created: config.creation_date.unwrap_or_else(Utc::now),
            config,
            state: DocumentState::Open,
            catalog,
            pages_root,
            pages: Vec::new(),
            info: Some(info),
            metadata: None,
            generate_metadata: true,
            layers: LayerSet::new(),
            oc_properties: None,
            acroform: None,
            own_content: HashSet::new(),
            original_id: None,
            encrypted: false,
        };
        if let Some(intent) = intent {
            doc.bind_output_intent(intent)?;
        }
        Ok(doc)
    }

    /// Open an existing file for rewriting into `sink`.
    ///
    /// The level comes from the file's XMP `pdfaid` entries unless
    /// `config.forced_level` is set.
    pub fn open(data: &[u8], sink: W, config: DocumentConfig) -> Result<Self> {
        let reader = PdfReader::from_bytes(data)?;
        let catalog = reader.catalog()?;
        let info = reader.info();
        let original_id = reader.original_id();
        let encrypted = reader.is_encrypted();
        let version = reader.version().to_string();
        let graph = reader.into_graph();

        let catalog_dict = graph
            .get_object(catalog)?
            .as_dict()
            .cloned()
            .ok_or_else(|| Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: "catalog of another type".to_string(),
            })?;
        let pages_root = catalog_dict
            .get("Pages")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::InvalidPdf("catalog has no /Pages".to_string()))?;

        let metadata = catalog_dict.get("Metadata").and_then(Object::as_reference);
        let level = match config.forced_level {
            Some(level) => level,
            None => detect_level(&graph, metadata)?,
        };

        let mut coordinator = FlushCoordinator::new();
        let mut pinned = vec![catalog, pages_root];
        pinned.extend(info);
        pinned.extend(metadata);
        for key in ["AcroForm", "OCProperties", "Names", "OutputIntents"] {
            if let Some(r) = catalog_dict.get(key).and_then(Object::as_reference) {
                pinned.push(r);
            }
        }
        let oc_properties = catalog_dict.get("OCProperties").and_then(Object::as_reference);

        let mut checker = ConformanceChecker::new(level, config.conformance.clone());
        let mut binder = MetadataBinder::new();
        if let Some((intent, location)) = recover_intent(&graph, catalog, &catalog_dict) {
            pinned.extend([location.array, location.dictionary, location.profile]);
            checker.set_output_intent(intent.color_space());
            binder.bind(intent, location)?;
        }
        for r in pinned {
            coordinator.pin(r);
        }

        let pages = collect_pages(&graph, pages_root);
        for page in &pages {
            checker.register_content_stream(page.contents);
        }
        let writer = PdfWriter::new(sink, version, config.writer.clone());
        log::info!(
            "Opened {} document with {} pages, {} objects",
            level,
            pages.len(),
            graph.len()
        );

        Ok(Self {
            graph,
            writer,
            coordinator,
            checker,
            binder,
            created: config.creation_date.unwrap_or_else(Utc::now),
            config,
            state: DocumentState::Open,
            catalog,
            pages_root,
            pages,
            info,
            metadata,
            generate_metadata: metadata.is_none(),
            layers: LayerSet::new(),
            oc_properties,
            acroform: None,
            own_content: HashSet::new(),
            original_id,
            encrypted,
        })
    }

    /// The bound conformance level.
    pub fn level(&self) -> ConformanceLevel {
        self.checker.level()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DocumentState {
        self.state
    }

    /// The catalog reference.
    pub fn catalog_ref(&self) -> ObjectRef {
        self.catalog
    }

    /// The document's object graph.
    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ConformanceViolation] {
        self.checker.warnings()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            DocumentState::Open => Ok(()),
            _ => Err(Error::DocumentClosed),
        }
    }

    // ---- objects ----

    /// Add an indirect object.
    pub fn add_object(&mut self, object: Object) -> Result<ObjectRef> {
        self.ensure_open()?;
        Ok(self.graph.add_object(object))
    }

    /// Payload of an in-memory object.
    pub fn get_object(&self, r: ObjectRef) -> Result<&Object> {
        self.graph.get_object(r)
    }

    /// Mutable payload of an in-memory object.
    pub fn object_mut(&mut self, r: ObjectRef) -> Result<&mut Object> {
        self.ensure_open()?;
        self.graph.get_object_mut(r)
    }

    /// Run an explicit conformance check.
    pub fn check_iso_conformance(&mut self, check: IsoCheck<'_>) -> Result<()> {
        self.ensure_open()?;
        self.checker.check_iso_conformance(check, None)
    }

    /// Set a catalog entry after checking it.
    pub fn put_catalog_entry(&mut self, key: &str, value: Object) -> Result<()> {
        self.ensure_open()?;
        self.checker
            .check_iso_conformance(IsoCheck::CatalogEntry { key, value: &value }, Some(self.catalog))?;
        if key == "Names" {
            if let Some(r) = value.as_reference() {
                self.coordinator.pin(r);
            }
        }
        self.catalog_dict_mut()?.insert(key.to_string(), value);
        Ok(())
    }

    fn catalog_dict_mut(&mut self) -> Result<&mut Dictionary> {
        let catalog = self.catalog;
        self.graph
            .get_object_mut(catalog)?
            .as_dict_mut()
            .ok_or_else(|| Error::InvalidState("catalog is not a dictionary".to_string()))
    }

    // ---- binder ----

    /// Bind the document's output intent. Only one intent can be bound.
    pub fn bind_output_intent(&mut self, intent: OutputIntent) -> Result<()> {
        self.ensure_open()?;
        if self.binder.is_bound() {
            return Err(Error::InvalidState("an output intent is already bound".to_string()));
        }
        let mut out = Vec::new();
        intent.profile.validate(self.level(), &mut out);
        self.checker.apply(out, None)?;

        let profile = self.graph.add_object(intent.profile_stream());
        let dictionary = self.graph.add_object(intent.to_dictionary(profile));
        let array = self
            .graph
            .add_object(Object::Array(vec![Object::Reference(dictionary)]));
        self.catalog_dict_mut()?
            .insert("OutputIntents".to_string(), Object::Reference(array));
        for r in [array, dictionary, profile] {
            self.coordinator.pin(r);
        }

        self.checker.set_output_intent(intent.color_space());
        self.binder.bind(
            intent,
            BoundIntent {
                array,
                dictionary,
                profile,
            },
        )
    }

    /// The bound output intent.
    pub fn output_intent(&self) -> Option<&OutputIntent> {
        self.binder.intent()
    }

    /// Set the catalog `Lang` entry.
    pub fn set_lang(&mut self, tag: &str) -> Result<()> {
        self.ensure_open()?;
        self.binder.set_lang(tag)?;
        self.catalog_dict_mut()?
            .insert("Lang".to_string(), Object::String(tag.as_bytes().to_vec()));
        Ok(())
    }

    /// Use `packet` as the XMP metadata instead of the generated one.
    pub fn set_xmp_metadata(&mut self, packet: Vec<u8>) -> Result<()> {
        self.ensure_open()?;
        self.binder.set_xmp(packet);
        Ok(())
    }

    /// Set the title written to Info and XMP.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.config.title = Some(title.into());
        Ok(())
    }

    // ---- pages ----

    /// Append a page. Requires a bound output intent.
    pub fn add_page(&mut self, size: PageSize) -> Result<PageRef> {
        self.ensure_open()?;
        if !self.binder.is_bound() {
            self.checker
                .apply(vec![ConformanceViolation::new(RuleId::OutputIntentRequired, None)], None)?;
        }
        let media_box = size.media_box();
        self.checker.check_iso_conformance(
            IsoCheck::PageEntry {
                key: "MediaBox",
                value: &media_box,
            },
            None,
        )?;

        let contents = self.graph.add_object(Object::Stream {
            dict: Dictionary::new(),
            data: bytes::Bytes::new(),
        });
        let page = self
            .graph
            .add_object(page_dictionary(self.pages_root, contents, size));

        let pages_root = self.pages_root;
        let root = self
            .graph
            .get_object_mut(pages_root)?
            .as_dict_mut()
            .ok_or_else(|| Error::InvalidState("page tree root is not a dictionary".to_string()))?;
        if let Some(Object::Array(kids)) = root.get_mut("Kids") {
            kids.push(Object::Reference(page));
        }
        let count = root.get("Count").and_then(Object::as_integer).unwrap_or(0);
        root.insert("Count".to_string(), Object::Integer(count + 1));

        self.checker.register_content_stream(contents);
        self.own_content.insert(contents);
        let page_ref = PageRef {
            index: self.pages.len(),
            page,
            contents,
        };
        self.pages.push(page_ref);
        log::debug!("Added page {} as {}", page_ref.index + 1, page);
        Ok(page_ref)
    }

    /// Page at zero-based `index`.
    pub fn page(&self, index: usize) -> Result<PageRef> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| Error::InvalidState(format!("no page {}", index)))
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Set an entry on a page dictionary after checking it.
    pub fn put_page_entry(&mut self, index: usize, key: &str, value: Object) -> Result<()> {
        self.ensure_open()?;
        let page = self.page(index)?;
        self.checker
            .check_iso_conformance(IsoCheck::PageEntry { key, value: &value }, Some(page.page))?;
        self.graph
            .get_object_mut(page.page)?
            .as_dict_mut()
            .ok_or_else(|| Error::InvalidState(format!("page {} is not a dictionary", page.page)))?
            .insert(key.to_string(), value);
        Ok(())
    }

    /// A canvas appending to the content stream of page `index`.
    pub fn canvas(&mut self, index: usize) -> Result<PdfCanvas<'_, W>> {
        self.ensure_open()?;
        let page = self.page(index)?;
        if self.graph.state(page.contents)? != FlushState::InMemory {
            return Err(Error::ObjectFlushed(page.contents));
        }
        Ok(PdfCanvas::new(self, page))
    }

    pub(crate) fn add_page_resource(&mut self, page: PageRef, category: &str, prefix: &str, value: Object) -> Result<String> {
        self.ensure_open()?;
        let existing = self
            .graph
            .get_object(page.page)?
            .get("Resources")
            .and_then(|r| r.get(category))
            .and_then(Object::as_dict)
            .cloned()
            .unwrap_or_default();
        if let Some((name, _)) = existing.iter().find(|(_, v)| **v == value) {
            return Ok(name.clone());
        }
        let mut n = existing.len() + 1;
        let mut name = format!("{}{}", prefix, n);
        while existing.contains_key(&name) {
            n += 1;
            name = format!("{}{}", prefix, n);
        }
        add_resource(self.graph.get_object_mut(page.page)?, category, &name, value);
        Ok(name)
    }

    pub(crate) fn append_content(&mut self, page: PageRef, content: &[u8]) -> Result<()> {
        self.ensure_open()?;
        match self.graph.get_object_mut(page.contents)? {
            Object::Stream { data, .. } => {
                let mut joined = data.to_vec();
                joined.extend_from_slice(content);
                *data = bytes::Bytes::from(joined);
                Ok(())
            },
            other => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    pub(crate) fn checker_mut(&mut self) -> &mut ConformanceChecker {
        &mut self.checker
    }

    pub(crate) fn is_layer(&self, ocg: ObjectRef) -> bool {
        self.layers.get(ocg).is_some()
    }

    // ---- layers and forms ----

    /// Create a visible layer named `name`.
    pub fn add_layer(&mut self, name: &str) -> Result<ObjectRef> {
        self.add_layer_with(Layer::new(name))
    }

    /// Create a layer from a full description.
    pub fn add_layer_with(&mut self, layer: Layer) -> Result<ObjectRef> {
        self.ensure_open()?;
        self.checker.check_iso_conformance(IsoCheck::LayerCreation, None)?;

        let ocg = self.graph.add_object(layer.to_dictionary());
        self.layers.push(ocg, layer);
        let props = match self.oc_properties {
            Some(r) => r,
            None => {
                let r = self.graph.add_object(Object::Null);
                self.coordinator.pin(r);
                self.catalog_dict_mut()?
                    .insert("OCProperties".to_string(), Object::Reference(r));
                self.oc_properties = Some(r);
                r
            },
        };
        *self.graph.get_object_mut(props)? = self.layers.to_oc_properties();
        Ok(ocg)
    }

    /// The interactive form, created on first use.
    pub fn acroform_mut(&mut self) -> Result<&mut AcroFormBuilder> {
        self.ensure_open()?;
        if self.acroform.is_none() {
            let r = self.graph.add_object(Object::Null);
            self.coordinator.pin(r);
            self.catalog_dict_mut()?
                .insert("AcroForm".to_string(), Object::Reference(r));
            self.acroform = Some((r, AcroFormBuilder::new()));
        }
        match self.acroform.as_mut() {
            Some((_, form)) => Ok(form),
            None => Err(Error::InvalidState("form not initialised".to_string())),
        }
    }

    /// Set `NeedAppearances` on the form after checking it.
    pub fn set_need_appearances(&mut self, value: bool) -> Result<()> {
        self.ensure_open()?;
        self.checker
            .check_iso_conformance(IsoCheck::NeedAppearances(value), None)?;
        self.acroform_mut()?.set_need_appearances(Some(value));
        Ok(())
    }

    /// Add a text field with its appearance stream to page `index`.
    pub fn add_text_field(&mut self, index: usize, field: TextField) -> Result<ObjectRef> {
        self.ensure_open()?;
        let page = self.page(index)?;
        if self.graph.state(page.page)? != FlushState::InMemory {
            return Err(Error::ObjectFlushed(page.page));
        }
        let appearance = self.graph.add_object(field.appearance_stream());
        let widget = self
            .graph
            .add_object(field.to_dictionary(page.page, appearance));

        let page_dict = self
            .graph
            .get_object_mut(page.page)?
            .as_dict_mut()
            .ok_or_else(|| Error::InvalidState(format!("page {} is not a dictionary", page.page)))?;
        let annots = page_dict
            .entry("Annots".to_string())
            .or_insert_with(|| Object::Array(Vec::new()));
        match annots {
            Object::Array(items) => items.push(Object::Reference(widget)),
            other => *other = Object::Array(vec![Object::Reference(widget)]),
        }
        self.acroform_mut()?.add_field(widget);
        Ok(widget)
    }

    // ---- flushing ----

    /// Replace the flush-order policy.
    pub fn set_flush_policy(&mut self, policy: Box<dyn FlushPolicy>) -> Result<()> {
        self.ensure_open()?;
        self.coordinator.set_policy(policy);
        Ok(())
    }

    /// Check and write one object now.
    pub fn flush_object(&mut self, r: ObjectRef) -> Result<FlushOutcome> {
        self.ensure_open()?;
        self.flush_one(r)
    }

    /// Flush every in-memory object reachable from the catalog and Info,
    /// except `forbidden` and pinned objects. Returns how many were written.
    pub fn flush_waiting_objects(&mut self, forbidden: &HashSet<ObjectRef>) -> Result<usize> {
        self.ensure_open()?;
        self.flush_pending(forbidden)
    }

    fn roots(&self) -> Vec<ObjectRef> {
        let mut roots = vec![self.catalog];
        roots.extend(self.info);
        roots
    }

    fn flush_pending(&mut self, forbidden: &HashSet<ObjectRef>) -> Result<usize> {
        let roots = self.roots();
        let pending = self.coordinator.pending(&self.graph, &roots, forbidden)?;
        let plan = self.coordinator.plan(&self.graph, pending);
        let mut written = 0;
        for r in plan {
            if forbidden.contains(&r) {
                continue;
            }
            if self.flush_one(r)? == FlushOutcome::Written {
                written += 1;
            }
        }
        Ok(written)
    }

    fn flush_one(&mut self, r: ObjectRef) -> Result<FlushOutcome> {
        match self.graph.state(r)? {
            FlushState::Flushed => return Ok(FlushOutcome::AlreadyFlushed),
            FlushState::Free => return Err(Error::ObjectNotFound(r.id, r.gen)),
            FlushState::InMemory => {},
        }
        if self.coordinator.is_pinned(r) {
            log::trace!("Flush of pinned object {} deferred to close", r);
            return Ok(FlushOutcome::Deferred);
        }

        if self.graph.get_object(r)?.is_stream() && !self.checker.is_checked(r) {
            self.checker.register_page_contents(&self.graph);
        }
        self.checker.check_object(r, self.graph.get_object(r)?)?;
        if self.config.writer.compress && self.own_content.contains(&r) {
            if let Object::Stream { dict, data } = self.graph.get_object_mut(r)? {
                if !dict.contains_key("Filter") && !data.is_empty() {
                    *data = bytes::Bytes::from(compress_data(&data[..])?);
                    dict.insert("Filter".to_string(), Object::name("FlateDecode"));
                }
            }
        }
        let object = self.graph.mark_flushed(r)?;
        self.writer.write_object(r, &object)?;
        Ok(FlushOutcome::Written)
    }

    // ---- close ----

    /// Non-fatal report of every violation the document currently has.
    ///
    /// Generated metadata, Info and form dictionaries are brought up to date
    /// first, so the report matches what closing would check.
    pub fn validate(&mut self) -> Result<ValidationReport> {
        self.ensure_open()?;
        self.materialize()?;
        Ok(self.checker.validate(&self.view()))
    }

    fn view(&self) -> DocumentView<'_> {
        DocumentView {
            graph: &self.graph,
            catalog: self.catalog,
            info: self.info,
            header_version: self.writer.version(),
            encrypted: self.encrypted,
        }
    }

    /// Sweep, flush everything and write the cross-reference table.
    ///
    /// On failure the document becomes [`DocumentState::Failed`] and every
    /// later call returns [`Error::DocumentClosed`].
    pub fn close(mut self) -> Result<Self> {
        self.close_in_place()?;
        Ok(self)
    }

    /// Close in place, keeping the document for inspection on failure.
    pub fn close_in_place(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.state = DocumentState::Closing;
        match self.close_inner() {
            Ok(()) => {
                self.state = DocumentState::Closed;
                Ok(())
            },
            Err(e) => {
                self.state = DocumentState::Failed;
                log::error!("Closing {} document failed: {}", self.level(), e);
                if let Err(cleanup) = self.writer.flush_sink() {
                    log::warn!("Flushing the sink after a failed close also failed: {}", cleanup);
                }
                Err(e)
            },
        }
    }

    fn close_inner(&mut self) -> Result<()> {
        self.materialize()?;
        let view = DocumentView {
            graph: &self.graph,
            catalog: self.catalog,
            info: self.info,
            header_version: self.writer.version(),
            encrypted: self.encrypted,
        };
        self.checker.enforce(&view)?;

        let no_forbidden = HashSet::new();
        let early = self.flush_pending(&no_forbidden)?;
        let pinned: Vec<ObjectRef> = self.coordinator.pinned().collect();
        for r in pinned {
            self.coordinator.unpin(r);
        }
        let late = self.flush_pending(&no_forbidden)?;

        let mut orphans = 0;
        for r in self.graph.in_memory_refs() {
            if self.flush_one(r)? == FlushOutcome::Written {
                orphans += 1;
            }
        }
        if orphans > 0 {
            log::debug!("Wrote {} objects not reachable from the catalog", orphans);
        }
        log::debug!("Close flushed {} + {} reachable objects", early, late);

        let id = self.writer.document_id();
        let first = self.original_id.clone().unwrap_or_else(|| id.clone());
        let mut trailer = Dictionary::new();
        trailer.insert("Root".to_string(), Object::Reference(self.catalog));
        if let Some(info) = self.info {
            trailer.insert("Info".to_string(), Object::Reference(info));
        }
        trailer.insert(
            "ID".to_string(),
            Object::Array(vec![Object::String(first), Object::String(id)]),
        );
        self.writer.finish(trailer, &self.graph.free_entries())?;
        Ok(())
    }

    /// Write generated dictionaries into the graph: form, Info and XMP.
    fn materialize(&mut self) -> Result<()> {
        if let Some((r, form)) = &self.acroform {
            let built = form.build();
            *self.graph.get_object_mut(*r)? = built;
        }
        if !self.generate_metadata {
            if let (Some(packet), Some(r)) = (self.binder.xmp(), self.metadata) {
                let packet = bytes::Bytes::from(packet.to_vec());
                if let Object::Stream { dict, data } = self.graph.get_object_mut(r)? {
                    dict.remove("Filter");
                    dict.remove("DecodeParms");
                    *data = packet;
                }
            }
            return Ok(());
        }

        let date = pdf_date(self.created);
        let producer = self.config.producer.clone();
        if let Some(info) = self.info {
            let dict = self
                .graph
                .get_object_mut(info)?
                .as_dict_mut()
                .ok_or_else(|| Error::InvalidState("Info is not a dictionary".to_string()))?;
            dict.insert("Producer".to_string(), Object::String(producer.as_bytes().to_vec()));
            dict.insert("CreationDate".to_string(), Object::String(date.as_bytes().to_vec()));
            dict.insert("ModDate".to_string(), Object::String(date.into_bytes()));
            if let Some(title) = &self.config.title {
                dict.insert("Title".to_string(), Object::String(title.as_bytes().to_vec()));
            }
        }

        let packet = match self.binder.xmp() {
            Some(packet) => packet.to_vec(),
            None => {
                let timestamp = crate::writer::iso_timestamp(self.created);
                let mut xmp = XmpWriter::new(self.level())
                    .producer(producer)
                    .create_date(timestamp.clone())
                    .modify_date(timestamp);
                if let Some(title) = &self.config.title {
                    xmp = xmp.title(title.clone());
                }
                if let Some(lang) = self.binder.lang() {
                    xmp = xmp.language(lang);
                }
                xmp.build_bytes()
            },
        };

        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("Metadata"));
        dict.insert("Subtype".to_string(), Object::name("XML"));
        let stream = Object::Stream {
            dict,
            data: bytes::Bytes::from(packet),
        };
        match self.metadata {
            Some(r) => *self.graph.get_object_mut(r)? = stream,
            None => {
                let r = self.graph.add_object(stream);
                self.coordinator.pin(r);
                self.catalog_dict_mut()?
                    .insert("Metadata".to_string(), Object::Reference(r));
                self.metadata = Some(r);
            },
        }
        Ok(())
    }

    /// Borrow the sink.
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Give back the sink.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

fn detect_level(graph: &ObjectGraph, metadata: Option<ObjectRef>) -> Result<ConformanceLevel> {
    let r = metadata.ok_or_else(|| Error::InvalidPdf("no XMP metadata to detect the PDF/A level from".to_string()))?;
    let data = graph.get_object(r)?.decode_stream_data()?;
    let info = crate::compliance::parse_xmp(&data)?;
    info.level().ok_or_else(|| {
        Error::InvalidPdf(format!(
            "XMP does not identify a PDF/A level (part {:?}, conformance {:?})",
            info.part, info.conformance
        ))
    })
}

fn recover_intent(graph: &ObjectGraph, catalog: ObjectRef, catalog_dict: &Dictionary) -> Option<(OutputIntent, BoundIntent)> {
    let entry = catalog_dict.get("OutputIntents")?;
    let array = entry.as_reference().unwrap_or(catalog);
    let items = graph.resolve(entry)?.as_array()?;
    for item in items {
        let Some(dict) = graph.resolve(item).and_then(Object::as_dict) else {
            continue;
        };
        if dict.get("S").and_then(Object::as_name) != Some(crate::compliance::GTS_PDFA1) {
            continue;
        }
        let Some(profile) = dict.get("DestOutputProfile").and_then(Object::as_reference) else {
            continue;
        };
        match OutputIntent::from_dictionary(dict, graph) {
            Ok(intent) => {
                let location = BoundIntent {
                    array,
                    dictionary: item.as_reference().unwrap_or(array),
                    profile,
                };
                return Some((intent, location));
            },
            Err(e) => log::warn!("Output intent not usable: {}", e),
        }
    }
    None
}

/// Leaves of the page tree in document order.
fn collect_pages(graph: &ObjectGraph, root: ObjectRef) -> Vec<PageRef> {
    let mut pages = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            log::warn!("Page tree cycle at {}", node);
            continue;
        }
        let Ok(obj) = graph.get_object(node) else {
            continue;
        };
        match obj.get("Type").and_then(Object::as_name) {
            Some("Pages") => {
                if let Some(kids) = obj.get("Kids").and_then(Object::as_array) {
                    stack.extend(kids.iter().rev().filter_map(Object::as_reference));
                }
            },
            _ => {
                let contents = match obj.get("Contents") {
                    Some(Object::Reference(r)) => Some(*r),
                    Some(Object::Array(items)) => items.last().and_then(Object::as_reference),
                    _ => None,
                };
                match contents {
                    Some(contents) => pages.push(PageRef {
                        index: pages.len(),
                        page: node,
                        contents,
                    }),
                    None => log::debug!("Page {} has no content stream", node),
                }
            },
        }
    }
    pages
}
