//! Writer sink.
//!
//! Accepts serialized indirect objects one at a time, in whatever order the
//! flush coordinator issues them, and finishes the file with the
//! cross-reference table, trailer and `startxref`.

use super::object_serializer::ObjectSerializer;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use md5::{Digest, Md5};
use std::collections::BTreeMap;
use std::io::Write;

/// How object bodies reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Bodies are held until `finish` and emitted in ascending object
    /// number order; output bytes do not depend on flush order.
    #[default]
    Buffered,
    /// Bodies go to the sink as soon as they are flushed.
    Streaming,
}

/// Configuration for the writer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PdfWriterConfig {
    /// Header version override (e.g., "1.7"); the level's version otherwise
    pub version: Option<String>,
    /// Whether to Flate-compress page content streams
    pub compress: bool,
    /// Buffered or streaming output
    pub mode: WriteMode,
    /// Minimal whitespace in dictionaries
    pub compact: bool,
}

impl Default for PdfWriterConfig {
    fn default() -> Self {
        Self {
            version: None,
            compress: false,
            mode: WriteMode::Buffered,
            compact: true,
        }
    }
}

impl PdfWriterConfig {
    /// Force the header version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Enable or disable content stream compression.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Select buffered or streaming output.
    pub fn with_mode(mut self, mode: WriteMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Compress data using Flate/Deflate compression.
pub(crate) fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Byte sink for one output document.
pub struct PdfWriter<W: Write> {
    sink: W,
    config: PdfWriterConfig,
    version: String,
    serializer: ObjectSerializer,
    position: u64,
    header_written: bool,
    /// Object number -> (byte offset, generation); only for bodies already on the sink
    offsets: BTreeMap<u32, (u64, u16)>,
    /// Buffered mode bodies waiting for `finish`
    held: BTreeMap<u32, (u16, Vec<u8>)>,
    /// Per-object body digests, for the file identifier
    digests: BTreeMap<u32, [u8; 16]>,
    finished: bool,
}

impl<W: Write> PdfWriter<W> {
    /// Create a writer for `sink` producing a `%PDF-{version}` header.
    pub fn new(sink: W, version: impl Into<String>, config: PdfWriterConfig) -> Self {
        let serializer = if config.compact {
            ObjectSerializer::compact()
        } else {
            ObjectSerializer::new()
        };
        Self {
            sink,
            version: config.version.clone().unwrap_or_else(|| version.into()),
            config,
            serializer,
            position: 0,
            header_written: false,
            offsets: BTreeMap::new(),
            held: BTreeMap::new(),
            digests: BTreeMap::new(),
            finished: false,
        }
    }

    /// Header version this writer emits.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Writer configuration.
    pub fn config(&self) -> &PdfWriterConfig {
        &self.config
    }

    /// Whether `id` has already been handed to the writer.
    pub fn is_written(&self, id: u32) -> bool {
        self.digests.contains_key(&id)
    }

    /// Number of objects handed to the writer.
    pub fn written_count(&self) -> usize {
        self.digests.len()
    }

    /// Bytes emitted to the sink so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Serialize one indirect object. Returns the serialized length.
    ///
    /// Writing the same object number twice is a coordinator bug and fails.
    pub fn write_object(&mut self, r: ObjectRef, obj: &Object) -> Result<usize> {
        if self.finished {
            return Err(Error::InvalidState("writer already finished".to_string()));
        }
        if self.is_written(r.id) {
            return Err(Error::InvalidState(format!("object {} written twice", r)));
        }

        let body = self.serializer.serialize_indirect(r, obj);
        let len = body.len();
        let mut digest = [0u8; 16];
        digest.copy_from_slice(&Md5::digest(&body));
        self.digests.insert(r.id, digest);

        match self.config.mode {
            WriteMode::Buffered => {
                self.held.insert(r.id, (r.gen, body));
            },
            WriteMode::Streaming => {
                self.write_header()?;
                self.offsets.insert(r.id, (self.position, r.gen));
                self.emit(&body)?;
            },
        }
        log::debug!("Wrote object {} ({} bytes)", r, len);
        Ok(len)
    }

    /// File identifier derived from every object body, independent of flush order.
    pub fn document_id(&self) -> Vec<u8> {
        let mut hasher = Md5::new();
        for (id, digest) in &self.digests {
            hasher.update(id.to_be_bytes());
            hasher.update(digest);
        }
        hasher.finalize().to_vec()
    }

    /// Emit held bodies, the cross-reference table and the trailer.
    ///
    /// `free` maps freed object numbers to the generation their next use
    /// must carry. `Size` is added to the trailer here.
    pub fn finish(&mut self, mut trailer: Dictionary, free: &BTreeMap<u32, u16>) -> Result<u64> {
        if self.finished {
            return Err(Error::InvalidState("writer already finished".to_string()));
        }
        self.write_header()?;

        let held = std::mem::take(&mut self.held);
        for (id, (gen, body)) in held {
            self.offsets.insert(id, (self.position, gen));
            self.emit(&body)?;
        }

        let max_written = self.offsets.keys().next_back().copied().unwrap_or(0);
        let max_free = free.keys().next_back().copied().unwrap_or(0);
        let size = max_written.max(max_free) + 1;

        let free_numbers: Vec<u32> = (1..size).filter(|n| !self.offsets.contains_key(n)).collect();

        let xref_start = self.position;
        let mut table = format!("xref\n0 {}\n", size).into_bytes();
        let first_free = free_numbers.first().copied().unwrap_or(0);
        table.extend_from_slice(format!("{:010} 65535 f \n", first_free).as_bytes());
        for n in 1..size {
            let line = match self.offsets.get(&n) {
                Some((offset, gen)) => format!("{:010} {:05} n \n", offset, gen),
                None => {
                    let next = free_numbers.iter().find(|&&f| f > n).copied().unwrap_or(0);
                    let gen = free.get(&n).copied().unwrap_or(0);
                    format!("{:010} {:05} f \n", next, gen)
                },
            };
            table.extend_from_slice(line.as_bytes());
        }
        self.emit(&table)?;

        trailer.insert("Size".to_string(), Object::Integer(i64::from(size)));
        let mut tail = b"trailer\n".to_vec();
        tail.extend_from_slice(&self.serializer.serialize(&Object::Dictionary(trailer)));
        tail.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_start).as_bytes());
        self.emit(&tail)?;

        self.sink.flush()?;
        self.finished = true;
        log::info!("Finished PDF-{} with {} objects, {} bytes", self.version, self.offsets.len(), self.position);
        Ok(self.position)
    }

    /// Flush the sink without finishing. Used for best-effort cleanup.
    pub fn flush_sink(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Borrow the sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Give back the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn write_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        let mut header = format!("%PDF-{}\n", self.version).into_bytes();
        // Binary marker: four bytes above 127
        header.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        self.header_written = true;
        self.emit(&header)
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::object_serializer::{dict, name, reference};

    fn catalog() -> Object {
        dict(vec![("Type", name("Catalog")), ("Pages", reference(ObjectRef::new(2, 0)))])
    }

    fn pages() -> Object {
        dict(vec![("Type", name("Pages")), ("Kids", Object::Array(vec![])), ("Count", Object::Integer(0))])
    }

    fn trailer() -> Dictionary {
        let mut t = Dictionary::new();
        t.insert("Root".to_string(), reference(ObjectRef::new(1, 0)));
        t
    }

    #[test]
    fn test_buffered_output_is_order_independent() {
        let mut a = PdfWriter::new(Vec::new(), "1.7", PdfWriterConfig::default());
        a.write_object(ObjectRef::new(1, 0), &catalog()).unwrap();
        a.write_object(ObjectRef::new(2, 0), &pages()).unwrap();
        a.finish(trailer(), &BTreeMap::new()).unwrap();

        let mut b = PdfWriter::new(Vec::new(), "1.7", PdfWriterConfig::default());
        b.write_object(ObjectRef::new(2, 0), &pages()).unwrap();
        b.write_object(ObjectRef::new(1, 0), &catalog()).unwrap();
        b.finish(trailer(), &BTreeMap::new()).unwrap();

        assert_eq!(a.into_inner(), b.into_inner());
    }

    #[test]
    fn test_header_and_trailer_layout() {
        let mut w = PdfWriter::new(Vec::new(), "1.4", PdfWriterConfig::default());
        w.write_object(ObjectRef::new(1, 0), &catalog()).unwrap();
        w.write_object(ObjectRef::new(2, 0), &pages()).unwrap();
        w.finish(trailer(), &BTreeMap::new()).unwrap();
        let out = w.into_inner();
        let text = String::from_utf8_lossy(&out);

        assert!(out.starts_with(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n"));
        assert!(text.contains("xref\n0 3\n0000000000 65535 f \n0000000015 00000 n \n"));
        assert!(text.contains("/Size 3"));
        assert!(text.ends_with("%%EOF\n"));
    }

    #[test]
    fn test_free_list_links_gaps() {
        let mut w = PdfWriter::new(Vec::new(), "1.7", PdfWriterConfig::default());
        w.write_object(ObjectRef::new(1, 0), &catalog()).unwrap();
        w.write_object(ObjectRef::new(4, 0), &pages()).unwrap();
        let mut free = BTreeMap::new();
        free.insert(2, 1u16);
        w.finish(trailer(), &free).unwrap();
        let text = String::from_utf8_lossy(w.get_ref()).into_owned();

        assert!(text.contains("0000000002 65535 f \n"));
        assert!(text.contains("0000000003 00001 f \n"));
        assert!(text.contains("0000000000 00000 f \n"));
    }

    #[test]
    fn test_double_write_is_rejected() {
        let mut w = PdfWriter::new(Vec::new(), "1.7", PdfWriterConfig::default());
        w.write_object(ObjectRef::new(1, 0), &catalog()).unwrap();
        assert!(w.is_written(1));
        assert!(matches!(w.write_object(ObjectRef::new(1, 0), &catalog()), Err(Error::InvalidState(_))));
        assert_eq!(w.written_count(), 1);
    }

    #[test]
    fn test_streaming_mode_writes_immediately() {
        let config = PdfWriterConfig::default().with_mode(WriteMode::Streaming);
        let mut w = PdfWriter::new(Vec::new(), "2.0", config);
        w.write_object(ObjectRef::new(2, 0), &pages()).unwrap();
        assert!(w.get_ref().starts_with(b"%PDF-2.0"));
        assert!(w.position() > 0);
        w.write_object(ObjectRef::new(1, 0), &catalog()).unwrap();
        w.finish(trailer(), &BTreeMap::new()).unwrap();
        assert!(matches!(w.finish(trailer(), &BTreeMap::new()), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_document_id_ignores_flush_order() {
        let mut a = PdfWriter::new(Vec::new(), "1.7", PdfWriterConfig::default());
        a.write_object(ObjectRef::new(1, 0), &catalog()).unwrap();
        a.write_object(ObjectRef::new(2, 0), &pages()).unwrap();
        let mut b = PdfWriter::new(Vec::new(), "1.7", PdfWriterConfig::default().with_mode(WriteMode::Streaming));
        b.write_object(ObjectRef::new(2, 0), &pages()).unwrap();
        b.write_object(ObjectRef::new(1, 0), &catalog()).unwrap();
        assert_eq!(a.document_id(), b.document_id());
        assert_eq!(a.document_id().len(), 16);
    }

    #[test]
    fn test_compress_data_round_trips() {
        let packed = compress_data(b"q Q q Q").unwrap();
        let mut d = Dictionary::new();
        d.insert("Filter".to_string(), name("FlateDecode"));
        let stream = Object::Stream { dict: d, data: bytes::Bytes::from(packed) };
        assert_eq!(stream.decode_stream_data().unwrap(), b"q Q q Q");
    }
}
