//! Reading an existing file into an object graph.
//!
//! Only what a PDF/A round trip needs: the header version, classic
//! cross-reference tables (with `/Prev` chains) and the objects they list.
//! A damaged table falls back to scanning the body for object headers.

use crate::error::{Error, Result};
use crate::graph::ObjectGraph;
use crate::object::{Dictionary, Object, ObjectRef};
use crate::parser::parse_object_at;
use crate::xref::{find_xref_offset, parse_xref, reconstruct_xref, CrossRefTable};

/// A parsed file: header version, trailer and every in-use object.
#[derive(Debug)]
pub struct PdfReader {
    version: String,
    trailer: Dictionary,
    graph: ObjectGraph,
    reconstructed: bool,
}

impl PdfReader {
    /// Parse `data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let version = parse_header(data)?;

        let (xref, reconstructed) = match find_xref_offset(data).and_then(|offset| parse_xref(data, offset)) {
            Ok(xref) => (xref, false),
            Err(Error::Unsupported(what)) => return Err(Error::Unsupported(what)),
            Err(e) => {
                log::warn!("Cross-reference table unusable ({}), scanning for objects", e);
                (reconstruct_xref(data)?, true)
            },
        };

        let trailer = xref.trailer().cloned().ok_or(Error::InvalidXref)?;
        if trailer.contains_key("XRefStm") {
            return Err(Error::Unsupported("hybrid cross-reference files".to_string()));
        }
        let graph = load_objects(data, &xref)?;
        log::info!("Read PDF-{} with {} objects", version, graph.len());

        Ok(Self {
            version,
            trailer,
            graph,
            reconstructed,
        })
    }

    /// Version from the `%PDF-x.y` header.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The trailer dictionary of the newest section.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// The catalog reference (`/Root`).
    pub fn catalog(&self) -> Result<ObjectRef> {
        self.trailer
            .get("Root")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::InvalidPdf("trailer has no /Root".to_string()))
    }

    /// The information dictionary reference (`/Info`).
    pub fn info(&self) -> Option<ObjectRef> {
        self.trailer.get("Info").and_then(Object::as_reference)
    }

    /// First element of the trailer `/ID`.
    pub fn original_id(&self) -> Option<Vec<u8>> {
        self.trailer
            .get("ID")
            .and_then(Object::as_array)
            .and_then(|ids| ids.first())
            .and_then(Object::as_string)
            .map(<[u8]>::to_vec)
    }

    /// Whether the trailer declares encryption.
    pub fn is_encrypted(&self) -> bool {
        self.trailer.contains_key("Encrypt")
    }

    /// True when the table had to be rebuilt by scanning.
    pub fn was_reconstructed(&self) -> bool {
        self.reconstructed
    }

    /// Borrow the object graph.
    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    /// Take the object graph.
    pub fn into_graph(self) -> ObjectGraph {
        self.graph
    }
}

fn parse_header(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(1024)];
    let pos = window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| Error::InvalidPdf("missing %PDF- header".to_string()))?;
    let version: String = window[pos + 5..]
        .iter()
        .take_while(|c| c.is_ascii_digit() || **c == b'.')
        .map(|&c| c as char)
        .collect();
    if version.is_empty() {
        return Err(Error::InvalidPdf("unreadable header version".to_string()));
    }
    Ok(version)
}

fn load_objects(data: &[u8], xref: &CrossRefTable) -> Result<ObjectGraph> {
    let mut graph = ObjectGraph::new();
    for (number, entry) in xref.in_use() {
        let offset = usize::try_from(entry.offset).map_err(|_| Error::InvalidXref)?;
        let (r, object) = match parse_object_at(data, offset) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Object {} at offset {} unreadable: {}", number, offset, e);
                continue;
            },
        };
        if r.id != number {
            log::warn!("Xref entry {} points at object {}", number, r);
            continue;
        }
        if let Some(kind) = object.get("Type").and_then(Object::as_name) {
            if kind == "ObjStm" || kind == "XRef" {
                return Err(Error::Unsupported(format!("/{} streams", kind)));
            }
        }
        graph.insert(r, object)?;
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let first = out.len();
        out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        let second = out.len();
        out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        let xref = out.len();
        out.extend_from_slice(
            format!(
                "xref\n0 3\n0000000000 65535 f \n{:010} 00000 n \n{:010} 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R /ID [<0102> <0102>] >>\nstartxref\n{}\n%%EOF\n",
                first, second, xref
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn test_read_classic_file() {
        let reader = PdfReader::from_bytes(&sample()).expect("readable");
        assert_eq!(reader.version(), "1.7");
        assert_eq!(reader.catalog().expect("root"), ObjectRef::new(1, 0));
        assert_eq!(reader.graph().len(), 2);
        assert_eq!(reader.original_id(), Some(vec![1, 2]));
        assert!(!reader.was_reconstructed());
        assert!(!reader.is_encrypted());
    }

    #[test]
    fn test_broken_startxref_is_reconstructed() {
        let text = String::from_utf8(sample()).expect("ascii sample");
        let pos = text.rfind("startxref").expect("startxref");
        let data = format!("{}startxref\n99999\n%%EOF\n", &text[..pos]).into_bytes();
        let reader = PdfReader::from_bytes(&data).expect("reconstructed");
        assert!(reader.was_reconstructed());
        assert!(reader.graph().contains(ObjectRef::new(2, 0)));
    }

    #[test]
    fn test_subsection_start_overflow_falls_back_to_scan() {
        let text = String::from_utf8(sample()).expect("ascii sample");
        let data = text.replacen("xref\n0 3\n", "xref\n4294967295 3\n", 1).into_bytes();
        let reader = PdfReader::from_bytes(&data).expect("reconstructed");
        assert!(reader.was_reconstructed());
        assert_eq!(reader.graph().len(), 2);
    }

    #[test]
    fn test_huge_object_number_rejected() {
        let mut out = b"%PDF-1.7\n".to_vec();
        let first = out.len();
        out.extend_from_slice(b"4000000000 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let xref = out.len();
        out.extend_from_slice(
            format!(
                "xref\n4000000000 1\n{:010} 00000 n \ntrailer\n<< /Size 4000000001 /Root 4000000000 0 R >>\nstartxref\n{}\n%%EOF\n",
                first, xref
            )
            .as_bytes(),
        );
        assert!(matches!(PdfReader::from_bytes(&out), Err(Error::InvalidPdf(_))));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(PdfReader::from_bytes(b"hello"), Err(Error::InvalidPdf(_))));
    }
}
