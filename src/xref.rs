//! Cross-reference table parsing.
//!
//! Reads classic `xref` sections and follows `/Prev` chains of incremental
//! updates. When the table is missing or damaged, [`reconstruct_xref`] scans
//! the body for `N G obj` headers instead. Cross-reference streams are not
//! read.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object};
use crate::parser::parse_object;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref RE_OBJ_HEADER: regex::bytes::Regex =
        regex::bytes::Regex::new(r"(?m)(?:^|[\r\n\s])(\d{1,10})\s+(\d{1,5})\s+obj\b")
            .expect("valid object header regex");
    static ref RE_TRAILER: regex::bytes::Regex =
        regex::bytes::Regex::new(r"trailer\s*<<").expect("valid trailer regex");
}

/// One cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    /// Byte offset for in-use entries, next free number otherwise
    pub offset: u64,
    /// Generation number
    pub generation: u16,
    /// `n` entries are in use, `f` entries are free
    pub in_use: bool,
}

impl XRefEntry {
    /// An in-use entry.
    pub fn used(offset: u64, generation: u16) -> Self {
        Self {
            offset,
            generation,
            in_use: true,
        }
    }

    /// A free entry.
    pub fn free(next_free: u64, generation: u16) -> Self {
        Self {
            offset: next_free,
            generation,
            in_use: false,
        }
    }
}

/// Cross-reference table that maps object numbers to their locations.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: HashMap<u32, XRefEntry>,
    trailer: Option<Dictionary>,
}

impl CrossRefTable {
    /// Create a new empty cross-reference table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = Some(trailer);
    }

    /// Get the trailer dictionary if present.
    pub fn trailer(&self) -> Option<&Dictionary> {
        self.trailer.as_ref()
    }

    /// Add an entry to the cross-reference table.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Get an entry by object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// In-use entries sorted by object number.
    pub fn in_use(&self) -> Vec<(u32, XRefEntry)> {
        let mut used: Vec<(u32, XRefEntry)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.in_use)
            .map(|(n, e)| (*n, *e))
            .collect();
        used.sort_by_key(|(n, _)| *n);
        used
    }

    /// Merge entries from an older section.
    ///
    /// Entries already present win, so newer updates override older ones.
    pub fn merge_from(&mut self, older: CrossRefTable) {
        for (obj_num, entry) in older.entries {
            self.entries.entry(obj_num).or_insert(entry);
        }
        if self.trailer.is_none() {
            self.trailer = older.trailer;
        }
    }

    /// Get the number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the offset recorded after the last `startxref` keyword.
pub fn find_xref_offset(data: &[u8]) -> Result<u64> {
    let tail_start = data.len().saturating_sub(2048);
    let tail = &data[tail_start..];
    let keyword = b"startxref";
    let pos = tail
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or(Error::InvalidXref)?;

    match token(&tail[pos + keyword.len()..]) {
        Ok((_, Token::Integer(offset))) if offset >= 0 => Ok(offset as u64),
        _ => Err(Error::InvalidXref),
    }
}

/// Parse the table at `offset` and every older section reachable through `/Prev`.
pub fn parse_xref(data: &[u8], offset: u64) -> Result<CrossRefTable> {
    let mut visited = Vec::new();
    let mut next = Some(offset);
    let mut table: Option<CrossRefTable> = None;

    while let Some(offset) = next {
        if visited.contains(&offset) {
            log::warn!("Circular /Prev chain at offset {}", offset);
            break;
        }
        if visited.len() > 100 {
            return Err(Error::InvalidPdf("xref /Prev chain depth exceeded 100".to_string()));
        }
        visited.push(offset);

        let section = parse_xref_section(data, offset)?;
        next = section
            .trailer()
            .and_then(|t| t.get("Prev"))
            .and_then(|p| p.as_integer())
            .map(|p| p as u64);

        table = Some(match table {
            Some(mut newer) => {
                newer.merge_from(section);
                newer
            },
            None => section,
        });
    }

    table.ok_or(Error::InvalidXref)
}

/// Parse one classic section:
///
/// ```text
/// xref
/// 0 3
/// 0000000000 65535 f
/// 0000000015 00000 n
/// 0000000079 00000 n
/// trailer
/// << /Size 3 /Root 1 0 R >>
/// ```
fn parse_xref_section(data: &[u8], offset: u64) -> Result<CrossRefTable> {
    let start = usize::try_from(offset).map_err(|_| Error::InvalidXref)?;
    let body = data.get(start..).ok_or(Error::InvalidXref)?;
    let body = trim_leading_ws(body);

    if !body.starts_with(b"xref") {
        if body.first().is_some_and(|c| c.is_ascii_digit()) {
            return Err(Error::Unsupported("cross-reference streams".to_string()));
        }
        return Err(Error::InvalidXref);
    }

    let mut xref = CrossRefTable::new();
    let mut lines = split_lines(&body[4..]).into_iter().peekable();

    while let Some(line) = lines.next() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("trailer") {
            break;
        }

        let mut parts = line.split_whitespace();
        let (first, count) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) => (
                a.parse::<u32>().map_err(|_| Error::InvalidXref)?,
                b.parse::<u32>().map_err(|_| Error::InvalidXref)?,
            ),
            _ => return Err(Error::InvalidXref),
        };
        if count > 8_388_607 {
            return Err(Error::InvalidPdf("xref subsection count exceeds limit".to_string()));
        }

        let mut read = 0;
        while read < count {
            let line = match lines.next() {
                Some(l) => l,
                None => return Err(Error::InvalidXref),
            };
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 3 {
                return Err(Error::InvalidXref);
            }
            let offset: u64 = fields[0].parse().map_err(|_| Error::InvalidXref)?;
            let generation: u16 = fields[1].parse().map_err(|_| Error::InvalidXref)?;
            let entry = match fields[2] {
                "n" => XRefEntry::used(offset, generation),
                "f" => XRefEntry::free(offset, generation),
                _ => return Err(Error::InvalidXref),
            };
            let number = first.checked_add(read).ok_or(Error::InvalidXref)?;
            xref.add_entry(number, entry);
            read += 1;
        }
    }

    let trailer_pos = body
        .windows(7)
        .position(|w| w == b"trailer")
        .ok_or(Error::InvalidXref)?;
    let (_, trailer) = parse_object(&body[trailer_pos + 7..]).map_err(|_| Error::InvalidXref)?;
    match trailer {
        Object::Dictionary(dict) => xref.set_trailer(dict),
        _ => return Err(Error::InvalidXref),
    }

    log::debug!("Parsed xref section at {} with {} entries", offset, xref.len());
    Ok(xref)
}

/// Rebuild the table by scanning the body for `N G obj` headers.
///
/// Later definitions of the same number win, as an incremental update would.
/// The last `trailer` dictionary found is used when present.
pub fn reconstruct_xref(data: &[u8]) -> Result<CrossRefTable> {
    log::info!("Reconstructing xref table by scanning {} bytes", data.len());
    let mut xref = CrossRefTable::new();

    for capture in RE_OBJ_HEADER.captures_iter(data) {
        let (Some(num), Some(gen)) = (capture.get(1), capture.get(2)) else {
            continue;
        };
        let parsed = std::str::from_utf8(num.as_bytes())
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .zip(std::str::from_utf8(gen.as_bytes()).ok().and_then(|s| s.parse::<u16>().ok()));
        match parsed {
            Some((n, g)) => xref.add_entry(n, XRefEntry::used(num.start() as u64, g)),
            None => log::warn!("Unreadable object header at offset {}", num.start()),
        }
    }

    if xref.is_empty() {
        return Err(Error::InvalidPdf("no objects found while reconstructing xref".to_string()));
    }

    if let Some(m) = RE_TRAILER.find_iter(data).last() {
        if let Ok((_, Object::Dictionary(dict))) = parse_object(&data[m.start() + 7..]) {
            xref.set_trailer(dict);
        }
    }

    Ok(xref)
}

fn trim_leading_ws(data: &[u8]) -> &[u8] {
    let skip = data.iter().take_while(|c| c.is_ascii_whitespace()).count();
    &data[skip..]
}

/// Split on CR, LF or CRLF; `str::lines` does not handle a lone CR.
fn split_lines(data: &[u8]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    let mut iter = data.iter().peekable();
    while let Some(&c) = iter.next() {
        match c {
            b'\r' => {
                if iter.peek() == Some(&&b'\n') {
                    iter.next();
                }
                lines.push(String::from_utf8_lossy(&current).into_owned());
                current.clear();
            },
            b'\n' => {
                lines.push(String::from_utf8_lossy(&current).into_owned());
                current.clear();
            },
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        lines.push(String::from_utf8_lossy(&current).into_owned());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n\
xref\n0 2\n0000000000 65535 f \n0000000009 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\nstartxref\n45\n%%EOF\n";

    #[test]
    fn test_find_xref_offset() {
        assert_eq!(find_xref_offset(SAMPLE).unwrap(), 45);
        assert!(matches!(find_xref_offset(b"%PDF-1.4\n"), Err(Error::InvalidXref)));
    }

    #[test]
    fn test_parse_traditional_section() {
        let xref = parse_xref(SAMPLE, 45).unwrap();
        assert_eq!(xref.len(), 2);
        assert_eq!(xref.get(1), Some(&XRefEntry::used(9, 0)));
        assert!(!xref.get(0).unwrap().in_use);
        assert_eq!(xref.in_use().len(), 1);
        let size = xref.trailer().and_then(|t| t.get("Size")).and_then(|s| s.as_integer());
        assert_eq!(size, Some(2));
    }

    #[test]
    fn test_cr_only_line_endings() {
        let data = b"xref\r0 1\r0000000000 65535 f\rtrailer\r<< /Size 1 >>\r";
        let xref = parse_xref(data, 0).unwrap();
        assert_eq!(xref.len(), 1);
    }

    #[test]
    fn test_subsection_number_overflow() {
        let data = b"xref\n4294967295 2\n0000000000 65535 f \n0000000009 00000 n \ntrailer\n<< /Size 2 >>\n";
        assert!(matches!(parse_xref(data, 0), Err(Error::InvalidXref)));
    }

    #[test]
    fn test_xref_stream_is_unsupported() {
        let data = b"7 0 obj << /Type /XRef >> stream";
        assert!(matches!(parse_xref(data, 0), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_prev_chain_newer_entries_win() {
        let mut data = Vec::new();
        data.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n0000000100 00000 n \ntrailer\n<< /Size 2 >>\n");
        let second = data.len();
        data.extend_from_slice(b"xref\n1 1\n0000000200 00000 n \ntrailer\n<< /Size 2 /Prev 0 >>\n");
        let xref = parse_xref(&data, second as u64).unwrap();
        assert_eq!(xref.get(1).unwrap().offset, 200);
        assert!(xref.get(0).is_some());
    }

    #[test]
    fn test_reconstruct_xref() {
        let xref = reconstruct_xref(SAMPLE).unwrap();
        assert_eq!(xref.get(1).map(|e| e.offset), Some(9));
        assert!(xref.trailer().is_some());
        assert!(reconstruct_xref(b"no objects here").is_err());
    }
}
