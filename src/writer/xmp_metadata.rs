//! XMP metadata packet generation.
//!
//! Builds the packet stored in the catalog's `/Metadata` stream, including the
//! PDF/A identification schema. See ISO 32000-1:2008, Section 14.3.2 and
//! ISO 19005-1, Section 6.7.11.

use crate::compliance::ConformanceLevel;

/// XMP namespace URIs
const NS_X: &str = "adobe:ns:meta/";
const NS_RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_XMP: &str = "http://ns.adobe.com/xap/1.0/";
const NS_PDF: &str = "http://ns.adobe.com/pdf/1.3/";
const NS_PDFAID: &str = "http://www.aiim.org/pdfa/ns/id/";

/// XMP metadata writer/builder.
#[derive(Debug, Clone)]
pub struct XmpWriter {
    level: ConformanceLevel,
    title: Option<String>,
    creators: Vec<String>,
    language: Option<String>,
    creator_tool: Option<String>,
    producer: Option<String>,
    create_date: Option<String>,
    modify_date: Option<String>,
}

impl XmpWriter {
    /// Create a writer for a document claiming `level`.
    pub fn new(level: ConformanceLevel) -> Self {
        Self {
            level,
            title: None,
            creators: Vec::new(),
            language: None,
            creator_tool: None,
            producer: None,
            create_date: None,
            modify_date: None,
        }
    }

    /// Set the document title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a creator/author.
    pub fn creator(mut self, creator: impl Into<String>) -> Self {
        self.creators.push(creator.into());
        self
    }

    /// Set the document language (`dc:language`).
    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.language = Some(lang.into());
        self
    }

    /// Set the creator tool.
    pub fn creator_tool(mut self, tool: impl Into<String>) -> Self {
        self.creator_tool = Some(tool.into());
        self
    }

    /// Set the PDF producer.
    pub fn producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    /// Set the creation date (ISO 8601).
    pub fn create_date(mut self, date: impl Into<String>) -> Self {
        self.create_date = Some(date.into());
        self
    }

    /// Set the modification date (ISO 8601).
    pub fn modify_date(mut self, date: impl Into<String>) -> Self {
        self.modify_date = Some(date.into());
        self
    }

    /// Build the XMP packet as bytes.
    pub fn build_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }

    /// Convert to XMP XML.
    pub fn to_xml(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xpacket begin="" id="W5M0MpCehiHzreSzNTczkc9d"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<x:xmpmeta xmlns:x="{}">"#, NS_X));
        xml.push('\n');
        xml.push_str(&format!(r#"  <rdf:RDF xmlns:rdf="{}">"#, NS_RDF));
        xml.push('\n');

        // PDF/A identification gets its own description block
        xml.push_str("    <rdf:Description rdf:about=\"\"\n");
        xml.push_str(&format!("        xmlns:pdfaid=\"{}\">\n", NS_PDFAID));
        xml.push_str(&format!("      <pdfaid:part>{}</pdfaid:part>\n", self.level.xmp_part()));
        if let Some(conformance) = self.level.xmp_conformance() {
            xml.push_str(&format!("      <pdfaid:conformance>{}</pdfaid:conformance>\n", conformance));
        }
        if let Some(rev) = self.level.xmp_rev() {
            xml.push_str(&format!("      <pdfaid:rev>{}</pdfaid:rev>\n", rev));
        }
        xml.push_str("    </rdf:Description>\n");

        xml.push_str("    <rdf:Description rdf:about=\"\"\n");
        xml.push_str(&format!("        xmlns:dc=\"{}\"\n", NS_DC));
        xml.push_str(&format!("        xmlns:xmp=\"{}\"\n", NS_XMP));
        xml.push_str(&format!("        xmlns:pdf=\"{}\">\n", NS_PDF));

        if let Some(title) = &self.title {
            xml.push_str("      <dc:title>\n");
            xml.push_str("        <rdf:Alt>\n");
            xml.push_str(&format!(
                "          <rdf:li xml:lang=\"x-default\">{}</rdf:li>\n",
                escape_xml(title)
            ));
            xml.push_str("        </rdf:Alt>\n");
            xml.push_str("      </dc:title>\n");
        }

        if !self.creators.is_empty() {
            xml.push_str("      <dc:creator>\n");
            xml.push_str("        <rdf:Seq>\n");
            for creator in &self.creators {
                xml.push_str(&format!("          <rdf:li>{}</rdf:li>\n", escape_xml(creator)));
            }
            xml.push_str("        </rdf:Seq>\n");
            xml.push_str("      </dc:creator>\n");
        }

        if let Some(language) = &self.language {
            xml.push_str("      <dc:language>\n");
            xml.push_str("        <rdf:Bag>\n");
            xml.push_str(&format!("          <rdf:li>{}</rdf:li>\n", escape_xml(language)));
            xml.push_str("        </rdf:Bag>\n");
            xml.push_str("      </dc:language>\n");
        }

        if let Some(tool) = &self.creator_tool {
            xml.push_str(&format!("      <xmp:CreatorTool>{}</xmp:CreatorTool>\n", escape_xml(tool)));
        }
        if let Some(date) = &self.create_date {
            xml.push_str(&format!("      <xmp:CreateDate>{}</xmp:CreateDate>\n", escape_xml(date)));
        }
        if let Some(date) = &self.modify_date {
            xml.push_str(&format!("      <xmp:ModifyDate>{}</xmp:ModifyDate>\n", escape_xml(date)));
        }
        if let Some(producer) = &self.producer {
            xml.push_str(&format!("      <pdf:Producer>{}</pdf:Producer>\n", escape_xml(producer)));
        }

        xml.push_str("    </rdf:Description>\n");
        xml.push_str("  </rdf:RDF>\n");
        xml.push_str("</x:xmpmeta>\n");

        // 2KB of padding for in-place editing
        for _ in 0..40 {
            xml.push_str("                                                  \n");
        }

        xml.push_str(r#"<?xpacket end="w"?>"#);
        xml
    }
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Format a timestamp in ISO 8601 as XMP expects.
pub fn iso_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSSZ`).
pub fn pdf_date(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("D:%Y%m%d%H%M%SZ").to_string()
}
