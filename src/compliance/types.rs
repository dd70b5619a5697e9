//! PDF/A conformance types: levels, rule identifiers, severities and violations.

use crate::object::ObjectRef;
use std::fmt;
use std::str::FromStr;

/// PDF/A conformance level.
///
/// Bound to a document at creation (or detected from XMP when opening) and
/// never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ConformanceLevel {
    /// PDF/A-1a: Full conformance with logical structure
    A1a,
    /// PDF/A-1b: Basic conformance (visual preservation)
    A1b,
    /// PDF/A-2a: PDF 1.7 based, full conformance
    A2a,
    /// PDF/A-2b: PDF 1.7 based, basic conformance
    A2b,
    /// PDF/A-2u: PDF/A-2b plus Unicode mapping
    A2u,
    /// PDF/A-3a: PDF/A-2a plus embedded files
    A3a,
    /// PDF/A-3b: PDF/A-2b plus embedded files
    A3b,
    /// PDF/A-3u: PDF/A-3b plus Unicode mapping
    A3u,
    /// PDF/A-4: PDF 2.0 based
    A4,
    /// PDF/A-4e: PDF/A-4 for engineering documents
    A4e,
    /// PDF/A-4f: PDF/A-4 with embedded files
    A4f,
}

impl ConformanceLevel {
    /// Every level, in part order.
    pub const ALL: [ConformanceLevel; 11] = [
        ConformanceLevel::A1a,
        ConformanceLevel::A1b,
        ConformanceLevel::A2a,
        ConformanceLevel::A2b,
        ConformanceLevel::A2u,
        ConformanceLevel::A3a,
        ConformanceLevel::A3b,
        ConformanceLevel::A3u,
        ConformanceLevel::A4,
        ConformanceLevel::A4e,
        ConformanceLevel::A4f,
    ];

    /// Get the PDF/A part.
    pub fn part(&self) -> PdfAPart {
        use ConformanceLevel::*;
        match self {
            A1a | A1b => PdfAPart::Part1,
            A2a | A2b | A2u => PdfAPart::Part2,
            A3a | A3b | A3u => PdfAPart::Part3,
            A4 | A4e | A4f => PdfAPart::Part4,
        }
    }

    /// Conformance letter; plain PDF/A-4 has none.
    pub fn conformance(&self) -> Option<char> {
        use ConformanceLevel::*;
        match self {
            A1a | A2a | A3a => Some('A'),
            A1b | A2b | A3b => Some('B'),
            A2u | A3u => Some('U'),
            A4 => None,
            A4e => Some('E'),
            A4f => Some('F'),
        }
    }

    /// Check if this level requires logical structure (Tagged PDF).
    pub fn requires_structure(&self) -> bool {
        matches!(self, ConformanceLevel::A1a | ConformanceLevel::A2a | ConformanceLevel::A3a)
    }

    /// Check if this level requires Unicode mapping.
    pub fn requires_unicode(&self) -> bool {
        self.requires_structure()
            || matches!(self, ConformanceLevel::A2u | ConformanceLevel::A3u)
            || self.part() == PdfAPart::Part4
    }

    /// Check if transparency is allowed.
    pub fn allows_transparency(&self) -> bool {
        self.part() != PdfAPart::Part1
    }

    /// Check if arbitrary embedded files are allowed.
    pub fn allows_embedded_files(&self) -> bool {
        self.part() == PdfAPart::Part3 || *self == ConformanceLevel::A4f
    }

    /// Check if optional content (layers) is allowed.
    pub fn allows_optional_content(&self) -> bool {
        self.part() != PdfAPart::Part1
    }

    /// Header version written for new documents.
    pub fn pdf_version(&self) -> &'static str {
        match self.part() {
            PdfAPart::Part1 => "1.4",
            PdfAPart::Part2 | PdfAPart::Part3 => "1.7",
            PdfAPart::Part4 => "2.0",
        }
    }

    /// Get the XMP `pdfaid:part` value.
    pub fn xmp_part(&self) -> &'static str {
        match self.part() {
            PdfAPart::Part1 => "1",
            PdfAPart::Part2 => "2",
            PdfAPart::Part3 => "3",
            PdfAPart::Part4 => "4",
        }
    }

    /// Get the XMP `pdfaid:conformance` value.
    pub fn xmp_conformance(&self) -> Option<&'static str> {
        self.conformance().map(|c| match c {
            'A' => "A",
            'B' => "B",
            'U' => "U",
            'E' => "E",
            _ => "F",
        })
    }

    /// Get the XMP `pdfaid:rev` value (part 4 only).
    pub fn xmp_rev(&self) -> Option<&'static str> {
        (self.part() == PdfAPart::Part4).then_some("2020")
    }

    /// Parse from XMP `pdfaid:part` and `pdfaid:conformance` values.
    pub fn from_xmp(part: &str, conformance: Option<&str>) -> Option<Self> {
        let conformance = conformance.map(|c| c.trim().to_uppercase());
        match (part.trim(), conformance.as_deref()) {
            ("1", Some("A")) => Some(ConformanceLevel::A1a),
            ("1", Some("B")) => Some(ConformanceLevel::A1b),
            ("2", Some("A")) => Some(ConformanceLevel::A2a),
            ("2", Some("B")) => Some(ConformanceLevel::A2b),
            ("2", Some("U")) => Some(ConformanceLevel::A2u),
            ("3", Some("A")) => Some(ConformanceLevel::A3a),
            ("3", Some("B")) => Some(ConformanceLevel::A3b),
            ("3", Some("U")) => Some(ConformanceLevel::A3u),
            ("4", None) | ("4", Some("")) => Some(ConformanceLevel::A4),
            ("4", Some("E")) => Some(ConformanceLevel::A4e),
            ("4", Some("F")) => Some(ConformanceLevel::A4f),
            _ => None,
        }
    }
}

impl fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.conformance() {
            Some(c) => write!(f, "PDF/A-{}{}", self.xmp_part(), c.to_ascii_lowercase()),
            None => write!(f, "PDF/A-{}", self.xmp_part()),
        }
    }
}

impl FromStr for ConformanceLevel {
    type Err = crate::error::Error;

    /// Accepts `PDF/A-2b`, `A-2B`, `2b`, `4`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_uppercase();
        let tail = upper
            .trim_start_matches("PDF/")
            .trim_start_matches("PDFA")
            .trim_start_matches('A')
            .trim_start_matches('-');
        let mut chars = tail.chars();
        let part = chars.next().map(|c| c.to_string()).unwrap_or_default();
        let rest: String = chars.collect();
        let conformance = if rest.is_empty() { None } else { Some(rest.as_str()) };
        ConformanceLevel::from_xmp(&part, conformance)
            .ok_or_else(|| crate::error::Error::Unsupported(format!("conformance level {}", trimmed)))
    }
}

/// PDF/A part (version).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PdfAPart {
    /// PDF/A-1 (based on PDF 1.4)
    Part1,
    /// PDF/A-2 (based on PDF 1.7)
    Part2,
    /// PDF/A-3 (based on PDF 1.7, with embedded files)
    Part3,
    /// PDF/A-4 (based on PDF 2.0)
    Part4,
}

impl fmt::Display for PdfAPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfAPart::Part1 => write!(f, "PDF/A-1"),
            PdfAPart::Part2 => write!(f, "PDF/A-2"),
            PdfAPart::Part3 => write!(f, "PDF/A-3"),
            PdfAPart::Part4 => write!(f, "PDF/A-4"),
        }
    }
}

/// How a rule violation is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Fatal to the operation that detected it
    Error,
    /// Logged and collected, never fatal
    Warning,
    /// Not checked at this level
    Ignore,
}

macro_rules! define_rules {
    ($( $(#[$doc:meta])* $variant:ident => $ident:literal, $message:literal; )*) => {
        /// Stable identifiers for every conformance rule.
        ///
        /// Tests and callers match on these, never on message wording.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum RuleId {
            $( $(#[$doc])* $variant, )*
        }

        impl RuleId {
            /// Every rule.
            pub const ALL: &'static [RuleId] = &[ $( RuleId::$variant, )* ];

            /// Stable upper-snake identifier.
            pub fn identifier(&self) -> &'static str {
                match self {
                    $( RuleId::$variant => $ident, )*
                }
            }

            /// English message template.
            pub fn message(&self) -> &'static str {
                match self {
                    $( RuleId::$variant => $message, )*
                }
            }
        }
    };
}

define_rules! {
    // Content streams and canvases
    /// Rendering intent outside the four standard intents
    InvalidRenderingIntent => "INVALID_RENDERING_INTENT",
        "Rendering intent shall be one of RelativeColorimetric, AbsoluteColorimetric, Perceptual or Saturation";
    /// More than 28 nested q operators
    GraphicsStateStackDepthExceeded => "GRAPHICS_STATE_STACK_DEPTH_IS_GREATER_THAN_28",
        "Graphics state stack depth is greater than 28";
    /// Device colour with no output intent
    OutputIntentNotBound => "IF_DEVICE_RGB_CMYK_GRAY_USED_IN_FILE_THAT_FILE_SHALL_CONTAIN_PDFA_OUTPUTINTENT",
        "If device-dependent colour is used, the file shall contain a PDF/A OutputIntent";
    /// Device colour space differs from the output intent profile
    DeviceColorSpaceMismatch => "DEVICE_COLOR_SPACE_SHALL_MATCH_OUTPUT_INTENT_COLOR_SPACE",
        "Device colour space shall match the colour space of the output intent profile";

    // Page dictionaries
    /// PresSteps in a page
    PageDictionaryShallNotContainPressteps => "PAGE_DICTIONARY_SHALL_NOT_CONTAIN_PRESSTEPS_ENTRY",
        "The page dictionary shall not contain PresSteps entry";
    /// AA in a page
    PageDictionaryShallNotContainAa => "PAGE_DICTIONARY_SHALL_NOT_CONTAIN_AA_ENTRY",
        "The page dictionary shall not contain AA entry";
    /// Page box outside 3..14400
    PageBoundaryOutOfRange => "PAGE_BOUNDARY_SIZE_SHALL_BE_BETWEEN_3_AND_14400_UNITS",
        "Page boundary size shall be between 3 and 14400 units";
    /// Transparency group on a page (part 1)
    PageTransparencyGroup => "A_GROUP_OBJECT_WITH_AN_S_KEY_WITH_A_VALUE_OF_TRANSPARENCY_SHALL_NOT_BE_INCLUDED_IN_A_PAGE_DICTIONARY",
        "A group object with an S key with a value of Transparency shall not be included in a page dictionary";

    // Catalog
    /// Missing Lang
    CatalogShouldContainLang => "CATALOG_SHOULD_CONTAIN_LANG_ENTRY",
        "The catalog dictionary should contain Lang entry";
    /// AA in the catalog
    CatalogShallNotContainAa => "CATALOG_DICTIONARY_SHALL_NOT_CONTAIN_AA_ENTRY",
        "The document catalog dictionary shall not include an AA entry";
    /// OCProperties in part 1
    OptionalContentNotAllowed => "OPTIONAL_CONTENT_IS_NOT_ALLOWED",
        "Optional content (layers) shall not be used";
    /// AlternatePresentations name tree
    CatalogShallNotContainAlternatePresentations => "THE_DOCUMENT_CATALOG_DICTIONARY_SHALL_NOT_CONTAIN_ALTERNATEPRESENTATIONS_NAMES_ENTRY",
        "The document catalog dictionary shall not contain AlternatePresentations names entry";
    /// NeedsRendering
    CatalogShallNotContainNeedsRendering => "THE_CATALOG_DICTIONARY_SHALL_NOT_CONTAIN_THE_NEEDSRENDERING_KEY",
        "The catalog dictionary shall not contain the NeedsRendering key";
    /// JavaScript name tree
    JavaScriptNotAllowed => "NAME_DICTIONARY_SHALL_NOT_CONTAIN_JAVASCRIPT_KEY",
        "The name dictionary shall not contain a JavaScript key";
    /// MarkInfo missing or Marked false (level A)
    MarkInfoRequired => "CATALOG_SHALL_CONTAIN_MARKINFO_WITH_MARKED_TRUE",
        "The document catalog shall contain a MarkInfo dictionary with a Marked entry set to true";
    /// StructTreeRoot missing (level A)
    StructTreeRootRequired => "CATALOG_SHALL_CONTAIN_STRUCTTREEROOT",
        "The document catalog shall contain a StructTreeRoot";

    // Interactive forms and signatures
    /// NeedAppearances true (parts 1 to 3)
    NeedAppearancesShallBeFalse => "NEEDAPPEARANCES_FLAG_OF_THE_INTERACTIVE_FORM_DICTIONARY_SHALL_EITHER_NOT_BE_PRESENTED_OR_SHALL_BE_FALSE",
        "NeedAppearances flag of the interactive form dictionary shall either not be present or shall be false";
    /// NeedAppearances present at all (part 4)
    NeedAppearancesShallNotBePresent => "THE_INTERACTIVE_FORM_DICTIONARY_SHALL_NOT_CONTAIN_THE_NEEDAPPEARANCES_KEY",
        "The interactive form dictionary shall not contain the NeedAppearances key";
    /// XFA in AcroForm
    AcroFormShallNotContainXfa => "THE_INTERACTIVE_FORM_DICTIONARY_SHALL_NOT_CONTAIN_THE_XFA_KEY",
        "The interactive form dictionary shall not contain the XFA key";
    /// Signature not CAdES
    SignatureShallConformToPades => "SIGNATURE_SHALL_CONFORM_TO_ONE_OF_THE_PADES_PROFILE",
        "Signature shall conform to one of the PAdES profiles";

    // Optional content configuration
    /// Config without Name
    OcConfigShallContainName => "OPTIONAL_CONTENT_CONFIGURATION_DICTIONARY_SHALL_CONTAIN_NAME_ENTRY",
        "Optional content configuration dictionary shall contain Name entry";
    /// Duplicate config names
    OcConfigNamesShallBeUnique => "VALUE_OF_NAME_ENTRY_SHALL_BE_UNIQUE_AMONGST_ALL_OPTIONAL_CONTENT_CONFIGURATION_DICTIONARIES",
        "Value of Name entry shall be unique amongst all optional content configuration dictionaries";
    /// AS in a config
    OcConfigShallNotContainAs => "THE_AS_KEY_SHALL_NOT_APPEAR_IN_ANY_OPTIONAL_CONTENT_CONFIGURATION_DICTIONARY",
        "The AS key shall not appear in any optional content configuration dictionary";
    /// OCG missing from Order
    OcgShallBeListedInOrder => "ORDER_ARRAY_SHALL_CONTAIN_REFERENCES_TO_ALL_OCGS",
        "Order array shall contain references to all optional content groups";

    // Transparency and graphics state
    /// TR in ExtGState
    ExtGStateShallNotContainTr => "AN_EXTGSTATE_DICTIONARY_SHALL_NOT_CONTAIN_THE_TR_KEY",
        "An ExtGState dictionary shall not contain the TR key";
    /// TR2 other than Default
    ExtGStateTr2ShallBeDefault => "AN_EXTGSTATE_DICTIONARY_SHALL_NOT_CONTAIN_THE_TR_2_KEY_WITH_A_VALUE_OTHER_THAN_DEFAULT",
        "An ExtGState dictionary shall not contain the TR2 key with a value other than Default";
    /// HTP in ExtGState
    ExtGStateShallNotContainHtp => "AN_EXTGSTATE_DICTIONARY_SHALL_NOT_CONTAIN_THE_HTP_KEY",
        "An ExtGState dictionary shall not contain the HTP key";
    /// SMask other than None (part 1)
    SoftMaskNotAllowed => "THE_SMASK_KEY_IS_NOT_ALLOWED_IN_EXTGSTATE",
        "The SMask key is not allowed in ExtGState";
    /// CA or ca not 1.0 (part 1)
    ConstantAlphaShallBeOne => "THE_VALUE_OF_CA_AND_CA_LOWERCASE_SHALL_BE_EQUAL_TO_1_0",
        "The value of CA and ca shall be equal to 1.0";
    /// Blend mode not allowed
    BlendModeNotAllowed => "ONLY_STANDARD_BLEND_MODES_SHALL_BE_USED_FOR_THE_VALUE_OF_THE_BM_KEY_IN_AN_EXTENDED_GRAPHIC_STATE_DICTIONARY",
        "Only standard blend modes shall be used for the value of the BM key in an extended graphic state dictionary";

    // Actions and annotations
    /// Forbidden action
    ActionTypeNotAllowed => "ACTION_TYPE_IS_NOT_ALLOWED",
        "Action type is not allowed";
    /// Named action outside the four page navigations
    NamedActionTypeNotAllowed => "NAMED_ACTION_TYPE_IS_NOT_ALLOWED",
        "Named action type is not allowed";
    /// Forbidden annotation subtype
    AnnotationTypeNotAllowed => "ANNOTATION_TYPE_IS_NOT_PERMITTED",
        "Annotation type is not permitted";
    /// Print flag clear
    AnnotationPrintFlagShallBeSet => "THE_F_KEYS_PRINT_FLAG_BIT_SHALL_BE_SET_TO_1",
        "The F key's Print flag bit shall be set to 1";
    /// Hidden, Invisible, NoView or ToggleNoView set
    AnnotationHiddenFlagsShallBeClear => "THE_F_KEYS_HIDDEN_INVISIBLE_NOVIEW_AND_TOGGLENOVIEW_FLAG_BITS_SHALL_BE_SET_TO_0",
        "The F key's Hidden, Invisible, NoView and ToggleNoView flag bits shall be set to 0";
    /// Annotation CA not 1.0 (part 1)
    AnnotationConstantAlphaShallBeOne => "AN_ANNOTATION_DICTIONARY_SHALL_NOT_CONTAIN_THE_CA_KEY_WITH_A_VALUE_OTHER_THAN_1",
        "An annotation dictionary shall not contain the CA key with a value other than 1.0";
    /// AP with more than N
    AppearanceShallContainOnlyN => "APPEARANCE_DICTIONARY_SHALL_CONTAIN_ONLY_THE_N_KEY",
        "Appearance dictionary shall contain only the N key";

    // Fonts, images and XObjects
    /// Font program not embedded
    FontShallBeEmbedded => "ALL_THE_FONTS_MUST_BE_EMBEDDED",
        "All the fonts must be embedded";
    /// Interpolate true
    ImageInterpolateShallBeFalse => "THE_VALUE_OF_INTERPOLATE_KEY_SHALL_BE_FALSE",
        "The value of Interpolate key shall be false";
    /// Alternates on an image
    ImageShallNotContainAlternates => "AN_IMAGE_DICTIONARY_SHALL_NOT_CONTAIN_ALTERNATES_KEY",
        "An image dictionary shall not contain Alternates key";
    /// OPI on an XObject
    XObjectShallNotContainOpi => "A_FORM_XOBJECT_DICTIONARY_SHALL_NOT_CONTAIN_OPI_KEY",
        "An XObject dictionary shall not contain OPI key";
    /// PostScript XObject
    PostScriptXObjectNotAllowed => "POSTSCRIPT_XOBJECTS_ARE_NOT_ALLOWED",
        "PostScript XObjects are not allowed";
    /// Reference XObject
    ReferenceXObjectNotAllowed => "A_FORM_XOBJECT_DICTIONARY_SHALL_NOT_CONTAIN_REF_KEY",
        "A form XObject dictionary shall not contain Ref key";
    /// LZWDecode filter
    LzwDecodeFilterNotPermitted => "LZWDECODE_FILTER_IS_NOT_PERMITTED",
        "LZWDecode filter is not permitted";
    /// JPXDecode filter (part 1)
    JpxDecodeFilterNotPermitted => "JPXDECODE_FILTER_IS_NOT_PERMITTED",
        "JPXDecode filter is not permitted";

    // Embedded files
    /// Embedded file at a level that forbids it
    EmbeddedFileNotAllowed => "EMBEDDED_FILES_ARE_NOT_PERMITTED",
        "Embedded files are not permitted";
    /// Filespec without AFRelationship
    EmbeddedFileShallContainAfRelationship => "FILE_SPECIFICATION_DICTIONARY_SHALL_CONTAIN_AFRELATIONSHIP_KEY",
        "The file specification dictionary of an embedded file shall contain the AFRelationship key";

    // File structure
    /// Header version
    HeaderVersionNotAllowed => "FILE_HEADER_VERSION_IS_NOT_ALLOWED_FOR_THE_CONFORMANCE_LEVEL",
        "File header version is not allowed for the conformance level";
    /// Encrypt in trailer
    EncryptNotAllowed => "KEYWORD_ENCRYPT_SHALL_NOT_BE_USED_IN_THE_TRAILER_DICTIONARY",
        "Keyword Encrypt shall not be used in the trailer dictionary";
    /// String over 32767 bytes
    StringTooLong => "PDF_STRING_IS_TOO_LONG",
        "PDF string is too long";
    /// Name over 127 bytes
    NameTooLong => "PDF_NAME_IS_TOO_LONG",
        "PDF name is too long";
    /// Array over 8191 entries (part 1)
    ArrayTooLong => "MAXIMUM_ARRAY_CAPACITY_IS_EXCEEDED",
        "Maximum array capacity is exceeded";
    /// Dictionary over 4095 entries (part 1)
    DictionaryTooLarge => "MAXIMUM_DICTIONARY_CAPACITY_IS_EXCEEDED",
        "Maximum dictionary capacity is exceeded";
    /// Integer outside the 32-bit range (part 1)
    IntegerOutOfRange => "INTEGER_NUMBER_IS_OUT_OF_RANGE",
        "Integer number is out of range";
    /// Real with magnitude over 32767 (part 1)
    RealOutOfRange => "REAL_NUMBER_IS_OUT_OF_RANGE",
        "Real number is out of range";
    /// More than 8388607 indirect objects
    TooManyIndirectObjects => "MAXIMUM_NUMBER_OF_INDIRECT_OBJECTS_EXCEEDED",
        "Maximum number of indirect objects exceeded";

    // Metadata and output intents
    /// No output intent at close
    OutputIntentRequired => "A_CONFORMING_FILE_SHALL_SPECIFY_A_PDFA_OUTPUT_INTENT",
        "A conforming file shall specify a PDF/A output intent";
    /// Differing DestOutputProfile entries
    OutputIntentsShallHaveSameProfile => "IF_OUTPUTINTENTS_ARRAY_HAS_MORE_THAN_ONE_ENTRY_WITH_DESTOUTPUTPROFILE_KEY_THE_SAME_INDIRECT_OBJECT_SHALL_BE_USED_AS_THE_VALUE_OF_THAT_OBJECT",
        "If the OutputIntents array has more than one entry with a DestOutputProfile key, the same indirect object shall be used as the value of that key";
    /// Unreadable ICC header
    InvalidIccProfile => "DESTOUTPUTPROFILE_IS_NOT_A_VALID_ICC_PROFILE",
        "DestOutputProfile is not a valid ICC profile";
    /// ICC version too new for the part
    IccProfileVersionNotAllowed => "ICC_PROFILE_VERSION_IS_NOT_ALLOWED",
        "Version of the ICC profile is not allowed for this conformance level";
    /// ICC device class not an output or monitor profile
    IccProfileDeviceClassNotAllowed => "PROFILE_DEVICE_CLASS_OF_DESTOUTPUTPROFILE_SHALL_BE_PRTR_OR_MNTR",
        "Device class of the DestOutputProfile shall be prtr or mntr";
    /// No Metadata in the catalog
    MetadataRequired => "A_CATALOG_DICTIONARY_SHALL_CONTAIN_METADATA_ENTRY",
        "A catalog dictionary shall contain Metadata entry";
    /// Filter on the metadata stream (part 1)
    MetadataStreamShallNotBeFiltered => "A_METADATA_STREAM_SHALL_NOT_CONTAIN_THE_FILTER_KEY",
        "A metadata stream shall not contain the Filter key";
    /// XMP not parseable
    XmpMetadataMalformed => "XMP_METADATA_IS_NOT_WELL_FORMED",
        "XMP metadata is not well formed";
    /// pdfaid differs from the bound level
    XmpIdentificationMismatch => "XMP_PDFAID_SHALL_MATCH_THE_CONFORMANCE_LEVEL",
        "XMP pdfaid part and conformance shall match the conformance level of the document";
    /// Info and XMP disagree
    InfoShallMatchXmp => "DOCUMENT_INFO_ENTRY_SHALL_BE_CONSISTENT_WITH_XMP_METADATA",
        "Document information dictionary entries shall be consistent with the XMP metadata";
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for RuleId {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleId::ALL
            .iter()
            .copied()
            .find(|r| r.identifier() == s)
            .ok_or_else(|| crate::error::Error::Unsupported(format!("rule {}", s)))
    }
}

impl serde::Serialize for RuleId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.identifier())
    }
}

impl<'de> serde::Deserialize<'de> for RuleId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A rule violation: identifier, message and the offending object.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConformanceViolation {
    /// Rule that was violated
    pub rule: RuleId,
    /// Human-readable message
    pub message: String,
    /// Offending indirect object, when one is known
    pub object: Option<ObjectRef>,
}

impl ConformanceViolation {
    /// Create a violation with the rule's message template.
    pub fn new(rule: RuleId, object: Option<ObjectRef>) -> Self {
        Self {
            rule,
            message: rule.message().to_string(),
            object,
        }
    }

    /// Append detail to the message.
    pub fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", self.message, detail);
        self
    }

    /// Set the offending object if none is recorded yet.
    pub fn or_object(mut self, object: Option<ObjectRef>) -> Self {
        if self.object.is_none() {
            self.object = object;
        }
        self
    }
}

impl fmt::Display for ConformanceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.rule.identifier(), self.message)?;
        if let Some(obj) = self.object {
            write!(f, " (at {})", obj)?;
        }
        Ok(())
    }
}

/// Result of a non-fatal sweep over a document.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationReport {
    /// The level validated against.
    pub level: ConformanceLevel,
    /// Level found in the XMP packet, if any.
    pub detected_level: Option<ConformanceLevel>,
    /// Violations with Error severity.
    pub errors: Vec<ConformanceViolation>,
    /// Violations with Warning severity.
    pub warnings: Vec<ConformanceViolation>,
}

impl ValidationReport {
    /// Create an empty report for a specific level.
    pub fn new(level: ConformanceLevel) -> Self {
        Self {
            level,
            detected_level: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// True when no error was found.
    pub fn is_compliant(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether a violation of `rule` was recorded at any severity.
    pub fn contains(&self, rule: RuleId) -> bool {
        self.errors.iter().chain(&self.warnings).any(|v| v.rule == rule)
    }

    /// Serialize the report as pretty JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| crate::error::Error::InvalidState(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parts_and_versions() {
        assert_eq!(ConformanceLevel::A1b.part(), PdfAPart::Part1);
        assert_eq!(ConformanceLevel::A3u.part(), PdfAPart::Part3);
        assert_eq!(ConformanceLevel::A4f.part(), PdfAPart::Part4);
        assert_eq!(ConformanceLevel::A1a.pdf_version(), "1.4");
        assert_eq!(ConformanceLevel::A2b.pdf_version(), "1.7");
        assert_eq!(ConformanceLevel::A4.pdf_version(), "2.0");
    }

    #[test]
    fn test_level_xmp_values() {
        assert_eq!(ConformanceLevel::A2u.xmp_part(), "2");
        assert_eq!(ConformanceLevel::A2u.xmp_conformance(), Some("U"));
        assert_eq!(ConformanceLevel::A4.xmp_conformance(), None);
        assert_eq!(ConformanceLevel::A4e.xmp_rev(), Some("2020"));
        assert_eq!(ConformanceLevel::A3b.xmp_rev(), None);
    }

    #[test]
    fn test_level_from_xmp_round_trips() {
        for level in ConformanceLevel::ALL {
            assert_eq!(ConformanceLevel::from_xmp(level.xmp_part(), level.xmp_conformance()), Some(level));
        }
        assert_eq!(ConformanceLevel::from_xmp("1", Some("u")), None);
        assert_eq!(ConformanceLevel::from_xmp("5", Some("B")), None);
    }

    #[test]
    fn test_level_display_and_parse() {
        assert_eq!(ConformanceLevel::A1b.to_string(), "PDF/A-1b");
        assert_eq!(ConformanceLevel::A4.to_string(), "PDF/A-4");
        assert_eq!("PDF/A-2u".parse::<ConformanceLevel>().unwrap(), ConformanceLevel::A2u);
        assert_eq!("A-1B".parse::<ConformanceLevel>().unwrap(), ConformanceLevel::A1b);
        assert_eq!("4f".parse::<ConformanceLevel>().unwrap(), ConformanceLevel::A4f);
        assert!("X-1a".parse::<ConformanceLevel>().is_err());
    }

    #[test]
    fn test_level_capabilities() {
        assert!(!ConformanceLevel::A1b.allows_transparency());
        assert!(ConformanceLevel::A2b.allows_transparency());
        assert!(ConformanceLevel::A3b.allows_embedded_files());
        assert!(!ConformanceLevel::A4e.allows_embedded_files());
        assert!(ConformanceLevel::A4f.allows_embedded_files());
        assert!(ConformanceLevel::A2a.requires_structure());
        assert!(!ConformanceLevel::A2u.requires_structure());
    }

    #[test]
    fn test_rule_identifiers_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for rule in RuleId::ALL {
            assert!(seen.insert(rule.identifier()), "duplicate {}", rule.identifier());
            assert_eq!(rule.identifier().parse::<RuleId>().unwrap(), *rule);
        }
    }

    #[test]
    fn test_required_identifiers() {
        assert_eq!(
            RuleId::PageDictionaryShallNotContainPressteps.identifier(),
            "PAGE_DICTIONARY_SHALL_NOT_CONTAIN_PRESSTEPS_ENTRY"
        );
        assert_eq!(
            RuleId::SignatureShallConformToPades.identifier(),
            "SIGNATURE_SHALL_CONFORM_TO_ONE_OF_THE_PADES_PROFILE"
        );
        assert_eq!(RuleId::CatalogShouldContainLang.identifier(), "CATALOG_SHOULD_CONTAIN_LANG_ENTRY");
    }

    #[test]
    fn test_violation_display() {
        let v = ConformanceViolation::new(RuleId::PageDictionaryShallNotContainPressteps, Some(ObjectRef::new(4, 0)));
        let text = v.to_string();
        assert!(text.starts_with("[PAGE_DICTIONARY_SHALL_NOT_CONTAIN_PRESSTEPS_ENTRY]"));
        assert!(text.ends_with("(at 4 0 R)"));

        let v = ConformanceViolation::new(RuleId::InvalidRenderingIntent, None).with_detail("/Funky");
        assert!(v.message.ends_with(": /Funky"));
        assert_eq!(v.clone().or_object(Some(ObjectRef::new(1, 0))).object, Some(ObjectRef::new(1, 0)));
    }

    #[test]
    fn test_report_json() {
        let mut report = ValidationReport::new(ConformanceLevel::A2b);
        report.warnings.push(ConformanceViolation::new(RuleId::CatalogShouldContainLang, None));
        assert!(report.is_compliant());
        assert!(report.contains(RuleId::CatalogShouldContainLang));

        let json = report.to_json().unwrap();
        assert!(json.contains("\"CATALOG_SHOULD_CONTAIN_LANG_ENTRY\""));
        assert!(json.contains("\"A2b\""));
    }
}
