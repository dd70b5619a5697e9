//! Rule tables: severities per conformance level, and the `IsoKey` check categories.
//!
//! A rule is either enforced (`Error`), reported (`Warning`) or not applicable
//! (`Ignore`) at a given level. [`default_severity`] is the single table that
//! decides this; [`ConformanceConfig`] can override individual entries.

use super::types::{ConformanceLevel, PdfAPart, RuleId, Severity};
use crate::object::Dictionary;
use bitflags::bitflags;
use std::collections::HashMap;

bitflags! {
    /// Annotation flags (`F` entry).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AnnotationFlags: u32 {
        /// Bit 1: not shown if no handler is available
        const INVISIBLE = 1 << 0;
        /// Bit 2: never shown or printed
        const HIDDEN = 1 << 1;
        /// Bit 3: printed
        const PRINT = 1 << 2;
        /// Bit 6: not shown on screen
        const NO_VIEW = 1 << 5;
        /// Bit 9: NoView toggled
        const TOGGLE_NO_VIEW = 1 << 8;
        /// Flags a conforming annotation must leave clear
        const HIDING = Self::INVISIBLE.bits() | Self::HIDDEN.bits() | Self::NO_VIEW.bits() | Self::TOGGLE_NO_VIEW.bits();
    }
}

/// The four rendering intents allowed in a conforming file.
pub const ALLOWED_RENDERING_INTENTS: [&str; 4] = [
    "RelativeColorimetric",
    "AbsoluteColorimetric",
    "Perceptual",
    "Saturation",
];

/// Maximum nesting of `q` operators in one content stream.
pub const MAX_GRAPHICS_STATE_DEPTH: usize = 28;

/// Page boundaries must lie in `[MIN_PAGE_BOUNDARY, MAX_PAGE_BOUNDARY]` user units.
pub const MIN_PAGE_BOUNDARY: f64 = 3.0;
/// Upper page boundary limit.
pub const MAX_PAGE_BOUNDARY: f64 = 14400.0;

/// Implementation limits.
pub const MAX_STRING_LENGTH: usize = 32767;
/// Longest name in bytes.
pub const MAX_NAME_LENGTH: usize = 127;
/// Largest array in PDF/A-1.
pub const MAX_ARRAY_LENGTH: usize = 8191;
/// Largest dictionary in PDF/A-1.
pub const MAX_DICTIONARY_ENTRIES: usize = 4095;
/// Largest real magnitude in PDF/A-1.
pub const MAX_REAL: f64 = 32767.0;
/// Most indirect objects in one file.
pub const MAX_INDIRECT_OBJECTS: usize = crate::graph::MAX_OBJECT_NUMBER as usize;

/// Severity of `rule` at `level` before any override.
pub fn default_severity(level: ConformanceLevel, rule: RuleId) -> Severity {
    use RuleId::*;
    use Severity::*;

    let part = level.part();
    let part1 = part == PdfAPart::Part1;
    let part4 = part == PdfAPart::Part4;
    let error_if = |cond: bool| if cond { Error } else { Ignore };

    match rule {
        CatalogShouldContainLang => {
            if level.requires_structure() {
                Error
            } else {
                Warning
            }
        },
        MarkInfoRequired | StructTreeRootRequired => error_if(level.requires_structure()),

        SignatureShallConformToPades => error_if(!part1),
        NeedAppearancesShallBeFalse => error_if(!part4),
        NeedAppearancesShallNotBePresent => error_if(part4),
        InfoShallMatchXmp => error_if(!part4),

        // Transparency and PDF 1.5+ features only restricted in part 1
        OptionalContentNotAllowed
        | PageTransparencyGroup
        | SoftMaskNotAllowed
        | ConstantAlphaShallBeOne
        | AnnotationConstantAlphaShallBeOne
        | JpxDecodeFilterNotPermitted
        | MetadataStreamShallNotBeFiltered
        | IccProfileVersionNotAllowed
        | ArrayTooLong
        | DictionaryTooLarge
        | IntegerOutOfRange
        | RealOutOfRange => error_if(part1),

        PageBoundaryOutOfRange
        | CatalogShallNotContainAlternatePresentations
        | CatalogShallNotContainNeedsRendering
        | AppearanceShallContainOnlyN
        | OcConfigShallContainName
        | OcConfigNamesShallBeUnique
        | OcConfigShallNotContainAs
        | OcgShallBeListedInOrder
        | AcroFormShallNotContainXfa
        | ExtGStateShallNotContainHtp => error_if(!part1),

        EmbeddedFileNotAllowed => match level {
            ConformanceLevel::A1a | ConformanceLevel::A1b => Error,
            ConformanceLevel::A3a | ConformanceLevel::A3b | ConformanceLevel::A3u | ConformanceLevel::A4f => Ignore,
            _ => Warning,
        },
        EmbeddedFileShallContainAfRelationship => error_if(level.allows_embedded_files()),

        InvalidRenderingIntent
        | GraphicsStateStackDepthExceeded
        | OutputIntentNotBound
        | DeviceColorSpaceMismatch
        | PageDictionaryShallNotContainPressteps
        | PageDictionaryShallNotContainAa
        | CatalogShallNotContainAa
        | JavaScriptNotAllowed
        | ExtGStateShallNotContainTr
        | ExtGStateTr2ShallBeDefault
        | BlendModeNotAllowed
        | ActionTypeNotAllowed
        | NamedActionTypeNotAllowed
        | AnnotationTypeNotAllowed
        | AnnotationPrintFlagShallBeSet
        | AnnotationHiddenFlagsShallBeClear
        | FontShallBeEmbedded
        | ImageInterpolateShallBeFalse
        | ImageShallNotContainAlternates
        | XObjectShallNotContainOpi
        | PostScriptXObjectNotAllowed
        | ReferenceXObjectNotAllowed
        | LzwDecodeFilterNotPermitted
        | HeaderVersionNotAllowed
        | EncryptNotAllowed
        | StringTooLong
        | NameTooLong
        | TooManyIndirectObjects
        | OutputIntentRequired
        | OutputIntentsShallHaveSameProfile
        | InvalidIccProfile
        | IccProfileDeviceClassNotAllowed
        | MetadataRequired
        | XmpMetadataMalformed
        | XmpIdentificationMismatch => Error,
    }
}

/// Per-document rule configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ConformanceConfig {
    /// Severity overrides, consulted before the default table
    #[serde(default)]
    pub overrides: HashMap<RuleId, Severity>,
}

impl ConformanceConfig {
    /// Create a configuration with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the severity of one rule at every level.
    pub fn with_severity(mut self, rule: RuleId, severity: Severity) -> Self {
        self.overrides.insert(rule, severity);
        self
    }

    /// Effective severity of `rule` at `level`.
    pub fn severity(&self, level: ConformanceLevel, rule: RuleId) -> Severity {
        self.overrides
            .get(&rule)
            .copied()
            .unwrap_or_else(|| default_severity(level, rule))
    }
}

/// Device colour spaces, as used by colour operators and output-intent profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceColorSpace {
    /// DeviceGray
    Gray,
    /// DeviceRGB
    Rgb,
    /// DeviceCMYK
    Cmyk,
}

impl DeviceColorSpace {
    /// Number of colour components.
    pub fn components(&self) -> usize {
        match self {
            DeviceColorSpace::Gray => 1,
            DeviceColorSpace::Rgb => 3,
            DeviceColorSpace::Cmyk => 4,
        }
    }

    /// PDF name of the colour space.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            DeviceColorSpace::Gray => "DeviceGray",
            DeviceColorSpace::Rgb => "DeviceRGB",
            DeviceColorSpace::Cmyk => "DeviceCMYK",
        }
    }

    /// Whether content in `self` is covered by an intent whose profile is `intent`.
    ///
    /// DeviceGray is covered by any intent.
    pub fn is_covered_by(&self, intent: DeviceColorSpace) -> bool {
        *self == DeviceColorSpace::Gray || *self == intent
    }
}

/// Categories of checks that callers can request explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsoKey {
    /// Signature profile (CAdES vs. plain CMS)
    SignatureType,
    /// Rendering intent operand
    RenderingIntent,
    /// Graphics state nesting depth
    CanvasStack,
    /// Extended graphics state dictionary
    ExtendedGraphicsState,
    /// Device-dependent colour usage
    DeviceColor,
    /// Font dictionary
    FontDictionary,
    /// Creation of an optional content group
    LayerCreation,
    /// AcroForm NeedAppearances flag
    NeedAppearances,
    /// Key set on a page dictionary
    PageEntry,
    /// Key set on the document catalog
    CatalogEntry,
}

/// A check request with its payload.
#[derive(Debug, Clone, Copy)]
pub enum IsoCheck<'a> {
    /// Signature container kind
    SignatureType {
        /// True for a CAdES (ETSI.CAdES.detached) signature
        is_cades: bool,
    },
    /// Rendering intent name
    RenderingIntent(&'a str),
    /// Nesting depth after a push
    CanvasStack {
        /// Depth reached
        depth: usize,
    },
    /// ExtGState dictionary about to be used
    ExtGState(&'a Dictionary),
    /// Device colour space about to be used
    DeviceColor(DeviceColorSpace),
    /// Font dictionary about to be used
    FontDictionary(&'a Dictionary),
    /// A layer is being created
    LayerCreation,
    /// NeedAppearances is being set
    NeedAppearances(bool),
    /// A page dictionary entry is being set
    PageEntry {
        /// Key being set
        key: &'a str,
        /// Value being set
        value: &'a crate::object::Object,
    },
    /// A catalog entry is being set
    CatalogEntry {
        /// Key being set
        key: &'a str,
        /// Value being set
        value: &'a crate::object::Object,
    },
}

impl IsoCheck<'_> {
    /// The category of this check.
    pub fn key(&self) -> IsoKey {
        match self {
            IsoCheck::SignatureType { .. } => IsoKey::SignatureType,
            IsoCheck::RenderingIntent(_) => IsoKey::RenderingIntent,
            IsoCheck::CanvasStack { .. } => IsoKey::CanvasStack,
            IsoCheck::ExtGState(_) => IsoKey::ExtendedGraphicsState,
            IsoCheck::DeviceColor(_) => IsoKey::DeviceColor,
            IsoCheck::FontDictionary(_) => IsoKey::FontDictionary,
            IsoCheck::LayerCreation => IsoKey::LayerCreation,
            IsoCheck::NeedAppearances(_) => IsoKey::NeedAppearances,
            IsoCheck::PageEntry { .. } => IsoKey::PageEntry,
            IsoCheck::CatalogEntry { .. } => IsoKey::CatalogEntry,
        }
    }
}
