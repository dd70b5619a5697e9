//! PDF/A conformance rule engine.
//!
//! Checks run at three points of a document's life:
//!
//! - **per mutation**: explicit [`IsoCheck`] requests from the document, canvas
//!   and form APIs (rendering intents, stack depth, page and catalog keys),
//! - **per flush**: every indirect object is checked once before it is written,
//!   including every direct dictionary nested inside it,
//! - **at close**: a sweep over document-level requirements (output intent,
//!   XMP identification, `Lang`, optional content configuration).
//!
//! Whether a rule is fatal depends on the conformance level, through the
//! severity table in [`default_severity`], and on per-document overrides in
//! [`ConformanceConfig`].
//!
//! ## PDF/A Conformance Levels
//!
//! - **PDF/A-1a / 1b**: PDF 1.4 based; no transparency, no optional content
//! - **PDF/A-2a / 2b / 2u**: PDF 1.7 based; transparency and layers allowed
//! - **PDF/A-3a / 3b / 3u**: PDF/A-2 plus arbitrary embedded files
//! - **PDF/A-4 / 4e / 4f**: PDF 2.0 based
//!
//! ## Example
//!
//! ```ignore
//! use pdfa_oxide::compliance::{ConformanceChecker, ConformanceConfig, ConformanceLevel, IsoCheck};
//!
//! let mut checker = ConformanceChecker::new(ConformanceLevel::A2b, ConformanceConfig::default());
//! checker.check_iso_conformance(IsoCheck::RenderingIntent("Perceptual"), None)?;
//! ```
//!
//! ## Standards Reference
//!
//! - ISO 19005-1:2005 (PDF/A-1)
//! - ISO 19005-2:2011 (PDF/A-2)
//! - ISO 19005-3:2012 (PDF/A-3)
//! - ISO 19005-4:2020 (PDF/A-4)

mod checker;
mod content;
mod icc;
mod output_intent;
mod rules;
mod types;
mod validators;
mod xmp;

pub use checker::{header_version_allowed, ConformanceChecker, DocumentView};
pub use content::{scan_content, ContentSummary};
pub use icc::{IccDeviceClass, IccProfile};
pub use output_intent::{is_valid_language_tag, BoundIntent, MetadataBinder, OutputIntent, GTS_PDFA1};
pub use rules::{
    default_severity, AnnotationFlags, ConformanceConfig, DeviceColorSpace, IsoCheck, IsoKey, ALLOWED_RENDERING_INTENTS,
    MAX_GRAPHICS_STATE_DEPTH,
};
pub use types::{ConformanceLevel, ConformanceViolation, PdfAPart, RuleId, Severity, ValidationReport};
pub use validators::Violations;
pub use xmp::{parse_xmp, XmpInfo};
