//! PDF writing module.
//!
//! ## Architecture
//!
//! ```text
//! PdfADocument (object graph, pages, canvases)
//!     ↓ flush_object / flush_waiting_objects / close
//! [FlushCoordinator] (pinning, FlushPolicy ordering)
//!     ↓
//! [ConformanceChecker] (per-object rules, once per object)
//!     ↓
//! [PdfWriter] (bodies, xref table, trailer)
//!     ↓
//! [ObjectSerializer] (deterministic object syntax)
//!     ↓
//! PDF bytes
//! ```
//!
//! The helpers in [`layers`], [`acroform`] and [`graphics_state`] build the
//! dictionaries the document stores for optional content, forms and
//! extended graphics states.

pub mod acroform;
mod flush;
pub mod graphics_state;
pub mod layers;
pub mod object_serializer;
mod pdf_writer;
mod xmp_metadata;

pub use acroform::{AcroFormBuilder, TextField};
pub use flush::{policy_fn, AscendingPolicy, DescendingPolicy, FlushCoordinator, FlushOutcome, FlushPolicy, FnPolicy};
pub use graphics_state::{BlendMode, ExtGStateBuilder};
pub use layers::{Layer, LayerSet};
pub use object_serializer::ObjectSerializer;
pub use pdf_writer::{PdfWriter, PdfWriterConfig, WriteMode};
pub(crate) use pdf_writer::compress_data;
pub use xmp_metadata::{iso_timestamp, pdf_date, XmpWriter};
