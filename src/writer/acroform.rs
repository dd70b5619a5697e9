//! Interactive form dictionaries.
//!
//! PDF/A restricts forms: `NeedAppearances` must be absent or false (absent
//! in part 4), every widget needs a normal appearance stream, and XFA is not
//! allowed. The builder here never emits XFA and leaves `NeedAppearances`
//! absent unless it is set explicitly.

use crate::compliance::AnnotationFlags;
use crate::object::{Dictionary, Object, ObjectRef};

/// Builder for the document-level AcroForm dictionary.
#[derive(Debug, Clone, Default)]
pub struct AcroFormBuilder {
    fields: Vec<ObjectRef>,
    need_appearances: Option<bool>,
    sig_flags: Option<u32>,
    default_appearance: Option<String>,
}

impl AcroFormBuilder {
    /// Create an empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field reference.
    pub fn add_field(&mut self, field_ref: ObjectRef) {
        self.fields.push(field_ref);
    }

    /// Set or clear the `NeedAppearances` entry.
    pub fn set_need_appearances(&mut self, need: Option<bool>) {
        self.need_appearances = need;
    }

    /// Current `NeedAppearances` value; `None` when absent.
    pub fn need_appearances(&self) -> Option<bool> {
        self.need_appearances
    }

    /// Set the default appearance string, e.g. `/Helv 12 Tf 0 g`.
    pub fn set_default_appearance(&mut self, da: impl Into<String>) {
        self.default_appearance = Some(da.into());
    }

    /// Mark the document as containing signatures.
    pub fn signatures_exist(&mut self) {
        self.sig_flags = Some(self.sig_flags.unwrap_or(0) | 1);
    }

    /// Mark the document as append-only.
    pub fn append_only(&mut self) {
        self.sig_flags = Some(self.sig_flags.unwrap_or(0) | 2);
    }

    /// Field references in insertion order.
    pub fn fields(&self) -> &[ObjectRef] {
        &self.fields
    }

    /// Build the AcroForm dictionary.
    pub fn build(&self) -> Object {
        let mut dict = Dictionary::new();
        let fields = self.fields.iter().map(|r| Object::Reference(*r)).collect();
        dict.insert("Fields".to_string(), Object::Array(fields));
        if let Some(need) = self.need_appearances {
            dict.insert("NeedAppearances".to_string(), Object::Boolean(need));
        }
        if let Some(flags) = self.sig_flags {
            dict.insert("SigFlags".to_string(), Object::Integer(flags as i64));
        }
        if let Some(da) = &self.default_appearance {
            dict.insert("DA".to_string(), Object::String(da.as_bytes().to_vec()));
        }
        Object::Dictionary(dict)
    }
}

/// A single-line text field, stored as a merged field/widget dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    /// Partial field name (`T`)
    pub name: String,
    /// Widget rectangle `[llx lly urx ury]`
    pub rect: [f64; 4],
    /// Field value (`V`)
    pub value: Option<String>,
}

impl TextField {
    /// Create an empty text field.
    pub fn new(name: impl Into<String>, rect: [f64; 4]) -> Self {
        Self {
            name: name.into(),
            rect,
            value: None,
        }
    }

    /// Set the field value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Width and height of the widget.
    pub fn size(&self) -> (f64, f64) {
        ((self.rect[2] - self.rect[0]).abs(), (self.rect[3] - self.rect[1]).abs())
    }

    /// The normal appearance: an empty marked-content Form XObject.
    pub fn appearance_stream(&self) -> Object {
        let (w, h) = self.size();
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("XObject"));
        dict.insert("Subtype".to_string(), Object::name("Form"));
        dict.insert(
            "BBox".to_string(),
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Real(w), Object::Real(h)]),
        );
        Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"/Tx BMC\nEMC\n"),
        }
    }

    /// The merged field/widget dictionary on `page`.
    pub fn to_dictionary(&self, page: ObjectRef, appearance: ObjectRef) -> Object {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("Annot"));
        dict.insert("Subtype".to_string(), Object::name("Widget"));
        dict.insert("FT".to_string(), Object::name("Tx"));
        dict.insert("T".to_string(), Object::String(self.name.as_bytes().to_vec()));
        if let Some(value) = &self.value {
            dict.insert("V".to_string(), Object::String(value.as_bytes().to_vec()));
        }
        dict.insert("Rect".to_string(), Object::Array(self.rect.iter().map(|v| Object::Real(*v)).collect()));
        dict.insert("F".to_string(), Object::Integer(AnnotationFlags::PRINT.bits() as i64));
        dict.insert("P".to_string(), Object::Reference(page));

        let mut ap = Dictionary::new();
        ap.insert("N".to_string(), Object::Reference(appearance));
        dict.insert("AP".to_string(), Object::Dictionary(ap));
        Object::Dictionary(dict)
    }
}
