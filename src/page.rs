//! Pages of a document under construction.

use crate::object::{Dictionary, Object, ObjectRef};

/// Standard page sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSize {
    /// US Letter (8.5" x 11")
    Letter,
    /// A4 (210mm x 297mm)
    A4,
    /// Legal (8.5" x 14")
    Legal,
    /// A3 (297mm x 420mm)
    A3,
    /// Custom dimensions in points
    Custom(f64, f64),
}

impl PageSize {
    /// Get dimensions in points (1 inch = 72 points).
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::Letter => (612.0, 792.0),
            PageSize::A4 => (595.0, 842.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::A3 => (842.0, 1190.0),
            PageSize::Custom(w, h) => (*w, *h),
        }
    }

    /// The `MediaBox` array.
    pub fn media_box(&self) -> Object {
        let (w, h) = self.dimensions();
        Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Real(w), Object::Real(h)])
    }
}

/// Handle to one page: its dictionary and its content stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    /// Zero-based position in the page tree
    pub index: usize,
    /// The page dictionary
    pub page: ObjectRef,
    /// The page's content stream
    pub contents: ObjectRef,
}

/// A fresh page dictionary with an empty resource dictionary.
pub(crate) fn page_dictionary(parent: ObjectRef, contents: ObjectRef, size: PageSize) -> Object {
    let mut dict = Dictionary::new();
    dict.insert("Type".to_string(), Object::name("Page"));
    dict.insert("Parent".to_string(), Object::Reference(parent));
    dict.insert("MediaBox".to_string(), size.media_box());
    dict.insert("Contents".to_string(), Object::Reference(contents));
    dict.insert("Resources".to_string(), Object::Dictionary(Dictionary::new()));
    Object::Dictionary(dict)
}

/// Insert `value` as `/category/name` in a page's resource dictionary.
pub(crate) fn add_resource(page: &mut Object, category: &str, name: &str, value: Object) {
    let Some(dict) = page.as_dict_mut() else {
        return;
    };
    let resources = dict
        .entry("Resources".to_string())
        .or_insert_with(|| Object::Dictionary(Dictionary::new()));
    let Some(resources) = resources.as_dict_mut() else {
        return;
    };
    let entries = resources
        .entry(category.to_string())
        .or_insert_with(|| Object::Dictionary(Dictionary::new()));
    if let Some(entries) = entries.as_dict_mut() {
        entries.insert(name.to_string(), value);
    }
}
