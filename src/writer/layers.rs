//! Optional content (layers).
//!
//! A [`LayerSet`] collects the optional content groups created on a document
//! and builds the catalog's `/OCProperties` dictionary at close. The default
//! configuration it emits is the one PDF/A-2 and later accept:
//!
//! - `/D` carries a `/Name`
//! - `/D` never carries `/AS`
//! - every group is listed in `/D /Order`
//!
//! Part 1 forbids optional content altogether; the document refuses to
//! create a layer there before anything reaches this module.

use crate::object::{Dictionary, Object, ObjectRef};

/// Name of the default optional content configuration.
pub const DEFAULT_CONFIG_NAME: &str = "Default";

/// Layer intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerIntent {
    /// Layer is for viewing purposes.
    #[default]
    View,
    /// Layer is for design purposes.
    Design,
}

/// One optional content group.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Name shown in viewer UI
    pub name: String,
    /// Whether the layer starts visible
    pub visible: bool,
    /// Intent of the layer
    pub intent: LayerIntent,
    /// Whether the layer is printed; `None` leaves the viewer default
    pub printable: Option<bool>,
}

impl Layer {
    /// Create a visible layer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visible: true,
            intent: LayerIntent::View,
            printable: None,
        }
    }

    /// Set initial visibility.
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set the layer intent.
    pub fn intent(mut self, intent: LayerIntent) -> Self {
        self.intent = intent;
        self
    }

    /// Set print usage.
    pub fn printable(mut self, printable: bool) -> Self {
        self.printable = Some(printable);
        self
    }

    /// Build the OCG dictionary.
    pub fn to_dictionary(&self) -> Object {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("OCG"));
        dict.insert("Name".to_string(), Object::String(self.name.as_bytes().to_vec()));
        let intent = match self.intent {
            LayerIntent::View => "View",
            LayerIntent::Design => "Design",
        };
        dict.insert("Intent".to_string(), Object::name(intent));

        if let Some(printable) = self.printable {
            let mut print = Dictionary::new();
            print.insert("PrintState".to_string(), Object::name(if printable { "ON" } else { "OFF" }));
            let mut usage = Dictionary::new();
            usage.insert("Print".to_string(), Object::Dictionary(print));
            dict.insert("Usage".to_string(), Object::Dictionary(usage));
        }
        Object::Dictionary(dict)
    }
}

/// The layers of one document, in creation order.
#[derive(Debug, Clone, Default)]
pub struct LayerSet {
    layers: Vec<(ObjectRef, Layer)>,
    creator: Option<String>,
}

impl LayerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the creator application in the default configuration.
    pub fn set_creator(&mut self, creator: impl Into<String>) {
        self.creator = Some(creator.into());
    }

    /// Register `layer`, stored as `ocg`.
    pub fn push(&mut self, ocg: ObjectRef, layer: Layer) {
        self.layers.push((ocg, layer));
    }

    /// Look up the layer stored as `ocg`.
    pub fn get(&self, ocg: ObjectRef) -> Option<&Layer> {
        self.layers.iter().find(|(r, _)| *r == ocg).map(|(_, l)| l)
    }

    /// Object references of all groups.
    pub fn refs(&self) -> Vec<ObjectRef> {
        self.layers.iter().map(|(r, _)| *r).collect()
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// True when no layer was created.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Build the `/OCProperties` dictionary.
    pub fn to_oc_properties(&self) -> Object {
        let ocgs: Vec<Object> = self.layers.iter().map(|(r, _)| Object::Reference(*r)).collect();

        let mut d = Dictionary::new();
        d.insert("Name".to_string(), Object::String(DEFAULT_CONFIG_NAME.as_bytes().to_vec()));
        if let Some(creator) = &self.creator {
            d.insert("Creator".to_string(), Object::String(creator.as_bytes().to_vec()));
        }
        d.insert("BaseState".to_string(), Object::name("ON"));
        let off: Vec<Object> = self
            .layers
            .iter()
            .filter(|(_, l)| !l.visible)
            .map(|(r, _)| Object::Reference(*r))
            .collect();
        if !off.is_empty() {
            d.insert("OFF".to_string(), Object::Array(off));
        }
        d.insert("Order".to_string(), Object::Array(ocgs.clone()));

        let mut props = Dictionary::new();
        props.insert("OCGs".to_string(), Object::Array(ocgs));
        props.insert("D".to_string(), Object::Dictionary(d));
        Object::Dictionary(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_dictionary() {
        let dict = Layer::new("Watermark").intent(LayerIntent::Design).to_dictionary();
        assert_eq!(dict.get("Type").and_then(Object::as_name), Some("OCG"));
        assert_eq!(dict.get("Name").and_then(Object::as_string), Some(&b"Watermark"[..]));
        assert_eq!(dict.get("Intent").and_then(Object::as_name), Some("Design"));
        assert!(dict.get("Usage").is_none());
    }

    #[test]
    fn test_layer_print_usage() {
        let dict = Layer::new("Screen only").printable(false).to_dictionary();
        let state = dict
            .get("Usage")
            .and_then(|u| u.get("Print"))
            .and_then(|p| p.get("PrintState"))
            .and_then(Object::as_name);
        assert_eq!(state, Some("OFF"));
    }

    #[test]
    fn test_oc_properties_lists_every_group_in_order() {
        let mut set = LayerSet::new();
        set.push(ObjectRef::new(7, 0), Layer::new("A"));
        set.push(ObjectRef::new(9, 0), Layer::new("B").visible(false));

        let props = set.to_oc_properties();
        let d = props.get("D").expect("default config");
        assert_eq!(d.get("Name").and_then(Object::as_string), Some(&b"Default"[..]));
        assert!(d.get("AS").is_none());

        let order = d.get("Order").and_then(Object::as_array).expect("order");
        assert_eq!(order.len(), 2);
        let off = d.get("OFF").and_then(Object::as_array).expect("off");
        assert_eq!(off, &vec![Object::Reference(ObjectRef::new(9, 0))]);
        assert_eq!(props.get("OCGs").and_then(Object::as_array).map(Vec::len), Some(2));
    }

    #[test]
    fn test_layer_set_lookup() {
        let mut set = LayerSet::new();
        assert!(set.is_empty());
        set.push(ObjectRef::new(3, 0), Layer::new("Notes"));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(ObjectRef::new(3, 0)).map(|l| l.name.as_str()), Some("Notes"));
        assert!(set.get(ObjectRef::new(4, 0)).is_none());
        assert_eq!(set.refs(), vec![ObjectRef::new(3, 0)]);
    }
}
