//! Output intents and the metadata binder.
//!
//! The binder remembers which output intent, language tag and user XMP the
//! document carries. The document writes the corresponding objects; the
//! rule engine asks the binder whether an intent is bound and which colour
//! space it covers.

use super::icc::IccProfile;
use super::rules::DeviceColorSpace;
use crate::error::{Error, Result};
use crate::graph::ObjectGraph;
use crate::object::{Dictionary, Object, ObjectRef};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE_LANGUAGE_TAG: Regex =
        Regex::new(r"^[A-Za-z]{2,8}(-[A-Za-z0-9]{1,8})*$").expect("valid language tag regex");
}

/// Output intent subtype for PDF/A.
pub const GTS_PDFA1: &str = "GTS_PDFA1";

/// An ICC output intent with its descriptive entries.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputIntent {
    /// `OutputConditionIdentifier`, e.g. `sRGB IEC61966-2.1`
    pub output_condition_identifier: String,
    /// `OutputCondition`
    pub output_condition: Option<String>,
    /// `RegistryName`, e.g. `http://www.color.org`
    pub registry_name: Option<String>,
    /// `Info`
    pub info: Option<String>,
    /// `DestOutputProfile`
    pub profile: IccProfile,
}

impl OutputIntent {
    /// Create an intent for `profile`.
    pub fn new(output_condition_identifier: impl Into<String>, profile: IccProfile) -> Self {
        Self {
            output_condition_identifier: output_condition_identifier.into(),
            output_condition: None,
            registry_name: None,
            info: None,
            profile,
        }
    }

    /// Set `OutputCondition`.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.output_condition = Some(condition.into());
        self
    }

    /// Set `RegistryName`.
    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry_name = Some(registry.into());
        self
    }

    /// Set `Info`.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Colour space covered by the profile.
    pub fn color_space(&self) -> Option<DeviceColorSpace> {
        self.profile.device_color_space()
    }

    /// The `DestOutputProfile` stream.
    pub fn profile_stream(&self) -> Object {
        let mut dict = Dictionary::new();
        dict.insert("N".to_string(), Object::Integer(self.profile.components().unwrap_or(3) as i64));
        if let Some(space) = self.color_space() {
            dict.insert("Alternate".to_string(), Object::name(space.pdf_name()));
        }
        Object::Stream {
            dict,
            data: self.profile.data().clone(),
        }
    }

    /// The output intent dictionary pointing at `profile_ref`.
    pub fn to_dictionary(&self, profile_ref: ObjectRef) -> Object {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("OutputIntent"));
        dict.insert("S".to_string(), Object::name(GTS_PDFA1));
        dict.insert(
            "OutputConditionIdentifier".to_string(),
            Object::String(self.output_condition_identifier.as_bytes().to_vec()),
        );
        if let Some(condition) = &self.output_condition {
            dict.insert("OutputCondition".to_string(), Object::String(condition.as_bytes().to_vec()));
        }
        if let Some(registry) = &self.registry_name {
            dict.insert("RegistryName".to_string(), Object::String(registry.as_bytes().to_vec()));
        }
        if let Some(info) = &self.info {
            dict.insert("Info".to_string(), Object::String(info.as_bytes().to_vec()));
        }
        dict.insert("DestOutputProfile".to_string(), Object::Reference(profile_ref));
        Object::Dictionary(dict)
    }

    /// Read an intent back from an output intent dictionary in `graph`.
    pub fn from_dictionary(dict: &Dictionary, graph: &ObjectGraph) -> Result<Self> {
        let text = |key: &str| {
            dict.get(key)
                .and_then(Object::as_string)
                .map(|s| String::from_utf8_lossy(s).to_string())
        };
        let profile_obj = dict
            .get("DestOutputProfile")
            .and_then(|o| graph.resolve(o))
            .ok_or_else(|| Error::InvalidPdf("output intent without DestOutputProfile".to_string()))?;
        let data = profile_obj.decode_stream_data()?;
        let profile = IccProfile::parse(data).map_err(Error::Conformance)?;

        Ok(Self {
            output_condition_identifier: text("OutputConditionIdentifier").unwrap_or_default(),
            output_condition: text("OutputCondition"),
            registry_name: text("RegistryName"),
            info: text("Info"),
            profile,
        })
    }
}

/// Where the bound intent lives in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundIntent {
    /// The `OutputIntents` array
    pub array: ObjectRef,
    /// The intent dictionary
    pub dictionary: ObjectRef,
    /// The `DestOutputProfile` stream
    pub profile: ObjectRef,
}

/// Tracks the metadata and output intent bound to a document.
#[derive(Debug, Default)]
pub struct MetadataBinder {
    intent: Option<OutputIntent>,
    location: Option<BoundIntent>,
    lang: Option<String>,
    xmp: Option<Vec<u8>>,
}

impl MetadataBinder {
    /// Create an empty binder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `intent`. Only one intent can ever be bound.
    pub fn bind(&mut self, intent: OutputIntent, location: BoundIntent) -> Result<()> {
        if self.intent.is_some() {
            return Err(Error::InvalidState("an output intent is already bound".to_string()));
        }
        log::debug!("Bound output intent '{}'", intent.output_condition_identifier);
        self.intent = Some(intent);
        self.location = Some(location);
        Ok(())
    }

    /// True once an intent is bound.
    pub fn is_bound(&self) -> bool {
        self.intent.is_some()
    }

    /// The bound intent.
    pub fn intent(&self) -> Option<&OutputIntent> {
        self.intent.as_ref()
    }

    /// Graph location of the bound intent.
    pub fn location(&self) -> Option<BoundIntent> {
        self.location
    }

    /// Colour space of the bound intent's profile.
    pub fn color_space(&self) -> Option<DeviceColorSpace> {
        self.intent.as_ref().and_then(OutputIntent::color_space)
    }

    /// Validate and remember a language tag.
    pub fn set_lang(&mut self, tag: &str) -> Result<()> {
        if !is_valid_language_tag(tag) {
            return Err(Error::InvalidState(format!("'{}' is not a valid language tag", tag)));
        }
        self.lang = Some(tag.to_string());
        Ok(())
    }

    /// The language tag, if one was set.
    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    /// Supply a complete XMP packet instead of the generated one.
    pub fn set_xmp(&mut self, packet: Vec<u8>) {
        self.xmp = Some(packet);
    }

    /// User-supplied XMP packet.
    pub fn xmp(&self) -> Option<&[u8]> {
        self.xmp.as_deref()
    }
}

/// Whether `tag` has the shape of a BCP 47 language tag.
pub fn is_valid_language_tag(tag: &str) -> bool {
    RE_LANGUAGE_TAG.is_match(tag)
}
