//! Extended graphics state (ExtGState) dictionaries.
//!
//! # Example
//!
//! ```ignore
//! use pdfa_oxide::writer::{BlendMode, ExtGStateBuilder};
//!
//! let gs = ExtGStateBuilder::new()
//!     .fill_alpha(0.5)
//!     .blend_mode(BlendMode::Multiply)
//!     .build();
//! ```
//!
//! The builder can express entries PDF/A forbids (transfer functions,
//! halftones, soft masks); the canvas checks the built dictionary before it
//! becomes a page resource.

use crate::object::{Dictionary, Object};

/// Blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// B(cb, cs) = cs
    #[default]
    Normal,
    /// Same as Normal; PDF 1.3 name
    Compatible,
    /// B(cb, cs) = cb × cs
    Multiply,
    /// B(cb, cs) = cb + cs − cb × cs
    Screen,
    /// HardLight with the operands swapped
    Overlay,
    /// min(cb, cs)
    Darken,
    /// max(cb, cs)
    Lighten,
    /// Brightens the backdrop
    ColorDodge,
    /// Darkens the backdrop
    ColorBurn,
    /// Multiply or screen depending on the source
    HardLight,
    /// Darken or lighten depending on the source
    SoftLight,
    /// |cb − cs|
    Difference,
    /// cb + cs − 2 × cb × cs
    Exclusion,
    /// Non-separable: hue of the source
    Hue,
    /// Non-separable: saturation of the source
    Saturation,
    /// Non-separable: hue and saturation of the source
    Color,
    /// Non-separable: luminosity of the source
    Luminosity,
}

impl BlendMode {
    /// PDF name without the slash.
    pub fn as_pdf_name(&self) -> &'static str {
        match self {
            BlendMode::Normal => "Normal",
            BlendMode::Compatible => "Compatible",
            BlendMode::Multiply => "Multiply",
            BlendMode::Screen => "Screen",
            BlendMode::Overlay => "Overlay",
            BlendMode::Darken => "Darken",
            BlendMode::Lighten => "Lighten",
            BlendMode::ColorDodge => "ColorDodge",
            BlendMode::ColorBurn => "ColorBurn",
            BlendMode::HardLight => "HardLight",
            BlendMode::SoftLight => "SoftLight",
            BlendMode::Difference => "Difference",
            BlendMode::Exclusion => "Exclusion",
            BlendMode::Hue => "Hue",
            BlendMode::Saturation => "Saturation",
            BlendMode::Color => "Color",
            BlendMode::Luminosity => "Luminosity",
        }
    }
}

/// Builder for ExtGState dictionaries.
#[derive(Debug, Clone, Default)]
pub struct ExtGStateBuilder {
    fill_alpha: Option<f64>,
    stroke_alpha: Option<f64>,
    blend_mode: Option<BlendMode>,
    line_width: Option<f64>,
    rendering_intent: Option<String>,
    overprint: Option<bool>,
    transfer_function: Option<Object>,
    halftone: Option<Object>,
    soft_mask: Option<Object>,
}

impl ExtGStateBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill opacity (`ca`), clamped to 0..=1.
    pub fn fill_alpha(mut self, alpha: f64) -> Self {
        self.fill_alpha = Some(alpha.clamp(0.0, 1.0));
        self
    }

    /// Stroke opacity (`CA`), clamped to 0..=1.
    pub fn stroke_alpha(mut self, alpha: f64) -> Self {
        self.stroke_alpha = Some(alpha.clamp(0.0, 1.0));
        self
    }

    /// Set both opacities.
    pub fn alpha(self, alpha: f64) -> Self {
        self.fill_alpha(alpha).stroke_alpha(alpha)
    }

    /// Blend mode (`BM`).
    pub fn blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = Some(mode);
        self
    }

    /// Line width (`LW`).
    pub fn line_width(mut self, width: f64) -> Self {
        self.line_width = Some(width);
        self
    }

    /// Rendering intent (`RI`).
    pub fn rendering_intent(mut self, intent: impl Into<String>) -> Self {
        self.rendering_intent = Some(intent.into());
        self
    }

    /// Overprint for both stroke and fill (`OP`, `op`).
    pub fn overprint(mut self, enabled: bool) -> Self {
        self.overprint = Some(enabled);
        self
    }

    /// Transfer function (`TR`).
    pub fn transfer_function(mut self, function: Object) -> Self {
        self.transfer_function = Some(function);
        self
    }

    /// Halftone (`HT`/`HTP`).
    pub fn halftone_phase(mut self, phase: Object) -> Self {
        self.halftone = Some(phase);
        self
    }

    /// Soft mask (`SMask`); `Object::name("None")` clears it.
    pub fn soft_mask(mut self, mask: Object) -> Self {
        self.soft_mask = Some(mask);
        self
    }

    /// True when a non-opaque alpha or non-normal blend mode is set.
    pub fn uses_transparency(&self) -> bool {
        let translucent = |a: Option<f64>| a.map(|v| v < 1.0).unwrap_or(false);
        translucent(self.fill_alpha)
            || translucent(self.stroke_alpha)
            || self
                .blend_mode
                .map(|m| !matches!(m, BlendMode::Normal | BlendMode::Compatible))
                .unwrap_or(false)
            || self.soft_mask.as_ref().map(|m| m.as_name() != Some("None")).unwrap_or(false)
    }

    /// Build the dictionary.
    pub fn build(&self) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.insert("Type".to_string(), Object::name("ExtGState"));
        if let Some(a) = self.fill_alpha {
            dict.insert("ca".to_string(), Object::Real(a));
        }
        if let Some(a) = self.stroke_alpha {
            dict.insert("CA".to_string(), Object::Real(a));
        }
        if let Some(mode) = self.blend_mode {
            dict.insert("BM".to_string(), Object::name(mode.as_pdf_name()));
        }
        if let Some(w) = self.line_width {
            dict.insert("LW".to_string(), Object::Real(w));
        }
        if let Some(ri) = &self.rendering_intent {
            dict.insert("RI".to_string(), Object::name(ri.as_str()));
        }
        if let Some(op) = self.overprint {
            dict.insert("OP".to_string(), Object::Boolean(op));
            dict.insert("op".to_string(), Object::Boolean(op));
        }
        if let Some(tr) = &self.transfer_function {
            dict.insert("TR".to_string(), tr.clone());
        }
        if let Some(htp) = &self.halftone {
            dict.insert("HTP".to_string(), htp.clone());
        }
        if let Some(smask) = &self.soft_mask {
            dict.insert("SMask".to_string(), smask.clone());
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_is_clamped() {
        let dict = ExtGStateBuilder::new().fill_alpha(1.5).stroke_alpha(-0.2).build();
        assert_eq!(dict.get("ca"), Some(&Object::Real(1.0)));
        assert_eq!(dict.get("CA"), Some(&Object::Real(0.0)));
    }

    #[test]
    fn test_blend_mode_name() {
        let dict = ExtGStateBuilder::new().blend_mode(BlendMode::ColorDodge).build();
        assert_eq!(dict.get("BM").and_then(Object::as_name), Some("ColorDodge"));
        assert_eq!(dict.get("Type").and_then(Object::as_name), Some("ExtGState"));
    }

    #[test]
    fn test_uses_transparency() {
        assert!(!ExtGStateBuilder::new().line_width(2.0).uses_transparency());
        assert!(!ExtGStateBuilder::new().alpha(1.0).uses_transparency());
        assert!(ExtGStateBuilder::new().fill_alpha(0.4).uses_transparency());
        assert!(ExtGStateBuilder::new().blend_mode(BlendMode::Multiply).uses_transparency());
        assert!(!ExtGStateBuilder::new().soft_mask(Object::name("None")).uses_transparency());
    }

    #[test]
    fn test_forbidden_entries_are_emitted() {
        let dict = ExtGStateBuilder::new()
            .transfer_function(Object::name("Identity"))
            .halftone_phase(Object::Array(vec![Object::Integer(0), Object::Integer(0)]))
            .build();
        assert!(dict.contains_key("TR"));
        assert!(dict.contains_key("HTP"));
    }
}
