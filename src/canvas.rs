//! Drawing on a page with conformance checks on every state change.
//!
//! A [`PdfCanvas`] buffers operators and appends them to the page's content
//! stream on [`release`](PdfCanvas::release). Operators that touch colour,
//! rendering intents, extended graphics states, fonts or the graphics
//! state stack are checked before they are written, so a rejected call
//! leaves the buffer unchanged.

use crate::compliance::{DeviceColorSpace, IsoCheck};
use crate::document::PdfADocument;
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::page::PageRef;
use crate::writer::{ExtGStateBuilder, ObjectSerializer};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// `q`
    State,
    /// `BDC` for optional content
    Layer,
}

/// Content stream builder bound to one page of a document.
pub struct PdfCanvas<'a, W: Write> {
    doc: &'a mut PdfADocument<W>,
    page: PageRef,
    buffer: Vec<u8>,
    stack: Vec<Frame>,
    font: Option<(String, f64)>,
}

impl<W: Write> std::fmt::Debug for PdfCanvas<'_, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfCanvas")
            .field("page", &self.page)
            .field("buffered", &self.buffer.len())
            .field("stack", &self.stack)
            .field("font", &self.font)
            .finish()
    }
}

impl<'a, W: Write> PdfCanvas<'a, W> {
    pub(crate) fn new(doc: &'a mut PdfADocument<W>, page: PageRef) -> Self {
        Self {
            doc,
            page,
            buffer: Vec::new(),
            stack: Vec::new(),
            font: None,
        }
    }

    /// The page being drawn on.
    pub fn page(&self) -> PageRef {
        self.page
    }

    /// Current `q` nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.iter().filter(|f| **f == Frame::State).count()
    }

    /// Operators buffered so far.
    pub fn content(&self) -> &[u8] {
        &self.buffer
    }

    fn op(&mut self, text: &str) -> &mut Self {
        self.buffer.extend_from_slice(text.as_bytes());
        self.buffer.push(b'\n');
        self
    }

    fn check(&mut self, check: IsoCheck<'_>) -> Result<()> {
        let page = self.page.page;
        self.doc.checker_mut().check_iso_conformance(check, Some(page))
    }

    // === Graphics state ===

    /// Push the graphics state (`q`).
    pub fn save_state(&mut self) -> Result<&mut Self> {
        self.check(IsoCheck::CanvasStack { depth: self.depth() + 1 })?;
        self.stack.push(Frame::State);
        Ok(self.op("q"))
    }

    /// Pop the graphics state (`Q`).
    pub fn restore_state(&mut self) -> Result<&mut Self> {
        match self.stack.last() {
            Some(Frame::State) => {
                self.stack.pop();
                Ok(self.op("Q"))
            },
            Some(Frame::Layer) => Err(Error::InvalidState("Q inside an open layer".to_string())),
            None => Err(Error::InvalidState("graphics state stack underflow".to_string())),
        }
    }

    /// Set the rendering intent (`ri`).
    pub fn set_rendering_intent(&mut self, intent: &str) -> Result<&mut Self> {
        self.check(IsoCheck::RenderingIntent(intent))?;
        let op = format!("{} ri", ser(&Object::name(intent)));
        Ok(self.op(&op))
    }

    /// Apply an extended graphics state (`gs`).
    pub fn set_ext_gstate(&mut self, state: &ExtGStateBuilder) -> Result<&mut Self> {
        let dict = state.build();
        self.check(IsoCheck::ExtGState(&dict))?;
        let name = self
            .doc
            .add_page_resource(self.page, "ExtGState", "GS", Object::Dictionary(dict))?;
        let op = format!("/{} gs", name);
        Ok(self.op(&op))
    }

    /// Set the line width (`w`).
    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        let op = format!("{} w", num(width));
        self.op(&op)
    }

    // === Colour ===

    fn color(&mut self, space: DeviceColorSpace, components: &[f64], operator: &str) -> Result<&mut Self> {
        self.check(IsoCheck::DeviceColor(space))?;
        let mut op: Vec<String> = components.iter().map(|c| num(c.clamp(0.0, 1.0))).collect();
        op.push(operator.to_string());
        Ok(self.op(&op.join(" ")))
    }

    /// DeviceRGB fill colour (`rg`).
    pub fn set_fill_color_rgb(&mut self, r: f64, g: f64, b: f64) -> Result<&mut Self> {
        self.color(DeviceColorSpace::Rgb, &[r, g, b], "rg")
    }

    /// DeviceRGB stroke colour (`RG`).
    pub fn set_stroke_color_rgb(&mut self, r: f64, g: f64, b: f64) -> Result<&mut Self> {
        self.color(DeviceColorSpace::Rgb, &[r, g, b], "RG")
    }

    /// DeviceCMYK fill colour (`k`).
    pub fn set_fill_color_cmyk(&mut self, c: f64, m: f64, y: f64, k: f64) -> Result<&mut Self> {
        self.color(DeviceColorSpace::Cmyk, &[c, m, y, k], "k")
    }

    /// DeviceCMYK stroke colour (`K`).
    pub fn set_stroke_color_cmyk(&mut self, c: f64, m: f64, y: f64, k: f64) -> Result<&mut Self> {
        self.color(DeviceColorSpace::Cmyk, &[c, m, y, k], "K")
    }

    /// DeviceGray fill colour (`g`).
    pub fn set_fill_gray(&mut self, gray: f64) -> Result<&mut Self> {
        self.color(DeviceColorSpace::Gray, &[gray], "g")
    }

    /// DeviceGray stroke colour (`G`).
    pub fn set_stroke_gray(&mut self, gray: f64) -> Result<&mut Self> {
        self.color(DeviceColorSpace::Gray, &[gray], "G")
    }

    // === Paths ===

    /// Append a rectangle (`re`).
    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        let op = format!("{} {} {} {} re", num(x), num(y), num(width), num(height));
        self.op(&op)
    }

    /// Begin a subpath (`m`).
    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        let op = format!("{} {} m", num(x), num(y));
        self.op(&op)
    }

    /// Straight segment (`l`).
    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        let op = format!("{} {} l", num(x), num(y));
        self.op(&op)
    }

    /// Fill the path (`f`).
    pub fn fill(&mut self) -> &mut Self {
        self.op("f")
    }

    /// Stroke the path (`S`).
    pub fn stroke(&mut self) -> &mut Self {
        self.op("S")
    }

    // === Optional content ===

    /// Start content belonging to layer `ocg` (`/OC /name BDC`).
    pub fn begin_layer(&mut self, ocg: ObjectRef) -> Result<&mut Self> {
        if !self.doc.is_layer(ocg) {
            return Err(Error::InvalidState(format!("{} is not a layer of this document", ocg)));
        }
        let name = self
            .doc
            .add_page_resource(self.page, "Properties", "OC", Object::Reference(ocg))?;
        self.stack.push(Frame::Layer);
        let op = format!("/OC /{} BDC", name);
        Ok(self.op(&op))
    }

    /// End the innermost layer (`EMC`).
    pub fn end_layer(&mut self) -> Result<&mut Self> {
        match self.stack.last() {
            Some(Frame::Layer) => {
                self.stack.pop();
                Ok(self.op("EMC"))
            },
            Some(Frame::State) => Err(Error::InvalidState("EMC inside an open q".to_string())),
            None => Err(Error::InvalidState("no open layer".to_string())),
        }
    }

    // === Text ===

    /// Select `font` at `size` for [`show_text`](Self::show_text).
    ///
    /// An in-memory font dictionary is checked for embedding first.
    pub fn set_font(&mut self, font: ObjectRef, size: f64) -> Result<&mut Self> {
        let dict = self.doc.get_object(font).ok().and_then(Object::as_dict).cloned();
        if let Some(dict) = dict {
            self.check(IsoCheck::FontDictionary(&dict))?;
        }
        let name = self
            .doc
            .add_page_resource(self.page, "Font", "F", Object::Reference(font))?;
        self.font = Some((name, size));
        Ok(self)
    }

    /// Show `text` at (`x`, `y`) in one text object.
    pub fn show_text(&mut self, x: f64, y: f64, text: &str) -> Result<&mut Self> {
        let (font, size) = self
            .font
            .clone()
            .ok_or_else(|| Error::InvalidState("no font selected".to_string()))?;
        let op = format!(
            "BT\n/{} {} Tf\n{} {} Td\n{} Tj\nET",
            font,
            num(size),
            num(x),
            num(y),
            ser(&Object::String(text.as_bytes().to_vec()))
        );
        Ok(self.op(&op))
    }

    /// Append the buffered operators to the page content stream.
    ///
    /// Layers and saved states still open are closed first.
    pub fn release(mut self) -> Result<PageRef> {
        if !self.stack.is_empty() {
            log::debug!("Closing {} open frames on {}", self.stack.len(), self.page.page);
        }
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::State => self.op("Q"),
                Frame::Layer => self.op("EMC"),
            };
        }
        let page = self.page;
        self.doc.append_content(page, &self.buffer)?;
        Ok(page)
    }
}

fn ser(obj: &Object) -> String {
    ObjectSerializer::compact().serialize_to_string(obj)
}

fn num(value: f64) -> String {
    ser(&Object::Real(value))
}

#[cfg(test)]
mod tests {
    use crate::compliance::{ConformanceLevel, IccProfile, OutputIntent, RuleId};
    use crate::config::DocumentConfig;
    use crate::document::PdfADocument;
    use crate::error::Error;
    use crate::object::Object;
    use crate::page::PageSize;
    use crate::writer::{BlendMode, ExtGStateBuilder};

    fn doc(level: ConformanceLevel, space: &[u8; 4]) -> PdfADocument<Vec<u8>> {
        let intent = OutputIntent::new("Test", IccProfile::synthetic(b"prtr", space, 2));
        let mut doc = PdfADocument::new(Vec::new(), level, Some(intent), DocumentConfig::new()).unwrap();
        doc.add_page(PageSize::A4).unwrap();
        doc
    }

    #[test]
    fn test_operators_appended_on_release() {
        let mut d = doc(ConformanceLevel::A2b, b"RGB ");
        let mut canvas = d.canvas(0).unwrap();
        canvas.save_state().unwrap().set_fill_color_rgb(1.0, 0.0, 0.5).unwrap();
        canvas.rectangle(10.0, 20.0, 100.0, 50.5).fill();
        canvas.restore_state().unwrap();
        canvas.release().unwrap();

        let contents = d.page(0).unwrap().contents;
        let data = d.get_object(contents).unwrap().decode_stream_data().unwrap();
        assert_eq!(data, b"q\n1 0 0.5 rg\n10 20 100 50.5 re\nf\nQ\n".to_vec());
    }

    #[test]
    fn test_stack_depth_limit() {
        let mut d = doc(ConformanceLevel::A2b, b"RGB ");
        let mut canvas = d.canvas(0).unwrap();
        for _ in 0..28 {
            canvas.save_state().unwrap();
        }
        let err = canvas.save_state().unwrap_err();
        assert_eq!(err.rule_id(), Some(RuleId::GraphicsStateStackDepthExceeded));
        assert_eq!(canvas.depth(), 28);
    }

    #[test]
    fn test_restore_underflow() {
        let mut d = doc(ConformanceLevel::A2b, b"RGB ");
        let mut canvas = d.canvas(0).unwrap();
        assert!(matches!(canvas.restore_state(), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_unknown_rendering_intent_rejected() {
        let mut d = doc(ConformanceLevel::A2b, b"RGB ");
        let mut canvas = d.canvas(0).unwrap();
        let err = canvas.set_rendering_intent("Vivid").unwrap_err();
        assert_eq!(err.rule_id(), Some(RuleId::InvalidRenderingIntent));
        assert!(canvas.content().is_empty());
        canvas.set_rendering_intent("Perceptual").unwrap();
        assert_eq!(canvas.content(), b"/Perceptual ri\n");
    }

    #[test]
    fn test_cmyk_refused_under_rgb_intent() {
        let mut d = doc(ConformanceLevel::A2b, b"RGB ");
        let mut canvas = d.canvas(0).unwrap();
        let err = canvas.set_fill_color_cmyk(0.0, 0.0, 0.0, 1.0).unwrap_err();
        assert_eq!(err.rule_id(), Some(RuleId::DeviceColorSpaceMismatch));
        assert!(canvas.set_fill_gray(0.5).is_ok());
    }

    #[test]
    fn test_ext_gstate_resource_reused() {
        let mut d = doc(ConformanceLevel::A2b, b"RGB ");
        let gs = ExtGStateBuilder::new().fill_alpha(0.5).blend_mode(BlendMode::Multiply);
        let mut canvas = d.canvas(0).unwrap();
        canvas.set_ext_gstate(&gs).unwrap();
        canvas.set_ext_gstate(&gs).unwrap();
        assert_eq!(canvas.content(), b"/GS1 gs\n/GS1 gs\n");
        canvas.release().unwrap();

        let page = d.get_object(d.page(0).unwrap().page).unwrap();
        let states = page
            .get("Resources")
            .and_then(|r| r.get("ExtGState"))
            .and_then(Object::as_dict)
            .unwrap();
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn test_transparency_refused_in_part_one() {
        let mut d = doc(ConformanceLevel::A1b, b"RGB ");
        let mut canvas = d.canvas(0).unwrap();
        let err = canvas.set_ext_gstate(&ExtGStateBuilder::new().fill_alpha(0.5)).unwrap_err();
        assert_eq!(err.rule_id(), Some(RuleId::ConstantAlphaShallBeOne));
    }

    #[test]
    fn test_layer_marked_content_and_auto_close() {
        let mut d = doc(ConformanceLevel::A2b, b"RGB ");
        let ocg = d.add_layer("Notes").unwrap();
        let mut canvas = d.canvas(0).unwrap();
        canvas.begin_layer(ocg).unwrap().save_state().unwrap();
        assert!(matches!(canvas.end_layer(), Err(Error::InvalidState(_))));
        canvas.release().unwrap();

        let contents = d.page(0).unwrap().contents;
        let data = d.get_object(contents).unwrap().decode_stream_data().unwrap();
        assert_eq!(data, b"/OC /OC1 BDC\nq\nQ\nEMC\n".to_vec());
    }

    #[test]
    fn test_show_text_requires_font() {
        let mut d = doc(ConformanceLevel::A2b, b"RGB ");
        let mut canvas = d.canvas(0).unwrap();
        assert!(matches!(canvas.show_text(0.0, 0.0, "x"), Err(Error::InvalidState(_))));
    }
}
