//! Content stream scanning.
//!
//! The scanner walks operator tokens only far enough to answer the questions
//! the rule engine asks of a content stream: how deep `q` nests, which
//! rendering intents are selected, and which device colour spaces are used.

use super::rules::DeviceColorSpace;
use crate::lexer::{token, Token};

/// What a content stream does that matters for conformance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentSummary {
    /// Deepest `q` nesting reached
    pub max_depth: usize,
    /// `Q` operators without a matching `q`
    pub underflows: usize,
    /// Operands of `ri` operators, in order
    pub rendering_intents: Vec<String>,
    /// Device colour spaces selected, without duplicates
    pub device_colors: Vec<DeviceColorSpace>,
}

impl ContentSummary {
    fn use_color(&mut self, space: DeviceColorSpace) {
        if !self.device_colors.contains(&space) {
            self.device_colors.push(space);
        }
    }
}

/// Scan decoded content stream bytes.
///
/// Unparseable bytes are skipped one at a time; a content stream is never
/// rejected for syntax here.
pub fn scan_content(data: &[u8]) -> ContentSummary {
    let mut summary = ContentSummary::default();
    let mut depth = 0usize;
    let mut last_name: Option<String> = None;
    let mut input = data;

    while !input.is_empty() {
        let (rest, tok) = match token(input) {
            Ok(parsed) => parsed,
            Err(_) => {
                // Trailing whitespace or a stray delimiter
                let skipped = input.iter().position(|c| !c.is_ascii_whitespace()).unwrap_or(input.len());
                input = &input[skipped.max(1).min(input.len())..];
                continue;
            },
        };
        input = rest;

        match tok {
            Token::Name(name) => {
                last_name = Some(name);
                continue;
            },
            Token::Operator(op) => match op {
                b"q" => {
                    depth += 1;
                    summary.max_depth = summary.max_depth.max(depth);
                },
                b"Q" => {
                    if depth == 0 {
                        summary.underflows += 1;
                    } else {
                        depth -= 1;
                    }
                },
                b"ri" => {
                    if let Some(intent) = last_name.take() {
                        summary.rendering_intents.push(intent);
                    }
                },
                b"g" | b"G" => summary.use_color(DeviceColorSpace::Gray),
                b"rg" | b"RG" => summary.use_color(DeviceColorSpace::Rgb),
                b"k" | b"K" => summary.use_color(DeviceColorSpace::Cmyk),
                b"cs" | b"CS" => {
                    match last_name.as_deref() {
                        Some("DeviceGray") => summary.use_color(DeviceColorSpace::Gray),
                        Some("DeviceRGB") => summary.use_color(DeviceColorSpace::Rgb),
                        Some("DeviceCMYK") => summary.use_color(DeviceColorSpace::Cmyk),
                        _ => {},
                    }
                },
                b"ID" => input = skip_inline_image(input),
                _ => {},
            },
            _ => {},
        }
        last_name = None;
    }

    summary
}

/// Skip inline image data up to and including the `EI` operator.
fn skip_inline_image(input: &[u8]) -> &[u8] {
    // One whitespace byte separates ID from the data
    let data = input.get(1..).unwrap_or(&[]);
    let mut i = 0;
    while i + 2 <= data.len() {
        let preceded = i == 0 || data[i - 1].is_ascii_whitespace();
        let followed = data.get(i + 2).map_or(true, |c| c.is_ascii_whitespace());
        if preceded && followed && &data[i..i + 2] == b"EI" {
            return &data[i + 2..];
        }
        i += 1;
    }
    &[]
}
