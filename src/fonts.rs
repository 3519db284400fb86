//! Font metrics and text measurement using `ttf-parser`.
//!
//! Without a loaded face, widths come from a Helvetica-like heuristic so
//! layout stays deterministic. A TTF/OTF can be loaded to measure real glyph
//! advances.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{DocumentError, Result};

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes; empty for the heuristic face.
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    pub line_gap: f32,
}

static HEURISTIC: FontData = FontData {
    bytes: Vec::new(),
    units_per_em: 1000.0,
    ascender: 750.0,
    descender: -250.0,
    line_gap: 0.0,
};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: family.to_string(),
            bold,
            italic,
        }
    }
}

/// Registry of faces keyed by family and variant.
#[derive(Default)]
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    default_key: Option<FontKey>,
}

impl FontManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TTF/OTF face from bytes. The first face loaded becomes the
    /// fallback for unknown keys.
    pub fn load_font(&mut self, family: &str, bold: bool, italic: bool, bytes: Vec<u8>) -> Result<()> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| DocumentError::RenderExport(format!("failed to parse font '{family}': {e}")))?;

        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            line_gap: face.line_gap() as f32,
            bytes,
        };

        let key = FontKey::new(family, bold, italic);
        log::debug!("Loaded font {key:?} ({} units/em)", data.units_per_em);
        self.default_key.get_or_insert_with(|| key.clone());
        self.fonts.insert(key, data);
        Ok(())
    }

    /// Load a font file as the regular face of `family`.
    pub fn load_font_file(&mut self, family: &str, path: &Path) -> Result<()> {
        let bytes = fs::read(path)?;
        self.load_font(family, false, false, bytes)
    }

    /// Face for a key, falling back to the default face, then the heuristic.
    pub fn get(&self, key: &FontKey) -> &FontData {
        self.fonts
            .get(key)
            .or_else(|| self.default_key.as_ref().and_then(|k| self.fonts.get(k)))
            .unwrap_or(&HEURISTIC)
    }

    /// Width of `text` in px at `font_size`.
    pub fn measure_text_width(&self, text: &str, font_size: f32, bold: bool, italic: bool, family: &str) -> f32 {
        let data = self.get(&FontKey::new(family, bold, italic));

        let heuristic = || {
            // Average advance of a proportional face; bold runs wider.
            let avg = if bold { 0.55 } else { 0.5 };
            text.chars().count() as f32 * font_size * avg
        };
        if data.bytes.is_empty() {
            return heuristic();
        }

        match ttf_parser::Face::parse(&data.bytes, 0) {
            Ok(face) => {
                let scale = font_size / data.units_per_em;
                text.chars()
                    .map(|ch| match face.glyph_index(ch) {
                        Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                        None => font_size * 0.5,
                    })
                    .sum()
            }
            Err(_) => heuristic(),
        }
    }

    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// True when the default face carries real glyph data.
    pub fn has_real_fonts(&self) -> bool {
        self.default_key
            .as_ref()
            .and_then(|k| self.fonts.get(k))
            .is_some_and(|d| !d.bytes.is_empty())
    }
}

/// Word-wrap text to fit within `max_width` px. Existing newlines are kept
/// as hard breaks.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    italic: bool,
    family: &str,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            let w = fonts.measure_text_width(&candidate, font_size, bold, italic, family);
            if w > max_width && !current.is_empty() {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_text_width() {
        let mgr = FontManager::default();
        // 5 chars x 16 x 0.5
        let w = mgr.measure_text_width("Hello", 16.0, false, false, "Helvetica");
        assert!((w - 40.0).abs() < 0.1);
        let bold = mgr.measure_text_width("Hello", 16.0, true, false, "Helvetica");
        assert!(bold > w);
        assert!(!mgr.has_real_fonts());
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::default();
        let lines = wrap_text("Hello world foo bar", 16.0, false, false, "Helvetica", 60.0, &mgr);
        assert!(lines.len() >= 2, "Expected wrapping, got {lines:?}");
    }

    #[test]
    fn hard_breaks_survive_wrapping() {
        let mgr = FontManager::default();
        let lines = wrap_text("a\nb", 16.0, false, false, "Helvetica", 500.0, &mgr);
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let mut mgr = FontManager::new();
        assert!(mgr.load_font("Broken", false, false, vec![0, 1, 2, 3]).is_err());
        assert!(mgr.load_font_file("Missing", Path::new("/nonexistent/font.ttf")).is_err());
        assert!(!mgr.has_real_fonts());
    }
}
