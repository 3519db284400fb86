//! Layout config – the frozen representation between layout computation and
//! PDF rendering. It records exactly what goes on each page and can be dumped
//! as JSON for inspection (`docforge download --layout-json`).

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::style::Edges;

/// A4 width in PDF points (210 mm).
pub const A4_WIDTH_PT: f32 = 595.28;
/// A4 height in PDF points (297 mm).
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Physical page size and printable area, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: Edges,
}

impl PageGeometry {
    pub fn a4_portrait(margin: f32) -> Self {
        Self {
            width: A4_WIDTH_PT,
            height: A4_HEIGHT_PT,
            margin: Edges::all(margin),
        }
    }

    /// Same page turned on its side.
    pub fn landscape(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
            margin: self.margin,
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.width - self.margin.left - self.margin.right).max(1.0)
    }

    pub fn content_height(&self) -> f32 {
        (self.height - self.margin.top - self.margin.bottom).max(1.0)
    }
}

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "LayoutConfig::default_title")]
    pub title: String,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    /// Fill painted under every page before any box.
    #[serde(default)]
    pub page_background: Option<[f32; 4]>,
    pub pages: Vec<PageLayout>,
}

/// One page of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

impl PageLayout {
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            boxes: Vec::new(),
        }
    }
}

/// A positioned rectangle with optional content. Coordinates are relative to
/// the page's top-left corner, in points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,

    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,

    pub children: Vec<LayoutBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<TextLine>,
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 4],
    pub line_height: f32,
    pub underline: bool,
    /// Bullet or number prefix, e.g. "• " or "1. "
    pub list_marker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// Horizontal offset within the box; encodes text alignment.
    pub x_offset: f32,
    /// Offset from the top of the text area.
    pub y_offset: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    /// An empty layout for the given page size.
    pub fn new(title: &str, page: &PageGeometry) -> Self {
        Self {
            title: title.to_string(),
            page_width_pt: page.width,
            page_height_pt: page.height,
            page_background: None,
            pages: Vec::new(),
        }
    }

    fn default_title() -> String {
        "doc-forge output".to_string()
    }

    /// Total number of boxes across all pages, nested ones included.
    pub fn box_count(&self) -> usize {
        fn count(b: &LayoutBox) -> usize {
            1 + b.children.iter().map(count).sum::<usize>()
        }
        self.pages
            .iter()
            .flat_map(|p| p.boxes.iter())
            .map(count)
            .sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }

    /// Lowest y covered by this box or any descendant.
    pub fn max_bottom(&self) -> f32 {
        self.children
            .iter()
            .map(LayoutBox::max_bottom)
            .fold(self.y + self.height, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_content_area() {
        let page = PageGeometry::a4_portrait(14.4);
        assert!((page.content_width() - (A4_WIDTH_PT - 28.8)).abs() < 0.01);
        let turned = page.landscape();
        assert_eq!(turned.width, A4_HEIGHT_PT);
        assert!(turned.content_width() > page.content_width());
    }

    #[test]
    fn json_keeps_pages_and_background() {
        let mut config = LayoutConfig::new("t", &PageGeometry::a4_portrait(40.0));
        config.page_background = Some([1.0, 1.0, 1.0, 1.0]);
        let mut page = PageLayout::new(0);
        let mut outer = LayoutBox::new(0.0, 0.0, 10.0, 10.0);
        outer.children.push(LayoutBox::new(0.0, 5.0, 10.0, 20.0));
        page.boxes.push(outer);
        config.pages.push(page);

        let back = LayoutConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back.pages.len(), 1);
        assert_eq!(back.box_count(), 2);
        assert_eq!(back.page_background, Some([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(back.pages[0].boxes[0].max_bottom(), 25.0);
    }
}
