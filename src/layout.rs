//! Layout engine – uses Taffy to compute flexbox / grid layout from a styled
//! DOM tree, then converts the result into a tree of positioned boxes.

use std::collections::HashMap;
use taffy::prelude::*;

use crate::dom::Tag;
use crate::error::{DocumentError, Result};
use crate::fonts::{wrap_text, FontManager};
use crate::layout_config::PageGeometry;
use crate::style::{self, ComputedStyle, Edges, FontStyle as CssFontStyle, FontWeight, StyledNode};

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
    /// Rows of a table. Only these may be split between pages, and only when
    /// the break policy allows it.
    pub is_table: bool,
}

impl PositionedBox {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text { text: String, lines: Vec<String> },
    Image { src: String },
    ListItem { marker: String },
}

fn layout_error(e: taffy::TaffyError) -> DocumentError {
    DocumentError::RenderExport(format!("layout failed: {e}"))
}

fn edges_to_rect(e: &Edges) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(e.top),
        right: LengthPercentage::Length(e.right),
        bottom: LengthPercentage::Length(e.bottom),
        left: LengthPercentage::Length(e.left),
    }
}

fn edges_to_auto_rect(e: &Edges) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(e.top),
        right: LengthPercentageAuto::Length(e.right),
        bottom: LengthPercentageAuto::Length(e.bottom),
        left: LengthPercentageAuto::Length(e.left),
    }
}

fn dim_to_taffy(d: style::Dimension) -> taffy::Dimension {
    match d {
        style::Dimension::Auto => taffy::Dimension::Auto,
        style::Dimension::Px(v) => taffy::Dimension::Length(v),
        style::Dimension::Percent(v) => taffy::Dimension::Percent(v / 100.0),
    }
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
    tables: Vec<NodeId>,
    available_width: f32,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager, available_width: f32) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
            tables: Vec::new(),
            available_width,
        }
    }

    /// Text of an inline subtree; `<br>` becomes a hard line break.
    fn collect_inline_text(node: &StyledNode) -> String {
        match node {
            StyledNode::Text { text, .. } => text.clone(),
            StyledNode::Element { tag: Tag::Br, .. } => "\n".to_string(),
            StyledNode::Element { children, .. } => {
                children.iter().map(Self::collect_inline_text).collect()
            }
        }
    }

    fn all_inline(children: &[StyledNode]) -> bool {
        children.iter().all(|c| match c {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                style,
                children: gc,
                ..
            } => {
                matches!(
                    style.display,
                    style::Display::Inline | style::Display::InlineBlock
                ) && Self::all_inline(gc)
            }
        })
    }

    fn build_node(&mut self, styled: &StyledNode, parent_width: f32) -> Result<NodeId> {
        match styled {
            StyledNode::Text { text, style } => self.build_text_node(text, style, parent_width),
            StyledNode::Element {
                tag,
                style,
                children,
                attrs,
            } => self.build_element_node(tag, style, children, attrs, parent_width),
        }
    }

    /// A merged paragraph keeps its block's margin, padding and background.
    fn build_paragraph(&mut self, text: &str, block: &ComputedStyle, parent_width: f32) -> Result<NodeId> {
        let inner = parent_width - block.padding.horizontal() - block.margin.horizontal();
        let node = self.build_text_node(text, block, inner)?;
        let current = self.taffy.style(node).map_err(layout_error)?.clone();
        let padded = Style {
            margin: edges_to_auto_rect(&block.margin),
            padding: edges_to_rect(&block.padding),
            size: Size {
                width: if block.text_align == style::TextAlign::Left {
                    current.size.width
                } else {
                    taffy::Dimension::Percent(1.0)
                },
                height: taffy::Dimension::Auto,
            },
            min_size: Size {
                width: taffy::Dimension::Auto,
                height: current.size.height,
            },
            ..current
        };
        self.taffy.set_style(node, padded).map_err(layout_error)?;
        Ok(node)
    }

    fn build_text_node(&mut self, text: &str, style: &ComputedStyle, parent_width: f32) -> Result<NodeId> {
        let bold = style.font_weight == FontWeight::Bold;
        let italic = style.font_style == CssFontStyle::Italic;
        let family = &style.font_family;
        let font_size = style.font_size;
        let line_height_px = self.fonts.line_height_px(font_size, style.line_height);

        let max_w = if parent_width > 0.0 {
            parent_width
        } else {
            self.available_width
        };
        let lines = wrap_text(text.trim(), font_size, bold, italic, family, max_w, self.fonts);

        let text_width = lines
            .iter()
            .map(|l| self.fonts.measure_text_width(l, font_size, bold, italic, family))
            .fold(0.0f32, f32::max);
        let text_height = lines.len() as f32 * line_height_px;

        let taffy_style = Style {
            size: Size {
                width: taffy::Dimension::Length(text_width),
                height: taffy::Dimension::Length(text_height),
            },
            flex_shrink: 0.0,
            ..Default::default()
        };

        let node = self.taffy.new_leaf(taffy_style).map_err(layout_error)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(
            node,
            BoxContent::Text {
                text: text.trim().to_string(),
                lines,
            },
        );
        Ok(node)
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        attrs: &HashMap<String, String>,
        parent_width: f32,
    ) -> Result<NodeId> {
        // Headings and paragraphs with only inline content flow as one text run.
        let is_paragraph = matches!(tag, Tag::P | Tag::H1 | Tag::H2 | Tag::H3);
        if is_paragraph && !children.is_empty() && Self::all_inline(children) {
            let raw: String = children.iter().map(Self::collect_inline_text).collect();
            let combined = raw
                .split('\n')
                .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
                .collect::<Vec<_>>()
                .join("\n");
            if !combined.trim().is_empty() {
                return self.build_paragraph(&combined, style, parent_width);
            }
        }

        let my_width = match style.width {
            style::Dimension::Px(w) => w,
            style::Dimension::Percent(p) => parent_width * p / 100.0,
            style::Dimension::Auto => parent_width - style.margin.horizontal(),
        };
        let inner_width = my_width - style.padding.horizontal() - 2.0 * style.border_width;

        // Flex rows and table rows share their width between children, so
        // text is wrapped to the column width at build time.
        let is_flex_row = style.display == style::Display::Flex
            && style.flex_direction == style::FlexDirection::Row;
        let is_table_row = *tag == Tag::Tr;

        let elem_child_count = children
            .iter()
            .filter(|c| matches!(c, StyledNode::Element { .. }))
            .count()
            .max(1);

        let child_build_width = if is_flex_row || is_table_row {
            let gap_total = style.gap * elem_child_count.saturating_sub(1) as f32;
            ((inner_width - gap_total) / elem_child_count as f32).max(1.0)
        } else {
            inner_width
        };

        let mut child_nodes = Vec::new();
        let mut list_counter = 0u32;

        for child in children {
            let li_marker = match child {
                StyledNode::Element { tag: Tag::Li, .. } => {
                    list_counter += 1;
                    Some(if *tag == Tag::Ol {
                        format!("{list_counter}. ")
                    } else {
                        "\u{2022} ".to_string()
                    })
                }
                _ => None,
            };

            let child_id = self.build_node(child, child_build_width)?;
            if let Some(marker) = li_marker {
                self.node_content.insert(child_id, BoxContent::ListItem { marker });
            }
            child_nodes.push(child_id);
        }

        // An <img> with an auto dimension takes its size from the decoded
        // data URI; otherwise Taffy computes it as 0x0.
        let style_override = if *tag == Tag::Img
            && (style.width == style::Dimension::Auto || style.height == style::Dimension::Auto)
        {
            let src = attrs.get("src").map(String::as_str).unwrap_or("");
            resolve_img_auto_dimensions(src, style, parent_width)
        } else {
            None
        };

        let effective_style = style_override.as_ref().unwrap_or(style);
        let taffy_style = computed_to_taffy(effective_style, tag);
        let node = self
            .taffy
            .new_with_children(taffy_style, &child_nodes)
            .map_err(layout_error)?;
        self.node_styles.insert(node, effective_style.clone());

        if *tag == Tag::Img {
            let src = attrs.get("src").cloned().unwrap_or_default();
            self.node_content.insert(node, BoxContent::Image { src });
        }
        if *tag == Tag::Table {
            self.tables.push(node);
        }

        Ok(node)
    }

    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> Result<PositionedBox> {
        let layout = self.taffy.layout(node).map_err(layout_error)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)
            .map_err(layout_error)?
            .iter()
            .map(|&child| self.extract(child, x, y))
            .collect::<Result<Vec<_>>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            is_table: self.tables.contains(&node),
            style,
            content,
            children,
        })
    }
}

/// HTML table parts always lay out as flex boxes; everything else follows
/// its computed display.
fn computed_to_taffy(s: &ComputedStyle, tag: &Tag) -> Style {
    let mut ts = Style::default();

    match tag {
        Tag::Table | Tag::Thead | Tag::Tbody => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Column;
            ts.size.width = if *tag == Tag::Table {
                dim_to_taffy(s.width)
            } else {
                taffy::Dimension::Percent(1.0)
            };
            ts.size.height = dim_to_taffy(s.height);
            ts.min_size.width = taffy::Dimension::Length(0.0);
            ts.padding = edges_to_rect(&s.padding);
            ts.margin = edges_to_auto_rect(&s.margin);
            return ts;
        }
        Tag::Tr => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Row;
            ts.align_items = Some(taffy::AlignItems::Stretch);
            ts.size.width = taffy::Dimension::Percent(1.0);
            ts.min_size.width = taffy::Dimension::Length(0.0);
            ts.margin = edges_to_auto_rect(&s.margin);
            return ts;
        }
        Tag::Td | Tag::Th => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Column;
            ts.flex_grow = 1.0;
            ts.flex_shrink = 1.0;
            // Equal columns.
            ts.flex_basis = taffy::Dimension::Length(0.0);
            ts.min_size.width = taffy::Dimension::Length(0.0);
            ts.align_items = Some(match s.text_align {
                style::TextAlign::Left => taffy::AlignItems::Start,
                style::TextAlign::Center => taffy::AlignItems::Center,
                style::TextAlign::Right => taffy::AlignItems::End,
            });
            ts.padding = edges_to_rect(&s.padding);
            ts.border = edges_to_rect(&Edges::all(s.border_width));
            return ts;
        }
        _ => {}
    }

    match s.display {
        style::Display::Flex => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = match s.flex_direction {
                style::FlexDirection::Row => taffy::FlexDirection::Row,
                style::FlexDirection::Column => taffy::FlexDirection::Column,
            };
            ts.flex_wrap = match s.flex_wrap {
                style::FlexWrap::NoWrap => taffy::FlexWrap::NoWrap,
                style::FlexWrap::Wrap => taffy::FlexWrap::Wrap,
            };
            ts.justify_content = Some(match s.justify_content {
                style::JustifyContent::Start => taffy::JustifyContent::Start,
                style::JustifyContent::End => taffy::JustifyContent::End,
                style::JustifyContent::Center => taffy::JustifyContent::Center,
                style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
                style::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
                style::JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
            });
            ts.align_items = Some(match s.align_items {
                style::AlignItems::Start => taffy::AlignItems::Start,
                style::AlignItems::End => taffy::AlignItems::End,
                style::AlignItems::Center => taffy::AlignItems::Center,
                style::AlignItems::Stretch => taffy::AlignItems::Stretch,
            });
        }
        style::Display::Grid => {
            ts.display = taffy::Display::Grid;
            ts.grid_template_columns =
                vec![taffy::TrackSizingFunction::from_flex(1.0); s.grid_columns.max(1)];
        }
        style::Display::Inline => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Row;
            ts.flex_wrap = taffy::FlexWrap::Wrap;
        }
        style::Display::None => ts.display = taffy::Display::None,
        // Block-level boxes stack vertically.
        _ => {
            ts.display = taffy::Display::Flex;
            ts.flex_direction = taffy::FlexDirection::Column;
            ts.align_items = Some(match s.text_align {
                style::TextAlign::Right => taffy::AlignItems::End,
                style::TextAlign::Center => taffy::AlignItems::Center,
                style::TextAlign::Left => taffy::AlignItems::Stretch,
            });
        }
    }

    ts.size = Size {
        width: dim_to_taffy(s.width),
        height: dim_to_taffy(s.height),
    };
    ts.min_size = Size {
        width: if s.flex_shrink > 0.0 || s.flex_grow > 0.0 {
            taffy::Dimension::Length(0.0)
        } else {
            dim_to_taffy(s.min_width)
        },
        height: taffy::Dimension::Auto,
    };
    ts.max_size = Size {
        width: dim_to_taffy(s.max_width),
        height: taffy::Dimension::Auto,
    };
    ts.flex_grow = s.flex_grow;
    ts.flex_shrink = s.flex_shrink;
    ts.margin = edges_to_auto_rect(&s.margin);
    ts.padding = edges_to_rect(&s.padding);
    ts.border = edges_to_rect(&Edges::all(s.border_width));
    ts.gap = Size {
        width: LengthPercentage::Length(s.gap),
        height: LengthPercentage::Length(s.gap),
    };
    ts
}

/// For an `<img>` carrying a base64 data URI, replace `Auto` width/height
/// with values derived from the image's intrinsic size.
fn resolve_img_auto_dimensions(
    src: &str,
    style: &ComputedStyle,
    parent_width: f32,
) -> Option<ComputedStyle> {
    let bytes = crate::render::parse_data_uri(src).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    let (px_w, px_h) = (img.width() as f32, img.height() as f32);
    if px_w == 0.0 || px_h == 0.0 {
        return None;
    }
    let aspect = px_w / px_h;

    let known_w = match style.width {
        style::Dimension::Px(v) => Some(v),
        style::Dimension::Percent(p) => Some(parent_width * p / 100.0),
        style::Dimension::Auto => None,
    };
    let known_h = match style.height {
        style::Dimension::Px(v) => Some(v),
        _ => None,
    };

    let mut s = style.clone();
    match (known_w, known_h) {
        (Some(w), None) => s.height = style::Dimension::Px((w / aspect).max(1.0)),
        (None, Some(h)) => s.width = style::Dimension::Px((h * aspect).max(1.0)),
        // 1 px = 1 pt.
        (None, None) => {
            s.width = style::Dimension::Px(px_w.min(parent_width));
            s.height = style::Dimension::Px(px_w.min(parent_width) / aspect);
        }
        (Some(_), Some(_)) => return None,
    }
    Some(s)
}

/// Lay out a styled tree inside the printable area of `page`. Returned boxes
/// are in document coordinates: x is page-absolute, y starts at 0.
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    page: &PageGeometry,
    fonts: &FontManager,
) -> Result<Vec<PositionedBox>> {
    let content_width = page.content_width();
    let mut builder = LayoutBuilder::new(fonts, content_width);

    let child_ids = styled_nodes
        .iter()
        .map(|node| builder.build_node(node, content_width))
        .collect::<Result<Vec<_>>>()?;

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        size: Size {
            width: taffy::Dimension::Length(content_width),
            height: taffy::Dimension::Auto,
        },
        ..Default::default()
    };

    let root = builder
        .taffy
        .new_with_children(root_style, &child_ids)
        .map_err(layout_error)?;

    builder
        .taffy
        .compute_layout(
            root,
            Size {
                width: AvailableSpace::Definite(content_width),
                height: AvailableSpace::MaxContent,
            },
        )
        .map_err(layout_error)?;

    let root_box = builder.extract(root, page.margin.left, 0.0)?;
    log::debug!(
        "Layout: {} top-level box(es), document height {:.1}pt",
        root_box.children.len(),
        root_box.height
    );
    Ok(root_box.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::style::build_styled_tree;

    fn layout(html: &str) -> Vec<PositionedBox> {
        let styled = build_styled_tree(&parse_html(html), None);
        compute_layout(&styled, &PageGeometry::a4_portrait(40.0), &FontManager::default()).unwrap()
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>");
        assert!(!boxes.is_empty(), "Should produce at least one box");
        assert!(boxes[0].width > 0.0);
        assert!(boxes[0].height > 0.0);
        assert!((boxes[0].x - 40.0).abs() < 0.01, "x starts at the left margin");
    }

    #[test]
    fn layout_flex_row_shares_width() {
        let boxes = layout(
            r#"<div class="flex"><div class="flex-1">A</div><div class="flex-1">B</div></div>"#,
        );
        let row = &boxes[0];
        assert_eq!(row.children.len(), 2);
        assert!((row.children[0].width - row.children[1].width).abs() < 0.5);
        assert!(row.children[1].x > row.children[0].x);
    }

    #[test]
    fn table_sections_span_full_width() {
        let boxes = layout(
            "<table class=\"w-full\"><thead><tr><th>A</th><th>B</th></tr></thead>\
             <tbody><tr><td>1</td><td>2</td></tr></tbody></table>",
        );
        let table = &boxes[0];
        assert!(table.is_table);
        assert_eq!(table.children.len(), 2);
        for section in &table.children {
            assert!((section.width - table.width).abs() < 0.5);
        }
        assert!(table.children[1].y > table.children[0].y);
    }

    #[test]
    fn br_breaks_paragraph_lines() {
        let boxes = layout("<p>first<br>second</p>");
        match &boxes[0].content {
            BoxContent::Text { lines, .. } => assert_eq!(lines, &["first", "second"]),
            other => panic!("expected text, got {other:?}"),
        }
    }
}
