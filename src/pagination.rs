//! Pagination – splits positioned boxes into pages.
//!
//! Handles:
//! - page boundaries inside configurable margins
//! - page-break-before / page-break-after hints
//! - the break mode: `avoid-all` moves any box that would cross a boundary
//!   to the next page whole, `css` additionally lets tables split by row
//!   unless they ask not to be

use serde::{Deserialize, Serialize};

use crate::fonts::FontManager;
use crate::layout::{BoxContent, PositionedBox};
use crate::layout_config::*;
use crate::style;

/// How boxes are kept together at page boundaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BreakMode {
    /// Never split a box or a table; move it to the next page instead.
    #[default]
    AvoidAll,
    /// Honour CSS hints only; tables may split between rows.
    Css,
}

/// A container taller than a page cannot be kept whole under any mode, so
/// its children paginate individually.
fn flatten_for_pagination(boxes: &[PositionedBox], content_height: f32) -> Vec<&PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height
            && matches!(pbox.content, BoxContent::None)
            && !pbox.children.is_empty()
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

/// Rows of a table, looking through `thead`/`tbody` groups.
fn table_rows(table: &PositionedBox) -> Vec<&PositionedBox> {
    table
        .children
        .iter()
        .flat_map(|child| {
            if child.style.display == style::Display::TableRowGroup {
                child.children.iter().collect::<Vec<_>>()
            } else {
                vec![child]
            }
        })
        .collect()
}

struct Paginator<'a> {
    config: LayoutConfig,
    current: PageLayout,
    /// Document-space y at which the current page begins.
    page_start: f32,
    page: &'a PageGeometry,
    fonts: &'a FontManager,
}

impl<'a> Paginator<'a> {
    fn new_page(&mut self, start: f32) {
        let next = PageLayout::new(self.config.pages.len() + 1);
        let done = std::mem::replace(&mut self.current, next);
        self.config.pages.push(done);
        self.page_start = start;
    }

    fn overflows(&self, pbox: &PositionedBox) -> bool {
        let y_on_page = (pbox.y - self.page_start).max(0.0);
        y_on_page + pbox.height > self.page.content_height() && !self.current.boxes.is_empty()
    }

    fn place(&mut self, pbox: &PositionedBox) {
        let y_on_page = (pbox.y - self.page_start).max(0.0);
        let abs_y = self.page.margin.top + y_on_page;
        let lb = build_layout_box(pbox, pbox.x, abs_y, self.fonts);
        self.current.boxes.push(lb);
    }

    fn finish(mut self) -> LayoutConfig {
        if !self.current.boxes.is_empty() || self.config.pages.is_empty() {
            self.config.pages.push(self.current);
        }
        self.config
    }
}

/// Convert positioned boxes into a paginated [`LayoutConfig`].
pub fn paginate(
    boxes: &[PositionedBox],
    page: &PageGeometry,
    mode: BreakMode,
    fonts: &FontManager,
) -> LayoutConfig {
    let mut p = Paginator {
        config: LayoutConfig::new("doc-forge output", page),
        current: PageLayout::new(0),
        page_start: 0.0,
        page,
        fonts,
    };

    for pbox in flatten_for_pagination(boxes, page.content_height()) {
        if pbox.style.page_break_before && !p.current.boxes.is_empty() {
            p.new_page(pbox.y);
        }

        if p.overflows(pbox) {
            let splittable =
                mode == BreakMode::Css && pbox.is_table && !pbox.style.page_break_inside_avoid;
            if splittable {
                for row in table_rows(pbox) {
                    if p.overflows(row) {
                        p.new_page(row.y);
                    }
                    p.place(row);
                }
                continue;
            }
            p.new_page(pbox.y);
        }

        p.place(pbox);

        if pbox.style.page_break_after {
            p.new_page(pbox.bottom());
        }
    }

    let config = p.finish();
    log::debug!("Paginated into {} page(s) ({mode:?})", config.pages.len());
    config
}

/// Build a LayoutBox tree with page-absolute coordinates. Children keep
/// their offset from the parent: `child_abs_y = parent_abs_y + (child.y - parent.y)`.
fn build_layout_box(pbox: &PositionedBox, abs_x: f32, abs_y: f32, fonts: &FontManager) -> LayoutBox {
    let mut lb = LayoutBox::new(abs_x, abs_y, pbox.width, pbox.height);
    let s = &pbox.style;

    if !s.background_color.is_transparent() {
        lb.background_color = Some(s.background_color.to_array());
    }

    if s.border_width > 0.5 {
        lb.border = Some(BorderStyle {
            width: s.border_width,
            color: s.border_color.to_array(),
        });
    }

    let bold = s.font_weight == style::FontWeight::Bold;
    let italic = s.font_style == style::FontStyle::Italic;
    let line_height = fonts.line_height_px(s.font_size, s.line_height);

    match &pbox.content {
        BoxContent::Text { lines, .. } => {
            let avail = (pbox.width - s.padding.horizontal()).max(0.0);
            let text_lines = lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    let line_w = fonts.measure_text_width(line, s.font_size, bold, italic, &s.font_family);
                    let align_offset = match s.text_align {
                        style::TextAlign::Left => 0.0,
                        style::TextAlign::Center => ((avail - line_w) / 2.0).max(0.0),
                        style::TextAlign::Right => (avail - line_w).max(0.0),
                    };
                    TextLine {
                        text: line.clone(),
                        x_offset: s.padding.left + align_offset,
                        y_offset: s.padding.top + i as f32 * line_height,
                    }
                })
                .collect();

            lb.text = Some(TextContent {
                lines: text_lines,
                font_family: s.font_family.clone(),
                font_size: s.font_size,
                bold,
                italic,
                color: s.color.to_array(),
                line_height,
                underline: s.text_decoration == style::TextDecoration::Underline,
                list_marker: None,
            });
        }
        BoxContent::Image { src } => {
            lb.image = Some(ImageContent {
                src: src.clone(),
                width: pbox.width,
                height: pbox.height,
            });
        }
        BoxContent::ListItem { marker } => {
            // The marker sits in the gutter; the item's text comes from its children.
            lb.text = Some(TextContent {
                lines: Vec::new(),
                font_family: s.font_family.clone(),
                font_size: s.font_size,
                bold,
                italic: false,
                color: s.color.to_array(),
                line_height,
                underline: false,
                list_marker: Some(marker.clone()),
            });
        }
        BoxContent::None => {}
    }

    for child in &pbox.children {
        let child_abs_y = abs_y + (child.y - pbox.y);
        lb.children.push(build_layout_box(child, child.x, child_abs_y, fonts));
    }

    lb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::layout::compute_layout;
    use crate::style::build_styled_tree;

    fn paginate_html(html: &str, page: &PageGeometry, mode: BreakMode) -> LayoutConfig {
        let styled = build_styled_tree(&parse_html(html), None);
        let fonts = FontManager::default();
        let boxes = compute_layout(&styled, page, &fonts).unwrap();
        paginate(&boxes, page, mode, &fonts)
    }

    fn paragraphs(n: usize) -> String {
        (0..n)
            .map(|i| format!("<p>Paragraph {i} with some text</p>"))
            .collect()
    }

    #[test]
    fn single_page() {
        let config = paginate_html("<p>Short text</p>", &PageGeometry::a4_portrait(40.0), BreakMode::AvoidAll);
        assert_eq!(config.pages.len(), 1);
    }

    #[test]
    fn multiple_pages() {
        let config = paginate_html(&paragraphs(60), &PageGeometry::a4_portrait(40.0), BreakMode::AvoidAll);
        assert!(config.pages.len() > 1, "got {} page(s)", config.pages.len());
        for page in &config.pages {
            for b in &page.boxes {
                assert!(b.y >= 40.0);
                assert!(b.y + b.height <= A4_HEIGHT_PT - 40.0 + 0.01);
            }
        }
    }

    #[test]
    fn top_margin_offsets_first_box() {
        let page = PageGeometry::a4_portrait(14.4);
        let config = paginate_html("<p>x</p>", &page, BreakMode::AvoidAll);
        let first = &config.pages[0].boxes[0];
        assert!((first.y - 14.4).abs() < 0.01);
        assert!((first.x - 14.4).abs() < 0.01);
    }

    #[test]
    fn avoid_all_moves_table_whole_css_splits_rows() {
        let rows: String = (0..10)
            .map(|i| format!("<tr><td>Row {i}</td><td>{i}</td></tr>"))
            .collect();
        let html = format!(
            "{}<table><thead><tr><th>A</th><th>B</th></tr></thead><tbody>{rows}</tbody></table>",
            paragraphs(20)
        );
        let page = PageGeometry::a4_portrait(40.0);

        let avoid = paginate_html(&html, &page, BreakMode::AvoidAll);
        assert_eq!(avoid.pages.len(), 2);
        assert_eq!(avoid.pages[0].boxes.len(), 20);
        assert_eq!(avoid.pages[1].boxes.len(), 1, "table kept in one piece");

        let css = paginate_html(&html, &page, BreakMode::Css);
        assert!(css.pages[0].boxes.len() > 20, "some rows stay on the first page");
    }

    #[test]
    fn right_aligned_text_is_offset() {
        let config = paginate_html(
            r#"<p class="text-right">INVOICE</p>"#,
            &PageGeometry::a4_portrait(40.0),
            BreakMode::AvoidAll,
        );
        let text = config.pages[0].boxes[0].text.as_ref().unwrap();
        assert!(text.lines[0].x_offset > 100.0);
    }
}
