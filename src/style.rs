//! Style resolver – maps inline `style` declarations (including the ones a
//! presentation override merges in) and utility classes to a flat
//! [`ComputedStyle`] consumed by the layout engine.
//!
//! Precedence, lowest first: tag defaults, inherited text properties,
//! utility classes, inline declarations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dom::{DomNode, ElementNode, Tag};

/// Root font size used to resolve `rem` lengths.
pub const ROOT_FONT_SIZE: f32 = 16.0;

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    // Display / layout
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex_wrap: FlexWrap,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,
    pub grid_columns: usize,

    // Sizing
    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub max_width: Dimension,

    // Spacing (px)
    pub margin: Edges,
    pub padding: Edges,

    // Border
    pub border_width: f32,
    pub border_color: Color,

    // Typography
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_family: String,
    pub color: Color,
    pub text_align: TextAlign,
    pub line_height: f32,
    pub text_decoration: TextDecoration,
    pub font_style: FontStyle,

    pub background_color: Color,

    // Page break hints
    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

/// Top/right/bottom/left lengths in px.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    pub fn all(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            flex_wrap: FlexWrap::NoWrap,
            flex_grow: 0.0,
            flex_shrink: 1.0,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            grid_columns: 0,
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            max_width: Dimension::Auto,
            margin: Edges::ZERO,
            padding: Edges::ZERO,
            border_width: 0.0,
            border_color: Color::BLACK,
            font_size: ROOT_FONT_SIZE,
            font_weight: FontWeight::Normal,
            font_family: "Helvetica".to_string(),
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.4,
            text_decoration: TextDecoration::None,
            font_style: FontStyle::Normal,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Supporting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Grid,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    TableRowGroup,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexWrap {
    NoWrap,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Auto,
    Px(f32),
    Percent(f32),
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
            a: 1.0,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// `#rgb`, `#rrggbb` or a handful of named colours.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "white" => return Some(Self::WHITE),
            "black" => return Some(Self::BLACK),
            "transparent" => return Some(Self::TRANSPARENT),
            _ => {}
        }
        let hex = value.strip_prefix('#').filter(|h| h.is_ascii())?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self::rgb8(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb8(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            _ => None,
        }
    }
}

/// Utility-class palette (`text-*`, `bg-*`, `border-*`).
const PALETTE: &[(&str, [u8; 3])] = &[
    ("red-500", [239, 68, 68]),
    ("red-700", [185, 28, 28]),
    ("blue-500", [59, 130, 246]),
    ("blue-700", [29, 78, 216]),
    ("blue-900", [26, 54, 93]),
    ("green-500", [34, 197, 94]),
    ("green-700", [21, 128, 61]),
    ("gray-100", [243, 244, 246]),
    ("gray-200", [229, 231, 235]),
    ("gray-300", [209, 213, 219]),
    ("gray-500", [107, 114, 128]),
    ("gray-700", [55, 65, 81]),
    ("gray-900", [17, 24, 39]),
    ("yellow-500", [234, 179, 8]),
    ("white", [255, 255, 255]),
    ("black", [0, 0, 0]),
];

fn palette(name: &str) -> Option<Color> {
    PALETTE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, [r, g, b])| Color::rgb8(*r, *g, *b))
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element, inheriting text properties from its parent.
pub fn resolve_style(element: &ElementNode, parent: Option<&ComputedStyle>) -> ComputedStyle {
    let mut style = base_style_for_tag(&element.tag);

    if let Some(p) = parent {
        // Tag defaults for weight/style (th, strong, em) win over inheritance.
        let tag_bold = style.font_weight == FontWeight::Bold;
        let tag_italic = style.font_style == FontStyle::Italic;
        let tag_font_size = style.font_size;
        style.font_size = if tag_font_size != ROOT_FONT_SIZE {
            tag_font_size
        } else {
            p.font_size
        };
        style.font_weight = if tag_bold { FontWeight::Bold } else { p.font_weight };
        style.font_style = if tag_italic { FontStyle::Italic } else { p.font_style };
        style.font_family = p.font_family.clone();
        style.color = p.color;
        style.text_align = p.text_align;
        style.line_height = p.line_height;
    }

    for class in element.classes() {
        apply_utility_class(&mut style, class);
    }

    if let Some(inline) = element.inline_style() {
        apply_inline_style(&mut style, inline);
    }

    style
}

/// Default styles based on tag semantics.
fn base_style_for_tag(tag: &Tag) -> ComputedStyle {
    let mut s = ComputedStyle::default();
    match tag {
        Tag::H1 => {
            s.font_size = 32.0;
            s.font_weight = FontWeight::Bold;
            s.margin.top = 16.0;
            s.margin.bottom = 12.0;
        }
        Tag::H2 => {
            s.font_size = 24.0;
            s.font_weight = FontWeight::Bold;
            s.margin.top = 14.0;
            s.margin.bottom = 10.0;
        }
        Tag::H3 => {
            s.font_size = 20.0;
            s.font_weight = FontWeight::Bold;
            s.margin.top = 12.0;
            s.margin.bottom = 8.0;
        }
        Tag::P => s.margin.bottom = 10.0,
        Tag::Ul | Tag::Ol => {
            s.margin.bottom = 10.0;
            s.padding.left = 24.0;
        }
        Tag::Li => {
            s.display = Display::ListItem;
            s.margin.bottom = 4.0;
        }
        Tag::Table => s.display = Display::Table,
        Tag::Thead | Tag::Tbody => s.display = Display::TableRowGroup,
        Tag::Tr => s.display = Display::TableRow,
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding = Edges {
                top: 6.0,
                right: 8.0,
                bottom: 6.0,
                left: 8.0,
            };
            s.border_width = 1.0;
            s.border_color = Color::rgb8(209, 213, 219);
            if *tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
            }
        }
        Tag::Span | Tag::Br => s.display = Display::Inline,
        Tag::Strong => {
            s.display = Display::Inline;
            s.font_weight = FontWeight::Bold;
        }
        Tag::Em => {
            s.display = Display::Inline;
            s.font_style = FontStyle::Italic;
        }
        Tag::Img => s.display = Display::InlineBlock,
        Tag::Div | Tag::Section | Tag::Header | Tag::Footer | Tag::Body | Tag::Html => {}
        // Head content, scripts, buttons and anything else unrecognised is
        // not part of the printed document.
        Tag::Head | Tag::Unknown(_) => s.display = Display::None,
    }
    s
}

/// Apply a single utility class.
fn apply_utility_class(s: &mut ComputedStyle, class: &str) {
    match class {
        "flex" => s.display = Display::Flex,
        "grid" => s.display = Display::Grid,
        "block" => s.display = Display::Block,
        "inline" => s.display = Display::Inline,
        "inline-block" => s.display = Display::InlineBlock,
        "hidden" => s.display = Display::None,

        "flex-row" => s.flex_direction = FlexDirection::Row,
        "flex-col" => s.flex_direction = FlexDirection::Column,
        "flex-wrap" => s.flex_wrap = FlexWrap::Wrap,
        "flex-nowrap" => s.flex_wrap = FlexWrap::NoWrap,
        "flex-grow" | "grow" => s.flex_grow = 1.0,
        "flex-shrink" | "shrink" => s.flex_shrink = 1.0,
        "flex-1" => {
            s.flex_grow = 1.0;
            s.flex_shrink = 1.0;
        }

        "justify-start" => s.justify_content = JustifyContent::Start,
        "justify-end" => s.justify_content = JustifyContent::End,
        "justify-center" => s.justify_content = JustifyContent::Center,
        "justify-between" => s.justify_content = JustifyContent::SpaceBetween,
        "justify-around" => s.justify_content = JustifyContent::SpaceAround,
        "justify-evenly" => s.justify_content = JustifyContent::SpaceEvenly,

        "items-start" => s.align_items = AlignItems::Start,
        "items-end" => s.align_items = AlignItems::End,
        "items-center" => s.align_items = AlignItems::Center,
        "items-stretch" => s.align_items = AlignItems::Stretch,

        "font-bold" => s.font_weight = FontWeight::Bold,
        "font-normal" => s.font_weight = FontWeight::Normal,
        "italic" => s.font_style = FontStyle::Italic,
        "not-italic" => s.font_style = FontStyle::Normal,
        "underline" => s.text_decoration = TextDecoration::Underline,
        "no-underline" => s.text_decoration = TextDecoration::None,

        "text-left" => s.text_align = TextAlign::Left,
        "text-center" => s.text_align = TextAlign::Center,
        "text-right" => s.text_align = TextAlign::Right,

        "text-xs" => s.font_size = 12.0,
        "text-sm" => s.font_size = 14.0,
        "text-base" => s.font_size = 16.0,
        "text-lg" => s.font_size = 18.0,
        "text-xl" => s.font_size = 20.0,
        "text-2xl" => s.font_size = 24.0,
        "text-3xl" => s.font_size = 30.0,
        "text-4xl" => s.font_size = 36.0,

        "w-full" => s.width = Dimension::Percent(100.0),
        "w-auto" => s.width = Dimension::Auto,
        "w-1/2" => s.width = Dimension::Percent(50.0),
        "w-1/3" => s.width = Dimension::Percent(33.333),
        "w-2/3" => s.width = Dimension::Percent(66.666),
        "w-1/4" => s.width = Dimension::Percent(25.0),
        "w-3/4" => s.width = Dimension::Percent(75.0),

        "break-before" => s.page_break_before = true,
        "break-after" | "page-break" => s.page_break_after = true,
        "break-inside-avoid" => s.page_break_inside_avoid = true,

        _ => {
            try_spacing_class(s, class);
            try_color_class(s, class);
            try_scaled_class(s, class);
        }
    }
}

/// `p-4`, `mx-2`, `mt-12`, … (1 unit = 4px).
fn try_spacing_class(s: &mut ComputedStyle, class: &str) {
    let Some((prefix, value)) = class.rsplit_once('-') else {
        return;
    };
    let Ok(units) = value.parse::<f32>() else {
        return;
    };
    let v = units * 4.0;
    let (edges, sides) = if let Some(sides) = prefix.strip_prefix('p') {
        (&mut s.padding, sides)
    } else if let Some(sides) = prefix.strip_prefix('m') {
        (&mut s.margin, sides)
    } else {
        return;
    };
    match sides {
        "" => *edges = Edges::all(v),
        "x" => {
            edges.left = v;
            edges.right = v;
        }
        "y" => {
            edges.top = v;
            edges.bottom = v;
        }
        "t" => edges.top = v,
        "r" => edges.right = v,
        "b" => edges.bottom = v,
        "l" => edges.left = v,
        _ => {}
    }
}

fn try_color_class(s: &mut ComputedStyle, class: &str) {
    if let Some(c) = class.strip_prefix("text-").and_then(palette) {
        s.color = c;
    } else if let Some(c) = class.strip_prefix("bg-").and_then(palette) {
        s.background_color = c;
    } else if let Some(c) = class.strip_prefix("border-").and_then(palette) {
        s.border_color = c;
    }
}

/// `gap-*`, `grid-cols-*`, `w-*`, `h-*`.
fn try_scaled_class(s: &mut ComputedStyle, class: &str) {
    if let Some(v) = class.strip_prefix("gap-").and_then(|r| r.parse::<f32>().ok()) {
        s.gap = v * 4.0;
    } else if let Some(n) = class.strip_prefix("grid-cols-").and_then(|r| r.parse::<usize>().ok()) {
        s.grid_columns = n;
    } else if let Some(v) = class.strip_prefix("w-").and_then(|r| r.parse::<f32>().ok()) {
        s.width = Dimension::Px(v * 4.0);
    } else if let Some(v) = class.strip_prefix("h-").and_then(|r| r.parse::<f32>().ok()) {
        s.height = Dimension::Px(v * 4.0);
    }
}

// ---------------------------------------------------------------------------
// Inline style parsing
// ---------------------------------------------------------------------------

/// Apply `prop: value; …` declarations.
pub fn apply_inline_style(s: &mut ComputedStyle, style_str: &str) {
    for decl in style_str.split(';') {
        if let Some((prop, val)) = decl.split_once(':') {
            apply_css_property(s, &prop.trim().to_ascii_lowercase(), val.trim());
        }
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str) {
    let font_size = s.font_size;
    let len = |v: &str| parse_length(v, font_size);
    match prop {
        "display" => {
            s.display = match val {
                "flex" => Display::Flex,
                "grid" => Display::Grid,
                "block" => Display::Block,
                "inline" => Display::Inline,
                "inline-block" => Display::InlineBlock,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val {
                "row" => FlexDirection::Row,
                "column" => FlexDirection::Column,
                _ => s.flex_direction,
            }
        }
        "font-size" => {
            if let Some(px) = len(val) {
                s.font_size = px;
            }
        }
        "font-weight" => {
            s.font_weight = match val {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            }
        }
        "font-style" => {
            s.font_style = if val == "italic" {
                FontStyle::Italic
            } else {
                FontStyle::Normal
            }
        }
        "color" => {
            if let Some(c) = Color::parse(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if let Some(c) = Color::parse(val) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "width" => s.width = parse_dimension(val, font_size),
        "height" => s.height = parse_dimension(val, font_size),
        "margin" => apply_shorthand(val, font_size, &mut s.margin),
        "margin-top" => set_edge(&mut s.margin.top, len(val)),
        "margin-right" => set_edge(&mut s.margin.right, len(val)),
        "margin-bottom" => set_edge(&mut s.margin.bottom, len(val)),
        "margin-left" => set_edge(&mut s.margin.left, len(val)),
        "padding" => apply_shorthand(val, font_size, &mut s.padding),
        "padding-top" => set_edge(&mut s.padding.top, len(val)),
        "padding-right" => set_edge(&mut s.padding.right, len(val)),
        "padding-bottom" => set_edge(&mut s.padding.bottom, len(val)),
        "padding-left" => set_edge(&mut s.padding.left, len(val)),
        "border-width" | "border" => {
            if let Some(px) = val.split_whitespace().find_map(|p| parse_length(p, font_size)) {
                s.border_width = px;
            }
            if let Some(c) = val.split_whitespace().find_map(Color::parse) {
                s.border_color = c;
            }
        }
        "border-color" => {
            if let Some(c) = Color::parse(val) {
                s.border_color = c;
            }
        }
        "line-height" => {
            if let Ok(v) = val.parse::<f32>() {
                s.line_height = v;
            } else if let Some(px) = len(val) {
                s.line_height = px / s.font_size.max(1.0);
            }
        }
        "gap" => {
            if let Some(px) = len(val) {
                s.gap = px;
            }
        }
        "break-before" | "page-break-before" => {
            s.page_break_before = val == "always" || val == "page";
        }
        "break-after" | "page-break-after" => {
            s.page_break_after = val == "always" || val == "page";
        }
        "break-inside" | "page-break-inside" => {
            s.page_break_inside_avoid = val == "avoid";
        }
        _ => {}
    }
}

fn set_edge(slot: &mut f32, value: Option<f32>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Parse a CSS length to px. Supports `px`, `pt`, `rem`, `em` and unitless
/// numbers (treated as px).
pub fn parse_length(s: &str, font_size: f32) -> Option<f32> {
    let s = s.trim();
    let (number, factor) = if let Some(n) = s.strip_suffix("rem") {
        (n, ROOT_FONT_SIZE)
    } else if let Some(n) = s.strip_suffix("em") {
        (n, font_size)
    } else if let Some(n) = s.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = s.strip_suffix("pt") {
        (n, 96.0 / 72.0)
    } else {
        (s, 1.0)
    };
    number.trim().parse::<f32>().ok().map(|v| v * factor)
}

fn parse_dimension(s: &str, font_size: f32) -> Dimension {
    let s = s.trim();
    if s == "auto" {
        Dimension::Auto
    } else if let Some(p) = s.strip_suffix('%') {
        p.parse::<f32>()
            .map(Dimension::Percent)
            .unwrap_or(Dimension::Auto)
    } else {
        parse_length(s, font_size)
            .map(Dimension::Px)
            .unwrap_or(Dimension::Auto)
    }
}

/// CSS 1–4 value shorthand for margin/padding.
fn apply_shorthand(val: &str, font_size: f32, edges: &mut Edges) {
    let parts: Vec<f32> = val
        .split_whitespace()
        .filter_map(|p| parse_length(p, font_size))
        .collect();
    match parts[..] {
        [all] => *edges = Edges::all(all),
        [vertical, horizontal] => {
            *edges = Edges {
                top: vertical,
                right: horizontal,
                bottom: vertical,
                left: horizontal,
            }
        }
        [top, horizontal, bottom] => {
            *edges = Edges {
                top,
                right: horizontal,
                bottom,
                left: horizontal,
            }
        }
        [top, right, bottom, left] => {
            *edges = Edges {
                top,
                right,
                bottom,
                left,
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        /// Original attributes (image src, etc.)
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

/// Build a styled tree from a DOM tree, resolving styles top-down. Elements
/// with `display: none` are dropped along with their subtree.
pub fn build_styled_tree(
    nodes: &[DomNode],
    parent_style: Option<&ComputedStyle>,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, parent_style);
                if style.display == Display::None {
                    continue;
                }
                let children = build_styled_tree(&e.children, Some(&style));
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                // Text renders inline: keep typography, drop the box model.
                let mut style = parent_style.cloned().unwrap_or_default();
                style.display = Display::Inline;
                style.border_width = 0.0;
                style.background_color = Color::TRANSPARENT;
                style.margin = Edges::ZERO;
                style.padding = Edges::ZERO;
                style.width = Dimension::Auto;
                style.height = Dimension::Auto;
                result.push(StyledNode::Text {
                    text: text.clone(),
                    style,
                });
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn element(html: &str) -> ElementNode {
        match parse_html(html).remove(0) {
            DomNode::Element(e) => e,
            DomNode::Text(_) => panic!("expected element"),
        }
    }

    #[test]
    fn utility_padding() {
        let mut s = ComputedStyle::default();
        apply_utility_class(&mut s, "p-4");
        assert_eq!(s.padding, Edges::all(16.0));
        apply_utility_class(&mut s, "px-2");
        assert_eq!(s.padding.left, 8.0);
        assert_eq!(s.padding.top, 16.0);
    }

    #[test]
    fn rem_and_em_lengths() {
        let rem = parse_length("2.2rem", 10.0).unwrap();
        assert!((rem - 35.2).abs() < 0.001);
        assert_eq!(parse_length("1.5em", 10.0), Some(15.0));
        assert_eq!(parse_length("0", 10.0), Some(0.0));
        assert_eq!(parse_length("auto", 10.0), None);
    }

    #[test]
    fn inline_overrides_classes() {
        let e = element(r#"<h1 class="text-4xl mb-2" style="color: #1a365d; font-size: 2.2rem; margin-bottom: 8px">x</h1>"#);
        let s = resolve_style(&e, None);
        assert!((s.font_size - 35.2).abs() < 0.01);
        assert_eq!(s.margin.bottom, 8.0);
        assert_eq!(s.color, Color::rgb8(0x1a, 0x36, 0x5d));
    }

    #[test]
    fn padding_shorthand_two_values() {
        let mut s = ComputedStyle::default();
        apply_inline_style(&mut s, "padding: 10px 8px");
        assert_eq!(s.padding.top, 10.0);
        assert_eq!(s.padding.right, 8.0);
        assert_eq!(s.padding.bottom, 10.0);
    }

    #[test]
    fn hidden_elements_are_dropped() {
        let dom = parse_html("<div><button>Download</button><p>kept</p><script>x</script></div>");
        let styled = build_styled_tree(&dom, None);
        let StyledNode::Element { children, .. } = &styled[0] else {
            panic!("expected element");
        };
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn color_parsing() {
        let c = Color::parse("#ff8800").unwrap();
        assert!((c.r - 1.0).abs() < 0.01);
        assert!((c.g - 0.533).abs() < 0.01);
        assert_eq!(Color::parse("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse("nope"), None);
    }
}
