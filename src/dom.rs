//! HTML parser – converts template markup into a small, mutable DOM tree.
//!
//! We support the subset used by the document templates:
//! - Structural: div, section, header, footer, p, h1-h3, ul, ol, li, img
//! - Tables: table, thead, tbody, tr, td, th
//! - Inline: span, strong, em, br
//! - Styling via `class` and `style` attributes
//!
//! Full pages are accepted too: doctype, comments, void elements such as
//! `<meta>` and `<link>`, and the raw text of `<script>` / `<style>` are
//! skipped or kept as hidden elements.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

/// The tag name of a supported element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Div,
    Section,
    Header,
    Footer,
    P,
    H1,
    H2,
    H3,
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tr,
    Td,
    Th,
    Span,
    Strong,
    Em,
    Br,
    Img,
    Body,
    Html,
    Head,
    /// Catch-all for unknown tags – kept in the tree but never rendered.
    Unknown(String),
}

impl Tag {
    pub fn from_str(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "div" => Tag::Div,
            "section" => Tag::Section,
            "header" => Tag::Header,
            "footer" => Tag::Footer,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tr" => Tag::Tr,
            "td" => Tag::Td,
            "th" => Tag::Th,
            "span" => Tag::Span,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "br" => Tag::Br,
            "img" => Tag::Img,
            "body" => Tag::Body,
            "html" => Tag::Html,
            "head" => Tag::Head,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lower-case tag name as written in markup.
    pub fn name(&self) -> &str {
        match self {
            Tag::Div => "div",
            Tag::Section => "section",
            Tag::Header => "header",
            Tag::Footer => "footer",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::Thead => "thead",
            Tag::Tbody => "tbody",
            Tag::Tr => "tr",
            Tag::Td => "td",
            Tag::Th => "th",
            Tag::Span => "span",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::Br => "br",
            Tag::Img => "img",
            Tag::Body => "body",
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Unknown(name) => name.as_str(),
        }
    }

    /// Elements that never have children or a closing tag.
    fn is_void(name: &str) -> bool {
        matches!(
            name.to_ascii_lowercase().as_str(),
            "img" | "br" | "hr" | "meta" | "link" | "input" | "base"
        )
    }

    /// Elements whose body is raw text up to the matching close tag.
    fn is_raw_text(name: &str) -> bool {
        matches!(name.to_ascii_lowercase().as_str(), "script" | "style")
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(|s| s.as_str())
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children = vec![DomNode::Text(text.to_string())];
    }

    /// Replace all children with the nodes parsed from `html`.
    pub fn set_inner_html(&mut self, html: &str) {
        self.children = parse_html(html);
    }

    /// Child elements only, skipping text nodes.
    pub fn element_children(&self) -> impl Iterator<Item = &ElementNode> {
        self.children.iter().filter_map(|c| match c {
            DomNode::Element(e) => Some(e),
            DomNode::Text(_) => None,
        })
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser – simple recursive descent over HTML
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of DOM nodes.
///
/// A hand-written parser covers the controlled template subset; unknown
/// markup degrades to hidden elements rather than failing.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_preserve();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_comment();
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Doctype / processing instruction
            self.skip_past('>');
            return None;
        }
        if self.starts_with("<") {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        while !self.eof() && !self.starts_with("<") {
            self.advance(1);
        }
        let text = &self.input[start..self.pos];
        DomNode::Text(decode_entities(text))
    }

    fn parse_element(&mut self) -> DomNode {
        self.advance(1); // '<'
        let tag_name = self.parse_tag_name();
        let mut elem = ElementNode::new(Tag::from_str(&tag_name));

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Stray character inside the tag; step over it.
                self.advance(1);
                continue;
            }
            if !key.is_empty() {
                elem.attributes.insert(key.to_ascii_lowercase(), value);
            }
        }

        if self.starts_with("/>") {
            self.advance(2);
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.advance(1);
        }
        if Tag::is_void(&tag_name) {
            return DomNode::Element(elem);
        }
        if Tag::is_raw_text(&tag_name) {
            self.skip_raw_text(&tag_name);
            return DomNode::Element(elem);
        }

        elem.children = self.parse_nodes();

        // Closing tag
        if self.starts_with("</") {
            self.advance(2);
            self.parse_tag_name();
            self.skip_whitespace();
            if self.starts_with(">") {
                self.advance(1);
            }
        }

        DomNode::Element(elem)
    }

    fn parse_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.advance(1);
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_tag_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.advance(1); // '='
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.advance(1);
                let start = self.pos;
                while !self.eof() && !self.starts_with(quote) {
                    self.advance(1);
                }
                let val = self.input[start..self.pos].to_string();
                if !self.eof() {
                    self.advance(1);
                }
                return decode_entities(&val);
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            self.advance(1);
        }
        self.input[start..self.pos].to_string()
    }

    fn skip_raw_text(&mut self, tag_name: &str) {
        let close = format!("</{}", tag_name.to_ascii_lowercase());
        let rest = self.input[self.pos..].to_ascii_lowercase();
        match rest.find(&close) {
            Some(offset) => {
                self.pos += offset;
                self.skip_past('>');
            }
            None => self.pos = self.input.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.advance(1);
        }
    }

    fn skip_whitespace_preserve(&mut self) {
        // Skip runs of pure whitespace between elements.
        let saved = self.pos;
        self.skip_whitespace();
        // If we reached a tag or EOF, keep the skip. Otherwise revert.
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_comment(&mut self) {
        self.advance(4); // <!--
        while !self.eof() && !self.starts_with("-->") {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(3);
        }
    }

    fn skip_past(&mut self, c: char) {
        while !self.eof() && self.current_char() != c {
            self.advance(1);
        }
        if !self.eof() {
            self.advance(1);
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn advance(&mut self, n: usize) {
        // Advance by `n` characters (not bytes).
        for _ in 0..n {
            if let Some(c) = self.input[self.pos..].chars().next() {
                self.pos += c.len_utf8();
            }
        }
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{00A0}")
        .replace("&mdash;", "\u{2014}")
        .replace("&amp;", "&")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ---------------------------------------------------------------------------
// Lookup & serialisation
// ---------------------------------------------------------------------------

/// Depth-first search for the element whose `id` attribute equals `id`.
pub fn find_by_id<'a>(nodes: &'a [DomNode], id: &str) -> Option<&'a ElementNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.id() == Some(id) {
                return Some(e);
            }
            if let Some(found) = find_by_id(&e.children, id) {
                return Some(found);
            }
        }
    }
    None
}

/// Serialise nodes back to markup. Attributes are written in sorted order so
/// output is stable.
pub fn to_html(nodes: &[DomNode]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(&escape_text(t)),
            DomNode::Element(e) => {
                let name = e.tag.name();
                out.push('<');
                out.push_str(name);
                let mut attrs: Vec<_> = e.attributes.iter().collect();
                attrs.sort();
                for (k, v) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", k, v.replace('"', "&quot;")));
                }
                out.push('>');
                if Tag::is_void(name) {
                    continue;
                }
                write_nodes(&e.children, out);
                out.push_str(&format!("</{}>", name));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_div() {
        let html = r#"<div class="flex p-4"><p>Hello</p></div>"#;
        let nodes = parse_html(html);
        assert_eq!(nodes.len(), 1);
        if let DomNode::Element(e) = &nodes[0] {
            assert_eq!(e.tag, Tag::Div);
            assert_eq!(e.classes(), vec!["flex", "p-4"]);
            assert_eq!(e.children.len(), 1);
        } else {
            panic!("Expected element");
        }
    }

    #[test]
    fn parse_full_page_with_head() {
        let html = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <link rel="stylesheet" href="styles.css">
    <script>if (a < b) { x(); }</script>
</head>
<body>
    <div class="container"><div id="invoice" class="invoice-card"><p>Hi</p></div></div>
    <script src="script.js"></script>
</body>
</html>"#;
        let nodes = parse_html(html);
        let invoice = find_by_id(&nodes, "invoice").expect("container should be found");
        assert!(invoice.has_class("invoice-card"));
        assert_eq!(invoice.text_content(), "Hi");
    }

    #[test]
    fn parse_table_sections() {
        let html = "<table><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table>";
        let nodes = parse_html(html);
        let DomNode::Element(table) = &nodes[0] else {
            panic!("Expected table");
        };
        let tags: Vec<_> = table.element_children().map(|e| e.tag.clone()).collect();
        assert_eq!(tags, vec![Tag::Thead, Tag::Tbody]);
    }

    #[test]
    fn set_inner_html_replaces_children() {
        let mut nodes = parse_html("<tr><td>old</td></tr>");
        let DomNode::Element(row) = &mut nodes[0] else {
            panic!("Expected row");
        };
        row.set_inner_html("<td>a</td><td>b</td>");
        assert_eq!(row.element_children().count(), 2);
        assert_eq!(row.text_content(), "ab");
    }

    #[test]
    fn to_html_is_stable_and_escaped() {
        let nodes = parse_html(r#"<p id="x" class="c">a &amp; b</p><br>"#);
        assert_eq!(
            to_html(&nodes),
            r#"<p class="c" id="x">a &amp; b</p><br>"#
        );
    }
}
