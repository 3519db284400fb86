//! Minimal CSS selector engine used to address template placeholders and
//! presentation overrides.
//!
//! Supported grammar: comma-separated lists of compound selectors joined by
//! descendant (whitespace) or child (`>`) combinators. A compound selector is
//! an optional tag name followed by any number of `#id`, `.class`,
//! `:nth-child(n)` and `:first-child` parts.

use crate::dom::{DomNode, ElementNode};
use crate::error::{DocumentError, Result};

/// A parsed selector list, e.g. `.items-table th, .items-table td`.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    /// Compounds left to right; `combinators[i]` joins `compounds[i]` and
    /// `compounds[i + 1]`.
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    nth_child: Option<usize>,
}

/// Index path from the root node list down to an element.
pub type NodePath = Vec<usize>;

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        let alternatives = input
            .split(',')
            .map(|part| parse_complex(part.trim()).map_err(|reason| invalid(input, &reason)))
            .collect::<Result<Vec<_>>>()?;
        if alternatives.is_empty() {
            return Err(invalid(input, "empty selector"));
        }
        Ok(Self { alternatives })
    }

    /// Paths of all matching elements, in document order.
    pub fn select_paths(&self, nodes: &[DomNode]) -> Vec<NodePath> {
        let mut out = Vec::new();
        let mut chain = Vec::new();
        let mut path = Vec::new();
        self.walk(nodes, &mut chain, &mut path, &mut out);
        out
    }

    /// Number of matching elements.
    pub fn count(&self, nodes: &[DomNode]) -> usize {
        self.select_paths(nodes).len()
    }

    /// First matching element, if any.
    pub fn first<'a>(&self, nodes: &'a [DomNode]) -> Option<&'a ElementNode> {
        let path = self.select_paths(nodes).into_iter().next()?;
        element_at(nodes, &path)
    }

    /// Apply `f` to every matching element. Returns the number visited.
    pub fn for_each_mut(&self, nodes: &mut [DomNode], mut f: impl FnMut(&mut ElementNode)) -> usize {
        let paths = self.select_paths(nodes);
        let mut visited = 0;
        for path in &paths {
            if let Some(e) = element_at_mut(nodes, path) {
                f(e);
                visited += 1;
            }
        }
        visited
    }

    /// Apply `f` to the first matching element only.
    pub fn first_mut<'a>(&self, nodes: &'a mut [DomNode]) -> Option<&'a mut ElementNode> {
        let path = self.select_paths(nodes).into_iter().next()?;
        element_at_mut(nodes, &path)
    }

    fn walk<'a>(
        &self,
        nodes: &'a [DomNode],
        chain: &mut Vec<(&'a ElementNode, usize)>,
        path: &mut NodePath,
        out: &mut Vec<NodePath>,
    ) {
        let mut position = 0;
        for (i, node) in nodes.iter().enumerate() {
            let DomNode::Element(e) = node else {
                continue;
            };
            position += 1;
            chain.push((e, position));
            path.push(i);
            if self.alternatives.iter().any(|c| c.matches(chain)) {
                out.push(path.clone());
            }
            self.walk(&e.children, chain, path, out);
            path.pop();
            chain.pop();
        }
    }
}

impl Complex {
    fn matches(&self, chain: &[(&ElementNode, usize)]) -> bool {
        let Some(last) = self.compounds.len().checked_sub(1) else {
            return false;
        };
        let Some(&(elem, pos)) = chain.last() else {
            return false;
        };
        if !self.compounds[last].matches(elem, pos) {
            return false;
        }
        self.match_left(last, &chain[..chain.len() - 1])
    }

    /// `ancestors` are the elements above the one matched by `compounds[k]`.
    fn match_left(&self, k: usize, ancestors: &[(&ElementNode, usize)]) -> bool {
        if k == 0 {
            return true;
        }
        let compound = &self.compounds[k - 1];
        match self.combinators[k - 1] {
            Combinator::Child => match ancestors.last() {
                Some(&(e, pos)) if compound.matches(e, pos) => {
                    self.match_left(k - 1, &ancestors[..ancestors.len() - 1])
                }
                _ => false,
            },
            Combinator::Descendant => (0..ancestors.len()).rev().any(|i| {
                let (e, pos) = ancestors[i];
                compound.matches(e, pos) && self.match_left(k - 1, &ancestors[..i])
            }),
        }
    }
}

impl Compound {
    fn matches(&self, e: &ElementNode, position: usize) -> bool {
        if let Some(tag) = &self.tag {
            if !e.tag.name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if e.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| e.has_class(c)) {
            return false;
        }
        match self.nth_child {
            Some(n) => n == position,
            None => true,
        }
    }
}

fn invalid(selector: &str, reason: &str) -> DocumentError {
    DocumentError::InvalidSelector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_complex(input: &str) -> std::result::Result<Complex, String> {
    if input.is_empty() {
        return Err("empty selector".to_string());
    }
    // Normalise `a>b` to `a > b` so whitespace splitting sees the combinator.
    let spaced = input.replace('>', " > ");
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut pending = Combinator::Descendant;

    for token in spaced.split_whitespace() {
        if token == ">" {
            if compounds.is_empty() {
                return Err("leading `>` combinator".to_string());
            }
            pending = Combinator::Child;
            continue;
        }
        if !compounds.is_empty() {
            combinators.push(pending);
        }
        compounds.push(parse_compound(token)?);
        pending = Combinator::Descendant;
    }
    if pending == Combinator::Child {
        return Err("trailing `>` combinator".to_string());
    }
    Ok(Complex {
        compounds,
        combinators,
    })
}

fn parse_compound(token: &str) -> std::result::Result<Compound, String> {
    let mut compound = Compound::default();
    let mut rest = token;

    let tag_len = rest
        .find(|c: char| c == '.' || c == '#' || c == ':')
        .unwrap_or(rest.len());
    if tag_len > 0 {
        let tag = &rest[..tag_len];
        if tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_len..];
    }

    while let Some(marker) = rest.chars().next() {
        let body = &rest[1..];
        let end = body
            .find(|c: char| c == '.' || c == '#' || c == ':')
            .unwrap_or(body.len());
        let name = &body[..end];
        if name.is_empty() {
            return Err(format!("dangling `{marker}` in `{token}`"));
        }
        match marker {
            '.' => compound.classes.push(name.to_string()),
            '#' => compound.id = Some(name.to_string()),
            ':' => compound.nth_child = Some(parse_pseudo(name)?),
            _ => unreachable!("split only on selector markers"),
        }
        rest = &body[end..];
    }
    Ok(compound)
}

fn parse_pseudo(name: &str) -> std::result::Result<usize, String> {
    if name == "first-child" {
        return Ok(1);
    }
    name.strip_prefix("nth-child(")
        .and_then(|s| s.strip_suffix(')'))
        .and_then(|n| n.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| format!("unsupported pseudo-class `:{name}`"))
}

/// Resolve a path produced by [`Selector::select_paths`].
pub fn element_at<'a>(nodes: &'a [DomNode], path: &[usize]) -> Option<&'a ElementNode> {
    let (&first, rest) = path.split_first()?;
    let DomNode::Element(e) = nodes.get(first)? else {
        return None;
    };
    if rest.is_empty() {
        Some(e)
    } else {
        element_at(&e.children, rest)
    }
}

/// Mutable variant of [`element_at`].
pub fn element_at_mut<'a>(nodes: &'a mut [DomNode], path: &[usize]) -> Option<&'a mut ElementNode> {
    let (&first, rest) = path.split_first()?;
    let DomNode::Element(e) = nodes.get_mut(first)? else {
        return None;
    };
    if rest.is_empty() {
        Some(e)
    } else {
        element_at_mut(&mut e.children, rest)
    }
}
