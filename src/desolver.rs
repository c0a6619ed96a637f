use regex::Regex;

use crate::resolver::Resolver;
use crate::{NodeData, Style, Tree};

/// Quoting style applied where the desolver must force quoting.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
#[non_exhaustive]
pub enum QuoteStyle {
    /// Prefer single quotes.
    #[default]
    Single,
    /// Prefer double quotes.
    Double,
    /// Quote the way pre-1.2 emitters did; renders as double quotes.
    Legacy,
}

/// The inverse of the [`Resolver`](crate::Resolver): tag elision.
///
/// Before emission, removes every tag the resolver would re-infer from the
/// value and style. Scalars whose plain rendering would be mis-read as a
/// non-string, including YAML 1.1 booleans and number formats the 1.2
/// resolver no longer recognizes, lose their tag but gain a quoting style so
/// they reload as strings.
pub struct Desolver {
    resolver: Resolver,
    legacy_bool: Regex,
    comma_number: Regex,
    sexagesimal: Regex,
    quote: QuoteStyle,
}

impl Default for Desolver {
    fn default() -> Self {
        Self::new(QuoteStyle::default())
    }
}

impl Desolver {
    pub fn new(quote: QuoteStyle) -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("static pattern");
        Self {
            resolver: Resolver::new(),
            legacy_bool: compile(
                r"^(y|Y|yes|Yes|YES|n|N|no|No|NO|on|On|ON|off|Off|OFF)$",
            ),
            comma_number: compile(r"^[-+]?[0-9]{1,3}(,[0-9]{3})+(\.[0-9]+)?$"),
            sexagesimal: compile(r"^[-+]?[0-9]+(:[0-5]?[0-9])+(\.[0-9]*)?$"),
            quote,
        }
    }

    /// Strip re-inferable tags across the tree, forcing quoting where a bare
    /// rendering would change meaning on reload.
    pub fn desolve(&self, tree: &mut Tree) {
        for node in &mut tree.nodes {
            match &node.data {
                NodeData::Stream { .. } | NodeData::Document { .. } => {}
                NodeData::Alias { .. } => {
                    // Aliases carry no tag on the wire.
                    node.tag.clear();
                    node.style.remove(Style::TAGGED);
                }
                NodeData::Sequence { .. } => {
                    if node.tag == "!!seq" {
                        node.tag.clear();
                        node.style.remove(Style::TAGGED);
                    }
                }
                NodeData::Mapping { .. } => {
                    if node.tag == "!!map" {
                        node.tag.clear();
                        node.style.remove(Style::TAGGED);
                    }
                }
                NodeData::Scalar { value } => {
                    if node.tag == "!!binary" {
                        // Not inferable; the tag must survive.
                        continue;
                    }
                    let quoted = node.style.intersects(
                        Style::DOUBLE_QUOTED
                            | Style::SINGLE_QUOTED
                            | Style::LITERAL
                            | Style::FOLDED,
                    );
                    if quoted {
                        if node.tag == "!!str" {
                            node.tag.clear();
                            node.style.remove(Style::TAGGED);
                        }
                        continue;
                    }
                    let inferred = self.resolver.infer_plain(value);
                    if node.tag == "!!str" {
                        node.tag.clear();
                        node.style.remove(Style::TAGGED);
                        if inferred != "!!str" || self.is_legacy_misread(value) {
                            node.style |= self.forced_quote_bits();
                        }
                    } else if node.tag == inferred {
                        node.tag.clear();
                        node.style.remove(Style::TAGGED);
                    }
                }
            }
        }
    }

    /// Values a YAML 1.1 loader reads as something other than a string.
    pub(crate) fn is_legacy_misread(&self, value: &str) -> bool {
        self.legacy_bool.is_match(value)
            || self.comma_number.is_match(value)
            || self.sexagesimal.is_match(value)
    }

    fn forced_quote_bits(&self) -> Style {
        match self.quote {
            QuoteStyle::Single => Style::SINGLE_QUOTED,
            QuoteStyle::Double | QuoteStyle::Legacy => Style::DOUBLE_QUOTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComposeOptions, Composer, Node, Resolver};
    use pretty_assertions::assert_eq;

    fn load_resolved(mut input: &[u8]) -> Tree {
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_input(&mut input);
        let mut tree = composer.compose().unwrap().expect("a document");
        Resolver::new().resolve(&mut tree).unwrap();
        tree
    }

    #[test]
    fn inferable_tags_are_stripped() {
        let mut tree = load_resolved(b"a: 1\nb: text\nc: [x, y]\n");
        Desolver::default().desolve(&mut tree);
        for node in &tree.nodes {
            if !node.is_document() {
                assert_eq!(node.tag, "");
            }
        }
    }

    #[test]
    fn legacy_bool_string_gets_quoted() {
        let mut tree = Tree::new();
        let mut node = Node::scalar("yes");
        node.tag = String::from("!!str");
        let id = tree.push(node);
        tree.root = id;
        Desolver::default().desolve(&mut tree);
        let node = tree.get(id);
        assert_eq!(node.tag, "");
        assert!(node.style.contains(Style::SINGLE_QUOTED));
    }

    #[test]
    fn quote_preference_is_honored() {
        let mut tree = Tree::new();
        let mut node = Node::scalar("123");
        node.tag = String::from("!!str");
        let id = tree.push(node);
        tree.root = id;
        Desolver::new(QuoteStyle::Double).desolve(&mut tree);
        assert!(tree.get(id).style.contains(Style::DOUBLE_QUOTED));
    }

    #[test]
    fn merge_marker_string_gets_quoted() {
        let mut tree = Tree::new();
        let mut node = Node::scalar("<<");
        node.tag = String::from("!!str");
        let id = tree.push(node);
        tree.root = id;
        Desolver::default().desolve(&mut tree);
        let node = tree.get(id);
        assert_eq!(node.tag, "");
        assert!(node.style.contains(Style::SINGLE_QUOTED));
    }

    #[test]
    fn comma_and_sexagesimal_numbers_are_misreads() {
        let desolver = Desolver::default();
        assert!(desolver.is_legacy_misread("1,000"));
        assert!(desolver.is_legacy_misread("1:30:00"));
        assert!(desolver.is_legacy_misread("on"));
        assert!(!desolver.is_legacy_misread("plain"));
    }

    #[test]
    fn binary_tag_survives() {
        let mut tree = Tree::new();
        let id = tree.push(Node::binary_scalar(b"\x00\x01"));
        tree.root = id;
        let mut resolved = tree.clone();
        Resolver::new().resolve(&mut resolved).unwrap();
        Desolver::default().desolve(&mut resolved);
        assert_eq!(resolved.get(id).tag, "!!binary");
    }

    #[test]
    fn custom_tags_are_kept() {
        let mut tree = load_resolved(b"!mine special\n");
        Desolver::default().desolve(&mut tree);
        let root = tree.content_root().unwrap();
        assert_eq!(tree.get(root).tag, "!mine");
    }

    #[test]
    fn quoted_string_loses_tag_without_forced_quoting() {
        let mut tree = load_resolved(b"a: '123'\n");
        Desolver::default().desolve(&mut tree);
        let root = tree.content_root().unwrap();
        let content = tree.get(root).content().to_vec();
        let node = tree.get(content[1]);
        assert_eq!(node.tag, "");
        assert!(node.style.contains(Style::SINGLE_QUOTED));
    }
}
