use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::{Node, NodeData, NodeId, ResolverError, Style, Tree};

/// A user hook consulted for every node during resolution.
///
/// Returning `Ok(Some(tag))` overrides the built-in inference; `Ok(None)`
/// accepts it. Errors abort resolution.
pub trait ResolverPlugin {
    fn resolve_node(
        &self,
        node: &Node,
        ctx: &ResolveContext<'_>,
    ) -> Result<Option<String>, ResolverError>;
}

/// Context handed to a [`ResolverPlugin`].
#[non_exhaustive]
pub struct ResolveContext<'a> {
    /// The tree being resolved.
    pub tree: &'a Tree,
    /// Arena ids from the root down to (and including) the current node.
    pub path: &'a [NodeId],
    /// The structural parent, if any.
    pub parent: Option<NodeId>,
    /// The root node id.
    pub root: NodeId,
}

/// Implicit tag inference.
///
/// Walks a tree depth-first and sets every content node's tag in place:
/// explicit tags are normalized to short form and marked `TAGGED`, non-plain
/// scalars become `!!str`, plain scalars are inferred from their text, and
/// collections get `!!seq`/`!!map`. Aliases take the resolved tag of their
/// target.
pub struct Resolver {
    int_patterns: Vec<Regex>,
    float_patterns: Vec<Regex>,
    bool_pattern: Regex,
    null_pattern: Regex,
    timestamp_patterns: Vec<Regex>,
    plugin: Option<Box<dyn ResolverPlugin>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("static pattern");
        Self {
            int_patterns: vec![
                compile(r"^[-+]?[0-9][0-9_]*$"),
                compile(r"^[-+]?0b[0-1_]+$"),
                compile(r"^[-+]?0o?[0-7_]+$"),
                compile(r"^[-+]?0x[0-9a-fA-F_]+$"),
            ],
            float_patterns: vec![
                compile(r"^[-+]?(\.[0-9]+|[0-9][0-9_]*\.[0-9_]*)([eE][-+]?[0-9]+)?$"),
                compile(r"^[-+]?[0-9][0-9_]*[eE][-+]?[0-9]+$"),
                compile(r"^[-+]?\.(inf|Inf|INF)$"),
                compile(r"^\.(nan|NaN|NAN)$"),
            ],
            bool_pattern: compile(r"^(true|True|TRUE|false|False|FALSE)$"),
            null_pattern: compile(r"^(null|Null|NULL|~|)$"),
            timestamp_patterns: vec![
                compile(
                    r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}[Tt][0-9]{1,2}:[0-9]{2}:[0-9]{2}(\.[0-9]*)?([Zz]|[+-][0-9]{1,2}(:[0-9]{2})?)?$",
                ),
                compile(r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2}$"),
                compile(
                    r"^[0-9]{4}-[0-9]{1,2}-[0-9]{1,2} [0-9]{1,2}:[0-9]{2}:[0-9]{2}(\.[0-9]*)?( ?[+-][0-9]{1,2}(:[0-9]{2})?)?$",
                ),
            ],
            plugin: None,
        }
    }

    /// Install a plugin consulted for every node.
    pub fn with_plugin(mut self, plugin: Box<dyn ResolverPlugin>) -> Self {
        self.plugin = Some(plugin);
        self
    }

    /// Resolve every content node of the tree in place.
    pub fn resolve(&self, tree: &mut Tree) -> Result<(), ResolverError> {
        let parents = parent_map(tree);
        // Arena order puts parents and alias targets before the nodes that
        // refer to them, so a single pass sees resolved targets.
        for id in 0..tree.nodes.len() {
            let (tag, style) = {
                let node = tree.get(id);
                match &node.data {
                    NodeData::Stream { .. } | NodeData::Document { .. } => continue,
                    _ => self.effective_tag(tree, node),
                }
            };
            let resolved = if let Some(plugin) = &self.plugin {
                let path = path_of(&parents, id);
                let ctx = ResolveContext {
                    tree,
                    path: &path,
                    parent: parents[id],
                    root: tree.root,
                };
                plugin.resolve_node(tree.get(id), &ctx)?
            } else {
                None
            };
            let node = tree.get_mut(id);
            node.tag = resolved.map_or(tag, |tag| normalize_tag(&tag));
            node.style |= style;
        }
        Ok(())
    }

    /// Compute the effective short-form tag and extra style bits for a node.
    fn effective_tag(&self, tree: &Tree, node: &Node) -> (String, Style) {
        if !node.tag.is_empty() {
            return (normalize_tag(&node.tag), Style::TAGGED);
        }
        match &node.data {
            NodeData::Alias { target, .. } => (tree.get(*target).tag.clone(), Style::empty()),
            NodeData::Sequence { .. } => (String::from("!!seq"), Style::empty()),
            NodeData::Mapping { .. } => (String::from("!!map"), Style::empty()),
            NodeData::Scalar { value } => {
                let quoted = node.style.intersects(
                    Style::DOUBLE_QUOTED | Style::SINGLE_QUOTED | Style::LITERAL | Style::FOLDED,
                );
                if quoted {
                    (String::from("!!str"), Style::empty())
                } else {
                    (String::from(self.infer_plain(value)), Style::empty())
                }
            }
            NodeData::Stream { .. } | NodeData::Document { .. } => {
                (String::new(), Style::empty())
            }
        }
    }

    /// The short tag a plain scalar with this text resolves to.
    pub fn infer_plain(&self, value: &str) -> &'static str {
        if self.null_pattern.is_match(value) {
            "!!null"
        } else if self.bool_pattern.is_match(value) {
            "!!bool"
        } else if self.is_int(value) {
            "!!int"
        } else if self.is_float(value) {
            "!!float"
        } else if self.is_timestamp(value) {
            "!!timestamp"
        } else if value == "<<" {
            "!!merge"
        } else {
            "!!str"
        }
    }

    pub(crate) fn is_int(&self, value: &str) -> bool {
        self.int_patterns.iter().any(|p| p.is_match(value))
    }

    pub(crate) fn is_float(&self, value: &str) -> bool {
        self.float_patterns.iter().any(|p| p.is_match(value))
    }

    pub(crate) fn is_bool(&self, value: &str) -> bool {
        self.bool_pattern.is_match(value)
    }

    pub(crate) fn is_null(&self, value: &str) -> bool {
        self.null_pattern.is_match(value)
    }

    /// A timestamp must both match the syntax and denote a real calendar
    /// point; the latter is checked through chrono.
    pub(crate) fn is_timestamp(&self, value: &str) -> bool {
        if !self.timestamp_patterns.iter().any(|p| p.is_match(value)) {
            return false;
        }
        if NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
            return true;
        }
        if DateTime::parse_from_rfc3339(value).is_ok() {
            return true;
        }
        for format in [
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
        ] {
            if NaiveDateTime::parse_from_str(value, format).is_ok() {
                return true;
            }
        }
        // Offset suffix variants such as "2001-12-14 21:59:43.10 -5".
        if let Some(stripped) = value.rfind(|c| c == '+' || c == '-').and_then(|at| {
            if at > 10 {
                Some(value[..at].trim_end())
            } else {
                None
            }
        }) {
            for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
                if NaiveDateTime::parse_from_str(stripped, format).is_ok() {
                    return true;
                }
            }
        }
        false
    }
}

/// Normalize a raw tag to its short form: `tag:yaml.org,2002:str` becomes
/// `!!str`; anything else is kept verbatim.
pub(crate) fn normalize_tag(tag: &str) -> String {
    if let Some(suffix) = tag.strip_prefix("tag:yaml.org,2002:") {
        format!("!!{suffix}")
    } else {
        String::from(tag)
    }
}

/// Expand a short-form tag back to its full form for the wire.
pub(crate) fn expand_tag(tag: &str) -> String {
    if let Some(suffix) = tag.strip_prefix("!!") {
        format!("tag:yaml.org,2002:{suffix}")
    } else {
        String::from(tag)
    }
}

fn parent_map(tree: &Tree) -> Vec<Option<NodeId>> {
    let mut parents = vec![None; tree.nodes.len()];
    for (id, node) in tree.nodes.iter().enumerate() {
        for &child in node.content() {
            parents[child] = Some(id);
        }
    }
    parents
}

fn path_of(parents: &[Option<NodeId>], id: NodeId) -> Vec<NodeId> {
    let mut path = vec![id];
    let mut cursor = id;
    while let Some(parent) = parents[cursor] {
        path.push(parent);
        cursor = parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComposeOptions, Composer};
    use pretty_assertions::assert_eq;

    fn resolve_one(mut input: &[u8]) -> Tree {
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_input(&mut input);
        let mut tree = composer.compose().unwrap().expect("a document");
        Resolver::new().resolve(&mut tree).unwrap();
        tree
    }

    #[test]
    fn plain_scalar_inference_table() {
        let resolver = Resolver::new();
        assert_eq!(resolver.infer_plain(""), "!!null");
        assert_eq!(resolver.infer_plain("~"), "!!null");
        assert_eq!(resolver.infer_plain("NULL"), "!!null");
        assert_eq!(resolver.infer_plain("true"), "!!bool");
        assert_eq!(resolver.infer_plain("FALSE"), "!!bool");
        assert_eq!(resolver.infer_plain("yes"), "!!str");
        assert_eq!(resolver.infer_plain("12"), "!!int");
        assert_eq!(resolver.infer_plain("-7"), "!!int");
        assert_eq!(resolver.infer_plain("0x1F"), "!!int");
        assert_eq!(resolver.infer_plain("0o17"), "!!int");
        assert_eq!(resolver.infer_plain("3.14"), "!!float");
        assert_eq!(resolver.infer_plain("-.inf"), "!!float");
        assert_eq!(resolver.infer_plain(".nan"), "!!float");
        assert_eq!(resolver.infer_plain("1e6"), "!!float");
        assert_eq!(resolver.infer_plain("2002-12-14"), "!!timestamp");
        assert_eq!(resolver.infer_plain("2001-12-15T02:59:43.1Z"), "!!timestamp");
        assert_eq!(resolver.infer_plain("2002-13-40"), "!!str");
        assert_eq!(resolver.infer_plain("<<"), "!!merge");
        assert_eq!(resolver.infer_plain("plain text"), "!!str");
    }

    #[test]
    fn simple_mapping_resolves_to_map_of_strings() {
        let tree = resolve_one(b"key: value\n");
        let root = tree.content_root().unwrap();
        assert_eq!(tree.get(root).tag, "!!map");
        for &child in tree.get(root).content() {
            assert_eq!(tree.get(child).tag, "!!str");
        }
    }

    #[test]
    fn quoted_scalars_resolve_to_str() {
        let tree = resolve_one(b"a: '12'\nb: \"true\"\n");
        let root = tree.content_root().unwrap();
        let content = tree.get(root).content().to_vec();
        assert_eq!(tree.get(content[1]).tag, "!!str");
        assert_eq!(tree.get(content[3]).tag, "!!str");
    }

    #[test]
    fn explicit_tag_normalizes_and_marks_tagged() {
        let tree = resolve_one(b"!!str 123\n");
        let root = tree.content_root().unwrap();
        let node = tree.get(root);
        assert_eq!(node.tag, "!!str");
        assert!(node.style.contains(Style::TAGGED));
    }

    #[test]
    fn alias_takes_target_tag() {
        let tree = resolve_one(b"- &n 42\n- *n\n");
        let root = tree.content_root().unwrap();
        let content = tree.get(root).content().to_vec();
        assert_eq!(tree.get(content[0]).tag, "!!int");
        assert_eq!(tree.get(content[1]).tag, "!!int");
    }

    #[test]
    fn merge_scalar_resolves_to_merge_tag() {
        let tree = resolve_one(b"a: &base\n  x: 1\nb:\n  <<: *base\n");
        assert!(tree.nodes.iter().any(|n| n.tag == "!!merge"));
    }

    #[test]
    fn plugin_can_override_inference() {
        struct ForceStr;
        impl ResolverPlugin for ForceStr {
            fn resolve_node(
                &self,
                node: &Node,
                _ctx: &ResolveContext<'_>,
            ) -> Result<Option<String>, ResolverError> {
                if node.is_scalar() {
                    Ok(Some(String::from("tag:yaml.org,2002:str")))
                } else {
                    Ok(None)
                }
            }
        }
        let mut input: &[u8] = b"a: 1\n";
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_input(&mut input);
        let mut tree = composer.compose().unwrap().unwrap();
        Resolver::new()
            .with_plugin(Box::new(ForceStr))
            .resolve(&mut tree)
            .unwrap();
        let root = tree.content_root().unwrap();
        let content = tree.get(root).content().to_vec();
        assert_eq!(tree.get(content[1]).tag, "!!str");
    }
}
