use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bitflags::bitflags;

use crate::{
    Encoding, MappingStyle, Mark, ScalarStyle, SequenceStyle, TagDirective, VersionDirective,
    BINARY_TAG,
};

bitflags! {
    /// Style information carried on a node.
    ///
    /// The scalar bits are mutually exclusive in practice; no bit set means
    /// plain style for scalars and block style for collections. `TAGGED`
    /// records that the input carried an explicit tag.
    #[derive(Default)]
    pub struct Style: u32 {
        const DOUBLE_QUOTED = 1 << 0;
        const SINGLE_QUOTED = 1 << 1;
        const LITERAL       = 1 << 2;
        const FOLDED        = 1 << 3;
        const FLOW          = 1 << 4;
        const TAGGED        = 1 << 5;
    }
}

impl Style {
    /// The event-level scalar style equivalent of the scalar bits.
    pub(crate) fn scalar_style(self) -> ScalarStyle {
        if self.contains(Style::DOUBLE_QUOTED) {
            ScalarStyle::DoubleQuoted
        } else if self.contains(Style::SINGLE_QUOTED) {
            ScalarStyle::SingleQuoted
        } else if self.contains(Style::LITERAL) {
            ScalarStyle::Literal
        } else if self.contains(Style::FOLDED) {
            ScalarStyle::Folded
        } else {
            ScalarStyle::Plain
        }
    }

    pub(crate) fn from_scalar_style(style: ScalarStyle) -> Style {
        match style {
            ScalarStyle::DoubleQuoted => Style::DOUBLE_QUOTED,
            ScalarStyle::SingleQuoted => Style::SINGLE_QUOTED,
            ScalarStyle::Literal => Style::LITERAL,
            ScalarStyle::Folded => Style::FOLDED,
            ScalarStyle::Any | ScalarStyle::Plain => Style::empty(),
        }
    }

    pub(crate) fn sequence_style(self) -> SequenceStyle {
        if self.contains(Style::FLOW) {
            SequenceStyle::Flow
        } else {
            SequenceStyle::Block
        }
    }

    pub(crate) fn mapping_style(self) -> MappingStyle {
        if self.contains(Style::FLOW) {
            MappingStyle::Flow
        } else {
            MappingStyle::Block
        }
    }
}

/// Index of a node within its [`Tree`]'s arena.
pub type NodeId = usize;

/// Node payloads.
///
/// Aliases refer to their target by arena index: the relation is never an
/// owning edge, so traversals that follow only `content` edges cannot cycle.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    /// Stream metadata between documents: the detected encoding. Directives
    /// of the following document live on the [`Tree`].
    Stream {
        /// The stream encoding.
        encoding: Encoding,
    },
    /// A document; its content is exactly one root node.
    Document {
        /// The root node of the document.
        content: Vec<NodeId>,
    },
    /// A sequence node.
    Sequence {
        /// The item nodes, in order.
        content: Vec<NodeId>,
    },
    /// A mapping node. The content has even length: entry `2k` is a key and
    /// entry `2k + 1` its value.
    Mapping {
        /// Interleaved key and value nodes.
        content: Vec<NodeId>,
    },
    /// A scalar node.
    Scalar {
        /// The scalar text.
        value: String,
    },
    /// An alias back to an anchored node appearing earlier in the document.
    Alias {
        /// The referenced anchor name.
        name: String,
        /// The arena index of the anchored node.
        target: NodeId,
    },
}

/// A single node of the document tree.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Node {
    /// The node payload.
    pub data: NodeData,
    /// The short-form tag (`!!str`), a custom tag, or empty when the tag is
    /// implied.
    pub tag: String,
    /// The anchor name, if the node is anchored.
    pub anchor: Option<String>,
    /// Style bits.
    pub style: Style,
    /// The beginning of the node.
    pub start_mark: Mark,
    /// The end of the node.
    pub end_mark: Mark,
    /// Comment lines above the node.
    pub head_comment: String,
    /// Trailing comment on the node's line.
    pub line_comment: String,
    /// Comment lines below the node.
    pub foot_comment: String,
}

impl Node {
    pub fn new(data: NodeData) -> Self {
        Self {
            data,
            tag: String::new(),
            anchor: None,
            style: Style::empty(),
            start_mark: Mark::default(),
            end_mark: Mark::default(),
            head_comment: String::new(),
            line_comment: String::new(),
            foot_comment: String::new(),
        }
    }

    /// A plain scalar node with the given text.
    pub fn scalar(value: &str) -> Self {
        Self::new(NodeData::Scalar {
            value: String::from(value),
        })
    }

    /// A scalar node holding arbitrary bytes: the value is base64-encoded
    /// and the node tagged `!!binary`.
    pub fn binary_scalar(bytes: &[u8]) -> Self {
        let mut node = Self::new(NodeData::Scalar {
            value: BASE64.encode(bytes),
        });
        node.tag = String::from(BINARY_TAG);
        node
    }

    /// Decode the value of a `!!binary` scalar.
    pub fn binary_value(&self) -> Option<Vec<u8>> {
        if self.tag != BINARY_TAG && self.tag != "!!binary" {
            return None;
        }
        let NodeData::Scalar { value } = &self.data else {
            return None;
        };
        let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        BASE64.decode(cleaned).ok()
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.data, NodeData::Scalar { .. })
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.data, NodeData::Sequence { .. })
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.data, NodeData::Mapping { .. })
    }

    pub fn is_alias(&self) -> bool {
        matches!(self.data, NodeData::Alias { .. })
    }

    pub fn is_document(&self) -> bool {
        matches!(self.data, NodeData::Document { .. })
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.data, NodeData::Stream { .. })
    }

    /// The scalar text, if the node is a scalar.
    pub fn scalar_value(&self) -> Option<&str> {
        match &self.data {
            NodeData::Scalar { value } => Some(value),
            _ => None,
        }
    }

    /// The child node ids, in document order. Alias targets are not children.
    pub fn content(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Document { content }
            | NodeData::Sequence { content }
            | NodeData::Mapping { content } => content,
            _ => &[],
        }
    }
}

/// A document (or stream-metadata) tree: an arena of nodes plus the id of
/// the root.
///
/// The arena owns every node; parents refer to children by index, and alias
/// nodes refer to their anchored target the same way. A tree whose root is a
/// `Stream` node carries only stream metadata and has no content.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Tree {
    /// The node arena. Nodes appear in composition order.
    pub nodes: Vec<Node>,
    /// The arena index of the root node.
    pub root: NodeId,
    /// The version directive attached to the document.
    pub version_directive: Option<VersionDirective>,
    /// The tag directives attached to the document.
    pub tag_directives: Vec<TagDirective>,
    /// Is the document start indicator implicit?
    pub start_implicit: bool,
    /// Is the document end indicator implicit?
    pub end_implicit: bool,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(16),
            root: 0,
            version_directive: None,
            tag_directives: Vec::new(),
            start_implicit: true,
            end_implicit: true,
        }
    }

    /// Add a node to the arena, returning its id.
    pub fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.nodes[self.root]
    }

    /// The content child of a document root, if there is one.
    pub fn content_root(&self) -> Option<NodeId> {
        match &self.root().data {
            NodeData::Document { content } => content.first().copied(),
            _ => None,
        }
    }

    /// Append an item to a sequence node.
    pub fn append_sequence_item(&mut self, sequence: NodeId, item: NodeId) {
        let NodeData::Sequence { content } = &mut self.nodes[sequence].data else {
            panic!("node is not a sequence");
        };
        content.push(item);
    }

    /// Append a key and a value to a mapping node.
    pub fn append_mapping_pair(&mut self, mapping: NodeId, key: NodeId, value: NodeId) {
        let NodeData::Mapping { content } = &mut self.nodes[mapping].data else {
            panic!("node is not a mapping");
        };
        content.push(key);
        content.push(value);
    }

    /// Follow an alias to its target; other nodes resolve to themselves.
    pub fn resolve_alias(&self, id: NodeId) -> NodeId {
        match &self.nodes[id].data {
            NodeData::Alias { target, .. } => *target,
            _ => id,
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mapping_content_stays_even() {
        let mut tree = Tree::new();
        let map = tree.push(Node::new(NodeData::Mapping { content: vec![] }));
        let k = tree.push(Node::scalar("k"));
        let v = tree.push(Node::scalar("v"));
        tree.append_mapping_pair(map, k, v);
        assert_eq!(tree.get(map).content().len() % 2, 0);
    }

    #[test]
    fn binary_scalar_round_trip() {
        let node = Node::binary_scalar(b"\xDE\xAD\xBE\xEF");
        assert_eq!(node.tag, BINARY_TAG);
        assert_eq!(node.scalar_value(), Some("3q2+7w=="));
        assert_eq!(node.binary_value(), Some(vec![0xDE, 0xAD, 0xBE, 0xEF]));
    }

    #[test]
    fn style_bits_map_to_scalar_styles() {
        assert_eq!(Style::LITERAL.scalar_style(), ScalarStyle::Literal);
        assert_eq!(Style::empty().scalar_style(), ScalarStyle::Plain);
        assert_eq!(
            Style::from_scalar_style(ScalarStyle::SingleQuoted),
            Style::SINGLE_QUOTED
        );
    }

    #[test]
    fn alias_resolution_follows_target() {
        let mut tree = Tree::new();
        let anchored = tree.push(Node::scalar("foo"));
        let alias = tree.push(Node::new(NodeData::Alias {
            name: String::from("a"),
            target: anchored,
        }));
        assert_eq!(tree.resolve_alias(alias), anchored);
        assert_eq!(tree.resolve_alias(anchored), anchored);
    }
}
