use crate::resolver::expand_tag;
use crate::{
    Emitter, Encoding, Event, MappingStyle, Node, NodeData, NodeId, ScalarStyle, SequenceStyle,
    SerializerError, Tree,
};

/// Options recognized by the serializer.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct SerializeOptions {
    /// Always emit the `---` document start indicator.
    pub explicit_start: bool,
    /// Always emit the `...` document end indicator.
    pub explicit_end: bool,
    /// Render collections of scalars in flow style when the estimated line
    /// fits the configured width.
    pub flow_simple_collections: bool,
}

impl SerializeOptions {
    pub fn explicit_start(mut self, value: bool) -> Self {
        self.explicit_start = value;
        self
    }

    pub fn explicit_end(mut self, value: bool) -> Self {
        self.explicit_end = value;
        self
    }

    pub fn flow_simple_collections(mut self, value: bool) -> Self {
        self.flow_simple_collections = value;
        self
    }
}

/// The serializer: node trees in, events out.
///
/// Walks a tree and feeds the emitter, choosing styles and routing comments.
/// Every key's foot comment is carried forward to the next entry (or to a
/// TAIL-COMMENT sentinel before the collection end) so it renders where the
/// dedent occurs, never between a key and its value.
pub struct Serializer<'w> {
    emitter: Emitter<'w>,
    opts: SerializeOptions,
    opened: bool,
    closed: bool,
}

impl<'w> Serializer<'w> {
    pub fn new(emitter: Emitter<'w>, opts: SerializeOptions) -> Self {
        Self {
            emitter,
            opts,
            opened: false,
            closed: false,
        }
    }

    /// Access the underlying emitter, e.g. to flush it.
    pub fn emitter_mut(&mut self) -> &mut Emitter<'w> {
        &mut self.emitter
    }

    /// Serialize one tree. Stream-metadata trees are absorbed silently.
    pub fn serialize(&mut self, tree: &Tree) -> Result<(), SerializerError> {
        if self.closed {
            return Err(SerializerError::Problem("serializer is closed"));
        }
        self.open()?;
        let (root, document) = match &tree.root().data {
            NodeData::Stream { .. } => return Ok(()),
            NodeData::Document { content } => (content.first().copied(), Some(tree.root())),
            _ => (Some(tree.root), None),
        };
        let implicit = tree.start_implicit
            && !self.opts.explicit_start
            && tree.version_directive.is_none()
            && tree.tag_directives.is_empty();
        let mut start = Event::document_start(tree.version_directive, &tree.tag_directives, implicit);
        if let Some(document) = document {
            start.head_comment = document.head_comment.clone();
        }
        self.emitter.emit(start)?;
        match root {
            Some(root) => self.serialize_node(tree, root, String::new())?,
            None => {
                // A document with no content renders as an empty scalar.
                self.emitter
                    .emit(Event::scalar(None, None, "", true, true, ScalarStyle::Plain))?;
            }
        }
        let end_implicit = tree.end_implicit && !self.opts.explicit_end;
        self.emitter.emit(Event::document_end(end_implicit))?;
        Ok(())
    }

    /// Close the stream and flush the emitter.
    pub fn finish(&mut self) -> Result<(), SerializerError> {
        if self.closed {
            return Ok(());
        }
        self.open()?;
        self.emitter.emit(Event::stream_end())?;
        self.emitter.flush().map_err(crate::EmitterError::from)?;
        self.closed = true;
        Ok(())
    }

    fn open(&mut self) -> Result<(), SerializerError> {
        if !self.opened {
            self.emitter.emit(Event::stream_start(Encoding::Any))?;
            self.opened = true;
        }
        Ok(())
    }

    /// Emit the events for one node. `foot_before` is the foot comment of
    /// the preceding sibling, to be rendered above this node.
    fn serialize_node(
        &mut self,
        tree: &Tree,
        id: NodeId,
        foot_before: String,
    ) -> Result<(), SerializerError> {
        let node = tree.get(id);
        match &node.data {
            NodeData::Alias { name, .. } => {
                let mut event = Event::alias(name);
                event.foot_comment = foot_before;
                event.head_comment = node.head_comment.clone();
                event.line_comment = node.line_comment.clone();
                self.emitter.emit(event)?;
                Ok(())
            }
            NodeData::Scalar { value } => {
                let style = self.select_scalar_style(node, value);
                let (tag, plain_implicit, quoted_implicit) = if node.tag.is_empty() {
                    (None, true, true)
                } else {
                    (Some(expand_tag(&node.tag)), false, false)
                };
                let mut event = Event::scalar(
                    node.anchor.as_deref(),
                    tag.as_deref(),
                    value,
                    plain_implicit,
                    quoted_implicit,
                    style,
                );
                event.foot_comment = foot_before;
                event.head_comment = node.head_comment.clone();
                event.line_comment = node.line_comment.clone();
                self.emitter.emit(event)?;
                Ok(())
            }
            NodeData::Sequence { content } => {
                let style = self.sequence_style(tree, node, content);
                let (tag, implicit) = if node.tag.is_empty() {
                    (None, true)
                } else {
                    (Some(expand_tag(&node.tag)), false)
                };
                let mut event =
                    Event::sequence_start(node.anchor.as_deref(), tag.as_deref(), implicit, style);
                event.foot_comment = foot_before;
                event.head_comment = node.head_comment.clone();
                event.line_comment = node.line_comment.clone();
                self.emitter.emit(event)?;
                let mut carried = String::new();
                for &item in content {
                    let foot = std::mem::take(&mut carried);
                    carried = tree.get(item).foot_comment.clone();
                    self.serialize_node(tree, item, foot)?;
                }
                if !carried.is_empty() && style == SequenceStyle::Block {
                    self.emitter.emit(Event::tail_comment(&carried))?;
                }
                self.emitter.emit(Event::sequence_end())?;
                Ok(())
            }
            NodeData::Mapping { content } => {
                let style = self.mapping_style(tree, node, content);
                let (tag, implicit) = if node.tag.is_empty() {
                    (None, true)
                } else {
                    (Some(expand_tag(&node.tag)), false)
                };
                let mut event =
                    Event::mapping_start(node.anchor.as_deref(), tag.as_deref(), implicit, style);
                event.foot_comment = foot_before;
                event.head_comment = node.head_comment.clone();
                event.line_comment = node.line_comment.clone();
                self.emitter.emit(event)?;
                let mut carried = String::new();
                for pair in content.chunks_exact(2) {
                    let (key, value) = (pair[0], pair[1]);
                    let foot = std::mem::take(&mut carried);
                    // The key's foot comment renders above the next entry.
                    carried = tree.get(key).foot_comment.clone();
                    self.serialize_node(tree, key, foot)?;
                    self.serialize_node(tree, value, String::new())?;
                }
                if !carried.is_empty() && style == MappingStyle::Block {
                    self.emitter.emit(Event::tail_comment(&carried))?;
                }
                self.emitter.emit(Event::mapping_end())?;
                Ok(())
            }
            NodeData::Stream { .. } | NodeData::Document { .. } => {
                Err(SerializerError::Problem("nested document nodes cannot be serialized"))
            }
        }
    }

    fn select_scalar_style(&self, node: &Node, value: &str) -> ScalarStyle {
        let explicit = node.style.scalar_style();
        if explicit != ScalarStyle::Plain {
            return explicit;
        }
        if value.contains('\n') && should_use_literal_style(value) {
            return ScalarStyle::Literal;
        }
        ScalarStyle::Any
    }

    fn sequence_style(&self, tree: &Tree, node: &Node, content: &[NodeId]) -> SequenceStyle {
        let style = node.style.sequence_style();
        if style == SequenceStyle::Block && self.fits_in_flow(tree, content) {
            return SequenceStyle::Flow;
        }
        style
    }

    fn mapping_style(&self, tree: &Tree, node: &Node, content: &[NodeId]) -> MappingStyle {
        let style = node.style.mapping_style();
        if style == MappingStyle::Block && self.fits_in_flow(tree, content) {
            return MappingStyle::Flow;
        }
        style
    }

    /// Would this collection of scalars fit on one flow line?
    fn fits_in_flow(&self, tree: &Tree, content: &[NodeId]) -> bool {
        if !self.opts.flow_simple_collections || content.is_empty() {
            return false;
        }
        let mut estimate = 2;
        for &child in content {
            let node = tree.get(child);
            let Some(value) = node.scalar_value() else {
                return false;
            };
            if !node.head_comment.is_empty()
                || !node.line_comment.is_empty()
                || !node.foot_comment.is_empty()
            {
                return false;
            }
            estimate += value.len() + 2;
        }
        estimate <= self.emitter.flow_width_estimate() as usize
    }
}

/// Literal style is preferred for multi-line text that carries no control
/// characters and no carriage returns.
fn should_use_literal_style(value: &str) -> bool {
    !value.contains('\r')
        && value
            .chars()
            .all(|ch| ch == '\n' || !ch.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComposeOptions, Composer, Desolver, Resolver};
    use pretty_assertions::assert_eq;

    fn dump(tree: &Tree, opts: SerializeOptions) -> String {
        let mut output = Vec::new();
        {
            let mut emitter = Emitter::new();
            emitter.set_output_string(&mut output);
            let mut serializer = Serializer::new(emitter, opts);
            serializer.serialize(tree).unwrap();
            serializer.finish().unwrap();
        }
        String::from_utf8(output).unwrap()
    }

    fn reload(mut input: &[u8]) -> Tree {
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_input(&mut input);
        let mut tree = composer.compose().unwrap().expect("a document");
        Resolver::new().resolve(&mut tree).unwrap();
        Desolver::default().desolve(&mut tree);
        tree
    }

    #[test]
    fn mapping_round_trips_to_same_text() {
        let tree = reload(b"key: value\nitems:\n- 1\n- 2\n");
        let text = dump(&tree, SerializeOptions::default());
        assert_eq!(text, "key: value\nitems:\n- 1\n- 2\n");
    }

    #[test]
    fn multiline_scalar_prefers_literal() {
        let tree = reload(b"text: |\n  one\n  two\n");
        let text = dump(&tree, SerializeOptions::default());
        assert_eq!(text, "text: |\n  one\n  two\n");
    }

    #[test]
    fn explicit_start_adds_document_marker() {
        let tree = reload(b"a: 1\n");
        let text = dump(&tree, SerializeOptions::default().explicit_start(true));
        assert!(text.starts_with("---"));
    }

    #[test]
    fn explicit_end_adds_document_marker() {
        let tree = reload(b"a: 1\n");
        let text = dump(&tree, SerializeOptions::default().explicit_end(true));
        assert!(text.ends_with("...\n"));
    }

    #[test]
    fn flow_simple_collections_inline_scalars() {
        let tree = reload(b"nums:\n- 1\n- 2\n- 3\n");
        let text = dump(
            &tree,
            SerializeOptions::default().flow_simple_collections(true),
        );
        assert_eq!(text, "nums: [1, 2, 3]\n");
    }

    #[test]
    fn anchors_and_aliases_survive() {
        let tree = reload(b"- &a foo\n- *a\n");
        let text = dump(&tree, SerializeOptions::default());
        assert_eq!(text, "- &a foo\n- *a\n");
    }

    #[test]
    fn quoted_string_survives_desolve_and_dump() {
        let tree = reload(b"answer: 'yes'\n");
        let text = dump(&tree, SerializeOptions::default());
        assert_eq!(text, "answer: 'yes'\n");
    }

    #[test]
    fn comments_round_trip() {
        let tree = reload(b"# above\nkey: value # beside\n");
        let text = dump(&tree, SerializeOptions::default());
        assert_eq!(text, "# above\nkey: value # beside\n");
    }

    #[test]
    fn foot_comment_renders_after_entry() {
        let tree = reload(b"a: 1\n# foot of a\n\nb: 2\n");
        let text = dump(&tree, SerializeOptions::default());
        assert_eq!(text, "a: 1\n# foot of a\n\nb: 2\n");
    }

    #[test]
    fn stream_trees_are_absorbed() {
        let mut input: &[u8] = b"a: 1\n";
        let mut composer = Composer::new(ComposeOptions::default().stream_nodes(true));
        composer.set_input(&mut input);
        let mut output = Vec::new();
        {
            let mut emitter = Emitter::new();
            emitter.set_output_string(&mut output);
            let mut serializer = Serializer::new(emitter, SerializeOptions::default());
            while let Some(mut tree) = composer.compose().unwrap() {
                Resolver::new().resolve(&mut tree).unwrap();
                Desolver::default().desolve(&mut tree);
                serializer.serialize(&tree).unwrap();
            }
            serializer.finish().unwrap();
        }
        assert_eq!(String::from_utf8(output).unwrap(), "a: 1\n");
    }
}
