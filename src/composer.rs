use std::collections::HashMap;

use crate::{
    ComposerError, Encoding, Event, EventData, Mark, Node, NodeData, NodeId, Parser, Style, Tree,
};

/// Options recognized by the composer.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct ComposeOptions {
    /// Emit synthetic `Stream` trees between documents, so a caller iterating
    /// [`Composer::compose`] sees `[Stream, Doc, Stream, Doc, …, Stream]`.
    pub stream_nodes: bool,
    /// Reject duplicate mapping keys, reporting both locations.
    pub unique_keys: bool,
    /// Stop after the first document, as if the stream had ended there.
    pub single_document: bool,
    /// Reject keys that match no field when decoding into a native value.
    /// The composer only carries the flag; the construction layer applies it.
    pub known_fields: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            stream_nodes: false,
            unique_keys: true,
            single_document: false,
            known_fields: false,
        }
    }
}

impl ComposeOptions {
    pub fn stream_nodes(mut self, value: bool) -> Self {
        self.stream_nodes = value;
        self
    }

    pub fn unique_keys(mut self, value: bool) -> Self {
        self.unique_keys = value;
        self
    }

    pub fn single_document(mut self, value: bool) -> Self {
        self.single_document = value;
        self
    }

    pub fn known_fields(mut self, value: bool) -> Self {
        self.known_fields = value;
        self
    }
}

/// A user hook over comment attribution.
///
/// The composer consults it twice per unit of work: once for every event
/// pulled from the parser, with the comment text still mutable, and once for
/// every node whose composition finished. Both methods default to no-ops.
pub trait CommentPlugin {
    fn process_event_comments(&self, _event: &mut Event) {}

    fn process_node_comments(&self, _node: &mut Node) {}
}

/// The composer: events in, node trees out.
///
/// Each call to [`Composer::compose`] returns the next document tree (or, in
/// stream-node mode, the next stream-metadata tree), and `None` once the
/// stream is exhausted. Anchors are tracked per document; an alias naming an
/// anchor that has not been seen fails composition. Rebinding an anchor is
/// last-write-wins for subsequent aliases and leaves earlier targets intact.
pub struct Composer<'r> {
    parser: Parser<'r>,
    opts: ComposeOptions,
    /// Anchor name to arena index, scoped to the current document.
    anchors: HashMap<String, NodeId>,
    stream_started: bool,
    finished: bool,
    final_stream_emitted: bool,
    documents_composed: usize,
    /// DOCUMENT-START stashed while the preceding stream tree is returned.
    pending_document: Option<Event>,
    /// Head text spilled from a collection-end event; it belongs to the next
    /// node composed after the dedent.
    spill_head: String,
    encoding: Encoding,
    comment_plugin: Option<Box<dyn CommentPlugin>>,
}

impl<'r> Composer<'r> {
    pub fn new(opts: ComposeOptions) -> Self {
        Self {
            parser: Parser::new(),
            opts,
            anchors: HashMap::new(),
            stream_started: false,
            finished: false,
            final_stream_emitted: false,
            documents_composed: 0,
            pending_document: None,
            spill_head: String::new(),
            encoding: Encoding::Utf8,
            comment_plugin: None,
        }
    }

    /// Set a generic input handler.
    pub fn set_input(&mut self, input: &'r mut dyn std::io::Read) {
        self.parser.set_input(input);
    }

    /// Set the source encoding, overriding detection.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.parser.set_encoding(encoding);
    }

    /// Install a hook over comment attribution.
    pub fn set_comment_plugin(&mut self, plugin: Box<dyn CommentPlugin>) {
        self.comment_plugin = Some(plugin);
    }

    /// Pull the next event, giving the comment plugin its look.
    fn next_event(&mut self) -> Result<Event, ComposerError> {
        let mut event = self.parser.parse()?;
        if let Some(plugin) = &self.comment_plugin {
            plugin.process_event_comments(&mut event);
        }
        Ok(event)
    }

    /// Let the comment plugin see a node whose composition finished.
    fn finish_node(&self, tree: &mut Tree, id: NodeId) {
        if let Some(plugin) = &self.comment_plugin {
            plugin.process_node_comments(tree.get_mut(id));
        }
    }

    fn error<T>(problem: String, mark: Mark) -> Result<T, ComposerError> {
        Err(ComposerError::Problem { problem, mark })
    }

    /// Compose the next tree of the stream.
    ///
    /// An application must not alternate calls of [`Composer::compose`] with
    /// calls of [`Scanner::scan`](crate::Scanner::scan) or
    /// [`Parser::parse`](crate::Parser::parse) on the same stream.
    pub fn compose(&mut self) -> Result<Option<Tree>, ComposerError> {
        if self.finished {
            return Ok(None);
        }
        if !self.stream_started {
            let event = self.next_event()?;
            let EventData::StreamStart { encoding } = event.data else {
                return Self::error(String::from("expected stream start"), event.start_mark);
            };
            self.encoding = encoding;
            self.stream_started = true;
        }
        if self.opts.single_document && self.documents_composed >= 1 {
            return Ok(self.finish_stream());
        }
        if let Some(event) = self.pending_document.take() {
            return Ok(Some(self.compose_document(event)?));
        }
        let event = self.next_event()?;
        match event.data {
            EventData::DocumentStart {
                ref version_directive,
                ref tag_directives,
                ..
            } => {
                if self.opts.stream_nodes {
                    let tree =
                        self.stream_tree(*version_directive, tag_directives.clone());
                    self.pending_document = Some(event);
                    Ok(Some(tree))
                } else {
                    Ok(Some(self.compose_document(event)?))
                }
            }
            EventData::StreamEnd => Ok(self.finish_stream()),
            _ => Self::error(
                String::from("expected document start or stream end"),
                event.start_mark,
            ),
        }
    }

    /// The trailing stream tree (in stream-node mode), or `None`.
    fn finish_stream(&mut self) -> Option<Tree> {
        self.finished = true;
        if self.opts.stream_nodes && !self.final_stream_emitted {
            self.final_stream_emitted = true;
            return Some(self.stream_tree(None, Vec::new()));
        }
        None
    }

    fn stream_tree(
        &self,
        version_directive: Option<crate::VersionDirective>,
        tag_directives: Vec<crate::TagDirective>,
    ) -> Tree {
        let mut tree = Tree::new();
        let root = tree.push(Node::new(NodeData::Stream {
            encoding: self.encoding,
        }));
        tree.root = root;
        tree.version_directive = version_directive;
        tree.tag_directives = tag_directives;
        tree
    }

    fn compose_document(&mut self, event: Event) -> Result<Tree, ComposerError> {
        let EventData::DocumentStart {
            version_directive,
            tag_directives,
            implicit,
        } = event.data
        else {
            unreachable!("composer expected a document start event");
        };
        self.anchors.clear();
        let mut tree = Tree::new();
        tree.version_directive = version_directive;
        tree.tag_directives = tag_directives;
        tree.start_implicit = implicit;
        let document = tree.push(Node::new(NodeData::Document { content: vec![] }));
        tree.root = document;
        tree.get_mut(document).start_mark = event.start_mark;
        tree.get_mut(document).head_comment = event.head_comment;

        let root_event = self.next_event()?;
        let root = self.compose_from_event(&mut tree, root_event)?;
        let NodeData::Document { content } = &mut tree.get_mut(document).data else {
            unreachable!()
        };
        content.push(root);

        let end_event = self.next_event()?;
        let EventData::DocumentEnd { implicit } = end_event.data else {
            return Self::error(
                String::from("expected document end"),
                end_event.start_mark,
            );
        };
        tree.end_implicit = implicit;
        tree.get_mut(document).end_mark = end_event.end_mark;
        if !end_event.foot_comment.is_empty() {
            append_comment(&mut tree.get_mut(root).foot_comment, &end_event.foot_comment);
        }
        self.documents_composed += 1;
        Ok(tree)
    }

    /// Build the node announced by `event`, recursing into collections.
    fn compose_from_event(&mut self, tree: &mut Tree, event: Event) -> Result<NodeId, ComposerError> {
        match &event.data {
            EventData::Alias { .. } => self.compose_alias(tree, event),
            EventData::Scalar { .. } => self.compose_scalar(tree, event),
            EventData::SequenceStart { .. } => self.compose_sequence(tree, event),
            EventData::MappingStart { .. } => self.compose_mapping(tree, event),
            _ => Self::error(
                String::from("did not find expected node content"),
                event.start_mark,
            ),
        }
    }

    fn node_shell(&mut self, data: NodeData, event: &Event) -> Node {
        let mut node = Node::new(data);
        node.start_mark = event.start_mark;
        node.end_mark = event.end_mark;
        node.head_comment = std::mem::take(&mut self.spill_head);
        append_comment(&mut node.head_comment, &event.head_comment);
        node.line_comment = event.line_comment.clone();
        node
    }

    fn register_anchor(&mut self, anchor: Option<&String>, id: NodeId) {
        if let Some(anchor) = anchor {
            // Rebinding is last-write-wins; the earlier node stays reachable
            // through its structural parent.
            self.anchors.insert(anchor.clone(), id);
        }
    }

    fn compose_alias(&mut self, tree: &mut Tree, event: Event) -> Result<NodeId, ComposerError> {
        let EventData::Alias { anchor } = &event.data else {
            unreachable!()
        };
        let Some(&target) = self.anchors.get(anchor) else {
            return Self::error(
                format!("unknown anchor '{anchor}' referenced"),
                event.start_mark,
            );
        };
        let mut node = self.node_shell(
            NodeData::Alias {
                name: anchor.clone(),
                target,
            },
            &event,
        );
        node.tag = tree.get(target).tag.clone();
        let id = tree.push(node);
        self.finish_node(tree, id);
        Ok(id)
    }

    fn compose_scalar(&mut self, tree: &mut Tree, event: Event) -> Result<NodeId, ComposerError> {
        let EventData::Scalar {
            anchor,
            tag,
            value,
            style,
            ..
        } = &event.data
        else {
            unreachable!()
        };
        let mut node = self.node_shell(
            NodeData::Scalar {
                value: value.clone(),
            },
            &event,
        );
        node.style = Style::from_scalar_style(*style);
        match tag.as_deref() {
            None | Some("" | "!") => {}
            Some(tag) => node.tag = String::from(tag),
        }
        node.anchor = anchor.clone();
        let id = tree.push(node);
        self.register_anchor(anchor.as_ref(), id);
        self.finish_node(tree, id);
        Ok(id)
    }

    fn compose_sequence(&mut self, tree: &mut Tree, event: Event) -> Result<NodeId, ComposerError> {
        let EventData::SequenceStart {
            anchor,
            tag,
            style,
            ..
        } = &event.data
        else {
            unreachable!()
        };
        let mut node = self.node_shell(NodeData::Sequence { content: vec![] }, &event);
        if *style == crate::SequenceStyle::Flow {
            node.style |= Style::FLOW;
        }
        match tag.as_deref() {
            None | Some("" | "!") => {}
            Some(tag) => node.tag = String::from(tag),
        }
        node.anchor = anchor.clone();
        let id = tree.push(node);
        // Registered before the children so an alias may refer back into the
        // collection it sits in.
        self.register_anchor(anchor.as_ref(), id);

        loop {
            let child_event = self.next_event()?;
            match child_event.data {
                EventData::SequenceEnd => {
                    tree.get_mut(id).end_mark = child_event.end_mark;
                    self.spill_collection_end_comments(tree, id, &child_event);
                    break;
                }
                EventData::TailComment => {
                    if let Some(&last) = tree.get(id).content().last() {
                        append_comment(
                            &mut tree.get_mut(last).foot_comment,
                            &child_event.tail_comment,
                        );
                    }
                }
                _ => {
                    if !child_event.foot_comment.is_empty() {
                        if let Some(&prev) = tree.get(id).content().last() {
                            append_comment(
                                &mut tree.get_mut(prev).foot_comment,
                                &child_event.foot_comment,
                            );
                        }
                    }
                    let child = self.compose_from_event(tree, child_event)?;
                    tree.append_sequence_item(id, child);
                }
            }
        }
        self.finish_node(tree, id);
        Ok(id)
    }

    fn compose_mapping(&mut self, tree: &mut Tree, event: Event) -> Result<NodeId, ComposerError> {
        let EventData::MappingStart {
            anchor,
            tag,
            style,
            ..
        } = &event.data
        else {
            unreachable!()
        };
        let mut node = self.node_shell(NodeData::Mapping { content: vec![] }, &event);
        if *style == crate::MappingStyle::Flow {
            node.style |= Style::FLOW;
        }
        match tag.as_deref() {
            None | Some("" | "!") => {}
            Some(tag) => node.tag = String::from(tag),
        }
        node.anchor = anchor.clone();
        let id = tree.push(node);
        self.register_anchor(anchor.as_ref(), id);

        loop {
            let key_event = self.next_event()?;
            match key_event.data {
                EventData::MappingEnd => {
                    tree.get_mut(id).end_mark = key_event.end_mark;
                    self.spill_collection_end_comments(tree, id, &key_event);
                    break;
                }
                EventData::TailComment => {
                    // Foot comments land on the preceding key, not the value.
                    if let Some(prev_key) = previous_key(tree, id) {
                        append_comment(
                            &mut tree.get_mut(prev_key).foot_comment,
                            &key_event.tail_comment,
                        );
                    }
                }
                _ => {
                    if !key_event.foot_comment.is_empty() {
                        if let Some(prev_key) = previous_key(tree, id) {
                            append_comment(
                                &mut tree.get_mut(prev_key).foot_comment,
                                &key_event.foot_comment,
                            );
                        }
                    }
                    let key = self.compose_from_event(tree, key_event)?;
                    if self.opts.unique_keys {
                        self.check_unique_key(tree, id, key)?;
                    }
                    let value_event = self.next_event()?;
                    let value = self.compose_from_event(tree, value_event)?;
                    tree.append_mapping_pair(id, key, value);
                }
            }
        }
        self.finish_node(tree, id);
        Ok(id)
    }

    /// Head text on a collection-end event belongs to whatever follows the
    /// dedent; keep it for the next composed node.
    fn spill_collection_end_comments(&mut self, tree: &mut Tree, id: NodeId, event: &Event) {
        if !event.head_comment.is_empty() {
            append_comment(&mut self.spill_head, &event.head_comment);
        }
        if !event.foot_comment.is_empty() {
            append_comment(&mut tree.get_mut(id).foot_comment, &event.foot_comment);
        }
    }

    fn check_unique_key(
        &self,
        tree: &Tree,
        mapping: NodeId,
        key: NodeId,
    ) -> Result<(), ComposerError> {
        let key_node = tree.get(key);
        let content = tree.get(mapping).content();
        // The freshly composed key is not part of the mapping content yet.
        for existing in content.iter().step_by(2) {
            let existing_node = tree.get(*existing);
            if existing_node.data == key_node.data && existing_node.tag == key_node.tag {
                let rendered = key_node.scalar_value().unwrap_or("<collection>");
                return Err(ComposerError::ProblemWithContext {
                    context: format!("mapping key \"{rendered}\" already defined"),
                    context_mark: existing_node.start_mark,
                    problem: String::from("found duplicate mapping key"),
                    mark: key_node.start_mark,
                });
            }
        }
        Ok(())
    }
}

fn previous_key(tree: &Tree, mapping: NodeId) -> Option<NodeId> {
    let content = tree.get(mapping).content();
    if content.len() >= 2 {
        Some(content[content.len() - 2])
    } else {
        None
    }
}

fn append_comment(buffer: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !buffer.is_empty() {
        buffer.push('\n');
    }
    buffer.push_str(text);
}

/// Counter guarding against alias-driven expansion blowups ("YAML bombs").
///
/// The external construction layer records one operation per decoded node and
/// marks those reached through an alias. Expansion is rejected when the
/// aliased share exceeds a sliding bound: 99% below 400k operations, decaying
/// linearly to 10% at 4M and beyond.
#[derive(Debug, Default, Clone, Copy)]
pub struct AliasBudget {
    operations: u64,
    aliased: u64,
}

const ALIAS_RATIO_RANGE_LOW: u64 = 400_000;
const ALIAS_RATIO_RANGE_HIGH: u64 = 4_000_000;

impl AliasBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decode operation.
    pub fn record(&mut self, through_alias: bool) {
        self.operations += 1;
        if through_alias {
            self.aliased += 1;
        }
    }

    /// The largest tolerated aliased share at the current operation count.
    pub fn allowed_ratio(&self) -> f64 {
        if self.operations <= ALIAS_RATIO_RANGE_LOW {
            0.99
        } else if self.operations >= ALIAS_RATIO_RANGE_HIGH {
            0.10
        } else {
            let progress = (self.operations - ALIAS_RATIO_RANGE_LOW) as f64
                / (ALIAS_RATIO_RANGE_HIGH - ALIAS_RATIO_RANGE_LOW) as f64;
            0.99 - 0.89 * progress
        }
    }

    /// Check the budget; call after every [`AliasBudget::record`].
    pub fn check(&self) -> Result<(), ComposerError> {
        if self.operations > 100
            && self.aliased as f64 / self.operations as f64 > self.allowed_ratio()
        {
            return Err(ComposerError::ExcessiveAliasing);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComposeOptions, NodeData};
    use pretty_assertions::assert_eq;

    fn compose_one(mut input: &[u8]) -> Tree {
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_input(&mut input);
        composer.compose().unwrap().expect("a document")
    }

    fn compose_all(mut input: &[u8], opts: ComposeOptions) -> Vec<Tree> {
        let mut composer = Composer::new(opts);
        composer.set_input(&mut input);
        let mut trees = Vec::new();
        while let Some(tree) = composer.compose().unwrap() {
            trees.push(tree);
        }
        trees
    }

    #[test]
    fn anchor_and_alias_share_a_target() {
        let tree = compose_one(b"- &a foo\n- *a\n");
        let root = tree.content_root().unwrap();
        let items = tree.get(root).content();
        assert_eq!(items.len(), 2);
        let first = items[0];
        assert_eq!(tree.get(first).anchor.as_deref(), Some("a"));
        let NodeData::Alias { name, target } = &tree.get(items[1]).data else {
            panic!("second item should be an alias");
        };
        assert_eq!(name, "a");
        assert_eq!(*target, first);
    }

    #[test]
    fn unknown_alias_fails_composition() {
        let mut input: &[u8] = b"*missing\n";
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_input(&mut input);
        let err = composer.compose().unwrap_err();
        let ComposerError::Problem { problem, mark } = err else {
            panic!("expected a plain composer error");
        };
        assert_eq!(problem, "unknown anchor 'missing' referenced");
        assert_eq!((mark.line, mark.column), (0, 0));
    }

    #[test]
    fn anchor_rebinding_is_last_write_wins() {
        let tree = compose_one(b"- &a one\n- &a two\n- *a\n");
        let root = tree.content_root().unwrap();
        let items = tree.get(root).content().to_vec();
        let NodeData::Alias { target, .. } = &tree.get(items[2]).data else {
            panic!("third item should be an alias");
        };
        assert_eq!(tree.get(*target).scalar_value(), Some("two"));
        // The earlier binding stays attached to its structural parent.
        assert_eq!(tree.get(items[0]).scalar_value(), Some("one"));
    }

    #[test]
    fn duplicate_key_reports_both_locations() {
        let mut input: &[u8] = b"a: 1\nb: 2\na: 3\n";
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_input(&mut input);
        let err = composer.compose().unwrap_err();
        let ComposerError::ProblemWithContext {
            context_mark, mark, ..
        } = err
        else {
            panic!("expected an error with both marks");
        };
        assert_eq!(context_mark.line, 0);
        assert_eq!(mark.line, 2);
    }

    #[test]
    fn duplicate_keys_allowed_when_disabled() {
        let mut input: &[u8] = b"a: 1\na: 2\n";
        let mut composer = Composer::new(ComposeOptions::default().unique_keys(false));
        composer.set_input(&mut input);
        assert!(composer.compose().unwrap().is_some());
    }

    #[test]
    fn stream_nodes_bracket_documents() {
        let trees = compose_all(
            b"%YAML 1.2\n---\na: 1\n---\nb: 2\n",
            ComposeOptions::default().stream_nodes(true),
        );
        let kinds: Vec<bool> = trees.iter().map(|t| t.root().is_stream()).collect();
        assert_eq!(kinds, vec![true, false, true, false, true]);
        assert_eq!(
            trees[0].version_directive,
            Some(crate::VersionDirective { major: 1, minor: 2 })
        );
        assert_eq!(trees[2].version_directive, None);
    }

    #[test]
    fn empty_input_yields_single_stream_node() {
        let trees = compose_all(b"", ComposeOptions::default().stream_nodes(true));
        assert_eq!(trees.len(), 1);
        assert!(trees[0].root().is_stream());
        let trees = compose_all(b"", ComposeOptions::default());
        assert!(trees.is_empty());
    }

    #[test]
    fn single_document_stops_after_first() {
        let trees = compose_all(
            b"a: 1\n---\nb: 2\n",
            ComposeOptions::default().single_document(true),
        );
        assert_eq!(trees.len(), 1);
    }

    #[test]
    fn comments_attach_to_nodes() {
        let tree = compose_one(b"# above\nkey: value # beside\n");
        let root = tree.content_root().unwrap();
        let content = tree.get(root).content().to_vec();
        let key = tree.get(content[0]);
        assert_eq!(key.head_comment, "above");
        let value = tree.get(content[1]);
        assert_eq!(value.line_comment, "beside");
    }

    #[test]
    fn foot_comment_lands_on_preceding_key() {
        let tree = compose_one(b"a: 1\n# foot of a\n\nb: 2\n");
        let root = tree.content_root().unwrap();
        let content = tree.get(root).content().to_vec();
        assert_eq!(tree.get(content[0]).foot_comment, "foot of a");
        assert!(tree.get(content[1]).foot_comment.is_empty());
    }

    #[test]
    fn merge_key_keeps_raw_tag_for_resolver() {
        let tree = compose_one(b"base: &base\n  x: 1\nuse:\n  <<: *base\n  y: 2\n");
        let found = tree
            .nodes
            .iter()
            .any(|n| n.scalar_value() == Some("<<") && n.tag.is_empty());
        assert!(found);
    }

    #[test]
    fn comment_plugin_sees_nodes() {
        struct Upper;
        impl CommentPlugin for Upper {
            fn process_node_comments(&self, node: &mut Node) {
                node.head_comment = node.head_comment.to_uppercase();
            }
        }
        let mut input: &[u8] = b"# quiet\nkey: value\n";
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_comment_plugin(Box::new(Upper));
        composer.set_input(&mut input);
        let tree = composer.compose().unwrap().expect("a document");
        let root = tree.content_root().unwrap();
        let key = tree.get(root).content()[0];
        assert_eq!(tree.get(key).head_comment, "QUIET");
    }

    #[test]
    fn alias_budget_curve() {
        let mut budget = AliasBudget::new();
        assert!((budget.allowed_ratio() - 0.99).abs() < 1e-9);
        budget.operations = ALIAS_RATIO_RANGE_HIGH;
        assert!((budget.allowed_ratio() - 0.10).abs() < 1e-9);
        budget.operations = (ALIAS_RATIO_RANGE_LOW + ALIAS_RATIO_RANGE_HIGH) / 2;
        let mid = budget.allowed_ratio();
        assert!(mid > 0.10 && mid < 0.99);
    }

    #[test]
    fn alias_budget_trips_on_heavy_aliasing() {
        let mut budget = AliasBudget::new();
        for _ in 0..100 {
            budget.record(false);
        }
        assert!(budget.check().is_ok());
        for _ in 0..100_000 {
            budget.record(true);
        }
        assert!(matches!(
            budget.check(),
            Err(ComposerError::ExcessiveAliasing)
        ));
    }
}
