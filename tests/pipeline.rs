//! End-to-end scenarios across the whole load and dump pipeline.

use pretty_assertions::assert_eq;
use yamltree::{
    ComposeOptions, Composer, ComposerError, Desolver, Emitter, Encoding, EventData,
    MappingStyle, Node, NodeData, NodeId, Parser, Resolver, ScalarStyle, Scanner,
    SerializeOptions, Serializer, Style, Token, TokenData, Tree, VersionDirective,
};

fn load_events(mut input: &[u8]) -> Vec<yamltree::Event> {
    let mut parser = Parser::new();
    parser.set_input(&mut input);
    let mut events = Vec::new();
    loop {
        let event = parser.parse().expect("valid input");
        let done = matches!(event.data, EventData::StreamEnd);
        events.push(event);
        if done {
            return events;
        }
    }
}

fn load_tokens(mut input: &[u8]) -> Vec<Token> {
    let mut scanner = Scanner::new();
    scanner.set_input(&mut input);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.scan().expect("valid input");
        let done = matches!(token.data, TokenData::StreamEnd);
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

fn load_resolved(mut input: &[u8]) -> Tree {
    let mut composer = Composer::new(ComposeOptions::default());
    composer.set_input(&mut input);
    let mut tree = composer.compose().expect("valid input").expect("a document");
    Resolver::new().resolve(&mut tree).expect("resolvable");
    tree
}

fn dump_tree(tree: &Tree) -> String {
    let mut output = Vec::new();
    {
        let mut emitter = Emitter::new();
        emitter.set_output_string(&mut output);
        let mut serializer = Serializer::new(emitter, SerializeOptions::default());
        serializer.serialize(tree).expect("serializable");
        serializer.finish().expect("flushable");
    }
    String::from_utf8(output).expect("UTF-8 output")
}

fn round_trip(input: &[u8]) -> String {
    let mut tree = load_resolved(input);
    Desolver::default().desolve(&mut tree);
    dump_tree(&tree)
}

/// Structural equality: same kinds, tags, scalar values and content order.
/// Styles and comments are ignored, and aliases compare by their target's
/// structure.
fn semantic_eq(a: &Tree, b: &Tree, id_a: NodeId, id_b: NodeId, depth: usize) -> bool {
    if depth > 64 {
        return true;
    }
    let (na, nb) = (a.get(id_a), b.get(id_b));
    if na.tag != nb.tag {
        return false;
    }
    match (&na.data, &nb.data) {
        (NodeData::Scalar { value: va }, NodeData::Scalar { value: vb }) => va == vb,
        (NodeData::Alias { target: ta, .. }, NodeData::Alias { target: tb, .. }) => {
            semantic_eq(a, b, *ta, *tb, depth + 1)
        }
        (NodeData::Alias { target, .. }, _) => semantic_eq(a, b, *target, id_b, depth + 1),
        (_, NodeData::Alias { target, .. }) => semantic_eq(a, b, id_a, *target, depth + 1),
        (NodeData::Sequence { content: ca }, NodeData::Sequence { content: cb })
        | (NodeData::Mapping { content: ca }, NodeData::Mapping { content: cb })
        | (NodeData::Document { content: ca }, NodeData::Document { content: cb }) => {
            ca.len() == cb.len()
                && ca
                    .iter()
                    .zip(cb.iter())
                    .all(|(&x, &y)| semantic_eq(a, b, x, y, depth + 1))
        }
        (NodeData::Stream { .. }, NodeData::Stream { .. }) => true,
        _ => false,
    }
}

#[test]
fn s1_simple_mapping_events_and_tree() {
    let events = load_events(b"key: value\n");
    let shapes: Vec<&str> = events
        .iter()
        .map(|e| match &e.data {
            EventData::StreamStart { .. } => "stream-start",
            EventData::DocumentStart { implicit: true, .. } => "doc-start-implicit",
            EventData::DocumentStart { .. } => "doc-start",
            EventData::MappingStart {
                implicit: true,
                style: MappingStyle::Block,
                ..
            } => "map-start-implicit-block",
            EventData::MappingStart { .. } => "map-start",
            EventData::Scalar {
                style: ScalarStyle::Plain,
                ..
            } => "scalar-plain",
            EventData::MappingEnd => "map-end",
            EventData::DocumentEnd { implicit: true } => "doc-end-implicit",
            _ => "other",
        })
        .collect();
    assert_eq!(
        shapes,
        vec![
            "stream-start",
            "doc-start-implicit",
            "map-start-implicit-block",
            "scalar-plain",
            "scalar-plain",
            "map-end",
            "doc-end-implicit",
            "other",
        ]
    );

    let tree = load_resolved(b"key: value\n");
    let root = tree.content_root().expect("root node");
    assert_eq!(tree.get(root).tag, "!!map");
    let content = tree.get(root).content().to_vec();
    assert_eq!(content.len(), 2);
    assert_eq!(tree.get(content[0]).scalar_value(), Some("key"));
    assert_eq!(tree.get(content[0]).tag, "!!str");
    assert_eq!(tree.get(content[1]).scalar_value(), Some("value"));
    assert_eq!(tree.get(content[1]).tag, "!!str");
}

#[test]
fn s2_anchor_and_alias() {
    let tree = load_resolved(b"- &a foo\n- *a\n");
    let root = tree.content_root().expect("root node");
    let items = tree.get(root).content().to_vec();
    assert_eq!(tree.get(items[0]).anchor.as_deref(), Some("a"));
    let NodeData::Alias { target, .. } = &tree.get(items[1]).data else {
        panic!("expected an alias node");
    };
    assert_eq!(*target, items[0]);
}

#[test]
fn s3_unknown_alias_reports_position() {
    let mut input: &[u8] = b"*missing\n";
    let mut composer = Composer::new(ComposeOptions::default());
    composer.set_input(&mut input);
    let err = composer.compose().unwrap_err();
    let ComposerError::Problem { problem, mark } = err else {
        panic!("expected a composer problem");
    };
    assert_eq!(problem, "unknown anchor 'missing' referenced");
    assert_eq!(mark.to_string(), "line 1, col 1");
}

#[test]
fn s4_yaml11_bool_round_trip() {
    // A native string "yes" must dump quoted so it reloads as a string.
    let mut tree = Tree::new();
    let mut node = Node::scalar("yes");
    node.tag = String::from("!!str");
    let id = tree.push(node);
    tree.root = id;
    Desolver::default().desolve(&mut tree);
    let text = dump_tree(&tree);
    assert_eq!(text, "'yes'\n");

    let reloaded = load_resolved(text.as_bytes());
    let root = reloaded.content_root().expect("root node");
    assert_eq!(reloaded.get(root).tag, "!!str");
    assert_eq!(reloaded.get(root).scalar_value(), Some("yes"));
}

#[test]
fn s5_multi_document_stream_nodes() {
    let mut input: &[u8] = b"%YAML 1.2\n---\na: 1\n---\nb: 2\n";
    let mut composer = Composer::new(ComposeOptions::default().stream_nodes(true));
    composer.set_input(&mut input);
    let mut trees = Vec::new();
    while let Some(tree) = composer.compose().expect("valid input") {
        trees.push(tree);
    }
    assert_eq!(trees.len(), 5);
    assert!(trees[0].root().is_stream());
    assert_eq!(
        trees[0].version_directive,
        Some(VersionDirective::new(1, 2))
    );
    assert!(trees[1].root().is_document());
    assert_eq!(
        trees[1].version_directive,
        Some(VersionDirective::new(1, 2))
    );
    assert!(trees[2].root().is_stream());
    assert!(trees[3].root().is_document());
    assert_eq!(trees[3].version_directive, None);
    assert!(trees[4].root().is_stream());
}

#[test]
fn s6_merge_key_resolves_to_merge_tag() {
    let tree = load_resolved(b"base: &base\n  x: 1\nuse:\n  <<: *base\n  y: 2\n");
    let root = tree.content_root().expect("root node");
    let content = tree.get(root).content().to_vec();
    // Second value is the "use" mapping.
    let use_map = tree.get(content[3]);
    let inner = use_map.content().to_vec();
    let merge_key = tree.get(inner[0]);
    assert_eq!(merge_key.scalar_value(), Some("<<"));
    assert_eq!(merge_key.tag, "!!merge");
    // The merge value aliases a mapping reachable from the same root.
    let NodeData::Alias { target, .. } = &tree.get(inner[1]).data else {
        panic!("merge value should be an alias");
    };
    assert!(tree.get(*target).is_mapping());
}

#[test]
fn empty_input_yields_no_documents() {
    let mut input: &[u8] = b"";
    let mut composer = Composer::new(ComposeOptions::default());
    composer.set_input(&mut input);
    assert!(composer.compose().expect("valid input").is_none());
}

#[test]
fn bom_is_not_part_of_any_value() {
    let tree = load_resolved(b"\xEF\xBB\xBFkey: value\n");
    let root = tree.content_root().expect("root node");
    let content = tree.get(root).content().to_vec();
    assert_eq!(tree.get(content[0]).scalar_value(), Some("key"));
}

#[test]
fn utf16le_input_loads_like_utf8() {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "key: value\n".encode_utf16() {
        bytes.extend(unit.to_le_bytes());
    }
    let mut input = bytes.as_slice();
    let mut composer = Composer::new(ComposeOptions::default());
    composer.set_input(&mut input);
    let tree = composer.compose().expect("valid input").expect("a document");
    let root = tree.content_root().expect("root node");
    let content = tree.get(root).content().to_vec();
    assert_eq!(tree.get(content[1]).scalar_value(), Some("value"));
}

#[test]
fn newline_scalars_dump_in_literal_style() {
    let mut tree = Tree::new();
    let id = tree.push(Node::scalar("one\ntwo\n"));
    tree.root = id;
    let text = dump_tree(&tree);
    assert_eq!(text, "|\n  one\n  two\n");
}

#[test]
fn round_trip_is_semantically_stable() {
    let corpus: &[&[u8]] = &[
        b"key: value\n",
        b"- a\n- b\n- c\n",
        b"outer:\n  inner:\n    leaf: 1\n  other: [x, y]\n",
        b"flow: {a: 1, b: [2, 3]}\n",
        b"quoted: 'single'\ndouble: \"two\\nlines\"\n",
        b"block: |\n  line one\n  line two\n",
        b"folded: >\n  joined\n  text\n",
        b"- &a shared\n- *a\n- plain\n",
        b"nums:\n- 1\n- 2.5\n- .inf\nflags:\n- true\n- false\n- null\n",
        b"empty value:\nnext: 2\n",
    ];
    for input in corpus {
        let first = load_resolved(input);
        let dumped = round_trip(input);
        let second = load_resolved(dumped.as_bytes());
        assert!(
            semantic_eq(&first, &second, first.root, second.root, 0),
            "round trip diverged for {:?}:\n{}",
            String::from_utf8_lossy(input),
            dumped
        );
    }
}

#[test]
fn token_marks_are_monotonic() {
    let tokens = load_tokens(b"a: 1\nlist:\n- x\n- {k: v}\nblock: |\n  text\n");
    let mut last = 0;
    for token in &tokens {
        assert!(
            token.start_mark.index >= last,
            "mark went backwards at {:?}",
            token.data
        );
        last = token.start_mark.index;
    }
}

#[test]
fn emitted_output_is_accepted_by_the_scanner() {
    let dumped = round_trip(b"a: 1\nlist:\n- x\n- y\nnested:\n  inner: [1, 2]\n");
    let original = load_events(b"a: 1\nlist:\n- x\n- y\nnested:\n  inner: [1, 2]\n");
    let reloaded = load_events(dumped.as_bytes());
    let shape = |events: &[yamltree::Event]| -> Vec<u8> {
        events
            .iter()
            .map(|e| match &e.data {
                EventData::StreamStart { .. } => 1,
                EventData::StreamEnd => 2,
                EventData::DocumentStart { .. } => 3,
                EventData::DocumentEnd { .. } => 4,
                EventData::Alias { .. } => 5,
                EventData::Scalar { .. } => 6,
                EventData::SequenceStart { .. } => 7,
                EventData::SequenceEnd => 8,
                EventData::MappingStart { .. } => 9,
                EventData::MappingEnd => 10,
                EventData::TailComment => 11,
            })
            .collect()
    };
    assert_eq!(shape(&original), shape(&reloaded));
}

#[test]
fn comments_survive_a_full_round_trip() {
    let input = b"# document header\nname: demo # inline\n\nitems:\n- one\n- two\n";
    let text = round_trip(input);
    assert!(text.contains("# document header"));
    assert!(text.contains("# inline"));
    let reloaded = load_resolved(text.as_bytes());
    let first = load_resolved(input);
    assert!(semantic_eq(&first, &reloaded, first.root, reloaded.root, 0));
}

#[test]
fn multi_document_round_trip() {
    let mut input: &[u8] = b"a: 1\n---\nb: 2\n";
    let mut composer = Composer::new(ComposeOptions::default());
    composer.set_input(&mut input);
    let mut output = Vec::new();
    {
        let mut emitter = Emitter::new();
        emitter.set_output_string(&mut output);
        let mut serializer = Serializer::new(emitter, SerializeOptions::default());
        while let Some(mut tree) = composer.compose().expect("valid input") {
            Resolver::new().resolve(&mut tree).expect("resolvable");
            Desolver::default().desolve(&mut tree);
            serializer.serialize(&tree).expect("serializable");
        }
        serializer.finish().expect("flushable");
    }
    let text = String::from_utf8(output).unwrap();
    assert_eq!(text, "a: 1\n---\nb: 2\n");
}

#[test]
fn scalar_styles_are_preserved_where_requested() {
    let tree = load_resolved(b"single: 'one'\ndouble: \"two\"\nliteral: |\n  three\n");
    let mut desolved = tree.clone();
    Desolver::default().desolve(&mut desolved);
    let text = dump_tree(&desolved);
    assert_eq!(text, "single: 'one'\ndouble: \"two\"\nliteral: |\n  three\n");
}

#[test]
fn explicit_str_tag_becomes_quoting_and_custom_tags_survive() {
    // `!!str 123` is not re-inferable; the desolver trades the tag for
    // quoting. A custom tag has to stay spelled out.
    let text = round_trip(b"count: !!str 123\ncustom: !mine thing\n");
    assert!(text.contains("count: '123'"));
    assert!(text.contains("!mine thing"));
    let reloaded = load_resolved(text.as_bytes());
    let root = reloaded.content_root().expect("root node");
    let content = reloaded.get(root).content().to_vec();
    assert_eq!(reloaded.get(content[1]).tag, "!!str");
}

#[test]
fn stream_encoding_is_recorded_on_stream_nodes() {
    let mut input: &[u8] = b"a: 1\n";
    let mut composer = Composer::new(ComposeOptions::default().stream_nodes(true));
    composer.set_input(&mut input);
    let stream = composer.compose().expect("valid input").expect("stream tree");
    let NodeData::Stream { encoding } = stream.root().data else {
        panic!("expected a stream node first");
    };
    assert_eq!(encoding, Encoding::Utf8);
}

#[test]
fn sequence_styles_survive() {
    let tree = load_resolved(b"flow: [1, 2]\nblock:\n- 3\n");
    let root = tree.content_root().expect("root node");
    let content = tree.get(root).content().to_vec();
    assert!(tree.get(content[1]).style.contains(Style::FLOW));
    assert!(!tree.get(content[3]).style.contains(Style::FLOW));
}
