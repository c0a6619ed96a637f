use std::collections::VecDeque;

use crate::chars::{is_alpha, is_ascii, is_blank, is_blankz, is_bom, is_break, is_breakz, is_printable, is_space};
use crate::{
    Break, EmitterError, Encoding, Event, EventData, MappingStyle, ScalarStyle, SequenceStyle,
    TagDirective, VersionDirective, Writer, WriterError, OUTPUT_BUFFER_SIZE,
};

/// The emitter states.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
enum EmitterState {
    /// Expect STREAM-START.
    #[default]
    StreamStart,
    /// Expect the first DOCUMENT-START or STREAM-END.
    FirstDocumentStart,
    /// Expect DOCUMENT-START or STREAM-END.
    DocumentStart,
    /// Expect the content of a document.
    DocumentContent,
    /// Expect DOCUMENT-END.
    DocumentEnd,
    /// Expect the first item of a flow sequence.
    FlowSequenceFirstItem,
    /// Expect an item of a flow sequence.
    FlowSequenceItem,
    /// Expect the first key of a flow mapping.
    FlowMappingFirstKey,
    /// Expect a key of a flow mapping.
    FlowMappingKey,
    /// Expect a value for a simple key of a flow mapping.
    FlowMappingSimpleValue,
    /// Expect a value of a flow mapping.
    FlowMappingValue,
    /// Expect the first item of a block sequence.
    BlockSequenceFirstItem,
    /// Expect an item of a block sequence.
    BlockSequenceItem,
    /// Expect the first key of a block mapping.
    BlockMappingFirstKey,
    /// Expect the key of a block mapping.
    BlockMappingKey,
    /// Expect a value for a simple key of a block mapping.
    BlockMappingSimpleValue,
    /// Expect a value of a block mapping.
    BlockMappingValue,
    /// Expect nothing.
    End,
}

#[derive(Default)]
struct Analysis<'a> {
    anchor: Option<AnchorAnalysis<'a>>,
    tag: Option<TagAnalysis<'a>>,
    scalar: Option<ScalarAnalysis<'a>>,
}

struct AnchorAnalysis<'a> {
    anchor: &'a str,
    alias: bool,
}

struct TagAnalysis<'a> {
    handle: &'a str,
    suffix: &'a str,
}

struct ScalarAnalysis<'a> {
    /// The scalar value.
    value: &'a str,
    /// Does the scalar contain line breaks?
    multiline: bool,
    /// Can the scalar be expressed in the flow plain style?
    flow_plain_allowed: bool,
    /// Can the scalar be expressed in the block plain style?
    block_plain_allowed: bool,
    /// Can the scalar be expressed in the single quoted style?
    single_quoted_allowed: bool,
    /// Can the scalar be expressed in the literal or folded styles?
    block_allowed: bool,
    /// The output style.
    style: ScalarStyle,
}

/// The emitter: events in, formatted code points out.
///
/// Mirror of the parser. Up to three structural events are buffered so that
/// empty collections and simple keys can be recognized before any indicator
/// is written. Comments carried on events are written around the node they
/// belong with: head lines before it, the line comment after it, foot lines
/// after the following break.
pub struct Emitter<'w> {
    writer: Writer<'w>,
    /// If the output is in the canonical style?
    canonical: bool,
    /// The number of indentation spaces.
    best_indent: i32,
    /// The preferred width of the output lines.
    best_width: i32,
    /// Allow unescaped non-ASCII characters?
    unicode: bool,
    /// The preferred line break.
    line_break: Break,
    /// Treat `- ` as part of the indentation of a nested sequence.
    compact_seq_indent: bool,
    /// The stack of states.
    states: Vec<EmitterState>,
    /// The current emitter state.
    state: EmitterState,
    /// The event queue.
    events: VecDeque<Event>,
    /// The stack of indentation levels.
    indents: Vec<i32>,
    /// The list of tag directives.
    tag_directives: Vec<TagDirective>,
    /// The current indentation level.
    indent: i32,
    /// The current flow level.
    flow_level: i32,
    /// Is it the document root context?
    root_context: bool,
    /// Is it a sequence context?
    sequence_context: bool,
    /// Is it a mapping context?
    mapping_context: bool,
    /// Is it a simple mapping key context?
    simple_key_context: bool,
    /// The current line.
    line: i32,
    /// The current column.
    column: i32,
    /// If the last character was a whitespace?
    whitespace: bool,
    /// If the last character was an indentation character (' ', '-', '?', ':')?
    indention: bool,
    /// If an explicit document end is required?
    open_ended: i32,
    /// Comments lifted from the event being processed.
    head_comment: String,
    line_comment: String,
    foot_comment: String,
}

impl<'w> Default for Emitter<'w> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'w> Emitter<'w> {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(),
            canonical: false,
            best_indent: 0,
            best_width: 0,
            unicode: true,
            line_break: Break::default(),
            compact_seq_indent: true,
            states: Vec::with_capacity(16),
            state: EmitterState::default(),
            events: VecDeque::with_capacity(16),
            indents: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(16),
            indent: 0,
            flow_level: 0,
            root_context: false,
            sequence_context: false,
            mapping_context: false,
            simple_key_context: false,
            line: 0,
            column: 0,
            whitespace: false,
            indention: false,
            open_ended: 0,
            head_comment: String::new(),
            line_comment: String::new(),
            foot_comment: String::new(),
        }
    }

    /// Set a generic output handler.
    pub fn set_output(&mut self, output: &'w mut dyn std::io::Write) {
        self.writer.set_output(output);
    }

    /// Set a string output. The encoding is forced to UTF-8.
    pub fn set_output_string(&mut self, output: &'w mut Vec<u8>) {
        if self.writer.encoding() == Encoding::Any {
            self.writer.set_encoding(Encoding::Utf8);
        } else {
            assert_eq!(
                self.writer.encoding(),
                Encoding::Utf8,
                "cannot output UTF-16 to a string"
            );
        }
        output.clear();
        self.writer.set_output(output);
    }

    /// Set the output encoding.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.writer.set_encoding(encoding);
    }

    /// Set if the output should be in the "canonical" format.
    pub fn set_canonical(&mut self, canonical: bool) {
        self.canonical = canonical;
    }

    /// Set the indentation increment, clamped to 2..9.
    pub fn set_indent(&mut self, indent: i32) {
        self.best_indent = if 1 < indent && indent < 10 { indent } else { 2 };
    }

    /// Set the preferred line width. -1 or 0 means unlimited.
    pub fn set_width(&mut self, width: i32) {
        self.best_width = if width > 0 { width } else { -1 };
    }

    /// Set if unescaped non-ASCII characters are allowed.
    pub fn set_unicode(&mut self, unicode: bool) {
        self.unicode = unicode;
    }

    /// Set the preferred line break.
    pub fn set_break(&mut self, line_break: Break) {
        self.line_break = line_break;
    }

    /// Set whether `- ` counts as indentation of a nested block sequence.
    pub fn set_compact_seq_indent(&mut self, compact: bool) {
        self.compact_seq_indent = compact;
    }

    /// Flush buffered output through the writer.
    pub fn flush(&mut self) -> Result<(), WriterError> {
        self.writer.flush()
    }

    /// The width the serializer should assume when estimating flow layouts.
    pub(crate) fn flow_width_estimate(&self) -> i32 {
        if self.best_width > 0 {
            self.best_width
        } else {
            80
        }
    }

    fn error<T>(problem: &'static str) -> Result<T, EmitterError> {
        Err(EmitterError::Problem(problem))
    }

    /// Emit an event.
    ///
    /// The emitter buffers a bounded lookahead of structural events; output
    /// for a buffered event is produced as soon as the lookahead suffices.
    pub fn emit(&mut self, event: Event) -> Result<(), EmitterError> {
        self.events.push_back(event);
        while let Some(mut event) = self.next_processable_event() {
            self.head_comment = std::mem::take(&mut event.head_comment);
            self.line_comment = std::mem::take(&mut event.line_comment);
            self.foot_comment = std::mem::take(&mut event.foot_comment);

            if let EventData::TailComment = &event.data {
                let text = std::mem::take(&mut event.tail_comment);
                self.write_foot_comment(&text)?;
                self.clear_pending_comments();
                continue;
            }

            let tag_directives = std::mem::take(&mut self.tag_directives);
            let mut analysis = self.analyze_event(&event, &tag_directives)?;
            self.state_machine(&event, &mut analysis)?;

            // The DOCUMENT-START event populates the tag directives, and this
            // happens only once, so don't swap out the tags in that case.
            if self.tag_directives.is_empty() {
                self.tag_directives = tag_directives;
            }
            self.clear_pending_comments();
        }
        Ok(())
    }

    fn clear_pending_comments(&mut self) {
        self.head_comment.clear();
        self.line_comment.clear();
        self.foot_comment.clear();
    }

    /// Pop the next event once enough lookahead has accumulated behind it.
    fn next_processable_event(&mut self) -> Option<Event> {
        let first = self.events.front()?;

        let accumulate = match &first.data {
            EventData::DocumentStart { .. } => 1,
            EventData::SequenceStart { .. } => 2,
            EventData::MappingStart { .. } => 3,
            _ => return self.events.pop_front(),
        };

        if self.events.len() > accumulate {
            return self.events.pop_front();
        }

        let mut level = 0;
        for event in &self.events {
            match event.data {
                EventData::StreamStart { .. }
                | EventData::DocumentStart { .. }
                | EventData::SequenceStart { .. }
                | EventData::MappingStart { .. } => {
                    level += 1;
                }
                EventData::StreamEnd
                | EventData::DocumentEnd { .. }
                | EventData::SequenceEnd
                | EventData::MappingEnd => {
                    level -= 1;
                }
                _ => {}
            }
            if level == 0 {
                return self.events.pop_front();
            }
        }
        None
    }

    fn append_tag_directive(
        &mut self,
        value: TagDirective,
        allow_duplicates: bool,
    ) -> Result<(), EmitterError> {
        for tag_directive in &self.tag_directives {
            if value.handle == tag_directive.handle {
                if allow_duplicates {
                    return Ok(());
                }
                return Self::error("duplicate %TAG directive");
            }
        }
        self.tag_directives.push(value);
        Ok(())
    }

    fn increase_indent(&mut self, flow: bool, indentless: bool) {
        self.indents.push(self.indent);
        if self.indent < 0 {
            self.indent = if flow { self.best_indent } else { 0 };
        } else if !indentless {
            self.indent += self.best_indent;
        }
    }

    fn state_machine<'a>(
        &mut self,
        event: &'a Event,
        analysis: &mut Analysis<'a>,
    ) -> Result<(), EmitterError> {
        match self.state {
            EmitterState::StreamStart => self.emit_stream_start(event),
            EmitterState::FirstDocumentStart => self.emit_document_start(event, true),
            EmitterState::DocumentStart => self.emit_document_start(event, false),
            EmitterState::DocumentContent => self.emit_document_content(event, analysis),
            EmitterState::DocumentEnd => self.emit_document_end(event),
            EmitterState::FlowSequenceFirstItem => {
                self.emit_flow_sequence_item(event, true, analysis)
            }
            EmitterState::FlowSequenceItem => self.emit_flow_sequence_item(event, false, analysis),
            EmitterState::FlowMappingFirstKey => self.emit_flow_mapping_key(event, true, analysis),
            EmitterState::FlowMappingKey => self.emit_flow_mapping_key(event, false, analysis),
            EmitterState::FlowMappingSimpleValue => {
                self.emit_flow_mapping_value(event, true, analysis)
            }
            EmitterState::FlowMappingValue => self.emit_flow_mapping_value(event, false, analysis),
            EmitterState::BlockSequenceFirstItem => {
                self.emit_block_sequence_item(event, true, analysis)
            }
            EmitterState::BlockSequenceItem => {
                self.emit_block_sequence_item(event, false, analysis)
            }
            EmitterState::BlockMappingFirstKey => {
                self.emit_block_mapping_key(event, true, analysis)
            }
            EmitterState::BlockMappingKey => self.emit_block_mapping_key(event, false, analysis),
            EmitterState::BlockMappingSimpleValue => {
                self.emit_block_mapping_value(event, true, analysis)
            }
            EmitterState::BlockMappingValue => self.emit_block_mapping_value(event, false, analysis),
            EmitterState::End => Self::error("expected nothing after STREAM-END"),
        }
    }

    fn emit_stream_start(&mut self, event: &Event) -> Result<(), EmitterError> {
        self.open_ended = 0;
        if let EventData::StreamStart { encoding } = &event.data {
            if self.writer.encoding() == Encoding::Any {
                self.writer.set_encoding(*encoding);
            }
            if self.writer.encoding() == Encoding::Any {
                self.writer.set_encoding(Encoding::Utf8);
            }
            if self.best_indent < 2 || self.best_indent > 9 {
                self.best_indent = 2;
            }
            if self.best_width >= 0 && self.best_width <= self.best_indent * 2 {
                self.best_width = 80;
            }
            if self.best_width < 0 {
                self.best_width = i32::MAX;
            }
            if self.line_break == Break::Any {
                self.line_break = Break::Ln;
            }
            self.indent = -1;
            self.line = 0;
            self.column = 0;
            self.whitespace = true;
            self.indention = true;
            if self.writer.encoding() != Encoding::Utf8 {
                self.write_bom()?;
            }
            self.state = EmitterState::FirstDocumentStart;
            return Ok(());
        }
        Self::error("expected STREAM-START")
    }

    fn emit_document_start(&mut self, event: &Event, first: bool) -> Result<(), EmitterError> {
        if let EventData::DocumentStart {
            version_directive,
            tag_directives,
            implicit,
        } = &event.data
        {
            let default_tag_directives: [TagDirective; 2] = [
                TagDirective::new("!", "!"),
                TagDirective::new("!!", "tag:yaml.org,2002:"),
            ];
            let mut implicit = *implicit;
            if let Some(version_directive) = version_directive {
                Self::analyze_version_directive(*version_directive)?;
            }
            for tag_directive in tag_directives {
                Self::analyze_tag_directive(tag_directive)?;
                self.append_tag_directive(tag_directive.clone(), false)?;
            }
            for tag_directive in default_tag_directives {
                self.append_tag_directive(tag_directive, true)?;
            }
            if !first || self.canonical {
                implicit = false;
            }
            if (version_directive.is_some() || !tag_directives.is_empty()) && self.open_ended != 0 {
                self.write_indicator("...", true, false, false)?;
                self.write_indent()?;
            }
            self.open_ended = 0;
            if let Some(version_directive) = version_directive {
                implicit = false;
                self.write_indicator("%YAML", true, false, false)?;
                if version_directive.minor == 1 {
                    self.write_indicator("1.1", true, false, false)?;
                } else {
                    self.write_indicator("1.2", true, false, false)?;
                }
                self.write_indent()?;
            }
            if !tag_directives.is_empty() {
                implicit = false;
                for tag_directive in tag_directives {
                    self.write_indicator("%TAG", true, false, false)?;
                    self.write_tag_handle(&tag_directive.handle)?;
                    self.write_tag_content(&tag_directive.prefix, true)?;
                    self.write_indent()?;
                }
            }
            if self.check_empty_document() {
                implicit = false;
            }
            let wrote_head = self.process_head_comment()?;
            if !implicit {
                self.write_indent()?;
                self.write_indicator("---", true, false, false)?;
                if self.canonical {
                    self.write_indent()?;
                }
            } else if wrote_head {
                self.write_indent()?;
            }
            self.state = EmitterState::DocumentContent;
            self.open_ended = 0;
            return Ok(());
        } else if let EventData::StreamEnd = &event.data {
            if self.open_ended == 2 {
                self.write_indicator("...", true, false, false)?;
                self.open_ended = 0;
                self.write_indent()?;
            }
            self.writer.flush()?;
            self.state = EmitterState::End;
            return Ok(());
        }
        Self::error("expected DOCUMENT-START or STREAM-END")
    }

    fn emit_document_content(
        &mut self,
        event: &Event,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if let EventData::DocumentEnd { .. } = &event.data {
            // An empty document: nothing between the indicators. The start
            // indicator was already forced explicit by check_empty_document.
            return self.emit_document_end(event);
        }
        if self.process_head_comment()? {
            self.write_indent()?;
        }
        self.states.push(EmitterState::DocumentEnd);
        self.emit_node(event, true, false, false, false, analysis)
    }

    fn emit_document_end(&mut self, event: &Event) -> Result<(), EmitterError> {
        if let EventData::DocumentEnd { implicit } = &event.data {
            let implicit = *implicit;
            self.write_indent()?;
            if !implicit {
                self.write_indicator("...", true, false, false)?;
                self.open_ended = 0;
                self.write_indent()?;
            } else if self.open_ended == 0 {
                self.open_ended = 1;
            }
            self.writer.flush()?;
            self.state = EmitterState::DocumentStart;
            self.tag_directives.clear();
            return Ok(());
        }
        Self::error("expected DOCUMENT-END")
    }

    fn emit_flow_sequence_item(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("[", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::SequenceEnd = &event.data {
            self.flow_level -= 1;
            self.indent = self.indents.pop().expect("empty emitter indent stack");
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("]", false, false, false)?;
            self.process_line_comment()?;
            self.state = self.states.pop().expect("empty emitter state stack");
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        self.states.push(EmitterState::FlowSequenceItem);
        self.emit_node(event, false, true, false, false, analysis)
    }

    fn emit_flow_mapping_key(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if first {
            self.write_indicator("{", true, true, false)?;
            self.increase_indent(true, false);
            self.flow_level += 1;
        }
        if let EventData::MappingEnd = &event.data {
            assert!(!self.indents.is_empty(), "emitter indents should not be empty");
            self.flow_level -= 1;
            self.indent = self.indents.pop().expect("empty emitter indent stack");
            if self.canonical && !first {
                self.write_indicator(",", false, false, false)?;
                self.write_indent()?;
            }
            self.write_indicator("}", false, false, false)?;
            self.process_line_comment()?;
            self.state = self.states.pop().expect("empty emitter state stack");
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        if self.canonical || self.column > self.best_width {
            self.write_indent()?;
        }
        if !self.canonical && self.check_simple_key(event, analysis) {
            self.states.push(EmitterState::FlowMappingSimpleValue);
            self.emit_node(event, false, false, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(EmitterState::FlowMappingValue);
            self.emit_node(event, false, false, true, false, analysis)
        }
    }

    fn emit_flow_mapping_value(
        &mut self,
        event: &Event,
        simple: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            if self.canonical || self.column > self.best_width {
                self.write_indent()?;
            }
            self.write_indicator(":", true, false, false)?;
        }
        self.states.push(EmitterState::FlowMappingKey);
        self.emit_node(event, false, false, true, false, analysis)
    }

    fn emit_block_sequence_item(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if first {
            let indentless =
                self.compact_seq_indent && self.mapping_context && !self.indention;
            self.increase_indent(false, indentless);
        }
        if let EventData::SequenceEnd = &event.data {
            self.indent = self.indents.pop().expect("empty emitter indent stack");
            self.state = self.states.pop().expect("empty emitter state stack");
            return Ok(());
        }
        self.process_head_comment()?;
        self.write_indent()?;
        self.write_indicator("-", true, false, true)?;
        self.states.push(EmitterState::BlockSequenceItem);
        self.emit_node(event, false, true, false, false, analysis)
    }

    fn emit_block_mapping_key(
        &mut self,
        event: &Event,
        first: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if first {
            self.increase_indent(false, false);
        }
        if let EventData::MappingEnd = &event.data {
            self.indent = self.indents.pop().expect("empty emitter indent stack");
            self.state = self.states.pop().expect("empty emitter state stack");
            return Ok(());
        }
        self.process_head_comment()?;
        self.write_indent()?;
        if self.check_simple_key(event, analysis) {
            self.states.push(EmitterState::BlockMappingSimpleValue);
            self.emit_node(event, false, false, true, true, analysis)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(EmitterState::BlockMappingValue);
            self.emit_node(event, false, false, true, false, analysis)
        }
    }

    fn emit_block_mapping_value(
        &mut self,
        event: &Event,
        simple: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        self.states.push(EmitterState::BlockMappingKey);
        self.emit_node(event, false, false, true, false, analysis)
    }

    fn emit_node(
        &mut self,
        event: &Event,
        root: bool,
        sequence: bool,
        mapping: bool,
        simple_key: bool,
        analysis: &mut Analysis,
    ) -> Result<(), EmitterError> {
        self.root_context = root;
        self.sequence_context = sequence;
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;

        match event.data {
            EventData::Alias { .. } => self.emit_alias(&analysis.anchor),
            EventData::Scalar { .. } => self.emit_scalar(event, analysis),
            EventData::SequenceStart { .. } => self.emit_sequence_start(event, analysis),
            EventData::MappingStart { .. } => self.emit_mapping_start(event, analysis),
            _ => Self::error("expected SCALAR, SEQUENCE-START, MAPPING-START, or ALIAS"),
        }
    }

    fn emit_alias(&mut self, analysis: &Option<AnchorAnalysis>) -> Result<(), EmitterError> {
        self.process_anchor(analysis)?;
        if self.simple_key_context {
            self.put(' ')?;
        }
        self.process_line_comment()?;
        self.state = self.states.pop().expect("empty emitter state stack");
        Ok(())
    }

    fn emit_scalar(&mut self, event: &Event, analysis: &mut Analysis) -> Result<(), EmitterError> {
        let Analysis {
            anchor,
            tag,
            scalar: Some(scalar),
        } = analysis
        else {
            unreachable!("no scalar analysis");
        };
        self.select_scalar_style(event, scalar, tag)?;
        self.process_anchor(anchor)?;
        self.process_tag(tag)?;
        self.increase_indent(true, false);
        self.process_scalar(scalar)?;
        self.indent = self.indents.pop().expect("empty emitter indent stack");
        self.process_line_comment()?;
        self.state = self.states.pop().expect("empty emitter state stack");
        Ok(())
    }

    fn emit_sequence_start(
        &mut self,
        event: &Event,
        analysis: &Analysis,
    ) -> Result<(), EmitterError> {
        let Analysis { anchor, tag, .. } = analysis;
        self.process_anchor(anchor)?;
        self.process_tag(tag)?;

        let EventData::SequenceStart { style, .. } = &event.data else {
            unreachable!()
        };

        if self.flow_level != 0
            || self.canonical
            || *style == SequenceStyle::Flow
            || self.check_empty_sequence(event)
        {
            self.state = EmitterState::FlowSequenceFirstItem;
        } else {
            self.process_line_comment()?;
            self.state = EmitterState::BlockSequenceFirstItem;
        }
        Ok(())
    }

    fn emit_mapping_start(
        &mut self,
        event: &Event,
        analysis: &Analysis,
    ) -> Result<(), EmitterError> {
        let Analysis { anchor, tag, .. } = analysis;
        self.process_anchor(anchor)?;
        self.process_tag(tag)?;

        let EventData::MappingStart { style, .. } = &event.data else {
            unreachable!()
        };

        if self.flow_level != 0
            || self.canonical
            || *style == MappingStyle::Flow
            || self.check_empty_mapping(event)
        {
            self.state = EmitterState::FlowMappingFirstKey;
        } else {
            self.process_line_comment()?;
            self.state = EmitterState::BlockMappingFirstKey;
        }
        Ok(())
    }

    /// Is the document being opened immediately closed again?
    fn check_empty_document(&self) -> bool {
        matches!(
            self.events.front().map(|event| &event.data),
            Some(EventData::DocumentEnd { .. })
        )
    }

    fn check_empty_sequence(&self, event: &Event) -> bool {
        if self.events.is_empty() {
            return false;
        }
        let start = matches!(event.data, EventData::SequenceStart { .. });
        let end = matches!(self.events[0].data, EventData::SequenceEnd);
        start && end
    }

    fn check_empty_mapping(&self, event: &Event) -> bool {
        if self.events.is_empty() {
            return false;
        }
        let start = matches!(event.data, EventData::MappingStart { .. });
        let end = matches!(self.events[0].data, EventData::MappingEnd);
        start && end
    }

    fn check_simple_key(&self, event: &Event, analysis: &Analysis) -> bool {
        let Analysis {
            tag,
            anchor,
            scalar,
        } = analysis;

        let mut length = anchor.as_ref().map_or(0, |a| a.anchor.len())
            + tag.as_ref().map_or(0, |t| t.handle.len() + t.suffix.len());

        match event.data {
            EventData::Alias { .. } => {
                length = analysis.anchor.as_ref().map_or(0, |a| a.anchor.len());
            }
            EventData::Scalar { .. } => {
                let Some(scalar) = scalar else {
                    panic!("no analysis for scalar")
                };
                if scalar.multiline {
                    return false;
                }
                length += scalar.value.len();
            }
            EventData::SequenceStart { .. } => {
                if !self.check_empty_sequence(event) {
                    return false;
                }
            }
            EventData::MappingStart { .. } => {
                if !self.check_empty_mapping(event) {
                    return false;
                }
            }
            _ => return false,
        }

        length <= 128
    }

    fn select_scalar_style(
        &mut self,
        event: &Event,
        scalar_analysis: &mut ScalarAnalysis,
        tag_analysis: &mut Option<TagAnalysis>,
    ) -> Result<(), EmitterError> {
        let EventData::Scalar {
            plain_implicit,
            quoted_implicit,
            style,
            ..
        } = &event.data
        else {
            unreachable!()
        };
        let mut style: ScalarStyle = *style;
        let no_tag = tag_analysis.is_none();
        if no_tag && !*plain_implicit && !*quoted_implicit {
            return Self::error("neither tag nor implicit flags are specified");
        }
        if style == ScalarStyle::Any {
            style = ScalarStyle::Plain;
        }
        if self.canonical {
            style = ScalarStyle::DoubleQuoted;
        }
        if self.simple_key_context && scalar_analysis.multiline {
            style = ScalarStyle::DoubleQuoted;
        }
        if style == ScalarStyle::Plain {
            if self.flow_level != 0 && !scalar_analysis.flow_plain_allowed
                || self.flow_level == 0 && !scalar_analysis.block_plain_allowed
            {
                style = ScalarStyle::SingleQuoted;
            }
            if scalar_analysis.value.is_empty()
                && (self.flow_level != 0 || self.simple_key_context)
            {
                style = ScalarStyle::SingleQuoted;
            }
            if no_tag && !*plain_implicit {
                style = ScalarStyle::SingleQuoted;
            }
        }
        if style == ScalarStyle::SingleQuoted && !scalar_analysis.single_quoted_allowed {
            style = ScalarStyle::DoubleQuoted;
        }
        if (style == ScalarStyle::Literal || style == ScalarStyle::Folded)
            && (!scalar_analysis.block_allowed
                || self.flow_level != 0
                || self.simple_key_context)
        {
            style = ScalarStyle::DoubleQuoted;
        }
        if no_tag && !*quoted_implicit && style != ScalarStyle::Plain {
            *tag_analysis = Some(TagAnalysis {
                handle: "!",
                suffix: "",
            });
        }
        scalar_analysis.style = style;
        Ok(())
    }

    fn process_anchor(&mut self, analysis: &Option<AnchorAnalysis>) -> Result<(), EmitterError> {
        let Some(analysis) = analysis.as_ref() else {
            return Ok(());
        };
        self.write_indicator(if analysis.alias { "*" } else { "&" }, true, false, false)?;
        self.write_anchor(analysis.anchor)
    }

    fn process_tag(&mut self, analysis: &Option<TagAnalysis>) -> Result<(), EmitterError> {
        let Some(analysis) = analysis.as_ref() else {
            return Ok(());
        };
        if analysis.handle.is_empty() && analysis.suffix.is_empty() {
            return Ok(());
        }
        if analysis.handle.is_empty() {
            self.write_indicator("!<", true, false, false)?;
            self.write_tag_content(analysis.suffix, false)?;
            self.write_indicator(">", false, false, false)?;
        } else {
            self.write_tag_handle(analysis.handle)?;
            if !analysis.suffix.is_empty() {
                self.write_tag_content(analysis.suffix, false)?;
            }
        }
        Ok(())
    }

    fn process_scalar(&mut self, analysis: &ScalarAnalysis) -> Result<(), EmitterError> {
        match analysis.style {
            ScalarStyle::Plain => {
                self.write_plain_scalar(analysis.value, !self.simple_key_context)
            }
            ScalarStyle::SingleQuoted => {
                self.write_single_quoted_scalar(analysis.value, !self.simple_key_context)
            }
            ScalarStyle::DoubleQuoted => {
                self.write_double_quoted_scalar(analysis.value, !self.simple_key_context)
            }
            ScalarStyle::Literal => self.write_literal_scalar(analysis.value),
            ScalarStyle::Folded => self.write_folded_scalar(analysis.value),
            ScalarStyle::Any => unreachable!("no scalar style chosen"),
        }
    }

    /// Write pending head (and carried foot) text above the node. Returns
    /// whether anything was written, so callers outside a block collection
    /// can force a break before their content.
    fn process_head_comment(&mut self) -> Result<bool, EmitterError> {
        let mut wrote = false;
        if !self.foot_comment.is_empty() {
            let text = std::mem::take(&mut self.foot_comment);
            self.write_foot_comment(&text)?;
            wrote = true;
        }
        if !self.head_comment.is_empty() {
            let text = std::mem::take(&mut self.head_comment);
            self.write_comment_block(&text)?;
            wrote = true;
        }
        Ok(wrote)
    }

    /// Write the pending trailing comment on the current line.
    fn process_line_comment(&mut self) -> Result<(), EmitterError> {
        if self.line_comment.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.line_comment);
        if !self.whitespace {
            self.put(' ')?;
        }
        self.put('#')?;
        self.put(' ')?;
        for ch in text.chars() {
            if is_break(ch) {
                break;
            }
            self.write_char(ch)?;
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    /// Foot text: comment lines followed by a separating blank line.
    fn write_foot_comment(&mut self, text: &str) -> Result<(), EmitterError> {
        self.write_comment_block(text)?;
        self.put_break()?;
        self.put_break()?;
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_comment_block(&mut self, text: &str) -> Result<(), EmitterError> {
        for line in text.split('\n') {
            self.write_indent()?;
            self.put('#')?;
            if !line.is_empty() {
                self.put(' ')?;
                for ch in line.chars() {
                    self.write_char(ch)?;
                }
            }
            self.whitespace = false;
            self.indention = false;
        }
        Ok(())
    }

    fn analyze_version_directive(
        version_directive: VersionDirective,
    ) -> Result<(), EmitterError> {
        if version_directive.major != 1
            || version_directive.minor != 1 && version_directive.minor != 2
        {
            return Self::error("incompatible %YAML directive");
        }
        Ok(())
    }

    fn analyze_tag_directive(tag_directive: &TagDirective) -> Result<(), EmitterError> {
        if tag_directive.handle.is_empty() {
            return Self::error("tag handle must not be empty");
        }
        if !tag_directive.handle.starts_with('!') {
            return Self::error("tag handle must start with '!'");
        }
        if !tag_directive.handle.ends_with('!') {
            return Self::error("tag handle must end with '!'");
        }
        if tag_directive.handle.len() > 2 {
            let tag_content = &tag_directive.handle[1..tag_directive.handle.len() - 1];
            for ch in tag_content.chars() {
                if !is_alpha(ch) {
                    return Self::error("tag handle must contain alphanumerical characters only");
                }
            }
        }
        if tag_directive.prefix.is_empty() {
            return Self::error("tag prefix must not be empty");
        }
        Ok(())
    }

    fn analyze_anchor<'a>(
        anchor: &'a str,
        alias: bool,
    ) -> Result<AnchorAnalysis<'a>, EmitterError> {
        if anchor.is_empty() {
            return Self::error(if alias {
                "alias value must not be empty"
            } else {
                "anchor value must not be empty"
            });
        }
        for ch in anchor.chars() {
            if !is_alpha(ch) {
                return Self::error(if alias {
                    "alias value must contain alphanumerical characters only"
                } else {
                    "anchor value must contain alphanumerical characters only"
                });
            }
        }
        Ok(AnchorAnalysis { anchor, alias })
    }

    fn analyze_tag<'a>(
        tag: &'a str,
        tag_directives: &'a [TagDirective],
    ) -> Result<TagAnalysis<'a>, EmitterError> {
        if tag.is_empty() {
            return Self::error("tag value must not be empty");
        }
        let mut handle = "";
        let mut suffix = tag;
        for tag_directive in tag_directives {
            let prefix_len = tag_directive.prefix.len();
            if prefix_len < tag.len() && tag_directive.prefix == tag[0..prefix_len] {
                handle = &tag_directive.handle;
                suffix = &tag[prefix_len..];
                break;
            }
        }
        Ok(TagAnalysis { handle, suffix })
    }

    fn analyze_scalar<'a>(&self, value: &'a str) -> ScalarAnalysis<'a> {
        let mut block_indicators = false;
        let mut flow_indicators = false;
        let mut line_breaks = false;
        let mut special_characters = false;
        let mut leading_space = false;
        let mut leading_break = false;
        let mut trailing_space = false;
        let mut trailing_break = false;
        let mut break_space = false;
        let mut space_break = false;
        let mut preceded_by_whitespace;
        let mut previous_space = false;
        let mut previous_break = false;

        if value.is_empty() {
            return ScalarAnalysis {
                value: "",
                multiline: false,
                flow_plain_allowed: false,
                block_plain_allowed: true,
                single_quoted_allowed: true,
                block_allowed: false,
                style: ScalarStyle::Any,
            };
        }

        if value.starts_with("---") || value.starts_with("...") {
            block_indicators = true;
            flow_indicators = true;
        }
        preceded_by_whitespace = true;

        let mut chars = value.chars();
        let mut first = true;

        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            let followed_by_whitespace = is_blankz(next);
            if first {
                match ch {
                    '#' | ',' | '[' | ']' | '{' | '}' | '&' | '*' | '!' | '|' | '>' | '\''
                    | '"' | '%' | '@' | '`' => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    '?' | ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '-' if followed_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            } else {
                match ch {
                    ',' | '?' | '[' | ']' | '{' | '}' => {
                        flow_indicators = true;
                    }
                    ':' => {
                        flow_indicators = true;
                        if followed_by_whitespace {
                            block_indicators = true;
                        }
                    }
                    '#' if preceded_by_whitespace => {
                        flow_indicators = true;
                        block_indicators = true;
                    }
                    _ => {}
                }
            }

            if !is_printable(ch) || !is_ascii(ch) && !self.unicode {
                special_characters = true;
            }
            if is_break(ch) {
                line_breaks = true;
            }

            if is_space(ch) {
                if first {
                    leading_space = true;
                }
                if next.is_none() {
                    trailing_space = true;
                }
                if previous_break {
                    break_space = true;
                }
                previous_space = true;
                previous_break = false;
            } else if is_break(ch) {
                if first {
                    leading_break = true;
                }
                if next.is_none() {
                    trailing_break = true;
                }
                if previous_space {
                    space_break = true;
                }
                previous_space = false;
                previous_break = true;
            } else {
                previous_space = false;
                previous_break = false;
            }

            preceded_by_whitespace = is_blankz(ch);
            first = false;
        }

        let mut analysis = ScalarAnalysis {
            value,
            multiline: line_breaks,
            flow_plain_allowed: true,
            block_plain_allowed: true,
            single_quoted_allowed: true,
            block_allowed: true,
            style: ScalarStyle::Any,
        };

        if leading_space || leading_break || trailing_space || trailing_break {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if trailing_space {
            analysis.block_allowed = false;
        }
        if break_space {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
        }
        if space_break || special_characters {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
            analysis.single_quoted_allowed = false;
            analysis.block_allowed = false;
        }
        if line_breaks {
            analysis.flow_plain_allowed = false;
            analysis.block_plain_allowed = false;
        }
        if flow_indicators {
            analysis.flow_plain_allowed = false;
        }
        if block_indicators {
            analysis.block_plain_allowed = false;
        }
        analysis
    }

    fn analyze_event<'a>(
        &mut self,
        event: &'a Event,
        tag_directives: &'a [TagDirective],
    ) -> Result<Analysis<'a>, EmitterError> {
        let mut analysis = Analysis::default();
        match &event.data {
            EventData::Alias { anchor } => {
                analysis.anchor = Some(Self::analyze_anchor(anchor, true)?);
            }
            EventData::Scalar {
                anchor,
                tag,
                value,
                plain_implicit,
                quoted_implicit,
                ..
            } => {
                let (plain_implicit, quoted_implicit) = (*plain_implicit, *quoted_implicit);
                if let Some(anchor) = anchor {
                    analysis.anchor = Some(Self::analyze_anchor(anchor, false)?);
                }
                if tag.is_some() && (self.canonical || !plain_implicit && !quoted_implicit) {
                    analysis.tag = Some(Self::analyze_tag(
                        tag.as_deref().expect("tag is some"),
                        tag_directives,
                    )?);
                }
                analysis.scalar = Some(self.analyze_scalar(value));
            }
            EventData::SequenceStart {
                anchor,
                tag,
                implicit,
                ..
            }
            | EventData::MappingStart {
                anchor,
                tag,
                implicit,
                ..
            } => {
                if let Some(anchor) = anchor {
                    analysis.anchor = Some(Self::analyze_anchor(anchor, false)?);
                }
                if tag.is_some() && (self.canonical || !*implicit) {
                    analysis.tag = Some(Self::analyze_tag(
                        tag.as_deref().expect("tag is some"),
                        tag_directives,
                    )?);
                }
            }
            _ => {}
        }
        Ok(analysis)
    }

    fn flush_if_needed(&mut self) -> Result<(), WriterError> {
        if self.writer.buffered() < OUTPUT_BUFFER_SIZE - 5 {
            Ok(())
        } else {
            self.writer.flush()
        }
    }

    fn put(&mut self, ch: char) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        self.writer.push(ch);
        self.column += 1;
        Ok(())
    }

    fn put_break(&mut self) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        match self.line_break {
            Break::Cr => self.writer.push('\r'),
            Break::Any | Break::Ln => self.writer.push('\n'),
            Break::CrLn => self.writer.push_str("\r\n"),
        }
        self.column = 0;
        self.line += 1;
        Ok(())
    }

    fn write_char(&mut self, ch: char) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        self.writer.push(ch);
        self.column += 1;
        Ok(())
    }

    fn write_str(&mut self, string: &str) -> Result<(), WriterError> {
        for ch in string.chars() {
            self.write_char(ch)?;
        }
        Ok(())
    }

    fn write_break_char(&mut self, ch: char) -> Result<(), WriterError> {
        self.flush_if_needed()?;
        if ch == '\n' {
            self.put_break()?;
        } else {
            self.write_char(ch)?;
            self.column = 0;
            self.line += 1;
        }
        Ok(())
    }

    fn write_bom(&mut self) -> Result<(), EmitterError> {
        self.flush_if_needed()?;
        self.writer.push('\u{feff}');
        Ok(())
    }

    fn write_indent(&mut self) -> Result<(), EmitterError> {
        let indent = if self.indent >= 0 { self.indent } else { 0 };
        if !self.indention || self.column > indent || self.column == indent && !self.whitespace {
            self.put_break()?;
        }
        while self.column < indent {
            self.put(' ')?;
        }
        self.whitespace = true;
        self.indention = true;
        Ok(())
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        is_whitespace: bool,
        is_indention: bool,
    ) -> Result<(), EmitterError> {
        if need_whitespace && !self.whitespace {
            self.put(' ')?;
        }
        self.write_str(indicator)?;
        self.whitespace = is_whitespace;
        self.indention = self.indention && is_indention;
        Ok(())
    }

    fn write_anchor(&mut self, value: &str) -> Result<(), EmitterError> {
        self.write_str(value)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_handle(&mut self, value: &str) -> Result<(), EmitterError> {
        if !self.whitespace {
            self.put(' ')?;
        }
        self.write_str(value)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_tag_content(
        &mut self,
        value: &str,
        need_whitespace: bool,
    ) -> Result<(), EmitterError> {
        if need_whitespace && !self.whitespace {
            self.put(' ')?;
        }
        for ch in value.chars() {
            if is_alpha(ch) {
                self.write_char(ch)?;
                continue;
            }
            match ch {
                ';' | '/' | '?' | ':' | '@' | '&' | '=' | '+' | '$' | ',' | '_' | '.' | '~'
                | '*' | '\'' | '(' | ')' | '[' | ']' => {
                    self.write_char(ch)?;
                    continue;
                }
                _ => {}
            }
            // URI escape
            let mut encode_buffer = [0u8; 4];
            let encoded_char = ch.encode_utf8(&mut encode_buffer);
            for value in encoded_char.bytes() {
                let upper = (value >> 4) + if (value >> 4) < 10 { b'0' } else { b'A' - 10 };
                let lower = (value & 0x0F) + if (value & 0x0F) < 10 { b'0' } else { b'A' - 10 };
                self.put('%')?;
                self.put(char::from(upper))?;
                self.put(char::from(lower))?;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_plain_scalar(&mut self, value: &str, allow_breaks: bool) -> Result<(), EmitterError> {
        let mut spaces = false;
        let mut breaks = false;
        if !self.whitespace && (!value.is_empty() || self.flow_level != 0) {
            self.put(' ')?;
        }

        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            if is_space(ch) {
                if allow_breaks && !spaces && self.column > self.best_width && !is_space(next) {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
        }
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_single_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), EmitterError> {
        let mut spaces = false;
        let mut breaks = false;
        self.write_indicator("'", true, false, false)?;
        let mut chars = value.chars();
        let mut is_first = true;
        while let Some(ch) = chars.next() {
            let next = chars.clone().next();
            let is_last = next.is_none();

            if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && !is_first
                    && !is_last
                    && !is_space(next)
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else if is_break(ch) {
                if !breaks && ch == '\n' {
                    self.put_break()?;
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                if ch == '\'' {
                    self.put('\'')?;
                }
                self.write_char(ch)?;
                self.indention = false;
                spaces = false;
                breaks = false;
            }
            is_first = false;
        }
        if breaks {
            self.write_indent()?;
        }
        self.write_indicator("'", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_double_quoted_scalar(
        &mut self,
        value: &str,
        allow_breaks: bool,
    ) -> Result<(), EmitterError> {
        let mut spaces = false;
        self.write_indicator("\"", true, false, false)?;
        let mut chars = value.chars();
        let mut first = true;
        while let Some(ch) = chars.next() {
            if !is_printable(ch)
                || !self.unicode && !is_ascii(ch)
                || is_bom(ch)
                || is_break(ch)
                || ch == '"'
                || ch == '\\'
            {
                self.put('\\')?;
                match ch {
                    '\0' => self.put('0')?,
                    '\x07' => self.put('a')?,
                    '\x08' => self.put('b')?,
                    '\x09' => self.put('t')?,
                    '\x0A' => self.put('n')?,
                    '\x0B' => self.put('v')?,
                    '\x0C' => self.put('f')?,
                    '\x0D' => self.put('r')?,
                    '\x1B' => self.put('e')?,
                    '\x22' => self.put('"')?,
                    '\x5C' => self.put('\\')?,
                    '\u{0085}' => self.put('N')?,
                    '\u{00A0}' => self.put('_')?,
                    '\u{2028}' => self.put('L')?,
                    '\u{2029}' => self.put('P')?,
                    _ => {
                        let (prefix, width) = if ch <= '\u{00ff}' {
                            ('x', 2)
                        } else if ch <= '\u{ffff}' {
                            ('u', 4)
                        } else {
                            ('U', 8)
                        };
                        self.put(prefix)?;
                        let mut k: i32 = (width - 1) * 4;
                        let value = ch as u32;
                        while k >= 0 {
                            let digit = (value >> k) & 0x0F;
                            let digit_char = char::from_digit(digit, 16)
                                .expect("digit out of range")
                                // The escape sequences use uppercase hex.
                                .to_ascii_uppercase();
                            self.put(digit_char)?;
                            k -= 4;
                        }
                    }
                }
                spaces = false;
            } else if is_space(ch) {
                if allow_breaks
                    && !spaces
                    && self.column > self.best_width
                    && !first
                    && chars.clone().next().is_some()
                {
                    self.write_indent()?;
                    if is_space(chars.clone().next()) {
                        self.put('\\')?;
                    }
                } else {
                    self.write_char(ch)?;
                }
                spaces = true;
            } else {
                self.write_char(ch)?;
                spaces = false;
            }
            first = false;
        }
        self.write_indicator("\"", false, false, false)?;
        self.whitespace = false;
        self.indention = false;
        Ok(())
    }

    fn write_block_scalar_hints(&mut self, string: &str) -> Result<(), EmitterError> {
        let mut chomp_hint: Option<&str> = None;

        let first = string.chars().next();
        if is_space(first) || is_break(first) {
            let indent_hint =
                char::from_digit(self.best_indent as u32, 10).expect("best_indent out of range");
            let mut indent_hint_buffer = [0u8; 1];
            let indent_hint = indent_hint.encode_utf8(&mut indent_hint_buffer);
            self.write_indicator(indent_hint, false, false, false)?;
        }
        self.open_ended = 0;

        if string.is_empty() {
            chomp_hint = Some("-");
        } else {
            let mut chars_rev = string.chars().rev();
            let ch = chars_rev.next();
            let next = chars_rev.next();
            if !is_break(ch) {
                chomp_hint = Some("-");
            } else if is_breakz(next) {
                chomp_hint = Some("+");
                self.open_ended = 2;
            }
        }

        if let Some(chomp_hint) = chomp_hint {
            self.write_indicator(chomp_hint, false, false, false)?;
        }
        Ok(())
    }

    fn write_literal_scalar(&mut self, value: &str) -> Result<(), EmitterError> {
        let mut breaks = true;
        self.write_indicator("|", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.process_line_comment()?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;
        for ch in value.chars() {
            if is_break(ch) {
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                }
                self.write_char(ch)?;
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }

    fn write_folded_scalar(&mut self, value: &str) -> Result<(), EmitterError> {
        let mut breaks = true;
        let mut leading_spaces = true;
        self.write_indicator(">", true, false, false)?;
        self.write_block_scalar_hints(value)?;
        self.process_line_comment()?;
        self.put_break()?;
        self.indention = true;
        self.whitespace = true;

        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            if is_break(ch) {
                if !breaks && !leading_spaces && ch == '\n' {
                    let mut skip_breaks = chars.clone();
                    while is_break(skip_breaks.next()) {}
                    if !is_blankz(skip_breaks.next()) {
                        self.put_break()?;
                    }
                }
                self.write_break_char(ch)?;
                self.indention = true;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    leading_spaces = is_blank(ch);
                }
                if !breaks
                    && is_space(ch)
                    && !is_space(chars.clone().next())
                    && self.column > self.best_width
                {
                    self.write_indent()?;
                } else {
                    self.write_char(ch)?;
                }
                self.indention = false;
                breaks = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Event;
    use pretty_assertions::assert_eq;

    fn emit_to_string(configure: fn(&mut Emitter), events: Vec<Event>) -> String {
        let mut output = Vec::new();
        let mut emitter = Emitter::new();
        configure(&mut emitter);
        emitter.set_output_string(&mut output);
        for event in events {
            emitter.emit(event).unwrap();
        }
        String::from_utf8(output).unwrap()
    }

    fn mapping_events(pairs: &[(&str, &str)]) -> Vec<Event> {
        let mut events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::mapping_start(None, None, true, MappingStyle::Block),
        ];
        for (k, v) in pairs {
            events.push(Event::scalar(None, None, k, true, true, ScalarStyle::Plain));
            events.push(Event::scalar(None, None, v, true, true, ScalarStyle::Plain));
        }
        events.push(Event::mapping_end());
        events.push(Event::document_end(true));
        events.push(Event::stream_end());
        events
    }

    #[test]
    fn block_mapping_output() {
        let text = emit_to_string(|_| {}, mapping_events(&[("a", "1"), ("b", "2")]));
        assert_eq!(text, "a: 1\nb: 2\n");
    }

    #[test]
    fn flow_sequence_output() {
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::sequence_start(None, None, true, SequenceStyle::Flow),
            Event::scalar(None, None, "a", true, true, ScalarStyle::Plain),
            Event::scalar(None, None, "b", true, true, ScalarStyle::Plain),
            Event::sequence_end(),
            Event::document_end(true),
            Event::stream_end(),
        ];
        let text = emit_to_string(|_| {}, events);
        assert_eq!(text, "[a, b]\n");
    }

    #[test]
    fn literal_scalar_output() {
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::mapping_start(None, None, true, MappingStyle::Block),
            Event::scalar(None, None, "text", true, true, ScalarStyle::Plain),
            Event::scalar(None, None, "one\ntwo\n", true, true, ScalarStyle::Literal),
            Event::mapping_end(),
            Event::document_end(true),
            Event::stream_end(),
        ];
        let text = emit_to_string(|_| {}, events);
        assert_eq!(text, "text: |\n  one\n  two\n");
    }

    #[test]
    fn out_of_range_indent_is_clamped() {
        let events = mapping_events(&[("a", "x")]);
        let text = emit_to_string(
            |emitter| {
                emitter.set_indent(1);
            },
            events,
        );
        assert_eq!(text, "a: x\n");
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::mapping_start(None, None, true, MappingStyle::Block),
            Event::scalar(None, None, "a", true, true, ScalarStyle::Plain),
            Event::sequence_start(None, None, true, SequenceStyle::Block),
            Event::scalar(None, None, "x", true, true, ScalarStyle::Plain),
            Event::sequence_end(),
            Event::mapping_end(),
            Event::document_end(true),
            Event::stream_end(),
        ];
        let text = emit_to_string(
            |emitter| {
                emitter.set_indent(10);
            },
            events,
        );
        assert_eq!(text, "a:\n- x\n");
    }

    #[test]
    fn non_compact_sequence_indents_under_key() {
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::mapping_start(None, None, true, MappingStyle::Block),
            Event::scalar(None, None, "a", true, true, ScalarStyle::Plain),
            Event::sequence_start(None, None, true, SequenceStyle::Block),
            Event::scalar(None, None, "x", true, true, ScalarStyle::Plain),
            Event::sequence_end(),
            Event::mapping_end(),
            Event::document_end(true),
            Event::stream_end(),
        ];
        let text = emit_to_string(
            |emitter| {
                emitter.set_compact_seq_indent(false);
            },
            events,
        );
        assert_eq!(text, "a:\n  - x\n");
    }

    #[test]
    fn explicit_document_markers() {
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], false),
            Event::scalar(None, None, "x", true, true, ScalarStyle::Plain),
            Event::document_end(false),
            Event::stream_end(),
        ];
        let text = emit_to_string(|_| {}, events);
        assert_eq!(text, "--- x\n...\n");
    }

    #[test]
    fn second_document_is_always_explicit() {
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::scalar(None, None, "a", true, true, ScalarStyle::Plain),
            Event::document_end(true),
            Event::document_start(None, &[], true),
            Event::scalar(None, None, "b", true, true, ScalarStyle::Plain),
            Event::document_end(true),
            Event::stream_end(),
        ];
        let text = emit_to_string(|_| {}, events);
        assert_eq!(text, "a\n--- b\n");
    }

    #[test]
    fn empty_document_start_is_made_explicit() {
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::document_end(true),
            Event::stream_end(),
        ];
        let text = emit_to_string(|_| {}, events);
        assert_eq!(text, "---\n");
    }

    #[test]
    fn canonical_forces_quoting_and_flow() {
        let text = emit_to_string(
            |emitter| emitter.set_canonical(true),
            mapping_events(&[("a", "1")]),
        );
        assert!(text.contains("\"a\""));
        assert!(text.contains('{'));
    }

    #[test]
    fn anchor_and_alias_output() {
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::sequence_start(None, None, true, SequenceStyle::Block),
            Event::scalar(Some("a"), None, "foo", true, true, ScalarStyle::Plain),
            Event::alias("a"),
            Event::sequence_end(),
            Event::document_end(true),
            Event::stream_end(),
        ];
        let text = emit_to_string(|_| {}, events);
        assert_eq!(text, "- &a foo\n- *a\n");
    }

    #[test]
    fn comments_are_rendered_around_entries() {
        let mut key = Event::scalar(None, None, "a", true, true, ScalarStyle::Plain);
        key.head_comment = String::from("above");
        let mut value = Event::scalar(None, None, "1", true, true, ScalarStyle::Plain);
        value.line_comment = String::from("beside");
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::mapping_start(None, None, true, MappingStyle::Block),
            key,
            value,
            Event::mapping_end(),
            Event::document_end(true),
            Event::stream_end(),
        ];
        let text = emit_to_string(|_| {}, events);
        assert_eq!(text, "# above\na: 1 # beside\n");
    }

    #[test]
    fn crlf_line_breaks() {
        let text = emit_to_string(
            |emitter| emitter.set_break(Break::CrLn),
            mapping_events(&[("a", "1")]),
        );
        assert_eq!(text, "a: 1\r\n");
    }

    #[test]
    fn width_folds_long_plain_scalars() {
        let long = "word ".repeat(30);
        let events = vec![
            Event::stream_start(Encoding::Utf8),
            Event::document_start(None, &[], true),
            Event::scalar(None, None, long.trim_end(), true, true, ScalarStyle::Plain),
            Event::document_end(true),
            Event::stream_end(),
        ];
        let text = emit_to_string(|emitter| emitter.set_width(40), events);
        assert!(text.trim_end().contains('\n'));
    }
}
