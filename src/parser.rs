use crate::{
    Encoding, Event, EventData, MappingStyle, Mark, ParserError, ScalarStyle, Scanner,
    SequenceStyle, TagDirective, Token, TokenData, VersionDirective,
};

/// The states of the parser.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum ParserState {
    /// Expect STREAM-START.
    #[default]
    StreamStart,
    /// Expect the beginning of an implicit document.
    ImplicitDocumentStart,
    /// Expect DOCUMENT-START.
    DocumentStart,
    /// Expect the content of a document.
    DocumentContent,
    /// Expect DOCUMENT-END.
    DocumentEnd,
    /// Expect a block node.
    BlockNode,
    /// Expect a block node or indentless sequence.
    BlockNodeOrIndentlessSequence,
    /// Expect a flow node.
    FlowNode,
    /// Expect the first entry of a block sequence.
    BlockSequenceFirstEntry,
    /// Expect an entry of a block sequence.
    BlockSequenceEntry,
    /// Expect an entry of an indentless sequence.
    IndentlessSequenceEntry,
    /// Expect the first key of a block mapping.
    BlockMappingFirstKey,
    /// Expect a block mapping key.
    BlockMappingKey,
    /// Expect a block mapping value.
    BlockMappingValue,
    /// Expect the first entry of a flow sequence.
    FlowSequenceFirstEntry,
    /// Expect an entry of a flow sequence.
    FlowSequenceEntry,
    /// Expect a key of an ordered mapping.
    FlowSequenceEntryMappingKey,
    /// Expect a value of an ordered mapping.
    FlowSequenceEntryMappingValue,
    /// Expect the end of an ordered mapping entry.
    FlowSequenceEntryMappingEnd,
    /// Expect the first key of a flow mapping.
    FlowMappingFirstKey,
    /// Expect a key of a flow mapping.
    FlowMappingKey,
    /// Expect a value of a flow mapping.
    FlowMappingValue,
    /// Expect an empty value of a flow mapping.
    FlowMappingEmptyValue,
    /// Expect nothing.
    End,
}

/// The parser: tokens in, events out.
///
/// An LL(1)-style pushdown machine over the scanner's token stream. Alias,
/// anchor and tag tokens accumulate onto the next scalar or collection-start
/// event, and comments collected by the scanner are folded onto the events
/// they belong with.
pub struct Parser<'r> {
    pub(crate) scanner: Scanner<'r>,
    /// The parser states stack.
    states: Vec<ParserState>,
    /// The current parser state.
    state: ParserState,
    /// The stack of marks.
    marks: Vec<Mark>,
    /// The list of TAG directives.
    tag_directives: Vec<TagDirective>,
    /// Has the single STREAM-END event been returned?
    stream_end_emitted: bool,
}

impl<'r> Default for Parser<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Parser<'r> {
    /// Create a parser.
    pub fn new() -> Parser<'r> {
        Parser {
            scanner: Scanner::new(),
            states: Vec::with_capacity(16),
            state: ParserState::default(),
            marks: Vec::with_capacity(16),
            tag_directives: Vec::with_capacity(16),
            stream_end_emitted: false,
        }
    }

    /// Set a generic input handler.
    pub fn set_input(&mut self, input: &'r mut dyn std::io::Read) {
        self.scanner.set_input(input);
    }

    /// Set the source encoding, overriding detection.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.scanner.set_encoding(encoding);
    }

    /// Parse the input stream and produce the next parsing event.
    ///
    /// Call the function subsequently to produce a sequence of events
    /// corresponding to the input stream. The initial event is STREAM-START;
    /// the final one is STREAM-END, produced exactly once. Parsing past
    /// STREAM-END is an error.
    ///
    /// An application must not alternate calls of [`Parser::parse`] with
    /// calls of [`Scanner::scan`](crate::Scanner::scan) or
    /// [`Composer::compose`](crate::Composer::compose) on the same stream.
    pub fn parse(&mut self) -> Result<Event, ParserError> {
        if self.stream_end_emitted {
            return Err(ParserError::EndOfStream);
        }
        let mut event = self.state_machine()?;
        if matches!(event.data, EventData::StreamEnd) {
            self.stream_end_emitted = true;
        }
        if !matches!(event.data, EventData::TailComment) {
            let inclusive = matches!(
                event.data,
                EventData::Scalar { .. } | EventData::Alias { .. }
            );
            self.scanner.drain_comments(
                event.start_mark.index,
                inclusive,
                &mut event.head_comment,
                &mut event.line_comment,
                &mut event.foot_comment,
            );
        }
        Ok(event)
    }

    fn peek_token(&mut self) -> Result<&Token, ParserError> {
        if !self.scanner.token_available {
            self.scanner.fetch_more_tokens()?;
        }
        if !self.scanner.token_available {
            return Err(ParserError::UnexpectedEof);
        }
        Ok(self
            .scanner
            .tokens
            .front()
            .expect("token_available is true, but token queue is empty"))
    }

    fn peek_token_mut(&mut self) -> Result<&mut Token, ParserError> {
        if !self.scanner.token_available {
            self.scanner.fetch_more_tokens()?;
        }
        if !self.scanner.token_available {
            return Err(ParserError::UnexpectedEof);
        }
        Ok(self
            .scanner
            .tokens
            .front_mut()
            .expect("token_available is true, but token queue is empty"))
    }

    fn skip_token(&mut self) {
        self.scanner.token_available = false;
        self.scanner.tokens_parsed += 1;
        let skipped = self
            .scanner
            .tokens
            .pop_front()
            .expect("skipped token past end of stream");
        self.scanner.stream_end_produced = matches!(skipped.data, TokenData::StreamEnd);
    }

    fn error<T>(problem: &'static str, mark: Mark) -> Result<T, ParserError> {
        Err(ParserError::Problem { problem, mark })
    }

    fn error_with_context<T>(
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    ) -> Result<T, ParserError> {
        Err(ParserError::ProblemWithContext {
            context,
            context_mark,
            problem,
            mark,
        })
    }

    fn state_machine(&mut self) -> Result<Event, ParserError> {
        match self.state {
            ParserState::StreamStart => self.parse_stream_start(),
            ParserState::ImplicitDocumentStart => self.parse_document_start(true),
            ParserState::DocumentStart => self.parse_document_start(false),
            ParserState::DocumentContent => self.parse_document_content(),
            ParserState::DocumentEnd => self.parse_document_end(),
            ParserState::BlockNode => self.parse_node(true, false),
            ParserState::BlockNodeOrIndentlessSequence => self.parse_node(true, true),
            ParserState::FlowNode => self.parse_node(false, false),
            ParserState::BlockSequenceFirstEntry => self.parse_block_sequence_entry(true),
            ParserState::BlockSequenceEntry => self.parse_block_sequence_entry(false),
            ParserState::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            ParserState::BlockMappingFirstKey => self.parse_block_mapping_key(true),
            ParserState::BlockMappingKey => self.parse_block_mapping_key(false),
            ParserState::BlockMappingValue => self.parse_block_mapping_value(),
            ParserState::FlowSequenceFirstEntry => self.parse_flow_sequence_entry(true),
            ParserState::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            ParserState::FlowSequenceEntryMappingKey => {
                self.parse_flow_sequence_entry_mapping_key()
            }
            ParserState::FlowSequenceEntryMappingValue => {
                self.parse_flow_sequence_entry_mapping_value()
            }
            ParserState::FlowSequenceEntryMappingEnd => {
                self.parse_flow_sequence_entry_mapping_end()
            }
            ParserState::FlowMappingFirstKey => self.parse_flow_mapping_key(true),
            ParserState::FlowMappingKey => self.parse_flow_mapping_key(false),
            ParserState::FlowMappingValue => self.parse_flow_mapping_value(false),
            ParserState::FlowMappingEmptyValue => self.parse_flow_mapping_value(true),
            ParserState::End => Self::error("no more events can be produced", Mark::default()),
        }
    }

    fn parse_stream_start(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::StreamStart { encoding } = &token.data {
            let event = Event::at(
                EventData::StreamStart {
                    encoding: *encoding,
                },
                token.start_mark,
                token.end_mark,
            );
            self.state = ParserState::ImplicitDocumentStart;
            self.skip_token();
            Ok(event)
        } else {
            let mark = token.start_mark;
            Self::error("did not find expected <stream-start>", mark)
        }
    }

    fn parse_document_start(&mut self, implicit: bool) -> Result<Event, ParserError> {
        let mut version_directive: Option<VersionDirective> = None;
        let mut tag_directives = vec![];
        let mut token = self.peek_token()?;
        if !implicit {
            while let TokenData::DocumentEnd = &token.data {
                self.skip_token();
                token = self.peek_token()?;
            }
        }
        if implicit
            && !matches!(
                token.data,
                TokenData::VersionDirective { .. }
                    | TokenData::TagDirective { .. }
                    | TokenData::DocumentStart
                    | TokenData::StreamEnd
            )
        {
            let event = Event::at(
                EventData::DocumentStart {
                    version_directive: None,
                    tag_directives: vec![],
                    implicit: true,
                },
                token.start_mark,
                token.end_mark,
            );
            self.process_directives(None, None)?;
            self.states.push(ParserState::DocumentEnd);
            self.state = ParserState::BlockNode;
            Ok(event)
        } else if !matches!(token.data, TokenData::StreamEnd) {
            let start_mark: Mark = token.start_mark;
            self.process_directives(Some(&mut version_directive), Some(&mut tag_directives))?;
            let token = self.peek_token()?;
            if let TokenData::DocumentStart = token.data {
                let end_mark = token.end_mark;
                let event = Event::at(
                    EventData::DocumentStart {
                        version_directive,
                        tag_directives: core::mem::take(&mut tag_directives),
                        implicit: false,
                    },
                    start_mark,
                    end_mark,
                );
                self.states.push(ParserState::DocumentEnd);
                self.state = ParserState::DocumentContent;
                self.skip_token();
                Ok(event)
            } else {
                Self::error("did not find expected <document start>", token.start_mark)
            }
        } else {
            let event = Event::at(EventData::StreamEnd, token.start_mark, token.end_mark);
            self.state = ParserState::End;
            self.skip_token();
            Ok(event)
        }
    }

    fn parse_document_content(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::VersionDirective { .. }
        | TokenData::TagDirective { .. }
        | TokenData::DocumentStart
        | TokenData::DocumentEnd
        | TokenData::StreamEnd = &token.data
        {
            let mark = token.start_mark;
            self.state = self.states.pop().expect("empty parser state stack");
            Ok(Self::empty_scalar(mark))
        } else {
            self.parse_node(true, false)
        }
    }

    fn parse_document_end(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let start_mark = token.start_mark;
        let mut end_mark = start_mark;
        let mut implicit = true;
        if let TokenData::DocumentEnd = &token.data {
            end_mark = token.end_mark;
            self.skip_token();
            implicit = false;
        }
        self.tag_directives.clear();
        self.state = ParserState::DocumentStart;
        Ok(Event::at(
            EventData::DocumentEnd { implicit },
            start_mark,
            end_mark,
        ))
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event, ParserError> {
        let mut anchor: Option<String> = None;
        let mut tag_handle: Option<String> = None;
        let mut tag_suffix: Option<String> = None;
        let mut tag: Option<String> = None;
        let mut tag_mark = Mark::default();

        let mut token = self.peek_token_mut()?;

        if let TokenData::Alias { value } = &mut token.data {
            let event = Event::at(
                EventData::Alias {
                    anchor: core::mem::take(value),
                },
                token.start_mark,
                token.end_mark,
            );
            self.state = self.states.pop().expect("empty parser state stack");
            self.skip_token();
            return Ok(event);
        }

        let mut start_mark = token.start_mark;
        let mut end_mark = token.start_mark;
        if let TokenData::Anchor { value } = &mut token.data {
            anchor = Some(core::mem::take(value));
            start_mark = token.start_mark;
            end_mark = token.end_mark;
            self.skip_token();
            token = self.peek_token_mut()?;
            if let TokenData::Tag { handle, suffix } = &mut token.data {
                tag_handle = Some(core::mem::take(handle));
                tag_suffix = Some(core::mem::take(suffix));
                tag_mark = token.start_mark;
                end_mark = token.end_mark;
                self.skip_token();
            }
        } else if let TokenData::Tag { handle, suffix } = &mut token.data {
            tag_handle = Some(core::mem::take(handle));
            tag_suffix = Some(core::mem::take(suffix));
            tag_mark = token.start_mark;
            start_mark = tag_mark;
            end_mark = token.end_mark;
            self.skip_token();
            token = self.peek_token_mut()?;
            if let TokenData::Anchor { value } = &mut token.data {
                anchor = Some(core::mem::take(value));
                end_mark = token.end_mark;
                self.skip_token();
            }
        }

        if let Some(ref tag_handle_value) = tag_handle {
            if tag_handle_value.is_empty() {
                tag = tag_suffix;
            } else {
                for tag_directive in &self.tag_directives {
                    if tag_directive.handle == *tag_handle_value {
                        let suffix = tag_suffix.as_deref().unwrap_or("");
                        tag = Some(format!("{}{}", tag_directive.prefix, suffix));
                        break;
                    }
                }
                if tag.is_none() {
                    return Self::error_with_context(
                        "while parsing a node",
                        start_mark,
                        "found undefined tag handle",
                        tag_mark,
                    );
                }
            }
        }

        let token = self.peek_token_mut()?;
        let implicit = tag.is_none() || tag.as_deref() == Some("");

        if indentless_sequence && matches!(token.data, TokenData::BlockEntry) {
            end_mark = token.end_mark;
            self.state = ParserState::IndentlessSequenceEntry;
            return Ok(Event::at(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Block,
                },
                start_mark,
                end_mark,
            ));
        }
        if let TokenData::Scalar { value, style } = &mut token.data {
            let mut plain_implicit = false;
            let mut quoted_implicit = false;
            end_mark = token.end_mark;
            if *style == ScalarStyle::Plain && tag.is_none() || tag.as_deref() == Some("!") {
                plain_implicit = true;
            } else if tag.is_none() {
                quoted_implicit = true;
            }
            let event = Event::at(
                EventData::Scalar {
                    anchor,
                    tag,
                    value: core::mem::take(value),
                    plain_implicit,
                    quoted_implicit,
                    style: *style,
                },
                start_mark,
                end_mark,
            );
            self.state = self.states.pop().expect("empty parser state stack");
            self.skip_token();
            return Ok(event);
        }
        if matches!(token.data, TokenData::FlowSequenceStart) {
            end_mark = token.end_mark;
            self.state = ParserState::FlowSequenceFirstEntry;
            return Ok(Event::at(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Flow,
                },
                start_mark,
                end_mark,
            ));
        }
        if matches!(token.data, TokenData::FlowMappingStart) {
            end_mark = token.end_mark;
            self.state = ParserState::FlowMappingFirstKey;
            return Ok(Event::at(
                EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: MappingStyle::Flow,
                },
                start_mark,
                end_mark,
            ));
        }
        if block && matches!(token.data, TokenData::BlockSequenceStart) {
            end_mark = token.end_mark;
            self.state = ParserState::BlockSequenceFirstEntry;
            return Ok(Event::at(
                EventData::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    style: SequenceStyle::Block,
                },
                start_mark,
                end_mark,
            ));
        }
        if block && matches!(token.data, TokenData::BlockMappingStart) {
            end_mark = token.end_mark;
            self.state = ParserState::BlockMappingFirstKey;
            return Ok(Event::at(
                EventData::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    style: MappingStyle::Block,
                },
                start_mark,
                end_mark,
            ));
        }
        if anchor.is_some() || tag.is_some() {
            self.state = self.states.pop().expect("empty parser state stack");
            return Ok(Event::at(
                EventData::Scalar {
                    anchor,
                    tag,
                    value: String::new(),
                    plain_implicit: implicit,
                    quoted_implicit: false,
                    style: ScalarStyle::Plain,
                },
                start_mark,
                end_mark,
            ));
        }
        Self::error_with_context(
            if block {
                "while parsing a block node"
            } else {
                "while parsing a flow node"
            },
            start_mark,
            "did not find expected node content",
            token.start_mark,
        )
    }

    fn parse_block_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let token = self.peek_token()?;
        if let TokenData::BlockEntry = &token.data {
            let mark: Mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(token.data, TokenData::BlockEntry | TokenData::BlockEnd) {
                self.state = ParserState::BlockSequenceEntry;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::BlockSequenceEntry);
                self.parse_node(true, false)
            }
        } else if let TokenData::BlockEnd = token.data {
            let start_mark = token.start_mark;
            let end_mark = token.end_mark;
            if self.scanner.has_foot_comment_before(start_mark.index) {
                let text = self.scanner.take_foot_comments(start_mark.index);
                let mut event = Event::at(EventData::TailComment, start_mark, start_mark);
                event.tail_comment = text;
                return Ok(event);
            }
            let event = Event::at(EventData::SequenceEnd, start_mark, end_mark);
            self.state = self.states.pop().expect("empty parser state stack");
            let _ = self.marks.pop();
            self.skip_token();
            Ok(event)
        } else {
            let token_mark = token.start_mark;
            let mark = self.marks.pop().expect("empty parser mark stack");
            Self::error_with_context(
                "while parsing a block collection",
                mark,
                "did not find expected '-' indicator",
                token_mark,
            )
        }
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::BlockEntry = token.data {
            let mark: Mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::BlockEntry | TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::IndentlessSequenceEntry;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::IndentlessSequenceEntry);
                self.parse_node(true, false)
            }
        } else {
            let event = Event::at(EventData::SequenceEnd, token.start_mark, token.end_mark);
            self.state = self.states.pop().expect("empty parser state stack");
            Ok(event)
        }
    }

    fn parse_block_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let token = self.peek_token()?;
        if let TokenData::Key = token.data {
            let mark: Mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::BlockMappingValue;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::BlockMappingValue);
                self.parse_node(true, true)
            }
        } else if let TokenData::BlockEnd = token.data {
            let start_mark = token.start_mark;
            let end_mark = token.end_mark;
            if self.scanner.has_foot_comment_before(start_mark.index) {
                let text = self.scanner.take_foot_comments(start_mark.index);
                let mut event = Event::at(EventData::TailComment, start_mark, start_mark);
                event.tail_comment = text;
                return Ok(event);
            }
            let event = Event::at(EventData::MappingEnd, start_mark, end_mark);
            self.state = self.states.pop().expect("empty parser state stack");
            let _ = self.marks.pop();
            self.skip_token();
            Ok(event)
        } else {
            let token_mark = token.start_mark;
            let mark = self.marks.pop().expect("empty parser mark stack");
            Self::error_with_context(
                "while parsing a block mapping",
                mark,
                "did not find expected key",
                token_mark,
            )
        }
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::Value = token.data {
            let mark: Mark = token.end_mark;
            self.skip_token();
            let token = self.peek_token()?;
            if matches!(
                token.data,
                TokenData::Key | TokenData::Value | TokenData::BlockEnd
            ) {
                self.state = ParserState::BlockMappingKey;
                Ok(Self::empty_scalar(mark))
            } else {
                self.states.push(ParserState::BlockMappingKey);
                self.parse_node(true, true)
            }
        } else {
            let mark = token.start_mark;
            self.state = ParserState::BlockMappingKey;
            Ok(Self::empty_scalar(mark))
        }
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowSequenceEnd) {
            if !first {
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                    token = self.peek_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.marks.pop().expect("empty parser mark stack");
                    return Self::error_with_context(
                        "while parsing a flow sequence",
                        mark,
                        "did not find expected ',' or ']'",
                        token_mark,
                    );
                }
            }
            if let TokenData::Key = token.data {
                let event = Event::at(
                    EventData::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        style: MappingStyle::Flow,
                    },
                    token.start_mark,
                    token.end_mark,
                );
                self.state = ParserState::FlowSequenceEntryMappingKey;
                self.skip_token();
                return Ok(event);
            } else if !matches!(token.data, TokenData::FlowSequenceEnd) {
                self.states.push(ParserState::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let event = Event::at(EventData::SequenceEnd, token.start_mark, token.end_mark);
        self.state = self.states.pop().expect("empty parser state stack");
        let _ = self.marks.pop();
        self.skip_token();
        Ok(event)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if matches!(
            token.data,
            TokenData::Value | TokenData::FlowEntry | TokenData::FlowSequenceEnd
        ) {
            let mark: Mark = token.end_mark;
            self.skip_token();
            self.state = ParserState::FlowSequenceEntryMappingValue;
            Ok(Self::empty_scalar(mark))
        } else {
            self.states.push(ParserState::FlowSequenceEntryMappingValue);
            self.parse_node(false, false)
        }
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if let TokenData::Value = token.data {
            self.skip_token();
            let token = self.peek_token()?;
            if !matches!(
                token.data,
                TokenData::FlowEntry | TokenData::FlowSequenceEnd
            ) {
                self.states.push(ParserState::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
            let mark = token.start_mark;
            self.state = ParserState::FlowSequenceEntryMappingEnd;
            Ok(Self::empty_scalar(mark))
        } else {
            let mark = token.start_mark;
            self.state = ParserState::FlowSequenceEntryMappingEnd;
            Ok(Self::empty_scalar(mark))
        }
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        let start_mark = token.start_mark;
        let end_mark = token.end_mark;
        self.state = ParserState::FlowSequenceEntry;
        Ok(Event::at(EventData::MappingEnd, start_mark, end_mark))
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event, ParserError> {
        if first {
            let token = self.peek_token()?;
            let mark = token.start_mark;
            self.marks.push(mark);
            self.skip_token();
        }

        let mut token = self.peek_token()?;
        if !matches!(token.data, TokenData::FlowMappingEnd) {
            if !first {
                if let TokenData::FlowEntry = token.data {
                    self.skip_token();
                    token = self.peek_token()?;
                } else {
                    let token_mark = token.start_mark;
                    let mark = self.marks.pop().expect("empty parser mark stack");
                    return Self::error_with_context(
                        "while parsing a flow mapping",
                        mark,
                        "did not find expected ',' or '}'",
                        token_mark,
                    );
                }
            }
            if let TokenData::Key = token.data {
                self.skip_token();
                let token = self.peek_token()?;
                if !matches!(
                    token.data,
                    TokenData::Value | TokenData::FlowEntry | TokenData::FlowMappingEnd
                ) {
                    self.states.push(ParserState::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                let mark = token.start_mark;
                self.state = ParserState::FlowMappingValue;
                return Ok(Self::empty_scalar(mark));
            } else if !matches!(token.data, TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let event = Event::at(EventData::MappingEnd, token.start_mark, token.end_mark);
        self.state = self.states.pop().expect("empty parser state stack");
        let _ = self.marks.pop();
        self.skip_token();
        Ok(event)
    }

    fn parse_flow_mapping_value(&mut self, empty: bool) -> Result<Event, ParserError> {
        let token = self.peek_token()?;
        if empty {
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            return Ok(Self::empty_scalar(mark));
        }
        if let TokenData::Value = token.data {
            self.skip_token();
            let token = self.peek_token()?;
            if !matches!(token.data, TokenData::FlowEntry | TokenData::FlowMappingEnd) {
                self.states.push(ParserState::FlowMappingKey);
                return self.parse_node(false, false);
            }
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            Ok(Self::empty_scalar(mark))
        } else {
            let mark = token.start_mark;
            self.state = ParserState::FlowMappingKey;
            Ok(Self::empty_scalar(mark))
        }
    }

    fn empty_scalar(mark: Mark) -> Event {
        Event::at(
            EventData::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            mark,
            mark,
        )
    }

    fn process_directives(
        &mut self,
        version_directive_ref: Option<&mut Option<VersionDirective>>,
        tag_directives_ref: Option<&mut Vec<TagDirective>>,
    ) -> Result<(), ParserError> {
        let default_tag_directives: [TagDirective; 2] = [
            TagDirective::new("!", "!"),
            TagDirective::new("!!", "tag:yaml.org,2002:"),
        ];
        let mut version_directive: Option<VersionDirective> = None;
        let mut tag_directives = Vec::with_capacity(16);

        let mut token = self.peek_token_mut()?;
        loop {
            if !matches!(
                token.data,
                TokenData::VersionDirective { .. } | TokenData::TagDirective { .. }
            ) {
                break;
            }
            if let TokenData::VersionDirective { major, minor } = &token.data {
                let mark = token.start_mark;
                if version_directive.is_some() {
                    return Self::error("found duplicate %YAML directive", mark);
                } else if *major != 1 || *minor != 1 && *minor != 2 {
                    return Self::error("found incompatible YAML document", mark);
                }
                version_directive = Some(VersionDirective {
                    major: *major,
                    minor: *minor,
                });
            } else if let TokenData::TagDirective { handle, prefix } = &mut token.data {
                let value = TagDirective {
                    handle: core::mem::take(handle),
                    prefix: core::mem::take(prefix),
                };
                let mark = token.start_mark;
                self.append_tag_directive(value.clone(), false, mark)?;
                tag_directives.push(value);
            }
            self.skip_token();
            token = self.peek_token_mut()?;
        }

        let start_mark = token.start_mark;
        for default_tag_directive in default_tag_directives {
            self.append_tag_directive(default_tag_directive, true, start_mark)?;
        }

        if let Some(version_directive_ref) = version_directive_ref {
            *version_directive_ref = version_directive;
        }
        if let Some(tag_directives_ref) = tag_directives_ref {
            *tag_directives_ref = tag_directives;
        }
        Ok(())
    }

    fn append_tag_directive(
        &mut self,
        value: TagDirective,
        allow_duplicates: bool,
        mark: Mark,
    ) -> Result<(), ParserError> {
        for tag_directive in &self.tag_directives {
            if value.handle == tag_directive.handle {
                if allow_duplicates {
                    return Ok(());
                }
                return Self::error("found duplicate %TAG directive", mark);
            }
        }
        self.tag_directives.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_all(mut input: &[u8]) -> Vec<Event> {
        let mut parser = Parser::new();
        parser.set_input(&mut input);
        let mut events = Vec::new();
        loop {
            let event = parser.parse().unwrap();
            let done = matches!(event.data, EventData::StreamEnd);
            events.push(event);
            if done {
                return events;
            }
        }
    }

    fn data_of(events: &[Event]) -> Vec<&EventData> {
        events.iter().map(|e| &e.data).collect()
    }

    #[test]
    fn simple_mapping_event_stream() {
        let events = parse_all(b"key: value\n");
        let data = data_of(&events);
        assert_eq!(data.len(), 8);
        assert!(matches!(data[0], EventData::StreamStart { .. }));
        assert!(matches!(
            data[1],
            EventData::DocumentStart { implicit: true, .. }
        ));
        assert!(matches!(
            data[2],
            EventData::MappingStart {
                implicit: true,
                style: MappingStyle::Block,
                ..
            }
        ));
        assert!(
            matches!(data[3], EventData::Scalar { value, style: ScalarStyle::Plain, .. } if value == "key")
        );
        assert!(
            matches!(data[4], EventData::Scalar { value, style: ScalarStyle::Plain, .. } if value == "value")
        );
        assert!(matches!(data[5], EventData::MappingEnd));
        assert!(matches!(
            data[6],
            EventData::DocumentEnd { implicit: true }
        ));
        assert!(matches!(data[7], EventData::StreamEnd));
    }

    #[test]
    fn parse_is_an_error_after_stream_end() {
        let mut input: &[u8] = b"a\n";
        let mut parser = Parser::new();
        parser.set_input(&mut input);
        loop {
            if matches!(parser.parse().unwrap().data, EventData::StreamEnd) {
                break;
            }
        }
        assert!(matches!(parser.parse(), Err(ParserError::EndOfStream)));
    }

    #[test]
    fn multi_document_with_version_directive() {
        let events = parse_all(b"%YAML 1.2\n---\na: 1\n---\nb: 2\n");
        let versions: Vec<_> = events
            .iter()
            .filter_map(|e| match &e.data {
                EventData::DocumentStart {
                    version_directive, ..
                } => Some(*version_directive),
                _ => None,
            })
            .collect();
        assert_eq!(
            versions,
            vec![Some(VersionDirective { major: 1, minor: 2 }), None]
        );
    }

    #[test]
    fn anchor_and_alias_events() {
        let events = parse_all(b"- &a foo\n- *a\n");
        assert!(events.iter().any(|e| matches!(
            &e.data,
            EventData::Scalar { anchor: Some(a), value, .. } if a == "a" && value == "foo"
        )));
        assert!(events
            .iter()
            .any(|e| matches!(&e.data, EventData::Alias { anchor } if anchor == "a")));
    }

    #[test]
    fn empty_values_produce_empty_scalars() {
        let events = parse_all(b"a:\nb:\n");
        let empties = events
            .iter()
            .filter(|e| matches!(&e.data, EventData::Scalar { value, .. } if value.is_empty()))
            .count();
        assert_eq!(empties, 2);
    }

    #[test]
    fn explicit_tag_is_carried_not_resolved() {
        let events = parse_all(b"!!str 1\n");
        assert!(events.iter().any(|e| matches!(
            &e.data,
            EventData::Scalar { tag: Some(tag), plain_implicit: false, .. }
                if tag == "tag:yaml.org,2002:str"
        )));
    }

    #[test]
    fn undefined_tag_handle_is_an_error() {
        let mut input: &[u8] = b"!e!foo bar\n";
        let mut parser = Parser::new();
        parser.set_input(&mut input);
        let mut result = Ok(());
        for _ in 0..8 {
            match parser.parse() {
                Ok(event) => {
                    if matches!(event.data, EventData::StreamEnd) {
                        break;
                    }
                }
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        assert!(matches!(
            result,
            Err(ParserError::ProblemWithContext { .. })
        ));
    }

    #[test]
    fn comments_ride_on_events() {
        let events = parse_all(b"# above\nkey: value # beside\n");
        let key_event = events
            .iter()
            .find(|e| matches!(&e.data, EventData::Scalar { value, .. } if value == "key"))
            .expect("key scalar event");
        assert_eq!(key_event.head_comment, "above");
        let value_event = events
            .iter()
            .find(|e| matches!(&e.data, EventData::Scalar { value, .. } if value == "value"))
            .expect("value scalar event");
        assert_eq!(value_event.line_comment, "beside");
    }

    #[test]
    fn foot_comment_surfaces_as_tail_sentinel() {
        let events = parse_all(b"a: 1\n# foot of a\n\n");
        assert!(events
            .iter()
            .any(|e| matches!(e.data, EventData::TailComment) && e.tail_comment == "foot of a"));
    }

    #[test]
    fn flow_sequence_single_pair_mapping() {
        let events = parse_all(b"[a: b]\n");
        let data = data_of(&events);
        assert!(matches!(
            data[2],
            EventData::SequenceStart {
                style: SequenceStyle::Flow,
                ..
            }
        ));
        assert!(matches!(
            data[3],
            EventData::MappingStart {
                style: MappingStyle::Flow,
                ..
            }
        ));
    }
}
