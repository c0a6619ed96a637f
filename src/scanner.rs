use std::collections::VecDeque;

use crate::{Encoding, Mark, Reader, ScalarStyle, ScannerError, Token, TokenData};

/// A potential simple key.
#[derive(Copy, Clone, Default)]
struct SimpleKey {
    /// Is a simple key possible?
    possible: bool,
    /// Is a simple key required?
    required: bool,
    /// The number of the token.
    token_number: usize,
    /// The position mark.
    mark: Mark,
}

/// A comment attributed to a token position.
///
/// The scanner never discards comments; it classifies them structurally and
/// queues them here. The parser drains the queue keyed by the mark of the
/// next syntactic token and folds the text onto the event it is producing.
#[derive(Debug, Clone, Default, PartialEq)]
#[non_exhaustive]
pub struct Comment {
    /// The mark of the token this comment belongs with.
    pub token_mark: Mark,
    /// The beginning of the comment text.
    pub start_mark: Mark,
    /// The end of the comment text.
    pub end_mark: Mark,
    /// Comment lines above the keyed token.
    pub head: String,
    /// Trailing comment on the keyed token's line.
    pub line: String,
    /// Comment lines below the keyed token, separated from what follows by a
    /// blank line or end of input.
    pub foot: String,
}

/// An open head/foot comment block not yet attributed to a token.
struct PendingComment {
    start_mark: Mark,
    end_mark: Mark,
    text: String,
    /// Line breaks seen since the last comment line of the block.
    newlines: usize,
}

/// The scanner: code points in, tokens out.
///
/// Tokens are produced in strict document order. Synthetic
/// BLOCK-SEQUENCE-START, BLOCK-MAPPING-START and BLOCK-END tokens are
/// injected around indentation changes, and a pending simple key is resolved
/// by inserting a KEY token in front of the buffered tokens when a `:` turns
/// up within the YAML spec's one-line, 1024-character window.
pub struct Scanner<'r> {
    reader: Reader<'r>,
    /// Have we started to scan the input stream?
    stream_start_produced: bool,
    /// Have we reached the end of the input stream?
    pub(crate) stream_end_produced: bool,
    /// The number of unclosed '[' and '{' indicators.
    flow_level: i32,
    /// The tokens queue.
    pub(crate) tokens: VecDeque<Token>,
    /// The number of tokens fetched from the queue.
    pub(crate) tokens_parsed: usize,
    /// Does the tokens queue contain a token ready for dequeueing?
    pub(crate) token_available: bool,
    /// The indentation levels stack.
    indents: Vec<i64>,
    /// The current indentation level.
    indent: i64,
    /// May a simple key occur at the current position?
    simple_key_allowed: bool,
    /// The stack of simple keys.
    simple_keys: Vec<SimpleKey>,
    /// Comments scanned but not yet claimed by the parser.
    comments: VecDeque<Comment>,
    pending_comment: Option<PendingComment>,
    /// End mark of the last queued token, for trailing-comment attribution.
    last_token_end: Mark,
    /// Start mark of the last queued token.
    last_token_start: Mark,
    /// True once any token besides STREAM-START has been queued.
    have_content_token: bool,
}

impl<'r> Default for Scanner<'r> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> Scanner<'r> {
    pub fn new() -> Self {
        Self {
            reader: Reader::new(),
            stream_start_produced: false,
            stream_end_produced: false,
            flow_level: 0,
            tokens: VecDeque::with_capacity(16),
            tokens_parsed: 0,
            token_available: false,
            indents: Vec::with_capacity(16),
            indent: -1,
            simple_key_allowed: false,
            simple_keys: Vec::with_capacity(16),
            comments: VecDeque::new(),
            pending_comment: None,
            last_token_end: Mark::default(),
            last_token_start: Mark::default(),
            have_content_token: false,
        }
    }

    /// Set a generic input handler.
    pub fn set_input(&mut self, input: &'r mut dyn std::io::Read) {
        self.reader.set_input(input);
    }

    /// Set the source encoding, overriding detection.
    pub fn set_encoding(&mut self, encoding: Encoding) {
        self.reader.set_encoding(encoding);
    }

    /// The detected stream encoding.
    pub fn encoding(&self) -> Encoding {
        self.reader.encoding()
    }

    /// The mark of the next unread code point.
    pub fn mark(&self) -> Mark {
        self.reader.mark()
    }

    /// Scan the input stream and produce the next token.
    ///
    /// Call the function subsequently to produce a sequence of tokens
    /// corresponding to the input stream. The initial token is STREAM-START
    /// and the final one STREAM-END; after that, STREAM-END is repeated.
    ///
    /// An application must not alternate calls of [`Scanner::scan`] with
    /// calls of [`Parser::parse`](crate::Parser::parse) or
    /// [`Composer::compose`](crate::Composer::compose) on the same stream.
    pub fn scan(&mut self) -> Result<Token, ScannerError> {
        if self.stream_end_produced {
            return Ok(Token::new(
                TokenData::StreamEnd,
                self.reader.mark(),
                self.reader.mark(),
            ));
        }
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        if let Some(token) = self.tokens.pop_front() {
            self.token_available = false;
            self.tokens_parsed += 1;
            if let TokenData::StreamEnd = &token.data {
                self.stream_end_produced = true;
            }
            Ok(token)
        } else {
            unreachable!("no more tokens, but stream-end was not produced")
        }
    }

    fn error<T>(
        &self,
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
    ) -> Result<T, ScannerError> {
        Err(ScannerError::Problem {
            context,
            context_mark,
            problem,
            problem_mark: self.reader.mark(),
        })
    }

    fn push_token(&mut self, token: Token) {
        self.last_token_start = token.start_mark;
        self.last_token_end = token.end_mark;
        if !matches!(token.data, TokenData::StreamStart { .. }) {
            self.have_content_token = true;
        }
        self.tokens.push_back(token);
    }

    pub(crate) fn fetch_more_tokens(&mut self) -> Result<(), ScannerError> {
        loop {
            let mut need_more_tokens = false;
            if self.tokens.is_empty() {
                need_more_tokens = true;
            } else {
                self.stale_simple_keys()?;
                for simple_key in &self.simple_keys {
                    if simple_key.possible && simple_key.token_number == self.tokens_parsed {
                        need_more_tokens = true;
                        break;
                    }
                }
            }
            if !need_more_tokens {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<(), ScannerError> {
        self.reader.cache(1)?;
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        self.unroll_indent(self.reader.mark().column as i64);
        self.reader.cache(4)?;
        if self.reader.is_z() {
            return self.fetch_stream_end();
        }
        let mark = self.reader.mark();
        if mark.column == 0 && self.reader.check('%') {
            return self.fetch_directive();
        }
        if mark.column == 0
            && self.reader.check_at('-', 0)
            && self.reader.check_at('-', 1)
            && self.reader.check_at('-', 2)
            && self.reader.is_blankz_at(3)
        {
            return self.fetch_document_indicator(TokenData::DocumentStart);
        }
        if mark.column == 0
            && self.reader.check_at('.', 0)
            && self.reader.check_at('.', 1)
            && self.reader.check_at('.', 2)
            && self.reader.is_blankz_at(3)
        {
            return self.fetch_document_indicator(TokenData::DocumentEnd);
        }
        if self.reader.check('[') {
            return self.fetch_flow_collection_start(TokenData::FlowSequenceStart);
        }
        if self.reader.check('{') {
            return self.fetch_flow_collection_start(TokenData::FlowMappingStart);
        }
        if self.reader.check(']') {
            return self.fetch_flow_collection_end(TokenData::FlowSequenceEnd);
        }
        if self.reader.check('}') {
            return self.fetch_flow_collection_end(TokenData::FlowMappingEnd);
        }
        if self.reader.check(',') {
            return self.fetch_flow_entry();
        }
        if self.reader.check('-') && self.reader.is_blankz_at(1) {
            return self.fetch_block_entry();
        }
        if self.reader.check('?') && (self.flow_level != 0 || self.reader.is_blankz_at(1)) {
            return self.fetch_key();
        }
        if self.reader.check(':') && (self.flow_level != 0 || self.reader.is_blankz_at(1)) {
            return self.fetch_value();
        }
        if self.reader.check('*') {
            return self.fetch_anchor(true);
        }
        if self.reader.check('&') {
            return self.fetch_anchor(false);
        }
        if self.reader.check('!') {
            return self.fetch_tag();
        }
        if self.reader.check('|') && self.flow_level == 0 {
            return self.fetch_block_scalar(true);
        }
        if self.reader.check('>') && self.flow_level == 0 {
            return self.fetch_block_scalar(false);
        }
        if self.reader.check('\'') {
            return self.fetch_flow_scalar(true);
        }
        if self.reader.check('"') {
            return self.fetch_flow_scalar(false);
        }
        let leading = self.reader.peek(0);
        let plain_possible = !(self.reader.is_blankz()
            || leading.is_some_and(crate::chars::is_indicator))
            || self.reader.check('-') && !self.reader.is_blank_at(1)
            || self.flow_level == 0
                && (self.reader.check('?') || self.reader.check(':'))
                && !self.reader.is_blankz_at(1);
        if plain_possible {
            return self.fetch_plain_scalar();
        }
        self.error(
            "while scanning for the next token",
            self.reader.mark(),
            "found character that cannot start any token",
        )
    }

    fn stale_simple_keys(&mut self) -> Result<(), ScannerError> {
        let mark = self.reader.mark();
        for simple_key in &mut self.simple_keys {
            if simple_key.possible
                && (simple_key.mark.line < mark.line || simple_key.mark.index + 1024 < mark.index)
            {
                if simple_key.required {
                    return Err(ScannerError::Problem {
                        context: "while scanning a simple key",
                        context_mark: simple_key.mark,
                        problem: "could not find expected ':'",
                        problem_mark: mark,
                    });
                }
                simple_key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<(), ScannerError> {
        let mark = self.reader.mark();
        let required = self.flow_level == 0 && self.indent == mark.column as i64;
        if self.simple_key_allowed {
            let simple_key = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_parsed + self.tokens.len(),
                mark,
            };
            self.remove_simple_key()?;
            *self.simple_keys.last_mut().expect("no simple key level") = simple_key;
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), ScannerError> {
        let mark = self.reader.mark();
        let simple_key = self.simple_keys.last_mut().expect("no simple key level");
        if simple_key.possible && simple_key.required {
            return Err(ScannerError::Problem {
                context: "while scanning a simple key",
                context_mark: simple_key.mark,
                problem: "could not find expected ':'",
                problem_mark: mark,
            });
        }
        simple_key.possible = false;
        Ok(())
    }

    fn increase_flow_level(&mut self) {
        self.simple_keys.push(SimpleKey::default());
        assert!(self.flow_level < i32::MAX, "flow level overflow");
        self.flow_level += 1;
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level != 0 {
            self.flow_level -= 1;
            let _ = self.simple_keys.pop();
        }
    }

    /// Open a block collection at `column`, injecting the start token either
    /// at the back of the queue or at the position of a resolved simple key.
    fn roll_indent(&mut self, column: i64, number: Option<usize>, data: TokenData, mark: Mark) {
        if self.flow_level != 0 {
            return;
        }
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            let token = Token::new(data, mark, mark);
            match number {
                None => self.push_token(token),
                Some(number) => self.tokens.insert(number - self.tokens_parsed, token),
            }
        }
    }

    /// Close block collections whose indent exceeds `column`.
    fn unroll_indent(&mut self, column: i64) {
        if self.flow_level != 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.mark();
            self.push_token(Token::new(TokenData::BlockEnd, mark, mark));
            self.indent = self.indents.pop().expect("indent stack underflow");
        }
    }

    fn fetch_stream_start(&mut self) {
        let mark = self.reader.mark();
        self.indent = -1;
        self.simple_keys.push(SimpleKey::default());
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        let token = Token::new(
            TokenData::StreamStart {
                encoding: self.reader.encoding(),
            },
            mark,
            mark,
        );
        self.push_token(token);
    }

    fn fetch_stream_end(&mut self) -> Result<(), ScannerError> {
        if let Some(pending) = self.pending_comment.take() {
            self.flush_comment_block(pending, true, self.reader.mark());
        }
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let mut mark = self.reader.mark();
        if mark.column != 0 {
            mark.column = 0;
            mark.line += 1;
        }
        self.push_token(Token::new(TokenData::StreamEnd, mark, mark));
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_directive()?;
        self.push_token(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark();
        self.reader.advance(3);
        let end_mark = self.reader.mark();
        self.push_token(Token::new(data, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.increase_flow_level();
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark();
        self.reader.skip();
        let end_mark = self.reader.mark();
        self.push_token(Token::new(data, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, data: TokenData) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        let start_mark = self.reader.mark();
        self.reader.skip();
        let end_mark = self.reader.mark();
        self.push_token(Token::new(data, start_mark, end_mark));
        self.scan_trailing_comment(start_mark)?;
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark();
        self.reader.skip();
        let end_mark = self.reader.mark();
        self.push_token(Token::new(TokenData::FlowEntry, start_mark, end_mark));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return self.error(
                    "",
                    self.reader.mark(),
                    "block sequence entries are not allowed in this context",
                );
            }
            let mark = self.reader.mark();
            self.roll_indent(
                mark.column as i64,
                None,
                TokenData::BlockSequenceStart,
                mark,
            );
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start_mark = self.reader.mark();
        self.reader.skip();
        let end_mark = self.reader.mark();
        self.push_token(Token::new(TokenData::BlockEntry, start_mark, end_mark));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), ScannerError> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return self.error(
                    "",
                    self.reader.mark(),
                    "mapping keys are not allowed in this context",
                );
            }
            let mark = self.reader.mark();
            self.roll_indent(mark.column as i64, None, TokenData::BlockMappingStart, mark);
        }
        self.remove_simple_key()?;
        self.simple_key_allowed = self.flow_level == 0;
        let start_mark = self.reader.mark();
        self.reader.skip();
        let end_mark = self.reader.mark();
        self.push_token(Token::new(TokenData::Key, start_mark, end_mark));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), ScannerError> {
        let simple_key = *self.simple_keys.last().expect("no simple key level");
        if simple_key.possible {
            let token = Token::new(TokenData::Key, simple_key.mark, simple_key.mark);
            self.tokens
                .insert(simple_key.token_number - self.tokens_parsed, token);
            self.simple_keys.last_mut().expect("no simple key level").possible = false;
            self.roll_indent(
                simple_key.mark.column as i64,
                Some(simple_key.token_number),
                TokenData::BlockMappingStart,
                simple_key.mark,
            );
            self.simple_key_allowed = false;
        } else {
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return self.error(
                        "",
                        self.reader.mark(),
                        "mapping values are not allowed in this context",
                    );
                }
                let mark = self.reader.mark();
                self.roll_indent(mark.column as i64, None, TokenData::BlockMappingStart, mark);
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        let start_mark = self.reader.mark();
        self.reader.skip();
        let end_mark = self.reader.mark();
        self.push_token(Token::new(TokenData::Value, start_mark, end_mark));
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(alias)?;
        let start_mark = token.start_mark;
        self.push_token(token);
        self.scan_trailing_comment(start_mark)?;
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.push_token(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), ScannerError> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let token = self.scan_block_scalar(literal)?;
        self.push_token(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        let start_mark = token.start_mark;
        self.push_token(token);
        self.scan_trailing_comment(start_mark)?;
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), ScannerError> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar()?;
        let start_mark = token.start_mark;
        self.push_token(token);
        self.scan_trailing_comment(start_mark)?;
        Ok(())
    }

    /// Skip insignificant whitespace, collecting comments on the way.
    fn scan_to_next_token(&mut self) -> Result<(), ScannerError> {
        loop {
            self.reader.cache(1)?;
            if self.reader.mark().column == 0 && self.reader.is_bom() {
                self.reader.skip();
            }
            self.reader.cache(1)?;
            while self.reader.check(' ')
                || (self.flow_level != 0 || !self.simple_key_allowed) && self.reader.check('\t')
            {
                self.reader.skip();
                self.reader.cache(1)?;
            }
            if self.reader.check('#') {
                self.scan_comment_line()?;
            }
            if !self.reader.is_break() {
                break;
            }
            self.reader.cache(2)?;
            self.reader.skip_line();
            if self.flow_level == 0 {
                self.simple_key_allowed = true;
            }
            let blank_line_ends_block = if let Some(pending) = &mut self.pending_comment {
                pending.newlines += 1;
                pending.newlines >= 2
            } else {
                false
            };
            // A blank line ends the block: it is foot text of the token that
            // precedes it.
            if blank_line_ends_block {
                let pending = self.pending_comment.take().expect("pending comment");
                self.flush_comment_block(pending, true, self.reader.mark());
            }
        }
        if let Some(pending) = self.pending_comment.take() {
            let at_eof = {
                self.reader.cache(1)?;
                self.reader.is_z()
            };
            self.flush_comment_block(pending, at_eof, self.reader.mark());
        }
        Ok(())
    }

    /// Scan one `#`-to-end-of-line comment into the pending block, or queue
    /// it directly as a trailing comment when it shares a line with a token.
    fn scan_comment_line(&mut self) -> Result<(), ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.skip();
        self.reader.cache(1)?;
        if self.reader.check(' ') {
            self.reader.skip();
        }
        let mut text = String::new();
        loop {
            self.reader.cache(1)?;
            if self.reader.is_breakz() {
                break;
            }
            self.reader.read_char(&mut text);
        }
        let end_mark = self.reader.mark();
        let inline = self.have_content_token
            && start_mark.line == self.last_token_end.line
            && start_mark.column > 0
            && self.pending_comment.is_none();
        if inline {
            self.comments.push_back(Comment {
                token_mark: self.last_token_start,
                start_mark,
                end_mark,
                line: text,
                ..Comment::default()
            });
        } else {
            match &mut self.pending_comment {
                Some(pending) => {
                    pending.text.push('\n');
                    pending.text.push_str(&text);
                    pending.end_mark = end_mark;
                    pending.newlines = 0;
                }
                None => {
                    self.pending_comment = Some(PendingComment {
                        start_mark,
                        end_mark,
                        text,
                        newlines: 0,
                    });
                }
            }
        }
        Ok(())
    }

    /// Consume a trailing comment on the line of the token at `token_mark`,
    /// if one is present after nothing but blanks.
    fn scan_trailing_comment(&mut self, token_mark: Mark) -> Result<(), ScannerError> {
        if self.flow_level != 0 {
            // Flow content may legitimately continue on the same line; leave
            // classification to scan_to_next_token.
            return Ok(());
        }
        if self.reader.mark().line != self.last_token_end.line {
            // A multiline scalar already moved past its own line; anything
            // ahead belongs to the next token.
            return Ok(());
        }
        let mut k = 0;
        loop {
            self.reader.cache(k + 1)?;
            if self.reader.is_blank_at(k) {
                k += 1;
            } else {
                break;
            }
        }
        if !self.reader.check_at('#', k) {
            return Ok(());
        }
        self.reader.advance(k);
        let start_mark = self.reader.mark();
        self.reader.skip();
        self.reader.cache(1)?;
        if self.reader.check(' ') {
            self.reader.skip();
        }
        let mut text = String::new();
        loop {
            self.reader.cache(1)?;
            if self.reader.is_breakz() {
                break;
            }
            self.reader.read_char(&mut text);
        }
        self.comments.push_back(Comment {
            token_mark,
            start_mark,
            end_mark: self.reader.mark(),
            line: text,
            ..Comment::default()
        });
        Ok(())
    }

    /// Attribute a finished comment block: foot of the previous token, or
    /// head of the token that starts at `next_mark`.
    fn flush_comment_block(&mut self, pending: PendingComment, foot: bool, next_mark: Mark) {
        let comment = if foot {
            Comment {
                token_mark: pending.start_mark,
                start_mark: pending.start_mark,
                end_mark: pending.end_mark,
                foot: pending.text,
                ..Comment::default()
            }
        } else {
            Comment {
                token_mark: next_mark,
                start_mark: pending.start_mark,
                end_mark: pending.end_mark,
                head: pending.text,
                ..Comment::default()
            }
        };
        self.comments.push_back(comment);
    }

    /// Fold comments keyed before `upto` into the given buffers. Comments
    /// keyed exactly at `upto` are folded only when `inclusive` is set; this
    /// lets a scalar claim its own head comment instead of the structural
    /// events that share its mark.
    pub(crate) fn drain_comments(
        &mut self,
        upto: u64,
        inclusive: bool,
        head: &mut String,
        line: &mut String,
        foot: &mut String,
    ) {
        while let Some(front) = self.comments.front() {
            if front.token_mark.index > upto || front.token_mark.index == upto && !inclusive {
                break;
            }
            let comment = self.comments.pop_front().expect("comment queue front");
            append_comment(head, &comment.head);
            append_comment(line, &comment.line);
            append_comment(foot, &comment.foot);
        }
    }

    /// Is there queued foot text keyed at or before `upto`?
    pub(crate) fn has_foot_comment_before(&self, upto: u64) -> bool {
        self.comments
            .iter()
            .take_while(|c| c.token_mark.index <= upto)
            .any(|c| !c.foot.is_empty())
    }

    /// Remove and join queued foot text keyed at or before `upto`, leaving
    /// head and line text in place.
    pub(crate) fn take_foot_comments(&mut self, upto: u64) -> String {
        let mut foot = String::new();
        let mut remaining = VecDeque::with_capacity(self.comments.len());
        while let Some(mut comment) = self.comments.pop_front() {
            if comment.token_mark.index <= upto && !comment.foot.is_empty() {
                append_comment(&mut foot, &comment.foot);
                comment.foot.clear();
            }
            if !comment.head.is_empty() || !comment.line.is_empty() || !comment.foot.is_empty() {
                remaining.push_back(comment);
            }
        }
        self.comments = remaining;
        foot
    }

    fn scan_directive(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.skip();
        let name = self.scan_directive_name(start_mark)?;
        let data = if name == "YAML" {
            let (major, minor) = self.scan_version_directive_value(start_mark)?;
            TokenData::VersionDirective { major, minor }
        } else if name == "TAG" {
            let (handle, prefix) = self.scan_tag_directive_value(start_mark)?;
            TokenData::TagDirective { handle, prefix }
        } else {
            return self.error(
                "while scanning a directive",
                start_mark,
                "found unknown directive name",
            );
        };
        self.reader.cache(1)?;
        while self.reader.is_blank() {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        if self.reader.check('#') {
            self.scan_comment_line()?;
        }
        if !self.reader.is_breakz() {
            return self.error(
                "while scanning a directive",
                start_mark,
                "did not find expected comment or line break",
            );
        }
        if self.reader.is_break() {
            self.reader.cache(2)?;
            self.reader.skip_line();
        }
        Ok(Token::new(data, start_mark, self.reader.mark()))
    }

    fn scan_directive_name(&mut self, start_mark: Mark) -> Result<String, ScannerError> {
        let mut string = String::new();
        self.reader.cache(1)?;
        while self.reader.is_alpha() {
            self.reader.read_char(&mut string);
            self.reader.cache(1)?;
        }
        if string.is_empty() {
            self.error(
                "while scanning a directive",
                start_mark,
                "could not find expected directive name",
            )
        } else if !self.reader.is_blankz() {
            self.error(
                "while scanning a directive",
                start_mark,
                "found unexpected non-alphabetical character",
            )
        } else {
            Ok(string)
        }
    }

    fn scan_version_directive_value(
        &mut self,
        start_mark: Mark,
    ) -> Result<(i32, i32), ScannerError> {
        self.reader.cache(1)?;
        while self.reader.is_blank() {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        let major = self.scan_version_directive_number(start_mark)?;
        if !self.reader.check('.') {
            return self.error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected digit or '.' character",
            );
        }
        self.reader.skip();
        let minor = self.scan_version_directive_number(start_mark)?;
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start_mark: Mark) -> Result<i32, ScannerError> {
        const MAX_NUMBER_LENGTH: usize = 9;
        let mut value: i32 = 0;
        let mut length = 0;
        self.reader.cache(1)?;
        while self.reader.is_digit() {
            length += 1;
            if length > MAX_NUMBER_LENGTH {
                return self.error(
                    "while scanning a %YAML directive",
                    start_mark,
                    "found extremely long version number",
                );
            }
            value = value * 10 + self.reader.as_digit() as i32;
            self.reader.skip();
            self.reader.cache(1)?;
        }
        if length == 0 {
            return self.error(
                "while scanning a %YAML directive",
                start_mark,
                "did not find expected version number",
            );
        }
        Ok(value)
    }

    fn scan_tag_directive_value(
        &mut self,
        start_mark: Mark,
    ) -> Result<(String, String), ScannerError> {
        self.reader.cache(1)?;
        while self.reader.is_blank() {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        let handle = self.scan_tag_handle(true, start_mark)?;
        self.reader.cache(1)?;
        if !self.reader.is_blank() {
            return self.error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace",
            );
        }
        while self.reader.is_blank() {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        let prefix = self.scan_tag_uri(true, true, None, start_mark)?;
        self.reader.cache(1)?;
        if !self.reader.is_blankz() {
            return self.error(
                "while scanning a %TAG directive",
                start_mark,
                "did not find expected whitespace or line break",
            );
        }
        Ok((handle, prefix))
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.skip();
        self.reader.cache(1)?;
        let mut string = String::new();
        while self.reader.is_alpha() {
            self.reader.read_char(&mut string);
            self.reader.cache(1)?;
        }
        let end_mark = self.reader.mark();
        let followed_ok = self.reader.is_blankz()
            || self.reader.check('?')
            || self.reader.check(':')
            || self.reader.check(',')
            || self.reader.check(']')
            || self.reader.check('}')
            || self.reader.check('%')
            || self.reader.check('@')
            || self.reader.check('`');
        if string.is_empty() || !followed_ok {
            return self.error(
                if alias {
                    "while scanning an alias"
                } else {
                    "while scanning an anchor"
                },
                start_mark,
                "did not find expected alphabetic or numeric character",
            );
        }
        let data = if alias {
            TokenData::Alias { value: string }
        } else {
            TokenData::Anchor { value: string }
        };
        Ok(Token::new(data, start_mark, end_mark))
    }

    fn scan_tag(&mut self) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.cache(2)?;
        let mut handle;
        let mut suffix;
        if self.reader.check_at('<', 1) {
            handle = String::new();
            self.reader.skip();
            self.reader.skip();
            suffix = self.scan_tag_uri(true, false, None, start_mark)?;
            if !self.reader.check('>') {
                return self.error(
                    "while scanning a tag",
                    start_mark,
                    "did not find the expected '>'",
                );
            }
            self.reader.skip();
        } else {
            handle = self.scan_tag_handle(false, start_mark)?;
            if handle.starts_with('!') && handle.len() > 1 && handle.ends_with('!') {
                suffix = self.scan_tag_uri(false, false, None, start_mark)?;
            } else {
                suffix = self.scan_tag_uri(false, false, Some(&handle), start_mark)?;
                handle = String::from("!");
                if suffix.is_empty() {
                    core::mem::swap(&mut handle, &mut suffix);
                }
            }
        }
        self.reader.cache(1)?;
        if !self.reader.is_blankz() && (self.flow_level == 0 || !self.reader.check(',')) {
            return self.error(
                "while scanning a tag",
                start_mark,
                "did not find expected whitespace or line break",
            );
        }
        let end_mark = self.reader.mark();
        Ok(Token::new(
            TokenData::Tag { handle, suffix },
            start_mark,
            end_mark,
        ))
    }

    fn scan_tag_handle(&mut self, directive: bool, start_mark: Mark) -> Result<String, ScannerError> {
        let mut string = String::new();
        self.reader.cache(1)?;
        if !self.reader.check('!') {
            return self.error(
                if directive {
                    "while scanning a tag directive"
                } else {
                    "while scanning a tag"
                },
                start_mark,
                "did not find expected '!'",
            );
        }
        self.reader.read_char(&mut string);
        self.reader.cache(1)?;
        while self.reader.is_alpha() {
            self.reader.read_char(&mut string);
            self.reader.cache(1)?;
        }
        if self.reader.check('!') {
            self.reader.read_char(&mut string);
        } else if directive && string != "!" {
            return self.error(
                "while parsing a tag directive",
                start_mark,
                "did not find expected '!'",
            );
        }
        Ok(string)
    }

    fn scan_tag_uri(
        &mut self,
        uri_char: bool,
        directive: bool,
        head: Option<&str>,
        start_mark: Mark,
    ) -> Result<String, ScannerError> {
        let head = head.unwrap_or("");
        let mut length = head.len();
        let mut string = String::new();
        if length > 1 {
            string = String::from(&head[1..]);
        }
        self.reader.cache(1)?;
        loop {
            let Some(ch) = self.reader.peek(0) else { break };
            let uri_ok = crate::chars::is_alpha(ch)
                || matches!(
                    ch,
                    ';' | '/'
                        | '?'
                        | ':'
                        | '@'
                        | '&'
                        | '='
                        | '+'
                        | '$'
                        | '.'
                        | '%'
                        | '!'
                        | '~'
                        | '*'
                        | '\''
                        | '('
                        | ')'
                )
                || uri_char && matches!(ch, ',' | '[' | ']');
            if !uri_ok {
                break;
            }
            if ch == '%' {
                self.scan_uri_escapes(directive, start_mark, &mut string)?;
            } else {
                self.reader.read_char(&mut string);
            }
            length += 1;
            self.reader.cache(1)?;
        }
        if length == 0 {
            self.error(
                if directive {
                    "while parsing a %TAG directive"
                } else {
                    "while parsing a tag"
                },
                start_mark,
                "did not find expected tag URI",
            )
        } else {
            Ok(string)
        }
    }

    fn scan_uri_escapes(
        &mut self,
        directive: bool,
        start_mark: Mark,
        string: &mut String,
    ) -> Result<(), ScannerError> {
        let context = if directive {
            "while parsing a %TAG directive"
        } else {
            "while parsing a tag"
        };
        let mut width = 0usize;
        let mut value: u32 = 0;
        loop {
            self.reader.cache(3)?;
            if !(self.reader.check('%') && self.reader.is_hex_at(1) && self.reader.is_hex_at(2)) {
                return self.error(context, start_mark, "did not find URI escaped octet");
            }
            let octet = ((self.reader.as_hex_at(1) << 4) + self.reader.as_hex_at(2)) as u8;
            if width == 0 {
                width = if octet & 0x80 == 0 {
                    1
                } else if octet & 0xE0 == 0xC0 {
                    2
                } else if octet & 0xF0 == 0xE0 {
                    3
                } else if octet & 0xF8 == 0xF0 {
                    4
                } else {
                    0
                };
                if width == 0 {
                    return self.error(
                        context,
                        start_mark,
                        "found an incorrect leading UTF-8 octet",
                    );
                }
                value = match width {
                    1 => octet as u32 & 0x7F,
                    2 => octet as u32 & 0x1F,
                    3 => octet as u32 & 0x0F,
                    _ => octet as u32 & 0x07,
                };
            } else {
                if octet & 0xC0 != 0x80 {
                    return self.error(
                        context,
                        start_mark,
                        "found an incorrect trailing UTF-8 octet",
                    );
                }
                value = (value << 6) + (octet as u32 & 0x3F);
            }
            self.reader.advance(3);
            width -= 1;
            if width == 0 {
                break;
            }
        }
        let Some(ch) = char::from_u32(value) else {
            return self.error(context, start_mark, "found an invalid URI escape sequence");
        };
        string.push(ch);
        Ok(())
    }

    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.skip();
        self.reader.cache(1)?;

        // Header: chomping indicator and indentation hint, in either order.
        let mut chomping = 0i32;
        let mut increment = 0i64;
        if self.reader.check('+') || self.reader.check('-') {
            chomping = if self.reader.check('+') { 1 } else { -1 };
            self.reader.skip();
            self.reader.cache(1)?;
            if self.reader.is_digit() {
                if self.reader.check('0') {
                    return self.error(
                        "while scanning a block scalar",
                        start_mark,
                        "found an indentation indicator equal to 0",
                    );
                }
                increment = self.reader.as_digit() as i64;
                self.reader.skip();
            }
        } else if self.reader.is_digit() {
            if self.reader.check('0') {
                return self.error(
                    "while scanning a block scalar",
                    start_mark,
                    "found an indentation indicator equal to 0",
                );
            }
            increment = self.reader.as_digit() as i64;
            self.reader.skip();
            self.reader.cache(1)?;
            if self.reader.check('+') || self.reader.check('-') {
                chomping = if self.reader.check('+') { 1 } else { -1 };
                self.reader.skip();
            }
        }

        self.reader.cache(1)?;
        while self.reader.is_blank() {
            self.reader.skip();
            self.reader.cache(1)?;
        }
        if self.reader.check('#') {
            self.scan_comment_line()?;
        }
        if !self.reader.is_breakz() {
            return self.error(
                "while scanning a block scalar",
                start_mark,
                "did not find expected comment or line break",
            );
        }
        if self.reader.is_break() {
            self.reader.cache(2)?;
            self.reader.skip_line();
        }

        let mut end_mark = self.reader.mark();
        let mut indent: i64 = 0;
        if increment != 0 {
            indent = if self.indent >= 0 {
                self.indent + increment
            } else {
                increment
            };
        }

        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut leading_blank = false;
        self.scan_block_scalar_breaks(&mut indent, &mut trailing_breaks, start_mark, &mut end_mark)?;

        self.reader.cache(1)?;
        loop {
            if self.reader.mark().column as i64 != indent || self.reader.is_z() {
                break;
            }
            let trailing_blank = self.reader.is_blank();
            if !literal && leading_break.starts_with('\n') && !leading_blank && !trailing_blank {
                if trailing_breaks.is_empty() {
                    string.push(' ');
                }
                leading_break.clear();
            } else {
                string.push_str(&leading_break);
                leading_break.clear();
            }
            string.push_str(&trailing_breaks);
            trailing_breaks.clear();
            leading_blank = self.reader.is_blank();
            while !self.reader.is_breakz() {
                self.reader.read_char(&mut string);
                self.reader.cache(1)?;
            }
            self.reader.cache(2)?;
            self.reader.read_break(&mut leading_break);
            self.scan_block_scalar_breaks(
                &mut indent,
                &mut trailing_breaks,
                start_mark,
                &mut end_mark,
            )?;
            self.reader.cache(1)?;
        }

        if chomping != -1 {
            string.push_str(&leading_break);
        }
        if chomping == 1 {
            string.push_str(&trailing_breaks);
        }

        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style: if literal {
                    ScalarStyle::Literal
                } else {
                    ScalarStyle::Folded
                },
            },
            start_mark,
            end_mark,
        ))
    }

    fn scan_block_scalar_breaks(
        &mut self,
        indent: &mut i64,
        breaks: &mut String,
        start_mark: Mark,
        end_mark: &mut Mark,
    ) -> Result<(), ScannerError> {
        let mut max_indent: i64 = 0;
        *end_mark = self.reader.mark();
        loop {
            self.reader.cache(1)?;
            while (*indent == 0 || (self.reader.mark().column as i64) < *indent)
                && self.reader.check(' ')
            {
                self.reader.skip();
                self.reader.cache(1)?;
            }
            if self.reader.mark().column as i64 > max_indent {
                max_indent = self.reader.mark().column as i64;
            }
            if (*indent == 0 || (self.reader.mark().column as i64) < *indent)
                && self.reader.check('\t')
            {
                return self.error(
                    "while scanning a block scalar",
                    start_mark,
                    "found a tab character where an indentation space is expected",
                );
            }
            if !self.reader.is_break() {
                break;
            }
            self.reader.cache(2)?;
            self.reader.read_break(breaks);
            *end_mark = self.reader.mark();
        }
        if *indent == 0 {
            *indent = max_indent.max(self.indent + 1).max(1);
        }
        Ok(())
    }

    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, ScannerError> {
        let start_mark = self.reader.mark();
        self.reader.skip();
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        loop {
            self.reader.cache(4)?;
            if self.reader.mark().column == 0
                && (self.reader.check_at('-', 0)
                    && self.reader.check_at('-', 1)
                    && self.reader.check_at('-', 2)
                    || self.reader.check_at('.', 0)
                        && self.reader.check_at('.', 1)
                        && self.reader.check_at('.', 2))
                && self.reader.is_blankz_at(3)
            {
                return self.error(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected document indicator",
                );
            }
            if self.reader.is_z() {
                return self.error(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected end of stream",
                );
            }
            self.reader.cache(2)?;
            let mut leading_blanks = false;
            while !self.reader.is_blankz() {
                if single && self.reader.check_at('\'', 0) && self.reader.check_at('\'', 1) {
                    string.push('\'');
                    self.reader.skip();
                    self.reader.skip();
                } else if self.reader.check(if single { '\'' } else { '"' }) {
                    break;
                } else if !single && self.reader.check('\\') && self.reader.is_break_at(1) {
                    // Escaped line continuation.
                    self.reader.cache(3)?;
                    self.reader.skip();
                    self.reader.skip_line();
                    leading_blanks = true;
                    break;
                } else if !single && self.reader.check('\\') {
                    let mut code_length = 0usize;
                    match self.reader.peek(1) {
                        Some('0') => string.push('\0'),
                        Some('a') => string.push('\x07'),
                        Some('b') => string.push('\x08'),
                        Some('t' | '\t') => string.push('\t'),
                        Some('n') => string.push('\n'),
                        Some('v') => string.push('\x0B'),
                        Some('f') => string.push('\x0C'),
                        Some('r') => string.push('\r'),
                        Some('e') => string.push('\x1B'),
                        Some(' ') => string.push(' '),
                        Some('"') => string.push('"'),
                        Some('/') => string.push('/'),
                        Some('\\') => string.push('\\'),
                        // NEL (#x85)
                        Some('N') => string.push('\u{0085}'),
                        // #xA0
                        Some('_') => string.push('\u{00A0}'),
                        // LS (#x2028)
                        Some('L') => string.push('\u{2028}'),
                        // PS (#x2029)
                        Some('P') => string.push('\u{2029}'),
                        Some('x') => code_length = 2,
                        Some('u') => code_length = 4,
                        Some('U') => code_length = 8,
                        _ => {
                            return self.error(
                                "while parsing a quoted scalar",
                                start_mark,
                                "found unknown escape character",
                            );
                        }
                    }
                    self.reader.skip();
                    self.reader.skip();
                    if code_length != 0 {
                        self.reader.cache(code_length)?;
                        let mut value: u32 = 0;
                        for k in 0..code_length {
                            if !self.reader.is_hex_at(k) {
                                return self.error(
                                    "while parsing a quoted scalar",
                                    start_mark,
                                    "did not find expected hexdecimal number",
                                );
                            }
                            value = (value << 4) + self.reader.as_hex_at(k);
                        }
                        let Some(ch) = char::from_u32(value) else {
                            return self.error(
                                "while parsing a quoted scalar",
                                start_mark,
                                "found invalid Unicode character escape code",
                            );
                        };
                        string.push(ch);
                        self.reader.advance(code_length);
                    }
                } else {
                    self.reader.read_char(&mut string);
                }
                self.reader.cache(2)?;
            }
            self.reader.cache(1)?;
            if self.reader.check(if single { '\'' } else { '"' }) {
                break;
            }
            self.reader.cache(1)?;
            while self.reader.is_blank() || self.reader.is_break() {
                if self.reader.is_blank() {
                    if leading_blanks {
                        self.reader.skip();
                    } else {
                        self.reader.read_char(&mut whitespaces);
                    }
                } else {
                    self.reader.cache(2)?;
                    if leading_blanks {
                        self.reader.read_break(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.reader.read_break(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.reader.cache(1)?;
            }
            if leading_blanks {
                if leading_break.starts_with('\n') {
                    if trailing_breaks.is_empty() {
                        string.push(' ');
                    } else {
                        string.push_str(&trailing_breaks);
                        trailing_breaks.clear();
                    }
                    leading_break.clear();
                } else {
                    string.push_str(&leading_break);
                    string.push_str(&trailing_breaks);
                    leading_break.clear();
                    trailing_breaks.clear();
                }
            } else {
                string.push_str(&whitespaces);
                whitespaces.clear();
            }
        }
        self.reader.skip();
        let end_mark = self.reader.mark();
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style: if single {
                    ScalarStyle::SingleQuoted
                } else {
                    ScalarStyle::DoubleQuoted
                },
            },
            start_mark,
            end_mark,
        ))
    }

    fn scan_plain_scalar(&mut self) -> Result<Token, ScannerError> {
        let mut string = String::new();
        let mut leading_break = String::new();
        let mut trailing_breaks = String::new();
        let mut whitespaces = String::new();
        let mut leading_blanks = false;
        let indent = self.indent + 1;
        let start_mark = self.reader.mark();
        let mut end_mark = start_mark;
        loop {
            self.reader.cache(4)?;
            if self.reader.mark().column == 0
                && (self.reader.check_at('-', 0)
                    && self.reader.check_at('-', 1)
                    && self.reader.check_at('-', 2)
                    || self.reader.check_at('.', 0)
                        && self.reader.check_at('.', 1)
                        && self.reader.check_at('.', 2))
                && self.reader.is_blankz_at(3)
            {
                break;
            }
            if self.reader.check('#') {
                break;
            }
            while !self.reader.is_blankz() {
                if self.flow_level != 0
                    && self.reader.check(':')
                    && (self.reader.check_at(',', 1)
                        || self.reader.check_at('?', 1)
                        || self.reader.check_at('[', 1)
                        || self.reader.check_at(']', 1)
                        || self.reader.check_at('{', 1)
                        || self.reader.check_at('}', 1))
                {
                    return self.error(
                        "while scanning a plain scalar",
                        start_mark,
                        "found unexpected ':'",
                    );
                }
                if self.reader.check(':') && self.reader.is_blankz_at(1)
                    || self.flow_level != 0
                        && (self.reader.check(',')
                            || self.reader.check('[')
                            || self.reader.check(']')
                            || self.reader.check('{')
                            || self.reader.check('}'))
                {
                    break;
                }
                if leading_blanks || !whitespaces.is_empty() {
                    if leading_blanks {
                        if leading_break.starts_with('\n') {
                            if trailing_breaks.is_empty() {
                                string.push(' ');
                            } else {
                                string.push_str(&trailing_breaks);
                                trailing_breaks.clear();
                            }
                            leading_break.clear();
                        } else {
                            string.push_str(&leading_break);
                            string.push_str(&trailing_breaks);
                            leading_break.clear();
                            trailing_breaks.clear();
                        }
                        leading_blanks = false;
                    } else {
                        string.push_str(&whitespaces);
                        whitespaces.clear();
                    }
                }
                self.reader.read_char(&mut string);
                end_mark = self.reader.mark();
                self.reader.cache(2)?;
            }
            if !(self.reader.is_blank() || self.reader.is_break()) {
                break;
            }
            self.reader.cache(1)?;
            while self.reader.is_blank() || self.reader.is_break() {
                if self.reader.is_blank() {
                    if leading_blanks
                        && (self.reader.mark().column as i64) < indent
                        && self.reader.check('\t')
                    {
                        return self.error(
                            "while scanning a plain scalar",
                            start_mark,
                            "found a tab character that violates indentation",
                        );
                    }
                    if leading_blanks {
                        self.reader.skip();
                    } else {
                        self.reader.read_char(&mut whitespaces);
                    }
                } else {
                    self.reader.cache(2)?;
                    if leading_blanks {
                        self.reader.read_break(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.reader.read_break(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.reader.cache(1)?;
            }
            if self.flow_level == 0 && (self.reader.mark().column as i64) < indent {
                break;
            }
        }
        if leading_blanks {
            self.simple_key_allowed = true;
        }
        Ok(Token::new(
            TokenData::Scalar {
                value: string,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        ))
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan_all(mut input: &[u8]) -> Vec<TokenData> {
        let mut scanner = Scanner::new();
        scanner.set_input(&mut input);
        let mut tokens = Vec::new();
        loop {
            let token = scanner.scan().unwrap();
            let done = matches!(token.data, TokenData::StreamEnd);
            tokens.push(token.data);
            if done {
                return tokens;
            }
        }
    }

    #[test]
    fn simple_mapping_inserts_key_and_mapping_start() {
        let tokens = scan_all(b"key: value\n");
        assert_eq!(
            tokens,
            vec![
                TokenData::StreamStart {
                    encoding: Encoding::Utf8
                },
                TokenData::BlockMappingStart,
                TokenData::Key,
                TokenData::Scalar {
                    value: String::from("key"),
                    style: ScalarStyle::Plain
                },
                TokenData::Value,
                TokenData::Scalar {
                    value: String::from("value"),
                    style: ScalarStyle::Plain
                },
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn block_sequence_brackets_entries() {
        let tokens = scan_all(b"- a\n- b\n");
        assert_eq!(
            tokens,
            vec![
                TokenData::StreamStart {
                    encoding: Encoding::Utf8
                },
                TokenData::BlockSequenceStart,
                TokenData::BlockEntry,
                TokenData::Scalar {
                    value: String::from("a"),
                    style: ScalarStyle::Plain
                },
                TokenData::BlockEntry,
                TokenData::Scalar {
                    value: String::from("b"),
                    style: ScalarStyle::Plain
                },
                TokenData::BlockEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn flow_mapping_tokens() {
        let tokens = scan_all(b"{a: 1, b: 2}\n");
        assert_eq!(
            tokens,
            vec![
                TokenData::StreamStart {
                    encoding: Encoding::Utf8
                },
                TokenData::FlowMappingStart,
                TokenData::Key,
                TokenData::Scalar {
                    value: String::from("a"),
                    style: ScalarStyle::Plain
                },
                TokenData::Value,
                TokenData::Scalar {
                    value: String::from("1"),
                    style: ScalarStyle::Plain
                },
                TokenData::FlowEntry,
                TokenData::Key,
                TokenData::Scalar {
                    value: String::from("b"),
                    style: ScalarStyle::Plain
                },
                TokenData::Value,
                TokenData::Scalar {
                    value: String::from("2"),
                    style: ScalarStyle::Plain
                },
                TokenData::FlowMappingEnd,
                TokenData::StreamEnd,
            ]
        );
    }

    #[test]
    fn literal_block_scalar_clips_by_default() {
        let tokens = scan_all(b"|\n  one\n  two\n\n");
        assert!(tokens.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::Literal } if value == "one\ntwo\n"
        )));
    }

    #[test]
    fn literal_block_scalar_strip_chomping() {
        let tokens = scan_all(b"|-\n  one\n  two\n");
        assert!(tokens.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::Literal } if value == "one\ntwo"
        )));
    }

    #[test]
    fn folded_scalar_joins_lines() {
        let tokens = scan_all(b">\n  one\n  two\n");
        assert!(tokens.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::Folded } if value == "one two\n"
        )));
    }

    #[test]
    fn double_quote_escapes() {
        let tokens = scan_all(b"\"a\\tb\\u0041\\x41\"\n");
        assert!(tokens.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::DoubleQuoted } if value == "a\tbAA"
        )));
    }

    #[test]
    fn single_quote_escaped_apostrophe() {
        let tokens = scan_all(b"'it''s'\n");
        assert!(tokens.iter().any(|t| matches!(
            t,
            TokenData::Scalar { value, style: ScalarStyle::SingleQuoted } if value == "it's"
        )));
    }

    #[test]
    fn directives_become_tokens() {
        let tokens = scan_all(b"%YAML 1.2\n%TAG !e! tag:example.com,2000:\n---\na\n");
        assert!(tokens.contains(&TokenData::VersionDirective { major: 1, minor: 2 }));
        assert!(tokens.contains(&TokenData::TagDirective {
            handle: String::from("!e!"),
            prefix: String::from("tag:example.com,2000:"),
        }));
        assert!(tokens.contains(&TokenData::DocumentStart));
    }

    #[test]
    fn anchor_and_alias_tokens() {
        let tokens = scan_all(b"- &a foo\n- *a\n");
        assert!(tokens.contains(&TokenData::Anchor {
            value: String::from("a")
        }));
        assert!(tokens.contains(&TokenData::Alias {
            value: String::from("a")
        }));
    }

    #[test]
    fn unterminated_quoted_scalar_is_an_error() {
        let mut input: &[u8] = b"'abc\n";
        let mut scanner = Scanner::new();
        scanner.set_input(&mut input);
        let mut result = Ok(());
        for _ in 0..16 {
            match scanner.scan() {
                Ok(token) => {
                    if matches!(token.data, TokenData::StreamEnd) {
                        break;
                    }
                }
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        assert!(result.is_err());
    }

    #[test]
    fn trailing_comment_is_classified_as_line() {
        let mut input: &[u8] = b"key: value # trailing\n";
        let mut scanner = Scanner::new();
        scanner.set_input(&mut input);
        loop {
            if matches!(scanner.scan().unwrap().data, TokenData::StreamEnd) {
                break;
            }
        }
        let comment = scanner.comments.front().expect("one comment queued");
        assert_eq!(comment.line, "trailing");
        assert!(comment.head.is_empty() && comment.foot.is_empty());
    }

    #[test]
    fn comment_block_above_token_is_head() {
        let mut input: &[u8] = b"# one\n# two\nkey: value\n";
        let mut scanner = Scanner::new();
        scanner.set_input(&mut input);
        loop {
            if matches!(scanner.scan().unwrap().data, TokenData::StreamEnd) {
                break;
            }
        }
        let comment = scanner.comments.front().expect("one comment queued");
        assert_eq!(comment.head, "one\ntwo");
    }

    #[test]
    fn blank_line_turns_comment_into_foot() {
        let mut input: &[u8] = b"a: 1\n# foot of a\n\nb: 2\n";
        let mut scanner = Scanner::new();
        scanner.set_input(&mut input);
        loop {
            if matches!(scanner.scan().unwrap().data, TokenData::StreamEnd) {
                break;
            }
        }
        assert!(scanner.comments.iter().any(|c| c.foot == "foot of a"));
    }
}
