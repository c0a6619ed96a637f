/// The pointer position: byte `index`, 0-based `line` and `column`.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Mark {
    /// The position index.
    pub index: u64,
    /// The position line.
    pub line: u64,
    /// The position column.
    pub column: u64,
}

impl Mark {
    pub fn new(index: u64, line: u64, column: u64) -> Self {
        Self {
            index,
            line,
            column,
        }
    }
}

impl std::fmt::Display for Mark {
    /// Renders 1-based, the way marks appear in user-visible messages.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, col {}", self.line + 1, self.column + 1)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("yaml: {problem} at byte {offset}: {value:#x}")]
    Problem {
        problem: &'static str,
        offset: usize,
        value: u32,
    },
    #[error("yaml: invalid UTF-8 octet at byte {offset}: {value:#x}")]
    InvalidUtf8 { offset: usize, value: u8 },
    #[error("yaml: invalid UTF-16 sequence at byte {offset}")]
    InvalidUtf16 { offset: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    #[error("yaml: {context} at {context_mark}: {problem_mark}: {problem}")]
    Problem {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        problem_mark: Mark,
    },
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("yaml: no more tokens")]
    UnexpectedEof,
    #[error("yaml: did not expect more events after STREAM-END")]
    EndOfStream,
    #[error("yaml: {mark}: {problem}")]
    Problem { problem: &'static str, mark: Mark },
    #[error("yaml: {context} at {context_mark}: {mark}: {problem}")]
    ProblemWithContext {
        context: &'static str,
        context_mark: Mark,
        problem: &'static str,
        mark: Mark,
    },
    #[error(transparent)]
    Scanner(#[from] ScannerError),
}

#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    #[error("yaml: {mark}: {problem}")]
    Problem { problem: String, mark: Mark },
    #[error("yaml: {context} at {context_mark}: {mark}: {problem}")]
    ProblemWithContext {
        context: String,
        context_mark: Mark,
        problem: String,
        mark: Mark,
    },
    #[error("yaml: document contains excessive aliasing")]
    ExcessiveAliasing,
    #[error(transparent)]
    Parser(#[from] ParserError),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("yaml: {mark}: {problem}")]
    Problem { problem: String, mark: Mark },
}

#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("yaml: {0}")]
    Problem(&'static str),
    #[error(transparent)]
    Emitter(#[from] EmitterError),
}

#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error("yaml: {0}")]
    Problem(&'static str),
    #[error(transparent)]
    Writer(#[from] WriterError),
}

#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
