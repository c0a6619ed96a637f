//! A YAML 1.2 processing engine built as two mirrored event pipelines.
//!
//! Loading runs bytes through the [`Reader`] (encoding detection), the
//! [`Scanner`] (tokens), the [`Parser`] (events) and the [`Composer`], which
//! builds a [`Tree`] of nodes preserving anchors, aliases, comments, tags and
//! styles. The [`Resolver`] then infers implicit tags in place.
//!
//! Dumping mirrors the load path: the [`Desolver`] strips tags the resolver
//! would re-infer, the [`Serializer`] walks the tree issuing events, and the
//! [`Emitter`] renders events through the [`Writer`] back into bytes.
//!
//! Every component is fail-stop: the first error ends the stream, and the
//! caller is expected to discard it. Instances are single-threaded; separate
//! streams may be processed on separate threads with no shared state.

#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::fn_params_excessive_bools,
    clippy::manual_range_contains,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::unnecessary_wraps,
    clippy::match_wildcard_for_single_variants
)]
#![deny(unsafe_code)]

mod chars;
mod composer;
mod desolver;
mod emitter;
mod error;
mod event;
mod node;
mod parser;
mod reader;
mod resolver;
mod scanner;
mod serializer;
mod token;
mod writer;

pub use crate::composer::{AliasBudget, CommentPlugin, ComposeOptions, Composer};
pub use crate::desolver::{Desolver, QuoteStyle};
pub use crate::emitter::Emitter;
pub use crate::error::*;
pub use crate::event::*;
pub use crate::node::*;
pub use crate::parser::{Parser, ParserState};
pub use crate::reader::Reader;
pub use crate::resolver::{ResolveContext, Resolver, ResolverPlugin};
pub use crate::scanner::{Comment, Scanner};
pub use crate::serializer::{SerializeOptions, Serializer};
pub use crate::token::*;
pub use crate::writer::Writer;

pub(crate) const INPUT_RAW_BUFFER_SIZE: usize = 16384;
pub(crate) const INPUT_BUFFER_SIZE: usize = INPUT_RAW_BUFFER_SIZE;
pub(crate) const OUTPUT_BUFFER_SIZE: usize = 16384;

/// The tag `!!null` with the only possible value: `null`.
pub const NULL_TAG: &str = "tag:yaml.org,2002:null";
/// The tag `!!bool` with the values: `true` and `false`.
pub const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
/// The tag `!!str` for string values.
pub const STR_TAG: &str = "tag:yaml.org,2002:str";
/// The tag `!!int` for integer values.
pub const INT_TAG: &str = "tag:yaml.org,2002:int";
/// The tag `!!float` for float values.
pub const FLOAT_TAG: &str = "tag:yaml.org,2002:float";
/// The tag `!!timestamp` for date and time values.
pub const TIMESTAMP_TAG: &str = "tag:yaml.org,2002:timestamp";
/// The tag `!!merge` for the `<<` merge key.
pub const MERGE_TAG: &str = "tag:yaml.org,2002:merge";
/// The tag `!!binary` for base64-encoded byte strings.
pub const BINARY_TAG: &str = "tag:yaml.org,2002:binary";

/// The tag `!!seq` is used to denote sequences.
pub const SEQ_TAG: &str = "tag:yaml.org,2002:seq";
/// The tag `!!map` is used to denote mapping.
pub const MAP_TAG: &str = "tag:yaml.org,2002:map";

/// The default scalar tag is `!!str`.
pub const DEFAULT_SCALAR_TAG: &str = STR_TAG;
/// The default sequence tag is `!!seq`.
pub const DEFAULT_SEQUENCE_TAG: &str = SEQ_TAG;
/// The default mapping tag is `!!map`.
pub const DEFAULT_MAPPING_TAG: &str = MAP_TAG;

/// The version directive data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct VersionDirective {
    /// The major version number.
    pub major: i32,
    /// The minor version number.
    pub minor: i32,
}

impl VersionDirective {
    pub fn new(major: i32, minor: i32) -> Self {
        Self { major, minor }
    }
}

/// The tag directive data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct TagDirective {
    /// The tag handle.
    pub handle: String,
    /// The tag prefix.
    pub prefix: String,
}

impl TagDirective {
    pub fn new(handle: &str, prefix: &str) -> Self {
        Self {
            handle: String::from(handle),
            prefix: String::from(prefix),
        }
    }
}

/// The stream encoding.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Encoding {
    /// Let the reader detect the encoding.
    #[default]
    Any = 0,
    /// The default UTF-8 encoding.
    Utf8 = 1,
    /// The UTF-16-LE encoding with BOM.
    Utf16Le = 2,
    /// The UTF-16-BE encoding with BOM.
    Utf16Be = 3,
}

/// Line break type.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum Break {
    /// Let the emitter choose the break type.
    #[default]
    Any = 0,
    /// Use CR for line breaks (Mac style).
    Cr = 1,
    /// Use LN for line breaks (Unix style).
    Ln = 2,
    /// Use CR LN for line breaks (DOS style).
    CrLn = 3,
}

/// Scalar styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum ScalarStyle {
    /// Let the emitter choose the style.
    #[default]
    Any = 0,
    /// The plain scalar style.
    Plain = 1,
    /// The single-quoted scalar style.
    SingleQuoted = 2,
    /// The double-quoted scalar style.
    DoubleQuoted = 3,
    /// The literal scalar style.
    Literal = 4,
    /// The folded scalar style.
    Folded = 5,
}

/// Sequence styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum SequenceStyle {
    /// Let the emitter choose the style.
    #[default]
    Any = 0,
    /// The block sequence style.
    Block = 1,
    /// The flow sequence style.
    Flow = 2,
}

/// Mapping styles.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[non_exhaustive]
pub enum MappingStyle {
    /// Let the emitter choose the style.
    #[default]
    Any = 0,
    /// The block mapping style.
    Block = 1,
    /// The flow mapping style.
    Flow = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanity() {
        const SANITY_INPUT: &str = r#"
unicode: "Sosa did fine.☺"
control: "\b1998\t1999\t2000\n"
hex esc: "\x0d\x0a is \r\n"

single: '"Howdy!" he cried.'
quoted: ' # Not a ''comment''.'
tie-fighter: '|\-*-/|'
"#;
        let mut input = SANITY_INPUT.as_bytes();
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_input(&mut input);
        let tree = composer.compose().unwrap().expect("one document");
        assert!(matches!(tree.root().data, NodeData::Document { .. }));
    }

    #[test]
    fn flow_mapping_inside_flow_sequence() {
        let mut input: &[u8] = b"[\nfoo: bar\n]\n";
        let mut composer = Composer::new(ComposeOptions::default());
        composer.set_input(&mut input);
        let tree = composer.compose().unwrap().expect("one document");
        let root = tree.content_root().expect("root node");
        assert!(matches!(tree.get(root).data, NodeData::Sequence { .. }));
    }

    #[test]
    fn integration_hs5t() {
        let mut output = Vec::new();
        let mut emitter = Emitter::new();
        emitter.set_output_string(&mut output);

        emitter.emit(Event::stream_start(Encoding::Utf8)).unwrap();
        emitter
            .emit(Event::document_start(None, &[], true))
            .unwrap();
        emitter
            .emit(Event::scalar(
                None,
                None,
                "1st non-empty\n2nd non-empty 3rd non-empty",
                true,
                true,
                ScalarStyle::Plain,
            ))
            .unwrap();
        emitter.emit(Event::document_end(true)).unwrap();
        emitter.emit(Event::stream_end()).unwrap();

        assert_eq!(
            core::str::from_utf8(&output),
            Ok("'1st non-empty\n\n  2nd non-empty 3rd non-empty'\n")
        );
    }
}
