//! Inline field markers in manifest comments
//!
//! A marker turns a literal value of a static manifest into a named, typed
//! field of the generated API:
//!
//! ```yaml
//! spec:
//!   replicas: 2 # +operator-builder:field:name=replicas,type=int
//!   template:
//!     spec:
//!       containers:
//!         - name: web
//!           # +operator-builder:field:name=web.image,default="nginx:1.25"
//!           image: nginx:1.19
//! ```
//!
//! Markers live in YAML comments, either trailing the annotated line or on
//! their own line directly above it. The scanner is line-oriented: it keeps a
//! stack of indentation frames to know the key path of every value, without
//! relying on a YAML parser that would discard comments.

use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{CoreError, Result};
use crate::manifest::is_document_separator;

/// Namespace shared by every marker this crate understands
pub const MARKER_NAMESPACE: &str = "+operator-builder:";

/// Prefix of markers defining a field on the workload's own API
pub const FIELD_MARKER_PREFIX: &str = "+operator-builder:field:";

/// Prefix of markers defining a field on the owning collection's API
pub const COLLECTION_MARKER_PREFIX: &str = "+operator-builder:collection:field:";

static INTEGER_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("valid regex"));

static FLOAT_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").expect("valid regex")
});

static FIELD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("valid regex")
});

// =============================================================================
// FIELD TYPES
// =============================================================================

/// Semantic type of a marked field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Object,
}

impl FieldType {
    /// Decode the `type=` argument of a marker
    pub fn parse_hint(hint: &str) -> Option<Self> {
        match hint {
            "string" => Some(Self::String),
            "int" | "integer" => Some(Self::Integer),
            "float" | "number" => Some(Self::Float),
            "bool" | "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Infer the type of an unquoted scalar from its lexical form
    pub fn infer(literal: &str) -> Self {
        if parse_bool(literal).is_some() {
            Self::Boolean
        } else if INTEGER_LITERAL.is_match(literal) {
            // out of range integers read as floats
            if parse_integer(literal).is_some() {
                Self::Integer
            } else {
                Self::Float
            }
        } else if FLOAT_LITERAL.is_match(literal) {
            Self::Float
        } else {
            Self::String
        }
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::List | Self::Object)
    }

    /// Whether a value of lexical type `other` is acceptable for a field declared as `self`
    pub fn accepts(&self, other: FieldType) -> bool {
        match self {
            Self::String => other.is_scalar(),
            Self::Float => matches!(other, Self::Integer | Self::Float),
            _ => *self == other,
        }
    }

    /// Type name used in the generated JSON schema
    pub fn schema_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Boolean => "boolean",
            Self::List => "array",
            Self::Object => "object",
        }
    }

    /// Convert raw (unquoted) text into a value of this type
    pub fn parse_value(&self, text: &str) -> Option<Value> {
        match self {
            Self::String => Some(Value::String(text.to_string())),
            Self::Integer => {
                if !INTEGER_LITERAL.is_match(text) {
                    return None;
                }
                parse_integer(text)
            }
            Self::Float => {
                if !FLOAT_LITERAL.is_match(text) {
                    return None;
                }
                text.parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
            }
            Self::Boolean => parse_bool(text).map(Value::Bool),
            Self::List => match parse_flow(text)? {
                value @ Value::Array(_) => Some(value),
                _ => None,
            },
            Self::Object => match parse_flow(text)? {
                value @ Value::Object(_) => Some(value),
                _ => None,
            },
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::List => "list",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

fn parse_integer(text: &str) -> Option<Value> {
    let digits = text.trim_start_matches('+');
    digits
        .parse::<i64>()
        .map(Value::from)
        .or_else(|_| digits.parse::<u64>().map(Value::from))
        .ok()
}

fn parse_flow(text: &str) -> Option<Value> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).ok()?;
    serde_json::to_value(yaml).ok()
}

// =============================================================================
// MARKERS
// =============================================================================

/// Which API a marker contributes its field to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerScope {
    /// The workload whose manifest holds the marker
    Field,
    /// The collection owning the workload
    Collection,
}

impl fmt::Display for MarkerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field => f.write_str("field"),
            Self::Collection => f.write_str("collection"),
        }
    }
}

/// A decoded marker, before it is applied to a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub scope: MarkerScope,
    pub name: String,
    pub field_type: Option<FieldType>,
    pub default: Option<String>,
    pub description: Option<String>,
    pub replace: Option<String>,
}

impl Marker {
    /// Decode the marker held by a comment, if any
    ///
    /// Comments that don't start with the marker namespace are ignored.
    /// `path` and `line` only locate errors.
    pub fn parse(comment: &str, path: &Path, line: usize) -> Result<Option<Self>> {
        let text = comment.trim();
        let invalid = |message: String| CoreError::InvalidMarker {
            path: path.to_path_buf(),
            line,
            message,
        };

        let (scope, args) = if let Some(args) = text.strip_prefix(COLLECTION_MARKER_PREFIX) {
            (MarkerScope::Collection, args)
        } else if let Some(args) = text.strip_prefix(FIELD_MARKER_PREFIX) {
            (MarkerScope::Field, args)
        } else if text.starts_with(MARKER_NAMESPACE) {
            return Err(invalid(format!("unsupported marker '{text}'")));
        } else {
            return Ok(None);
        };

        let mut marker = Marker {
            scope,
            name: String::new(),
            field_type: None,
            default: None,
            description: None,
            replace: None,
        };
        let mut seen: Vec<String> = Vec::new();

        for arg in split_args(args).map_err(invalid)? {
            let Some((key, value)) = arg.split_once('=') else {
                return Err(invalid(format!("argument '{arg}' is not of the form key=value")));
            };
            let key = key.trim();
            if seen.iter().any(|k| k == key) {
                return Err(invalid(format!("argument '{key}' given more than once")));
            }
            seen.push(key.to_string());

            let value = unquote(value.trim());
            match key {
                "name" => {
                    if !FIELD_NAME.is_match(&value) {
                        return Err(invalid(format!("invalid field name '{value}'")));
                    }
                    marker.name = value;
                }
                "type" => {
                    let field_type = FieldType::parse_hint(&value)
                        .ok_or_else(|| invalid(format!("unsupported field type '{value}'")))?;
                    marker.field_type = Some(field_type);
                }
                "default" => marker.default = Some(value),
                "description" => marker.description = Some(value),
                "replace" => {
                    if value.is_empty() {
                        return Err(invalid("replace text must not be empty".to_string()));
                    }
                    marker.replace = Some(value);
                }
                other => return Err(invalid(format!("unknown marker argument '{other}'"))),
            }
        }

        if marker.name.is_empty() {
            return Err(invalid("marker has no name".to_string()));
        }

        Ok(Some(marker))
    }
}

/// Split marker arguments on commas outside double quotes
///
/// Unquoted whitespace ends the marker.
fn split_args(args: &str) -> std::result::Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in args.chars() {
        if in_quotes {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_quotes = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_quotes = true;
                current.push(c);
            }
            ',' => {
                if current.trim().is_empty() {
                    return Err("empty marker argument".to_string());
                }
                parts.push(std::mem::take(&mut current));
            }
            c if c.is_whitespace() => break,
            c => current.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted marker argument".to_string());
    }
    if !current.trim().is_empty() {
        parts.push(current);
    } else if !parts.is_empty() {
        return Err("empty marker argument".to_string());
    }

    Ok(parts)
}

/// Strip surrounding double quotes and resolve `\"` and `\\` escapes
fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// PARSE RESULTS
// =============================================================================

/// A marker applied to a concrete value of a manifest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerHit {
    /// 1-based line of the annotated value
    pub line: usize,

    /// 0-based index of the YAML document within the manifest
    pub document: usize,

    /// Key path of the annotated value (`spec.template.spec.containers[0].image`)
    pub key_path: String,

    /// Dotted field name declared by the marker
    pub field: String,

    pub field_type: FieldType,

    pub default: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace: Option<String>,

    pub scope: MarkerScope,
}

/// A manifest with its marker comments resolved and stripped
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedManifest {
    pub path: PathBuf,

    /// Manifest content without marker comments
    pub content: String,

    /// Marker hits in source order
    pub markers: Vec<MarkerHit>,
}

impl ParsedManifest {
    /// Hits whose scope is one of `scopes`
    pub fn markers_in<'a>(
        &'a self,
        scopes: &'a [MarkerScope],
    ) -> impl Iterator<Item = &'a MarkerHit> + 'a {
        self.markers.iter().filter(move |m| scopes.contains(&m.scope))
    }

    pub fn has_collection_markers(&self) -> bool {
        self.markers
            .iter()
            .any(|m| m.scope == MarkerScope::Collection)
    }
}

// =============================================================================
// SCANNER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Item(usize),
}

#[derive(Debug, Clone)]
struct Frame {
    indent: usize,
    segment: Segment,
}

/// What a content line holds once its key path is known
enum Slot<'a> {
    /// Inline scalar or flow collection
    Scalar(&'a str),
    /// Nested block content follows on the next lines
    Block,
    /// `|` or `>` block scalar
    BlockScalar,
    /// Continuation of a multi-line value
    Continuation,
}

/// A marker waiting for the block value it annotates to be parsed
struct PendingBlock {
    marker: Marker,
    line: usize,
    segments: Vec<Segment>,
}

#[derive(Default)]
struct Scanner {
    frames: Vec<Frame>,
    block_scalar: Option<usize>,
}

impl Scanner {
    fn reset(&mut self) {
        self.frames.clear();
        self.block_scalar = None;
    }

    fn segments(&self) -> Vec<Segment> {
        self.frames.iter().map(|f| f.segment.clone()).collect()
    }

    /// Track a content line, returning the key path of its value
    fn push_line<'a>(&mut self, indent: usize, line: &'a str) -> (Vec<Segment>, Slot<'a>) {
        let mut col = indent;
        let mut rest = &line[indent..];
        let mut in_item = false;
        let mut item_col = col;

        while rest == "-" || rest.starts_with("- ") {
            self.push_item(col);
            in_item = true;
            item_col = col;

            let after = &rest[1..];
            let content = after.trim_start_matches(' ');
            col += 1 + (after.len() - content.len());
            rest = content;
            if rest.is_empty() {
                return (self.segments(), Slot::Block);
            }
        }

        // `- |` content only has to be indented past the dash
        if in_item && rest.starts_with(['|', '>']) {
            self.block_scalar = Some(item_col);
            return (self.segments(), Slot::BlockScalar);
        }

        if let Some((key, value)) = split_key(rest) {
            while self.frames.last().is_some_and(|f| f.indent >= col) {
                self.frames.pop();
            }

            let mut segments = self.segments();
            segments.push(Segment::Key(key.clone()));

            if value.is_empty() {
                self.frames.push(Frame {
                    indent: col,
                    segment: Segment::Key(key),
                });
                return (segments, Slot::Block);
            }
            if value.starts_with('|') || value.starts_with('>') {
                self.block_scalar = Some(col);
                return (segments, Slot::BlockScalar);
            }
            return (segments, Slot::Scalar(value));
        }

        if in_item {
            (self.segments(), Slot::Scalar(rest))
        } else {
            (self.segments(), Slot::Continuation)
        }
    }

    fn push_item(&mut self, col: usize) {
        let mut next_index = 0;
        while let Some(top) = self.frames.last() {
            let is_item = matches!(top.segment, Segment::Item(_));
            if top.indent > col || (top.indent == col && is_item) {
                if let (true, Segment::Item(index)) = (top.indent == col, &top.segment) {
                    next_index = index + 1;
                }
                self.frames.pop();
            } else {
                break;
            }
        }

        self.frames.push(Frame {
            indent: col,
            segment: Segment::Item(next_index),
        });
    }
}

/// Split `key: value`, returning the unquoted key and the trimmed value
fn split_key(text: &str) -> Option<(String, &str)> {
    if text.starts_with(['[', '{', '|', '>', '#']) {
        return None;
    }

    if let Some(quote) = text.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let close = text[1..].find(quote)? + 1;
        let after = &text[close + 1..];
        let value = after.strip_prefix(':')?;
        if !value.is_empty() && !value.starts_with(' ') {
            return None;
        }
        return Some((text[1..close].to_string(), value.trim()));
    }

    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b':' && (i + 1 == bytes.len() || bytes[i + 1] == b' ') {
            let key = text[..i].trim();
            if key.is_empty() {
                return None;
            }
            return Some((key.to_string(), text[i + 1..].trim()));
        }
    }
    None
}

/// Split a line into its code and its comment (without the `#`)
fn split_comment(line: &str) -> (&str, Option<&str>) {
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if q == '"' && c == '\\' && !escaped {
                    escaped = true;
                    prev = Some(c);
                    continue;
                }
                if c == q && !escaped {
                    quote = None;
                }
                escaped = false;
            }
            None => {
                let at_token_start =
                    prev.is_none_or(|p| p.is_whitespace() || matches!(p, '[' | '{' | ','));
                if (c == '"' || c == '\'') && at_token_start {
                    quote = Some(c);
                } else if c == '#' && prev.is_none_or(char::is_whitespace) {
                    return (&line[..i], Some(&line[i + 1..]));
                }
            }
        }
        prev = Some(c);
    }

    (line, None)
}

fn render_path(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Item(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

fn lookup<'a>(value: &'a serde_yaml::Value, segments: &[Segment]) -> Option<&'a serde_yaml::Value> {
    segments.iter().try_fold(value, |current, segment| match segment {
        Segment::Key(key) => current.get(key.as_str()),
        Segment::Item(index) => current.get(*index),
    })
}

/// Scan manifest content for markers, resolving each against the value it annotates
pub fn parse_manifest(path: &Path, content: &str) -> Result<ParsedManifest> {
    let mut parser = ManifestParser::new(path);

    for (idx, raw_line) in content.lines().enumerate() {
        parser.line(idx + 1, raw_line)?;
    }
    parser.finish_document()?;

    let mut stripped = parser.output.join("\n");
    if content.ends_with('\n') && !stripped.is_empty() {
        stripped.push('\n');
    }

    debug!(
        path = %path.display(),
        markers = parser.hits.len(),
        "parsed manifest markers"
    );

    Ok(ParsedManifest {
        path: path.to_path_buf(),
        content: stripped,
        markers: parser.hits,
    })
}

struct ManifestParser<'p> {
    path: &'p Path,
    scanner: Scanner,
    output: Vec<String>,
    hits: Vec<MarkerHit>,
    head: Option<(usize, Marker)>,
    blocks: Vec<PendingBlock>,
    document: usize,
    document_text: String,
    document_has_content: bool,
}

impl<'p> ManifestParser<'p> {
    fn new(path: &'p Path) -> Self {
        Self {
            path,
            scanner: Scanner::default(),
            output: Vec::new(),
            hits: Vec::new(),
            head: None,
            blocks: Vec::new(),
            document: 0,
            document_text: String::new(),
            document_has_content: false,
        }
    }

    fn invalid(&self, line: usize, message: impl Into<String>) -> CoreError {
        CoreError::InvalidMarker {
            path: self.path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    fn line(&mut self, line_no: usize, raw_line: &str) -> Result<()> {
        if is_document_separator(raw_line) {
            self.finish_document()?;
            self.output.push(raw_line.to_string());
            return Ok(());
        }

        self.document_text.push_str(raw_line);
        self.document_text.push('\n');

        let indent = raw_line.len() - raw_line.trim_start_matches(' ').len();
        if let Some(block_indent) = self.scanner.block_scalar {
            if raw_line.trim().is_empty() || indent > block_indent {
                self.output.push(raw_line.to_string());
                return Ok(());
            }
            self.scanner.block_scalar = None;
        }

        let (code, comment) = split_comment(raw_line);
        let marker = match comment {
            Some(comment) => Marker::parse(comment, self.path, line_no)?,
            None => None,
        };

        if code.trim().is_empty() {
            match marker {
                Some(marker) => {
                    if let Some((head_line, _)) = &self.head {
                        return Err(self.invalid(
                            *head_line,
                            "marker is not followed by an annotatable line",
                        ));
                    }
                    trace!(line = line_no, field = %marker.name, "head marker");
                    self.head = Some((line_no, marker));
                }
                None => self.output.push(raw_line.to_string()),
            }
            return Ok(());
        }

        self.document_has_content = true;
        let has_trailing = marker.is_some();
        let annotation = match (self.head.take(), marker) {
            (Some(_), Some(_)) => {
                return Err(self.invalid(
                    line_no,
                    "value is annotated by both a head marker and a trailing marker",
                ));
            }
            (Some((_, m)), None) | (None, Some(m)) => Some(m),
            (None, None) => None,
        };

        let code = code.trim_end();
        let (segments, slot) = self.scanner.push_line(indent, code);

        if let Some(marker) = annotation {
            match slot {
                Slot::Scalar(literal) => {
                    let hit = self.resolve_scalar(marker, literal, line_no, &segments)?;
                    self.hits.push(hit);
                }
                Slot::Block => self.blocks.push(PendingBlock {
                    marker,
                    line: line_no,
                    segments,
                }),
                Slot::BlockScalar => {
                    return Err(self.invalid(line_no, "block scalars cannot be annotated"));
                }
                Slot::Continuation => {
                    return Err(self.invalid(line_no, "marker does not annotate a value"));
                }
            }
        }

        if has_trailing {
            self.output.push(code.to_string());
        } else {
            self.output.push(raw_line.to_string());
        }
        Ok(())
    }

    fn resolve_scalar(
        &self,
        marker: Marker,
        literal: &str,
        line: usize,
        segments: &[Segment],
    ) -> Result<MarkerHit> {
        let quoted = literal.starts_with('"') || literal.starts_with('\'');
        let text = if quoted { unquote_yaml(literal) } else { literal.to_string() };

        let lexical = if quoted {
            FieldType::String
        } else if literal.starts_with('[') {
            FieldType::List
        } else if literal.starts_with('{') {
            FieldType::Object
        } else {
            FieldType::infer(&text)
        };

        let conflict = |declared: FieldType| CoreError::MarkerTypeConflict {
            path: self.path.to_path_buf(),
            line,
            field: marker.name.clone(),
            declared,
            literal: literal.to_string(),
        };

        let field_type = if let Some(replace) = &marker.replace {
            if let Some(declared) = marker.field_type.filter(|t| *t != FieldType::String) {
                return Err(conflict(declared));
            }
            if !text.contains(replace.as_str()) {
                return Err(self.invalid(
                    line,
                    format!("replace text '{replace}' does not occur in '{text}'"),
                ));
            }
            FieldType::String
        } else {
            match marker.field_type {
                Some(declared) if !declared.accepts(lexical) => return Err(conflict(declared)),
                Some(declared) => declared,
                None => lexical,
            }
        };

        let default = match (&marker.default, &marker.replace) {
            (Some(explicit), _) => self.explicit_default(&marker, field_type, explicit, line)?,
            (None, Some(replace)) => Value::String(replace.clone()),
            (None, None) => field_type.parse_value(&text).ok_or_else(|| {
                self.invalid(line, format!("value '{literal}' is not a valid {field_type}"))
            })?,
        };

        Ok(self.hit(marker, line, segments, field_type, default))
    }

    fn explicit_default(
        &self,
        marker: &Marker,
        field_type: FieldType,
        text: &str,
        line: usize,
    ) -> Result<Value> {
        field_type.parse_value(text).ok_or_else(|| {
            self.invalid(
                line,
                format!(
                    "default '{text}' of field '{}' is not a valid {field_type}",
                    marker.name
                ),
            )
        })
    }

    fn hit(
        &self,
        marker: Marker,
        line: usize,
        segments: &[Segment],
        field_type: FieldType,
        default: Value,
    ) -> MarkerHit {
        trace!(line, field = %marker.name, %field_type, "marker hit");
        MarkerHit {
            line,
            document: self.document,
            key_path: render_path(segments),
            field: marker.name,
            field_type,
            default,
            description: marker.description,
            replace: marker.replace,
            scope: marker.scope,
        }
    }

    /// Resolve markers waiting on block values and start a new document
    fn finish_document(&mut self) -> Result<()> {
        if let Some((line, _)) = self.head.take() {
            return Err(self.invalid(line, "marker is not followed by an annotatable line"));
        }

        let blocks = std::mem::take(&mut self.blocks);
        if !blocks.is_empty() {
            let document: serde_yaml::Value = serde_yaml::from_str(&self.document_text)
                .map_err(|e| CoreError::InvalidManifest {
                    path: self.path.to_path_buf(),
                    message: e.to_string(),
                })?;

            for block in blocks {
                let hit = self.resolve_block(&document, block)?;
                self.hits.push(hit);
            }
            self.hits.sort_by_key(|h| h.line);
        }

        self.scanner.reset();
        self.document_text.clear();
        if self.document_has_content {
            self.document += 1;
        }
        self.document_has_content = false;
        Ok(())
    }

    fn resolve_block(&self, document: &serde_yaml::Value, block: PendingBlock) -> Result<MarkerHit> {
        let PendingBlock {
            marker,
            line,
            segments,
        } = block;

        let value = lookup(document, &segments)
            .filter(|v| !v.is_null())
            .ok_or_else(|| self.invalid(line, "marker annotates an empty value"))?;

        let lexical = match value {
            serde_yaml::Value::Sequence(_) => FieldType::List,
            serde_yaml::Value::Mapping(_) => FieldType::Object,
            _ => return Err(self.invalid(line, "marker annotates an unsupported value")),
        };

        if marker.replace.is_some() {
            return Err(self.invalid(line, "replace only applies to string values"));
        }
        if let Some(declared) = marker.field_type.filter(|t| !t.accepts(lexical)) {
            return Err(CoreError::MarkerTypeConflict {
                path: self.path.to_path_buf(),
                line,
                field: marker.name.clone(),
                declared,
                literal: lexical.to_string(),
            });
        }

        let default = match &marker.default {
            Some(explicit) => self.explicit_default(&marker, lexical, explicit, line)?,
            None => serde_json::to_value(value).map_err(|e| CoreError::InvalidManifest {
                path: self.path.to_path_buf(),
                message: e.to_string(),
            })?,
        };

        Ok(self.hit(marker, line, &segments, lexical, default))
    }
}

/// Unquote a YAML quoted scalar
fn unquote_yaml(literal: &str) -> String {
    if let Some(inner) = literal.strip_prefix('\'').and_then(|l| l.strip_suffix('\'')) {
        return inner.replace("''", "'");
    }
    match serde_yaml::from_str::<String>(literal) {
        Ok(text) => text,
        Err(_) => unquote(literal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(content: &str) -> Result<ParsedManifest> {
        parse_manifest(Path::new("manifests/app.yaml"), content)
    }

    const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web # keep this comment
spec:
  replicas: 2 # +operator-builder:field:name=web.replicas,type=int,description="Number of web pods"
  template:
    spec:
      containers:
        - name: web
          # +operator-builder:field:name=web.image,default="nginx:1.25"
          image: nginx:1.19
          ports:
            - containerPort: 80 # +operator-builder:collection:field:name=port
        - name: sidecar
          image: "busybox:1.36" # +operator-builder:field:name=sidecar.tag,replace="1.36"
"#;

    #[test]
    fn test_parse_markers() {
        let parsed = parse(DEPLOYMENT).unwrap();
        assert_eq!(parsed.markers.len(), 4);

        let replicas = &parsed.markers[0];
        assert_eq!(replicas.line, 6);
        assert_eq!(replicas.key_path, "spec.replicas");
        assert_eq!(replicas.field, "web.replicas");
        assert_eq!(replicas.field_type, FieldType::Integer);
        assert_eq!(replicas.default, json!(2));
        assert_eq!(replicas.description.as_deref(), Some("Number of web pods"));
        assert_eq!(replicas.scope, MarkerScope::Field);

        let image = &parsed.markers[1];
        assert_eq!(image.line, 12);
        assert_eq!(image.key_path, "spec.template.spec.containers[0].image");
        assert_eq!(image.field_type, FieldType::String);
        assert_eq!(image.default, json!("nginx:1.25"));

        let port = &parsed.markers[2];
        assert_eq!(
            port.key_path,
            "spec.template.spec.containers[0].ports[0].containerPort"
        );
        assert_eq!(port.scope, MarkerScope::Collection);
        assert_eq!(port.default, json!(80));

        let tag = &parsed.markers[3];
        assert_eq!(tag.key_path, "spec.template.spec.containers[1].image");
        assert_eq!(tag.field_type, FieldType::String);
        assert_eq!(tag.default, json!("1.36"));
        assert_eq!(tag.replace.as_deref(), Some("1.36"));
    }

    #[test]
    fn test_markers_are_stripped() {
        let parsed = parse(DEPLOYMENT).unwrap();

        assert!(!parsed.content.contains("+operator-builder"));
        assert!(parsed.content.contains("name: web # keep this comment"));
        assert!(parsed.content.contains("  replicas: 2\n"));
        assert!(parsed.content.contains("image: \"busybox:1.36\"\n"));
        assert_eq!(parsed.content.lines().count(), DEPLOYMENT.lines().count() - 1);

        let value: serde_yaml::Value = serde_yaml::from_str(&parsed.content).unwrap();
        assert_eq!(value["spec"]["replicas"], serde_yaml::Value::from(2));
    }

    #[test]
    fn test_unmarked_content_is_untouched() {
        let content = "apiVersion: v1\nkind: ConfigMap\ndata:\n  key: value # note\n";
        let parsed = parse(content).unwrap();
        assert!(parsed.markers.is_empty());
        assert_eq!(parsed.content, content);
    }

    #[test]
    fn test_type_inference() {
        assert_eq!(FieldType::infer("42"), FieldType::Integer);
        assert_eq!(FieldType::infer("-7"), FieldType::Integer);
        assert_eq!(FieldType::infer("1.5"), FieldType::Float);
        assert_eq!(FieldType::infer("1e3"), FieldType::Float);
        assert_eq!(FieldType::infer("true"), FieldType::Boolean);
        assert_eq!(FieldType::infer("False"), FieldType::Boolean);
        assert_eq!(FieldType::infer("nginx:1.19"), FieldType::String);
        assert_eq!(FieldType::infer("1.2.3"), FieldType::String);
    }

    #[test]
    fn test_oversized_integer_reads_as_float() {
        assert_eq!(FieldType::infer("18446744073709551615"), FieldType::Integer);
        assert_eq!(FieldType::infer("99999999999999999999"), FieldType::Float);

        let parsed = parse("size: 99999999999999999999 # +operator-builder:field:name=size\n").unwrap();
        assert_eq!(parsed.markers[0].field_type, FieldType::Float);
        assert!(parsed.markers[0].default.is_f64());
    }

    #[test]
    fn test_quoted_literal_is_string() {
        let parsed = parse("port: \"8080\" # +operator-builder:field:name=port\n").unwrap();
        assert_eq!(parsed.markers[0].field_type, FieldType::String);
        assert_eq!(parsed.markers[0].default, json!("8080"));
    }

    #[test]
    fn test_declared_type_conflict() {
        let err = parse("replicas: two # +operator-builder:field:name=replicas,type=int\n")
            .unwrap_err();
        match err {
            CoreError::MarkerTypeConflict {
                field,
                declared,
                line,
                ..
            } => {
                assert_eq!(field, "replicas");
                assert_eq!(declared, FieldType::Integer);
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_declared_string_and_float_widen() {
        let parsed = parse(
            "a: 3 # +operator-builder:field:name=a,type=string\nb: 3 # +operator-builder:field:name=b,type=float\n",
        )
        .unwrap();
        assert_eq!(parsed.markers[0].default, json!("3"));
        assert_eq!(parsed.markers[1].field_type, FieldType::Float);
        assert_eq!(parsed.markers[1].default, json!(3.0));
    }

    #[test]
    fn test_invalid_default_for_type() {
        let err = parse("replicas: 2 # +operator-builder:field:name=replicas,default=lots\n")
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidMarker { line: 1, .. }));
    }

    #[test]
    fn test_block_values() {
        let content = r#"spec:
  # +operator-builder:field:name=args
  args:
    - --verbose
    - --port=80
  # +operator-builder:field:name=labels
  labels:
    app: web
"#;
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.markers[0].field_type, FieldType::List);
        assert_eq!(parsed.markers[0].default, json!(["--verbose", "--port=80"]));
        assert_eq!(parsed.markers[1].field_type, FieldType::Object);
        assert_eq!(parsed.markers[1].default, json!({"app": "web"}));
    }

    #[test]
    fn test_flow_sequence_is_list() {
        let parsed = parse("args: [a, b] # +operator-builder:field:name=args\n").unwrap();
        assert_eq!(parsed.markers[0].field_type, FieldType::List);
        assert_eq!(parsed.markers[0].default, json!(["a", "b"]));
    }

    #[test]
    fn test_list_items_at_parent_indent() {
        let content = "items:\n- a\n- b # +operator-builder:field:name=second\nafter: 1 # +operator-builder:field:name=after\n";
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.markers[0].key_path, "items[1]");
        assert_eq!(parsed.markers[1].key_path, "after");
    }

    #[test]
    fn test_documents_reset_paths() {
        let content = "---\nkind: A\nspec:\n  x: 1\n---\nkind: B\ny: 2 # +operator-builder:field:name=y\n";
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.markers[0].document, 1);
        assert_eq!(parsed.markers[0].key_path, "y");
    }

    #[test]
    fn test_invalid_markers() {
        let cases = [
            "a: 1 # +operator-builder:field:type=int\n",
            "a: 1 # +operator-builder:field:name=a,color=red\n",
            "a: 1 # +operator-builder:field:name=a,name=b\n",
            "a: 1 # +operator-builder:field:name=a,type=date\n",
            "a: 1 # +operator-builder:field:name=9lives\n",
            "a: 1 # +operator-builder:resource:include\n",
            "a: nginx # +operator-builder:field:name=a,replace=\"apache\"\n",
            "# +operator-builder:field:name=a\n",
            "# +operator-builder:field:name=a\n---\nb: 1\n",
            "a: |\n  text\n# +operator-builder:field:name=a\n# +operator-builder:field:name=b\nc: 1\n",
        ];

        for content in cases {
            let err = parse(content).unwrap_err();
            assert!(
                matches!(err, CoreError::InvalidMarker { .. }),
                "{content:?} -> {err}"
            );
        }
    }

    #[test]
    fn test_hash_inside_quotes_is_not_a_comment() {
        let parsed =
            parse("color: \"#fff\" # +operator-builder:field:name=color\nurl: http://x/#frag\n")
                .unwrap();
        assert_eq!(parsed.markers[0].default, json!("#fff"));
        assert!(parsed.content.contains("url: http://x/#frag"));
    }

    #[test]
    fn test_block_scalar_content_is_skipped() {
        let content = "data:\n  script: |\n    - not: a list\n    # +operator-builder:field:name=nope\n  size: 3 # +operator-builder:field:name=size\n";
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.markers.len(), 1);
        assert_eq!(parsed.markers[0].key_path, "data.size");
    }

    #[test]
    fn test_block_scalar_list_item_is_skipped() {
        let content = "args:\n  - |\n    a: b # +operator-builder:field:name=x\n  - >\n    c: d # +operator-builder:field:name=y\n  - plain # +operator-builder:field:name=arg\n";
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.markers.len(), 1);
        assert_eq!(parsed.markers[0].field, "arg");
        assert_eq!(parsed.markers[0].key_path, "args[2]");
        assert!(parsed.content.contains("    a: b # +operator-builder:field:name=x\n"));
        assert!(parsed.content.contains("    c: d # +operator-builder:field:name=y\n"));
    }

    #[test]
    fn test_marker_hit_snapshot() {
        let parsed = parse(DEPLOYMENT).unwrap();
        let rendered = serde_yaml::to_string(&parsed.markers[0]).unwrap();
        insta::assert_snapshot!(rendered, @r###"
        line: 6
        document: 0
        keyPath: spec.replicas
        field: web.replicas
        fieldType: integer
        default: 2
        description: Number of web pods
        scope: field
        "###);
    }
}
