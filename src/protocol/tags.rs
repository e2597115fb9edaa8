use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::ops::Range;

const WRITE_CLOSE: &str = "</write>";
const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";
const SUMMARY_OPEN: &str = "<chat-summary>";
const SUMMARY_CLOSE: &str = "</chat-summary>";

/// Tag prefixes neutralized inside reasoning text.
const ESCAPED_PREFIXES: &[&str] = &[
    "<write",
    "</write",
    "<delete",
    "<rename",
    "<add-dependency",
    "<chat-summary",
    "</chat-summary",
    "<think",
    "</think",
];

/// One file-mutation instruction embedded in model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Directive {
    Write {
        path: String,
        /// Literal text between the open and close tags.
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Delete {
        path: String,
    },
    Rename {
        from: String,
        to: String,
    },
    AddDependency {
        packages: Vec<String>,
    },
}

impl Directive {
    /// Project paths this directive touches.
    pub fn paths(&self) -> Vec<&str> {
        match self {
            Self::Write { path, .. } | Self::Delete { path } => vec![path.as_str()],
            Self::Rename { from, to } => vec![from.as_str(), to.as_str()],
            Self::AddDependency { .. } => Vec::new(),
        }
    }
}

/// Body of a `write` tag, including one still being streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBody {
    pub path: Option<String>,
    pub content: String,
    pub closed: bool,
}

/// Everything a single pass over response text finds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagScan {
    /// Well-formed directives in document order.
    pub directives: Vec<Directive>,
    pub write_bodies: Vec<WriteBody>,
    /// Text with directive markup and write bodies removed.
    pub outside: String,
    pub unclosed_write: bool,
    /// `write` opens found inside another write body.
    pub nested_write_opens: usize,
    /// `</write>` with no open tag.
    pub stray_write_closes: usize,
    /// Byte ranges of `<think>` blocks outside write bodies. An unterminated
    /// block runs to the end of text.
    pub thinking: Vec<Range<usize>>,
}

impl TagScan {
    pub fn has_structure_errors(&self) -> bool {
        self.nested_write_opens > 0 || self.stray_write_closes > 0
    }

    pub fn adds_dependencies(&self) -> bool {
        self.directives
            .iter()
            .any(|d| matches!(d, Directive::AddDependency { .. }))
    }

    fn take_write(&mut self, text: &str, body_start: usize, tag: &OpenTag) -> usize {
        let path = tag.attr("path").filter(|p| !p.is_empty()).map(str::to_string);
        let (content, closed, next) = match text[body_start..].find(WRITE_CLOSE) {
            Some(rel) => (
                &text[body_start..body_start + rel],
                true,
                body_start + rel + WRITE_CLOSE.len(),
            ),
            None => (&text[body_start..], false, text.len()),
        };

        self.nested_write_opens += count_write_opens(content);
        if closed {
            if let Some(path) = &path {
                self.directives.push(Directive::Write {
                    path: path.clone(),
                    content: content.to_string(),
                    description: tag.attr("description").map(str::to_string),
                });
            }
        } else {
            self.unclosed_write = true;
        }
        self.write_bodies.push(WriteBody {
            path,
            content: content.to_string(),
            closed,
        });
        next
    }

    fn push_self_closing(&mut self, name: TagName, tag: &OpenTag) {
        let non_empty = |key: &str| tag.attr(key).filter(|v| !v.is_empty()).map(str::to_string);
        let directive = match name {
            TagName::Write => {
                let path = non_empty("path");
                self.write_bodies.push(WriteBody {
                    path: path.clone(),
                    content: String::new(),
                    closed: true,
                });
                path.map(|path| Directive::Write {
                    path,
                    content: String::new(),
                    description: tag.attr("description").map(str::to_string),
                })
            }
            TagName::Delete => non_empty("path").map(|path| Directive::Delete { path }),
            TagName::Rename => match (non_empty("from"), non_empty("to")) {
                (Some(from), Some(to)) => Some(Directive::Rename { from, to }),
                _ => None,
            },
            TagName::AddDependency => {
                // Whitespace split only; a comma-separated list stays as-is.
                let packages: Vec<String> = tag
                    .attr("packages")
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                (!packages.is_empty()).then_some(Directive::AddDependency { packages })
            }
        };
        match directive {
            Some(directive) => self.directives.push(directive),
            None => tracing::debug!(tag = name.as_str(), "Skipping tag with missing attributes"),
        }
    }
}

// ── Tag grammar ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagName {
    Write,
    Delete,
    Rename,
    AddDependency,
}

impl TagName {
    const ALL: [TagName; 4] = [
        TagName::Write,
        TagName::Delete,
        TagName::Rename,
        TagName::AddDependency,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Rename => "rename",
            Self::AddDependency => "add-dependency",
        }
    }

    fn close_tag(self) -> &'static str {
        match self {
            Self::Write => WRITE_CLOSE,
            Self::Delete => "</delete>",
            Self::Rename => "</rename>",
            Self::AddDependency => "</add-dependency>",
        }
    }
}

struct OpenTag {
    attrs: Vec<(String, String)>,
    len: usize,
    self_closed: bool,
}

impl OpenTag {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

enum TagParse {
    Complete(OpenTag),
    /// Text ends before the tag does.
    Incomplete,
    Invalid,
}

/// `rest` starts with `<`.
fn match_tag_name(rest: &str) -> Option<TagName> {
    let after = &rest[1..];
    TagName::ALL.into_iter().find(|name| {
        after.strip_prefix(name.as_str()).is_some_and(|tail| {
            tail.is_empty() || tail.starts_with(|c: char| c.is_whitespace() || c == '>' || c == '/')
        })
    })
}

fn parse_open_tag(rest: &str, name: TagName) -> TagParse {
    let bytes = rest.as_bytes();
    let len = bytes.len();
    let mut i = 1 + name.as_str().len();
    let mut attrs = Vec::new();

    loop {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            return TagParse::Incomplete;
        }
        match bytes[i] {
            b'>' => {
                return TagParse::Complete(OpenTag {
                    attrs,
                    len: i + 1,
                    self_closed: false,
                });
            }
            b'/' => {
                return match bytes.get(i + 1) {
                    None => TagParse::Incomplete,
                    Some(b'>') => TagParse::Complete(OpenTag {
                        attrs,
                        len: i + 2,
                        self_closed: true,
                    }),
                    Some(_) => TagParse::Invalid,
                };
            }
            _ => {}
        }

        let key_start = i;
        while i < len && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b'_')) {
            i += 1;
        }
        if i == key_start {
            return TagParse::Invalid;
        }
        let key = rest[key_start..i].to_string();

        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            return TagParse::Incomplete;
        }
        if bytes[i] != b'=' {
            attrs.push((key, String::new()));
            continue;
        }
        i += 1;
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= len {
            return TagParse::Incomplete;
        }

        let quote = bytes[i];
        if quote == b'"' || quote == b'\'' {
            let value_start = i + 1;
            let Some(rel) = rest[value_start..].find(char::from(quote)) else {
                return TagParse::Incomplete;
            };
            attrs.push((key, rest[value_start..value_start + rel].to_string()));
            i = value_start + rel + 1;
        } else {
            let value_start = i;
            while i < len
                && !bytes[i].is_ascii_whitespace()
                && bytes[i] != b'>'
                && !(bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'>'))
            {
                i += 1;
            }
            if i >= len {
                return TagParse::Incomplete;
            }
            attrs.push((key, rest[value_start..i].to_string()));
        }
    }
}

/// Complete `write` open tags only; a trailing `<write` may still turn out
/// to be `<writer>` or similar.
fn count_write_opens(content: &str) -> usize {
    content
        .match_indices('<')
        .filter(|(idx, _)| {
            let rest = &content[*idx..];
            match_tag_name(rest) == Some(TagName::Write)
                && matches!(parse_open_tag(rest, TagName::Write), TagParse::Complete(_))
        })
        .count()
}

fn skip_closing(text: &str, pos: usize, name: TagName) -> usize {
    if text[pos..].starts_with(name.close_tag()) {
        pos + name.close_tag().len()
    } else {
        pos
    }
}

// ── Public entry points ───────────────────────────────────────────

/// Scan response text once. Thinking blocks and write bodies are never
/// searched for further tags, and a thinking marker inside a write body is
/// plain content.
pub fn scan(text: &str) -> TagScan {
    let mut scan = TagScan::default();
    let mut pos = 0;

    while let Some(rel) = text[pos..].find('<') {
        let start = pos + rel;
        let rest = &text[start..];

        if rest.starts_with(THINK_OPEN) {
            scan.outside.push_str(&text[pos..start]);
            let body_start = start + THINK_OPEN.len();
            match text[body_start..].find(THINK_CLOSE) {
                Some(end) => {
                    pos = body_start + end + THINK_CLOSE.len();
                    scan.thinking.push(start..pos);
                }
                None => {
                    scan.thinking.push(start..text.len());
                    return scan;
                }
            }
            continue;
        }

        if rest.starts_with(WRITE_CLOSE) {
            scan.outside.push_str(&text[pos..start]);
            scan.stray_write_closes += 1;
            pos = start + WRITE_CLOSE.len();
            continue;
        }

        let parsed = match match_tag_name(rest) {
            Some(name) => (name, parse_open_tag(rest, name)),
            None => {
                scan.outside.push_str(&text[pos..=start]);
                pos = start + 1;
                continue;
            }
        };

        match parsed {
            (_, TagParse::Invalid) => {
                scan.outside.push_str(&text[pos..=start]);
                pos = start + 1;
            }
            (name, TagParse::Incomplete) => {
                scan.outside.push_str(&text[pos..start]);
                if name == TagName::Write {
                    scan.unclosed_write = true;
                }
                return scan;
            }
            (name, TagParse::Complete(tag)) => {
                scan.outside.push_str(&text[pos..start]);
                let body_start = start + tag.len;
                pos = if name == TagName::Write && !tag.self_closed {
                    scan.take_write(text, body_start, &tag)
                } else {
                    scan.push_self_closing(name, &tag);
                    skip_closing(text, body_start, name)
                };
            }
        }
    }

    scan.outside.push_str(&text[pos..]);
    scan
}

/// All well-formed directives, in document order.
pub fn parse_directives(text: &str) -> Vec<Directive> {
    scan(text).directives
}

/// True when a `write` tag was opened but never closed.
pub fn has_unclosed_write(text: &str) -> bool {
    scan(text).unclosed_write
}

/// Bodies of every complete `<chat-summary>` outside write bodies.
pub fn extract_chat_summaries(text: &str) -> Vec<String> {
    let outside = scan(text).outside;
    let mut summaries = Vec::new();
    let mut rest = outside.as_str();
    while let Some(start) = rest.find(SUMMARY_OPEN) {
        let after = &rest[start + SUMMARY_OPEN.len()..];
        let Some(end) = after.find(SUMMARY_CLOSE) else {
            break;
        };
        summaries.push(after[..end].trim().to_string());
        rest = &after[end + SUMMARY_CLOSE.len()..];
    }
    summaries
}

pub fn extract_chat_summary(text: &str) -> Option<String> {
    extract_chat_summaries(text).into_iter().next()
}

/// Remove `<think>` blocks outside write bodies; an unterminated block runs
/// to the end of text.
pub fn strip_thinking(text: &str) -> Cow<'_, str> {
    if !text.contains(THINK_OPEN) {
        return Cow::Borrowed(text);
    }
    let thinking = scan(text).thinking;
    if thinking.is_empty() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for block in thinking {
        out.push_str(&text[last..block.start]);
        last = block.end;
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}

pub fn think_open() -> &'static str {
    THINK_OPEN
}

pub fn think_close() -> &'static str {
    THINK_CLOSE
}

/// Replace the `<` of every protocol tag prefix with `&lt;`.
pub fn escape_directive_tags(text: &str) -> Cow<'_, str> {
    if !ESCAPED_PREFIXES.iter().any(|p| text.contains(*p)) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;
    for (idx, _) in text.match_indices('<') {
        if ESCAPED_PREFIXES.iter().any(|p| text[idx..].starts_with(*p)) {
            out.push_str(&text[last..idx]);
            out.push_str("&lt;");
            last = idx + 1;
        }
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}

/// Escapes reasoning deltas as they arrive. A trailing fragment that could
/// still become a tag prefix is held back until the next delta or `finish`.
#[derive(Debug, Default)]
pub struct ReasoningEscaper {
    pending: String,
}

impl ReasoningEscaper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &str) -> String {
        self.pending.push_str(delta);
        let hold = partial_prefix_len(&self.pending);
        let ready_len = self.pending.len() - hold;
        let ready: String = self.pending.drain(..ready_len).collect();
        escape_directive_tags(&ready).into_owned()
    }

    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        escape_directive_tags(&rest).into_owned()
    }
}

fn partial_prefix_len(text: &str) -> usize {
    text.match_indices('<')
        .map(|(idx, _)| &text[idx..])
        .find(|suffix| {
            ESCAPED_PREFIXES
                .iter()
                .any(|p| p.len() > suffix.len() && p.starts_with(suffix))
        })
        .map_or(0, str::len)
}
