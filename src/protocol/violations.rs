use super::context::{ChatMode, DetectionContext};
use super::tags::{self, Directive, TagScan};
use crate::workflow::WorkflowStep;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

const CONTEXT_CHARS: usize = 100;
const FENCE: &str = "```";

/// Tool identifiers from edit-tool ecosystems this protocol does not use.
pub const PROHIBITED_TOOL_NAMES: &[&str] = &[
    "str_replace_based_edit_tool",
    "str_replace_editor",
    "apply_patch",
    "write_to_file",
    "replace_in_file",
    "edit_file",
    "create_file",
    "<function_calls>",
    "<tool_use>",
    "<invoke name=",
];

const PROSE_EXTENSIONS: &[&str] = &["md", "mdx", "txt"];

static NARRATIVE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:Summary:|Here's what I (?:changed|did|updated)|Here is what I (?:changed|did|updated)|Please\b|I've (?:updated|changed|added|fixed|modified)|Changes made:|[-•][ \t]+(?:Added|Updated|Fixed|Changed|Removed|Created|Modified)\b)",
    )
    .expect("narrative pattern is valid")
});

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ViolationKind {
    ProhibitedMarkupBlock,
    ProhibitedToolReference,
    MalformedTagStructure,
    NonContentInsideWrite,
    ModeIncompatibleDirective,
    CommaSeparatedDependencies,
    ChatSummaryCount,
}

impl ViolationKind {
    pub fn severity(self) -> Severity {
        match self {
            Self::ProhibitedMarkupBlock
            | Self::ProhibitedToolReference
            | Self::MalformedTagStructure
            | Self::NonContentInsideWrite
            | Self::ModeIncompatibleDirective => Severity::Critical,
            Self::CommaSeparatedDependencies | Self::ChatSummaryCount => Severity::Warning,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
    /// Short excerpt around the match.
    pub context: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            message: message.into(),
            context: context.into(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// At most [`CONTEXT_CHARS`] characters starting at byte `start`.
pub(crate) fn excerpt(text: &str, start: usize) -> String {
    text.get(start..)
        .unwrap_or_default()
        .chars()
        .take(CONTEXT_CHARS)
        .collect()
}

// ── Individual checks ─────────────────────────────────────────────

fn check_markup_block(scan: &TagScan) -> Option<Violation> {
    let idx = scan.outside.find(FENCE)?;
    Some(Violation::new(
        ViolationKind::ProhibitedMarkupBlock,
        "Fenced code block outside a write directive",
        excerpt(&scan.outside, idx),
    ))
}

fn check_tool_reference(scan: &TagScan) -> Option<Violation> {
    PROHIBITED_TOOL_NAMES.iter().find_map(|name| {
        scan.outside.find(*name).map(|idx| {
            Violation::new(
                ViolationKind::ProhibitedToolReference,
                format!("Reference to unsupported tool `{name}`"),
                excerpt(&scan.outside, idx),
            )
        })
    })
}

fn check_tag_structure(scan: &TagScan) -> Option<Violation> {
    if !scan.has_structure_errors() {
        return None;
    }
    Some(Violation::new(
        ViolationKind::MalformedTagStructure,
        format!(
            "Mismatched write tags: {} nested open(s), {} stray close(s)",
            scan.nested_write_opens, scan.stray_write_closes
        ),
        scan.write_bodies
            .first()
            .map_or_else(|| excerpt(&scan.outside, 0), |body| excerpt(&body.content, 0)),
    ))
}

fn is_prose_path(path: &str) -> bool {
    extension(path).is_some_and(|ext| PROSE_EXTENSIONS.contains(&ext.as_str()))
}

fn extension(path: &str) -> Option<String> {
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    (!stem.is_empty()).then(|| ext.to_ascii_lowercase())
}

fn check_write_content(scan: &TagScan) -> Option<Violation> {
    scan.write_bodies.iter().find_map(|body| {
        let path = body.path.as_deref().unwrap_or_default();
        if is_prose_path(path) {
            return None;
        }
        NARRATIVE_LINE.find(&body.content).map(|m| {
            Violation::new(
                ViolationKind::NonContentInsideWrite,
                format!("Write to `{path}` contains narrative text instead of file content"),
                excerpt(&body.content, m.start()),
            )
        })
    })
}

fn check_comma_dependencies(scan: &TagScan) -> Option<Violation> {
    scan.directives.iter().find_map(|directive| match directive {
        Directive::AddDependency { packages } if packages.iter().any(|p| p.contains(',')) => {
            let joined = packages.join(" ");
            Some(Violation::new(
                ViolationKind::CommaSeparatedDependencies,
                "add-dependency packages should be space-separated; names containing commas are kept verbatim",
                excerpt(&joined, 0),
            ))
        }
        _ => None,
    })
}

// ── Mode rules ────────────────────────────────────────────────────

/// Every mutation the scan saw, including a write still being streamed.
fn mutations(scan: &TagScan) -> Vec<Mutation<'_>> {
    let mut found: Vec<Mutation<'_>> = scan
        .write_bodies
        .iter()
        .filter_map(|body| body.path.as_deref().map(Mutation::Path))
        .collect();
    for directive in &scan.directives {
        match directive {
            Directive::Write { .. } => {}
            Directive::Delete { path } => found.push(Mutation::Path(path)),
            Directive::Rename { from, to } => {
                found.push(Mutation::Path(from));
                found.push(Mutation::Path(to));
            }
            Directive::AddDependency { packages } => found.push(Mutation::Dependency(packages)),
        }
    }
    found
}

enum Mutation<'a> {
    Path(&'a str),
    Dependency(&'a [String]),
}

/// Documentation step: prose files at the project root or under `docs/`.
pub fn is_docs_path(path: &str) -> bool {
    let path = path.trim_start_matches("./");
    is_prose_path(path) && (!path.contains('/') || path.starts_with("docs/"))
}

fn mode_violation(scan: &TagScan, ctx: &DetectionContext) -> Option<Violation> {
    let found = mutations(scan);
    let first = found.first()?;
    let describe = |m: &Mutation<'_>| match m {
        Mutation::Path(path) => (*path).to_string(),
        Mutation::Dependency(packages) => format!("dependencies {}", packages.join(" ")),
    };

    let reason = match (ctx.mode, ctx.workflow_step) {
        (ChatMode::Ask, _) => Some((
            "Ask mode is read-only; file directives are not allowed".to_string(),
            describe(first),
        )),
        (ChatMode::Agent, _) => Some((
            "Agent mode accepts tool calls only; text directives are not allowed".to_string(),
            describe(first),
        )),
        (ChatMode::Build, Some(WorkflowStep::Planning)) => Some((
            "The planning step must not modify files".to_string(),
            describe(first),
        )),
        (ChatMode::Build, Some(WorkflowStep::Docs)) => found.iter().find_map(|m| match m {
            Mutation::Path(path) if !is_docs_path(path) => Some((
                format!(
                    "The documentation step may only touch .md, .mdx or .txt files at the root or under docs/ (got `{path}`)"
                ),
                describe(m),
            )),
            Mutation::Dependency(_) => Some((
                "The documentation step must not add dependencies".to_string(),
                describe(m),
            )),
            Mutation::Path(_) => None,
        }),
        (ChatMode::Build, _) => None,
    };

    reason.map(|(message, context)| {
        Violation::new(
            ViolationKind::ModeIncompatibleDirective,
            message,
            excerpt(&context, 0),
        )
    })
}

// ── Public entry points ───────────────────────────────────────────

/// Run every check on an already-scanned text. Pure: equal inputs give
/// equal outputs, and callers own deduplication.
pub fn detect_scanned(scan: &TagScan, ctx: &DetectionContext) -> Vec<Violation> {
    [
        check_markup_block(scan),
        check_tool_reference(scan),
        check_tag_structure(scan),
        check_write_content(scan),
        mode_violation(scan, ctx),
        check_comma_dependencies(scan),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn detect(text: &str, ctx: &DetectionContext) -> Vec<Violation> {
    detect_scanned(&tags::scan(text), ctx)
}

pub fn detect_mode_violation(text: &str, ctx: &DetectionContext) -> Option<Violation> {
    mode_violation(&tags::scan(text), ctx)
}
