use super::context::DetectionContext;
use super::tags::{self, Directive};
use super::violations::{self, Violation, ViolationKind, excerpt};
use serde::Serialize;
use std::collections::BTreeMap;

/// Whole-response verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// No critical violations.
    pub accepted: bool,
    pub violations: Vec<Violation>,
    pub directives: Vec<Directive>,
    pub chat_summary: Option<String>,
}

impl ValidationReport {
    pub fn critical(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.is_critical())
    }
}

/// Validate a finished response. Unlike the streaming checks, a trailing
/// unclosed `write` counts as malformed here.
pub fn validate_response(text: &str, ctx: &DetectionContext) -> ValidationReport {
    let scan = tags::scan(text);
    let mut found = violations::detect_scanned(&scan, ctx);

    if scan.unclosed_write
        && !found
            .iter()
            .any(|v| v.kind == ViolationKind::MalformedTagStructure)
    {
        let context = scan
            .write_bodies
            .last()
            .map(|body| excerpt(&body.content, 0))
            .unwrap_or_default();
        found.push(Violation::new(
            ViolationKind::MalformedTagStructure,
            "Response ends inside an unclosed write tag",
            context,
        ));
    }

    let summaries = tags::extract_chat_summaries(text);
    if summaries.len() != 1 {
        found.push(Violation::new(
            ViolationKind::ChatSummaryCount,
            format!("Expected exactly one chat-summary, found {}", summaries.len()),
            "",
        ));
    }

    ValidationReport {
        accepted: !found.iter().any(Violation::is_critical),
        violations: found,
        directives: scan.directives,
        chat_summary: summaries.into_iter().next(),
    }
}

/// Aggregate over a batch of stored responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub total: usize,
    pub rejected: usize,
    pub by_kind: BTreeMap<ViolationKind, usize>,
}

pub fn audit<'a>(
    responses: impl IntoIterator<Item = &'a str>,
    ctx: &DetectionContext,
) -> AuditSummary {
    let mut summary = AuditSummary::default();
    for text in responses {
        let report = validate_response(text, ctx);
        summary.total += 1;
        if !report.accepted {
            summary.rejected += 1;
        }
        for violation in &report.violations {
            *summary.by_kind.entry(violation.kind).or_default() += 1;
        }
    }
    summary
}
