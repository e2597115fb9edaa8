use tagwright::guardrail::FastMonitor;
use tagwright::protocol::{
    ChatMode, DetectionContext, Severity, ViolationKind, audit, detect, detect_mode_violation,
    validate_response,
};
use tagwright::workflow::WorkflowStep;

const FENCED_REPLY: &str = "Here is the fix:\n```ts\nconst x = 1;\n```";

#[test]
fn fenced_reply_is_one_critical_markup_violation() {
    let violations = detect(FENCED_REPLY, &DetectionContext::default());
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind, ViolationKind::ProhibitedMarkupBlock);
    assert_eq!(violations[0].severity, Severity::Critical);
}

#[test]
fn fast_monitor_flags_fenced_reply_on_first_chunk() {
    let mut monitor = FastMonitor::new(DetectionContext::default());
    let verdict = monitor.check_chunk(FENCED_REPLY).expect("violation");
    assert_eq!(verdict.kind().as_str(), "prohibited-markup-block");
    assert!(verdict.should_abort);
}

#[test]
fn detection_is_pure() {
    let ctx = DetectionContext::new(ChatMode::Build, Some(WorkflowStep::Docs));
    let text = "```\napply_patch\n<write path=\"src/a.ts\">Summary: done</write>";
    assert_eq!(detect(text, &ctx), detect(text, &ctx));
}

#[test]
fn growing_prefixes_report_a_kind_once() {
    let mut monitor = FastMonitor::new(DetectionContext::default());
    let full = "intro\n```js\nlet a = 1;\nlet b = 2;\n```\nmore ``` fences";
    let mut reported = 0;
    for end in 1..=full.len() {
        if monitor.check_chunk(&full[..end]).is_some() {
            reported += 1;
        }
    }
    assert_eq!(reported, 1);
}

#[test]
fn ask_mode_forbids_writes() {
    let ctx = DetectionContext::new(ChatMode::Ask, None);
    let violation =
        detect_mode_violation("<write path=\"a.ts\">x</write>", &ctx).expect("violation");
    assert_eq!(violation.kind, ViolationKind::ModeIncompatibleDirective);
    assert!(violation.is_critical());
}

#[test]
fn docs_step_allows_only_docs_paths() {
    let ctx = DetectionContext::new(ChatMode::Build, Some(WorkflowStep::Docs));
    assert!(detect_mode_violation("<write path=\"src/app.ts\">x</write>", &ctx).is_some());
    assert!(detect_mode_violation("<write path=\"docs/guide.md\">x</write>", &ctx).is_none());
}

#[test]
fn code_inside_write_is_not_a_violation() {
    let text = "<write path=\"README.md\">```sh\nnpm i\n```</write>";
    assert!(detect(text, &DetectionContext::default()).is_empty());
}

#[test]
fn comma_dependencies_only_warn() {
    let report = validate_response(
        "<add-dependency packages=\"zod,react\" /><chat-summary>deps</chat-summary>",
        &DetectionContext::default(),
    );
    assert!(report.accepted);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].kind, ViolationKind::CommaSeparatedDependencies);
    assert_eq!(report.violations[0].severity, Severity::Warning);
}

#[test]
fn audit_counts_rejections_by_kind() {
    let responses = [
        "<write path=\"a.ts\">x</write><chat-summary>a</chat-summary>",
        FENCED_REPLY,
        "<write path=\"b.ts\">unterminated",
    ];
    let summary = audit(responses, &DetectionContext::default());
    assert_eq!(summary.total, 3);
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.by_kind[&ViolationKind::ProhibitedMarkupBlock], 1);
    assert_eq!(summary.by_kind[&ViolationKind::MalformedTagStructure], 1);
    assert_eq!(summary.by_kind[&ViolationKind::ChatSummaryCount], 2);
}
