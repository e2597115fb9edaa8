use crate::protocol::{Violation, ViolationKind};

/// Canned correction appended as a system message after an abort.
pub fn canned_correction(kind: ViolationKind) -> &'static str {
    match kind {
        ViolationKind::ProhibitedMarkupBlock => {
            "Do not use markdown code fences (```). Put every file's complete content inside \
<write path=\"...\" description=\"...\"></write> tags and continue from where you stopped."
        }
        ViolationKind::ProhibitedToolReference => {
            "Do not reference editing tools such as str_replace_editor or apply_patch. They are \
not available. Use <write>, <delete>, <rename> and <add-dependency> tags only."
        }
        ViolationKind::MalformedTagStructure => {
            "Your <write> tags are unbalanced. Close each <write> with </write> before opening the \
next one and never nest write tags."
        }
        ViolationKind::NonContentInsideWrite => {
            "A <write> tag must contain only the literal file content. Move summaries, \
explanations and change lists outside the tag."
        }
        ViolationKind::ModeIncompatibleDirective => {
            "File changes are not allowed right now. Answer in plain text without <write>, \
<delete>, <rename> or <add-dependency> tags, or only touch the files this step permits."
        }
        ViolationKind::CommaSeparatedDependencies => {
            "List packages in <add-dependency packages=\"...\"> separated by spaces, not commas."
        }
        ViolationKind::ChatSummaryCount => {
            "End your response with exactly one <chat-summary>...</chat-summary> tag."
        }
    }
}

/// What the router model should focus on for each kind.
fn router_focus(kind: ViolationKind) -> &'static str {
    match kind {
        ViolationKind::ProhibitedMarkupBlock => {
            "the assistant used a markdown code fence instead of a <write> tag"
        }
        ViolationKind::ProhibitedToolReference => {
            "the assistant referenced an editing tool that does not exist in this environment"
        }
        ViolationKind::MalformedTagStructure => {
            "the assistant nested or mismatched <write> open and close tags"
        }
        ViolationKind::NonContentInsideWrite => {
            "the assistant put prose (summaries, change lists) inside a <write> tag"
        }
        ViolationKind::ModeIncompatibleDirective => {
            "the assistant emitted a file directive that the current mode or workflow step forbids"
        }
        ViolationKind::CommaSeparatedDependencies => {
            "the assistant separated add-dependency packages with commas"
        }
        ViolationKind::ChatSummaryCount => {
            "the assistant did not end with exactly one <chat-summary> tag"
        }
    }
}

/// Prompt asking the router model for a short, context-specific correction.
pub fn router_instruction(violation: &Violation) -> String {
    format!(
        "You supervise a code-editing assistant whose output must follow a strict tag protocol.\n\
Problem: {focus}.\n\
Detector message: {message}\n\
Offending excerpt:\n{context}\n\n\
Write one short system instruction (at most three sentences) telling the assistant how to \
fix this and continue. Reply with the instruction only.",
        focus = router_focus(violation.kind),
        message = violation.message,
        context = violation.context,
    )
}
