use crate::llm::ModelClient;
use crate::protocol::Violation;
use std::fmt::Write as _;

const INSTRUCTION_OPEN: &str = "<correction-instruction>";
const INSTRUCTION_CLOSE: &str = "</correction-instruction>";

const CORRECTIVE_SYSTEM_PROMPT: &str = "\
You review responses from a code-editing assistant that must follow a tag protocol: file \
content goes only inside <write path=\"...\"></write>, deletions use <delete path=\"...\" />, \
renames use <rename from=\"...\" to=\"...\" />, packages use <add-dependency packages=\"a b\" />. \
Markdown code fences and external editing tools are forbidden.";

/// Input for one corrective pass.
#[derive(Debug, Clone)]
pub struct CorrectionRequest<'a> {
    pub violations: &'a [Violation],
    pub user_prompt: &'a str,
    pub response: &'a str,
    pub router_model: &'a str,
    /// Characters of `response` shown to the model.
    pub excerpt_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrectionDecision {
    Retry { prompt: String },
    Skip { reason: String },
}

impl CorrectionDecision {
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::Retry { .. })
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn build_prompt(request: &CorrectionRequest<'_>) -> String {
    let mut prompt = String::from("The assistant's response broke these rules:\n");
    for violation in request.violations {
        let _ = writeln!(
            prompt,
            "- [{}] {}: {}",
            violation.severity, violation.kind, violation.message
        );
    }
    let excerpt = truncate_chars(request.response, request.excerpt_chars);
    let _ = write!(
        prompt,
        "\nUser request:\n{user}\n\nResponse (first {limit} characters):\n{excerpt}\n\n\
Write an instruction that makes the assistant redo its answer correctly. \
Wrap it in {INSTRUCTION_OPEN}...{INSTRUCTION_CLOSE}.",
        user = request.user_prompt,
        limit = request.excerpt_chars,
    );
    prompt
}

/// Text strictly between the first delimiter pair.
pub fn extract_instruction(reply: &str) -> Option<&str> {
    let start = reply.find(INSTRUCTION_OPEN)? + INSTRUCTION_OPEN.len();
    let len = reply[start..].find(INSTRUCTION_CLOSE)?;
    let instruction = reply[start..start + len].trim();
    (!instruction.is_empty()).then_some(instruction)
}

/// Ask the router model for a corrective instruction. Only a reply with the
/// delimiter pair counts; anything else is a skipped correction.
pub async fn generate_correction(
    client: &dyn ModelClient,
    request: CorrectionRequest<'_>,
) -> CorrectionDecision {
    if request.violations.is_empty() {
        return CorrectionDecision::Skip {
            reason: "no violations to correct".into(),
        };
    }

    let prompt = build_prompt(&request);
    let reply = match client
        .complete(CORRECTIVE_SYSTEM_PROMPT, &prompt, request.router_model)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(model = request.router_model, "Corrective agent call failed: {e}");
            return CorrectionDecision::Skip {
                reason: format!("router model call failed: {e}"),
            };
        }
    };

    match extract_instruction(&reply) {
        Some(instruction) => CorrectionDecision::Retry {
            prompt: instruction.to_string(),
        },
        None => {
            tracing::debug!(model = request.router_model, "Corrective reply had no instruction block");
            CorrectionDecision::Skip {
                reason: "reply did not contain a correction instruction".into(),
            }
        }
    }
}
