use crate::protocol::Directive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::future::Future;
use std::pin::Pin;

/// One diagnostic reported against the virtual tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub code: String,
    pub message: String,
}

/// In-memory projection of the project with pending directives applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualFileTree {
    files: BTreeMap<String, String>,
}

impl VirtualFileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        Self {
            files: files
                .into_iter()
                .map(|(path, content)| (path.into(), content.into()))
                .collect(),
        }
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn apply(&mut self, directive: &Directive) {
        match directive {
            Directive::Write { path, content, .. } => {
                self.files.insert(path.clone(), content.clone());
            }
            Directive::Delete { path } => {
                self.files.remove(path);
            }
            Directive::Rename { from, to } => match self.files.remove(from) {
                Some(content) => {
                    self.files.insert(to.clone(), content);
                }
                None => tracing::debug!(from = from.as_str(), "Rename of missing file ignored"),
            },
            Directive::AddDependency { .. } => {}
        }
    }

    /// Apply directives in order; later directives win.
    pub fn apply_directives(mut self, directives: &[Directive]) -> Self {
        for directive in directives {
            self.apply(directive);
        }
        self
    }
}

/// Type checker (or linter) run against a virtual tree.
pub trait ProblemChecker: Send + Sync {
    /// Current on-disk state of the conversation's project.
    fn base_tree<'a>(
        &'a self,
        chat_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<VirtualFileTree>> + Send + 'a>>;

    fn compute_problems<'a>(
        &'a self,
        tree: &'a VirtualFileTree,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Problem>>> + Send + 'a>>;
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render problems as a `<problem-report>` block.
pub fn format_problem_report(problems: &[Problem]) -> String {
    let noun = if problems.len() == 1 { "problem" } else { "problems" };
    let mut out = format!("<problem-report summary=\"{} {noun}\">\n", problems.len());
    for problem in problems {
        let _ = writeln!(
            out,
            "<problem file=\"{}\" line=\"{}\" column=\"{}\" code=\"{}\">{}</problem>",
            escape_attr(&problem.file),
            problem.line,
            problem.column,
            escape_attr(&problem.code),
            escape_attr(&problem.message),
        );
    }
    out.push_str("</problem-report>");
    out
}

/// User message asking the model to fix a report.
pub fn format_fix_prompt(report: &str) -> String {
    format!(
        "Fix the problems below. Reply with complete <write> tags for every file you change \
and do not repeat files that are already correct.\n\n{report}"
    )
}
