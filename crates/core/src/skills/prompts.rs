//! Prompt templates bundled at compile time.
//!
//! System prompts are fixed strings. User templates use `{name}` placeholders
//! rendered strictly: a placeholder without a value is a
//! [`WorkflowError::Template`]. `{{` and `}}` render as literal braces.

use crate::error::{WorkflowError, WorkflowResult};

/// Planner - methodologist building the blueprint
pub const PLANNER_SYSTEM: &str = include_str!("defaults/planner_system.md");

/// Generator - instrument writer, also used for human revisions
pub const GENERATOR_SYSTEM: &str = include_str!("defaults/generator_system.md");

/// QA - methodology, bias and usability reviewer
pub const QA_SYSTEM: &str = include_str!("defaults/qa_system.md");

pub const PLANNER_USER: PromptTemplate =
    PromptTemplate::new("planner_user", include_str!("defaults/planner_user.md"));

pub const GENERATOR_USER: PromptTemplate =
    PromptTemplate::new("generator_user", include_str!("defaults/generator_user.md"));

pub const QA_USER: PromptTemplate =
    PromptTemplate::new("qa_user", include_str!("defaults/qa_user.md"));

pub const HUMAN_REVISE_USER: PromptTemplate = PromptTemplate::new(
    "human_revise_user",
    include_str!("defaults/human_revise_user.md"),
);

/// A named user-prompt template
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub body: &'static str,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, body: &'static str) -> Self {
        Self { name, body }
    }

    /// Substitute every `{name}` placeholder from `vars`
    pub fn render(&self, vars: &[(&str, &str)]) -> WorkflowResult<String> {
        let mut out = String::with_capacity(self.body.len());
        let mut rest = self.body;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") || tail.starts_with("}}") {
                out.push_str(&tail[..1]);
                rest = &tail[2..];
                continue;
            }

            if let Some(name) = placeholder(tail) {
                let value = vars
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| WorkflowError::template(self.name, name))?;
                out.push_str(value);
                rest = &tail[name.len() + 2..];
                continue;
            }

            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    /// Placeholder names referenced by the template
    pub fn placeholders(&self) -> Vec<&'static str> {
        let body = self.body;
        let mut names = Vec::new();
        let mut idx = 0;

        while let Some(pos) = body[idx..].find('{') {
            let at = idx + pos;
            let tail = &body[at..];
            if tail.starts_with("{{") {
                idx = at + 2;
                continue;
            }
            match placeholder(tail) {
                Some(name) => {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                    idx = at + name.len() + 2;
                }
                None => idx = at + 1,
            }
        }

        names
    }
}

/// `{identifier}` at the start of `text`, returning the identifier
fn placeholder(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('{')?;
    let end = inner.find('}')?;
    let name = &inner[..end];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}
