//! The textual AI-plan protocol.
//!
//! A plan is an ordered list of named operations with free-text
//! descriptions. The text form is what the plan generator returns and what a
//! user (or an LLM) may hand-edit and resubmit, so parsing is forgiving
//! about spacing but strict about structure:
//!
//! ```text
//! # AI Plan
//! ## Step 1: upgrade dotnet project
//! Upgrade the project to .NET 8.
//! ## Step 2: update csproj
//! Update the project file.
//! ```
//!
//! Operation names are stored canonically (UPPER_SNAKE_CASE), rendered
//! user-friendly (lowercase, spaces) and re-canonicalized on parse. Blank
//! lines inside a description are dropped by the parser; the text form is
//! also fed back to the generation stage as a prompt, so this lossy edge is
//! preserved deliberately rather than fixed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PLAN_TITLE: &str = "# AI Plan";
const STEP_PREFIX: &str = "## Step";

/// Failure to convert between a plan and its text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The input did not contain a single valid step.
    #[error("failed to parse AI plan from input: {0}")]
    Parse(String),

    /// A plan with zero operations cannot be rendered.
    #[error("AI plan has no operations")]
    Empty,
}

/// One named step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_name: String,
    pub description: String,
}

impl Operation {
    pub fn new(operation_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            description: description.into(),
        }
    }

    /// Canonical form: upper-case, words joined by underscores.
    pub fn canonical_name(raw: &str) -> String {
        raw.trim().to_uppercase().replace(' ', "_")
    }

    /// User-facing form rendered into plan text.
    pub fn display_name(&self) -> String {
        self.operation_name.to_lowercase().replace('_', " ")
    }
}

/// An ordered, non-empty sequence of operations.
///
/// The empty container is constructible (it is the natural serde default for
/// wire payloads) but can never be parsed from text nor rendered to text;
/// both directions fail with [`PlanError`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiPlan {
    pub operations: Vec<Operation>,
}

impl AiPlan {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Render the plan into its canonical multi-line text form.
    pub fn to_text(&self) -> Result<String, PlanError> {
        if self.operations.is_empty() {
            return Err(PlanError::Empty);
        }
        let mut out = String::from(PLAN_TITLE);
        out.push('\n');
        for (index, operation) in self.operations.iter().enumerate() {
            out.push_str(&format!(
                "{} {}: {}\n{}\n",
                STEP_PREFIX,
                index + 1,
                operation.display_name(),
                operation.description
            ));
        }
        Ok(out)
    }

    /// Parse a plan from its text form.
    ///
    /// The first line (the plan title) is skipped regardless of content.
    /// Every `## Step` line starts a new operation; its name is the text
    /// between the first and second `:`. Any other non-blank line belongs to
    /// the current operation's description.
    pub fn from_text(input: &str) -> Result<Self, PlanError> {
        let mut operations: Vec<Operation> = Vec::new();
        let mut description = String::new();

        for line in input.lines().skip(1) {
            if line.starts_with(STEP_PREFIX) {
                if !description.is_empty() {
                    if let Some(last) = operations.last_mut() {
                        last.description = description.trim().to_string();
                        description.clear();
                    }
                }
                let Some(raw_name) = line.split(':').nth(1) else {
                    return Err(PlanError::Parse(input.to_string()));
                };
                operations.push(Operation::new(Operation::canonical_name(raw_name), ""));
            } else if !line.trim().is_empty() {
                description.push_str(line);
                description.push('\n');
            }
        }

        if !description.is_empty() {
            if let Some(last) = operations.last_mut() {
                last.description = description.trim().to_string();
            }
        }

        if operations.is_empty() {
            return Err(PlanError::Parse(input.to_string()));
        }
        Ok(Self { operations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_plan() -> AiPlan {
        AiPlan::new(vec![
            Operation::new("OPERATION_ONE", "Description1\nanotherline\nanotherline"),
            Operation::new("OPERATION_TWO", "Description2\nabc"),
        ])
    }

    #[test]
    fn to_text_renders_user_friendly_names() {
        let expected = "# AI Plan\n## Step 1: operation one\nDescription1\nanotherline\nanotherline\n## Step 2: operation two\nDescription2\nabc\n";
        assert_eq!(two_step_plan().to_text().unwrap(), expected);
    }

    #[test]
    fn from_text_recanonicalizes_names() {
        let text = "# AI Plan\n## Step 1: operation one\nDescription1\nanotherline\nanotherline\n## Step 2: operation two\nDescription2\nabc\n";
        let plan = AiPlan::from_text(text).unwrap();
        assert_eq!(plan, two_step_plan());
    }

    #[test]
    fn round_trip_is_idempotent() {
        let text = "# AI Plan\n## Step 1: upgrade dotnet project\nUpgrade the project.\n## Step 2: update csproj\nUpdate the project file\nand the package references.\n";
        let once = AiPlan::from_text(text).unwrap();
        let twice = AiPlan::from_text(&once.to_text().unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn from_text_rejects_empty_input() {
        assert!(matches!(AiPlan::from_text(""), Err(PlanError::Parse(_))));
    }

    #[test]
    fn from_text_rejects_input_without_step_markers() {
        let err = AiPlan::from_text("Invalid string").unwrap_err();
        assert!(matches!(err, PlanError::Parse(_)));
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn from_text_rejects_single_hash_step_headers() {
        let text = "# AI Plan\n# Step 1: Operation1\nDescription1\n# Step 2: Operation2\nDescription2\n";
        assert!(matches!(AiPlan::from_text(text), Err(PlanError::Parse(_))));
    }

    #[test]
    fn from_text_rejects_step_header_without_colon() {
        let text = "# AI Plan\n## Step 1\nDescription1\n";
        assert!(matches!(AiPlan::from_text(text), Err(PlanError::Parse(_))));
    }

    #[test]
    fn steps_without_description_parse_as_empty() {
        let plan = AiPlan::from_text("# AI Plan\n## Step 1: Operation1\n## Step 2: Operation2\n").unwrap();
        assert_eq!(
            plan.operations,
            vec![
                Operation::new("OPERATION1", ""),
                Operation::new("OPERATION2", ""),
            ]
        );
    }

    #[test]
    fn blank_lines_inside_descriptions_are_dropped() {
        let text = "# AI Plan\n## Step 1: Operation1\nfirst\n\nsecond\n";
        let plan = AiPlan::from_text(text).unwrap();
        assert_eq!(plan.operations[0].description, "first\nsecond");
    }

    #[test]
    fn to_text_rejects_empty_plan() {
        assert_eq!(AiPlan::default().to_text(), Err(PlanError::Empty));
    }

    #[test]
    fn name_canonicalization_round_trips() {
        assert_eq!(Operation::canonical_name(" operation one "), "OPERATION_ONE");
        let operation = Operation::new("OPERATION_ONE", "");
        assert_eq!(operation.display_name(), "operation one");
    }
}
