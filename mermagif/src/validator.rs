//! Local, deterministic syntax validation for diagram source.
//!
//! This is a fast static check run before any rendering: it never touches
//! the network or the filesystem, and the same input always yields the same
//! issue list in the same order (source-line order, then detection order
//! within a line). Issues feed the repair stage verbatim.

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;

/// Diagram type declarations recognized on the first non-comment line.
const DIAGRAM_TYPES: &[&str] = &[
    "graph",
    "flowchart",
    "sequencediagram",
    "classdiagram",
    "statediagram",
    "erdiagram",
    "journey",
    "gantt",
    "pie",
    "gitgraph",
    "mindmap",
    "timeline",
    "quadrantchart",
];

/// Machine-usable label for one class of validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Source is empty or whitespace-only.
    EmptySource,
    /// First non-comment line is not a recognized diagram type declaration.
    MissingDiagramType,
    /// Multiple chained statements on a single line without separators.
    UnseparatedStatements,
    /// Unbalanced brackets, parentheses, or braces on a line.
    MismatchedBrackets,
}

impl IssueKind {
    /// Stable label used when serializing issues for the repair collaborator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptySource => "EmptySource",
            Self::MissingDiagramType => "MissingDiagramType",
            Self::UnseparatedStatements => "UnseparatedStatements",
            Self::MismatchedBrackets => "MismatchedBrackets",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One syntax/structure problem found in diagram source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// The issue class.
    pub kind: IssueKind,
    /// Human-readable description.
    pub message: String,
    /// Best-effort 1-based line number; 0 when not line-attributable.
    pub line: usize,
}

impl ValidationIssue {
    /// Creates a new issue.
    #[must_use]
    pub fn new(kind: IssueKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }
}

/// Static syntax/structure checker for diagram source text.
#[derive(Debug, Clone)]
pub struct DiagramValidator {
    er_cardinality_tokens: Vec<String>,
    connector: regex::Regex,
}

impl DiagramValidator {
    /// Builds a validator using the config's ER cardinality token list.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_er_tokens(config.er_cardinality_tokens.clone())
    }

    /// Builds a validator with an explicit ER cardinality token list.
    ///
    /// # Panics
    ///
    /// Never panics; the connector pattern is a fixed literal alternation.
    #[must_use]
    pub fn with_er_tokens(er_cardinality_tokens: Vec<String>) -> Self {
        #[allow(clippy::unwrap_used)]
        let connector = regex::Regex::new(r"-->|---").unwrap();
        Self {
            er_cardinality_tokens,
            connector,
        }
    }

    /// Validates diagram source.
    ///
    /// # Errors
    ///
    /// Returns the ordered list of issues found; `Ok(())` means the source
    /// passed every check.
    pub fn validate(&self, source: &str) -> Result<(), Vec<ValidationIssue>> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(vec![ValidationIssue::new(
                IssueKind::EmptySource,
                "diagram source is empty",
                0,
            )]);
        }

        let lines: Vec<&str> = trimmed.lines().collect();
        let mut issues = Vec::new();

        let declaration = first_declaration_line(&lines);
        let is_er_diagram = declaration
            .map(|(_, line)| line.to_ascii_lowercase().starts_with("erdiagram"))
            .unwrap_or(false);

        match declaration {
            Some((number, line)) if !has_diagram_type(line) => {
                issues.push(ValidationIssue::new(
                    IssueKind::MissingDiagramType,
                    format!(
                        "first line '{}' is not a recognized diagram type declaration \
                         (expected one of: {})",
                        truncate(line, 40),
                        DIAGRAM_TYPES.join(", ")
                    ),
                    number,
                ));
            }
            None => {
                // Only comments; nothing declares a diagram type.
                issues.push(ValidationIssue::new(
                    IssueKind::MissingDiagramType,
                    "no diagram type declaration found",
                    1,
                ));
            }
            Some(_) => {}
        }

        // A one-line body chaining connections without separators confuses
        // the renderer's parser even when each statement is well-formed.
        if lines.len() == 1 && self.connector.is_match(lines[0]) && !lines[0].contains(';') {
            issues.push(ValidationIssue::new(
                IssueKind::UnseparatedStatements,
                "multiple statements on a single line without semicolons; \
                 separate statements with newlines or ';'",
                1,
            ));
        }

        for (index, raw_line) in lines.iter().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with("%%") {
                continue;
            }

            let counted = if is_er_diagram {
                self.strip_er_tokens(line)
            } else {
                line.to_string()
            };

            let open = count_chars(&counted, &['[', '(', '{']);
            let close = count_chars(&counted, &[']', ')', '}']);
            if open != close {
                issues.push(ValidationIssue::new(
                    IssueKind::MismatchedBrackets,
                    format!("mismatched brackets/parentheses ({open} opening, {close} closing)"),
                    index + 1,
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Removes ER relationship cardinality tokens so their braces and pipes
    /// are not counted as ordinary brackets.
    fn strip_er_tokens(&self, line: &str) -> String {
        let mut stripped = line.to_string();
        for token in &self.er_cardinality_tokens {
            stripped = stripped.replace(token.as_str(), "");
        }
        stripped
    }
}

/// First non-empty, non-comment line with its 1-based number.
fn first_declaration_line<'a>(lines: &[&'a str]) -> Option<(usize, &'a str)> {
    lines.iter().enumerate().find_map(|(index, line)| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            None
        } else {
            Some((index + 1, trimmed))
        }
    })
}

fn has_diagram_type(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    DIAGRAM_TYPES.iter().any(|t| lower.starts_with(t))
}

fn count_chars(line: &str, chars: &[char]) -> usize {
    line.chars().filter(|c| chars.contains(c)).count()
}

fn truncate(line: &str, max: usize) -> &str {
    match line.char_indices().nth(max) {
        Some((offset, _)) => &line[..offset],
        None => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn validator() -> DiagramValidator {
        DiagramValidator::new(&PipelineConfig::default())
    }

    #[test]
    fn valid_flowchart_passes() {
        let source = "graph TD\nA[Start] --> B[End]";
        assert!(validator().validate(source).is_ok());
    }

    #[test]
    fn single_line_with_semicolons_passes() {
        assert!(validator().validate("graph TD; A-->B;").is_ok());
    }

    #[test]
    fn empty_source_reports_line_zero() {
        let issues = validator().validate("   \n  ").unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::EmptySource);
        assert_eq!(issues[0].line, 0);
    }

    #[test]
    fn missing_type_declaration_is_reported() {
        let issues = validator()
            .validate("A[Step] --> B[End]\nB --> C[Done]")
            .unwrap_err();
        assert_eq!(issues[0].kind, IssueKind::MissingDiagramType);
        assert_eq!(issues[0].line, 1);
    }

    #[test]
    fn comments_are_skipped_for_type_declaration() {
        let source = "%% a comment\nflowchart LR\nA --> B";
        assert!(validator().validate(source).is_ok());
    }

    #[test]
    fn unbalanced_brackets_carry_the_right_line() {
        let source = "graph TD\nA[Start --> B[End]\nC[Ok]";
        let issues = validator().validate(source).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MismatchedBrackets);
        assert_eq!(issues[0].line, 2);
    }

    #[test]
    fn er_cardinality_tokens_are_exempt_from_bracket_counting() {
        let source = "erDiagram\nCUSTOMER ||--o{ ORDER : places";
        assert!(validator().validate(source).is_ok());
    }

    #[test]
    fn er_exemption_does_not_apply_to_other_diagram_types() {
        let source = "graph TD\nA ||--o{ B";
        let issues = validator().validate(source).unwrap_err();
        assert_eq!(issues[0].kind, IssueKind::MismatchedBrackets);
    }

    #[test]
    fn single_line_chained_connections_without_separators_fail() {
        let issues = validator().validate("graph TD A-->B-->C").unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::UnseparatedStatements && i.line == 1));
    }

    #[test]
    fn validation_is_idempotent() {
        let source = "A[Step (1) --> B[End]";
        let v = validator();
        let first = v.validate(source).unwrap_err();
        let second = v.validate(source).unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn issues_come_in_stable_line_order() {
        let source = "nodecl\nA[Unbalanced\nB(Also]";
        let issues = validator().validate(source).unwrap_err();
        let lines: Vec<usize> = issues.iter().map(|i| i.line).collect();
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn custom_er_token_list_is_respected() {
        let v = DiagramValidator::with_er_tokens(vec!["<>--<>".to_string()]);
        let source = "erDiagram\nA <>--<> B";
        assert!(v.validate(source).is_ok());
        // The default tokens are gone, so a brace-style cardinality now fails.
        let source2 = "erDiagram\nA ||--o{ B : has";
        assert!(v.validate(source2).is_err());
    }
}
