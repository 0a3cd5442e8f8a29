//! # Markdown Formatter
//!
//! @title Handlebars Report Template
//! @author Ramprasad
//!
//! Renders a [`Report`] to Markdown through a Handlebars template.

use super::{Report, Severity};
use anyhow::Result;
use handlebars::Handlebars;
use serde_json::{json, Value};

const REPORT_TEMPLATE: &str = r#"# Bound-Sentinel Report

| | |
|---|---|
| Scanned path | `{{metadata.scanned_path}}` |
| Version | {{metadata.version}} |
| Timestamp | {{metadata.timestamp}} |
| Files analyzed | {{metadata.files_analyzed}} |
| Files failed | {{metadata.files_failed}} |

## Summary

| Severity | Count |
|---|---|
{{#each severities}}
| {{indicator}} {{name}} | {{count}} |
{{/each}}
| **Total** | **{{summary.total}}** |
{{#each files}}

## `{{file_path}}`
{{#if error}}

> Could not be analyzed: {{error}}
{{/if}}
{{#each suggestions}}

### {{badge}} [{{check_id}}] {{title}}

In function `{{function_name}}()`, line {{line}} (file line {{source_line}}){{#if cwe}}, {{cwe}}{{/if}}

{{description}}

```c
{{code}}```
{{/each}}
{{#if diagnostics}}

#### Diagnostics

{{#each diagnostics}}
- **{{level}}** line {{line}}: {{message}}
{{/each}}
{{/if}}
{{/each}}
"#;

/// Renders the report as a Markdown document.
///
/// # Arguments
///
/// * `report` - The report to render
///
/// # Returns
///
/// The Markdown text, or the template error.
pub fn to_markdown(report: &Report) -> Result<String> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.register_template_string("report", REPORT_TEMPLATE)?;

    let summary = &report.summary;
    let severities: Vec<Value> = [
        (Severity::Critical, summary.critical),
        (Severity::High, summary.high),
        (Severity::Medium, summary.medium),
        (Severity::Low, summary.low),
        (Severity::Info, summary.info),
    ]
    .into_iter()
    .map(|(severity, count)| {
        json!({
            "indicator": severity.indicator(),
            "name": severity.to_string(),
            "count": count,
        })
    })
    .collect();

    let files: Vec<Value> = report
        .files
        .iter()
        .map(|file| {
            let suggestions: Vec<Value> = file
                .suggestions
                .iter()
                .map(|suggestion| {
                    json!({
                        "badge": suggestion.severity.markdown_badge(),
                        "check_id": suggestion.check_id,
                        "title": suggestion.title,
                        "function_name": suggestion.function_name,
                        "line": suggestion.relative_line,
                        "source_line": suggestion.source_line,
                        "cwe": suggestion.cwe,
                        "description": suggestion.description,
                        "code": suggestion.patched_source,
                    })
                })
                .collect();
            let diagnostics: Vec<Value> = file
                .diagnostics
                .iter()
                .map(|diagnostic| {
                    json!({
                        "level": diagnostic.level.to_string(),
                        "line": diagnostic.line,
                        "message": diagnostic.message,
                    })
                })
                .collect();
            json!({
                "file_path": file.file_path,
                "error": file.error,
                "suggestions": suggestions,
                "diagnostics": diagnostics,
            })
        })
        .collect();

    let data = json!({
        "metadata": report.metadata,
        "summary": report.summary,
        "severities": severities,
        "files": files,
    });

    Ok(handlebars.render("report", &data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Diagnostic, FileReport, Suggestion};
    use std::path::PathBuf;

    #[test]
    fn test_markdown_contains_code_and_diagnostics() {
        let file = FileReport {
            file_path: "demo.c".to_string(),
            suggestions: vec![Suggestion {
                check_id: "B002".to_string(),
                title: "Loop Index Out of Bounds".to_string(),
                severity: Severity::High,
                cwe: Some("CWE-787".to_string()),
                function_name: "fill".to_string(),
                description: "Decrease loop upper bound of `i` (10)".to_string(),
                patched_source: "void fill(void)\n{\n    char buf[10];\n}\n".to_string(),
                relative_line: 4,
                source_line: 9,
            }],
            diagnostics: vec![Diagnostic::note(6, "sizeof(struct x) not implemented, defaulting to 1")],
            error: None,
        };
        let report = Report::new(vec![file], PathBuf::from("demo.c"));
        let markdown = to_markdown(&report).unwrap();

        assert!(markdown.contains("### ![High]"));
        assert!(markdown.contains("[B002] Loop Index Out of Bounds"));
        assert!(markdown.contains("```c\nvoid fill(void)\n{\n    char buf[10];\n}\n```"));
        assert!(markdown.contains("Decrease loop upper bound of `i` (10)"));
        assert!(markdown.contains("- **note** line 6: sizeof(struct x)"));
        assert!(markdown.contains("| **Total** | **1** |"));
    }
}
