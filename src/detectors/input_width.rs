//! # Input Width Checker
//!
//! @title Formatted and Line Input Limits
//! @author Ramprasad
//!
//! `scanf`-family `%s` and `%[` conversions write as many characters as the
//! input holds unless a field width limits them. `gets` has no limit at all.

use super::{AccessChecker, CheckContext, CheckKind, Proposal, Site};
use crate::analysis::suggestion::Edit;
use crate::analysis::Value;
use crate::parser::{LiteralKind, NodeId, NodeKind};
use regex::Regex;
use std::sync::OnceLock;

/// One `%` conversion: assignment suppression, width and conversion character.
fn conversion_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"%(\*)?(\d*)(?:hh|h|ll|l|L|z|j|t)?([diouxXeEfgGaAcspn\[%])")
            .expect("conversion pattern is valid")
    })
}

/// Index of the format argument for the `scanf` family.
fn format_position(function: &str) -> Option<usize> {
    match function {
        "scanf" => Some(0),
        "fscanf" | "sscanf" => Some(1),
        _ => None,
    }
}

/// A conversion that stores into an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Conversion {
    /// Byte range of the width digits inside the format text.
    width_at: std::ops::Range<usize>,
    width: Option<i64>,
    is_string: bool,
}

fn conversions(format: &str) -> Vec<Conversion> {
    conversion_pattern()
        .captures_iter(format)
        .filter(|captures| captures.get(1).is_none() && &captures[3] != "%")
        .filter_map(|captures| {
            let width = captures.get(2)?;
            Some(Conversion {
                width_at: width.range(),
                width: width.as_str().parse().ok(),
                is_string: matches!(&captures[3], "s" | "["),
            })
        })
        .collect()
}

pub struct InputWidthChecker;

impl AccessChecker for InputWidthChecker {
    fn name(&self) -> &'static str {
        "Input Width Checker"
    }

    fn checks(&self) -> &'static [CheckKind] {
        &[CheckKind::FormatWidth, CheckKind::UnboundedRead]
    }

    fn check(&self, site: Site, context: &mut CheckContext<'_>) -> Vec<Proposal> {
        let Site::Call(call) = site else {
            return Vec::new();
        };
        let Some((function, args)) = context.tree.call_parts(call) else {
            return Vec::new();
        };
        if function == "gets" {
            return unbounded_read(context, call, args);
        }
        match format_position(function) {
            Some(position) if args.len() > position => {
                formatted_read(context, call, function, args, position)
            }
            _ => Vec::new(),
        }
    }
}

fn formatted_read(
    context: &mut CheckContext<'_>,
    call: NodeId,
    function: &str,
    args: &[NodeId],
    position: usize,
) -> Vec<Proposal> {
    let tree = context.tree;
    let format_node = tree.strip_parens(args[position]);
    let NodeKind::Literal {
        kind: LiteralKind::String,
        text,
    } = tree.kind(format_node)
    else {
        return Vec::new();
    };

    let found = conversions(text);
    let targets = &args[position + 1..];
    if found.len() != targets.len() {
        context.warn(
            call,
            format!(
                "{} format expects {} argument(s) but {} were given",
                function,
                found.len(),
                targets.len()
            ),
        );
    }

    let mut proposals = Vec::new();
    for (conversion, target) in found.iter().zip(targets) {
        if !conversion.is_string {
            continue;
        }
        let Some(buffer) = context.tracked_array(*target) else {
            continue;
        };
        let Value::Known(capacity) = context.array_elements(buffer) else {
            continue;
        };
        if capacity < 2 {
            continue;
        }
        let limit = capacity - 1;
        let problem = match conversion.width {
            None => format!("has no width limit for `{}`", buffer.name),
            Some(width) if width == capacity => format!(
                "leaves no room for the terminator of `{}` (width {})",
                buffer.name, width
            ),
            Some(width) if width > capacity => format!(
                "has width {} but `{}` holds {} characters",
                width, buffer.name, capacity
            ),
            Some(_) => continue,
        };

        let mut patched = text.clone();
        patched.replace_range(conversion.width_at.clone(), &limit.to_string());
        proposals.push(Proposal {
            check: CheckKind::FormatWidth,
            description: format!(
                "A string conversion in the {} format {}, limit it to {} characters",
                function, problem, limit
            ),
            anchor: call,
            edits: vec![Edit::Text {
                target: format_node,
                text: patched,
            }],
        });
    }
    proposals
}

fn unbounded_read(context: &mut CheckContext<'_>, call: NodeId, args: &[NodeId]) -> Vec<Proposal> {
    let [target] = args else {
        return Vec::new();
    };
    let known = context
        .tracked_array(*target)
        .map(|buffer| (buffer.name.clone(), context.array_bytes(buffer)));

    let proposal = match known {
        Some((name, Value::Known(capacity))) => Proposal {
            check: CheckKind::UnboundedRead,
            description: format!(
                "gets() cannot limit the input read into `{}`, use fgets(buf, {}, stdin)",
                name, capacity
            ),
            anchor: call,
            edits: vec![Edit::RetargetCall {
                call,
                callee: "fgets".to_string(),
                append: vec![NodeKind::int(capacity), NodeKind::ident("stdin")],
            }],
        },
        _ => Proposal {
            check: CheckKind::UnboundedRead,
            description: "gets() cannot limit the input it reads, use fgets(buf, sizeof(buf), stdin)"
                .to_string(),
            anchor: call,
            edits: Vec::new(),
        },
    };
    vec![proposal]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_skip_suppressed_and_percent() {
        let found = conversions("\"%d %*s %% %19s %[^\\n]\"");
        assert_eq!(found.len(), 3);
        assert!(!found[0].is_string);
        assert_eq!(found[1].width, Some(19));
        assert!(found[2].is_string);
        assert_eq!(found[2].width, None);
    }

    #[test]
    fn test_width_range_points_at_digits() {
        let text = "\"%8s\"";
        let found = conversions(text);
        assert_eq!(&text[found[0].width_at.clone()], "8");
    }

    #[test]
    fn test_format_positions() {
        assert_eq!(format_position("scanf"), Some(0));
        assert_eq!(format_position("sscanf"), Some(1));
        assert_eq!(format_position("printf"), None);
    }
}
