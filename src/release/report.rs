//! Report Formatter - renders release metadata for operator review
//!
//! Pure functions producing display lines; printing is left to the console.

use crate::release::metadata::Metadata;

/// Render the pre-publish report
///
/// # Examples
///
/// ```
/// use package_release::release::{render, Metadata};
///
/// let metadata = Metadata {
///     name: "ecto".into(),
///     version: "0.2.0".into(),
///     description: None,
///     licenses: None,
///     contributors: None,
///     links: None,
///     requirements: Default::default(),
///     files: vec![],
/// };
///
/// let lines = render(&metadata, &[]);
/// assert_eq!(lines[0], "Publishing ecto v0.2.0");
/// ```
pub fn render(metadata: &Metadata, excluded: &[String]) -> Vec<String> {
    let mut lines = vec![format!(
        "Publishing {} v{}",
        metadata.name, metadata.version
    )];

    if !metadata.requirements.is_empty() {
        lines.push("  Dependencies:".to_string());
        for (name, requirement) in &metadata.requirements {
            let optional = if requirement.optional {
                " (optional)"
            } else {
                ""
            };
            lines.push(format!(
                "    {} {}{}",
                name, requirement.requirement, optional
            ));
        }
    }

    if !excluded.is_empty() {
        lines.push("  Excluded dependencies (not part of the published package):".to_string());
        lines.extend(excluded.iter().map(|name| format!("    {}", name)));
    }

    if metadata.files.is_empty() {
        lines.push("  WARNING! No files".to_string());
    } else {
        lines.push("  Included files:".to_string());
        lines.extend(metadata.files.iter().map(|file| format!("    {}", file)));
    }

    let missing = metadata.missing_recommended_fields();
    if !missing.is_empty() {
        lines.push(format!(
            "  WARNING! Missing metadata fields: {}",
            missing.join(", ")
        ));
    }

    lines
}

/// Render a registry error body
///
/// Objects print their `message` and then the `errors` entries, nested
/// objects indented one level deeper. Anything else is printed as-is.
pub fn render_error(status: u16, body: &serde_json::Value) -> Vec<String> {
    let mut lines = vec![format!("Registry responded with status {}", status)];

    match body {
        serde_json::Value::Object(map) => {
            if let Some(message) = map.get("message") {
                lines.push(text(message));
            }
            if let Some(errors) = map.get("errors") {
                render_errors(errors, 1, &mut lines);
            }
            if !map.contains_key("message") && !map.contains_key("errors") {
                lines.push(body.to_string());
            }
        }
        serde_json::Value::Null => {}
        other => lines.push(text(other)),
    }

    lines
}

fn render_errors(errors: &serde_json::Value, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);

    match errors {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                if value.is_object() {
                    lines.push(format!("{}{}:", indent, key));
                    render_errors(value, depth + 1, lines);
                } else {
                    lines.push(format!("{}{}: {}", indent, key, text(value)));
                }
            }
        }
        other => lines.push(format!("{}{}", indent, text(other))),
    }
}

fn text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
