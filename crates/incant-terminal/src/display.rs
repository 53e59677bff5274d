//! Rendering of candidate lists for line editors and `help`.

use crate::catalog::Catalog;
use crate::completion::{CompletionKind, Completions};

/// Lay `items` out in columns no wider than `width` in total.
///
/// A list that fits on one row is spread across the full width; otherwise
/// each column is as wide as the longest item plus one space.
pub fn columnize<S: AsRef<str>>(items: &[S], width: usize) -> String {
    let Some(longest) = items.iter().map(|s| s.as_ref().chars().count()).max() else {
        return String::new();
    };
    let cell = longest + 1;
    let fits_one_row = cell * items.len() < width;
    let (columns, column_width) = if fits_one_row {
        (items.len(), width / items.len())
    } else {
        ((width / cell).max(1), cell)
    };

    items
        .chunks(columns)
        .map(|row| {
            row.iter()
                .map(|item| format!("{:<column_width$}", item.as_ref()))
                .collect::<String>()
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Display label and replacement for each candidate, in listing order.
///
/// Override candidates keep their given order. Command names and parameter
/// values are sorted. Parameter names keep declaration order and are shown
/// with their declared types as `name=<type>`.
pub fn candidate_entries(completions: &Completions, catalog: &Catalog) -> Vec<(String, String)> {
    let spec = completions.command().and_then(|name| catalog.get(name));
    let mut entries: Vec<(String, String)> = completions
        .iter()
        .map(|candidate| {
            let label = match (completions.kind(), spec) {
                (CompletionKind::ParameterName, Some(spec)) => {
                    let name = candidate.trim_end_matches('=');
                    spec.argument(name)
                        .map(|param| format!("{name}=<{}>", param.type_label()))
                        .unwrap_or_else(|| candidate.clone())
                },
                _ => candidate.clone(),
            };
            (label, candidate.clone())
        })
        .collect();
    if matches!(
        completions.kind(),
        CompletionKind::CommandName | CompletionKind::ParameterValue
    ) {
        entries.sort();
    }
    entries
}
