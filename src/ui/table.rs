use crate::language::Language;
use crate::linker::CallOutcome;
use crate::scope::ScopeManager;
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct CallRow {
    #[tabled(rename = "Call")]
    pub call: String,
    #[tabled(rename = "Callee")]
    pub callee: String,
    #[tabled(rename = "Result")]
    pub kind: String,
    #[tabled(rename = "Targets")]
    pub targets: String,
}

#[derive(Tabled)]
pub struct LanguageRow {
    #[tabled(rename = "Language")]
    pub name: String,
    #[tabled(rename = "Extensions")]
    pub extensions: String,
    #[tabled(rename = "Delimiter")]
    pub delimiter: String,
    #[tabled(rename = "Overloading")]
    pub overloading: bool,
    #[tabled(rename = "Defaults")]
    pub defaults: bool,
    #[tabled(rename = "First-class fns")]
    pub first_class: bool,
    #[tabled(rename = "Dispatch")]
    pub dispatch: bool,
}

fn render<T: Tabled>(rows: &[T]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn stats_table(stats: &[(&str, String)]) -> String {
    let rows: Vec<MetricRow> = stats
        .iter()
        .map(|(label, value)| MetricRow {
            metric: label.to_string(),
            value: value.clone(),
        })
        .collect();
    render(&rows)
}

/// One row per call site, targets printed with their qualified names
pub fn calls_table(outcomes: &[CallOutcome], manager: &ScopeManager) -> String {
    let rows: Vec<CallRow> = outcomes
        .iter()
        .map(|outcome| CallRow {
            call: manager
                .node(outcome.call)
                .and_then(|n| n.location.as_ref())
                .map(|l| l.to_string())
                .unwrap_or_else(|| outcome.call.to_string()),
            callee: outcome.callee.clone(),
            kind: outcome.result.kind.as_str().to_string(),
            targets: outcome
                .result
                .best_viable
                .iter()
                .map(|t| manager.node(*t).map(|n| n.describe()).unwrap_or_else(|| t.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();
    render(&rows)
}

pub fn languages_table<'a>(languages: impl IntoIterator<Item = &'a Language>) -> String {
    let rows: Vec<LanguageRow> = languages
        .into_iter()
        .map(|l| LanguageRow {
            name: l.name.clone(),
            extensions: l.file_extensions.join(", "),
            delimiter: l.namespace_delimiter.clone(),
            overloading: l.supports_overloading,
            defaults: l.supports_default_arguments,
            first_class: l.first_class_functions,
            dispatch: l.dynamic_dispatch,
        })
        .collect();
    render(&rows)
}
