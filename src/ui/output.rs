use crate::call::CallResolutionKind;
use crate::diagnostic::Diagnostic;
use crate::ui::{Icons, theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().resolved.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().unresolved.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn diagnostic(diagnostic: &Diagnostic) {
    eprintln!(
        "{} {}",
        Icons::WARN,
        diagnostic.to_string().style(theme().problematic.clone())
    );
}

/// Colored label of a call classification
pub fn resolution(kind: CallResolutionKind) -> String {
    kind.as_str().style(theme().resolution(kind)).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}
