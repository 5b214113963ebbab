use crate::call::CallResolutionKind;
use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub resolved: Style,
    pub ambiguous: Style,
    pub problematic: Style,
    pub unresolved: Style,
    pub dim: Style,
    pub muted: Style,
}

impl Theme {
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            resolved: Style::new().green().bold(),
            ambiguous: Style::new().magenta().bold(),
            problematic: Style::new().yellow().bold(),
            unresolved: Style::new().red().bold(),
            dim: Style::new().white().dimmed(),
            muted: Style::new().bright_black(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            resolved: Style::new(),
            ambiguous: Style::new(),
            problematic: Style::new(),
            unresolved: Style::new(),
            dim: Style::new(),
            muted: Style::new(),
        }
    }

    /// Style for a call classification
    pub fn resolution(&self, kind: CallResolutionKind) -> Style {
        match kind {
            CallResolutionKind::Successful => self.resolved.clone(),
            CallResolutionKind::Ambiguous => self.ambiguous.clone(),
            CallResolutionKind::Problematic => self.problematic.clone(),
            CallResolutionKind::Unresolved => self.unresolved.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
