use owo_colors::Style;
use std::sync::OnceLock;

use crate::ui::progress_message::PackageAction;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Terminal styles; every style is empty when color is off
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    pub muted: Style,
    /// Package and function names
    pub name: Style,
}

impl Theme {
    /// Colors only on a terminal, and never when `NO_COLOR` is set
    pub fn detect() -> Self {
        let color = console::Term::stdout().is_term() && std::env::var_os("NO_COLOR").is_none();
        Self::new(color)
    }

    pub fn new(color: bool) -> Self {
        let pick = |style: Style| if color { style } else { Style::new() };
        Self {
            header: pick(Style::new().cyan().bold()),
            success: pick(Style::new().green().bold()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow().bold()),
            info: pick(Style::new().blue()),
            dim: pick(Style::new().dimmed()),
            muted: pick(Style::new().bright_black()),
            name: pick(Style::new().bold()),
        }
    }

    pub fn action(&self, action: PackageAction) -> Style {
        let style = match action {
            PackageAction::Refreshed => &self.success,
            PackageAction::Unchanged => &self.muted,
            PackageAction::WouldRefresh => &self.info,
            PackageAction::Excluded => &self.warn,
            PackageAction::Deleted => &self.error,
        };
        style.clone()
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
