use crate::ui::progress_message::PackageAction;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(icon: &str, text: &str) {
    println!("{} {}", icon, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn name(text: &str) -> String {
    text.style(theme().name.clone()).to_string()
}

/// One line per package touched by a sync
pub fn package_action(package: &str, action: PackageAction) {
    let icon = match action {
        PackageAction::Refreshed => Icons::REFRESH,
        PackageAction::Unchanged => "  ",
        PackageAction::WouldRefresh => Icons::DRY,
        PackageAction::Excluded => Icons::SKIP,
        PackageAction::Deleted => Icons::DEL,
    };
    println!(
        "{} {} {}",
        icon,
        name(package),
        action.as_str().style(theme().action(action))
    );
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// Bare names, one per line
pub fn names(names: &[String]) {
    for n in names {
        println!("{}", n);
    }
}
