pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    error, header, muted, name, names, package_action, section, status, success, summary_row,
    warn,
};
pub use progress::ProgressManager;
pub use progress_message::{PackageAction, ProgressMessage, ProgressPhase};
pub use table::TableBuilder;
pub use theme::{theme, Theme};
