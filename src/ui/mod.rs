pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{diagnostic, error, header, muted, resolution, section, status, success, summary_row};
pub use table::{calls_table, languages_table, stats_table};
pub use theme::{Theme, theme};
