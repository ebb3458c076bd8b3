pub mod config;
pub mod report;

pub use config::{ConfigSummaryView, ModuleStatus};
pub use report::ReportView;
