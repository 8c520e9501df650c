//! Encrypted backup export/restore and vault reports.

mod report;
mod service;

pub use report::{ReportRow, ReportSection, ReportSnapshot};
pub use service::VaultBackupService;
