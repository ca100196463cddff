//! ScreenLab Runner — scan orchestration on top of `screenlab-core`.
//!
//! This crate provides:
//! - The instrument-data provider trait with CSV, synthetic and in-memory sources
//! - An explicit retry policy wrapping any provider
//! - The Scan Orchestrator (bounded rayon pool, cooperative cancellation, progress)
//! - Scan reports with summaries, and JSON/CSV/console sinks
//! - TOML scan configuration and universe files
//! - Logging initialization

pub mod config;
pub mod csv_provider;
pub mod export;
pub mod logging;
pub mod provider;
pub mod report;
pub mod retry;
pub mod scan;
pub mod synthetic;
pub mod universe;

pub use config::{ConfigFileError, ScanFile};
pub use csv_provider::CsvDirectoryProvider;
pub use export::{ConsoleSink, CsvFileSink, JsonFileSink, ReportSink};
pub use logging::init_logging;
pub use provider::{FetchError, InstrumentProvider, MemoryProvider};
pub use report::{ReportSummary, ScanReport, ScanStatus};
pub use retry::{RetryPolicy, RetryingProvider};
pub use scan::{run_scan, ScanControl, ScanError, ScanProgress, ScanRequest, ScanState};
pub use synthetic::SyntheticProvider;
pub use universe::Universe;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn providers_are_send_sync() {
        assert_send::<MemoryProvider>();
        assert_sync::<MemoryProvider>();
        assert_send::<CsvDirectoryProvider>();
        assert_sync::<CsvDirectoryProvider>();
        assert_send::<SyntheticProvider>();
        assert_sync::<SyntheticProvider>();
        assert_send::<RetryingProvider<Box<dyn InstrumentProvider>>>();
        assert_sync::<RetryingProvider<Box<dyn InstrumentProvider>>>();
    }

    #[test]
    fn scan_types_are_send_sync() {
        assert_send::<ScanControl>();
        assert_sync::<ScanControl>();
        assert_send::<ScanRequest>();
        assert_sync::<ScanRequest>();
        assert_send::<ScanReport>();
        assert_sync::<ScanReport>();
    }
}
