//! Optional subscriber setup for applications embedding the flow builders.
//!
//! The library only emits `tracing` events while it assembles flows; it never installs
//! a subscriber itself. A host binary calls [`setup_logging`] once at startup to route
//! those events to stderr and, optionally, a log file.

use std::fs::File;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
    util::TryInitError,
};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Cannot open log file '{path}': {source}", path = path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber. Fails if the host already installed one.
pub fn setup_logging(
    verbosity: u8,
    quiet: bool,
    log_file: Option<PathBuf>,
) -> Result<(), LoggingError> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(level_for(verbosity, quiet))
        .with(stderr_layer);

    if let Some(path) = log_file {
        let file = File::create(&path).map_err(|source| LoggingError::LogFile {
            path: path.clone(),
            source,
        })?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true);

        subscriber.with(file_layer).try_init()?;
    } else {
        subscriber.try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::structure::{Lattice, Site, Structure};
    use crate::engine::config::{Code, EosConfigBuilder};
    use crate::engine::flow::Flow;
    use crate::jobs::calculators::{CalculatorMaker, TaskKind};
    use crate::workflows::eos::EosMaker;
    use serial_test::serial;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            setup_logging(3, false, None).expect("Failed to set up global logger for tests");
        });
    }

    fn build_eos_flow() -> Flow {
        let silicon = Structure::new(
            Lattice::from_rows([[0.0, 2.73, 2.73], [2.73, 0.0, 2.73], [2.73, 2.73, 0.0]]),
            vec![Site::new("Si", [0.0; 3]), Site::new("Si", [0.25; 3])],
        );
        let config = EosConfigBuilder::new()
            .eos_relax_maker(Box::new(CalculatorMaker::new(Code::Vasp, TaskKind::Relax)))
            .build()
            .unwrap();
        EosMaker::new(config).make(silicon, None).unwrap()
    }

    #[test]
    fn verbosity_maps_to_level_filters() {
        assert_eq!(level_for(0, false), LevelFilter::WARN);
        assert_eq!(level_for(1, false), LevelFilter::INFO);
        assert_eq!(level_for(2, false), LevelFilter::DEBUG);
        assert_eq!(level_for(9, false), LevelFilter::TRACE);
        assert_eq!(level_for(3, true), LevelFilter::OFF);
    }

    #[test]
    #[serial]
    fn flow_construction_logs_through_global_subscriber() {
        ensure_global_logger_is_set();
        let flow = build_eos_flow();
        assert!(flow.job_count() > 0);
    }

    #[test]
    #[serial]
    fn second_initialization_is_reported() {
        ensure_global_logger_is_set();
        let result = setup_logging(1, false, None);
        assert!(matches!(result, Err(LoggingError::AlreadyInitialized(_))));
    }

    #[test]
    #[serial]
    fn file_layer_records_eos_flow_assembly() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("flows.log");

        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            build_eos_flow();
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Computed linear strains."));
        assert!(content.contains("EOS flow assembled."));
        assert!(content.contains("DEBUG"));
        assert!(content.contains("ThreadId"));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_is_reported_before_initialization() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = setup_logging(0, false, Some(temp_dir.path().to_path_buf()));
        assert!(matches!(result, Err(LoggingError::LogFile { .. })));
    }
}
