//! Preflight checks for container builds.
//!
//! Validates prerequisites BEFORE starting long engine operations.
//!
//! # Checks Performed
//!
//! - **Host tools**: docker, docker-compose and qemu-aarch64 are installed
//! - **Emulation**: binfmt handlers are registered (see [`ensure_emulation`])
//!
//! # Usage
//!
//! ```rust,ignore
//! use distcc_matrix::preflight::PreflightChecker;
//!
//! let report = PreflightChecker::new(&config).run_all();
//! report.print_summary();
//! if !report.is_ok() {
//!     std::process::exit(1);
//! }
//! ```

mod emulation;
mod host_tools;

pub use emulation::{ensure_emulation, BINFMT_IMAGE, EMULATION_BINARY, EMULATION_REMEDIATION};
pub use host_tools::{check_host_tools, has_tool};

use crate::config::Config;

/// Result of a single preflight check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Human-readable message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create a failing check result.
    pub fn fail(
        name: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }
}

/// Comprehensive preflight report.
#[derive(Debug, Default)]
pub struct PreflightReport {
    /// All check results
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// Check if all preflight checks passed.
    pub fn is_ok(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Get all failing checks.
    pub fn errors(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    /// Get count of passing checks.
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Get total check count.
    pub fn total_count(&self) -> usize {
        self.checks.len()
    }

    /// Print a summary of the preflight checks.
    pub fn print_summary(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            let status = if check.passed { "[OK]" } else { "[FAIL]" };
            println!("{} {}: {}", status, check.name, check.message);
            if let Some(suggestion) = &check.suggestion {
                println!("     Suggestion: {}", suggestion);
            }
        }

        println!();
        if self.is_ok() {
            println!(
                "All preflight checks passed ({}/{})",
                self.passed_count(),
                self.total_count()
            );
        } else {
            println!(
                "Preflight checks failed: {} of {} passed",
                self.passed_count(),
                self.total_count()
            );
        }
    }
}

/// Preflight checker for build prerequisites.
pub struct PreflightChecker<'a> {
    config: &'a Config,
}

impl<'a> PreflightChecker<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Run all preflight checks and return a report.
    pub fn run_all(&self) -> PreflightReport {
        PreflightReport {
            checks: check_host_tools(self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BuildRequest, ContainerEngine, PullOutcome};
    use crate::error::{Error, Result};
    use std::cell::RefCell;
    use std::path::Path;

    #[test]
    fn test_check_result_pass() {
        let result = CheckResult::pass("test", "passed");
        assert!(result.passed);
        assert!(result.suggestion.is_none());
    }

    #[test]
    fn test_check_result_fail() {
        let result = CheckResult::fail("test", "failed", "fix it");
        assert!(!result.passed);
        assert!(result.suggestion.is_some());
    }

    #[test]
    fn test_preflight_report_is_ok() {
        let mut report = PreflightReport::default();
        assert!(report.is_ok()); // Empty is OK

        report.checks.push(CheckResult::pass("test1", "ok"));
        assert!(report.is_ok());

        report.checks.push(CheckResult::fail("test2", "bad", "fix"));
        assert!(!report.is_ok());
        assert_eq!(report.errors().len(), 1);
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.total_count(), 2);
    }

    /// Engine that only answers `images` and records `run` calls.
    struct ImagesOnly {
        images: Vec<String>,
        runs: RefCell<Vec<String>>,
    }

    impl ContainerEngine for ImagesOnly {
        fn image_repositories(&self) -> Result<Vec<String>> {
            Ok(self.images.clone())
        }
        fn run(&self, args: &[&str]) -> Result<()> {
            self.runs.borrow_mut().push(args.join(" "));
            Ok(())
        }
        fn pull(&self, _image: &str) -> Result<PullOutcome> {
            unreachable!()
        }
        fn build(&self, _request: &BuildRequest<'_>) -> Result<()> {
            unreachable!()
        }
        fn compose_up(&self, _file: &Path, _service: &str) -> Result<()> {
            unreachable!()
        }
        fn compose_run(&self, _file: &Path, _service: &str) -> Result<()> {
            unreachable!()
        }
    }

    fn engine(images: &[&str]) -> ImagesOnly {
        ImagesOnly {
            images: images.iter().map(|s| s.to_string()).collect(),
            runs: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_emulation_missing_binary() {
        let engine = engine(&[]);
        let err = ensure_emulation(&engine, |_| false).unwrap_err();
        match err {
            Error::EmulationUnavailable { remediation, .. } => {
                assert!(remediation.contains("apt:"));
                assert!(remediation.contains("pacman:"));
                assert!(remediation.contains("brew:"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(engine.runs.borrow().is_empty());
    }

    #[test]
    fn test_emulation_registers_handlers_once() {
        let missing = engine(&["debian"]);
        ensure_emulation(&missing, |_| true).unwrap();
        assert_eq!(
            *missing.runs.borrow(),
            vec!["--rm --privileged multiarch/qemu-user-static --reset -p yes".to_string()]
        );

        let present = engine(&["debian", BINFMT_IMAGE]);
        ensure_emulation(&present, |_| true).unwrap();
        assert!(present.runs.borrow().is_empty());
    }
}
