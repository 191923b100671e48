//! Host tool validation.
//!
//! Checks that the container engine, compose and QEMU user-mode emulation
//! are installed before a build or test run.

use super::CheckResult;
use crate::config::Config;

/// Check that all required host tools are installed.
pub fn check_host_tools(config: &Config) -> Vec<CheckResult> {
    let tools = [
        (
            config.docker.as_str(),
            "Build, pull and run images",
            "apt: docker.io | pacman: docker | brew: docker",
        ),
        (
            config.docker_compose.as_str(),
            "Run host/client test pairs",
            "apt: docker-compose | pacman: docker-compose | brew: docker-compose",
        ),
        (
            super::EMULATION_BINARY,
            "Run foreign-arch images",
            super::EMULATION_REMEDIATION,
        ),
    ];

    tools
        .iter()
        .map(|(tool, purpose, install)| check_tool(tool, purpose, install))
        .collect()
}

fn check_tool(tool: &str, purpose: &str, install_cmd: &str) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass(
            format!("{} tool", tool),
            format!("Found at {} ({})", path.display(), purpose),
        ),
        Err(_) => CheckResult::fail(
            format!("{} tool", tool),
            format!("Not found (needed for: {})", purpose),
            install_cmd,
        ),
    }
}

/// Check if a specific tool is available in PATH.
pub fn has_tool(tool: &str) -> bool {
    which::which(tool).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_tool_existing() {
        // sh should exist on any Unix system
        assert!(has_tool("sh"));
    }

    #[test]
    fn test_has_tool_nonexistent() {
        assert!(!has_tool("definitely_not_a_real_command_12345"));
    }

    #[test]
    fn test_check_host_tools_uses_configured_binaries() {
        let mut config = Config::new("/tmp");
        config.docker = "sh".to_string();
        config.docker_compose = "definitely_not_a_real_command_12345".to_string();

        let results = check_host_tools(&config);
        assert_eq!(results.len(), 3);
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert!(results[1].suggestion.as_deref().unwrap().contains("docker-compose"));
    }
}
