//! External tool availability checking.
//!
//! The pipeline shells out to the .NET SDK and the Xcode command line tools.
//! Checking them up front turns a late "command not found" halfway through a
//! release build into an immediate, actionable error.

/// Tools every non-dry run needs on `PATH`.
pub const REQUIRED_TOOLS: &[&str] = &["dotnet", "codesign", "xcrun", "hdiutil"];

/// Returns the tools from `tools` that cannot be resolved on `PATH`.
pub fn missing_tools(tools: &[&str]) -> Vec<String> {
    tools
        .iter()
        .filter(|tool| match which::which(tool) {
            Ok(path) => {
                log::debug!("Found {} at: {}", tool, path.display());
                false
            }
            Err(e) => {
                log::debug!("{} not found in PATH: {}", tool, e);
                true
            }
        })
        .map(|tool| tool.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_only_missing_tools() {
        let missing = missing_tools(&["sh", "kodegen-missing-tool-91c2"]);
        assert_eq!(missing, vec!["kodegen-missing-tool-91c2".to_string()]);
    }
}
