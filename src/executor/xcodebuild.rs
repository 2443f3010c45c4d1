//! Process adapter for the `xcodebuild` toolchain.
//!
//! Composes the invocation from the platform identity and build options,
//! runs it, and reports a stderr tail as diagnostics on failure. What
//! xcodebuild does internally is outside this crate's contract.

use std::path::Path;
use std::process::Command;

use crate::options::{BuildOptions, PackageIdentity};
use crate::platform::PlatformIdentity;

use super::{BuildExecutor, BuildFailure, BuildProducts};

/// Number of trailing stderr lines kept as diagnostics
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Executor that shells out to `xcodebuild`
#[derive(Debug)]
pub struct XcodebuildExecutor {
    program: String,
    package_dir: std::path::PathBuf,
}

impl XcodebuildExecutor {
    /// Create an executor for the package checked out at `package_dir`
    pub fn new(package_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            program: "xcodebuild".to_string(),
            package_dir: package_dir.into(),
        }
    }

    /// Override the program name (for wrappers and shims)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn build_args(
        &self,
        package: &PackageIdentity,
        platform: &PlatformIdentity,
        options: &BuildOptions,
        output_dir: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "-scheme".to_string(),
            package.name.clone(),
            "-configuration".to_string(),
            options.configuration.settings_value().to_string(),
            "-sdk".to_string(),
            platform.sdk_name.to_string(),
            "-destination".to_string(),
            platform.destination_spec.to_string(),
            "BUILD_DIR=".to_string() + &output_dir.display().to_string(),
        ];
        if options.debug_symbols_embedded {
            args.push("DEBUG_INFORMATION_FORMAT=dwarf-with-dsym".to_string());
        } else {
            args.push("DEBUG_INFORMATION_FORMAT=dwarf".to_string());
        }
        args
    }
}

impl BuildExecutor for XcodebuildExecutor {
    fn execute(
        &self,
        package: &PackageIdentity,
        platform: &PlatformIdentity,
        options: &BuildOptions,
        output_dir: &Path,
    ) -> Result<BuildProducts, BuildFailure> {
        std::fs::create_dir_all(output_dir).map_err(|e| BuildFailure {
            sdk_name: platform.sdk_name.to_string(),
            diagnostics: format!("creating output directory: {}", e),
        })?;

        let args = self.build_args(package, platform, options, output_dir);
        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.package_dir)
            .output()
            .map_err(|e| BuildFailure {
                sdk_name: platform.sdk_name.to_string(),
                diagnostics: format!("failed to launch {}: {}", self.program, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BuildFailure {
                sdk_name: platform.sdk_name.to_string(),
                diagnostics: stderr_tail(&stderr, DIAGNOSTIC_TAIL_LINES),
            });
        }

        Ok(BuildProducts {
            artifact_dir: output_dir.to_path_buf(),
        })
    }
}

fn stderr_tail(stderr: &str, lines: usize) -> String {
    let all: Vec<&str> = stderr.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::BuildConfiguration;
    use crate::platform::{Family, Variant};

    #[test]
    fn test_args_carry_sdk_and_destination() {
        let executor = XcodebuildExecutor::new("/tmp/pkg");
        let package = PackageIdentity::new("MyLib", "abc123");
        let platform = PlatformIdentity::resolve(Family::Ios, Variant::Simulator).unwrap();
        let options = BuildOptions::new(BuildConfiguration::Debug, [Family::Ios]);

        let args = executor.build_args(&package, &platform, &options, Path::new("/tmp/out"));

        assert!(args.contains(&"iphonesimulator".to_string()));
        assert!(args.contains(&"generic/platform=iOS Simulator".to_string()));
        assert!(args.contains(&"Debug".to_string()));
    }

    #[test]
    fn test_args_reflect_debug_symbol_policy() {
        let executor = XcodebuildExecutor::new("/tmp/pkg");
        let package = PackageIdentity::new("MyLib", "abc123");
        let platform = PlatformIdentity::resolve(Family::MacOs, Variant::Device).unwrap();
        let options = BuildOptions::new(BuildConfiguration::Release, [Family::MacOs])
            .with_debug_symbols_embedded(true);

        let args = executor.build_args(&package, &platform, &options, Path::new("/tmp/out"));
        assert!(args.contains(&"DEBUG_INFORMATION_FORMAT=dwarf-with-dsym".to_string()));
    }

    #[test]
    fn test_missing_program_is_build_failure() {
        let executor =
            XcodebuildExecutor::new("/tmp").with_program("xcf-forge-no-such-program");
        let package = PackageIdentity::new("MyLib", "abc123");
        let platform = PlatformIdentity::resolve(Family::MacOs, Variant::Device).unwrap();
        let options = BuildOptions::new(BuildConfiguration::Release, [Family::MacOs]);
        let temp = tempfile::tempdir().unwrap();

        let result = executor.execute(&package, &platform, &options, temp.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().diagnostics.contains("failed to launch"));
    }

    #[test]
    fn test_stderr_tail_truncates() {
        let stderr: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(&stderr, 3);
        assert_eq!(tail, "line 47\nline 48\nline 49");
    }
}
