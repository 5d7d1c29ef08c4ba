//! TOML parser with helpful error messages

use super::schema::UpkeepConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Parse upkeep.toml with detailed error messages
pub fn parse_upkeep_toml(path: &Path) -> Result<UpkeepConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_upkeep_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse upkeep.toml content from string
pub fn parse_upkeep_toml_str(content: &str) -> Result<UpkeepConfig> {
    let config: UpkeepConfig =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    config.validate()?;

    Ok(config)
}

/// Enhance TOML parsing errors with the offending lines
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_hint = error_msg
        .lines()
        .find(|line| line.contains("line "))
        .and_then(|line| {
            line.split("line ")
                .nth(1)
                .and_then(|s| s.split(|c: char| !c.is_ascii_digit()).next())
                .and_then(|s| s.parse::<usize>().ok())
        });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 2).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a configuration to TOML string
pub fn to_toml(config: &UpkeepConfig) -> Result<String> {
    toml::to_string_pretty(config).with_context(|| "Failed to serialize configuration to TOML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_INSTALL_COMMAND, ModuleKind};
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    const FLEET: &str = r#"
[settings]
temp_root = "/tmp/upkeep-test"
backup_root = "/var/backups/upkeep"

[[module]]
name = "shell"
remote = "https://git.example.com/web/shell.git"
kind = "frontend"
deploy_path = "/srv/www/shell"
build_command = "npm run build"

[[module]]
name = "orders-api"
remote = "git@git.example.com:svc/orders.git"
kind = "backend"
deploy_path = "/srv/api/orders"
build_command = "npm run build"
branch = "release"
"#;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_upkeep_toml_str(FLEET).unwrap();
        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.modules[0].name, "shell");
        assert_eq!(config.modules[0].kind, ModuleKind::Frontend);
        assert_eq!(config.modules[0].branch(), "main");
        assert_eq!(config.modules[1].branch(), "release");
        assert_eq!(config.settings.temp_root, PathBuf::from("/tmp/upkeep-test"));
        assert_eq!(config.settings.install_command, DEFAULT_INSTALL_COMMAND);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_upkeep_toml_str("").unwrap();
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_parse_preserves_module_order() {
        let config = parse_upkeep_toml_str(FLEET).unwrap();
        let names: Vec<_> = config.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["shell", "orders-api"]);
    }

    #[test]
    fn test_parse_unknown_kind_errors() {
        let toml = r#"
[[module]]
name = "shell"
remote = "https://git.example.com/web/shell.git"
kind = "desktop"
deploy_path = "/srv/www/shell"
build_command = "npm run build"
"#;
        let err = parse_upkeep_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("TOML parsing error"), "got: {err}");
    }

    #[test]
    fn test_parse_runs_validation() {
        let toml = r#"
[[module]]
name = "shell"
remote = "https://git.example.com/web/shell.git"
kind = "frontend"
deploy_path = "relative/path"
build_command = "npm run build"
"#;
        let err = parse_upkeep_toml_str(toml).unwrap_err().to_string();
        assert!(err.contains("must be absolute"));
    }

    #[test]
    fn test_parse_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FLEET.as_bytes()).unwrap();
        let config = parse_upkeep_toml(file.path()).unwrap();
        assert_eq!(config.modules.len(), 2);
    }

    #[test]
    fn test_roundtrip_keeps_modules() {
        let config = parse_upkeep_toml_str(FLEET).unwrap();
        let rendered = to_toml(&config).unwrap();
        let reparsed = parse_upkeep_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.modules, config.modules);
    }

    #[test]
    fn test_line_context_marks_error_line() {
        let content = "a\nb\nc\nd";
        let context = get_line_context(content, 3);
        assert!(context.contains(">>>    3 | c"));
    }
}
