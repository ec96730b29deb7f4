//! 配置管理命令
//!
//! 地面站配置保存在 `<config_dir>/kite/config.toml`，格式即
//! [`StationConfig`] 的 TOML 序列化；缺省字段取默认值。

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use kite_driver::StationConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Cannot determine the user config directory")?;
    path.push("kite");
    path.push("config.toml");
    Ok(path)
}

/// 从 TOML 文本解析并校验配置
pub fn parse_config(content: &str) -> Result<StationConfig> {
    let config: StationConfig = toml::from_str(content).context("Invalid config file")?;
    config.validate()?;
    Ok(config)
}

/// 加载配置
///
/// - 指定了 `path`：文件必须存在
/// - 未指定：读取默认路径，文件不存在时使用默认配置
pub fn load_config(path: Option<&Path>) -> Result<StationConfig> {
    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (default_config_file()?, false),
    };

    if !path.exists() {
        if required {
            bail!("Config file {} does not exist", path.display());
        }
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(StationConfig::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to load {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 打印生效的配置（TOML）
    Show {
        /// 配置文件路径（默认 <config_dir>/kite/config.toml）
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// 打印默认配置文件路径
    Path,

    /// 在默认路径写入一份默认配置
    Init {
        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Show { config } => {
                let config = load_config(config.as_deref())?;
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            },

            ConfigCommand::Path => {
                println!("{}", default_config_file()?.display());
                Ok(())
            },

            ConfigCommand::Init { force } => {
                let path = default_config_file()?;
                write_default(&path, force)?;
                println!("✅ Wrote default config to {}", path.display());
                Ok(())
            },
        }
    }
}

fn write_default(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("Failed to create config directory")?;
    }
    let content = toml::to_string_pretty(&StationConfig::default())?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kite_driver::Position;

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let text = toml::to_string_pretty(&StationConfig::default()).unwrap();
        assert_eq!(parse_config(&text).unwrap(), StationConfig::default());
    }

    #[test]
    fn test_parse_rejects_invalid_values() {
        let err = parse_config("[heartbeat]\ndisconnect_threshold = 0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("disconnect_threshold"));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.toml");
        fs::write(&path, "[target]\nx = 1.0\ny = 2.0\nz = 3.0\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.target, Position::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_write_default_respects_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kite").join("config.toml");

        write_default(&path, false).unwrap();
        assert!(write_default(&path, false).is_err());
        write_default(&path, true).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), StationConfig::default());
    }
}
