use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

use crate::{HatestError, Result};

/// 请求默认值
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 单次请求超时（毫秒）
    pub timeout_ms: u64,

    /// 最多跟随的重定向次数，0 表示不跟随
    pub max_redirects: usize,

    pub user_agent: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ms: 100_000,
            max_redirects: 5,
            user_agent: None,
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 进程级默认配置，首次访问时查找配置文件
    pub fn global() -> &'static Config {
        static GLOBAL: OnceLock<Config> = OnceLock::new();
        GLOBAL.get_or_init(|| ConfigLoader::find_and_load().unwrap_or_default())
    }
}

/// 配置文件加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 配置文件名
    const CONFIG_FILE: &'static str = "hatest.toml";

    /// 显式指定配置文件的环境变量
    const CONFIG_ENV: &'static str = "HATEST_CONFIG";

    /// 从指定路径加载配置文件
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Config> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            HatestError::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Config> {
        toml::from_str(content).map_err(|e| HatestError::Config(e.to_string()))
    }

    /// 查找并加载配置文件
    /// 查找顺序：
    /// 1. HATEST_CONFIG 指定的路径
    /// 2. 当前目录及父目录
    /// 3. 用户配置目录 ~/.config/hatest/
    pub fn find_and_load() -> Option<Config> {
        if let Ok(path) = std::env::var(Self::CONFIG_ENV) {
            return match Self::load_from_path(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("ignoring {}: {}", Self::CONFIG_ENV, e);
                    None
                }
            };
        }

        if let Some(config) = Self::try_load_from_current_dir() {
            return Some(config);
        }

        Self::try_load_from_user_dir()
    }

    /// 尝试从当前目录及其父目录加载
    fn try_load_from_current_dir() -> Option<Config> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            let config_path = current.join(Self::CONFIG_FILE);
            if config_path.exists() {
                return Self::load_from_path(&config_path).ok();
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// 尝试从用户配置目录加载
    fn try_load_from_user_dir() -> Option<Config> {
        let home = dirs::home_dir()?;
        let config_path = home.join(".config").join("hatest").join(Self::CONFIG_FILE);

        if config_path.exists() {
            Self::load_from_path(&config_path).ok()
        } else {
            None
        }
    }
}
