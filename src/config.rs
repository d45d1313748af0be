// 应用配置
//
// 从环境变量读取（启动时先加载 .env），
// 无效的值回退到默认值，并在日志初始化后输出警告。

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::HostValidator;
use crate::services::fetcher::DEFAULT_USER_AGENTS;
use crate::services::CacheSettings;

/// 默认缓存有效期：一年
pub const DEFAULT_CACHE_TIMEOUT: u64 = 31_536_000;
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "amazon_book_image";
pub const DEFAULT_CACHE_DIR: &str = "cache/book_images";

/// 运行环境
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Testing,
    Production,
}

impl FromStr for AppEnv {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "testing" | "test" => Ok(AppEnv::Testing),
            "production" | "prod" => Ok(AppEnv::Production),
            _ => Err(()),
        }
    }
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Testing => "testing",
            AppEnv::Production => "production",
        }
    }

    /// 未设置 LOG_LEVEL 时的默认日志级别
    pub fn default_log_level(&self) -> &'static str {
        match self {
            AppEnv::Development | AppEnv::Testing => "debug",
            AppEnv::Production => "info",
        }
    }
}

/// 应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub app_env: AppEnv,
    pub cache: CacheSettings,
    /// 文件缓存清理间隔
    pub cleanup_interval: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agents: Vec<String>,
    pub accepted_hosts: Vec<String>,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// 读取配置时遇到的无效值
    pub warnings: Vec<String>,
}

impl AppConfig {
    /// 从环境变量读取配置
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源读取配置
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut reader = EnvReader {
            lookup,
            warnings: Vec::new(),
        };

        let app_env = reader.parse_or("APP_ENV", AppEnv::Development);
        let host = reader.string_or("HOST", "0.0.0.0");
        let port = reader.parse_or("PORT", 5000u16);

        let cache = CacheSettings {
            redis_url: reader.optional("CACHE_REDIS_URL"),
            ttl_seconds: reader.parse_or("CACHE_TIMEOUT", DEFAULT_CACHE_TIMEOUT).max(1),
            key_prefix: reader.string_or("CACHE_KEY_PREFIX", DEFAULT_CACHE_KEY_PREFIX),
            cache_dir: PathBuf::from(reader.string_or("CACHE_DIR", DEFAULT_CACHE_DIR)),
            probe_timeout: Duration::from_millis(reader.parse_or("CACHE_PROBE_TIMEOUT_MS", 2000u64)),
        };
        let cleanup_interval =
            Duration::from_secs(reader.parse_or("CACHE_CLEANUP_INTERVAL_SECS", 300u64).max(1));

        let connect_timeout = reader.seconds_or("REQUEST_CONNECT_TIMEOUT", 3.05);
        let read_timeout = reader.seconds_or("REQUEST_READ_TIMEOUT", 6.05);

        let user_agents = reader
            .optional("USER_AGENTS")
            .map(|value| split_list(&value, '|'))
            .filter(|agents| !agents.is_empty())
            .unwrap_or_else(|| DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect());

        let accepted_hosts = reader
            .optional("ACCEPTED_HOSTS")
            .map(|value| split_list(&value, ','))
            .filter(|hosts| !hosts.is_empty())
            .unwrap_or_else(|| vec!["amazon".to_string()]);

        let log_level = reader.string_or("LOG_LEVEL", app_env.default_log_level());
        let log_file = reader.optional("LOG_FILE").map(PathBuf::from);

        Self {
            host,
            port,
            app_env,
            cache,
            cleanup_interval,
            connect_timeout,
            read_timeout,
            user_agents,
            accepted_hosts,
            log_level,
            log_file,
            warnings: reader.warnings,
        }
    }

    /// 监听地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 整个抓取过程的超时（连接 + 读取）
    pub fn fetch_timeout(&self) -> Duration {
        self.connect_timeout + self.read_timeout
    }

    pub fn host_validator(&self) -> HostValidator {
        HostValidator::new(&self.accepted_hosts)
    }
}

/// 按分隔符拆分列表，去除空白项
fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

struct EnvReader<F> {
    lookup: F,
    warnings: Vec<String>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// 读取非空值
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&mut self, key: &str, default: T) -> T
    where
        T: FromStr,
    {
        match self.optional(key) {
            Some(value) => match value.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    self.warnings
                        .push(format!("{} 的值无效: {:?}，使用默认值", key, value));
                    default
                }
            },
            None => default,
        }
    }

    /// 读取以秒为单位的小数
    fn seconds_or(&mut self, key: &str, default: f64) -> Duration {
        let seconds = self.parse_or(key, default);
        match Duration::try_from_secs_f64(seconds) {
            Ok(duration) if !duration.is_zero() => duration,
            _ => {
                self.warnings
                    .push(format!("{} 必须是有效的正数: {}，使用默认值", key, seconds));
                Duration::from_secs_f64(default)
            }
        }
    }
}
