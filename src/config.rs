//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `DESKHAND__*` 覆盖（双下划线表示嵌套，如 `DESKHAND__LLM__MODEL=gpt-4o`）。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::core::SchedulerSettings;
use crate::llm::RetryConfig;
use crate::react::DEFAULT_SYSTEM_PROMPT;

/// 系统提示词文件（存在时覆盖内置提示词）
const SYSTEM_PROMPT_FILE: &str = "config/prompts/system.txt";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub worker: WorkerSection,
    pub llm: LlmSection,
    pub desktop: DesktopSection,
    pub replay: ReplaySection,
    pub whiteboard: WhiteboardSection,
}

/// [worker] 段：会话身份、步数上限、轮询间隔、启动时的初始任务
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerSection {
    pub session_id: String,
    pub agent_id: String,
    pub max_steps: usize,
    pub poll_interval_secs: u64,
    pub task_id: Option<String>,
    /// 设置后在读取 stdin 之前先执行这个任务
    pub task_description: Option<String>,
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            session_id: "local".to_string(),
            agent_id: "agent-0".to_string(),
            max_steps: 30,
            poll_interval_secs: 2,
            task_id: None,
            task_description: None,
        }
    }
}

/// [llm] 段：OpenAI 兼容端点、模型与重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub base_url: String,
    pub model: String,
    /// 未设置时读 OPENAI_API_KEY
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub max_tokens: u32,
    /// 强制每回合调用一个工具（tool_choice = required）
    pub force_tool_call: bool,
    pub retry: RetrySection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            request_timeout_secs: 120,
            max_tokens: 1024,
            force_tool_call: false,
            retry: RetrySection::default(),
        }
    }
}

/// [llm.retry] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 2,
        }
    }
}

impl RetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs(self.base_delay_secs),
        }
    }
}

/// [desktop] 段：桌面控制 API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DesktopSection {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for DesktopSection {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// 回放导出目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayMode {
    Local,
    Remote,
}

/// [replay] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReplaySection {
    pub enabled: bool,
    pub mode: ReplayMode,
    pub local_dir: PathBuf,
    pub local_url_prefix: String,
    /// 远端模式：申请预签名 URL 的会话 API
    pub api_base_url: String,
    /// 远端模式：对象存储的公开访问前缀
    pub public_url_prefix: String,
    pub upload_timeout_secs: u64,
}

impl Default for ReplaySection {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ReplayMode::Local,
            local_dir: PathBuf::from("replays"),
            local_url_prefix: "/api/replay/serve".to_string(),
            api_base_url: "http://127.0.0.1:3000".to_string(),
            public_url_prefix: String::new(),
            upload_timeout_secs: 30,
        }
    }
}

/// [whiteboard] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhiteboardSection {
    pub enabled: bool,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for WhiteboardSection {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base_url: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// 调度参数；系统提示词从 config/prompts/system.txt 读取，不存在时用内置提示词
    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            session_id: self.worker.session_id.clone(),
            agent_id: self.worker.agent_id.clone(),
            max_steps: self.worker.max_steps,
            poll_interval: Duration::from_secs(self.worker.poll_interval_secs),
            system_prompt: load_system_prompt(Path::new(SYSTEM_PROMPT_FILE)),
        }
    }
}

pub fn load_system_prompt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => DEFAULT_SYSTEM_PROMPT.to_string(),
    }
}

/// 从 config 目录加载配置，环境变量 DESKHAND__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 DESKHAND__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("DESKHAND")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.worker.max_steps, 30);
        assert_eq!(cfg.worker.poll_interval_secs, 2);
        assert_eq!(cfg.llm.retry.to_retry_config(), RetryConfig::default());
        assert_eq!(cfg.replay.mode, ReplayMode::Local);
        assert!(!cfg.whiteboard.enabled);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[worker]\nagent_id = \"agent-7\"\nmax_steps = 5\n\n[replay]\nmode = \"remote\"\npublic_url_prefix = \"https://cdn.example.com\"\n\n[llm.retry]\nmax_attempts = 4"
        )
        .unwrap();
        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.worker.agent_id, "agent-7");
        assert_eq!(cfg.worker.max_steps, 5);
        assert_eq!(cfg.worker.session_id, "local");
        assert_eq!(cfg.replay.mode, ReplayMode::Remote);
        assert_eq!(cfg.replay.public_url_prefix, "https://cdn.example.com");
        assert_eq!(cfg.llm.retry.max_attempts, 4);
        assert_eq!(cfg.llm.retry.base_delay_secs, 2);
    }

    #[test]
    fn test_missing_prompt_file_falls_back() {
        let prompt = load_system_prompt(Path::new("/nonexistent/prompt.txt"));
        assert_eq!(prompt, DEFAULT_SYSTEM_PROMPT);
    }
}
