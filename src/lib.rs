//! Deskhand - 远程桌面自动化 Worker
//!
//! 模块划分：
//! - **channel**: 与编排端之间的事件通道（NDJSON 消息协议、事件出口、入站消息泵）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、终止信号、任务调度、Worker 组装
//! - **desktop**: 远程桌面控制面抽象与 HTTP / Mock 实现
//! - **llm**: 推理客户端抽象、重试包装、OpenAI 兼容实现与 Mock
//! - **observability**: 日志初始化
//! - **react**: Observe-Think-Act 主循环
//! - **replay**: 回放采集与导出（本地 / 远端）
//! - **tools**: 桌面工具目录与分发器
//! - **whiteboard**: 会话内共享白板

pub mod channel;
pub mod config;
pub mod core;
pub mod desktop;
pub mod llm;
pub mod observability;
pub mod react;
pub mod replay;
pub mod tools;
pub mod whiteboard;
