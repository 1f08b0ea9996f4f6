//! 系统提示词与首条用户消息

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI agent controlling a Linux desktop via tools. \
You receive a screenshot of the screen at the start of every turn; use it to decide the next action. \
Call exactly one tool per turn: click, type, press keys, move the mouse or scroll to interact. \
After each action you will see the updated screen, so verify the result before moving on. \
When the task is complete, call the done tool with a short summary of what you accomplished.";

const WHITEBOARD_HEADER: &str = "Shared whiteboard (notes from other agents in this session):";

/// 基础提示词 + 白板快照（为空时不附加）
pub fn build_system_prompt(base: &str, whiteboard: Option<&str>) -> String {
    match whiteboard.map(str::trim).filter(|w| !w.is_empty()) {
        Some(board) => format!("{base}\n\n{WHITEBOARD_HEADER}\n{board}"),
        None => base.to_string(),
    }
}

pub fn task_message(description: &str) -> String {
    format!("Complete this task: {description}")
}
