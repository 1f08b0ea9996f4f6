//! 工具参数类型与 JSON Schema 生成（schemars）
//!
//! 每个工具的参数是一个带 JsonSchema 的结构体：同一个类型既用于解码模型给出的参数，
//! 也用于生成暴露给推理服务的 parameters schema，两者不会漂移。

use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::desktop::ScrollDirection;

/// 无参数工具
#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoArgs {}

/// 屏幕坐标
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PointArgs {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TypeTextArgs {
    /// Text to type; newlines are typed as Enter key presses
    pub text: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PressKeyArgs {
    /// Key or combo to press, e.g. 'enter', 'ctrl+c', 'alt+F2'
    pub key: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScrollArgs {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Direction to scroll
    pub direction: ScrollDirection,
    /// Number of scroll steps
    #[serde(default = "default_scroll_amount")]
    pub amount: u32,
}

pub const DEFAULT_SCROLL_AMOUNT: u32 = 3;

fn default_scroll_amount() -> u32 {
    DEFAULT_SCROLL_AMOUNT
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DoneArgs {
    /// Summary of what was accomplished
    pub summary: String,
}

/// 生成某个参数类型的 parameters schema：子 schema 内联、去掉 $schema/title
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        })
        .into_generator();
    let root = generator.into_root_schema_for::<T>();
    let mut value = serde_json::to_value(&root).unwrap_or_else(|_| json!({ "type": "object" }));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("title");
        obj.remove("definitions");
        obj.entry("properties").or_insert_with(|| json!({}));
    }
    value
}
