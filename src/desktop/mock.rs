//! Mock 桌面（用于测试，无需远程沙箱）
//!
//! 记录每次原语调用（如 "click:10,20"、"write:hi"、"press:Enter"），截图返回一张小的纯色 PNG。

use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::desktop::{DesktopError, DesktopSurface, ScrollDirection};

#[derive(Debug, Default)]
pub struct MockDesktop {
    calls: Mutex<Vec<String>>,
    screenshots: Mutex<usize>,
    fail_actions: bool,
}

impl MockDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    /// 除截图外所有原语都返回错误
    pub fn failing(mut self) -> Self {
        self.fail_actions = true;
        self
    }

    /// 已记录的原语调用（不含截图）
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn screenshot_count(&self) -> usize {
        self.screenshots.lock().map(|n| *n).unwrap_or_default()
    }

    fn record(&self, call: String) -> Result<(), DesktopError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.fail_actions {
            return Err(DesktopError::Request("mock desktop failure".to_string()));
        }
        Ok(())
    }
}

/// 生成一张 64x36 的纯色 PNG
pub fn sample_png() -> Vec<u8> {
    let img = RgbImage::from_pixel(64, 36, Rgb([40, 90, 160]));
    let mut buf = Vec::new();
    if DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .is_err()
    {
        buf.clear();
    }
    buf
}

#[async_trait]
impl DesktopSurface for MockDesktop {
    async fn screenshot(&self) -> Result<Vec<u8>, DesktopError> {
        if let Ok(mut n) = self.screenshots.lock() {
            *n += 1;
        }
        Ok(sample_png())
    }

    async fn left_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.record(format!("click:{x},{y}"))
    }

    async fn double_click(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.record(format!("double_click:{x},{y}"))
    }

    async fn write(&self, text: &str) -> Result<(), DesktopError> {
        self.record(format!("write:{text}"))
    }

    async fn press(&self, key: &str) -> Result<(), DesktopError> {
        self.record(format!("press:{key}"))
    }

    async fn move_mouse(&self, x: i32, y: i32) -> Result<(), DesktopError> {
        self.record(format!("move:{x},{y}"))
    }

    async fn scroll(&self, direction: ScrollDirection, amount: u32) -> Result<(), DesktopError> {
        self.record(format!("scroll:{},{amount}", direction.as_str()))
    }
}
