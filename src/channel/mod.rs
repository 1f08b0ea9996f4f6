//! 与编排端之间的事件通道：消息协议、事件出口、入站消息泵

pub mod message;
pub mod sink;
pub mod stdio;

pub use message::{ControlMessage, InboundMessage, TaskAssignment, WorkerEvent};
pub use sink::{ChannelSink, EventSink, StdioSink};
pub use stdio::pump_messages;
