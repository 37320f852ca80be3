pub mod context;
pub mod loop_;
pub mod protocol;
pub mod registry;
pub mod session;

pub use context::ContextBuilder;
pub use loop_::AgentLoop;
pub use protocol::{AssistantReply, ToolRequest, decode_reply};
pub use registry::ToolRegistry;
pub use session::Session;
