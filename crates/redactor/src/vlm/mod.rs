//! Vision-LLM detection: direct chat-completion calls, the optional MCP
//! sidecar proxy, coordinate-convention normalization, and prompt/label
//! normalization shared by both modes.

mod client;
mod coord;
mod mcp_proxy;
mod prompt;

pub use client::VlmDetector;
pub use coord::{RawBox, normalize_boxes};
pub use mcp_proxy::McpProxyClient;
pub use prompt::{build_detection_prompt, normalize_type_label};
