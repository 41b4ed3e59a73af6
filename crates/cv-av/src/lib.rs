//! cv-av: external tool discovery and ffmpeg invocation.
//!
//! The [`ToolRegistry`] locates ffmpeg/ffprobe on the host; [`ToolCommand`]
//! runs them with a timeout; [`transcode`] drives the post-upload
//! normalization encode.

pub mod command;
pub mod tools;
pub mod transcode;

pub use command::{ToolCommand, ToolOutput};
pub use tools::{ToolInfo, ToolRegistry};
pub use transcode::transcode_to_mp4;
