//! 三个 render pass：shadow → scene → overlay
//!
//! pass 拥有自己的 render pass、attachment 和 framebuffer，
//! 录制时从 [`crate::registry::PipelineRegistry`] 取 pipeline，
//! pass 之间的执行顺序由 subpass 的 EXTERNAL 依赖保证。

pub mod overlay_pass;
pub mod scene_pass;
pub mod shadow_pass;
