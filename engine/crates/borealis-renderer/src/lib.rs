//! Borealis 的渲染编排层
//!
//! 负责把场景描述变成每帧的 GPU 工作：
//! - [`renderer::Renderer`] 是对外入口，持有 swapchain、pass、模型与帧资源；
//! - 每帧按 shadow → scene → overlay 的顺序录制三个 pass；
//! - Frames in Flight 的 fence / semaphore 编排集中在 [`frame_slots`]；
//! - IBL 的一次性预计算在 [`precompute`] 中完成，必须先于 PBR binding set。

pub mod bindings;
pub mod frame_slots;
pub mod frame_uniforms;
pub mod models;
pub mod passes;
pub mod precompute;
pub mod registry;
pub mod renderer;
