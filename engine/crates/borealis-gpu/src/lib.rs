//! Borealis 的 GPU 层：对 Vulkan 的薄封装
//!
//! 所有对象在创建时注册 debug name，在 Drop 时释放自己的 vk 资源。
//! 上层通过 [`context::GpuContext`] 获得 device/allocator/queue 的共享引用。

pub mod basic;
pub mod commands;
pub mod context;
pub mod descriptors;
pub mod foundation;
pub mod pipelines;
pub mod render_pass;
pub mod resources;
pub mod swapchain;
pub mod transition;
