//! Borealis 的 winit 外壳
//!
//! [`app::WinitApp`] 负责窗口生命周期、输入分发和每帧驱动；
//! 具体 demo 实现 [`app::SceneApp`]，提供场景描述和可选的每帧逻辑。

pub mod app;
pub mod camera;
pub mod overlay;
