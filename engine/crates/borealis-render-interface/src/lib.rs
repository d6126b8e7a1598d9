//! 渲染器各 crate 之间共享的边界类型
//!
//! 包含帧计数器、渲染配置、顶点布局以及 CPU/GPU 共享的 uniform 结构。

pub mod config;
pub mod frame_counter;
pub mod uniforms;
pub mod vertex;
