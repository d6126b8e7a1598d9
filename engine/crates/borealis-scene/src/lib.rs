//! 场景层：声明式的场景描述，以及把它变成 CPU 侧数据的加载流程
//!
//! 这一层不接触任何 Vulkan 对象；GPU 上传由 renderer 在加载结果之上完成。

pub mod descriptor;
pub mod loader;
pub mod mesh;
pub mod validate;
