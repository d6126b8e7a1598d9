//! Borealis 工具集
//!
//! 提供日志初始化、panic 钩子、资源路径管理等通用工具。

pub mod init_log;
pub mod panic_hook;

use std::path::{Path, PathBuf};

/// 统一资源路径管理
///
/// 所有路径基于工作区根目录（通过 `CARGO_MANIFEST_DIR` 推导），
/// 避免硬编码相对路径。
pub struct BorealisPath {}
// 核心路径
impl BorealisPath {
    /// 获取工作区根目录
    pub fn workspace_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap().to_path_buf()
    }
}
// 根目录下
impl BorealisPath {
    /// 获取 `shaders/.build/` 目录下的文件路径，存放编译好的 spv
    pub fn shader_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("shaders").join(".build").join(filename)
    }

    pub fn shader_path_str(filename: &str) -> String {
        Self::shader_path(filename).to_str().unwrap().to_string()
    }

    /// 获取 `assets/` 目录下的文件路径
    pub fn assets_path(filename: &str) -> PathBuf {
        Self::workspace_path().join("assets").join(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_path_is_parent_of_manifest() {
        let ws = BorealisPath::workspace_path();
        assert!(ws.join("borealis-crate-tools").join("Cargo.toml").exists());
    }

    #[test]
    fn test_shader_path_layout() {
        let p = BorealisPath::shader_path("pbr.vert.spv");
        assert!(p.ends_with("shaders/.build/pbr.vert.spv"));
    }
}
