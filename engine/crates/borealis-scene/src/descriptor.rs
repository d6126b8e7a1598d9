//! 声明式的场景描述
//!
//! App 按顺序列出模型（skybox / PBR 物体 / 光源），renderer 按同样的顺序
//! 建立 GPU 资源。描述本身是纯数据，不持有任何 GPU 对象。

use std::path::PathBuf;

use borealis_render_interface::config::SceneCounts;
use glam::{Mat4, Vec3};

/// 整个场景的描述，模型顺序即加载与渲染登记的顺序
#[derive(Debug, Clone, Default)]
pub struct SceneDesc {
    pub models: Vec<ModelDesc>,
}

/// 单个模型的描述
#[derive(Debug, Clone)]
pub struct ModelDesc {
    pub name: String,
    pub kind: ModelKind,
    pub transform: Mat4,
    /// 录制时跳过，但资源照常创建
    pub hidden: bool,
}

/// 模型的种类，决定走哪条渲染管线
#[derive(Debug, Clone)]
pub enum ModelKind {
    /// 环境天空盒，场景中必须恰好一个；同时是 IBL 烘焙的输入
    Skybox { faces: SkyboxSource },
    /// PBR 物体
    Pbr { mesh: MeshSource, material: MaterialDesc },
    /// 光源；点光源会画出一个小的 gizmo 方块
    Light { light: LightDesc },
}

/// 网格来源
#[derive(Debug, Clone)]
pub enum MeshSource {
    /// 程序生成的立方体，边长 size
    Cube { size: f32 },
    /// 位于 XZ 平面、法线朝 +Y 的地面方块，边长 size
    Floor { size: f32 },
    /// OBJ 文件
    ObjFile { path: PathBuf },
}

/// PBR 材质参数；纹理缺省时由 1x1 纯色纹理顶替
#[derive(Debug, Clone)]
pub struct MaterialDesc {
    pub base_color_factor: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub base_color_texture: Option<PathBuf>,
    pub metallic_roughness_texture: Option<PathBuf>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            base_color_texture: None,
            metallic_roughness_texture: None,
        }
    }
}

/// 光源参数；点光源的位置取模型 transform 的平移部分
#[derive(Debug, Clone)]
pub enum LightDesc {
    Directional {
        /// 照射方向（从光源指向场景）
        direction: Vec3,
        color: Vec3,
        intensity: f32,
    },
    Point {
        color: Vec3,
        intensity: f32,
        /// constant / linear / quadratic 衰减系数
        attenuation: [f32; 3],
        /// 作用半径
        radius: f32,
    },
}

/// 天空盒来源
///
/// 六个面的顺序固定为 +X -X +Y -Y +Z -Z，与 cube map 的 layer 顺序一致。
#[derive(Debug, Clone)]
pub enum SkyboxSource {
    /// 六张同尺寸的方形贴图
    Files { paths: [PathBuf; 6] },
    /// 程序生成的垂直渐变，天然可用、无需任何资源文件
    Gradient {
        size: u32,
        /// 地平线处的颜色
        horizon: [f32; 3],
        /// 天顶处的颜色
        zenith: [f32; 3],
    },
}

// 构造辅助
impl ModelDesc {
    pub fn skybox(name: impl Into<String>, faces: SkyboxSource) -> Self {
        Self {
            name: name.into(),
            kind: ModelKind::Skybox { faces },
            transform: Mat4::IDENTITY,
            hidden: false,
        }
    }

    pub fn pbr(name: impl Into<String>, mesh: MeshSource, material: MaterialDesc, transform: Mat4) -> Self {
        Self {
            name: name.into(),
            kind: ModelKind::Pbr { mesh, material },
            transform,
            hidden: false,
        }
    }

    pub fn directional_light(name: impl Into<String>, direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            name: name.into(),
            kind: ModelKind::Light {
                light: LightDesc::Directional {
                    direction,
                    color,
                    intensity,
                },
            },
            // 方向光没有位置，gizmo 不参与绘制
            transform: Mat4::IDENTITY,
            hidden: true,
        }
    }

    pub fn point_light(name: impl Into<String>, position: Vec3, color: Vec3, intensity: f32, radius: f32) -> Self {
        Self {
            name: name.into(),
            kind: ModelKind::Light {
                light: LightDesc::Point {
                    color,
                    intensity,
                    attenuation: [1.0, 0.09, 0.032],
                    radius,
                },
            },
            // gizmo 画成 0.2 边长的小方块
            transform: Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(0.2)),
            hidden: false,
        }
    }

    #[inline]
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

// getters
impl SceneDesc {
    pub fn add(&mut self, model: ModelDesc) -> &mut Self {
        self.models.push(model);
        self
    }

    /// 按种类统计模型数量，用于 descriptor pool 的保守估算
    pub fn counts(&self) -> SceneCounts {
        let mut counts = SceneCounts::default();
        for model in &self.models {
            match &model.kind {
                ModelKind::Skybox { .. } => counts.skyboxes += 1,
                ModelKind::Pbr { .. } => counts.pbr_models += 1,
                ModelKind::Light { .. } => counts.light_models += 1,
            }
        }
        counts
    }

    /// 场景中唯一的方向光；经过校验之后一定存在
    pub fn directional_light(&self) -> Option<(Vec3, Vec3, f32)> {
        self.models.iter().find_map(|model| match &model.kind {
            ModelKind::Light {
                light: LightDesc::Directional {
                    direction,
                    color,
                    intensity,
                },
            } => Some((*direction, *color, *intensity)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut scene = SceneDesc::default();
        scene
            .add(ModelDesc::skybox(
                "sky",
                SkyboxSource::Gradient {
                    size: 64,
                    horizon: [0.8, 0.8, 0.9],
                    zenith: [0.2, 0.4, 0.8],
                },
            ))
            .add(ModelDesc::pbr("cube", MeshSource::Cube { size: 1.0 }, MaterialDesc::default(), Mat4::IDENTITY))
            .add(ModelDesc::pbr("floor", MeshSource::Floor { size: 10.0 }, MaterialDesc::default(), Mat4::IDENTITY))
            .add(ModelDesc::point_light("lamp", Vec3::new(2.0, 3.0, 0.0), Vec3::ONE, 5.0, 10.0));

        let counts = scene.counts();
        assert_eq!(counts.skyboxes, 1);
        assert_eq!(counts.pbr_models, 2);
        assert_eq!(counts.light_models, 1);
        assert_eq!(counts.total_models(), 4);
    }

    #[test]
    fn test_directional_light_lookup() {
        let mut scene = SceneDesc::default();
        assert!(scene.directional_light().is_none());

        scene.add(ModelDesc::directional_light("sun", Vec3::new(-1.0, -2.0, -1.0), Vec3::ONE, 3.0));
        let (direction, _, intensity) = scene.directional_light().unwrap();
        assert_eq!(direction, Vec3::new(-1.0, -2.0, -1.0));
        assert_eq!(intensity, 3.0);
    }

    #[test]
    fn test_point_light_gizmo_is_visible() {
        let lamp = ModelDesc::point_light("lamp", Vec3::ZERO, Vec3::ONE, 1.0, 5.0);
        assert!(!lamp.hidden);

        let sun = ModelDesc::directional_light("sun", Vec3::NEG_Y, Vec3::ONE, 1.0);
        assert!(sun.hidden);
    }
}
