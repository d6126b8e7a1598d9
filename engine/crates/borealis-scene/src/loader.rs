//! 场景的并行加载
//!
//! OBJ 解析和图片解码是纯 CPU 的重活，按模型粒度派发到一次性的 rayon
//! 线程池里。每个 worker 只写自己的返回值，不碰任何共享容器；
//! 主线程在所有 worker 结束后按描述顺序合并结果。
//!
//! 网格按来源去重：相同参数的程序网格、相同路径的 OBJ 只加载一份，
//! 放进 [`MeshRegistry`]，模型之间通过 [`MeshKey`] 共享。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use rayon::prelude::*;

use crate::{
    descriptor::{MeshSource, ModelDesc, ModelKind, SceneDesc, SkyboxSource},
    mesh::{MeshData, MeshKey, MeshRegistry},
};

/// 解码完成的 RGBA8 图片
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8: Vec<u8>,
}

/// 整个场景的加载结果：网格集中存放，模型以 key 引用
pub struct LoadedScene {
    pub meshes: MeshRegistry,
    pub models: Vec<LoadedModel>,
}

/// 单个模型的加载结果，desc_index 指回 [`SceneDesc::models`] 的下标
#[derive(Debug)]
pub struct LoadedModel {
    pub desc_index: usize,
    pub payload: LoadedPayload,
}

/// 加载结果里与 GPU 无关的那部分数据
#[derive(Debug)]
pub enum LoadedPayload {
    /// 六个面的 RGBA8 像素，顺序 +X -X +Y -Y +Z -Z
    Skybox { size: u32, faces: [Vec<u8>; 6] },
    Pbr {
        mesh: MeshKey,
        base_color: Option<DecodedImage>,
        metallic_roughness: Option<DecodedImage>,
    },
    /// 光源没有要解码的资源，gizmo 网格由 renderer 生成
    Light,
}

/// worker 的每模型产物；网格在单独的去重阶段加载
enum RawPayload {
    Skybox { size: u32, faces: [Vec<u8>; 6] },
    Pbr {
        base_color: Option<DecodedImage>,
        metallic_roughness: Option<DecodedImage>,
    },
    Light,
}

/// 网格来源的去重 key；f32 按 bit 位比较
#[derive(PartialEq, Eq, Hash)]
enum MeshSourceKey {
    Cube(u32),
    Floor(u32),
    Obj(PathBuf),
}

fn mesh_source_key(source: &MeshSource) -> MeshSourceKey {
    match source {
        MeshSource::Cube { size } => MeshSourceKey::Cube(size.to_bits()),
        MeshSource::Floor { size } => MeshSourceKey::Floor(size.to_bits()),
        MeshSource::ObjFile { path } => MeshSourceKey::Obj(path.clone()),
    }
}

/// 加载线程数：核心数减一，至少为一，给主线程留一个核
pub fn worker_thread_count() -> usize {
    let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    cores.saturating_sub(1).max(1)
}

/// 并行加载整个场景
///
/// 返回的模型顺序与 `scene.models` 一致；相同来源的网格只加载一次。
/// 任何一个资源失败则整体失败。
pub fn load_scene(scene: &SceneDesc) -> anyhow::Result<LoadedScene> {
    let _span = tracy_client::span!("load_scene");

    let workers = worker_thread_count();
    log::info!("loading scene: {} models on {} workers", scene.models.len(), workers);

    // 去重：每个 PBR 模型记下自己的网格在 unique_sources 里的下标
    let mut source_slots: HashMap<MeshSourceKey, usize> = HashMap::new();
    let mut unique_sources: Vec<&MeshSource> = Vec::new();
    let mut model_slots: Vec<Option<usize>> = Vec::with_capacity(scene.models.len());
    for model in &scene.models {
        let slot = if let ModelKind::Pbr { mesh, .. } = &model.kind {
            Some(*source_slots.entry(mesh_source_key(mesh)).or_insert_with(|| {
                unique_sources.push(mesh);
                unique_sources.len() - 1
            }))
        } else {
            None
        };
        model_slots.push(slot);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("scene-loader-{index}"))
        .build()
        .context("failed to build scene loader thread pool")?;

    // 两个并行 map，collect 都保持原有顺序
    let (mesh_results, model_results) = pool.install(|| {
        let meshes: Vec<anyhow::Result<MeshData>> =
            unique_sources.par_iter().map(|source| load_mesh(source)).collect();
        let models: Vec<anyhow::Result<RawPayload>> = scene.models.par_iter().map(load_model_assets).collect();
        (meshes, models)
    });

    // 主线程串行合并，worker 之间没有共享可变状态
    let mut meshes = MeshRegistry::default();
    let mesh_keys: Vec<MeshKey> = mesh_results
        .into_iter()
        .zip(&unique_sources)
        .map(|(mesh, source)| mesh.map(|m| meshes.insert(m)).with_context(|| format!("mesh {source:?}")))
        .collect::<anyhow::Result<_>>()?;

    let models = model_results
        .into_iter()
        .zip(model_slots)
        .enumerate()
        .map(|(desc_index, (payload, slot))| {
            let payload = match payload? {
                RawPayload::Skybox { size, faces } => LoadedPayload::Skybox { size, faces },
                RawPayload::Pbr {
                    base_color,
                    metallic_roughness,
                } => LoadedPayload::Pbr {
                    mesh: mesh_keys[slot.expect("pbr model always has a mesh slot")],
                    base_color,
                    metallic_roughness,
                },
                RawPayload::Light => LoadedPayload::Light,
            };
            Ok(LoadedModel { desc_index, payload })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    log::info!("scene loaded: {} models, {} unique meshes", models.len(), meshes.len());
    Ok(LoadedScene { meshes, models })
}

fn load_model_assets(model: &ModelDesc) -> anyhow::Result<RawPayload> {
    let _span = tracy_client::span!("load_model_assets");

    let payload = match &model.kind {
        ModelKind::Skybox { faces } => load_skybox(faces).with_context(|| format!("skybox '{}'", model.name))?,
        ModelKind::Pbr { material, .. } => {
            let base_color = material
                .base_color_texture
                .as_deref()
                .map(decode_image)
                .transpose()
                .with_context(|| format!("base color texture of '{}'", model.name))?;
            let metallic_roughness = material
                .metallic_roughness_texture
                .as_deref()
                .map(decode_image)
                .transpose()
                .with_context(|| format!("metallic-roughness texture of '{}'", model.name))?;
            RawPayload::Pbr {
                base_color,
                metallic_roughness,
            }
        }
        ModelKind::Light { .. } => RawPayload::Light,
    };
    Ok(payload)
}

fn load_mesh(source: &MeshSource) -> anyhow::Result<MeshData> {
    match source {
        MeshSource::Cube { size } => Ok(MeshData::cube(*size)),
        MeshSource::Floor { size } => Ok(MeshData::floor(*size)),
        MeshSource::ObjFile { path } => load_obj_mesh(path),
    }
}

fn load_obj_mesh(path: &Path) -> anyhow::Result<MeshData> {
    let _span = tracy_client::span!("load_obj_mesh");

    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ignore_lines: true,
            ignore_points: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("failed to load OBJ file {}", path.display()))?;

    let mut mesh = MeshData::default();
    let mut missing_normals = false;
    for model in models {
        let data = model.mesh;
        let base_vertex = mesh.vertices.len() as u32;
        let vertex_count = data.positions.len() / 3;

        for i in 0..vertex_count {
            let normal = if data.normals.is_empty() {
                missing_normals = true;
                [0.0; 3]
            } else {
                [data.normals[i * 3], data.normals[i * 3 + 1], data.normals[i * 3 + 2]]
            };
            let uv = if data.texcoords.is_empty() {
                [0.0; 2]
            } else {
                [data.texcoords[i * 2], data.texcoords[i * 2 + 1]]
            };
            mesh.vertices.push(borealis_render_interface::vertex::Vertex3D {
                position: [data.positions[i * 3], data.positions[i * 3 + 1], data.positions[i * 3 + 2]],
                normal,
                uv,
            });
        }
        mesh.indices.extend(data.indices.iter().map(|index| index + base_vertex));
    }

    if mesh.vertices.is_empty() {
        bail!("OBJ file {} contains no geometry", path.display());
    }
    if missing_normals {
        log::warn!("OBJ file {} has no normals, recomputing from faces", path.display());
        mesh.recompute_normals();
    }
    Ok(mesh)
}

fn decode_image(path: &Path) -> anyhow::Result<DecodedImage> {
    let _span = tracy_client::span!("decode_image");

    let image = image::open(path).with_context(|| format!("failed to decode image {}", path.display()))?.to_rgba8();
    Ok(DecodedImage {
        width: image.width(),
        height: image.height(),
        rgba8: image.into_raw(),
    })
}

fn load_skybox(source: &SkyboxSource) -> anyhow::Result<RawPayload> {
    match source {
        SkyboxSource::Files { paths } => {
            let mut decoded = Vec::with_capacity(6);
            for path in paths {
                decoded.push(decode_image(path)?);
            }
            let size = decoded[0].width;
            for (face, image) in decoded.iter().enumerate() {
                if image.width != size || image.height != size {
                    bail!(
                        "skybox face {} is {}x{}, all faces must be {}x{} squares",
                        face,
                        image.width,
                        image.height,
                        size,
                        size
                    );
                }
            }
            let faces = std::array::from_fn(|face| std::mem::take(&mut decoded[face].rgba8));
            Ok(RawPayload::Skybox { size, faces })
        }
        SkyboxSource::Gradient { size, horizon, zenith } => Ok(RawPayload::Skybox {
            size: *size,
            faces: generate_gradient_faces(*size, *horizon, *zenith),
        }),
    }
}

/// 某个 cube map 面上 (u, v) texel 对应的方向向量（未归一化）
///
/// face 的顺序是 +X -X +Y -Y +Z -Z，u/v 取 [-1, 1]。
fn face_texel_dir(face: usize, u: f32, v: f32) -> glam::Vec3 {
    match face {
        0 => glam::vec3(1.0, -v, -u),
        1 => glam::vec3(-1.0, -v, u),
        2 => glam::vec3(u, 1.0, v),
        3 => glam::vec3(u, -1.0, -v),
        4 => glam::vec3(u, -v, 1.0),
        5 => glam::vec3(-u, -v, -1.0),
        _ => unreachable!("cube map only has 6 faces"),
    }
}

/// 生成垂直渐变的六个面：方向的仰角从 horizon 过渡到 zenith
fn generate_gradient_faces(size: u32, horizon: [f32; 3], zenith: [f32; 3]) -> [Vec<u8>; 6] {
    let horizon = glam::Vec3::from(horizon);
    let zenith = glam::Vec3::from(zenith);

    std::array::from_fn(|face| {
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                // texel 中心映射到 [-1, 1]
                let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                let dir = face_texel_dir(face, u, v).normalize();

                let t = dir.y * 0.5 + 0.5;
                let color = horizon.lerp(zenith, t);
                pixels.push((color.x.clamp(0.0, 1.0) * 255.0).round() as u8);
                pixels.push((color.y.clamp(0.0, 1.0) * 255.0).round() as u8);
                pixels.push((color.z.clamp(0.0, 1.0) * 255.0).round() as u8);
                pixels.push(255);
            }
        }
        pixels
    })
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::descriptor::{MaterialDesc, ModelDesc};

    #[test]
    fn test_worker_count_floor_is_one() {
        assert!(worker_thread_count() >= 1);
    }

    #[test]
    fn test_face_texel_dir_axes() {
        // 每个面中心的方向就是面的轴向
        assert_eq!(face_texel_dir(0, 0.0, 0.0), Vec3::X);
        assert_eq!(face_texel_dir(1, 0.0, 0.0), Vec3::NEG_X);
        assert_eq!(face_texel_dir(2, 0.0, 0.0), Vec3::Y);
        assert_eq!(face_texel_dir(3, 0.0, 0.0), Vec3::NEG_Y);
        assert_eq!(face_texel_dir(4, 0.0, 0.0), Vec3::Z);
        assert_eq!(face_texel_dir(5, 0.0, 0.0), Vec3::NEG_Z);
    }

    #[test]
    fn test_gradient_faces_follow_elevation() {
        let size = 8;
        let faces = generate_gradient_faces(size, [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
        assert!(faces.iter().all(|face| face.len() == (size * size * 4) as usize));

        // +Y 面中心看向天顶，应当是纯 zenith 色
        let up = &faces[2];
        let center = ((size / 2 * size + size / 2) * 4) as usize;
        assert!(up[center] < 32);
        assert!(up[center + 2] > 223);

        // -Y 面中心看向正下方，应当是纯 horizon 色
        let down = &faces[3];
        assert!(down[center] > 223);
        assert!(down[center + 2] < 32);
    }

    #[test]
    fn test_parallel_load_preserves_descriptor_order() {
        // tracy 的 span 要求 client 已经启动
        let _tracy = tracy_client::Client::start();

        let mut scene = SceneDesc::default();
        scene
            .add(ModelDesc::skybox(
                "sky",
                SkyboxSource::Gradient {
                    size: 4,
                    horizon: [1.0, 1.0, 1.0],
                    zenith: [0.0, 0.0, 0.0],
                },
            ))
            .add(ModelDesc::pbr("cube", MeshSource::Cube { size: 1.0 }, MaterialDesc::default(), Mat4::IDENTITY))
            .add(ModelDesc::point_light("lamp", Vec3::ONE, Vec3::ONE, 1.0, 5.0))
            .add(ModelDesc::pbr("floor", MeshSource::Floor { size: 4.0 }, MaterialDesc::default(), Mat4::IDENTITY));

        let loaded = load_scene(&scene).unwrap();
        assert_eq!(loaded.models.len(), 4);
        // 合并结果的顺序与描述顺序一致
        for (index, model) in loaded.models.iter().enumerate() {
            assert_eq!(model.desc_index, index);
        }
        assert!(matches!(loaded.models[0].payload, LoadedPayload::Skybox { size: 4, .. }));
        assert!(matches!(loaded.models[2].payload, LoadedPayload::Light));
        match &loaded.models[3].payload {
            LoadedPayload::Pbr { mesh, .. } => {
                assert_eq!(loaded.meshes.get(*mesh).unwrap().index_count(), 6);
            }
            other => panic!("expected Pbr payload, got {other:?}"),
        }
    }

    #[test]
    fn test_identical_mesh_sources_share_one_registry_entry() {
        let _tracy = tracy_client::Client::start();

        let mut scene = SceneDesc::default();
        scene
            .add(ModelDesc::pbr("cube-a", MeshSource::Cube { size: 1.0 }, MaterialDesc::default(), Mat4::IDENTITY))
            .add(ModelDesc::pbr("cube-b", MeshSource::Cube { size: 1.0 }, MaterialDesc::default(), Mat4::IDENTITY))
            .add(ModelDesc::pbr("cube-c", MeshSource::Cube { size: 2.0 }, MaterialDesc::default(), Mat4::IDENTITY))
            .add(ModelDesc::pbr("floor", MeshSource::Floor { size: 1.0 }, MaterialDesc::default(), Mat4::IDENTITY));

        let loaded = load_scene(&scene).unwrap();
        let keys: Vec<MeshKey> = loaded
            .models
            .iter()
            .map(|model| match &model.payload {
                LoadedPayload::Pbr { mesh, .. } => *mesh,
                other => panic!("expected Pbr payload, got {other:?}"),
            })
            .collect();

        // 同参数的 cube 共享一份网格，不同参数、不同形状的各占一份
        assert_eq!(keys[0], keys[1]);
        assert_ne!(keys[0], keys[2]);
        assert_ne!(keys[0], keys[3]);
        assert_eq!(loaded.meshes.len(), 3);
        assert_eq!(loaded.meshes.get(keys[0]).unwrap().index_count(), 36);
        assert_eq!(loaded.meshes.get(keys[3]).unwrap().index_count(), 6);
    }

    #[test]
    fn test_missing_obj_file_is_an_error() {
        let _tracy = tracy_client::Client::start();

        let result = load_obj_mesh(Path::new("/nonexistent/model.obj"));
        assert!(result.is_err());
    }
}
