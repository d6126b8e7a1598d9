//! PBR 展示场景
//!
//! 渐变天空盒 + 地面 + 一组 metallic / roughness 渐变的立方体，
//! 一盏方向光驱动阴影，两盏点光源，其中一盏绕场景运动。

use borealis_renderer::renderer::Renderer;
use borealis_scene::descriptor::{MaterialDesc, MeshSource, ModelDesc, SceneDesc, SkyboxSource};
use borealis_winit_app::{
    app::{SceneApp, WinitApp},
    camera::OrbitCamera,
};
use glam::{Mat4, Vec3};

struct PbrShowcase;

impl SceneApp for PbrShowcase {
    fn title(&self) -> &str {
        "Borealis - PBR Showcase"
    }

    fn scene(&self) -> SceneDesc {
        let mut scene = SceneDesc::default();

        scene.models.push(ModelDesc::skybox(
            "sky",
            SkyboxSource::Gradient {
                size: 256,
                horizon: [0.55, 0.65, 0.85],
                zenith: [0.05, 0.12, 0.35],
            },
        ));
        scene.models.push(ModelDesc::directional_light(
            "sun",
            Vec3::new(-0.6, -1.0, -0.4),
            Vec3::new(1.0, 0.96, 0.88),
            3.0,
        ));

        scene.models.push(ModelDesc::pbr(
            "floor",
            MeshSource::Floor { size: 24.0 },
            MaterialDesc {
                base_color_factor: [0.8, 0.8, 0.82, 1.0],
                metallic: 0.0,
                roughness: 0.9,
                ..MaterialDesc::default()
            },
            Mat4::IDENTITY,
        ));

        // 5x2 的立方体阵列：一行非金属，一行金属，粗糙度从左到右递增
        for row in 0..2 {
            for col in 0..5 {
                scene.models.push(ModelDesc::pbr(
                    format!("cube-m{row}-r{col}"),
                    MeshSource::Cube { size: 1.6 },
                    MaterialDesc {
                        base_color_factor: [0.9, 0.25, 0.2, 1.0],
                        metallic: row as f32,
                        roughness: (col as f32 / 4.0).max(0.05),
                        ..MaterialDesc::default()
                    },
                    Mat4::from_translation(Vec3::new(col as f32 * 2.4 - 4.8, 1.0, row as f32 * 2.4 - 1.2)),
                ));
            }
        }

        scene.models.push(ModelDesc::point_light(
            "orbit-light",
            Vec3::new(5.0, 3.0, 0.0),
            Vec3::new(1.0, 0.7, 0.3),
            6.0,
            18.0,
        ));
        scene.models.push(ModelDesc::point_light(
            "fill-light",
            Vec3::new(-5.0, 2.0, 4.0),
            Vec3::new(0.3, 0.5, 1.0),
            4.0,
            15.0,
        ));

        scene
    }

    fn initial_camera(&self) -> OrbitCamera {
        OrbitCamera {
            distance: 14.0,
            pitch_deg: 18.0,
            ..OrbitCamera::default()
        }
    }

    fn update(&mut self, renderer: &mut Renderer, elapsed: f32) {
        // 暖色点光源绕场景中心运动，shadow 之外的光照变化全靠它展示
        let angle = elapsed * 0.6;
        let position = Vec3::new(angle.cos() * 5.0, 3.0 + (elapsed * 1.3).sin(), angle.sin() * 5.0);
        for model in renderer.models_mut() {
            if model.name() == "orbit-light" {
                model.set_transform(Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(0.2)));
            }
        }
    }
}

fn main() {
    WinitApp::run(Box::new(PbrShowcase));
}
