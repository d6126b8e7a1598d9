//! 场景合法性校验，在任何 GPU 对象创建之前执行

use anyhow::bail;

use crate::descriptor::{LightDesc, ModelKind, SceneDesc};

/// 校验场景描述
///
/// 规则：恰好一个 skybox，恰好一个方向光。违反即启动失败。
pub fn validate_scene(scene: &SceneDesc) -> anyhow::Result<()> {
    let counts = scene.counts();
    if counts.skyboxes != 1 {
        bail!("scene must contain exactly one skybox, found {}", counts.skyboxes);
    }

    let dir_lights = scene
        .models
        .iter()
        .filter(|model| {
            matches!(
                &model.kind,
                ModelKind::Light {
                    light: LightDesc::Directional { .. }
                }
            )
        })
        .count();
    if dir_lights != 1 {
        bail!("scene must contain exactly one directional light, found {dir_lights}");
    }

    if counts.pbr_models == 0 {
        log::warn!("scene has no PBR models, only the skybox will be visible");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;
    use crate::descriptor::{MaterialDesc, MeshSource, ModelDesc, SkyboxSource};

    fn gradient_sky() -> ModelDesc {
        ModelDesc::skybox(
            "sky",
            SkyboxSource::Gradient {
                size: 16,
                horizon: [1.0, 1.0, 1.0],
                zenith: [0.0, 0.0, 1.0],
            },
        )
    }

    #[test]
    fn test_missing_skybox_rejected() {
        let mut scene = SceneDesc::default();
        scene.add(ModelDesc::directional_light("sun", Vec3::NEG_Y, Vec3::ONE, 1.0));

        let err = validate_scene(&scene).unwrap_err();
        assert!(err.to_string().contains("exactly one skybox"));
    }

    #[test]
    fn test_two_directional_lights_rejected() {
        let mut scene = SceneDesc::default();
        scene
            .add(gradient_sky())
            .add(ModelDesc::directional_light("sun", Vec3::NEG_Y, Vec3::ONE, 1.0))
            .add(ModelDesc::directional_light("moon", Vec3::NEG_X, Vec3::ONE, 0.2));

        let err = validate_scene(&scene).unwrap_err();
        assert!(err.to_string().contains("exactly one directional light"));
    }

    #[test]
    fn test_valid_trio_accepted() {
        let mut scene = SceneDesc::default();
        scene
            .add(gradient_sky())
            .add(ModelDesc::directional_light("sun", Vec3::new(-1.0, -3.0, -1.0), Vec3::ONE, 2.0))
            .add(ModelDesc::pbr("cube", MeshSource::Cube { size: 1.0 }, MaterialDesc::default(), Mat4::IDENTITY));

        assert!(validate_scene(&scene).is_ok());
    }

    #[test]
    fn test_two_skyboxes_rejected() {
        let mut scene = SceneDesc::default();
        scene
            .add(gradient_sky())
            .add(gradient_sky())
            .add(ModelDesc::directional_light("sun", Vec3::NEG_Y, Vec3::ONE, 1.0));

        assert!(validate_scene(&scene).is_err());
    }
}
