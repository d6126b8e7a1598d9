//! 渲染器对外入口
//!
//! [`Renderer::new`] 按固定顺序完成初始化：场景校验 → GPU 上下文与
//! swapchain → 并行加载资源并上传 → IBL 预计算（阻塞）→ 各 pass 与
//! pipeline → binding set → 帧资源。PBR 的 binding set 依赖
//! [`IblMaps`] 的引用，预计算没完成就建不出来。
//!
//! 每帧由四个操作组成，必须按顺序调用：
//! [`Renderer::acquire_frame`] → [`Renderer::record_frame`] →
//! [`Renderer::submit_frame`] → [`Renderer::present_frame`]；
//! [`Renderer::render_frame`] 是四个操作的串联。

use std::rc::Rc;

use ash::vk;
use borealis_gpu::{
    commands::submit_info::GpuSubmitInfo,
    context::GpuContext,
    descriptors::descriptor_pool::{GpuDescriptorPool, GpuDescriptorPoolCreateInfo},
    swapchain::render_swapchain::GpuSwapchain,
};
use borealis_render_interface::{
    config::{DescriptorPoolSizing, RenderConfig},
    frame_counter::FrameCounter,
    uniforms::{DirLightGpu, PerFrameUbo},
};
use borealis_scene::{
    descriptor::SceneDesc,
    loader::{LoadedScene, load_scene},
    validate::validate_scene,
};
use glam::{Mat4, Vec3};
use itertools::Itertools;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::{
    frame_slots::FrameSlots,
    frame_uniforms::{FrameUniforms, light_space_matrix, pack_point_lights},
    models::{RenderModel, SharedBindings},
    passes::{
        overlay_pass::{OverlayFrameData, OverlayPass},
        scene_pass::ScenePass,
        shadow_pass::ShadowPass,
    },
    precompute::IblMaps,
    registry::PipelineRegistry,
};

/// 创建渲染器所需的窗口侧信息
pub struct RendererCreateInfo<'a> {
    pub app_name: &'a str,
    pub display_handle: RawDisplayHandle,
    pub window_handle: RawWindowHandle,
    /// 窗口的物理像素尺寸
    pub window_extent: vk::Extent2D,
    /// overlay 的字体图集，RGBA8
    pub overlay_atlas_size: (u32, u32),
    pub overlay_atlas_rgba8: &'a [u8],
}

/// 外部每帧提供的输入
pub struct FrameInputs<'a> {
    pub camera_pos: Vec3,
    pub view: Mat4,
    /// 投影矩阵，Y 翻转由调用方完成
    pub proj: Mat4,
    /// 本帧的 UI 几何，None 表示没有 UI
    pub overlay: Option<&'a OverlayFrameData>,
}

pub struct Renderer {
    frame_counter: FrameCounter,
    frame_slots: FrameSlots,
    frame_uniforms: FrameUniforms,

    /// 所有 binding set 都从这个 pool 分配，set 随 pool 一起释放
    _descriptor_pool: GpuDescriptorPool,

    registry: PipelineRegistry,
    models: Vec<RenderModel>,
    _ibl: IblMaps,

    overlay_pass: OverlayPass,
    scene_pass: ScenePass,
    shadow_pass: ShadowPass,
    swapchain: GpuSwapchain,

    dir_light: DirLightGpu,
    shadow_center: Vec3,
    shadow_radius: f32,

    config: RenderConfig,

    // 声明在最后，所有 GPU 资源销毁之后才轮到它
    ctx: GpuContext,
}

// new & init
impl Renderer {
    pub fn new(create_info: &RendererCreateInfo, scene: &SceneDesc, config: RenderConfig) -> anyhow::Result<Self> {
        let _span = tracy_client::span!("Renderer::new");

        validate_scene(scene)?;

        let ctx = GpuContext::new(
            create_info.app_name,
            create_info.display_handle,
            create_info.window_handle,
            config.enable_validation,
        );
        let swapchain = GpuSwapchain::new(
            &ctx,
            create_info.window_extent,
            config.preferred_surface_format,
            config.preferred_present_mode,
        );

        // 资源解码在线程池里并行完成，上传保持场景顺序；
        // 共享的网格在 registry 里只有一份，按 key 取用
        let LoadedScene {
            meshes,
            models: loaded_models,
        } = load_scene(scene)?;
        let mut models = loaded_models
            .into_iter()
            .map(|loaded| {
                let desc = &scene.models[loaded.desc_index];
                RenderModel::upload(&ctx, &config, desc, loaded, &meshes)
            })
            .collect_vec();

        // IBL 预计算，每一步都同步等待；在此之后天空盒的环境贴图
        // 才能以 lut / prefiltered / irradiance 的形态被 PBR 引用
        let ibl = {
            let env_map = models.iter().find_map(RenderModel::env_map).expect("validated scene must have a skybox");
            IblMaps::bake(&ctx, &config, env_map)
        };

        let mut shadow_pass = ShadowPass::new(&ctx, &config);
        let scene_pass = ScenePass::new(&ctx, &swapchain);
        let mut overlay_pass = OverlayPass::new(
            &ctx,
            &config,
            &swapchain,
            create_info.overlay_atlas_size,
            create_info.overlay_atlas_rgba8,
        );
        let registry = PipelineRegistry::new(&ctx, &config, &shadow_pass, &scene_pass, &overlay_pass, &models);

        let frame_uniforms = FrameUniforms::new(&ctx, &config);

        let sizing = DescriptorPoolSizing::conservative(&scene.counts(), &config);
        let pool_ci =
            GpuDescriptorPoolCreateInfo::new(vk::DescriptorPoolCreateFlags::empty(), sizing.max_sets, sizing.pool_sizes());
        let descriptor_pool = GpuDescriptorPool::new(ctx.device().clone(), Rc::new(pool_ci), "renderer");

        {
            let shared = SharedBindings {
                frame_uniforms: &frame_uniforms,
                shadow_map: shadow_pass.map(),
                ibl: &ibl,
                frames_in_flight: config.frames_in_flight,
            };
            for model in &mut models {
                model.create_binding_sets(&ctx, &descriptor_pool, &registry, &shared);
            }
        }
        shadow_pass.create_binding_sets(
            &ctx,
            &descriptor_pool,
            registry.shadow_layout(),
            &frame_uniforms,
            config.frames_in_flight,
        );
        overlay_pass.create_binding_set(&ctx, &descriptor_pool, registry.overlay_layout());

        let frame_slots = FrameSlots::new(&ctx, &config);
        let frame_counter = FrameCounter::new(config.frames_in_flight);

        let (direction, color, intensity) =
            scene.directional_light().expect("validated scene must have a directional light");
        let dir_light = DirLightGpu {
            direction: direction.normalize().extend(0.0),
            color: color.extend(intensity),
        };
        let (shadow_center, shadow_radius) = shadow_bounds(scene);

        log::info!(
            "renderer ready: {} models, {} frames in flight, swapchain {}x{}",
            models.len(),
            config.frames_in_flight,
            swapchain.extent().width,
            swapchain.extent().height,
        );

        Ok(Self {
            frame_counter,
            frame_slots,
            frame_uniforms,
            _descriptor_pool: descriptor_pool,
            registry,
            models,
            _ibl: ibl,
            overlay_pass,
            scene_pass,
            shadow_pass,
            swapchain,
            dir_light,
            shadow_center,
            shadow_radius,
            config,
            ctx,
        })
    }
}

// getters
impl Renderer {
    #[inline]
    pub fn swapchain_extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }

    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_counter.frame_id()
    }

    #[inline]
    pub fn models(&self) -> &[RenderModel] {
        &self.models
    }

    /// 运行期修改模型（transform / hidden），下一帧生效
    #[inline]
    pub fn models_mut(&mut self) -> &mut [RenderModel] {
        &mut self.models
    }
}

// render
impl Renderer {
    /// 等待当前 slot 的 fence，然后向 swapchain 要一张 image
    ///
    /// 返回 true 表示 swapchain 已过期，本帧跳过，调用方应在拿到新的
    /// 窗口尺寸后调用 [`Self::resize`]。此时 fence 保持 signaled，
    /// 下一次 acquire 的等待可以直接通过。
    pub fn acquire_frame(&mut self) -> bool {
        let _span = tracy_client::span!("acquire_frame");

        let slot = self.frame_slots.slot(self.frame_counter.frame_label());
        slot.wait();

        if self.swapchain.acquire_next_image(Some(slot.image_available_semaphore()), None, u64::MAX) {
            return true;
        }
        // acquire 成功后才复位 fence 和 command pool
        slot.reset_for_recording();
        false
    }

    /// 录制当前 slot 的三个 pass，并写入本帧的 uniform
    pub fn record_frame(&mut self, inputs: &FrameInputs) {
        let _span = tracy_client::span!("record_frame");

        let label = self.frame_counter.frame_label();
        let image_index = self.swapchain.current_image_index();

        // 点光源每帧重新收集；隐藏的光源不画 gizmo，但照常参与光照
        let point_lights = self.models.iter().filter_map(RenderModel::point_light).collect_vec();
        let (point_lights, point_light_count) = pack_point_lights(&point_lights);

        let light_space = light_space_matrix(self.dir_light.direction.truncate(), self.shadow_center, self.shadow_radius);
        self.frame_uniforms.write(
            label,
            &PerFrameUbo {
                view: inputs.view,
                proj: inputs.proj,
                light_space,
                camera_pos: inputs.camera_pos.extend(1.0),
                dir_light: self.dir_light,
                point_lights,
                counts: [point_light_count, 0, 0, 0],
            },
        );
        for model in &self.models {
            model.update_ubo(label);
        }

        let slot = self.frame_slots.slot(label);
        self.shadow_pass.record(slot.shadow_cmd(), label, &self.registry, &self.models, &self.config);
        self.scene_pass.record(slot.scene_cmd(), label, image_index, &self.registry, &self.models, &self.config);
        self.overlay_pass.record(slot.overlay_cmd(), label, image_index, &self.registry, inputs.overlay);
    }

    /// 把三个 pass 作为一个 batch 提交到 graphics queue
    ///
    /// batch 在 COLOR_ATTACHMENT_OUTPUT 处等 image-available，
    /// 完成时 signal render-finished，fence 跟整个 batch 走。
    pub fn submit_frame(&mut self) {
        let _span = tracy_client::span!("submit_frame");

        let slot = self.frame_slots.slot(self.frame_counter.frame_label());
        let batch = GpuSubmitInfo::new(&[
            slot.shadow_cmd().clone(),
            slot.scene_cmd().clone(),
            slot.overlay_cmd().clone(),
        ])
        .wait(slot.image_available_semaphore(), vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT)
        .signal(slot.render_finished_semaphore(), vk::PipelineStageFlags2::ALL_COMMANDS);

        self.ctx.graphics_queue().submit(&[batch], Some(slot.in_flight_fence()));
    }

    /// present 当前 image，并把帧计数推进到下一个 slot
    ///
    /// 返回 true 表示 swapchain 需要重建
    pub fn present_frame(&mut self) -> bool {
        let _span = tracy_client::span!("present_frame");

        let slot = self.frame_slots.slot(self.frame_counter.frame_label());
        let need_rebuild = self.swapchain.present_image(self.ctx.graphics_queue(), &[slot.render_finished_semaphore()]);

        self.frame_counter.next_frame();
        tracy_client::frame_mark();
        need_rebuild
    }

    /// 一帧的完整流程；返回 true 表示 swapchain 需要重建
    pub fn render_frame(&mut self, inputs: &FrameInputs) -> bool {
        if self.acquire_frame() {
            return true;
        }
        self.record_frame(inputs);
        self.submit_frame();
        self.present_frame()
    }

    /// 窗口尺寸变化后重建 swapchain 以及依赖其 image 的 framebuffer
    ///
    /// pipeline 和 binding set 与窗口尺寸无关，不需要动。
    pub fn resize(&mut self, extent: vk::Extent2D) {
        // 最小化时宽高为 0，等下一个有效尺寸
        if extent.width == 0 || extent.height == 0 {
            return;
        }

        // rebuild 内部会 wait idle
        self.swapchain.rebuild(extent);
        self.scene_pass.rebuild(&self.ctx, &self.swapchain);
        self.overlay_pass.rebuild(&self.ctx, &self.swapchain);
        log::info!("renderer resized to {}x{}", extent.width, extent.height);
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        // in-flight 的帧还在引用即将销毁的资源
        self.ctx.wait_idle();
        log::info!("destroying renderer");
    }
}

/// 根据模型的位移估算方向光 shadow map 的包围球
///
/// 中心取原点，半径取位移模长的最大值加余量，带下限，
/// 保证小场景的正交盒不会退化。
fn shadow_bounds(scene: &SceneDesc) -> (Vec3, f32) {
    let mut reach: f32 = 0.0;
    for model in &scene.models {
        reach = reach.max(model.transform.w_axis.truncate().length());
    }
    (Vec3::ZERO, (reach + 5.0).max(10.0))
}

#[cfg(test)]
mod tests {
    use borealis_scene::descriptor::{MaterialDesc, MeshSource, ModelDesc};

    use super::*;

    #[test]
    fn test_shadow_bounds_has_minimum_radius() {
        let scene = SceneDesc::default();
        let (center, radius) = shadow_bounds(&scene);
        assert_eq!(center, Vec3::ZERO);
        assert_eq!(radius, 10.0);
    }

    #[test]
    fn test_shadow_bounds_follows_farthest_model() {
        let mut scene = SceneDesc::default();
        scene.models.push(ModelDesc::pbr(
            "near",
            MeshSource::Cube { size: 1.0 },
            MaterialDesc::default(),
            Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0)),
        ));
        scene.models.push(ModelDesc::pbr(
            "far",
            MeshSource::Cube { size: 1.0 },
            MaterialDesc::default(),
            Mat4::from_translation(Vec3::new(0.0, 0.0, 30.0)),
        ));

        let (_, radius) = shadow_bounds(&scene);
        assert_eq!(radius, 35.0);
    }
}
