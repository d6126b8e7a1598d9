//! Frames in Flight 的每 slot 资源
//!
//! 每个 slot 拥有独立的 command pool、三个 pass 的 command buffer、
//! 一个 in-flight fence 和一对 semaphore。CPU 想复用某个 slot 时，
//! 必须先通过 [`FrameSlot::wait`] 把 fence 等下来，
//! 这是整个帧编排里唯一的 CPU/GPU 同步点。

use std::rc::Rc;

use ash::vk;
use borealis_gpu::{
    commands::{
        command_buffer::GpuCommandBuffer,
        command_pool::GpuCommandPool,
        fence::GpuFence,
        semaphore::GpuSemaphore,
    },
    context::GpuContext,
};
use borealis_render_interface::{config::RenderConfig, frame_counter::FrameLabel};

/// 单个 in-flight slot 的全部资源
pub struct FrameSlot {
    command_pool: Rc<GpuCommandPool>,

    shadow_cmd: GpuCommandBuffer,
    scene_cmd: GpuCommandBuffer,
    overlay_cmd: GpuCommandBuffer,

    /// 上一次使用该 slot 的提交是否执行完毕；创建时 signaled，
    /// 第一帧的等待可以直接通过
    in_flight: GpuFence,
    /// swapchain image 可用时 signal，提交在 COLOR_ATTACHMENT_OUTPUT 处等它
    image_available: GpuSemaphore,
    /// 提交完成时 signal，present 等它
    render_finished: GpuSemaphore,
}

// new & init
impl FrameSlot {
    fn new(ctx: &GpuContext, label: FrameLabel) -> Self {
        let device = ctx.device();
        let command_pool = Rc::new(GpuCommandPool::new(
            device.clone(),
            ctx.graphics_queue().queue_family_index(),
            vk::CommandPoolCreateFlags::TRANSIENT,
            &format!("frame-{label}"),
        ));

        Self {
            shadow_cmd: GpuCommandBuffer::new(device.clone(), command_pool.clone(), &format!("shadow-pass[{label}]")),
            scene_cmd: GpuCommandBuffer::new(device.clone(), command_pool.clone(), &format!("scene-pass[{label}]")),
            overlay_cmd: GpuCommandBuffer::new(device.clone(), command_pool.clone(), &format!("overlay-pass[{label}]")),
            in_flight: GpuFence::new(device.clone(), true, &format!("in-flight[{label}]")),
            image_available: GpuSemaphore::new(device.clone(), &format!("image-available[{label}]")),
            render_finished: GpuSemaphore::new(device.clone(), &format!("render-finished[{label}]")),
            command_pool,
        }
    }
}

// getters
impl FrameSlot {
    #[inline]
    pub fn shadow_cmd(&self) -> &GpuCommandBuffer {
        &self.shadow_cmd
    }

    #[inline]
    pub fn scene_cmd(&self) -> &GpuCommandBuffer {
        &self.scene_cmd
    }

    #[inline]
    pub fn overlay_cmd(&self) -> &GpuCommandBuffer {
        &self.overlay_cmd
    }

    #[inline]
    pub fn in_flight_fence(&self) -> &GpuFence {
        &self.in_flight
    }

    #[inline]
    pub fn image_available_semaphore(&self) -> &GpuSemaphore {
        &self.image_available
    }

    #[inline]
    pub fn render_finished_semaphore(&self) -> &GpuSemaphore {
        &self.render_finished
    }
}

// tools
impl FrameSlot {
    /// 等待该 slot 上一次的提交完成
    ///
    /// fence 过了之后，slot 的 command buffer、UBO 区间和 binding set
    /// 才允许被 CPU 改写。
    pub fn wait(&self) {
        self.in_flight.wait();
    }

    /// 把 fence 和 command pool 复位到可录制状态
    ///
    /// 必须在 acquire 成功之后才调用：acquire 失败时 fence 保持
    /// signaled，下一次 [`Self::wait`] 才不会死等。
    pub fn reset_for_recording(&self) {
        self.in_flight.reset();
        // pool 级别的 reset，一次复位三个 pass 的 command buffer
        self.command_pool.reset_all_buffers();
    }
}

/// 所有 in-flight slot
pub struct FrameSlots {
    slots: Vec<FrameSlot>,
}

// new & init
impl FrameSlots {
    pub fn new(ctx: &GpuContext, config: &RenderConfig) -> Self {
        let slots = (0..config.frames_in_flight).map(|i| FrameSlot::new(ctx, FrameLabel::from_usize(i))).collect();
        Self { slots }
    }
}

// getters
impl FrameSlots {
    #[inline]
    pub fn slot(&self, label: FrameLabel) -> &FrameSlot {
        &self.slots[*label]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
