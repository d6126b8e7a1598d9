use ash::vk;
use itertools::Itertools;

use crate::commands::{command_buffer::GpuCommandBuffer, semaphore::GpuSemaphore};

/// 关于 submitInfo 的封装，更易用
#[derive(Default)]
pub struct GpuSubmitInfo {
    command_buffer_infos: Vec<vk::CommandBufferSubmitInfo<'static>>,
    wait_infos: Vec<vk::SemaphoreSubmitInfo<'static>>,
    signal_infos: Vec<vk::SemaphoreSubmitInfo<'static>>,
}

impl GpuSubmitInfo {
    pub fn new(commands: &[GpuCommandBuffer]) -> Self {
        let command_buffer_infos = commands
            .iter()
            .map(|cmd| vk::CommandBufferSubmitInfo::default().command_buffer(cmd.handle()))
            .collect_vec();

        Self {
            command_buffer_infos,
            wait_infos: vec![],
            signal_infos: vec![],
        }
    }

    /// 借用内部的 Vec 生成 vk::SubmitInfo2，在 self 存活期间有效
    #[inline]
    pub fn submit_info(&self) -> vk::SubmitInfo2<'_> {
        vk::SubmitInfo2::default()
            .command_buffer_infos(&self.command_buffer_infos)
            .wait_semaphore_infos(&self.wait_infos)
            .signal_semaphore_infos(&self.signal_infos)
    }

    /// builder
    #[inline]
    pub fn wait(mut self, semaphore: &GpuSemaphore, stage: vk::PipelineStageFlags2) -> Self {
        self.wait_infos.push(vk::SemaphoreSubmitInfo::default().semaphore(semaphore.handle()).stage_mask(stage));
        self
    }

    /// builder
    #[inline]
    pub fn signal(mut self, semaphore: &GpuSemaphore, stage: vk::PipelineStageFlags2) -> Self {
        self.signal_infos.push(vk::SemaphoreSubmitInfo::default().semaphore(semaphore.handle()).stage_mask(stage));
        self
    }
}
