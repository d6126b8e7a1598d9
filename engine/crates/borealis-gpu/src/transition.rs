//! image layout 转换的唯一入口
//!
//! 所有 render pass 之外的 layout 转换（上传、mip chain、IBL 拷贝）都从这张表
//! 查询 stage/access mask，不允许各处手写。表中没有的转换直接 panic。

use ash::vk;

use crate::commands::{barrier::GpuBarrierMask, barrier::GpuImageBarrier, command_buffer::GpuCommandBuffer};

/// 查询 (old_layout, new_layout) 的 barrier mask
///
/// # Panic
/// 当这对转换没有登记在表中时 panic，并附带转换对的名称
pub fn barrier_mask(old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> GpuBarrierMask {
    use vk::ImageLayout as L;
    use vk::{AccessFlags2 as A, PipelineStageFlags2 as S};

    match (old_layout, new_layout) {
        // 上传、cube 组装、prefilter 整体的起点
        (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => GpuBarrierMask {
            src_stage: S::TOP_OF_PIPE,
            src_access: A::empty(),
            dst_stage: S::TRANSFER,
            dst_access: A::TRANSFER_WRITE,
        },
        // 离屏渲染目标的初始状态
        (L::UNDEFINED, L::COLOR_ATTACHMENT_OPTIMAL) => GpuBarrierMask {
            src_stage: S::TOP_OF_PIPE,
            src_access: A::empty(),
            dst_stage: S::COLOR_ATTACHMENT_OUTPUT,
            dst_access: A::COLOR_ATTACHMENT_WRITE,
        },
        // 上传/拷贝完成，交给 fragment shader 采样
        (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => GpuBarrierMask {
            src_stage: S::TRANSFER,
            src_access: A::TRANSFER_WRITE,
            dst_stage: S::FRAGMENT_SHADER,
            dst_access: A::SHADER_READ,
        },
        // mip chain：level i 写完之后作为 level i+1 的 blit 源
        (L::TRANSFER_DST_OPTIMAL, L::TRANSFER_SRC_OPTIMAL) => GpuBarrierMask {
            src_stage: S::TRANSFER,
            src_access: A::TRANSFER_WRITE,
            dst_stage: S::TRANSFER,
            dst_access: A::TRANSFER_READ,
        },
        // mip chain 结束后，所有 src level 一起交给 shader
        (L::TRANSFER_SRC_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => GpuBarrierMask {
            src_stage: S::TRANSFER,
            src_access: A::TRANSFER_READ,
            dst_stage: S::FRAGMENT_SHADER,
            dst_access: A::SHADER_READ,
        },
        // 离屏渲染完成，作为拷贝源
        (L::COLOR_ATTACHMENT_OPTIMAL, L::TRANSFER_SRC_OPTIMAL) => GpuBarrierMask {
            src_stage: S::COLOR_ATTACHMENT_OUTPUT,
            src_access: A::COLOR_ATTACHMENT_WRITE,
            dst_stage: S::TRANSFER,
            dst_access: A::TRANSFER_READ,
        },
        // 拷贝完成，离屏目标回到可渲染状态
        (L::TRANSFER_SRC_OPTIMAL, L::COLOR_ATTACHMENT_OPTIMAL) => GpuBarrierMask {
            src_stage: S::TRANSFER,
            src_access: A::TRANSFER_READ,
            dst_stage: S::COLOR_ATTACHMENT_OUTPUT,
            dst_access: A::COLOR_ATTACHMENT_WRITE,
        },
        _ => panic!("no barrier mask registered for layout transition {:?} -> {:?}", old_layout, new_layout),
    }
}

/// 用表中的 mask 构造 image barrier
pub fn transition_barrier(
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    aspect_mask: vk::ImageAspectFlags,
    mip_range: (u32, u32),
    layer_range: (u32, u32),
) -> GpuImageBarrier {
    GpuImageBarrier::new()
        .image(image)
        .layout_transfer(old_layout, new_layout)
        .mask(barrier_mask(old_layout, new_layout))
        .image_aspect_flag(aspect_mask)
        .mip_range(mip_range.0, mip_range.1)
        .layer_range(layer_range.0, layer_range.1)
}

/// 录制一个表驱动的 layout 转换
pub fn cmd_transition_image(
    cmd: &GpuCommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
    aspect_mask: vk::ImageAspectFlags,
    mip_range: (u32, u32),
    layer_range: (u32, u32),
) {
    let barrier = transition_barrier(image, old_layout, new_layout, aspect_mask, mip_range, layer_range);
    cmd.image_memory_barrier(vk::DependencyFlags::empty(), std::slice::from_ref(&barrier));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 引擎会请求的所有转换对
    const ENGINE_TRANSITIONS: [(vk::ImageLayout, vk::ImageLayout); 7] = [
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
        (vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        (vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
        (vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
    ];

    #[test]
    fn test_table_covers_engine_transitions() {
        for (old, new) in ENGINE_TRANSITIONS {
            let mask = barrier_mask(old, new);
            assert!(!mask.dst_stage.is_empty(), "{:?} -> {:?} has empty dst stage", old, new);
            // UNDEFINED 起始的转换没有需要等待的写入
            if old == vk::ImageLayout::UNDEFINED {
                assert!(mask.src_access.is_empty());
            } else {
                assert!(!mask.src_stage.is_empty(), "{:?} -> {:?} has empty src stage", old, new);
            }
        }
    }

    #[test]
    fn test_upload_transition_targets_fragment_shader() {
        let mask = barrier_mask(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(mask.src_stage, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(mask.src_access, vk::AccessFlags2::TRANSFER_WRITE);
        assert_eq!(mask.dst_stage, vk::PipelineStageFlags2::FRAGMENT_SHADER);
        assert_eq!(mask.dst_access, vk::AccessFlags2::SHADER_READ);
    }

    #[test]
    fn test_mip_chain_transition_stays_on_transfer() {
        let mask = barrier_mask(vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        assert_eq!(mask.src_stage, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(mask.dst_stage, vk::PipelineStageFlags2::TRANSFER);
        assert_eq!(mask.dst_access, vk::AccessFlags2::TRANSFER_READ);
    }

    #[test]
    fn test_offscreen_copy_round_trip_is_symmetric() {
        let to_src = barrier_mask(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        let back = barrier_mask(vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(to_src.src_stage, back.dst_stage);
        assert_eq!(to_src.src_access, back.dst_access);
        assert_eq!(to_src.dst_stage, back.src_stage);
        assert_eq!(to_src.dst_access, back.src_access);
    }

    #[test]
    #[should_panic(expected = "no barrier mask registered")]
    fn test_unregistered_transition_panics() {
        barrier_mask(vk::ImageLayout::GENERAL, vk::ImageLayout::GENERAL);
    }
}
