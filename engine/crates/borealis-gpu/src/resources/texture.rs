use ash::vk;

use crate::{
    context::GpuContext,
    resources::{
        buffer::GpuBuffer,
        image::{GpuImage, GpuImageCreateInfo},
        image_view::{GpuImageView, GpuImageViewDesc},
        sampler::{GpuSampler, GpuSamplerCreateInfo},
    },
    transition,
};

/// 计算指定 Vulkan 格式下每个像素需要的字节数
///
/// # Panic
/// 当遇到不支持的格式时会 panic
pub fn pixel_size_in_bytes(format: vk::Format) -> usize {
    match format {
        vk::Format::R8G8B8A8_UNORM | vk::Format::R8G8B8A8_SRGB | vk::Format::B8G8R8A8_UNORM => 4,
        vk::Format::R32G32_SFLOAT => 8,
        vk::Format::R16G16B16A16_SFLOAT => 8,
        _ => panic!("unsupported format: {:?}", format),
    }
}

/// 完整 mip chain 的级数：floor(log2(max(w, h))) + 1
pub fn full_mip_levels(width: u32, height: u32) -> u32 {
    32 - u32::max(width, height).max(1).leading_zeros()
}

/// image + view + sampler 的组合，大多数绑定用的就是这个
pub struct GpuTexture {
    image: GpuImage,
    image_view: GpuImageView,
    sampler: GpuSampler,
}

// new & init
impl GpuTexture {
    /// 由外部准备好的三件套组装，IBL 预计算的输出走这里
    #[inline]
    pub fn from_parts(image: GpuImage, image_view: GpuImageView, sampler: GpuSampler) -> Self {
        Self {
            image,
            image_view,
            sampler,
        }
    }

    /// 根据 RGBA8_UNORM 的 data 创建单 mip 的 texture
    pub fn from_rgba8(ctx: &GpuContext, width: u32, height: u32, data: &[u8], name: impl AsRef<str>) -> Self {
        Self::from_raw_pixels(
            ctx,
            width,
            height,
            vk::Format::R8G8B8A8_UNORM,
            data,
            GpuSamplerCreateInfo::new_material(1).into(),
            name,
        )
    }

    /// 根据 raw pixel data 创建单 mip 的 texture
    pub fn from_raw_pixels(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        format: vk::Format,
        data: &[u8],
        sampler_ci: std::rc::Rc<GpuSamplerCreateInfo>,
        name: impl AsRef<str>,
    ) -> Self {
        let name = name.as_ref();
        assert_eq!(data.len(), pixel_size_in_bytes(format) * (width * height) as usize);

        let image_ci = GpuImageCreateInfo::new_image_2d_info(
            vk::Extent2D { width, height },
            format,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        );
        let image = GpuImage::new(ctx, &image_ci, &GpuImage::device_local_alloc_info(), name);

        let stage_buffer = GpuBuffer::new_stage_buffer(ctx, data.len() as vk::DeviceSize, format!("{name}-stage"));
        stage_buffer.transfer_data_by_mmap(data);

        ctx.one_time_exec(
            |cmd| {
                transition::cmd_transition_image(
                    cmd,
                    image.handle(),
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageAspectFlags::COLOR,
                    (0, 1),
                    (0, 1),
                );

                cmd.cmd_copy_buffer_to_image(
                    &vk::CopyBufferToImageInfo2::default()
                        .src_buffer(stage_buffer.handle())
                        .dst_image(image.handle())
                        .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .regions(std::slice::from_ref(&Self::whole_image_copy(width, height, 0, 0))),
                );

                transition::cmd_transition_image(
                    cmd,
                    image.handle(),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    vk::ImageAspectFlags::COLOR,
                    (0, 1),
                    (0, 1),
                );
            },
            name,
        );

        let image_view = GpuImageView::new(
            ctx.device().clone(),
            image.handle(),
            GpuImageViewDesc::new_2d(format, vk::ImageAspectFlags::COLOR),
            name,
        );
        let sampler = GpuSampler::new(ctx.device().clone(), sampler_ci, name);

        Self {
            image,
            image_view,
            sampler,
        }
    }

    /// 根据 RGBA8 data 创建带完整 mip chain 的 texture
    ///
    /// mip 0 走 staged 上传，之后逐级 blit 生成，转换全部由 transition 表驱动
    pub fn from_rgba8_mipmapped(ctx: &GpuContext, width: u32, height: u32, data: &[u8], name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let format = vk::Format::R8G8B8A8_UNORM;
        assert_eq!(data.len(), pixel_size_in_bytes(format) * (width * height) as usize);

        let mip_levels = full_mip_levels(width, height);
        let image_ci = GpuImageCreateInfo::new_image_2d_info(
            vk::Extent2D { width, height },
            format,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::SAMPLED,
        )
        .mip_levels(mip_levels);
        let image = GpuImage::new(ctx, &image_ci, &GpuImage::device_local_alloc_info(), name);

        let stage_buffer = GpuBuffer::new_stage_buffer(ctx, data.len() as vk::DeviceSize, format!("{name}-stage"));
        stage_buffer.transfer_data_by_mmap(data);

        ctx.one_time_exec(
            |cmd| {
                // 所有 mip level 一起进入 TRANSFER_DST
                transition::cmd_transition_image(
                    cmd,
                    image.handle(),
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageAspectFlags::COLOR,
                    (0, mip_levels),
                    (0, 1),
                );

                cmd.cmd_copy_buffer_to_image(
                    &vk::CopyBufferToImageInfo2::default()
                        .src_buffer(stage_buffer.handle())
                        .dst_image(image.handle())
                        .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .regions(std::slice::from_ref(&Self::whole_image_copy(width, height, 0, 0))),
                );

                // 逐级 blit：level i-1 转为 SRC，再 blit 到 level i
                let mut mip_width = width;
                let mut mip_height = height;
                for level in 1..mip_levels {
                    transition::cmd_transition_image(
                        cmd,
                        image.handle(),
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        vk::ImageAspectFlags::COLOR,
                        (level - 1, 1),
                        (0, 1),
                    );

                    let next_width = u32::max(1, mip_width / 2);
                    let next_height = u32::max(1, mip_height / 2);
                    let blit = vk::ImageBlit {
                        src_subresource: vk::ImageSubresourceLayers {
                            aspect_mask: vk::ImageAspectFlags::COLOR,
                            mip_level: level - 1,
                            base_array_layer: 0,
                            layer_count: 1,
                        },
                        src_offsets: [
                            vk::Offset3D::default(),
                            vk::Offset3D {
                                x: mip_width as i32,
                                y: mip_height as i32,
                                z: 1,
                            },
                        ],
                        dst_subresource: vk::ImageSubresourceLayers {
                            aspect_mask: vk::ImageAspectFlags::COLOR,
                            mip_level: level,
                            base_array_layer: 0,
                            layer_count: 1,
                        },
                        dst_offsets: [
                            vk::Offset3D::default(),
                            vk::Offset3D {
                                x: next_width as i32,
                                y: next_height as i32,
                                z: 1,
                            },
                        ],
                    };
                    cmd.cmd_blit_image(
                        image.handle(),
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        image.handle(),
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        std::slice::from_ref(&blit),
                        vk::Filter::LINEAR,
                    );

                    mip_width = next_width;
                    mip_height = next_height;
                }

                // 循环结束后：level 0..n-1 处于 SRC，最后一级处于 DST
                if mip_levels > 1 {
                    transition::cmd_transition_image(
                        cmd,
                        image.handle(),
                        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                        vk::ImageAspectFlags::COLOR,
                        (0, mip_levels - 1),
                        (0, 1),
                    );
                }
                transition::cmd_transition_image(
                    cmd,
                    image.handle(),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    vk::ImageAspectFlags::COLOR,
                    (mip_levels - 1, 1),
                    (0, 1),
                );
            },
            name,
        );

        let image_view = GpuImageView::new(
            ctx.device().clone(),
            image.handle(),
            GpuImageViewDesc::new_2d_with_mips(format, vk::ImageAspectFlags::COLOR, mip_levels as u8),
            name,
        );
        let sampler =
            GpuSampler::new(ctx.device().clone(), GpuSamplerCreateInfo::new_material(mip_levels).into(), name);

        Self {
            image,
            image_view,
            sampler,
        }
    }

    /// 六张同尺寸的 RGBA8 face 组装一张 cube map
    ///
    /// face 顺序：+X -X +Y -Y +Z -Z
    pub fn cube_from_faces(ctx: &GpuContext, size: u32, faces: &[&[u8]; 6], name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let format = vk::Format::R8G8B8A8_UNORM;
        let face_bytes = pixel_size_in_bytes(format) * (size * size) as usize;
        for (i, face) in faces.iter().enumerate() {
            assert_eq!(face.len(), face_bytes, "cube face {i} has wrong size");
        }

        let image_ci = GpuImageCreateInfo::new_cube_info(
            size,
            format,
            vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED,
        );
        let image = GpuImage::new(ctx, &image_ci, &GpuImage::device_local_alloc_info(), name);

        // 六个 face 连续放进一个 stage buffer
        let stage_buffer =
            GpuBuffer::new_stage_buffer(ctx, (face_bytes * 6) as vk::DeviceSize, format!("{name}-stage"));
        for (i, face) in faces.iter().enumerate() {
            stage_buffer.write_at_offset((i * face_bytes) as vk::DeviceSize, face);
        }

        ctx.one_time_exec(
            |cmd| {
                transition::cmd_transition_image(
                    cmd,
                    image.handle(),
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageAspectFlags::COLOR,
                    (0, 1),
                    (0, 6),
                );

                let regions = (0..6u32)
                    .map(|face| {
                        let mut copy = Self::whole_image_copy(size, size, 0, face);
                        copy.buffer_offset = face as vk::DeviceSize * face_bytes as vk::DeviceSize;
                        copy
                    })
                    .collect::<Vec<_>>();
                cmd.cmd_copy_buffer_to_image(
                    &vk::CopyBufferToImageInfo2::default()
                        .src_buffer(stage_buffer.handle())
                        .dst_image(image.handle())
                        .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                        .regions(&regions),
                );

                transition::cmd_transition_image(
                    cmd,
                    image.handle(),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    vk::ImageAspectFlags::COLOR,
                    (0, 1),
                    (0, 6),
                );
            },
            name,
        );

        let image_view =
            GpuImageView::new(ctx.device().clone(), image.handle(), GpuImageViewDesc::new_cube(format, 1), name);
        let sampler = GpuSampler::new(ctx.device().clone(), GpuSamplerCreateInfo::new_ibl(1).into(), name);

        Self {
            image,
            image_view,
            sampler,
        }
    }

    /// 1x1 的纯色 fallback texture，材质缺贴图时使用
    pub fn solid_color(ctx: &GpuContext, rgba: [u8; 4], name: impl AsRef<str>) -> Self {
        Self::from_rgba8(ctx, 1, 1, &rgba, name)
    }

    fn whole_image_copy(width: u32, height: u32, mip_level: u32, base_array_layer: u32) -> vk::BufferImageCopy2<'static> {
        vk::BufferImageCopy2::default()
            .buffer_offset(0)
            .buffer_row_length(0)
            .buffer_image_height(0)
            .image_offset(vk::Offset3D::default())
            .image_extent(vk::Extent3D {
                width,
                height,
                depth: 1,
            })
            .image_subresource(vk::ImageSubresourceLayers {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                mip_level,
                base_array_layer,
                layer_count: 1,
            })
    }
}

// getters
impl GpuTexture {
    #[inline]
    pub fn image(&self) -> &GpuImage {
        &self.image
    }

    #[inline]
    pub fn image_view(&self) -> &GpuImageView {
        &self.image_view
    }

    #[inline]
    pub fn sampler(&self) -> &GpuSampler {
        &self.sampler
    }

    #[inline]
    pub fn descriptor_image_info(&self, layout: vk::ImageLayout) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo::default()
            .sampler(self.sampler.handle())
            .image_view(self.image_view.handle())
            .image_layout(layout)
    }
}
