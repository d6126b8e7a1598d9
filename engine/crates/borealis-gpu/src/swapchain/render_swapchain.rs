use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::{
    commands::{fence::GpuFence, queue::GpuQueue, semaphore::GpuSemaphore},
    context::GpuContext,
    foundation::device::GpuDevice,
    resources::image_view::{GpuImageView, GpuImageViewDesc},
    swapchain::surface::GpuSurface,
};

/// swapchain 以及它的 image view
///
/// acquire/present 返回是否需要重建，resize 时调用 [`Self::rebuild`]
pub struct GpuSwapchain {
    handle: vk::SwapchainKHR,

    swapchain_images: Vec<vk::Image>,
    swapchain_image_views: Vec<GpuImageView>,
    swapchain_image_index: usize,

    color_format: vk::Format,
    swapchain_extent: vk::Extent2D,

    preferred_present_mode: vk::PresentModeKHR,

    surface: Rc<GpuSurface>,
    device: Rc<GpuDevice>,
    pdevice: vk::PhysicalDevice,
}

// new & init
impl GpuSwapchain {
    pub fn new(
        ctx: &GpuContext,
        window_physical_extent: vk::Extent2D,
        preferred_surface_format: vk::SurfaceFormatKHR,
        preferred_present_mode: vk::PresentModeKHR,
    ) -> Self {
        let surface = ctx.surface().clone();
        let device = ctx.device().clone();
        let pdevice = ctx.physical_device().handle;

        let surface_format = Self::select_surface_format(&surface, pdevice, preferred_surface_format);
        let present_mode = Self::select_present_mode(&surface, pdevice, preferred_present_mode);
        log::info!("swapchain surface format: {:?}, present mode: {:?}", surface_format, present_mode);

        let (handle, extent) =
            Self::create_swapchain(&surface, &device, pdevice, surface_format, present_mode, window_physical_extent);
        let (images, image_views) = Self::collect_images(&device, handle, surface_format.format);

        Self {
            handle,
            swapchain_images: images,
            swapchain_image_views: image_views,
            swapchain_image_index: 0,
            color_format: surface_format.format,
            swapchain_extent: extent,
            preferred_present_mode,
            surface,
            device,
            pdevice,
        }
    }

    /// 窗口尺寸变化后重建 swapchain
    ///
    /// 内部会等待 device idle，确保旧的 image 不再被使用
    pub fn rebuild(&mut self, window_physical_extent: vk::Extent2D) {
        self.device.wait_idle();

        self.swapchain_image_views.clear();
        unsafe {
            self.device.swapchain_pf().destroy_swapchain(self.handle, None);
        }

        let surface_format = vk::SurfaceFormatKHR {
            format: self.color_format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        };
        let present_mode = Self::select_present_mode(&self.surface, self.pdevice, self.preferred_present_mode);
        let (handle, extent) = Self::create_swapchain(
            &self.surface,
            &self.device,
            self.pdevice,
            surface_format,
            present_mode,
            window_physical_extent,
        );
        let (images, image_views) = Self::collect_images(&self.device, handle, self.color_format);

        self.handle = handle;
        self.swapchain_images = images;
        self.swapchain_image_views = image_views;
        self.swapchain_image_index = 0;
        self.swapchain_extent = extent;
    }

    fn create_swapchain(
        surface: &GpuSurface,
        device: &Rc<GpuDevice>,
        pdevice: vk::PhysicalDevice,
        surface_format: vk::SurfaceFormatKHR,
        present_mode: vk::PresentModeKHR,
        window_physical_extent: vk::Extent2D,
    ) -> (vk::SwapchainKHR, vk::Extent2D) {
        let surface_capabilities = surface.get_capabilities(pdevice);

        let extent = Self::calculate_swapchain_extent(&surface_capabilities, window_physical_extent);
        log::info!(
            "create swapchain:
            surface current extent: {}x{}, min extent: {}x{}, max extent: {}x{}
            window physical extent: {}x{}
            final swapchain extent: {}x{}",
            surface_capabilities.current_extent.width,
            surface_capabilities.current_extent.height,
            surface_capabilities.min_image_extent.width,
            surface_capabilities.min_image_extent.height,
            surface_capabilities.max_image_extent.width,
            surface_capabilities.max_image_extent.height,
            window_physical_extent.width,
            window_physical_extent.height,
            extent.width,
            extent.height
        );

        // 确定 image count
        // max_image_count == 0，表示不限制 image 数量
        let image_count = if surface_capabilities.max_image_count == 0 {
            surface_capabilities.min_image_count + 1
        } else {
            u32::min(surface_capabilities.max_image_count, surface_capabilities.min_image_count + 1)
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.handle())
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .pre_transform(surface_capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .clipped(true);

        unsafe {
            let handle = device.swapchain_pf().create_swapchain(&create_info, None).unwrap();
            device.set_object_debug_name(handle, "GpuSwapchain::main");
            (handle, extent)
        }
    }

    fn collect_images(
        device: &Rc<GpuDevice>,
        swapchain: vk::SwapchainKHR,
        format: vk::Format,
    ) -> (Vec<vk::Image>, Vec<GpuImageView>) {
        let images = unsafe { device.swapchain_pf().get_swapchain_images(swapchain).unwrap() };
        let image_views = images
            .iter()
            .enumerate()
            .map(|(idx, image)| {
                device.set_object_debug_name(*image, &format!("swapchain-{idx}"));
                GpuImageView::new(
                    device.clone(),
                    *image,
                    GpuImageViewDesc::new_2d(format, vk::ImageAspectFlags::COLOR),
                    format!("swapchain-{idx}"),
                )
            })
            .collect_vec();
        (images, image_views)
    }
}

// getters
impl GpuSwapchain {
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain_extent
    }

    #[inline]
    pub fn color_format(&self) -> vk::Format {
        self.color_format
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.swapchain_images.len()
    }

    #[inline]
    pub fn current_image_index(&self) -> usize {
        self.swapchain_image_index
    }

    #[inline]
    pub fn current_image(&self) -> vk::Image {
        self.swapchain_images[self.swapchain_image_index]
    }

    #[inline]
    pub fn image_view(&self, index: usize) -> &GpuImageView {
        &self.swapchain_image_views[index]
    }
}

// tools
impl GpuSwapchain {
    /// 确定 swapchain 的 extent 尺寸
    ///
    /// 如果 surface_capabilities.current_extent 包含特殊值 0xFFFFFFFF，则表示可以自己设置交换链的 extent
    pub fn calculate_swapchain_extent(
        surface_capabilities: &vk::SurfaceCapabilitiesKHR,
        window_physical_extent: vk::Extent2D,
    ) -> vk::Extent2D {
        let surface_extent = surface_capabilities.current_extent;
        if surface_extent.width == 0xFFFFFFFF || surface_extent.height == 0xFFFFFFFF {
            let width = window_physical_extent
                .width
                .clamp(surface_capabilities.min_image_extent.width, surface_capabilities.max_image_extent.width);
            let height = window_physical_extent
                .height
                .clamp(surface_capabilities.min_image_extent.height, surface_capabilities.max_image_extent.height);
            vk::Extent2D { width, height }
        } else {
            surface_extent
        }
    }

    /// 优先使用指定的 format + color space，没有就用第一个
    fn select_surface_format(
        surface: &GpuSurface,
        pdevice: vk::PhysicalDevice,
        preferred: vk::SurfaceFormatKHR,
    ) -> vk::SurfaceFormatKHR {
        let formats = surface.get_formats(pdevice);
        formats
            .iter()
            .find(|f| f.format == preferred.format && f.color_space == preferred.color_space)
            .copied()
            .unwrap_or(formats[0])
    }

    /// 优先使用指定的 present mode，fallback 到规范保证存在的 FIFO
    fn select_present_mode(
        surface: &GpuSurface,
        pdevice: vk::PhysicalDevice,
        preferred: vk::PresentModeKHR,
    ) -> vk::PresentModeKHR {
        let modes = surface.get_present_modes(pdevice);
        if modes.contains(&preferred) {
            preferred
        } else {
            vk::PresentModeKHR::FIFO
        }
    }
}

// update
impl GpuSwapchain {
    /// timeout: nano seconds
    /// return: need recreate，此时没有 image 被 acquire，semaphore 也不会被 signal
    ///
    /// SUBOPTIMAL 时 image 已经被 acquire，本帧照常渲染，
    /// 依靠 present 的返回值触发重建
    #[inline]
    pub fn acquire_next_image(
        &mut self,
        semaphore: Option<&GpuSemaphore>,
        fence: Option<&GpuFence>,
        timeout: u64,
    ) -> bool {
        let result = unsafe {
            self.device.swapchain_pf().acquire_next_image(
                self.handle,
                timeout,
                semaphore.map_or(vk::Semaphore::null(), |s| s.handle()),
                fence.map_or(vk::Fence::null(), |f| f.handle()),
            )
        };

        match result {
            Ok((image_index, is_suboptimal)) => {
                if is_suboptimal {
                    log::warn!("swapchain acquire image index {} is not optimal", image_index);
                }
                self.swapchain_image_index = image_index as usize;
                false
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("swapchain is out of date when acquire next image");
                true
            }
            Err(e) => {
                panic!("failed to acquire next swapchain image: {:?}", e);
            }
        }
    }

    /// return: need recreate
    #[inline]
    pub fn present_image(&self, queue: &GpuQueue, wait_semaphores: &[&GpuSemaphore]) -> bool {
        let wait_semaphores = wait_semaphores.iter().map(|s| s.handle()).collect_vec();
        let image_indices = [self.swapchain_image_index as u32];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .image_indices(&image_indices)
            .swapchains(std::slice::from_ref(&self.handle));

        let result = unsafe { self.device.swapchain_pf().queue_present(queue.handle(), &present_info) };
        match result {
            Ok(is_suboptimal) => {
                if is_suboptimal {
                    log::warn!("swapchain present image index {} is not optimal", self.swapchain_image_index);
                }
                is_suboptimal
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("swapchain is out of date when present image");
                true
            }
            Err(e) => {
                panic!("failed to present swapchain image: {:?}", e);
            }
        }
    }
}

impl Drop for GpuSwapchain {
    fn drop(&mut self) {
        log::info!("destroying swapchain");
        self.swapchain_image_views.clear();
        unsafe {
            self.device.swapchain_pf().destroy_swapchain(self.handle, None);
        }
    }
}
