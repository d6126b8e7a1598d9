use std::rc::Rc;

use ash::vk;

use crate::foundation::device::GpuDevice;

pub struct GpuSamplerCreateInfo {
    inner: vk::SamplerCreateInfo<'static>,
}

impl Default for GpuSamplerCreateInfo {
    fn default() -> Self {
        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(1.0);

        Self { inner: sampler_info }
    }
}

impl GpuSamplerCreateInfo {
    /// 默认配置：linear，repeat
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 材质贴图：linear，repeat，覆盖全部 mip level
    #[inline]
    pub fn new_material(mip_count: u32) -> Self {
        let mut info = Self::default();
        info.inner = info.inner.max_lod(mip_count as f32);
        info
    }

    /// IBL 贴图：linear，clamp to edge，覆盖全部 mip level
    #[inline]
    pub fn new_ibl(mip_count: u32) -> Self {
        let mut info = Self::default();
        info.inner = info
            .inner
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_EDGE)
            .max_lod(mip_count as f32);
        info
    }

    /// shadow map：clamp to border（白色边界），开启 compare op
    ///
    /// 边界取白色，使得 shadow map 之外的区域视为不被遮挡
    #[inline]
    pub fn new_shadow() -> Self {
        let mut info = Self::default();
        info.inner = info
            .inner
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_BORDER)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_BORDER)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_BORDER)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_WHITE)
            .compare_enable(true)
            .compare_op(vk::CompareOp::LESS_OR_EQUAL);
        info
    }
}

pub struct GpuSampler {
    handle: vk::Sampler,

    _info: Rc<GpuSamplerCreateInfo>,
    device: Rc<GpuDevice>,
}

impl Drop for GpuSampler {
    fn drop(&mut self) {
        unsafe {
            log::debug!("Destroying GpuSampler");
            self.device.destroy_sampler(self.handle, None);
        }
    }
}

impl GpuSampler {
    #[inline]
    pub fn new(device: Rc<GpuDevice>, info: Rc<GpuSamplerCreateInfo>, debug_name: &str) -> Self {
        let handle = unsafe { device.create_sampler(&info.inner, None).unwrap() };
        device.set_object_debug_name(handle, debug_name);

        Self {
            handle,
            _info: info,
            device: device.clone(),
        }
    }

    #[inline]
    pub fn handle(&self) -> vk::Sampler {
        self.handle
    }
}
