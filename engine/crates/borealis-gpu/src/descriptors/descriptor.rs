use std::rc::Rc;

use ash::vk;
use itertools::Itertools;

use crate::{
    descriptors::descriptor_pool::GpuDescriptorPool,
    foundation::{debug_utils::GpuDebugType, device::GpuDevice},
};

/// 描述符绑定的详细信息
#[derive(Debug, Clone, Copy)]
pub struct GpuBindingItem {
    pub name: &'static str,
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub stage_flags: vk::ShaderStageFlags,
    pub count: u32,
}

impl GpuBindingItem {
    /// 针对当前 binding 的 buffer 写入
    pub fn write_buffer(&self, dst_set: vk::DescriptorSet, buffers: Vec<vk::DescriptorBufferInfo>) -> GpuWriteDescriptorSet {
        GpuWriteDescriptorSet {
            dst_set,
            dst_binding: self.binding,
            dst_array_element: 0,
            descriptor_type: self.descriptor_type,
            buffer_infos: buffers,
            image_infos: vec![],
        }
    }

    /// 针对当前 binding 的 image 写入
    pub fn write_image(&self, dst_set: vk::DescriptorSet, images: Vec<vk::DescriptorImageInfo>) -> GpuWriteDescriptorSet {
        GpuWriteDescriptorSet {
            dst_set,
            dst_binding: self.binding,
            dst_array_element: 0,
            descriptor_type: self.descriptor_type,
            buffer_infos: vec![],
            image_infos: images,
        }
    }
}

/// 描述符集的绑定布局
///
/// 每个实现者对应一种 descriptor set 的布局，
/// 泛型挂在 [`GpuDescriptorSetLayout`] 和 [`GpuDescriptorSet`] 上，
/// 避免把格式不符的 set 绑到错误的 slot 上。
pub trait DescriptorBindings {
    /// 所有绑定的详细信息
    fn shader_bindings() -> Vec<GpuBindingItem>;

    /// 生成 Vulkan 描述符集布局所需的绑定信息，不应该被覆盖
    fn bindings() -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
        Self::shader_bindings()
            .iter()
            .map(|item| vk::DescriptorSetLayoutBinding {
                binding: item.binding,
                descriptor_type: item.descriptor_type,
                descriptor_count: item.count,
                stage_flags: item.stage_flags,
                ..Default::default()
            })
            .collect()
    }

    /// 单个 set 对 descriptor pool 的占用
    fn pool_sizes() -> Vec<vk::DescriptorPoolSize> {
        Self::shader_bindings()
            .iter()
            .map(|item| vk::DescriptorPoolSize {
                ty: item.descriptor_type,
                descriptor_count: item.count,
            })
            .collect()
    }
}

/// 描述符集布局
///
/// 泛型参数 T 关联具体的绑定布局类型，保证类型安全
pub struct GpuDescriptorSetLayout<T: DescriptorBindings> {
    layout: vk::DescriptorSetLayout,
    phantom_data: std::marker::PhantomData<T>,

    device: Rc<GpuDevice>,
}

impl<T: DescriptorBindings> GpuDescriptorSetLayout<T> {
    pub fn new(device: Rc<GpuDevice>, flags: vk::DescriptorSetLayoutCreateFlags, debug_name: impl AsRef<str>) -> Self {
        let bindings = T::bindings();
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().flags(flags).bindings(&bindings);

        let layout = unsafe { device.create_descriptor_set_layout(&create_info, None).unwrap() };
        let layout = Self {
            layout,
            phantom_data: std::marker::PhantomData,
            device,
        };
        layout.device.set_debug_name(&layout, debug_name);
        layout
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl<T: DescriptorBindings> Drop for GpuDescriptorSetLayout<T> {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

impl<T: DescriptorBindings> GpuDebugType for GpuDescriptorSetLayout<T> {
    fn debug_type_name() -> &'static str {
        "GpuDescriptorSetLayout"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.layout
    }
}

/// 描述符集
///
/// # Destroy
///
/// 跟随 descriptor pool 一起销毁
pub struct GpuDescriptorSet<T: DescriptorBindings> {
    handle: vk::DescriptorSet,
    phantom_data: std::marker::PhantomData<T>,

    _descriptor_pool: vk::DescriptorPool,
}

impl<T: DescriptorBindings> GpuDescriptorSet<T> {
    pub fn new(
        descriptor_pool: &GpuDescriptorPool,
        layout: &GpuDescriptorSetLayout<T>,
        debug_name: impl AsRef<str>,
    ) -> Self {
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(descriptor_pool.handle())
            .set_layouts(std::slice::from_ref(&layout.layout));
        let descriptor_set = unsafe { descriptor_pool.device().allocate_descriptor_sets(&alloc_info).unwrap()[0] };
        let set = Self {
            handle: descriptor_set,
            phantom_data: std::marker::PhantomData,
            _descriptor_pool: descriptor_pool.handle(),
        };
        descriptor_pool.device().set_debug_name(&set, debug_name);
        set
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSet {
        self.handle
    }
}

impl<T: DescriptorBindings> GpuDebugType for GpuDescriptorSet<T> {
    fn debug_type_name() -> &'static str {
        "GpuDescriptorSet"
    }

    fn vk_handle(&self) -> impl vk::Handle {
        self.handle
    }
}

/// 一次描述符写入，buffer_infos 和 image_infos 只能有一个非空
pub struct GpuWriteDescriptorSet {
    pub dst_set: vk::DescriptorSet,
    pub dst_binding: u32,
    pub dst_array_element: u32,
    pub descriptor_type: vk::DescriptorType,

    pub buffer_infos: Vec<vk::DescriptorBufferInfo>,
    pub image_infos: Vec<vk::DescriptorImageInfo>,
}

impl GpuWriteDescriptorSet {
    pub fn to_vk_type(&self) -> vk::WriteDescriptorSet<'_> {
        let descriptor_count;
        match (self.buffer_infos.is_empty(), self.image_infos.is_empty()) {
            (false, true) => descriptor_count = self.buffer_infos.len(),
            (true, false) => descriptor_count = self.image_infos.len(),
            _ => panic!("exactly one of buffer_infos or image_infos should be set"),
        }

        vk::WriteDescriptorSet {
            dst_set: self.dst_set,
            dst_binding: self.dst_binding,
            dst_array_element: self.dst_array_element,
            descriptor_count: descriptor_count as u32,
            descriptor_type: self.descriptor_type,
            // 选择 buffer ptr 还是 image ptr，是由 descriptor type 控制的
            p_buffer_info: self.buffer_infos.as_ptr(),
            p_image_info: self.image_infos.as_ptr(),
            ..Default::default()
        }
    }

    /// 把一批写入一次性提交给 device
    pub fn apply(device: &GpuDevice, writes: &[Self]) {
        let vk_writes = writes.iter().map(|w| w.to_vk_type()).collect_vec();
        unsafe {
            device.update_descriptor_sets(&vk_writes, &[]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TwoBufferBindings;
    impl DescriptorBindings for TwoBufferBindings {
        fn shader_bindings() -> Vec<GpuBindingItem> {
            vec![
                GpuBindingItem {
                    name: "frame_data",
                    binding: 0,
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                    stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                    count: 1,
                },
                GpuBindingItem {
                    name: "lights",
                    binding: 1,
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
                    stage_flags: vk::ShaderStageFlags::FRAGMENT,
                    count: 1,
                },
            ]
        }
    }

    #[test]
    fn bindings_follow_shader_binding_items() {
        let bindings = TwoBufferBindings::bindings();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].binding, 0);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[1].stage_flags, vk::ShaderStageFlags::FRAGMENT);
    }

    #[test]
    fn pool_sizes_cover_each_binding() {
        let sizes = TwoBufferBindings::pool_sizes();
        assert_eq!(sizes.len(), 2);
        assert!(sizes.iter().all(|s| s.ty == vk::DescriptorType::UNIFORM_BUFFER));
        assert_eq!(sizes.iter().map(|s| s.descriptor_count).sum::<u32>(), 2);
    }

    #[test]
    fn write_helpers_pick_up_binding_slot() {
        let items = TwoBufferBindings::shader_bindings();
        let write = items[1].write_buffer(
            vk::DescriptorSet::null(),
            vec![vk::DescriptorBufferInfo::default()],
        );
        assert_eq!(write.dst_binding, 1);
        assert_eq!(write.descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);

        let vk_write = write.to_vk_type();
        assert_eq!(vk_write.descriptor_count, 1);
    }

    #[test]
    #[should_panic(expected = "exactly one of")]
    fn write_without_payload_panics() {
        let items = TwoBufferBindings::shader_bindings();
        let write = items[0].write_buffer(vk::DescriptorSet::null(), vec![]);
        let _ = write.to_vk_type();
    }
}
