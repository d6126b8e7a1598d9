use std::ffi::{CStr, CString};
use std::rc::Rc;

use ash::vk;

use crate::foundation::instance::GpuInstance;

/// 实现了这个 trait 的类型，可以通过 [`GpuDebugUtils::set_debug_name`] 获得
/// `TypeName::instance_name` 形式的 debug name
pub trait GpuDebugType {
    fn debug_type_name() -> &'static str;
    fn vk_handle(&self) -> impl vk::Handle;
}

/// instance 级别的 debug messenger，将 validation 消息转发到 log
pub struct GpuDebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,

    _instance: Rc<GpuInstance>,
}

impl Drop for GpuDebugMessenger {
    fn drop(&mut self) {
        log::info!("Destroying GpuDebugMessenger");
        unsafe {
            self.loader.destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

impl GpuDebugMessenger {
    pub fn new(instance: Rc<GpuInstance>) -> Self {
        let loader = ash::ext::debug_utils::Instance::new(instance.entry(), instance.ash_instance());

        let create_info = Self::debug_utils_messenger_ci();
        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None).unwrap() };

        Self {
            loader,
            messenger,
            _instance: instance,
        }
    }

    /// 用于创建 debug messenger 的结构体
    ///
    /// instance 创建时也会 push_next 这个结构体，覆盖 instance 创建期间的消息
    pub fn debug_utils_messenger_ci() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
        vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vk_debug_callback))
    }
}

/// debug messenger 的回调函数
/// # Safety
unsafe extern "system" fn vk_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    let callback_data = unsafe { *p_callback_data };

    let msg = if callback_data.p_message.is_null() {
        std::borrow::Cow::from("")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let format_msg = format!("[{:?}]\n{}\n", message_type, msg);

    match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => log::error!("{}", format_msg),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => log::warn!("{}", format_msg),
        _ => log::info!("{}", format_msg),
    };

    // 只有 layer developer 才需要返回 True
    vk::FALSE
}

/// device 级别的 debug utils：object name 与 cmd/queue label
pub struct GpuDebugUtils {
    vk_debug_utils_device: ash::ext::debug_utils::Device,
}

impl GpuDebugUtils {
    pub fn new(instance: &ash::Instance, device: &ash::Device) -> Self {
        Self {
            vk_debug_utils_device: ash::ext::debug_utils::Device::new(instance, device),
        }
    }

    /// 为 vulkan object 设置带类型前缀的 debug name
    pub fn set_debug_name<T: GpuDebugType>(&self, obj: &T, name: impl AsRef<str>) {
        self.set_object_debug_name(obj.vk_handle(), format!("{}::{}", T::debug_type_name(), name.as_ref()));
    }

    pub fn set_object_debug_name<T: vk::Handle>(&self, handle: T, name: impl AsRef<str>) {
        let name = CString::new(name.as_ref()).unwrap();
        unsafe {
            self.vk_debug_utils_device
                .set_debug_utils_object_name(
                    &vk::DebugUtilsObjectNameInfoEXT::default().object_handle(handle).object_name(name.as_c_str()),
                )
                .unwrap();
        }
    }

    pub fn cmd_begin_debug_label(&self, command_buffer: vk::CommandBuffer, label_name: &str, label_color: glam::Vec4) {
        let name = CString::new(label_name).unwrap();
        unsafe {
            let label = vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.into());
            self.vk_debug_utils_device.cmd_begin_debug_utils_label(command_buffer, &label);
        }
    }

    pub fn cmd_end_debug_label(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.vk_debug_utils_device.cmd_end_debug_utils_label(command_buffer);
        }
    }

    pub fn cmd_insert_debug_label(&self, command_buffer: vk::CommandBuffer, label_name: &str, label_color: glam::Vec4) {
        let name = CString::new(label_name).unwrap();
        unsafe {
            let label = vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.into());
            self.vk_debug_utils_device.cmd_insert_debug_utils_label(command_buffer, &label);
        }
    }

    pub fn begin_queue_label(&self, queue: vk::Queue, label_name: &str, label_color: glam::Vec4) {
        let name = CString::new(label_name).unwrap();
        unsafe {
            let label = vk::DebugUtilsLabelEXT::default().label_name(name.as_c_str()).color(label_color.into());
            self.vk_debug_utils_device.queue_begin_debug_utils_label(queue, &label);
        }
    }

    pub fn end_queue_label(&self, queue: vk::Queue) {
        unsafe {
            self.vk_debug_utils_device.queue_end_debug_utils_label(queue);
        }
    }
}
