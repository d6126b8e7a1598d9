//! winit 外壳
//!
//! 窗口生命周期、输入到相机的映射、以及每帧对渲染器四个操作的驱动。
//! 渲染器在 `resumed` 拿到窗口之后才创建；竖线相连的事件流：
//! `RedrawRequested` 渲染一帧，`about_to_wait` 请求下一次重绘，
//! 形成持续渲染的循环。

use std::time::Instant;

use ash::vk;
use borealis_crate_tools::{init_log::init_log, panic_hook::install_panic_hook};
use borealis_render_interface::config::RenderConfig;
use borealis_renderer::renderer::{FrameInputs, Renderer, RendererCreateInfo};
use borealis_scene::descriptor::SceneDesc;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::{camera::OrbitCamera, overlay::OverlayFeed};

/// 由具体 demo 实现的回调集合
pub trait SceneApp {
    fn title(&self) -> &str;

    /// 场景描述，只在初始化时取一次
    fn scene(&self) -> SceneDesc;

    fn config(&self) -> RenderConfig {
        RenderConfig::default()
    }

    fn initial_camera(&self) -> OrbitCamera {
        OrbitCamera::default()
    }

    /// 每帧录制之前调用，elapsed 是启动以来的秒数
    fn update(&mut self, _renderer: &mut Renderer, _elapsed: f32) {}
}

pub struct WinitApp {
    logic: Box<dyn SceneApp>,

    // renderer 声明在 window 之前，销毁时先于 window 释放 surface
    renderer: Option<Renderer>,
    window: Option<Window>,

    camera: OrbitCamera,
    overlay: OverlayFeed,

    start_time: Instant,
    last_frame: Instant,

    mouse_pressed: bool,
    last_cursor: Option<(f64, f64)>,
}

// 总的 main 函数
impl WinitApp {
    /// 整个程序的入口
    pub fn run(logic: Box<dyn SceneApp>) {
        install_panic_hook();
        init_log();
        tracy_client::Client::start();
        tracy_client::set_thread_name!("MainThread");

        let event_loop = EventLoop::new().unwrap();
        let camera = logic.initial_camera();
        let mut app = Self {
            logic,
            renderer: None,
            window: None,
            camera,
            overlay: OverlayFeed::new(),
            start_time: Instant::now(),
            last_frame: Instant::now(),
            mouse_pressed: false,
            last_cursor: None,
        };
        event_loop.run_app(&mut app).unwrap();

        log::info!("end run.");
    }
}

// new & init
impl WinitApp {
    /// 在拿到窗口之后初始化渲染器
    fn init_after_window(&mut self, event_loop: &ActiveEventLoop) {
        let title = self.logic.title().to_string();
        let window_attr =
            Window::default_attributes().with_title(&title).with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = event_loop.create_window(window_attr).unwrap();

        let size = window.inner_size();
        let atlas_pixels = OverlayFeed::atlas_rgba8();
        let create_info = RendererCreateInfo {
            app_name: &title,
            display_handle: window.display_handle().unwrap().as_raw(),
            window_handle: window.window_handle().unwrap().as_raw(),
            window_extent: vk::Extent2D {
                width: size.width,
                height: size.height,
            },
            overlay_atlas_size: (OverlayFeed::ATLAS_SIZE, OverlayFeed::ATLAS_SIZE),
            overlay_atlas_rgba8: &atlas_pixels,
        };

        let scene = self.logic.scene();
        match Renderer::new(&create_info, &scene, self.logic.config()) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(err) => {
                log::error!("failed to initialize renderer: {err:#}");
                event_loop.exit();
                return;
            }
        }
        self.window = Some(window);
    }
}

// update
impl WinitApp {
    fn redraw(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let delta = self.last_frame.elapsed().as_secs_f32();
        self.last_frame = Instant::now();
        self.overlay.note_frame(delta);

        self.logic.update(renderer, self.start_time.elapsed().as_secs_f32());

        let extent = renderer.swapchain_extent();
        let overlay_data = self.overlay.build(extent);
        let inputs = FrameInputs {
            camera_pos: self.camera.position(),
            view: self.camera.view_matrix(),
            proj: self.camera.projection_matrix(extent.width as f32 / extent.height as f32),
            overlay: Some(&overlay_data),
        };

        if renderer.render_frame(&inputs) {
            // swapchain 过期（resize、遮挡等），按当前窗口尺寸重建
            let size = self.window.as_ref().unwrap().inner_size();
            renderer.resize(vk::Extent2D {
                width: size.width,
                height: size.height,
            });
        }
    }
}

// 各种 winit 的事件处理
impl ApplicationHandler for WinitApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        assert!(self.window.is_none(), "window should be None when resumed.");

        log::info!("winit event: resumed");
        self.init_after_window(event_loop);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            WindowEvent::Resized(size) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resize(vk::Extent2D {
                        width: size.width,
                        height: size.height,
                    });
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.mouse_pressed = state == ElementState::Pressed;
            }
            WindowEvent::CursorMoved { position, .. } => {
                if self.mouse_pressed {
                    if let Some((last_x, last_y)) = self.last_cursor {
                        self.camera.rotate(
                            (position.x - last_x) as f32 * 0.3,
                            (position.y - last_y) as f32 * 0.3,
                        );
                    }
                }
                self.last_cursor = Some((position.x, position.y));
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
                self.camera.zoom(scroll);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && matches!(event.logical_key.as_ref(), Key::Named(NamedKey::Escape))
                {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        log::warn!("winit event: suspended");
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("loop exiting");
    }
}
