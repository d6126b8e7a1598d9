//! 环绕相机
//!
//! 始终看向目标点；拖动改变方位角，滚轮改变距离。

use glam::{Mat4, Vec3};

pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw_deg: f32,
    pub pitch_deg: f32,

    pub fov_y_deg: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl OrbitCamera {
    /// pitch 接近 ±90° 时 up 向量会退化
    const PITCH_LIMIT: f32 = 89.0;
    const MIN_DISTANCE: f32 = 1.0;
    const MAX_DISTANCE: f32 = 80.0;
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 12.0,
            yaw_deg: 35.0,
            pitch_deg: 20.0,
            fov_y_deg: 60.0,
            znear: 0.1,
            zfar: 200.0,
        }
    }
}

// getters
impl OrbitCamera {
    /// 相机在世界空间中的位置
    pub fn position(&self) -> Vec3 {
        let yaw = self.yaw_deg.to_radians();
        let pitch = self.pitch_deg.to_radians();
        let dir = Vec3::new(yaw.sin() * pitch.cos(), pitch.sin(), yaw.cos() * pitch.cos());
        self.target + dir * self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Vulkan 裁剪空间的投影矩阵，Y 轴已翻转
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let mut proj = Mat4::perspective_rh(self.fov_y_deg.to_radians(), aspect, self.znear, self.zfar);
        proj.y_axis.y *= -1.0;
        proj
    }
}

// update
impl OrbitCamera {
    /// 拖动，单位是度
    pub fn rotate(&mut self, yaw_delta_deg: f32, pitch_delta_deg: f32) {
        self.yaw_deg = (self.yaw_deg + yaw_delta_deg) % 360.0;
        self.pitch_deg = (self.pitch_deg + pitch_delta_deg).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
    }

    /// 滚轮缩放，正值拉近
    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance * (1.0 - scroll * 0.1)).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_keeps_distance() {
        let mut camera = OrbitCamera::default();
        for (yaw, pitch) in [(0.0, 0.0), (90.0, 45.0), (215.0, -60.0)] {
            camera.yaw_deg = yaw;
            camera.pitch_deg = pitch;
            let to_camera = camera.position() - camera.target;
            assert!((to_camera.length() - camera.distance).abs() < 1e-4);
        }
    }

    #[test]
    fn test_view_centers_the_target() {
        let camera = OrbitCamera {
            target: Vec3::new(1.0, 2.0, 3.0),
            ..OrbitCamera::default()
        };
        let in_view = camera.view_matrix().transform_point3(camera.target);
        // 目标点位于视线正前方（-Z），距离不变
        assert!(in_view.x.abs() < 1e-4);
        assert!(in_view.y.abs() < 1e-4);
        assert!((in_view.z + camera.distance).abs() < 1e-4);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.rotate(0.0, 500.0);
        assert_eq!(camera.pitch_deg, 89.0);
        camera.rotate(0.0, -500.0);
        assert_eq!(camera.pitch_deg, -89.0);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut camera = OrbitCamera::default();
        for _ in 0..100 {
            camera.zoom(1.0);
        }
        assert_eq!(camera.distance, 1.0);
        for _ in 0..100 {
            camera.zoom(-1.0);
        }
        assert_eq!(camera.distance, 80.0);
    }

    #[test]
    fn test_projection_flips_y_for_vulkan() {
        let camera = OrbitCamera::default();
        let proj = camera.projection_matrix(16.0 / 9.0);
        assert!(proj.y_axis.y < 0.0);

        // 深度落在 Vulkan 的 [0, 1] 区间
        let mid = proj.project_point3(Vec3::new(0.0, 0.0, -10.0));
        assert!(mid.z > 0.0 && mid.z < 1.0);
    }
}
