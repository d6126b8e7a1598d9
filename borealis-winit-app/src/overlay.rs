//! 最小的 overlay 数据源：把最近的帧耗时画成柱状图
//!
//! 沿用立即模式 GUI 的惯例：图集里取一个纯白像素来画纯色几何，
//! 这里整张图集都是白色。文字或贴图 UI 可以沿同样的接口扩展。

use std::collections::VecDeque;

use ash::vk;
use borealis_render_interface::vertex::OverlayVertex;
use borealis_renderer::passes::overlay_pass::{OverlayDraw, OverlayFrameData};

pub struct OverlayFeed {
    /// 最近若干帧的耗时，秒
    frame_times: VecDeque<f32>,
}

impl OverlayFeed {
    /// 柱状图的样本数量
    pub const HISTORY: usize = 120;
    /// 每个样本占的像素宽度
    const BAR_WIDTH: f32 = 2.0;
    /// 纯白图集的边长
    pub const ATLAS_SIZE: u32 = 4;

    /// 图集像素，RGBA8 全白
    pub fn atlas_rgba8() -> Vec<u8> {
        vec![0xff; (Self::ATLAS_SIZE * Self::ATLAS_SIZE * 4) as usize]
    }
}

// new & init
impl OverlayFeed {
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(Self::HISTORY),
        }
    }
}

impl Default for OverlayFeed {
    fn default() -> Self {
        Self::new()
    }
}

// update
impl OverlayFeed {
    pub fn note_frame(&mut self, delta_secs: f32) {
        if self.frame_times.len() == Self::HISTORY {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(delta_secs);
    }

    /// 产出本帧的 UI 几何；没有样本时返回空数据
    pub fn build(&self, _extent: vk::Extent2D) -> OverlayFrameData {
        let mut data = OverlayFrameData::default();
        if self.frame_times.is_empty() {
            return data;
        }

        let origin = [10.0_f32, 10.0];
        let graph_w = Self::HISTORY as f32 * Self::BAR_WIDTH;
        let graph_h = 48.0;

        push_quad(&mut data, origin, [origin[0] + graph_w, origin[1] + graph_h], [0, 0, 0, 160]);

        // 33ms 为满高
        let full_scale = 1.0 / 30.0;
        for (i, &delta) in self.frame_times.iter().enumerate() {
            let height = (delta / full_scale).min(1.0) * graph_h;
            let x = origin[0] + i as f32 * Self::BAR_WIDTH;
            let color = if delta <= 1.0 / 55.0 { [64, 220, 64, 255] } else { [230, 170, 40, 255] };
            push_quad(
                &mut data,
                [x, origin[1] + graph_h - height],
                [x + Self::BAR_WIDTH, origin[1] + graph_h],
                color,
            );
        }

        data.draws.push(OverlayDraw {
            index_count: data.indices.len() as u32,
            first_index: 0,
            vertex_offset: 0,
            clip: [origin[0], origin[1], origin[0] + graph_w, origin[1] + graph_h],
        });
        data
    }
}

/// 追加一个轴对齐的纯色矩形，两个三角形
fn push_quad(data: &mut OverlayFrameData, min: [f32; 2], max: [f32; 2], color: [u8; 4]) {
    let base = data.vertices.len() as u32;
    // 图集中心，纯白
    let uv = [0.5, 0.5];
    data.vertices.push(OverlayVertex { position: [min[0], min[1]], uv, color });
    data.vertices.push(OverlayVertex { position: [max[0], min[1]], uv, color });
    data.vertices.push(OverlayVertex { position: [max[0], max[1]], uv, color });
    data.vertices.push(OverlayVertex { position: [min[0], max[1]], uv, color });
    data.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: vk::Extent2D = vk::Extent2D {
        width: 1280,
        height: 720,
    };

    #[test]
    fn test_empty_history_builds_nothing() {
        let feed = OverlayFeed::new();
        let data = feed.build(EXTENT);
        assert!(data.vertices.is_empty());
        assert!(data.draws.is_empty());
    }

    #[test]
    fn test_one_sample_builds_background_and_bar() {
        let mut feed = OverlayFeed::new();
        feed.note_frame(1.0 / 60.0);
        let data = feed.build(EXTENT);

        // 背景 + 1 个柱子，每个矩形 4 顶点 6 索引
        assert_eq!(data.vertices.len(), 8);
        assert_eq!(data.indices.len(), 12);
        assert_eq!(data.draws.len(), 1);
        assert_eq!(data.draws[0].index_count, 12);
        assert!(data.indices.iter().all(|&i| (i as usize) < data.vertices.len()));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut feed = OverlayFeed::new();
        for _ in 0..OverlayFeed::HISTORY * 3 {
            feed.note_frame(0.016);
        }
        let data = feed.build(EXTENT);
        assert_eq!(data.vertices.len(), (OverlayFeed::HISTORY + 1) * 4);
    }

    #[test]
    fn test_slow_frame_bar_is_clamped_to_graph() {
        let mut feed = OverlayFeed::new();
        feed.note_frame(10.0);
        let data = feed.build(EXTENT);

        let clip = data.draws[0].clip;
        for vertex in &data.vertices {
            assert!(vertex.position[1] >= clip[1] - 1e-4);
            assert!(vertex.position[1] <= clip[3] + 1e-4);
        }
    }

    #[test]
    fn test_atlas_is_opaque_white() {
        let pixels = OverlayFeed::atlas_rgba8();
        assert_eq!(pixels.len(), (OverlayFeed::ATLAS_SIZE * OverlayFeed::ATLAS_SIZE * 4) as usize);
        assert!(pixels.iter().all(|&p| p == 0xff));
    }
}
