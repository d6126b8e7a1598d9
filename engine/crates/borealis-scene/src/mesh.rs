//! CPU 侧的网格数据与存储
//!
//! 程序生成的几何体坐标系：Right-Hand，X-Right，Y-Up；三角形绕序 CCW。

use borealis_render_interface::vertex::Vertex3D;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// 网格句柄，代际索引，悬垂访问返回 None 而不是脏数据
    pub struct MeshKey;
}

/// 一份待上传的网格
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
}

impl MeshData {
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

// 程序生成的几何
impl MeshData {
    // 24 个顶点（每面 4 个），面的顺序：Y+ Y- Z+ Z- X- X+
    const CUBE_POSITIONS: [[f32; 3]; 24] = [
        // Top face (Y+)
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, 0.5, 0.5],
        [0.5, 0.5, 0.5],
        // Bottom face (Y-)
        [0.5, -0.5, -0.5],
        [-0.5, -0.5, -0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        // Near face (Z+)
        [0.5, 0.5, 0.5],
        [-0.5, 0.5, 0.5],
        [-0.5, -0.5, 0.5],
        [0.5, -0.5, 0.5],
        // Far face (Z-)
        [0.5, 0.5, -0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, -0.5],
        [0.5, -0.5, -0.5],
        // Left face (X-)
        [-0.5, 0.5, 0.5],
        [-0.5, 0.5, -0.5],
        [-0.5, -0.5, -0.5],
        [-0.5, -0.5, 0.5],
        // Right face (X+)
        [0.5, 0.5, 0.5],
        [0.5, 0.5, -0.5],
        [0.5, -0.5, -0.5],
        [0.5, -0.5, 0.5],
    ];

    const CUBE_NORMALS: [[f32; 3]; 6] = [
        [0.0, 1.0, 0.0],
        [0.0, -1.0, 0.0],
        [0.0, 0.0, 1.0],
        [0.0, 0.0, -1.0],
        [-1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
    ];

    // 每个面的 UV 顺序相同
    const CUBE_FACE_UVS: [[f32; 2]; 4] = [[1.0, 0.0], [0.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

    const CUBE_INDICES: [u32; 36] = [
        0, 1, 2, 0, 2, 3, // top
        4, 6, 5, 4, 7, 6, // bottom
        8, 9, 10, 8, 10, 11, // near
        12, 14, 13, 12, 15, 14, // far
        16, 17, 18, 16, 18, 19, // left
        20, 22, 21, 20, 23, 22, // right
    ];

    /// 边长为 size、以原点为中心的立方体
    pub fn cube(size: f32) -> Self {
        let vertices = Self::CUBE_POSITIONS
            .iter()
            .enumerate()
            .map(|(i, pos)| Vertex3D {
                position: [pos[0] * size, pos[1] * size, pos[2] * size],
                normal: Self::CUBE_NORMALS[i / 4],
                uv: Self::CUBE_FACE_UVS[i % 4],
            })
            .collect();
        Self {
            vertices,
            indices: Self::CUBE_INDICES.to_vec(),
        }
    }

    /// 位于 XZ 平面、法线 +Y 的地面方块，边长 size
    ///
    /// ```text
    ///     z^
    /// D---+---C
    /// |   |   |
    /// ----+------>x
    /// |   |   |
    /// A---+---B
    /// ```
    pub fn floor(size: f32) -> Self {
        let half = size * 0.5;
        let positions = [
            [-half, 0.0, -half], // A
            [half, 0.0, -half],  // B
            [half, 0.0, half],   // C
            [-half, 0.0, half],  // D
        ];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let vertices = positions
            .iter()
            .zip(uvs.iter())
            .map(|(pos, uv)| Vertex3D {
                position: *pos,
                normal: [0.0, 1.0, 0.0],
                uv: *uv,
            })
            .collect();
        Self {
            vertices,
            // 从 +Y 看是 CCW：ACB, ADC
            indices: vec![0, 2, 1, 0, 3, 2],
        }
    }

    /// 顶点法线缺失时按面法线累加再归一化
    pub fn recompute_normals(&mut self) {
        let mut accum = vec![glam::Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = glam::Vec3::from(self.vertices[a].position);
            let pb = glam::Vec3::from(self.vertices[b].position);
            let pc = glam::Vec3::from(self.vertices[c].position);
            let face_normal = (pb - pa).cross(pc - pa);
            accum[a] += face_normal;
            accum[b] += face_normal;
            accum[c] += face_normal;
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = normal.normalize_or_zero().to_array();
        }
    }
}

/// 网格存储，key 的代际特性保证销毁后的 key 不会命中别的网格
#[derive(Default)]
pub struct MeshRegistry {
    meshes: SlotMap<MeshKey, MeshData>,
}

impl MeshRegistry {
    #[inline]
    pub fn insert(&mut self, mesh: MeshData) -> MeshKey {
        self.meshes.insert(mesh)
    }

    #[inline]
    pub fn get(&self, key: MeshKey) -> Option<&MeshData> {
        self.meshes.get(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_shape() {
        let cube = MeshData::cube(2.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.index_count(), 36);
        // 所有顶点都落在边长 2 的立方体表面上
        assert!(cube.vertices.iter().all(|v| v.position.iter().all(|c| c.abs() == 1.0)));
        // 法线都是单位轴向量
        assert!(cube.vertices.iter().all(|v| {
            let n = glam::Vec3::from(v.normal);
            (n.length() - 1.0).abs() < 1e-6
        }));
    }

    #[test]
    fn test_cube_winding_is_ccw_from_outside() {
        let cube = MeshData::cube(1.0);
        for tri in cube.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = glam::Vec3::from(cube.vertices[a].position);
            let pb = glam::Vec3::from(cube.vertices[b].position);
            let pc = glam::Vec3::from(cube.vertices[c].position);
            let face_normal = (pb - pa).cross(pc - pa);
            let stated = glam::Vec3::from(cube.vertices[a].normal);
            // 绕序产生的法线和顶点声明的法线同向
            assert!(face_normal.dot(stated) > 0.0);
        }
    }

    #[test]
    fn test_floor_faces_up() {
        let floor = MeshData::floor(10.0);
        assert_eq!(floor.vertices.len(), 4);
        assert_eq!(floor.index_count(), 6);
        assert!(floor.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
        assert!(floor.vertices.iter().all(|v| v.position[1] == 0.0));

        for tri in floor.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = glam::Vec3::from(floor.vertices[a].position);
            let pb = glam::Vec3::from(floor.vertices[b].position);
            let pc = glam::Vec3::from(floor.vertices[c].position);
            assert!((pb - pa).cross(pc - pa).y > 0.0);
        }
    }

    #[test]
    fn test_recompute_normals_matches_cube() {
        let mut cube = MeshData::cube(1.0);
        let stated: Vec<[f32; 3]> = cube.vertices.iter().map(|v| v.normal).collect();
        for vertex in &mut cube.vertices {
            vertex.normal = [0.0; 3];
        }
        cube.recompute_normals();
        // cube 的顶点不跨面共享，重算结果应与声明值一致
        for (vertex, expected) in cube.vertices.iter().zip(stated) {
            let n = glam::Vec3::from(vertex.normal);
            assert!((n - glam::Vec3::from(expected)).length() < 1e-5);
        }
    }

    #[test]
    fn test_registry_generational_keys() {
        let mut registry = MeshRegistry::default();
        let key = registry.insert(MeshData::cube(1.0));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(key).unwrap().index_count(), 36);
    }
}
