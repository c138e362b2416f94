// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mesh vertex buffers produced by geometry graphs.

use crate::math::{self, Matrix4};
use serde::{Deserialize, Serialize};

/// Indexed triangle mesh with flat attribute arrays
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexData {
    /// xyz per vertex
    pub positions: Vec<f64>,
    /// xyz per vertex (may be empty)
    pub normals: Vec<f64>,
    /// uv per vertex (may be empty)
    pub uvs: Vec<f64>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
}

impl VertexData {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether normals cover every vertex
    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.positions.len()
    }

    /// Whether uvs cover every vertex
    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() / 2 == self.vertex_count()
    }

    /// Position of a vertex
    pub fn position(&self, index: usize) -> [f64; 3] {
        read3(&self.positions, index)
    }

    /// Normal of a vertex, zero when absent
    pub fn normal(&self, index: usize) -> [f64; 3] {
        if self.has_normals() {
            read3(&self.normals, index)
        } else {
            [0.0; 3]
        }
    }

    /// UV of a vertex, zero when absent
    pub fn uv(&self, index: usize) -> [f64; 2] {
        if self.has_uvs() {
            [self.uvs[index * 2], self.uvs[index * 2 + 1]]
        } else {
            [0.0; 2]
        }
    }

    /// Append another mesh, offsetting its indices.
    ///
    /// Attributes only one side provides are zero-filled on the other.
    pub fn merge(&mut self, other: &VertexData) {
        let offset = self.vertex_count() as u32;
        let own_count = self.vertex_count();

        if other.has_normals() && !self.has_normals() {
            self.normals = vec![0.0; own_count * 3];
        }
        if other.has_uvs() && !self.has_uvs() {
            self.uvs = vec![0.0; own_count * 2];
        }
        let keep_normals = self.has_normals() || (own_count == 0 && other.has_normals());
        let keep_uvs = self.has_uvs() || (own_count == 0 && other.has_uvs());

        self.positions.extend_from_slice(&other.positions);
        if keep_normals {
            if other.has_normals() {
                self.normals.extend_from_slice(&other.normals);
            } else {
                self.normals.extend(std::iter::repeat(0.0).take(other.vertex_count() * 3));
            }
        }
        if keep_uvs {
            if other.has_uvs() {
                self.uvs.extend_from_slice(&other.uvs);
            } else {
                self.uvs.extend(std::iter::repeat(0.0).take(other.vertex_count() * 2));
            }
        }
        self.indices.extend(other.indices.iter().map(|i| i + offset));
    }

    /// Apply a transform to positions and normals
    pub fn transform(&mut self, m: &Matrix4) {
        for i in 0..self.vertex_count() {
            let position = math::transform_point(m, read3(&self.positions, i));
            write3(&mut self.positions, i, position);
        }
        if self.has_normals() {
            for i in 0..self.vertex_count() {
                let normal = math::transform_normal(m, read3(&self.normals, i));
                write3(&mut self.normals, i, normal);
            }
        }
    }

    /// Interleaved `f32` buffer: position, normal, uv per vertex
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.vertex_count() * 8);
        for i in 0..self.vertex_count() {
            let p = self.position(i);
            let n = self.normal(i);
            let uv = self.uv(i);
            out.extend(p.iter().chain(&n).chain(&uv).map(|v| *v as f32));
        }
        out
    }

    /// Axis-aligned bounds, `None` for an empty mesh
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        if self.vertex_count() == 0 {
            return None;
        }
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for i in 0..self.vertex_count() {
            let p = self.position(i);
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some((min, max))
    }
}

pub(crate) fn read3(data: &[f64], index: usize) -> [f64; 3] {
    [data[index * 3], data[index * 3 + 1], data[index * 3 + 2]]
}

pub(crate) fn write3(data: &mut [f64], index: usize, v: [f64; 3]) {
    data[index * 3..index * 3 + 3].copy_from_slice(&v);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> VertexData {
        VertexData {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            uvs: vec![],
            indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_merge_offsets_indices() {
        let mut a = triangle();
        a.merge(&triangle());
        assert_eq!(a.vertex_count(), 6);
        assert_eq!(a.indices, vec![0, 1, 2, 3, 4, 5]);
        assert!(a.has_normals());
        assert!(!a.has_uvs());
    }

    #[test]
    fn test_merge_into_empty() {
        let mut a = VertexData::default();
        a.merge(&triangle());
        assert_eq!(a, triangle());
    }

    #[test]
    fn test_merge_zero_fills_missing_attribute() {
        let mut a = triangle();
        let mut b = triangle();
        b.uvs = vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        a.merge(&b);
        assert!(a.has_uvs());
        assert_eq!(a.uv(0), [0.0, 0.0]);
        assert_eq!(a.uv(4), [1.0, 0.0]);
    }

    #[test]
    fn test_transform_and_bounds() {
        let mut a = triangle();
        a.transform(&math::translation([0.0, 0.0, 5.0]));
        let (min, max) = a.bounds().unwrap();
        assert_eq!(min, [0.0, 0.0, 5.0]);
        assert_eq!(max, [1.0, 1.0, 5.0]);
        assert_eq!(a.normal(0), [0.0, 0.0, 1.0]);
        assert_eq!(a.interleaved().len(), 24);
    }

    #[test]
    fn test_transform_rotates_normals() {
        let mut a = triangle();
        a.transform(&math::rotation([std::f64::consts::FRAC_PI_2, 0.0, 0.0]));
        let close = |x: [f64; 3], y: [f64; 3]| x.iter().zip(y).all(|(p, q)| (p - q).abs() < 1e-9);
        assert!(close(a.position(1), [1.0, 0.0, 0.0]));
        assert!(close(a.position(2), [0.0, 0.0, 1.0]));
        assert!(close(a.normal(0), [0.0, -1.0, 0.0]));
    }
}
