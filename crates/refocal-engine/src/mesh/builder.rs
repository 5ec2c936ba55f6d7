use crate::camera::Intrinsics;
use crate::frame::{is_valid_depth, DepthMap, ValidityMask};

use super::{DiscontinuityPolicy, Mesh, Triangle, Vertex};

const NO_VERTEX: i32 = -1;

/// Converts a depth map into a camera-space triangle mesh.
///
/// Each 2x2 block `(u,v) (u+1,v) (u,v+1) (u+1,v+1)` yields up to two triangles,
/// always split along the top-left/bottom-right diagonal:
/// `(top-left, top-right, bottom-right)` then `(top-left, bottom-right, bottom-left)`.
/// The split must not change; reference renders depend on it.
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    policy: DiscontinuityPolicy,
}

impl MeshBuilder {
    pub fn new(policy: DiscontinuityPolicy) -> Self {
        Self { policy }
    }

    #[inline]
    pub fn policy(&self) -> DiscontinuityPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: DiscontinuityPolicy) {
        self.policy = policy;
    }

    /// Builds the mesh for `depth` seen through `k`.
    ///
    /// `k` must describe the depth map's resolution (it is used for UVs). An optional
    /// external mask further restricts which pixels produce vertices.
    ///
    /// A 0x0 map, or one narrower or shorter than two pixels, yields a mesh without
    /// triangles; the caller decides whether that is fatal.
    pub fn build(&self, depth: &DepthMap, k: &Intrinsics, mask: Option<&ValidityMask>) -> Mesh {
        let mut mesh = Mesh::default();
        if depth.is_empty() {
            log::warn!("mesh builder: empty depth map");
            return mesh;
        }

        let w = depth.width as usize;
        let h = depth.height as usize;
        let mask = mask.filter(|m| {
            let fits = m.width == depth.width && m.height == depth.height;
            if !fits {
                log::warn!(
                    "mesh builder: ignoring {}x{} mask for {}x{} depth map",
                    m.width, m.height, depth.width, depth.height
                );
            }
            fits
        });

        let inv_w = 1.0 / k.width as f32;
        let inv_h = 1.0 / k.height as f32;

        // Pass 1: one vertex per valid pixel; grid keeps its index.
        let mut grid = vec![NO_VERTEX; w * h];
        mesh.vertices.reserve(w * h);
        for v in 0..h {
            for u in 0..w {
                let i = v * w + u;
                let z = depth.data[i];
                let valid = is_valid_depth(z) && mask.is_none_or(|m| m.data[i] != 0);
                if !valid {
                    continue;
                }
                let uc = u as f32 + 0.5;
                let vc = v as f32 + 0.5;
                grid[i] = mesh.vertices.len() as i32;
                mesh.vertices.push(Vertex::new(k.back_project(uc, vc, z), [uc * inv_w, vc * inv_h]));
            }
        }

        // Pass 2: quads.
        if w >= 2 && h >= 2 {
            mesh.triangles.reserve((w - 1) * (h - 1) * 2);
            for v in 0..h - 1 {
                for u in 0..w - 1 {
                    let tl = v * w + u;
                    let tr = tl + 1;
                    let bl = tl + w;
                    let br = bl + 1;
                    self.push_triangle(&mut mesh, &grid, &depth.data, [tl, tr, br]);
                    self.push_triangle(&mut mesh, &grid, &depth.data, [tl, br, bl]);
                }
            }
        }

        mesh.vertices.shrink_to_fit();
        mesh.triangles.shrink_to_fit();

        log::debug!(
            "generated mesh: {} vertices, {} triangles",
            mesh.num_vertices(),
            mesh.num_triangles()
        );
        mesh
    }

    fn push_triangle(&self, mesh: &mut Mesh, grid: &[i32], depth: &[f32], px: [usize; 3]) {
        let idx = px.map(|p| grid[p]);
        if idx.iter().any(|&i| i == NO_VERTEX) {
            return;
        }
        if !self.policy.connects(depth[px[0]], depth[px[1]], depth[px[2]]) {
            return;
        }
        mesh.triangles.push(Triangle(idx.map(|i| i as u32)));
    }
}
