use crate::camera::Intrinsics;
use crate::frame::{ColorImage, DepthMap, ValidityMask};

use super::{DiscontinuityPolicy, Mesh, MeshBuilder, MeshError};

/// Summary of a built `DepthMesh`.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct DepthStats {
    pub num_vertices: usize,
    pub num_triangles: usize,
    /// Smallest vertex depth in meters (0 when the mesh is empty).
    pub min_depth: f32,
    /// Largest vertex depth in meters (0 when the mesh is empty).
    pub max_depth: f32,
}

/// Mesh, RGB texture and source intrinsics built from one RGB-D frame.
///
/// Only a successful `build` leaves the bundle valid; any error leaves it cleared.
#[derive(Debug, Clone, Default)]
pub struct DepthMesh {
    mesh: Mesh,
    texture: ColorImage,
    intrinsics: Option<Intrinsics>,
    stats: DepthStats,
}

impl DepthMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(
        &mut self,
        rgb: &ColorImage,
        depth: &DepthMap,
        k: Intrinsics,
        policy: DiscontinuityPolicy,
    ) -> Result<(), MeshError> {
        self.build_masked(rgb, depth, k, policy, None)
    }

    /// Like `build`, with an external per-pixel validity mask ANDed onto the depth test.
    pub fn build_masked(
        &mut self,
        rgb: &ColorImage,
        depth: &DepthMap,
        k: Intrinsics,
        policy: DiscontinuityPolicy,
        mask: Option<&ValidityMask>,
    ) -> Result<(), MeshError> {
        self.clear();

        if rgb.is_empty() || depth.is_empty() {
            return Err(MeshError::EmptyInput);
        }
        if (rgb.width, rgb.height) != (depth.width, depth.height) {
            return Err(MeshError::DimensionMismatch {
                rgb: (rgb.width, rgb.height),
                depth: (depth.width, depth.height),
            });
        }

        // The depth map is authoritative for resolution.
        let k = Intrinsics { width: depth.width, height: depth.height, ..k };
        let mesh = MeshBuilder::new(policy).build(depth, &k, mask);

        if mesh.vertices.is_empty() {
            return Err(MeshError::NoValidVertices);
        }
        if mesh.triangles.is_empty() {
            return Err(MeshError::NoTriangles { vertices: mesh.num_vertices() });
        }

        let (min_depth, max_depth) = mesh
            .vertices
            .iter()
            .map(|v| v.z())
            .filter(|&z| z > 0.0)
            .fold((f32::INFINITY, 0.0f32), |(lo, hi), z| (lo.min(z), hi.max(z)));

        self.stats = DepthStats {
            num_vertices: mesh.num_vertices(),
            num_triangles: mesh.num_triangles(),
            min_depth,
            max_depth,
        };
        self.texture = rgb.to_rgb();
        self.mesh = mesh;
        self.intrinsics = Some(k);

        log::info!(
            "depth mesh: {}x{}, {} vertices, {} triangles, depth [{:.3}, {:.3}] m",
            k.width,
            k.height,
            self.stats.num_vertices,
            self.stats.num_triangles,
            min_depth,
            max_depth
        );
        Ok(())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.intrinsics.is_some()
    }

    #[inline]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// 3-channel RGB texture matching the depth resolution.
    #[inline]
    pub fn texture(&self) -> &ColorImage {
        &self.texture
    }

    /// Source intrinsics, with width/height taken from the depth map.
    #[inline]
    pub fn intrinsics(&self) -> Option<&Intrinsics> {
        self.intrinsics.as_ref()
    }

    #[inline]
    pub fn stats(&self) -> DepthStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.mesh.clear();
        self.texture = ColorImage::default();
        self.intrinsics = None;
        self.stats = DepthStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(w: u32, h: u32) -> ColorImage {
        ColorImage::new(w, h, 3, vec![128; (w * h * 3) as usize]).unwrap()
    }

    fn k() -> Intrinsics {
        Intrinsics::new(50.0, 50.0, 2.0, 2.0, 4, 4)
    }

    #[test]
    fn build_fills_every_part() {
        let mut depth = DepthMap::filled(4, 4, 2.0);
        depth.data[15] = 3.0;
        let mut b = DepthMesh::new();
        b.build(&rgb(4, 4), &depth, k(), DiscontinuityPolicy::default()).unwrap();

        assert!(b.is_valid());
        assert_eq!(b.texture().channels, 3);
        assert_eq!(b.texture().data.len(), 4 * 4 * 3);
        let s = b.stats();
        assert_eq!(s.num_vertices, 16);
        assert_eq!(s.num_triangles, b.mesh().num_triangles());
        assert_eq!(s.min_depth, 2.0);
        assert_eq!(s.max_depth, 3.0);
    }

    #[test]
    fn resolution_follows_depth_map() {
        let k = Intrinsics::new(50.0, 50.0, 2.0, 2.0, 1920, 1080);
        let mut b = DepthMesh::new();
        b.build(&rgb(4, 4), &DepthMap::filled(4, 4, 1.0), k, DiscontinuityPolicy::default())
            .unwrap();
        let got = b.intrinsics().unwrap();
        assert_eq!((got.width, got.height), (4, 4));
        assert_eq!(got.fx, 50.0);
    }

    #[test]
    fn gray_texture_is_expanded() {
        let gray = ColorImage::new(4, 4, 1, vec![7; 16]).unwrap();
        let mut b = DepthMesh::new();
        b.build(&gray, &DepthMap::filled(4, 4, 1.0), k(), DiscontinuityPolicy::default())
            .unwrap();
        assert_eq!(b.texture().channels, 3);
        assert!(b.texture().data.iter().all(|&c| c == 7));
    }

    #[test]
    fn empty_input_is_rejected() {
        let mut b = DepthMesh::new();
        let r = b.build(&ColorImage::default(), &DepthMap::filled(4, 4, 1.0), k(), Default::default());
        assert_eq!(r, Err(MeshError::EmptyInput));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let mut b = DepthMesh::new();
        let r = b.build(&rgb(4, 3), &DepthMap::filled(4, 4, 1.0), k(), Default::default());
        assert_eq!(r, Err(MeshError::DimensionMismatch { rgb: (4, 3), depth: (4, 4) }));
        assert!(!b.is_valid());
    }

    #[test]
    fn all_invalid_depth_has_no_vertices() {
        let mut b = DepthMesh::new();
        let r = b.build(&rgb(4, 4), &DepthMap::filled(4, 4, 0.0), k(), Default::default());
        assert_eq!(r, Err(MeshError::NoValidVertices));
    }

    #[test]
    fn isolated_pixels_have_no_triangles() {
        // Checkerboard of valid pixels: no quad has three valid corners.
        let data = (0..16).map(|i| if (i % 4 + i / 4) % 2 == 0 { 1.0 } else { 0.0 }).collect();
        let depth = DepthMap::new(4, 4, data).unwrap();
        let mut b = DepthMesh::new();
        let r = b.build(&rgb(4, 4), &depth, k(), Default::default());
        assert_eq!(r, Err(MeshError::NoTriangles { vertices: 8 }));
        assert!(!b.is_valid());
    }

    #[test]
    fn failed_rebuild_clears_previous_state() {
        let mut b = DepthMesh::new();
        b.build(&rgb(4, 4), &DepthMap::filled(4, 4, 1.0), k(), Default::default()).unwrap();
        assert!(b.is_valid());

        let r = b.build(&rgb(4, 4), &DepthMap::filled(4, 4, -1.0), k(), Default::default());
        assert!(r.is_err());
        assert!(!b.is_valid());
        assert!(b.mesh().vertices.is_empty());
        assert_eq!(b.stats(), DepthStats::default());
    }

    #[test]
    fn external_mask_is_honoured() {
        let mut mask = ValidityMask::new(4, 4, vec![1; 16]).unwrap();
        mask.data[..4].fill(0);
        let mut b = DepthMesh::new();
        b.build_masked(&rgb(4, 4), &DepthMap::filled(4, 4, 1.0), k(), Default::default(), Some(&mask))
            .unwrap();
        assert_eq!(b.stats().num_vertices, 12);
        assert_eq!(b.stats().num_triangles, 3 * 2 * 2);
    }
}
