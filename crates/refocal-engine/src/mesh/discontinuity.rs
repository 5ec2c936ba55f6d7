use crate::frame::is_valid_depth;

/// Decides whether two neighbouring depth samples belong to different surfaces.
///
/// An edge is broken when either sample is invalid, when the relative step
/// `|z1-z2| / min(z1,z2)` exceeds `tau_rel`, or when the absolute step exceeds
/// `tau_abs * max(1, max(z1,z2)/2)`. The absolute bound grows past 2m so sensor
/// noise at range does not fragment the mesh.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DiscontinuityPolicy {
    /// Relative threshold (fraction).
    pub tau_rel: f32,
    /// Absolute threshold (meters) at depths up to 2m.
    pub tau_abs: f32,
}

impl Default for DiscontinuityPolicy {
    fn default() -> Self {
        Self { tau_rel: 0.05, tau_abs: 0.1 }
    }
}

impl DiscontinuityPolicy {
    #[inline]
    pub const fn new(tau_rel: f32, tau_abs: f32) -> Self {
        Self { tau_rel, tau_abs }
    }

    /// Absolute bound used for a pair whose farther sample is `max_z`.
    #[inline]
    pub fn absolute_bound(&self, max_z: f32) -> f32 {
        self.tau_abs * (max_z / 2.0).max(1.0)
    }

    pub fn is_discontinuous(&self, z1: f32, z2: f32) -> bool {
        if !is_valid_depth(z1) || !is_valid_depth(z2) {
            return true;
        }
        let diff = (z1 - z2).abs();
        let min_z = z1.min(z2);
        let max_z = z1.max(z2);
        diff / min_z > self.tau_rel || diff > self.absolute_bound(max_z)
    }

    /// True when none of the three triangle edges is discontinuous.
    #[inline]
    pub fn connects(&self, z0: f32, z1: f32, z2: f32) -> bool {
        !self.is_discontinuous(z0, z1)
            && !self.is_discontinuous(z1, z2)
            && !self.is_discontinuous(z2, z0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_policy() -> DiscontinuityPolicy {
        DiscontinuityPolicy::new(0.05, 0.1)
    }

    #[test]
    fn equal_depths_are_continuous() {
        let p = default_policy();
        for z in [0.001, 0.5, 2.0, 10.0, 250.0] {
            assert!(!p.is_discontinuous(z, z), "z={z}");
        }
    }

    #[test]
    fn invalid_samples_are_discontinuous() {
        let p = default_policy();
        assert!(p.is_discontinuous(0.0, 2.0));
        assert!(p.is_discontinuous(2.0, -0.5));
        assert!(p.is_discontinuous(f32::NAN, 2.0));
        assert!(p.is_discontinuous(2.0, f32::INFINITY));
        assert!(p.is_discontinuous(0.0, 0.0));
    }

    #[test]
    fn small_step_is_continuous() {
        assert!(!default_policy().is_discontinuous(2.0, 2.05));
    }

    #[test]
    fn large_relative_step_is_discontinuous() {
        assert!(default_policy().is_discontinuous(2.0, 2.5));
    }

    #[test]
    fn far_step_is_absorbed_by_adaptive_bound() {
        // rel = 0.02 <= 0.05, bound = 0.1 * 10.2/2 = 0.51 >= 0.2
        let p = default_policy();
        assert!((p.absolute_bound(10.2) - 0.51).abs() < 1e-6);
        assert!(!p.is_discontinuous(10.0, 10.2));
    }

    #[test]
    fn absolute_bound_is_flat_up_to_two_meters() {
        let p = default_policy();
        assert_eq!(p.absolute_bound(0.5), 0.1);
        assert_eq!(p.absolute_bound(2.0), 0.1);
        assert_eq!(p.absolute_bound(4.0), 0.2);
    }

    #[test]
    fn absolute_threshold_breaks_near_edges() {
        // Relative test disabled; only the absolute bound can fire.
        let p = DiscontinuityPolicy::new(1.0, 0.1);
        assert!(p.is_discontinuous(1.0, 1.15));
        assert!(!p.is_discontinuous(8.0, 8.3));
        assert!(p.is_discontinuous(8.0, 8.5));
    }

    #[test]
    fn thresholds_are_strict() {
        // Both tests sit exactly on their bound: rel = 4/4 = 1, bound = 1 * 8/2 = 4.
        let p = DiscontinuityPolicy::new(1.0, 1.0);
        assert!(!p.is_discontinuous(4.0, 8.0));
        assert!(p.is_discontinuous(4.0, 8.5));

        // Absolute bound exactly hit below 2m: diff 0.5, bound 0.5.
        let p = DiscontinuityPolicy::new(1.0, 0.5);
        assert!(!p.is_discontinuous(1.0, 1.5));
        assert!(p.is_discontinuous(1.0, 1.5625));
    }

    #[test]
    fn symmetric() {
        let p = default_policy();
        for (a, b) in [(2.0, 2.5), (10.0, 10.2), (1.0, 0.0), (3.0, 3.1)] {
            assert_eq!(p.is_discontinuous(a, b), p.is_discontinuous(b, a));
        }
    }

    #[test]
    fn triangle_needs_all_three_edges() {
        let p = default_policy();
        assert!(p.connects(2.0, 2.01, 2.02));
        assert!(!p.connects(2.0, 2.01, 3.0));
        assert!(!p.connects(2.0, 0.0, 2.0));
    }
}
