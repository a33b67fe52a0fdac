//! Pairwise doublet compatibility predicate.
//!
//! The host-side reference form of the predicate; the kernels in
//! [`kernels`](super::kernels) apply the same cuts on device. Both passes
//! use it unchanged, which is what makes "count, then fill" exact.

use crate::config::SeedFinderConfig;
use crate::spacepoint::InternalSpacepoint;

/// Which side of the middle spacepoint a partner candidate sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerSide {
    /// Partner at smaller radius than the middle spacepoint.
    Bottom,
    /// Partner at larger radius.
    Top,
}

/// Whether `partner` forms a valid doublet with `middle` on `side`.
///
/// Cuts, in order:
/// - radial separation within `[delta_r_min, delta_r_max]` (oriented so a
///   bottom partner must sit below the middle radius and a top partner
///   above it)
/// - |cot(theta)| of the connecting segment within `cot_theta_max`
/// - extrapolated longitudinal origin inside the collision region
pub fn doublet_compatible(
    config: &SeedFinderConfig,
    middle: &InternalSpacepoint,
    partner: &InternalSpacepoint,
    side: PartnerSide,
) -> bool {
    let delta_r = match side {
        PartnerSide::Bottom => middle.radius - partner.radius,
        PartnerSide::Top => partner.radius - middle.radius,
    };
    if delta_r <= 0.0 || delta_r < config.delta_r_min || delta_r > config.delta_r_max {
        return false;
    }

    let delta_z = match side {
        PartnerSide::Bottom => middle.z - partner.z,
        PartnerSide::Top => partner.z - middle.z,
    };
    let cot_theta = delta_z / delta_r;
    if cot_theta.abs() > config.cot_theta_max {
        return false;
    }

    let z_origin = middle.z - middle.radius * cot_theta;
    z_origin >= config.collision_region_min && z_origin <= config.collision_region_max
}
