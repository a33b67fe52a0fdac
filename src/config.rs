//! Seed finder configuration.

use serde::{Deserialize, Serialize};

/// Kinematic bounds gating doublet compatibility.
///
/// Lengths are in millimeters, matching the detector frame the spacepoints
/// are expressed in. Defaults correspond to a typical barrel seeding setup
/// for a 400 MeV minimum transverse momentum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFinderConfig {
    /// Minimum radial separation between a middle spacepoint and a partner.
    pub delta_r_min: f32,
    /// Maximum radial separation between a middle spacepoint and a partner.
    pub delta_r_max: f32,
    /// Maximum |cot(theta)| of the segment connecting middle and partner.
    pub cot_theta_max: f32,
    /// Lower z bound of the beam collision region.
    pub collision_region_min: f32,
    /// Upper z bound of the beam collision region.
    pub collision_region_max: f32,
    /// Maximum transverse impact parameter. Carried for the downstream
    /// triplet stage; does not gate doublets.
    pub impact_max: f32,
}

impl Default for SeedFinderConfig {
    fn default() -> Self {
        Self {
            delta_r_min: 1.0,
            delta_r_max: 280.0,
            cot_theta_max: 7.40627,
            collision_region_min: -250.0,
            collision_region_max: 250.0,
            impact_max: 10.0,
        }
    }
}
