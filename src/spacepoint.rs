//! Spacepoint types.
//!
//! A [`Spacepoint`] is a reconstructed 3D hit measurement as produced by the
//! upstream clustering/spacepoint-formation stages. An
//! [`InternalSpacepoint`] is the grid-resident form with the cylindrical
//! parameters the doublet predicate consumes precomputed.

use nalgebra::{Vector2, Vector3};

/// A reconstructed detector hit in global coordinates.
#[derive(Debug, Clone)]
pub struct Spacepoint {
    /// Global position (x, y, z).
    pub position: Vector3<f32>,
    /// Measurement variance in (z, r).
    pub variance: Vector2<f32>,
    /// Identifier of the detector surface this hit originated from.
    pub surface: u64,
}

impl Spacepoint {
    /// Create a spacepoint at the given global position.
    pub fn new(position: Vector3<f32>, variance: Vector2<f32>, surface: u64) -> Self {
        Self {
            position,
            variance,
            surface,
        }
    }

    /// Transverse radius sqrt(x^2 + y^2).
    pub fn radius(&self) -> f32 {
        (self.position.x * self.position.x + self.position.y * self.position.y).sqrt()
    }

    /// Azimuthal angle in (-pi, pi].
    pub fn phi(&self) -> f32 {
        self.position.y.atan2(self.position.x)
    }

    /// Global z coordinate.
    pub fn z(&self) -> f32 {
        self.position.z
    }
}

/// Grid-resident spacepoint with cached cylindrical parameters.
///
/// `link` refers back to the position of the originating [`Spacepoint`] in
/// the event collection; downstream stages report doublets in terms of
/// these links.
#[derive(Debug, Clone, Copy)]
pub struct InternalSpacepoint {
    /// Index of the originating spacepoint in the event collection.
    pub link: u32,
    /// Global x.
    pub x: f32,
    /// Global y.
    pub y: f32,
    /// Global z.
    pub z: f32,
    /// Transverse radius.
    pub radius: f32,
    /// Azimuthal angle.
    pub phi: f32,
}

impl InternalSpacepoint {
    /// Build the internal form of an event spacepoint.
    pub fn new(link: u32, sp: &Spacepoint) -> Self {
        Self {
            link,
            x: sp.position.x,
            y: sp.position.y,
            z: sp.position.z,
            radius: sp.radius(),
            phi: sp.phi(),
        }
    }
}
