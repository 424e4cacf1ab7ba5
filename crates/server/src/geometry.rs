//! Radius/area arithmetic and the speed curve.
//!
//! Mass is always `PI * r * r`; every eat, split, eject and merge in the
//! simulation goes through these conversions, which is what makes the
//! mass-conservation invariants hold.

use std::f32::consts::PI;

/// Mass of a circle of radius `r`.
#[inline]
pub fn area_of(r: f32) -> f32 {
    PI * r * r
}

/// Radius of a circle with mass `a`.
#[inline]
pub fn radius_of_area(a: f32) -> f32 {
    (a / PI).sqrt()
}

/// Radius after one circle absorbs another's full mass.
#[inline]
pub fn combined_radius(r1: f32, r2: f32) -> f32 {
    radius_of_area(area_of(r1) + area_of(r2))
}

/// Radius after removing `fraction` of a circle's mass.
#[inline]
pub fn radius_after_fraction(r: f32, fraction: f32) -> f32 {
    radius_of_area(area_of(r) * (1.0 - fraction))
}

/// Radius of the piece carrying `fraction` of a circle's mass.
#[inline]
pub fn radius_from_fraction(r: f32, fraction: f32) -> f32 {
    radius_of_area(area_of(r) * fraction)
}

/// Movement-speed tuning constants. Speed decreases with radius and is
/// floored at `min_speed`.
#[derive(Debug, Clone, Copy)]
pub struct SpeedTuning {
    pub min_speed: f32,
    pub base_speed: f32,
    pub speed_divisor: f32,
}

/// Blob movement speed for a given radius.
#[inline]
pub fn speed_for(radius: f32, tuning: SpeedTuning) -> f32 {
    (tuning.base_speed - radius / tuning.speed_divisor).max(tuning.min_speed)
}
