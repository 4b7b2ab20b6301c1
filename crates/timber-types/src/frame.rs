//! Local coordinate frames derived from member datum lines.
//!
//! Every member carries a frame whose x axis runs along the datum, y across
//! the width and z through the height. Member solids and every joint cut are
//! expressed in these frames, so the derivation must be deterministic.

use serde::{Deserialize, Serialize};

use crate::vector::Vec3;

/// Datum segments shorter than this have no usable direction.
pub const DEGENERATE_LENGTH: f64 = 1e-6;

/// When |along · Z| exceeds this, the datum is treated as vertical and world Y
/// becomes the up hint.
pub const VERTICAL_DOT: f64 = 0.999;

/// Origin plus three orthonormal axes.
///
/// For a non-degenerate datum, `z_axis = y_axis × x_axis`, i.e. the triad
/// (width, along, height) is right-handed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalFrame {
    pub origin: Vec3,
    /// Along the datum, start to end.
    pub x_axis: Vec3,
    /// Across the member width.
    pub y_axis: Vec3,
    /// Through the member height.
    pub z_axis: Vec3,
}

impl LocalFrame {
    /// World axes at `origin`.
    pub fn world(origin: Vec3) -> Self {
        Self {
            origin,
            x_axis: Vec3::X,
            y_axis: Vec3::Y,
            z_axis: Vec3::Z,
        }
    }

    /// Derive the frame of a datum running from `start` to `end`.
    ///
    /// Falls back to world axes at `start` when the segment is degenerate.
    pub fn from_datum(start: Vec3, end: Vec3) -> Self {
        let Some(along) = (end - start).normalized_with(DEGENERATE_LENGTH) else {
            return Self::world(start);
        };

        let up = if along.dot(&Vec3::Z).abs() > VERTICAL_DOT {
            Vec3::Y
        } else {
            Vec3::Z
        };

        // `along` is never parallel to `up` here, so both crosses are non-zero.
        let width = along.cross(&up).normalized().unwrap_or(Vec3::Y);
        let height = width.cross(&along).normalized().unwrap_or(Vec3::Z);

        Self {
            origin: start,
            x_axis: along,
            y_axis: width,
            z_axis: height,
        }
    }

    /// Map local (along, width, height) coordinates to a world point.
    pub fn point_at(&self, along: f64, width: f64, height: f64) -> Vec3 {
        self.origin + self.x_axis * along + self.y_axis * width + self.z_axis * height
    }

    /// Express a world point in local (along, width, height) coordinates.
    pub fn to_local(&self, point: Vec3) -> [f64; 3] {
        let d = point - self.origin;
        [d.dot(&self.x_axis), d.dot(&self.y_axis), d.dot(&self.z_axis)]
    }
}
