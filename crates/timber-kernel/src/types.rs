use serde::{Deserialize, Serialize};

/// Opaque handle to a solid in the geometry kernel.
/// NEVER persisted. Valid only for the current kernel session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelSolidHandle(pub(crate) u64);

impl KernelSolidHandle {
    pub(crate) fn id(&self) -> u64 {
        self.0
    }
}

/// Transient kernel-internal entity identifier (standalone faces awaiting
/// extrusion). NEVER persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(pub u64);

/// Errors from kernel operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KernelError {
    #[error("boolean operation failed: {reason}")]
    BooleanFailed { reason: String },

    #[error("solid construction failed: {reason}")]
    SolidFailed { reason: String },

    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("entity not found: {id:?}")]
    EntityNotFound { id: KernelId },

    #[error("operation not supported: {operation}")]
    NotSupported { operation: String },
}

/// Axis-aligned bounding box in model space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl BoundingBox {
    /// Smallest box enclosing `points`, or `None` when empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f64; 3]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bb = Self {
            min: first,
            max: first,
        };
        for p in iter {
            for i in 0..3 {
                bb.min[i] = bb.min[i].min(p[i]);
                bb.max[i] = bb.max[i].max(p[i]);
            }
        }
        Some(bb)
    }

    pub fn size(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    pub fn contains_point(&self, p: [f64; 3], tol: f64) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - tol && p[i] <= self.max[i] + tol)
    }
}

/// Signed volume enclosed by a set of planar polygons (divergence theorem
/// over a triangle fan per polygon). Positive when the polygons wind
/// counter-clockwise seen from outside.
pub fn polygon_mesh_volume(faces: &[Vec<[f64; 3]>]) -> f64 {
    let mut six_v = 0.0;
    for poly in faces {
        if poly.len() < 3 {
            continue;
        }
        let p0 = poly[0];
        for i in 1..poly.len() - 1 {
            let (p1, p2) = (poly[i], poly[i + 1]);
            let cross = [
                p1[1] * p2[2] - p1[2] * p2[1],
                p1[2] * p2[0] - p1[0] * p2[2],
                p1[0] * p2[1] - p1[1] * p2[0],
            ];
            six_v += p0[0] * cross[0] + p0[1] * cross[1] + p0[2] * cross[2];
        }
    }
    six_v / 6.0
}

/// Flip every polygon when the set winds inward, so the shell faces outward.
pub fn orient_outward(faces: &[Vec<[f64; 3]>]) -> Vec<Vec<[f64; 3]>> {
    if polygon_mesh_volume(faces) < 0.0 {
        faces
            .iter()
            .map(|poly| poly.iter().rev().copied().collect())
            .collect()
    } else {
        faces.to_vec()
    }
}
