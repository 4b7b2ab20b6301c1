//! MockKernel: deterministic test double implementing Kernel + KernelIntrospect.
//!
//! Records what each handle was built from and tracks the corner points of
//! every solid, so tests can assert on placement and extents without a real
//! B-rep library. Boolean results keep the bounds of their first operand.

use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;
use std::collections::HashMap;

/// Number of rim samples used to approximate cylinder bounds.
const CYLINDER_SAMPLES: usize = 16;

/// How a mock solid was produced.
#[derive(Debug, Clone, PartialEq)]
pub enum MockShapeKind {
    Prism {
        profile: Vec<[f64; 3]>,
        direction: [f64; 3],
        depth: f64,
    },
    Cylinder {
        base_center: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    },
    Sewn {
        faces: Vec<Vec<[f64; 3]>>,
    },
    Difference {
        base: u64,
        tool: u64,
    },
    Compound {
        parts: Vec<u64>,
    },
    Placeholder,
}

#[derive(Debug, Clone)]
struct MockSolid {
    kind: MockShapeKind,
    points: Vec<[f64; 3]>,
    face_count: usize,
}

/// Deterministic test double for the geometry kernel.
pub struct MockKernel {
    next_id: u64,
    next_handle: u64,
    solids: HashMap<u64, MockSolid>,
    /// Faces created by make_polygon_face, awaiting extrude.
    standalone_faces: HashMap<u64, Vec<[f64; 3]>>,
    fail_booleans: bool,
    fail_sewing: bool,
    boolean_calls: usize,
}

impl MockKernel {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            next_handle: 1,
            solids: HashMap::new(),
            standalone_faces: HashMap::new(),
            fail_booleans: false,
            fail_sewing: false,
            boolean_calls: 0,
        }
    }

    /// Make every subsequent boolean return `BooleanFailed`.
    pub fn set_fail_booleans(&mut self, fail: bool) {
        self.fail_booleans = fail;
    }

    /// Make every subsequent sew return `SolidFailed`.
    pub fn set_fail_sewing(&mut self, fail: bool) {
        self.fail_sewing = fail;
    }

    /// Booleans attempted so far, including failed ones.
    pub fn boolean_calls(&self) -> usize {
        self.boolean_calls
    }

    pub fn solid_count(&self) -> usize {
        self.solids.len()
    }

    pub fn shape_kind(&self, handle: &KernelSolidHandle) -> Option<&MockShapeKind> {
        self.solids.get(&handle.id()).map(|s| &s.kind)
    }

    /// Corner points tracked for a solid.
    pub fn points(&self, handle: &KernelSolidHandle) -> Option<&[[f64; 3]]> {
        self.solids.get(&handle.id()).map(|s| s.points.as_slice())
    }

    /// Follow difference chains back to the first operand.
    pub fn base_of(&self, handle: &KernelSolidHandle) -> KernelSolidHandle {
        let mut id = handle.id();
        while let Some(MockShapeKind::Difference { base, .. }) =
            self.solids.get(&id).map(|s| &s.kind)
        {
            id = *base;
        }
        KernelSolidHandle(id)
    }

    /// Tools subtracted along a difference chain, innermost first.
    pub fn subtracted_tools(&self, handle: &KernelSolidHandle) -> Vec<KernelSolidHandle> {
        let mut tools = Vec::new();
        let mut id = handle.id();
        while let Some(MockShapeKind::Difference { base, tool }) =
            self.solids.get(&id).map(|s| &s.kind)
        {
            tools.push(KernelSolidHandle(*tool));
            id = *base;
        }
        tools.reverse();
        tools
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    fn store(&mut self, solid: MockSolid) -> KernelSolidHandle {
        let h = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        self.solids.insert(h.id(), solid);
        h
    }

    fn get(&self, handle: &KernelSolidHandle) -> Result<&MockSolid, KernelError> {
        self.solids
            .get(&handle.id())
            .ok_or(KernelError::EntityNotFound {
                id: KernelId(handle.id()),
            })
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn unit(v: [f64; 3]) -> Option<[f64; 3]> {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len < 1e-12 {
        None
    } else {
        Some([v[0] / len, v[1] / len, v[2] / len])
    }
}

fn offset(p: [f64; 3], d: [f64; 3], s: f64) -> [f64; 3] {
    [p[0] + d[0] * s, p[1] + d[1] * s, p[2] + d[2] * s]
}

impl Kernel for MockKernel {
    fn make_polygon_face(&mut self, points: &[[f64; 3]]) -> Result<KernelId, KernelError> {
        if points.len() < 3 {
            return Err(KernelError::InvalidGeometry {
                reason: "polygon has fewer than 3 points".to_string(),
            });
        }
        let id = self.alloc_id();
        self.standalone_faces.insert(id.0, points.to_vec());
        Ok(id)
    }

    fn extrude_face(
        &mut self,
        face: KernelId,
        direction: [f64; 3],
        depth: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let profile = self
            .standalone_faces
            .remove(&face.0)
            .ok_or(KernelError::EntityNotFound { id: face })?;
        let dir = unit(direction).ok_or_else(|| KernelError::InvalidGeometry {
            reason: "extrude direction has zero length".to_string(),
        })?;

        let mut points = profile.clone();
        points.extend(profile.iter().map(|&p| offset(p, dir, depth)));
        let face_count = profile.len() + 2;
        Ok(self.store(MockSolid {
            kind: MockShapeKind::Prism {
                profile,
                direction: dir,
                depth,
            },
            points,
            face_count,
        }))
    }

    fn make_cylinder(
        &mut self,
        base_center: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let dir = unit(axis).ok_or_else(|| KernelError::InvalidGeometry {
            reason: "cylinder axis has zero length".to_string(),
        })?;
        if radius <= 0.0 || height <= 0.0 {
            return Err(KernelError::InvalidGeometry {
                reason: format!("cylinder radius {radius} / height {height} must be positive"),
            });
        }

        // Any vector not parallel to the axis seeds the rim basis.
        let seed = if dir[0].abs() < 0.9 {
            [1.0, 0.0, 0.0]
        } else {
            [0.0, 1.0, 0.0]
        };
        let u = unit([
            dir[1] * seed[2] - dir[2] * seed[1],
            dir[2] * seed[0] - dir[0] * seed[2],
            dir[0] * seed[1] - dir[1] * seed[0],
        ])
        .unwrap_or(seed);
        let v = [
            dir[1] * u[2] - dir[2] * u[1],
            dir[2] * u[0] - dir[0] * u[2],
            dir[0] * u[1] - dir[1] * u[0],
        ];

        let mut points = Vec::with_capacity(CYLINDER_SAMPLES * 2);
        for i in 0..CYLINDER_SAMPLES {
            let a = std::f64::consts::TAU * i as f64 / CYLINDER_SAMPLES as f64;
            let rim = offset(offset(base_center, u, radius * a.cos()), v, radius * a.sin());
            points.push(rim);
            points.push(offset(rim, dir, height));
        }

        Ok(self.store(MockSolid {
            kind: MockShapeKind::Cylinder {
                base_center,
                axis: dir,
                radius,
                height,
            },
            points,
            face_count: 3,
        }))
    }

    fn sew_solid(&mut self, faces: &[Vec<[f64; 3]>]) -> Result<KernelSolidHandle, KernelError> {
        if self.fail_sewing {
            return Err(KernelError::SolidFailed {
                reason: "mock sewing failure".to_string(),
            });
        }
        if faces.len() < 4 || faces.iter().any(|f| f.len() < 3) {
            return Err(KernelError::SolidFailed {
                reason: "shell needs at least 4 polygons of 3+ points".to_string(),
            });
        }
        if polygon_mesh_volume(faces).abs() < 1e-9 {
            return Err(KernelError::SolidFailed {
                reason: "shell encloses no volume".to_string(),
            });
        }

        let faces = orient_outward(faces);
        let points = faces.iter().flatten().copied().collect();
        let face_count = faces.len();
        Ok(self.store(MockSolid {
            kind: MockShapeKind::Sewn { faces },
            points,
            face_count,
        }))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        self.boolean_calls += 1;
        let base = self.get(a)?.clone();
        let tool_faces = self.get(b)?.face_count;
        if self.fail_booleans {
            return Err(KernelError::BooleanFailed {
                reason: "mock boolean failure".to_string(),
            });
        }

        Ok(self.store(MockSolid {
            kind: MockShapeKind::Difference {
                base: a.id(),
                tool: b.id(),
            },
            points: base.points,
            face_count: base.face_count + tool_faces,
        }))
    }

    fn make_compound(
        &mut self,
        parts: &[KernelSolidHandle],
    ) -> Result<KernelSolidHandle, KernelError> {
        if parts.is_empty() {
            return Err(KernelError::InvalidGeometry {
                reason: "compound needs at least one part".to_string(),
            });
        }
        let mut points = Vec::new();
        let mut face_count = 0;
        for part in parts {
            let solid = self.get(part)?;
            points.extend_from_slice(&solid.points);
            face_count += solid.face_count;
        }
        Ok(self.store(MockSolid {
            kind: MockShapeKind::Compound {
                parts: parts.iter().map(|p| p.id()).collect(),
            },
            points,
            face_count,
        }))
    }

    fn make_placeholder(&mut self, center: [f64; 3]) -> KernelSolidHandle {
        let mut points = Vec::with_capacity(8);
        for dx in [-0.5, 0.5] {
            for dy in [-0.5, 0.5] {
                for dz in [-0.5, 0.5] {
                    points.push([center[0] + dx, center[1] + dy, center[2] + dz]);
                }
            }
        }
        self.store(MockSolid {
            kind: MockShapeKind::Placeholder,
            points,
            face_count: 6,
        })
    }
}

impl KernelIntrospect for MockKernel {
    fn bounding_box(&self, solid: &KernelSolidHandle) -> Option<BoundingBox> {
        let s = self.solids.get(&solid.id())?;
        BoundingBox::from_points(s.points.iter())
    }

    fn face_count(&self, solid: &KernelSolidHandle) -> usize {
        self.solids.get(&solid.id()).map_or(0, |s| s.face_count)
    }
}
