//! TruckKernel: real geometry kernel wrapping truck's API.

use crate::primitives;
use crate::traits::{Kernel, KernelIntrospect};
use crate::types::*;
use std::collections::HashMap;

// Import truck types selectively to avoid shadowing std::result::Result
use truck_modeling::builder;
use truck_modeling::topology::{Face, Solid};
use truck_modeling::{InnerSpace, Point3, Vector3};

/// Tolerance handed to truck's boolean operations.
const BOOLEAN_TOLERANCE: f64 = 0.05;

/// A stored shape. Compounds keep their parts as separate solids.
#[derive(Clone)]
enum TruckShape {
    Solid(Solid),
    Compound(Vec<Solid>),
}

impl TruckShape {
    fn solids(&self) -> Vec<&Solid> {
        match self {
            TruckShape::Solid(s) => vec![s],
            TruckShape::Compound(parts) => parts.iter().collect(),
        }
    }
}

/// Real geometry kernel backed by the truck BREP library.
pub struct TruckKernel {
    next_handle: u64,
    next_id: u64,
    shapes: HashMap<u64, TruckShape>,
    /// Standalone faces created by make_polygon_face, awaiting extrude.
    standalone_faces: HashMap<u64, Face>,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            next_id: 1,
            shapes: HashMap::new(),
            standalone_faces: HashMap::new(),
        }
    }

    fn alloc_handle(&mut self) -> KernelSolidHandle {
        let h = KernelSolidHandle(self.next_handle);
        self.next_handle += 1;
        h
    }

    fn alloc_id(&mut self) -> KernelId {
        let id = KernelId(self.next_id);
        self.next_id += 1;
        id
    }

    fn store(&mut self, shape: TruckShape) -> KernelSolidHandle {
        let handle = self.alloc_handle();
        self.shapes.insert(handle.id(), shape);
        handle
    }

    pub(crate) fn store_solid(&mut self, solid: Solid) -> KernelSolidHandle {
        self.store(TruckShape::Solid(solid))
    }

    /// The solid behind a handle, if it is a single solid.
    pub fn get_solid(&self, handle: &KernelSolidHandle) -> Option<&Solid> {
        match self.shapes.get(&handle.id())? {
            TruckShape::Solid(s) => Some(s),
            TruckShape::Compound(_) => None,
        }
    }

    fn single_solid(&self, handle: &KernelSolidHandle) -> Result<Solid, KernelError> {
        match self.shapes.get(&handle.id()) {
            Some(TruckShape::Solid(s)) => Ok(s.clone()),
            Some(TruckShape::Compound(_)) => Err(KernelError::NotSupported {
                operation: "boolean on a compound".to_string(),
            }),
            None => Err(KernelError::EntityNotFound {
                id: KernelId(handle.id()),
            }),
        }
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn to_point(p: [f64; 3]) -> Point3 {
    Point3::new(p[0], p[1], p[2])
}

fn to_vector(v: [f64; 3]) -> Vector3 {
    Vector3::new(v[0], v[1], v[2])
}

impl Kernel for TruckKernel {
    fn make_polygon_face(&mut self, points: &[[f64; 3]]) -> Result<KernelId, KernelError> {
        let face = primitives::make_polygon_face(points)?;
        let id = self.alloc_id();
        self.standalone_faces.insert(id.0, face);
        Ok(id)
    }

    fn extrude_face(
        &mut self,
        face: KernelId,
        direction: [f64; 3],
        depth: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        let truck_face = self
            .standalone_faces
            .remove(&face.0)
            .ok_or(KernelError::EntityNotFound { id: face })?;

        let dir = to_vector(direction);
        if dir.magnitude() < 1e-12 {
            return Err(KernelError::InvalidGeometry {
                reason: "extrude direction has zero length".to_string(),
            });
        }
        let sweep_vec = dir.normalize() * depth;

        let solid = builder::tsweep(&truck_face, sweep_vec);
        Ok(self.store_solid(solid))
    }

    fn make_cylinder(
        &mut self,
        base_center: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError> {
        if radius <= 0.0 || height <= 0.0 {
            return Err(KernelError::InvalidGeometry {
                reason: format!("cylinder radius {radius} / height {height} must be positive"),
            });
        }
        let solid = primitives::make_cylinder(to_point(base_center), to_vector(axis), radius, height)?;
        Ok(self.store_solid(solid))
    }

    fn sew_solid(&mut self, faces: &[Vec<[f64; 3]>]) -> Result<KernelSolidHandle, KernelError> {
        let solid = primitives::sew_polygons(faces)?;
        Ok(self.store_solid(solid))
    }

    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError> {
        let mut result = self.single_solid(a)?;
        let tools: Vec<Solid> = self
            .shapes
            .get(&b.id())
            .ok_or(KernelError::EntityNotFound {
                id: KernelId(b.id()),
            })?
            .solids()
            .into_iter()
            .cloned()
            .collect();

        // A compound tool is subtracted one part at a time.
        for mut tool in tools {
            // Subtraction = A ∩ ¬B. not() mutates in place.
            tool.not();
            result = truck_shapeops::and(&result, &tool, BOOLEAN_TOLERANCE).ok_or_else(|| {
                KernelError::BooleanFailed {
                    reason: "truck and() returned None for subtraction".to_string(),
                }
            })?;
        }
        Ok(self.store_solid(result))
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
        let mut solids = Vec::new();
        for part in parts {
            let shape = self
                .shapes
                .get(&part.id())
                .ok_or(KernelError::EntityNotFound {
                    id: KernelId(part.id()),
                })?;
            solids.extend(shape.solids().into_iter().cloned());
        }
        Ok(self.store(TruckShape::Compound(solids)))
    }

    fn make_placeholder(&mut self, center: [f64; 3]) -> KernelSolidHandle {
        let origin = Point3::new(center[0] - 0.5, center[1] - 0.5, center[2] - 0.5);
        let solid = primitives::make_box(origin, 1.0, 1.0, 1.0);
        self.store_solid(solid)
    }
}

impl KernelIntrospect for TruckKernel {
    fn bounding_box(&self, solid: &KernelSolidHandle) -> Option<BoundingBox> {
        let shape = self.shapes.get(&solid.id())?;
        let points: Vec<[f64; 3]> = shape
            .solids()
            .into_iter()
            .flat_map(|s| s.boundaries().iter())
            .flat_map(|shell| shell.vertex_iter())
            .map(|v| {
                let p = v.point();
                [p.x, p.y, p.z]
            })
            .collect();
        BoundingBox::from_points(points.iter())
    }

    fn face_count(&self, solid: &KernelSolidHandle) -> usize {
        self.shapes.get(&solid.id()).map_or(0, |shape| {
            shape
                .solids()
                .into_iter()
                .flat_map(|s| s.boundaries().iter())
                .map(|shell| shell.face_iter().count())
                .sum()
        })
    }
}
