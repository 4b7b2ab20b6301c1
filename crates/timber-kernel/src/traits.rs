use crate::types::*;

/// Core geometry kernel trait: the construction and boolean operations joint
/// synthesis needs. Implemented by TruckKernel (wraps real truck) and
/// MockKernel (deterministic test double).
pub trait Kernel {
    /// Create a planar face bounded by a closed polygon.
    fn make_polygon_face(&mut self, points: &[[f64; 3]]) -> Result<KernelId, KernelError>;

    /// Extrude a planar face along a direction vector. Consumes the face.
    fn extrude_face(
        &mut self,
        face: KernelId,
        direction: [f64; 3],
        depth: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Cylinder whose base circle is centred on `base_center`, extending
    /// `height` along `axis`.
    fn make_cylinder(
        &mut self,
        base_center: [f64; 3],
        axis: [f64; 3],
        radius: f64,
        height: f64,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Sew planar polygons into a closed shell and convert it to a solid.
    /// Polygons must share corner points exactly and wind consistently.
    fn sew_solid(&mut self, faces: &[Vec<[f64; 3]>]) -> Result<KernelSolidHandle, KernelError>;

    /// Boolean subtraction: a minus b.
    fn boolean_subtract(
        &mut self,
        a: &KernelSolidHandle,
        b: &KernelSolidHandle,
    ) -> Result<KernelSolidHandle, KernelError>;

    /// Group several solids into one shape without merging them.
    fn make_compound(
        &mut self,
        parts: &[KernelSolidHandle],
    ) -> Result<KernelSolidHandle, KernelError>;

    /// A trivial unit cube centred on `center`. Never fails; used wherever a
    /// real shape could not be produced.
    fn make_placeholder(&mut self, center: [f64; 3]) -> KernelSolidHandle;
}

/// Read-only queries on kernel geometry.
pub trait KernelIntrospect {
    /// Axis-aligned bounds of a solid, or `None` for an unknown handle.
    fn bounding_box(&self, solid: &KernelSolidHandle) -> Option<BoundingBox>;

    /// Number of faces on the solid's boundary.
    fn face_count(&self, solid: &KernelSolidHandle) -> usize;

    /// Whether `point` lies within the solid's bounds, widened by `tol`.
    /// Unknown handles contain nothing.
    fn contains(&self, solid: &KernelSolidHandle, point: [f64; 3], tol: f64) -> bool {
        self.bounding_box(solid)
            .is_some_and(|bb| bb.contains_point(point, tol))
    }
}
