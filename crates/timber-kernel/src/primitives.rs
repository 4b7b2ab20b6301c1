//! Higher-level builders on top of truck's sweep and topology API.
//!
//! truck has no built-in box/cylinder, so everything is successive sweeps or
//! faces attached to hand-built wires.

use std::collections::HashMap;
use std::f64::consts::PI;
use truck_modeling::builder;
use truck_modeling::topology::{Edge, Face, Shell, Solid, Vertex, Wire};
use truck_modeling::{InnerSpace, Point3, Rad, Vector3};

use crate::types::{orient_outward, KernelError};

/// Corner points closer than this are welded into one vertex when sewing.
const WELD_TOLERANCE: f64 = 1e-9;

/// Create an axis-aligned box via successive translational sweeps.
/// Minimum corner at `origin`, extending (w,h,d).
pub fn make_box(origin: Point3, w: f64, h: f64, d: f64) -> Solid {
    let v = builder::vertex(origin);
    let edge = builder::tsweep(&v, Vector3::new(w, 0.0, 0.0));
    let face = builder::tsweep(&edge, Vector3::new(0.0, h, 0.0));
    builder::tsweep(&face, Vector3::new(0.0, 0.0, d))
}

/// Create a cylinder: circle wire → face → translational sweep along `axis`.
pub fn make_cylinder(
    base_center: Point3,
    axis: Vector3,
    radius: f64,
    height: f64,
) -> Result<Solid, KernelError> {
    if axis.magnitude() < 1e-12 {
        return Err(KernelError::InvalidGeometry {
            reason: "cylinder axis has zero length".to_string(),
        });
    }
    let axis = axis.normalize();
    let seed = if axis.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    let radial = axis.cross(seed).normalize() * radius;

    let v = builder::vertex(base_center + radial);
    let wire = builder::rsweep(&v, base_center, axis, Rad(2.0 * PI));
    let face = builder::try_attach_plane(&[wire]).map_err(|e| KernelError::SolidFailed {
        reason: format!("failed to create circular face: {e}"),
    })?;
    Ok(builder::tsweep(&face, axis * height))
}

/// Planar face bounded by a closed polygon of line edges.
pub fn make_polygon_face(points: &[[f64; 3]]) -> Result<Face, KernelError> {
    if points.len() < 3 {
        return Err(KernelError::InvalidGeometry {
            reason: "polygon has fewer than 3 points".to_string(),
        });
    }
    let vertices: Vec<Vertex> = points
        .iter()
        .map(|p| builder::vertex(Point3::new(p[0], p[1], p[2])))
        .collect();
    let n = vertices.len();
    let wire: Wire = (0..n)
        .map(|i| builder::line(&vertices[i], &vertices[(i + 1) % n]))
        .collect();
    builder::try_attach_plane(&[wire]).map_err(|e| KernelError::InvalidGeometry {
        reason: format!("failed to create planar face: {e}"),
    })
}

fn weld_index(welded: &mut Vec<[f64; 3]>, p: [f64; 3]) -> usize {
    let found = welded.iter().position(|q| {
        (q[0] - p[0]).abs() < WELD_TOLERANCE
            && (q[1] - p[1]).abs() < WELD_TOLERANCE
            && (q[2] - p[2]).abs() < WELD_TOLERANCE
    });
    match found {
        Some(i) => i,
        None => {
            welded.push(p);
            welded.len() - 1
        }
    }
}

/// Sew planar polygons into a closed shell and build a solid from it.
///
/// Corners are welded so adjacent polygons share vertices, and each shared
/// edge is reused (inverted) by the second polygon that traverses it. The
/// shell is flipped first if the polygons wind inward.
pub fn sew_polygons(faces: &[Vec<[f64; 3]>]) -> Result<Solid, KernelError> {
    let faces = orient_outward(faces);

    let mut welded: Vec<[f64; 3]> = Vec::new();
    let loops: Vec<Vec<usize>> = faces
        .iter()
        .map(|poly| poly.iter().map(|&p| weld_index(&mut welded, p)).collect())
        .collect();
    let vertices: Vec<Vertex> = welded
        .iter()
        .map(|p| builder::vertex(Point3::new(p[0], p[1], p[2])))
        .collect();

    let mut edges: HashMap<(usize, usize), Edge> = HashMap::new();
    let mut shell_faces = Vec::with_capacity(loops.len());
    for indices in &loops {
        let n = indices.len();
        if n < 3 {
            return Err(KernelError::SolidFailed {
                reason: "polygon collapsed to fewer than 3 corners".to_string(),
            });
        }
        let mut wire_edges = Vec::with_capacity(n);
        for i in 0..n {
            let (a, b) = (indices[i], indices[(i + 1) % n]);
            let edge = if let Some(existing) = edges.get(&(b, a)) {
                existing.inverse()
            } else {
                let e = builder::line(&vertices[a], &vertices[b]);
                edges.insert((a, b), e.clone());
                e
            };
            wire_edges.push(edge);
        }
        let wire = Wire::from_iter(wire_edges);
        let face = builder::try_attach_plane(&[wire]).map_err(|e| KernelError::SolidFailed {
            reason: format!("failed to attach plane to sewn polygon: {e}"),
        })?;
        shell_faces.push(face);
    }

    let shell: Shell = shell_faces.into_iter().collect();
    Solid::try_new(vec![shell]).map_err(|e| KernelError::SolidFailed {
        reason: format!("sewn shell is not a closed manifold: {e}"),
    })
}
