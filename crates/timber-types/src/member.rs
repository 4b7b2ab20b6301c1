use serde::{Deserialize, Serialize};

use crate::frame::LocalFrame;
use crate::vector::Vec3;

/// Which face of the timber the datum line runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ReferenceFace {
    Top,
    #[default]
    Bottom,
    Left,
    Right,
}

/// Structural role of a member within the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StructuralRole {
    Post,
    #[default]
    Beam,
    Rafter,
    Purlin,
    Girt,
    TieBeam,
    Brace,
    Header,
    Trimmer,
    Ridge,
    Valley,
    Sill,
    Plate,
    FloorJoist,
    SummerBeam,
}

/// Extent of the rectangular cross-section in local (width, height)
/// coordinates, relative to the datum line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SectionBounds {
    pub y_min: f64,
    pub y_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl SectionBounds {
    pub fn y_center(&self) -> f64 {
        (self.y_min + self.y_max) / 2.0
    }

    pub fn z_center(&self) -> f64 {
        (self.z_min + self.z_max) / 2.0
    }
}

/// Geometric facts about a timber member that joint algorithms consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberGeometry {
    pub start: Vec3,
    pub end: Vec3,
    /// Cross-section width, along the local y axis.
    pub width: f64,
    /// Cross-section height, along the local z axis.
    pub height: f64,
    #[serde(default)]
    pub reference_face: ReferenceFace,
    #[serde(default)]
    pub role: StructuralRole,
}

impl MemberGeometry {
    pub fn new(start: Vec3, end: Vec3, width: f64, height: f64) -> Self {
        Self {
            start,
            end,
            width,
            height,
            reference_face: ReferenceFace::default(),
            role: StructuralRole::default(),
        }
    }

    pub fn with_role(mut self, role: StructuralRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_reference_face(mut self, face: ReferenceFace) -> Self {
        self.reference_face = face;
        self
    }

    pub fn frame(&self) -> LocalFrame {
        LocalFrame::from_datum(self.start, self.end)
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    pub fn cross_section_area(&self) -> f64 {
        self.width * self.height
    }

    /// Where the cross-section sits relative to the datum.
    pub fn section_bounds(&self) -> SectionBounds {
        let (w, h) = (self.width, self.height);
        match self.reference_face {
            ReferenceFace::Bottom => SectionBounds {
                y_min: -w / 2.0,
                y_max: w / 2.0,
                z_min: 0.0,
                z_max: h,
            },
            ReferenceFace::Top => SectionBounds {
                y_min: -w / 2.0,
                y_max: w / 2.0,
                z_min: -h,
                z_max: 0.0,
            },
            ReferenceFace::Left => SectionBounds {
                y_min: 0.0,
                y_max: w,
                z_min: -h / 2.0,
                z_max: h / 2.0,
            },
            ReferenceFace::Right => SectionBounds {
                y_min: -w,
                y_max: 0.0,
                z_min: -h / 2.0,
                z_max: h / 2.0,
            },
        }
    }

    /// Offset from the datum to the middle of the cross-section, in world space.
    pub fn section_offset(&self) -> Vec3 {
        let frame = self.frame();
        let bounds = self.section_bounds();
        frame.y_axis * bounds.y_center() + frame.z_axis * bounds.z_center()
    }

    /// Parameter of the orthogonal projection of `point` onto the datum,
    /// measured as a distance from `start`.
    pub fn datum_parameter(&self, point: Vec3) -> f64 {
        (point - self.start).dot(&self.frame().x_axis)
    }

    /// Width of the member's silhouette measured along `axis`:
    /// `|y·axis|·width + |z·axis|·height`.
    pub fn footprint_along(&self, axis: Vec3) -> f64 {
        let frame = self.frame();
        frame.y_axis.dot(&axis).abs() * self.width + frame.z_axis.dot(&axis).abs() * self.height
    }
}
