//! Joint types compiled into the crate.

pub mod dovetail;
pub mod geometry;
pub mod half_lap;
pub mod mortise_tenon;

pub use dovetail::Dovetail;
pub use half_lap::HalfLap;
pub use mortise_tenon::ThroughMortiseTenon;

use crate::definition::TimberJointDefinition;

/// One instance of every built-in joint type.
pub fn builtin_definitions() -> Vec<Box<dyn TimberJointDefinition>> {
    vec![
        Box::new(HalfLap::new()),
        Box::new(Dovetail::plain()),
        Box::new(Dovetail::housed()),
        Box::new(ThroughMortiseTenon::new()),
    ]
}

/// A fresh instance of the built-in with the given id.
pub fn builtin_definition(id: &str) -> Option<Box<dyn TimberJointDefinition>> {
    builtin_definitions()
        .into_iter()
        .find(|def| def.info().id == id)
}
