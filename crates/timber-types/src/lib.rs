pub mod frame;
pub mod member;
pub mod vector;

pub use frame::*;
pub use member::*;
pub use vector::Vec3;

use serde::{Deserialize, Serialize};

/// How two datum segments meet, judged by where along each segment the
/// closest-approach point falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntersectionType {
    /// One member ends on the other member's span (a T-joint).
    EndpointToMidpoint,
    /// Both members pass through each other (a crossing).
    MidpointToMidpoint,
    /// Both members end at the same location (a corner or splice).
    EndpointToEndpoint,
}
