pub mod bbox;
pub mod plane;
pub mod transform;

pub use bbox::BBox;
pub use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};
pub use plane::Plane;
pub use transform::{AffineTransform, TileTransform};
