mod bounds;
mod rotation;

pub use bounds::Bounds;
pub use rotation::{
    euler_to_quat, quat_to_euler, rotate_euler_world, rotate_local, rotate_world, wrap_angle,
    Axis,
};
