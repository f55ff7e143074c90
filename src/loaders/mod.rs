pub mod gltf;
pub mod image;

pub use self::gltf::load_gltf_file;
pub use self::image::load_png;
