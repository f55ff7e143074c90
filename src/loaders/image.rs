use anyhow::{Context, Result};
use std::path::Path;

use crate::frame::Frame;

/// Reads a PNG into a straight-alpha frame
pub fn load_png(path: impl AsRef<Path>) -> Result<Frame> {
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("Failed to read image {:?}", path))?
        .to_rgba8();

    let (width, height) = image.dimensions();
    Ok(Frame::from_rgba8(width, height, image.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icon.png");

        let mut frame = Frame::new(3, 3);
        frame.set(1, 1, Vec4::ONE);
        frame.save_png(&path).unwrap();

        let loaded = load_png(&path).unwrap();
        assert_eq!((loaded.width, loaded.height), (3, 3));
        assert_eq!(loaded.transparent_count(), 8);
        let center = loaded.get(1, 1).unwrap();
        assert!((center - Vec4::ONE).abs().max_element() < 1e-4);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_png("/nonexistent/icon.png").is_err());
    }
}
