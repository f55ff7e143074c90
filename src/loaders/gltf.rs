use anyhow::{Context, Result};
use glam::{Quat, Vec3, Vec4};
use std::path::Path;

use crate::renderer::Mesh;
use crate::scene::MemoryScene;
use crate::traits::{LocalTransform, NodeId, SceneGraph};

const DEFAULT_COLOR: Vec4 = Vec4::new(0.7, 0.7, 0.7, 1.0);

/// Loads every scene of a glTF file under a new node named after the file.
///
/// The glTF node hierarchy and local transforms are kept, so the loaded object can
/// be staged like any other subtree. Returns the new root.
pub fn load_gltf_file(
    path: impl AsRef<Path>,
    scene: &mut MemoryScene,
    parent: Option<NodeId>,
) -> Result<NodeId> {
    let path = path.as_ref();
    log::info!("loading glTF file: {:?}", path);

    let (gltf, buffers, _images) =
        gltf::import(path).context(format!("Failed to load glTF file: {:?}", path))?;

    log::debug!(
        "glTF loaded: {} scenes, {} nodes, {} meshes",
        gltf.scenes().count(),
        gltf.nodes().count(),
        gltf.meshes().count()
    );

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("glTF");
    let root = scene.create_node(name, parent);

    let mut mesh_count = 0;
    for gltf_scene in gltf.scenes() {
        for node in gltf_scene.nodes() {
            mesh_count += process_node(&node, &buffers, scene, root)?;
        }
    }

    if mesh_count == 0 {
        log::warn!("no geometry found in glTF file {:?}", path);
    }

    log::info!("extracted {} meshes from {:?}", mesh_count, path);
    Ok(root)
}

/// Recursively mirrors a glTF node and its children, returns the meshes created
fn process_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
    scene: &mut MemoryScene,
    parent: NodeId,
) -> Result<usize> {
    let name = node.name().map_or_else(|| format!("node {}", node.index()), str::to_string);
    let id = scene.create_node(&name, Some(parent));

    let (translation, rotation, scale) = node.transform().decomposed();
    scene.set_local_transform(
        id,
        LocalTransform {
            position: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from_array(scale),
        },
    );

    let mut count = 0;
    if let Some(mesh) = node.mesh() {
        if let Some(mesh) = process_mesh(&mesh, buffers)? {
            scene.set_mesh(id, mesh);
            count += 1;
        }
    }

    for child in node.children() {
        count += process_node(&child, buffers, scene, id)?;
    }

    Ok(count)
}

/// Merges the triangle primitives of a glTF mesh into one mesh
fn process_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<Option<Mesh>> {
    log::debug!("processing mesh: {:?}", mesh.name());

    let mut positions = Vec::new();
    let mut indices = Vec::new();
    let mut color = None;

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            continue;
        }

        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
        let vertices: Vec<Vec3> = reader
            .read_positions()
            .context("Mesh primitive has no positions")?
            .map(Vec3::from_array)
            .collect();

        if vertices.is_empty() {
            continue;
        }

        let base = positions.len() as u32;
        match reader.read_indices() {
            Some(read) => indices.extend(read.into_u32().map(|i| base + i)),
            None => indices.extend(base..base + vertices.len() as u32),
        }
        positions.extend(vertices);

        let factor = primitive.material().pbr_metallic_roughness().base_color_factor();
        color.get_or_insert(Vec4::from_array(factor));
    }

    if positions.is_empty() {
        return Ok(None);
    }

    Ok(Some(Mesh::new(
        positions,
        indices,
        color.unwrap_or(DEFAULT_COLOR),
    )))
}
