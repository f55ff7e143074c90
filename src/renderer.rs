//! Small CPU rasterizer backing the in-memory scene.
//!
//! Flat Lambert shading, a depth buffer and supersampled coverage so silhouettes get
//! partial alpha. Output is linear premultiplied RGBA.

use std::f32::consts::PI;

use glam::{Mat4, Vec2, Vec3, Vec4, Vec4Swizzles};

use crate::camera::StageCamera;
use crate::frame::Frame;
use crate::traits::{Light, LightKind};

/// Samples per pixel along each axis
pub const SUPERSAMPLE: u32 = 2;

/// Triangle mesh with a single linear RGBA color
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub color: Vec4,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, color: Vec4) -> Self {
        Self {
            positions,
            indices,
            color,
        }
    }

    /// Axis-aligned box of full `size` centered on the origin
    pub fn cuboid(size: Vec3, color: Vec4) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 7, 6, 3, 6, 2, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        Self::new(positions, indices, color)
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            Some([
                *self.positions.get(tri[0] as usize)?,
                *self.positions.get(tri[1] as usize)?,
                *self.positions.get(tri[2] as usize)?,
            ])
        })
    }
}

/// A mesh placed in the world
pub struct DrawItem<'a> {
    pub matrix: Mat4,
    pub mesh: &'a Mesh,
}

/// An enabled light with its world placement
#[derive(Copy, Clone, Debug)]
pub struct SceneLight {
    pub position: Vec3,
    pub direction: Vec3,
    pub light: Light,
}

impl SceneLight {
    /// Linear RGB irradiance reaching `point` with surface `normal`
    fn illuminate(&self, point: Vec3, normal: Vec3) -> Vec3 {
        let light = &self.light;
        let (to_light, attenuation) = match light.kind {
            LightKind::Directional => (-self.direction, 1.0),
            LightKind::Point | LightKind::Spot { .. } => {
                let offset = self.position - point;
                let distance = offset.length();
                if distance <= f32::EPSILON || distance > light.range {
                    return Vec3::ZERO;
                }
                (offset / distance, 1.0 / (4.0 * PI * distance * distance))
            }
        };

        if let LightKind::Spot { angle } = light.kind {
            let cos_cutoff = (angle.to_radians() * 0.5).cos();
            if self.direction.dot(-to_light) < cos_cutoff {
                return Vec3::ZERO;
            }
        }

        let lambert = normal.dot(to_light).max(0.0);
        light.color * light.intensity * attenuation * lambert
    }
}

pub struct Rasterizer {
    width: u32,
    height: u32,
    samples: u32,
}

impl Rasterizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            samples: SUPERSAMPLE,
        }
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples.max(1);
        self
    }

    pub fn render(
        &self,
        camera: &StageCamera,
        draws: &[DrawItem],
        lights: &[SceneLight],
        ambient: Vec3,
    ) -> Frame {
        let sw = self.width * self.samples;
        let sh = self.height * self.samples;
        let mut color = vec![camera.background; (sw * sh) as usize];
        let mut depth = vec![f32::INFINITY; (sw * sh) as usize];
        let screen = Vec2::new(sw as f32, sh as f32);

        for draw in draws {
            for tri in draw.mesh.triangles() {
                let world = tri.map(|p| draw.matrix.transform_point3(p));
                let Some(shaded) = shade(camera, &world, draw.mesh.color, lights, ambient) else {
                    continue;
                };

                let mut projected = [(Vec2::ZERO, 0.0); 3];
                let mut visible = true;
                for (slot, &p) in projected.iter_mut().zip(&world) {
                    match camera.project(p) {
                        Some((ndc, z)) => {
                            let s = Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5) * screen;
                            *slot = (s, z);
                        }
                        None => visible = false,
                    }
                }
                if !visible {
                    continue;
                }

                fill_triangle(&projected, sw, sh, |index, z| {
                    if z > camera.far || z >= depth[index] {
                        return;
                    }
                    depth[index] = z;
                    color[index] = shaded + camera.background * (1.0 - shaded.w);
                });
            }
        }

        self.resolve(&color)
    }

    /// Averages each block of samples into one pixel
    fn resolve(&self, samples: &[Vec4]) -> Frame {
        let s = self.samples;
        let sw = self.width * s;
        let weight = 1.0 / (s * s) as f32;
        let mut frame = Frame::new(self.width, self.height);

        for y in 0..self.height {
            for x in 0..self.width {
                let mut sum = Vec4::ZERO;
                for sy in 0..s {
                    for sx in 0..s {
                        sum += samples[((y * s + sy) * sw + x * s + sx) as usize];
                    }
                }
                frame.set(x, y, sum * weight);
            }
        }
        frame
    }
}

/// Premultiplied color of a flat-shaded triangle, `None` when degenerate
fn shade(
    camera: &StageCamera,
    world: &[Vec3; 3],
    base: Vec4,
    lights: &[SceneLight],
    ambient: Vec3,
) -> Option<Vec4> {
    let normal = (world[1] - world[0]).cross(world[2] - world[0]);
    let normal = normal.try_normalize()?;
    let center = (world[0] + world[1] + world[2]) / 3.0;

    let view = if camera.projection.is_orthographic() {
        -camera.forward()
    } else {
        camera.position - center
    };
    let normal = if normal.dot(view) < 0.0 { -normal } else { normal };

    let irradiance = lights
        .iter()
        .fold(ambient, |sum, light| sum + light.illuminate(center, normal));
    let rgb = (base.xyz() * irradiance).clamp(Vec3::ZERO, Vec3::ONE);
    Some((rgb * base.w).extend(base.w))
}

/// Calls `plot` for every sample center covered by the screen-space triangle
fn fill_triangle<F>(vertices: &[(Vec2, f32); 3], width: u32, height: u32, mut plot: F)
where
    F: FnMut(usize, f32),
{
    let [(a, za), (b, zb), (c, zc)] = *vertices;
    let area = edge(a, b, c);
    if area.abs() <= f32::EPSILON {
        return;
    }

    let min = a.min(b).min(c).floor().max(Vec2::ZERO);
    let max = a.max(b).max(c).ceil().min(Vec2::new(width as f32, height as f32));

    for y in min.y as u32..max.y as u32 {
        for x in min.x as u32..max.x as u32 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let w0 = edge(b, c, p) / area;
            let w1 = edge(c, a, p) / area;
            let w2 = edge(a, b, p) / area;
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }
            plot((y * width + x) as usize, w0 * za + w1 * zb + w2 * zc);
        }
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b - a).perp_dot(p - a)
}
