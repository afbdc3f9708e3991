//! Startup scene dressing: one sphere per body plus its attachment layers,
//! a directional light per star, and the background starfield.

use std::f32::consts::TAU;

use bevy::prelude::*;
use bevy::render::mesh::Indices;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::PrimitiveTopology;
use rand::Rng;

use crate::config::STARFIELD_RADIUS;
use crate::systems::bodies::hierarchy::EntityCollection;
use crate::systems::bodies::{BodyMaterials, BodyVisual, SceneSettings, StarLight, VisualLayer};

// cloud shells sit just off the surface
const CLOUD_SHELL: f64 = 1.015;

pub fn spawn_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    world: Res<EntityCollection>,
    settings: Res<SceneSettings>,
) {
    let mut body_materials = BodyMaterials::default();

    for id in world.ids() {
        let param = world.param(id);
        let Some(model) = &param.model else { continue };

        let color = Color::srgb(
            model.mean_color.x,
            model.mean_color.y,
            model.mean_color.z,
        );

        // surface sphere
        let mut surface = StandardMaterial {
            base_color: color,
            metallic: 0.0,
            perceptual_roughness: 1.0,
            ..default()
        };
        if let Some(star) = &param.star {
            // stars light themselves
            surface.emissive = LinearRgba::from(color) * star.brightness as f32;
            surface.unlit = true;
        }
        if let Some(night) = &param.night {
            // city lights on the dark side, approximated as a faint glow
            surface.emissive = LinearRgba::from(color) * 0.02 * night.intensity as f32;
        }
        if let Some(specular) = &param.specular {
            surface.reflectance = (specular.hardness as f32).clamp(0.0, 1.0);
            surface.perceptual_roughness = 0.4;
        }

        let surface_handle = materials.add(surface);
        body_materials.0.insert(id, surface_handle.clone());

        commands.spawn((
            Mesh3d(meshes.add(Sphere::new(model.radius as f32).mesh().uv(48, 96))),
            MeshMaterial3d(surface_handle),
            Transform::default(),
            BodyVisual {
                id,
                layer: VisualLayer::Surface,
            },
        ));

        if param.clouds.is_some() {
            commands.spawn((
                Mesh3d(meshes.add(
                    Sphere::new((model.radius * CLOUD_SHELL) as f32).mesh().uv(48, 96),
                )),
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: Color::srgba(1.0, 1.0, 1.0, 0.3),
                    alpha_mode: AlphaMode::Blend,
                    perceptual_roughness: 1.0,
                    ..default()
                })),
                Transform::default(),
                BodyVisual {
                    id,
                    layer: VisualLayer::Clouds,
                },
            ));
        }

        if let Some(atmosphere) = &param.atmosphere {
            let tint = atmosphere.scattering.truncate().normalize_or_zero();
            // denser atmospheres read as thicker shells
            let opacity = (0.08 * atmosphere.density as f32).clamp(0.02, 0.35);
            commands.spawn((
                Mesh3d(meshes.add(
                    Sphere::new((model.radius + atmosphere.max_height) as f32)
                        .mesh()
                        .uv(48, 96),
                )),
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: Color::srgba(tint.x, tint.y, tint.z, opacity),
                    alpha_mode: AlphaMode::Blend,
                    unlit: true,
                    cull_mode: None,
                    ..default()
                })),
                Transform::default(),
                BodyVisual {
                    id,
                    layer: VisualLayer::Atmosphere,
                },
            ));
        }

        if let Some(ring) = &param.ring {
            commands.spawn((
                Mesh3d(meshes.add(ring_mesh(
                    ring.inner_radius as f32,
                    ring.outer_radius as f32,
                    128,
                ))),
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: Color::srgba(0.8, 0.75, 0.65, 0.4),
                    alpha_mode: AlphaMode::Blend,
                    double_sided: true,
                    cull_mode: None,
                    perceptual_roughness: 1.0,
                    ..default()
                })),
                Transform::default(),
                BodyVisual {
                    id,
                    layer: VisualLayer::Ring,
                },
            ));
        }

        if let Some(star) = &param.star {
            commands.spawn((
                DirectionalLight {
                    illuminance: 1.2e5 * star.brightness as f32,
                    ..default()
                },
                Transform::default(),
                StarLight { id },
            ));
        }
    }

    commands.insert_resource(body_materials);

    // background stars, camera-centered so they never parallax
    let starfield = &settings.0.starfield;
    commands.spawn((
        Mesh3d(meshes.add(starfield_mesh(starfield.count))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::WHITE,
            emissive: LinearRgba::WHITE * starfield.brightness,
            unlit: true,
            ..default()
        })),
        Transform::default(),
    ));
}

/// Flat annulus in the local XZ plane, +Y normal.
fn ring_mesh(inner: f32, outer: f32, segments: usize) -> Mesh {
    let mut positions = Vec::with_capacity((segments + 1) * 2);
    let mut normals = Vec::with_capacity((segments + 1) * 2);
    let mut uvs = Vec::with_capacity((segments + 1) * 2);
    let mut indices = Vec::with_capacity(segments * 6);

    for i in 0..=segments {
        let angle = TAU * i as f32 / segments as f32;
        let (sin, cos) = angle.sin_cos();
        positions.push([cos * inner, 0.0, sin * inner]);
        positions.push([cos * outer, 0.0, sin * outer]);
        normals.push([0.0, 1.0, 0.0]);
        normals.push([0.0, 1.0, 0.0]);
        let v = i as f32 / segments as f32;
        uvs.push([0.0, v]);
        uvs.push([1.0, v]);
    }

    for i in 0..segments {
        let base = (i * 2) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2]);
        indices.extend_from_slice(&[base + 1, base + 3, base + 2]);
    }

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs);
    mesh.insert_indices(Indices::U32(indices));
    mesh
}

/// Random unit directions pushed out to a fixed radius, drawn as points.
fn starfield_mesh(count: usize) -> Mesh {
    let mut rng = rand::rng();
    let mut positions = Vec::with_capacity(count);

    for _ in 0..count {
        // uniform over the sphere: z uniform, azimuth uniform
        let z: f32 = rng.random_range(-1.0..1.0);
        let azimuth: f32 = rng.random_range(0.0..TAU);
        let planar = (1.0 - z * z).sqrt();
        positions.push([
            planar * azimuth.cos() * STARFIELD_RADIUS,
            z * STARFIELD_RADIUS,
            planar * azimuth.sin() * STARFIELD_RADIUS,
        ]);
    }

    let mut mesh = Mesh::new(PrimitiveTopology::PointList, RenderAssetUsages::default());
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh
}
