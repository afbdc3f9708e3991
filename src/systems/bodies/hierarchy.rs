//! Arena of celestial entities and their per-frame resolved state.
//!
//! Entities are immutable parameter records loaded once at startup; the only
//! mutable piece is the state vector, rebuilt from scratch every frame from the
//! current epoch so warp jumps can never accumulate drift.

use std::f64::consts::TAU;

use bevy::math::DVec3;
use bevy::prelude::*;
use thiserror::Error;

use crate::systems::orbit::Orbit;

/// Physical model of a body: what it is, not where it is.
#[derive(Debug, Clone)]
pub struct Model {
    /// mean radius (km)
    pub radius: f64,
    /// standard gravitational parameter (km^3/s^2); catalog data the thin
    /// render path has no use for yet
    #[allow(dead_code)]
    pub gm: f64,
    /// unit spin axis in simulation space (z-up ecliptic frame)
    pub rotation_axis: DVec3,
    /// sidereal day length (s), 0 for tidally undefined bodies
    pub rotation_period: f64,
    /// albedo-premultiplied tint used when no diffuse map is streamed in
    pub mean_color: Vec3,
    /// optional diffuse texture, loaded on demand for priority bodies
    pub diffuse_map: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Atmosphere {
    pub scattering: Vec4,
    pub density: f64,
    pub max_height: f64,
    #[allow(dead_code)]
    pub scale_height: f64,
}

#[derive(Debug, Clone)]
pub struct Ring {
    pub inner_radius: f64,
    pub outer_radius: f64,
    pub axis: DVec3,
}

#[derive(Debug, Clone)]
pub struct Star {
    pub brightness: f64,
    #[allow(dead_code)]
    pub flare_min_size: f64,
    #[allow(dead_code)]
    pub flare_max_size: f64,
}

#[derive(Debug, Clone)]
pub struct CloudLayer {
    /// full drift revolution length (s); 0 disables the drift
    pub period: f64,
}

#[derive(Debug, Clone)]
pub struct NightSide {
    pub intensity: f64,
}

#[derive(Debug, Clone)]
pub struct SpecularMask {
    pub hardness: f64,
}

/// Immutable per-entity parameters. Barycenters carry no model.
#[derive(Debug, Clone)]
pub struct EntityParam {
    pub name: String,
    pub display_name: String,
    pub parent: Option<String>,
    pub orbit: Option<Orbit>,
    pub model: Option<Model>,
    pub atmosphere: Option<Atmosphere>,
    pub ring: Option<Ring>,
    pub star: Option<Star>,
    pub clouds: Option<CloudLayer>,
    pub night: Option<NightSide>,
    pub specular: Option<SpecularMask>,
}

impl EntityParam {
    pub fn is_body(&self) -> bool {
        self.model.is_some()
    }
}

/// Stable handle into the entity arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub usize);

/// Fully derived state, replaced wholesale each frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityState {
    /// absolute position in simulation space (km)
    pub position: DVec3,
    /// spin about the body axis (rad)
    pub rotation_angle: f64,
    /// cloud layer offset relative to the surface (rad), drifts retrograde
    pub cloud_shift: f64,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("entity '{entity}' references unknown parent '{parent}'")]
    ParentNotFound { entity: String, parent: String },
    #[error("entity '{entity}' has a degenerate orbit (period and semi-major axis must be > 0)")]
    DegenerateOrbit { entity: String },
}

/// The entity forest: parameters, parent indices, a prebuilt child adjacency
/// list, and the per-frame state vector.
#[derive(Resource)]
pub struct EntityCollection {
    params: Vec<EntityParam>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    states: Vec<EntityState>,
    bodies: Vec<EntityId>,
}

impl EntityCollection {
    /// Link parent names to indices and validate orbits. Fails without
    /// exposing a partial hierarchy.
    pub fn resolve(params: Vec<EntityParam>) -> Result<Self, ResolveError> {
        let mut parents = Vec::with_capacity(params.len());
        for param in &params {
            let parent = match &param.parent {
                None => None,
                Some(name) => Some(
                    params.iter().position(|p| &p.name == name).ok_or_else(|| {
                        ResolveError::ParentNotFound {
                            entity: param.name.clone(),
                            parent: name.clone(),
                        }
                    })?,
                ),
            };
            parents.push(parent);

            if let Some(orbit) = &param.orbit {
                if orbit.period <= 0.0 || orbit.semi_major_axis <= 0.0 {
                    return Err(ResolveError::DegenerateOrbit {
                        entity: param.name.clone(),
                    });
                }
            }
        }

        let mut children = vec![Vec::new(); params.len()];
        for (index, parent) in parents.iter().enumerate() {
            if let Some(parent) = parent {
                children[*parent].push(index);
            }
        }

        let bodies = params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_body())
            .map(|(i, _)| EntityId(i))
            .collect();

        let states = vec![EntityState::default(); params.len()];
        Ok(Self {
            params,
            parents,
            children,
            states,
            bodies,
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        (0..self.params.len()).map(EntityId)
    }

    pub fn param(&self, id: EntityId) -> &EntityParam {
        &self.params[id.0]
    }

    pub fn state(&self, id: EntityId) -> &EntityState {
        &self.states[id.0]
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.parents[id.0].map(EntityId)
    }

    /// Ascending ancestor chain, nearest parent first; empty for roots.
    pub fn ancestors(&self, id: EntityId) -> Vec<EntityId> {
        let mut chain = Vec::new();
        let mut cursor = self.parents[id.0];
        while let Some(index) = cursor {
            chain.push(EntityId(index));
            cursor = self.parents[index];
        }
        chain
    }

    /// All recursive descendants, children before grandchildren.
    pub fn descendants(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        let mut stack = self.children[id.0].clone();
        while let Some(index) = stack.pop() {
            out.push(EntityId(index));
            stack.extend_from_slice(&self.children[index]);
        }
        out
    }

    /// Model-bearing entities in load order.
    pub fn bodies(&self) -> &[EntityId] {
        &self.bodies
    }

    pub fn body_position(&self, name: &str) -> Option<usize> {
        self.bodies
            .iter()
            .position(|id| self.params[id.0].name == name)
    }

    /// Rebuild every entity state for the given epoch. Two passes: orbit
    /// positions relative to the parent, then absolute accumulation up the
    /// ancestor chain (O(depth) per entity, no frame-to-frame caching).
    pub fn update_states(&mut self, epoch: f64) {
        let mut relative = vec![DVec3::ZERO; self.params.len()];
        for (index, param) in self.params.iter().enumerate() {
            if self.parents[index].is_some() {
                if let Some(orbit) = &param.orbit {
                    relative[index] = orbit.position_at(epoch);
                }
            }
        }

        for (index, param) in self.params.iter().enumerate() {
            let mut position = relative[index];
            let mut cursor = self.parents[index];
            while let Some(parent) = cursor {
                position += relative[parent];
                cursor = self.parents[parent];
            }

            let rotation_angle = match &param.model {
                Some(model) if model.rotation_period != 0.0 => {
                    TAU * (epoch / model.rotation_period).rem_euclid(1.0)
                }
                _ => 0.0,
            };

            let cloud_shift = match &param.clouds {
                Some(clouds) if clouds.period != 0.0 => {
                    -TAU * (epoch / clouds.period).rem_euclid(1.0)
                }
                _ => 0.0,
            };

            self.states[index] = EntityState {
                position,
                rotation_angle,
                cloud_shift,
            };
        }
    }

    /// Bodies whose textures are worth having resident while `focused` is the
    /// camera target: itself, its ancestors, and everything under its
    /// immediate parent. Model-bearing entities only, no duplicates.
    pub fn texture_priority(&self, focused: EntityId) -> Vec<EntityId> {
        let mut candidates = vec![focused];
        candidates.extend(self.ancestors(focused));
        if let Some(parent) = self.parent(focused) {
            candidates.extend(self.descendants(parent));
        }

        let mut seen = vec![false; self.params.len()];
        candidates.retain(|id| {
            let keep = self.params[id.0].is_body() && !seen[id.0];
            seen[id.0] = true;
            keep
        });
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circular(sma: f64, period: f64) -> Orbit {
        Orbit {
            eccentricity: 0.0,
            semi_major_axis: sma,
            inclination: 0.0,
            ascending_node: 0.0,
            arg_periapsis: 0.0,
            period,
            mean_anomaly_epoch: 0.0,
        }
    }

    fn body(name: &str, parent: Option<&str>, orbit: Option<Orbit>) -> EntityParam {
        EntityParam {
            name: name.into(),
            display_name: name.into(),
            parent: parent.map(Into::into),
            orbit,
            model: Some(Model {
                radius: 1000.0,
                gm: 1.0,
                rotation_axis: DVec3::Z,
                rotation_period: 86_400.0,
                mean_color: Vec3::ONE,
                diffuse_map: None,
            }),
            atmosphere: None,
            ring: None,
            star: None,
            clouds: None,
            night: None,
            specular: None,
        }
    }

    fn barycenter(name: &str, parent: Option<&str>, orbit: Option<Orbit>) -> EntityParam {
        EntityParam {
            model: None,
            ..body(name, parent, orbit)
        }
    }

    #[test]
    fn unknown_parent_fails_resolution() {
        let result = EntityCollection::resolve(vec![body("moon", Some("earth"), None)]);
        assert!(matches!(
            result,
            Err(ResolveError::ParentNotFound { entity, parent })
                if entity == "moon" && parent == "earth"
        ));
    }

    #[test]
    fn degenerate_orbit_fails_resolution() {
        let result = EntityCollection::resolve(vec![
            body("sun", None, None),
            body("rock", Some("sun"), Some(circular(1000.0, 0.0))),
        ]);
        assert!(matches!(result, Err(ResolveError::DegenerateOrbit { .. })));
    }

    #[test]
    fn ancestor_chain_accumulates_positions() {
        let a_orbit = circular(10_000.0, 86_400.0);
        let b_orbit = circular(500.0, 3_600.0);
        let mut world = EntityCollection::resolve(vec![
            body("root", None, None),
            body("a", Some("root"), Some(a_orbit)),
            body("b", Some("a"), Some(b_orbit)),
        ])
        .unwrap();

        for epoch in [0.0, 1234.5, 99_999.0] {
            world.update_states(epoch);
            let a_abs = world.state(EntityId(1)).position;
            let b_abs = world.state(EntityId(2)).position;
            assert_eq!(world.state(EntityId(0)).position, DVec3::ZERO);
            assert!((a_abs - a_orbit.position_at(epoch)).length() < 1e-9);
            assert!((b_abs - (a_abs + b_orbit.position_at(epoch))).length() < 1e-9);
        }
    }

    #[test]
    fn orbit_without_parent_stays_at_origin() {
        // a root with an orbit has nothing to orbit around
        let mut world =
            EntityCollection::resolve(vec![body("adrift", None, Some(circular(5000.0, 100.0)))])
                .unwrap();
        world.update_states(7777.0);
        assert_eq!(world.state(EntityId(0)).position, DVec3::ZERO);
    }

    #[test]
    fn rotation_angle_wraps_fractional_days() {
        let mut world = EntityCollection::resolve(vec![body("planet", None, None)]).unwrap();
        world.update_states(21_600.0); // quarter of the 86400s test day
        let angle = world.state(EntityId(0)).rotation_angle;
        assert!((angle - TAU * 0.25).abs() < 1e-12);

        // negative epochs wrap into [0, tau) instead of going negative
        world.update_states(-21_600.0);
        let angle = world.state(EntityId(0)).rotation_angle;
        assert!((angle - TAU * 0.75).abs() < 1e-12);
    }

    #[test]
    fn cloud_shift_only_with_cloud_layer() {
        let mut with_clouds = body("venus", None, None);
        with_clouds.clouds = Some(CloudLayer { period: 1000.0 });
        let mut world =
            EntityCollection::resolve(vec![with_clouds, body("mars", None, None)]).unwrap();

        world.update_states(250.0);
        let shift = world.state(EntityId(0)).cloud_shift;
        // drifts retrograde: negative fraction of a revolution
        assert!((shift + TAU * 0.25).abs() < 1e-12);
        assert_eq!(world.state(EntityId(1)).cloud_shift, 0.0);
    }

    #[test]
    fn descendant_and_ancestor_queries() {
        let world = EntityCollection::resolve(vec![
            body("sun", None, None),
            barycenter("bary", Some("sun"), None),
            body("planet", Some("bary"), None),
            body("moon", Some("planet"), None),
        ])
        .unwrap();

        assert_eq!(
            world.ancestors(EntityId(3)),
            vec![EntityId(2), EntityId(1), EntityId(0)]
        );
        assert!(world.ancestors(EntityId(0)).is_empty());

        let mut all = world.descendants(EntityId(0));
        all.sort_by_key(|id| id.0);
        assert_eq!(all, vec![EntityId(1), EntityId(2), EntityId(3)]);
    }

    #[test]
    fn texture_priority_set_is_deduplicated() {
        // sun -> {a, b, bary}, bary -> {c}
        let world = EntityCollection::resolve(vec![
            body("sun", None, None),
            body("a", Some("sun"), None),
            body("b", Some("sun"), None),
            barycenter("bary", Some("sun"), None),
            body("c", Some("bary"), None),
        ])
        .unwrap();

        let mut priority = world.texture_priority(EntityId(1));
        // focused first, then its parent, then siblings (and their descendants),
        // barycenters filtered out, the focused body not repeated
        assert_eq!(priority.remove(0), EntityId(1));
        let mut rest: Vec<usize> = priority.iter().map(|id| id.0).collect();
        rest.sort();
        assert_eq!(rest, vec![0, 2, 4]);
    }

    #[test]
    fn texture_priority_for_root_is_itself() {
        let world = EntityCollection::resolve(vec![
            body("sun", None, None),
            body("planet", Some("sun"), None),
        ])
        .unwrap();
        assert_eq!(world.texture_priority(EntityId(0)), vec![EntityId(0)]);
    }

    #[test]
    fn bodies_keep_load_order() {
        let world = EntityCollection::resolve(vec![
            barycenter("bary", None, None),
            body("b", Some("bary"), None),
            body("a", Some("bary"), None),
        ])
        .unwrap();
        assert_eq!(world.bodies(), &[EntityId(1), EntityId(2)]);
        assert_eq!(world.body_position("a"), Some(1));
        assert_eq!(world.body_position("bary"), None);
    }
}
