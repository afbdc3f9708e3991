//! Declarative body catalog: JSON records in, typed entity parameters out.
//!
//! The frame loop never sees this layer; it runs once before the app is built
//! and everything downstream consumes the typed `EntityParam` list.

use std::fs;
use std::path::Path;

use bevy::math::{DMat3, DVec3};
use bevy::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::systems::bodies::hierarchy::{
    Atmosphere, CloudLayer, EntityParam, Model, NightSide, Ring, SpecularMask, Star,
};
use crate::systems::orbit::Orbit;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("can't read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Scene-wide knobs that ride along with the entity list.
#[derive(Debug, Clone)]
pub struct SceneGlobals {
    pub ambient_level: f32,
    pub starting_body: String,
    pub starfield: StarfieldParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StarfieldParams {
    pub count: usize,
    pub brightness: f32,
}

pub struct Catalog {
    pub globals: SceneGlobals,
    pub entities: Vec<EntityParam>,
}

// raw file records; angles in degrees, converted on the way out

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    ambient_level: f32,
    starting_body: String,
    /// tilt between the equatorial and ecliptic frames (deg)
    #[serde(default)]
    axial_tilt: f64,
    starfield: StarfieldParams,
    #[serde(default)]
    barycenters: Vec<EntityRecord>,
    #[serde(default)]
    bodies: Vec<EntityRecord>,
}

#[derive(Deserialize)]
struct EntityRecord {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    orbit: Option<OrbitRecord>,
    #[serde(default)]
    model: Option<ModelRecord>,
    #[serde(default)]
    atmosphere: Option<AtmosphereRecord>,
    #[serde(default)]
    ring: Option<RingRecord>,
    #[serde(default)]
    star: Option<StarRecord>,
    #[serde(default)]
    clouds: Option<CloudsRecord>,
    #[serde(default)]
    night: Option<NightRecord>,
    #[serde(default)]
    specular: Option<SpecularRecord>,
}

#[derive(Deserialize)]
struct OrbitRecord {
    #[serde(default)]
    ecc: f64,
    sma: f64,
    #[serde(default)]
    inc: f64,
    #[serde(default)]
    lan: f64,
    #[serde(default)]
    arg: f64,
    period: f64,
    #[serde(default)]
    m0: f64,
}

#[derive(Deserialize)]
struct ModelRecord {
    radius: f64,
    #[serde(default)]
    gm: f64,
    #[serde(default)]
    right_ascension: f64,
    #[serde(default = "ninety")]
    declination: f64,
    #[serde(default)]
    rotation_period: f64,
    mean_color: [f32; 3],
    #[serde(default = "one")]
    albedo: f32,
    #[serde(default)]
    diffuse: Option<String>,
}

#[derive(Deserialize)]
struct AtmosphereRecord {
    scattering: [f32; 4],
    density: f64,
    max_height: f64,
    scale_height: f64,
}

#[derive(Deserialize)]
struct RingRecord {
    inner: f64,
    outer: f64,
    #[serde(default)]
    right_ascension: f64,
    #[serde(default = "ninety")]
    declination: f64,
}

#[derive(Deserialize)]
struct StarRecord {
    brightness: f64,
    #[serde(default)]
    flare_min_size: f64,
    #[serde(default)]
    flare_max_size: f64,
}

#[derive(Deserialize)]
struct CloudsRecord {
    #[serde(default)]
    period: f64,
}

#[derive(Deserialize)]
struct NightRecord {
    intensity: f64,
}

#[derive(Deserialize)]
struct SpecularRecord {
    hardness: f64,
}

fn ninety() -> f64 {
    90.0
}

fn one() -> f32 {
    1.0
}

/// Spin axis from equatorial right ascension / declination (deg), rotated by
/// the global axial tilt into the simulation frame.
fn axis(right_ascension: f64, declination: f64, tilt: &DMat3) -> DVec3 {
    let ra = right_ascension.to_radians();
    let dec = declination.to_radians();
    *tilt
        * DVec3::new(
            -ra.sin() * dec.cos(),
            ra.cos() * dec.cos(),
            dec.sin(),
        )
}

fn convert_orbit(record: OrbitRecord) -> Orbit {
    Orbit {
        eccentricity: record.ecc,
        semi_major_axis: record.sma,
        inclination: record.inc.to_radians(),
        ascending_node: record.lan.to_radians(),
        arg_periapsis: record.arg.to_radians(),
        period: record.period,
        mean_anomaly_epoch: record.m0.to_radians(),
    }
}

fn convert_entity(record: EntityRecord, tilt: &DMat3) -> EntityParam {
    let display_name = record.display_name.unwrap_or_else(|| record.name.clone());
    EntityParam {
        display_name,
        name: record.name,
        parent: record.parent,
        orbit: record.orbit.map(convert_orbit),
        model: record.model.map(|m| Model {
            radius: m.radius,
            gm: m.gm,
            rotation_axis: axis(m.right_ascension, m.declination, tilt),
            rotation_period: m.rotation_period,
            mean_color: Vec3::from(m.mean_color) * m.albedo,
            diffuse_map: m.diffuse,
        }),
        atmosphere: record.atmosphere.map(|a| Atmosphere {
            scattering: Vec4::from(a.scattering),
            density: a.density,
            max_height: a.max_height,
            scale_height: a.scale_height,
        }),
        ring: record.ring.map(|r| Ring {
            inner_radius: r.inner,
            outer_radius: r.outer,
            axis: axis(r.right_ascension, r.declination, tilt),
        }),
        star: record.star.map(|s| Star {
            brightness: s.brightness,
            flare_min_size: s.flare_min_size,
            flare_max_size: s.flare_max_size,
        }),
        clouds: record.clouds.map(|c| CloudLayer { period: c.period }),
        night: record.night.map(|n| NightSide {
            intensity: n.intensity,
        }),
        specular: record.specular.map(|s| SpecularMask {
            hardness: s.hardness,
        }),
    }
}

pub fn parse(contents: &str) -> Result<Catalog, CatalogError> {
    let file: CatalogFile = serde_json::from_str(contents)?;

    let tilt = DMat3::from_axis_angle(DVec3::new(0.0, -1.0, 0.0), file.axial_tilt.to_radians());

    // barycenters first, then bodies, matching catalog order expectations
    let entities = file
        .barycenters
        .into_iter()
        .chain(file.bodies)
        .map(|record| convert_entity(record, &tilt))
        .collect();

    Ok(Catalog {
        globals: SceneGlobals {
            ambient_level: file.ambient_level,
            starting_body: file.starting_body,
            starfield: file.starfield,
        },
        entities,
    })
}

pub fn load(path: impl AsRef<Path>) -> Result<Catalog, CatalogError> {
    let path = path.as_ref();
    let catalog = parse(&fs::read_to_string(path)?)?;
    println!(
        "Loaded {} entities from {:?}",
        catalog.entities.len(),
        path
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "ambient_level": 0.04,
        "starting_body": "earth",
        "axial_tilt": 23.4393,
        "starfield": { "count": 100, "brightness": 1.0 },
        "barycenters": [
            { "name": "ssb" }
        ],
        "bodies": [
            {
                "name": "earth",
                "display_name": "Earth",
                "parent": "ssb",
                "orbit": { "ecc": 0.0167, "sma": 149598023, "inc": 0.0009, "period": 31558149.8, "m0": 357.5 },
                "model": {
                    "radius": 6371.0,
                    "gm": 398600.4,
                    "right_ascension": 0.0,
                    "declination": 90.0,
                    "rotation_period": 86164.1,
                    "mean_color": [0.3, 0.45, 0.65],
                    "albedo": 0.9
                },
                "clouds": { "period": 1400000 }
            }
        ]
    }"#;

    #[test]
    fn parses_minimal_catalog() {
        let catalog = parse(MINIMAL).unwrap();
        assert_eq!(catalog.entities.len(), 2);
        assert_eq!(catalog.globals.starting_body, "earth");

        // barycenters come first and default their display name
        let ssb = &catalog.entities[0];
        assert_eq!(ssb.display_name, "ssb");
        assert!(!ssb.is_body());

        let earth = &catalog.entities[1];
        let orbit = earth.orbit.as_ref().unwrap();
        assert!((orbit.mean_anomaly_epoch - 357.5_f64.to_radians()).abs() < 1e-12);
        let model = earth.model.as_ref().unwrap();
        // albedo premultiplied into the tint
        assert!((model.mean_color.x - 0.27).abs() < 1e-6);
    }

    #[test]
    fn spin_axis_is_tilted_unit_vector() {
        let catalog = parse(MINIMAL).unwrap();
        let model = catalog.entities[1].model.as_ref().unwrap();
        assert!((model.rotation_axis.length() - 1.0).abs() < 1e-12);
        // dec=90 points along +z before the tilt; the tilt rotates it off-axis
        let tilt = 23.4393_f64.to_radians();
        assert!((model.rotation_axis.z - tilt.cos()).abs() < 1e-9);
    }

    #[test]
    fn bad_json_is_a_parse_error() {
        assert!(matches!(
            parse("{ not json"),
            Err(CatalogError::Parse(_))
        ));
    }
}
