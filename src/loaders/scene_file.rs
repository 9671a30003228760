//! Line-oriented scene file parser.
//!
//! The format is OBJ-flavoured: whitespace-tokenised directives, `#`
//! comments, 1-based indices into previously declared vertices and
//! non-geometric vectors. Malformed lines are skipped with a warning;
//! only an unreadable file aborts.

use super::material_file;
use super::{parse_float, parse_int, ParseError};
use crate::core::fourier::Fourier;
use crate::core::camera::Camera;
use crate::core::light::Light;
use crate::core::primitive::Primitive;
use crate::core::prism::*;
use crate::core::scene::Scene;
use glam::Vec3;
use log::warn;
use std::fs;
use std::path::Path;

/// Load a scene from disk.
///
/// * `path` - The scene file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Scene, ParseError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ParseError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut scene = Scene {
        filepath: path.to_path_buf(),
        ..Scene::default()
    };
    let mut current_material: i32 = -1;

    for (number, line) in text.lines().enumerate() {
        let args: Vec<&str> = line.split_whitespace().collect();
        if args.is_empty() || args[0].starts_with('#') {
            continue;
        }
        let ok = match args[0] {
            "v" => parse_vertex(&args, &mut scene),
            "ng" => parse_nongeo(&args, &mut scene),
            "ld" => parse_directional_light(&args, &mut scene),
            "la" => parse_area_light(&args, &mut scene),
            "lsphere" => parse_sphere_light(&args, &mut scene, current_material),
            "camera" => parse_camera(&args, &mut scene),
            "sphere" => parse_sphere(&args, &mut scene, current_material),
            "f" => parse_face(&args, &mut scene, current_material),
            "mtllib" => material_file::load(&args, &mut scene),
            "usemtl" => set_material(&args, &scene, &mut current_material),
            other => {
                warn!("Skipping property \"{}\", no specification implemented", other);
                true
            }
        };
        if !ok {
            warn!(
                "Unable to parse line {} - invalid format detected:\n  \"{}\"",
                number + 1,
                line
            );
        }
    }

    scene.validated = true;
    Ok(scene)
}

/// Parse the trailing sample list of a curve directive. Invalid
/// tokens are dropped with a warning; a single sample is duplicated
/// so the fit has a real period.
pub(crate) fn parse_fourier(args: &[&str], start: Float, end: Float) -> Fourier {
    let mut values = Vec::with_capacity(args.len());
    for token in args {
        match parse_float(token) {
            Some(f) => values.push(f),
            None => warn!("Invalid float detected: \"{}\"", token),
        }
    }
    if values.len() == 1 {
        values.push(values[0]);
    }
    if values.is_empty() {
        return Fourier::default();
    }
    Fourier::from_samples(&values, start, end)
}

fn parse_vec3(args: &[&str]) -> Option<Vec3> {
    Some(Vec3::new(
        parse_float(args[0])?,
        parse_float(args[1])?,
        parse_float(args[2])?,
    ))
}

/// Resolve a 1-based index against a table, rejecting 0 and anything
/// past the end.
fn resolve(index: i64, len: usize) -> Option<usize> {
    if index <= 0 || index as usize > len {
        warn!("Detected reference does not exist");
        return None;
    }
    Some(index as usize - 1)
}

fn parse_vertex(args: &[&str], scene: &mut Scene) -> bool {
    if args.len() != 4 {
        return false;
    }
    match parse_vec3(&args[1..]) {
        Some(v) => {
            scene.vertices.push(v);
            true
        }
        None => false,
    }
}

fn parse_nongeo(args: &[&str], scene: &mut Scene) -> bool {
    if args.len() != 4 {
        return false;
    }
    match parse_vec3(&args[1..]) {
        Some(v) => {
            scene.nongeos.push(v);
            true
        }
        None => false,
    }
}

fn parse_directional_light(args: &[&str], scene: &mut Scene) -> bool {
    if args.len() < 4 {
        return false;
    }
    let (Some(i1), Some(f1), Some(f2)) = (
        parse_int(args[1]),
        parse_float(args[2]),
        parse_float(args[3]),
    ) else {
        return false;
    };
    let Some(ng) = resolve(i1, scene.nongeos.len()) else {
        return false;
    };
    let mut colour = Fourier::default();
    if f1 != f2 && args.len() > 4 {
        colour = parse_fourier(&args[4..], f1, f2);
    }
    scene.lights.push(Light {
        colour,
        direction: (-scene.nongeos[ng]).normalize(),
        ..Light::default()
    });
    true
}

fn parse_area_light(args: &[&str], scene: &mut Scene) -> bool {
    if args.len() < 10 {
        return false;
    }
    let (Some(i1), Some(f1), Some(f2)) = (
        parse_int(args[1]),
        parse_float(args[2]),
        parse_float(args[3]),
    ) else {
        return false;
    };
    let Some(v) = resolve(i1, scene.vertices.len()) else {
        return false;
    };
    let (Some(wvec), Some(hvec)) = (parse_vec3(&args[4..7]), parse_vec3(&args[7..10])) else {
        return false;
    };
    let mut colour = Fourier::default();
    if f1 != f2 && args.len() > 10 {
        colour = parse_fourier(&args[10..], f1, f2);
    }
    scene.lights.push(Light {
        position: scene.vertices[v],
        colour,
        wvec,
        hvec,
        ..Light::default()
    });
    true
}

fn parse_sphere_light(args: &[&str], scene: &mut Scene, current_material: i32) -> bool {
    if args.len() < 5 {
        return false;
    }
    let (Some(i1), Some(f1), Some(f2), Some(radius)) = (
        parse_int(args[1]),
        parse_float(args[2]),
        parse_float(args[3]),
        parse_float(args[4]),
    ) else {
        return false;
    };
    let Some(v) = resolve(i1, scene.vertices.len()) else {
        return false;
    };
    let mut colour = Fourier::default();
    if f1 != f2 && args.len() > 5 {
        colour = parse_fourier(&args[5..], f1, f2);
    }
    let position = scene.vertices[v];
    scene.lights.push(Light {
        position,
        colour,
        radius,
        ..Light::default()
    });
    // The emitter itself is hittable geometry, padded slightly so
    // paths terminate on it rather than tunnel through.
    scene
        .light_primitives
        .push(Primitive::sphere(position, radius + 0.001, current_material));
    true
}

fn parse_camera(args: &[&str], scene: &mut Scene) -> bool {
    if args.len() != 5 {
        return false;
    }
    let (Some(i1), Some(i2), Some(i3), Some(hangle)) = (
        parse_int(args[1]),
        parse_int(args[2]),
        parse_int(args[3]),
        parse_float(args[4]),
    ) else {
        return false;
    };
    let (Some(v), Some(look_at), Some(up)) = (
        resolve(i1, scene.vertices.len()),
        resolve(i2, scene.nongeos.len()),
        resolve(i3, scene.nongeos.len()),
    ) else {
        return false;
    };
    scene.camera = Camera {
        position: scene.vertices[v],
        look: (scene.nongeos[look_at] - scene.vertices[v]).normalize(),
        up: scene.nongeos[up].normalize(),
        hangle,
        ..Camera::default()
    };
    true
}

fn parse_sphere(args: &[&str], scene: &mut Scene, current_material: i32) -> bool {
    if args.len() != 3 {
        return false;
    }
    let (Some(i1), Some(radius)) = (parse_int(args[1]), parse_float(args[2])) else {
        return false;
    };
    let Some(v) = resolve(i1, scene.vertices.len()) else {
        return false;
    };
    scene
        .primitives
        .push(Primitive::sphere(scene.vertices[v], radius, current_material));
    true
}

fn parse_face(args: &[&str], scene: &mut Scene, current_material: i32) -> bool {
    if args.len() != 4 && args.len() != 5 {
        return false;
    }
    let mut corners = Vec::with_capacity(4);
    for token in &args[1..] {
        let Some(index) = parse_int(token) else {
            return false;
        };
        let Some(v) = resolve(index, scene.vertices.len()) else {
            return false;
        };
        corners.push(scene.vertices[v]);
    }
    scene.primitives.push(Primitive::triangle(
        corners[0],
        corners[1],
        corners[2],
        current_material,
    ));
    if corners.len() == 4 {
        scene.primitives.push(Primitive::triangle(
            corners[0],
            corners[2],
            corners[3],
            current_material,
        ));
    }
    true
}

fn set_material(args: &[&str], scene: &Scene, current_material: &mut i32) -> bool {
    if args.len() != 2 {
        return false;
    }
    match scene.material_names.get(args[1]) {
        Some(index) => {
            *current_material = *index as i32;
            true
        }
        None => false,
    }
}
