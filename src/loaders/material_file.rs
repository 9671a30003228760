//! Material library parser.

use super::scene_file::parse_fourier;
use super::{parse_float, parse_int};
use crate::core::fourier::Fourier;
use crate::core::material::{Material, MaterialType};
use crate::core::prism::*;
use crate::core::scene::Scene;
use crate::core::spectrum::Spectrum;
use log::warn;
use std::fs;

/// Floor under transmission curve values before the Beer-Lambert log.
const TRANSMISSION_FLOOR: Float = 1e-5;

/// Handle a `mtllib` directive: load the named library from the scene
/// file's directory. Failing to open it is a warning, not a fatal.
///
/// * `args`  - The directive tokens including `mtllib` itself.
/// * `scene` - The scene collecting materials.
pub fn load(args: &[&str], scene: &mut Scene) -> bool {
    if args.len() != 2 {
        return false;
    }
    let path = match scene.filepath.parent() {
        Some(parent) => parent.join(args[1]),
        None => args[1].into(),
    };
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(_) => {
            warn!("Unable to open file \"{}\"", path.display());
            return false;
        }
    };

    let mut current = String::new();
    for (number, line) in text.lines().enumerate() {
        let args: Vec<&str> = line.split_whitespace().collect();
        if args.is_empty() || args[0].starts_with('#') {
            continue;
        }
        if !parse_directive(&args, scene, &mut current) {
            warn!(
                "Unable to parse line {} of \"{}\"",
                number + 1,
                path.display()
            );
        }
    }
    true
}

fn parse_directive(args: &[&str], scene: &mut Scene, current: &mut String) -> bool {
    match args[0] {
        "newmtl" => parse_newmtl(args, scene, current),
        "convert" => parse_curve(args, scene, current, Material::set_convert),
        "diffuse" => parse_curve(args, scene, current, Material::set_diffuse),
        "specular" => parse_curve(args, scene, current, Material::set_specular),
        "ambient" => parse_curve(args, scene, current, Material::set_ambient),
        "absorb" => parse_curve(args, scene, current, Material::set_absorb),
        "ior" => parse_curve(args, scene, current, Material::set_ior),
        "emission" => parse_curve(args, scene, current, Material::set_emission),
        "transmission" => parse_transmission(args, scene, current),
        "shiny" => parse_shiny(args, scene, current),
        "type" => parse_type(args, scene, current),
        "diffract" => parse_diffract(args, scene, current),
        other => {
            warn!("Skipping property \"{}\", no specification implemented", other);
            true
        }
    }
}

fn current_material<'a>(scene: &'a mut Scene, current: &str) -> Option<&'a mut Material> {
    let index = *scene.material_names.get(current)?;
    scene.materials.get_mut(index)
}

fn parse_newmtl(args: &[&str], scene: &mut Scene, current: &mut String) -> bool {
    if args.len() != 2 {
        return false;
    }
    if scene.material_names.contains_key(args[1]) {
        warn!("Material name \"{}\" already exists", args[1]);
        return false;
    }
    scene
        .material_names
        .insert(args[1].to_string(), scene.materials.len());
    scene.materials.push(Material::default());
    *current = args[1].to_string();
    true
}

/// Shared shape of the curve directives: `name r1 r2 samples...`.
/// Equal interval ends mean "unset" and install the empty curve.
fn parse_curve(
    args: &[&str],
    scene: &mut Scene,
    current: &str,
    set: fn(&mut Material, Fourier),
) -> bool {
    let Some(curve) = read_curve(args) else {
        return false;
    };
    let Some(material) = current_material(scene, current) else {
        return false;
    };
    set(material, curve);
    true
}

fn read_curve(args: &[&str]) -> Option<Fourier> {
    if args.len() < 3 {
        return None;
    }
    let (r1, r2) = (parse_int(args[1])?, parse_int(args[2])?);
    if r1 != r2 && args.len() > 3 {
        Some(parse_fourier(&args[3..], r1 as Float, r2 as Float))
    } else {
        Some(Fourier::default())
    }
}

fn parse_transmission(args: &[&str], scene: &mut Scene, current: &str) -> bool {
    let Some(curve) = read_curve(args) else {
        return false;
    };
    let Some(material) = current_material(scene, current) else {
        return false;
    };
    // Store the absorption coefficient directly so Beer-Lambert can
    // exponentiate the fitted curve without a log per bounce.
    let mut tau = Spectrum::default();
    for i in 0..SPECTRAL_SAMPLES {
        tau[i] = -curve.evaluate(wavelength(i)).max(TRANSMISSION_FLOOR).ln();
    }
    material.set_transmission(Fourier::from_spectrum(&tau));
    true
}

fn parse_shiny(args: &[&str], scene: &mut Scene, current: &str) -> bool {
    if args.len() != 2 {
        return false;
    }
    let Some(shiny) = parse_float(args[1]) else {
        return false;
    };
    let Some(material) = current_material(scene, current) else {
        return false;
    };
    material.set_shiny(shiny);
    true
}

fn parse_type(args: &[&str], scene: &mut Scene, current: &str) -> bool {
    if args.len() != 2 {
        return false;
    }
    let material_type = match args[1] {
        "lambertian" => MaterialType::Lambertian,
        "dielectric" => MaterialType::Dielectric,
        "volumetric" => MaterialType::Volumetric,
        _ => return false,
    };
    let Some(material) = current_material(scene, current) else {
        return false;
    };
    material.set_material_type(material_type);
    true
}

fn parse_diffract(args: &[&str], scene: &mut Scene, current: &str) -> bool {
    if args.len() != 2 {
        return false;
    }
    let diffract = match args[1] {
        "true" => true,
        "false" => false,
        _ => return false,
    };
    let Some(material) = current_material(scene, current) else {
        return false;
    };
    material.set_diffract(diffract);
    true
}
