//! Scene and material file round trips.

use approx::assert_relative_eq;
use prism::core::material::MaterialType;
use prism::core::medium::MaterialRef;
use prism::core::prism::{wavelength, SPECTRAL_SAMPLES};
use prism::loaders;
use std::fs;
use std::path::PathBuf;

/// A fresh scratch directory per test, so sibling material files
/// resolve the same way they do in production.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("prism-parse-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn minimal_scene_round_trips() {
    let dir = scratch("minimal");
    let path = dir.join("scene.obj");
    fs::write(
        &path,
        "# a triangle under a directional light\n\
         v 0 0 0\n\
         v 1 0 0\n\
         v 0 1 0\n\
         ng 0 0 -1\n\
         ld 1 100 700 1.0 1.0\n\
         f 1 2 3\n",
    )
    .unwrap();

    let scene = loaders::load(&path).unwrap();
    assert!(scene.validated);
    assert_eq!(scene.vertices.len(), 3);
    assert_eq!(scene.primitives.len(), 1);
    assert_eq!(scene.lights.len(), 1);
    // `ld` flips the stored vector: the light direction points back
    // towards the light.
    assert_relative_eq!(scene.lights[0].direction.z, 1.0, epsilon = 1e-5);
}

#[test]
fn quads_become_two_triangles() {
    let dir = scratch("quad");
    let path = dir.join("scene.obj");
    fs::write(
        &path,
        "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
    )
    .unwrap();
    let scene = loaders::load(&path).unwrap();
    assert_eq!(scene.primitives.len(), 2);
}

#[test]
fn bad_lines_are_skipped_not_fatal() {
    let dir = scratch("bad-lines");
    let path = dir.join("scene.obj");
    fs::write(
        &path,
        "v 0 0 0\n\
         v nonsense 0 0\n\
         sphere 0 1.0\n\
         sphere 7 1.0\n\
         wibble 1 2 3\n\
         sphere 1 1.0\n",
    )
    .unwrap();
    let scene = loaders::load(&path).unwrap();
    assert!(scene.validated);
    assert_eq!(scene.vertices.len(), 1);
    // Only the final, valid sphere survives: index 0 and index 7 are
    // out of range.
    assert_eq!(scene.primitives.len(), 1);
}

#[test]
fn unreadable_scene_is_an_error() {
    assert!(loaders::load("/definitely/not/here.obj").is_err());
}

#[test]
fn camera_directive_builds_the_frame() {
    let dir = scratch("camera");
    let path = dir.join("scene.obj");
    fs::write(
        &path,
        "v 0 0 3\nng 0 0 0\nng 0 1 0\ncamera 1 1 2 0.7854\n",
    )
    .unwrap();
    let scene = loaders::load(&path).unwrap();
    assert_relative_eq!(scene.camera.position.z, 3.0, epsilon = 1e-5);
    // Look runs from the eye towards the first non-geometric vector.
    assert_relative_eq!(scene.camera.look.z, -1.0, epsilon = 1e-5);
    assert_relative_eq!(scene.camera.up.y, 1.0, epsilon = 1e-5);
    assert_relative_eq!(scene.camera.hangle, 0.7854, epsilon = 1e-5);
}

#[test]
fn material_library_round_trips() {
    let dir = scratch("materials");
    let scene_path = dir.join("scene.obj");
    let mtl_path = dir.join("scene.mtl");
    fs::write(
        &mtl_path,
        "newmtl glass\n\
         type dielectric\n\
         diffract true\n\
         shiny 5\n\
         ior 100 700 1.5 1.5\n\
         absorb 100 700 1.0 1.0\n\
         transmission 100 700 0.5 0.5\n\
         newmtl plain\n\
         type lambertian\n",
    )
    .unwrap();
    fs::write(
        &scene_path,
        "mtllib scene.mtl\n\
         v 0 0 0\n\
         usemtl glass\n\
         sphere 1 0.5\n\
         usemtl plain\n\
         sphere 1 0.25\n",
    )
    .unwrap();

    let scene = loaders::load(&scene_path).unwrap();
    assert_eq!(scene.materials.len(), 2);
    assert_eq!(scene.primitives.len(), 2);
    assert_eq!(scene.primitives[0].material(), 0);
    assert_eq!(scene.primitives[1].material(), 1);

    let glass = scene.material(MaterialRef::Scene(0));
    assert_eq!(glass.material_type(), MaterialType::Dielectric);
    assert!(glass.diffract());
    assert_relative_eq!(glass.shiny(), 5.0);
    assert_relative_eq!(glass.ior().evaluate(wavelength(5)), 1.5, epsilon = 1e-3);

    // Transmission is stored pre-logged so Beer-Lambert can use it as
    // an absorption coefficient directly: tau = -ln(0.5).
    for i in 0..SPECTRAL_SAMPLES {
        assert_relative_eq!(
            glass.transmission().evaluate(wavelength(i)),
            0.5f32.ln().abs(),
            epsilon = 1e-2
        );
    }

    let plain = scene.material(MaterialRef::Scene(1));
    assert_eq!(plain.material_type(), MaterialType::Lambertian);
}

#[test]
fn duplicate_material_names_are_rejected() {
    let dir = scratch("dup-materials");
    let mtl_path = dir.join("scene.mtl");
    let scene_path = dir.join("scene.obj");
    fs::write(&mtl_path, "newmtl a\nnewmtl a\n").unwrap();
    fs::write(&scene_path, "mtllib scene.mtl\n").unwrap();
    let scene = loaders::load(&scene_path).unwrap();
    assert_eq!(scene.materials.len(), 1);
}

#[test]
fn missing_material_library_is_survivable() {
    let dir = scratch("missing-mtl");
    let scene_path = dir.join("scene.obj");
    fs::write(&scene_path, "mtllib nope.mtl\nv 0 0 0\nsphere 1 1.0\n").unwrap();
    let scene = loaders::load(&scene_path).unwrap();
    assert!(scene.validated);
    assert_eq!(scene.primitives.len(), 1);
}

#[test]
fn emission_marks_materials_emissive() {
    let dir = scratch("emissive");
    let mtl_path = dir.join("scene.mtl");
    let scene_path = dir.join("scene.obj");
    fs::write(
        &mtl_path,
        "newmtl lamp\nemission 100 700 5.0 5.0\nnewmtl dull\nemission 0 0\n",
    )
    .unwrap();
    fs::write(&scene_path, "mtllib scene.mtl\n").unwrap();
    let scene = loaders::load(&scene_path).unwrap();
    assert!(scene.material(MaterialRef::Scene(0)).emissive());
    assert!(!scene.material(MaterialRef::Scene(1)).emissive());
}
