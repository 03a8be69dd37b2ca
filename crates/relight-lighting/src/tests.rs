use super::*;
use relight_geom::{Mat4, Rgb, Vec3};
use relight_mesh::{TriMesh, UvGenParams, generate, primitives};
use std::sync::{Arc, Mutex};

fn lightmapped(mesh: TriMesh) -> Arc<TriMesh> {
    Arc::new(generate(&mesh, &UvGenParams::default()).unwrap().lightmap_mesh)
}

/// 4x4 floor with a unit cube hovering over its centre, lit from straight above.
fn shadow_scene(lights: &[Light]) -> Scene {
    let mut b = SceneBuilder::begin(LightmapSettings {
        min_size: 16,
        max_size: 32,
        reference_area: None,
    });
    for l in lights {
        b.add_light(*l);
    }
    let grey = Arc::new(Material::new(Rgb::gray(0.5)));
    b.add_instance(
        "floor",
        lightmapped(primitives::plane(4.0, 2)),
        Mat4::IDENTITY,
        grey.clone(),
        true,
    );
    b.add_instance(
        "box",
        lightmapped(primitives::cube(1.0)),
        Mat4::translation(Vec3::new(0.0, 1.0, 0.0)),
        grey,
        true,
    );
    b.end().unwrap()
}

fn sun() -> Light {
    Light::directional(Vec3::new(0.0, -1.0, 0.0), Rgb::WHITE, 1.0)
}

fn settings(traversal: Traversal) -> BakeSettings {
    BakeSettings {
        traversal,
        expand: 0,
        indirect: IndirectLightSettings {
            photons_per_light: 2_000,
            samples: 4,
            ..IndirectLightSettings::default()
        },
        ..BakeSettings::default()
    }
}

fn colors(scene: &Scene, name: &str) -> Vec<Rgb> {
    let lm = scene.find(name).unwrap().lightmap().unwrap();
    lm.lumels().iter().map(|l| l.color).collect()
}

#[test]
fn zero_lights_bake_to_ambient() {
    let scene = shadow_scene(&[]);
    let s = settings(Traversal::PerLumel);
    let direct = DirectLightBaker::new(&s);
    let report = bake_scene(&scene, &[&direct], &s, &NoProgress, &CancelToken::new());
    assert!(report.is_complete());
    assert_eq!(report.baked.len(), 2);
    for inst in scene.instances() {
        let lm = inst.lightmap().unwrap();
        assert!(lm.valid_count() > 0);
        for l in lm.lumels().iter().filter(|l| l.valid) {
            assert_eq!(l.color, s.indirect.ambient);
        }
    }
}

#[test]
fn box_shadows_the_floor() {
    let scene = shadow_scene(&[sun()]);
    let s = settings(Traversal::PerLumel);
    let direct = DirectLightBaker::new(&s);
    let floor = scene.find("floor").unwrap().id();
    bake_instance(&scene, floor, &[&direct], &s, &NoProgress, &CancelToken::new()).unwrap();

    let lm = scene.find("floor").unwrap().lightmap().unwrap();
    let (mut shaded, mut lit) = (0, 0);
    for l in lm.lumels().iter().filter(|l| l.valid) {
        let (x, z) = (l.position.x.abs(), l.position.z.abs());
        if x < 0.4 && z < 0.4 {
            assert_eq!(l.color, s.indirect.ambient);
            shaded += 1;
        } else if x > 0.6 || z > 0.6 {
            assert!((l.color.r - (s.indirect.ambient.r + 1.0)).abs() < 1e-4);
            lit += 1;
        }
    }
    assert!(shaded > 0 && lit > 0);
}

#[test]
fn per_face_matches_per_lumel() {
    let run = |traversal| {
        let scene = shadow_scene(&[
            sun(),
            Light::point(Vec3::new(1.5, 1.0, 1.5), 4.0, Rgb::new(1.0, 0.5, 0.2), 2.0),
        ]);
        let s = settings(traversal);
        emit_photons(&scene, &s);
        let (direct, indirect) = (DirectLightBaker::new(&s), IndirectLightBaker::new(&s));
        let report = bake_scene(&scene, &[&direct, &indirect], &s, &NoProgress, &CancelToken::new());
        assert!(report.is_complete());
        (colors(&scene, "floor"), colors(&scene, "box"))
    };
    assert_eq!(run(Traversal::PerLumel), run(Traversal::PerFace));
}

#[test]
fn indirect_pass_only_adds_light() {
    let scene = shadow_scene(&[sun()]);
    let s = settings(Traversal::PerLumel);
    let stats = emit_photons(&scene, &s);
    assert_eq!(stats.emitted, 2_000);
    assert!(stats.deposited > 0);
    assert!(scene.find("floor").unwrap().photonmap().unwrap().photon_count() > 0);

    let direct = DirectLightBaker::new(&s);
    let indirect = IndirectLightBaker::new(&s);
    bake_scene(&scene, &[&direct], &s, &NoProgress, &CancelToken::new());
    let before = colors(&scene, "floor");
    bake_scene(&scene, &[&indirect], &s, &NoProgress, &CancelToken::new());
    let after = colors(&scene, "floor");
    let lm = scene.find("floor").unwrap().lightmap().unwrap();
    for ((b, a), l) in before.iter().zip(&after).zip(lm.lumels()) {
        if l.valid {
            assert!(a.r >= b.r && a.g >= b.g && a.b >= b.b);
        }
    }
    assert_eq!(scene.find("floor").unwrap().revision(), 2);
}

#[test]
fn dynamic_instance_is_recorded_as_invalid_call() {
    let mut b = SceneBuilder::begin(LightmapSettings::default());
    let mat = Arc::new(Material::default());
    let floor = b.add_instance(
        "floor",
        lightmapped(primitives::plane(2.0, 1)),
        Mat4::IDENTITY,
        mat.clone(),
        true,
    );
    let ball = b.add_instance(
        "ball",
        Arc::new(primitives::cylinder(0.5, 1.0, 8)),
        Mat4::translation(Vec3::new(0.0, 2.0, 0.0)),
        mat,
        false,
    );
    let scene = b.end().unwrap();
    let s = settings(Traversal::PerLumel);
    let direct = DirectLightBaker::new(&s);
    let report = bake_scene(&scene, &[&direct], &s, &NoProgress, &CancelToken::new());
    assert_eq!(report.baked.len(), 1);
    assert_eq!(report.baked[0].instance, floor);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, ball);
    assert!(matches!(report.failed[0].1, BakeError::InvalidCall(_)));
    assert_eq!(scene.instance(ball).unwrap().state(), BakeState::Unbaked);
}

#[test]
fn cancelled_bake_publishes_nothing() {
    let scene = shadow_scene(&[sun()]);
    let s = settings(Traversal::PerLumel);
    let direct = DirectLightBaker::new(&s);
    let cancel = CancelToken::new();
    cancel.cancel();
    let floor = scene.find("floor").unwrap();
    let err = bake_instance(&scene, floor.id(), &[&direct], &s, &NoProgress, &cancel).unwrap_err();
    assert_eq!(err, BakeError::Cancelled);
    assert_eq!(floor.state(), BakeState::Unbaked);
    assert!(!floor.is_dirty());
    assert_eq!(floor.revision(), 0);
    assert!(floor.lightmap().unwrap().lumels().iter().all(|l| l.color == Rgb::BLACK));
}

#[test]
fn progress_reports_completion_once_after_publish() {
    let scene = shadow_scene(&[]);
    let s = settings(Traversal::PerLumel);
    let direct = DirectLightBaker::new(&s);
    let seen = Mutex::new(Vec::new());
    let floor = scene.find("floor").unwrap();
    let sink = |id: InstanceId, step: u32, total: u32| {
        let published = scene.instance(id).is_some_and(|i| i.revision() > 0);
        seen.lock().unwrap().push((step, total, published));
    };
    let stats = bake_instance(&scene, floor.id(), &[&direct], &s, &sink, &CancelToken::new()).unwrap();
    let seen = seen.into_inner().unwrap();
    let height = floor.lightmap().unwrap().height();
    assert_eq!(stats.steps, height);
    assert_eq!(seen.len() as u32, height);
    assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
    let finals: Vec<_> = seen.iter().filter(|(step, total, _)| step == total).collect();
    assert_eq!(finals.len(), 1);
    assert!(finals[0].2);
    assert!(floor.take_dirty());
}

#[test]
fn open_sky_has_no_occlusion() {
    let mut b = SceneBuilder::begin(LightmapSettings::default());
    b.add_instance(
        "floor",
        lightmapped(primitives::plane(2.0, 1)),
        Mat4::IDENTITY,
        Arc::new(Material::default()),
        true,
    );
    let scene = b.end().unwrap();
    let s = settings(Traversal::PerLumel);
    let ao = AmbientOcclusionBaker::new(&s);
    bake_scene(&scene, &[&ao], &s, &NoProgress, &CancelToken::new());
    let lm = scene.find("floor").unwrap().lightmap().unwrap();
    assert!(lm.lumels().iter().filter(|l| l.valid).all(|l| l.color == Rgb::WHITE));
}

#[test]
fn sealing_rejects_duplicate_names_and_keeps_unique_ones() {
    let mesh = lightmapped(primitives::cube(1.0));
    let mat = Arc::new(Material::new(Rgb::WHITE));
    let mut b = SceneBuilder::begin(LightmapSettings::default());
    b.add_instance("a", mesh.clone(), Mat4::IDENTITY, mat.clone(), true);
    b.add_instance("a", mesh.clone(), Mat4::IDENTITY, mat.clone(), false);
    assert_eq!(b.end().unwrap_err(), SceneError::DuplicateName("a".into()));

    let mut b = SceneBuilder::begin(LightmapSettings::default());
    b.add_instance("a", mesh.clone(), Mat4::IDENTITY, mat.clone(), true);
    b.add_instance("b", mesh, Mat4::IDENTITY, mat, false);
    let scene = b.end().unwrap();
    assert_eq!(scene.instances().len(), 2);
    assert!(scene.find("a").unwrap().has_lightmap());
    assert!(!scene.find("b").unwrap().has_lightmap());
}
