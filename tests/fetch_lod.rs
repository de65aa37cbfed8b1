use glam::{Vec3, Vec4};
use kestrel_prefilter::cubemap::{direction_to_face, face_direction, CubeFace, CubeMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const EDGE_EPSILON: f32 = 1e-4;

fn random_cubemap(size: u32, mip_count: usize, seed: u64) -> CubeMap {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut cubemap = CubeMap::new(size, size, mip_count).expect("cube map");
    for level in 0..mip_count {
        for face in cubemap.edit_mip(level).iter_mut() {
            for texel in face.iter_mut() {
                *texel = Vec4::new(rng.gen(), rng.gen(), rng.gen(), 1.0);
            }
        }
    }
    cubemap
}

fn random_direction(rng: &mut StdRng) -> Vec3 {
    loop {
        let dir = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        if dir.length_squared() > 1e-3 {
            return dir;
        }
    }
}

fn assert_close(a: Vec4, b: Vec4, tolerance: f32, context: &str) {
    assert!((a - b).abs().max_element() <= tolerance, "{context}: {a:?} vs {b:?} (tolerance {tolerance})");
}

#[test]
fn fetch_is_continuous_across_every_cube_edge() {
    let cubemap = random_cubemap(8, 3, 7);
    for level in 0..cubemap.mip_count() {
        for face in CubeFace::ALL {
            for along in [-0.99f32, -0.95, -0.9, -0.45, -0.2, 0.0, 0.3, 0.45, 0.9, 0.95, 0.99] {
                let edges = [
                    (face_direction(face, 1.0 - EDGE_EPSILON, along), face_direction(face, 1.0 + EDGE_EPSILON, along)),
                    (face_direction(face, -1.0 + EDGE_EPSILON, along), face_direction(face, -1.0 - EDGE_EPSILON, along)),
                    (face_direction(face, along, 1.0 - EDGE_EPSILON), face_direction(face, along, 1.0 + EDGE_EPSILON)),
                    (face_direction(face, along, -1.0 + EDGE_EPSILON), face_direction(face, along, -1.0 - EDGE_EPSILON)),
                ];
                for (inside, outside) in edges {
                    assert_ne!(direction_to_face(outside).0, face, "outside sample should cross the edge");
                    let a = cubemap.fetch_lod(inside, level as f32);
                    let b = cubemap.fetch_lod(outside, level as f32);
                    assert_close(a, b, 5e-3, &format!("mip {level} face {} along {along}", face.label()));
                }
            }
        }
    }
}

#[test]
fn fetch_is_continuous_around_cube_corners() {
    let cubemap = random_cubemap(8, 3, 13);
    let mut rng = StdRng::seed_from_u64(17);
    for level in 0..cubemap.mip_count() {
        for _ in 0..200 {
            let corner = Vec3::new(
                if rng.gen::<bool>() { 1.0 } else { -1.0 },
                if rng.gen::<bool>() { 1.0 } else { -1.0 },
                if rng.gen::<bool>() { 1.0 } else { -1.0 },
            );
            let offset = Vec3::new(rng.gen_range(-0.02..0.02), rng.gen_range(-0.02..0.02), rng.gen_range(-0.02..0.02));
            let dir = corner + offset;
            let nudge = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)) * 1e-5;
            let a = cubemap.fetch_lod(dir, level as f32);
            let b = cubemap.fetch_lod(dir + nudge, level as f32);
            assert_close(a, b, 5e-3, &format!("mip {level} near corner {corner:?}"));
        }
    }
}

#[test]
fn fetch_is_continuous_across_face_centre_lines() {
    let cubemap = random_cubemap(16, 1, 11);
    let a = cubemap.fetch_lod(Vec3::new(1.0, EDGE_EPSILON, 0.0), 0.0);
    let b = cubemap.fetch_lod(Vec3::new(1.0, -EDGE_EPSILON, 0.0), 0.0);
    assert_close(a, b, 5e-3, "+X centre line");
}

#[test]
fn fetch_at_edge_blends_both_faces() {
    let mut cubemap = CubeMap::new(4, 4, 1).expect("cube map");
    cubemap.fill_face(0, CubeFace::PositiveX, Vec4::ONE);
    let edge = cubemap.fetch_lod(Vec3::new(1.0, 0.1, 1.0), 0.0);
    assert_close(edge, Vec4::splat(0.5), 1e-4, "+X/+Z edge");
}

#[test]
fn integer_lod_samples_exactly_one_level() {
    let cubemap = random_cubemap(8, 4, 21);
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..64 {
        let dir = random_direction(&mut rng);
        for level in 0..cubemap.mip_count() {
            assert_eq!(cubemap.fetch_lod(dir, level as f32), cubemap.fetch_level(dir, level));
        }
    }
}

#[test]
fn fractional_lod_blends_bracketing_levels() {
    let cubemap = random_cubemap(8, 4, 33);
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..64 {
        let dir = random_direction(&mut rng);
        let lod: f32 = rng.gen_range(0.0..3.0);
        let lower = lod.floor() as usize;
        let frac = lod - lod.floor();
        let expected = cubemap.fetch_level(dir, lower).lerp(cubemap.fetch_level(dir, lower + 1), frac);
        assert_close(cubemap.fetch_lod(dir, lod), expected, 1e-6, &format!("lod {lod}"));
    }
}

#[test]
fn direction_length_does_not_matter() {
    let cubemap = random_cubemap(8, 2, 41);
    let dir = Vec3::new(-0.3, 0.8, 0.45);
    assert_close(cubemap.fetch_lod(dir, 0.6), cubemap.fetch_lod(dir * 25.0, 0.6), 1e-5, "scaled direction");
}
