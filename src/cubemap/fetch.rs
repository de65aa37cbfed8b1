use super::{direction_to_face, face_direction, CubeFace, CubeMap};
use glam::{Vec3, Vec4};

impl CubeMap {
    /// Filtered radiance along `dir` at fractional level of detail `lod`.
    ///
    /// `lod` is clamped to the chain; the two bracketing levels are sampled bilinearly and
    /// blended by the fractional part. A zero direction has no face and yields zero.
    pub fn fetch_lod(&self, dir: Vec3, lod: f32) -> Vec4 {
        let Some(dir) = dir.try_normalize() else {
            return Vec4::ZERO;
        };
        let max_lod = (self.mip_count() - 1) as f32;
        let lod = if lod.is_nan() { 0.0 } else { lod.clamp(0.0, max_lod) };
        let base = lod.floor();
        let level = base as usize;
        let frac = lod - base;
        let lower = self.sample_bilinear(dir, level);
        if frac <= 0.0 || level + 1 >= self.mip_count() {
            return lower;
        }
        let upper = self.sample_bilinear(dir, level + 1);
        lower.lerp(upper, frac)
    }

    /// Bilinear radiance along `dir` from a single mip level.
    pub fn fetch_level(&self, dir: Vec3, level: usize) -> Vec4 {
        self.check_level(level);
        match dir.try_normalize() {
            Some(dir) => self.sample_bilinear(dir, level),
            None => Vec4::ZERO,
        }
    }

    fn sample_bilinear(&self, dir: Vec3, level: usize) -> Vec4 {
        let (face, u, v) = direction_to_face(dir);
        let (w, h) = self.mip_dimensions(level);
        let px = (u + 1.0) * 0.5 * w as f32 - 0.5;
        let py = (v + 1.0) * 0.5 * h as f32 - 0.5;
        let fx = px.floor();
        let fy = py.floor();
        let tx = px - fx;
        let ty = py - fy;
        let (x0, y0) = (fx as i32, fy as i32);

        let c00 = self.texel_across_edges(level, face, x0, y0);
        let c10 = self.texel_across_edges(level, face, x0 + 1, y0);
        let c01 = self.texel_across_edges(level, face, x0, y0 + 1);
        let c11 = self.texel_across_edges(level, face, x0 + 1, y0 + 1);
        c00.lerp(c10, tx).lerp(c01.lerp(c11, tx), ty)
    }

    /// Texel `(x, y)` of `face`, where coordinates one step outside the face resolve to the
    /// edge texel of the neighbouring face at the same position along the shared edge.
    fn texel_across_edges(&self, level: usize, face: CubeFace, x: i32, y: i32) -> Vec4 {
        let (w, h) = self.mip_dimensions(level);
        let faces = &self.mips[level];
        if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
            return faces[face.index()][(y as u32 * w + x as u32) as usize];
        }
        let x_inside = x.clamp(0, w as i32 - 1);
        let y_inside = y.clamp(0, h as i32 - 1);
        if x != x_inside && y != y_inside {
            // The three faces meeting at a cube corner share one value for the missing
            // diagonal texel: the mean of their corner texels.
            let own = faces[face.index()][(y_inside as u32 * w + x_inside as u32) as usize];
            let along_x = self.texel_across_edges(level, face, x, y_inside);
            let along_y = self.texel_across_edges(level, face, x_inside, y);
            return (own + along_x + along_y) / 3.0;
        }
        // Fold the texel onto the shared edge, then step just past it so the direction lands
        // on the neighbour's edge row or column without drifting along the edge.
        let past_edge = 1.0 + 0.5 / w.max(h) as f32;
        let (mut u, mut v) = (texel_coord(x, w), texel_coord(y, h));
        if x != x_inside {
            u = past_edge.copysign(u);
        } else {
            v = past_edge.copysign(v);
        }
        let (neighbor, nu, nv) = direction_to_face(face_direction(face, u, v));
        let nx = nearest_texel(nu, w);
        let ny = nearest_texel(nv, h);
        faces[neighbor.index()][(ny * w + nx) as usize]
    }
}

fn texel_coord(index: i32, size: u32) -> f32 {
    2.0 * (index as f32 + 0.5) / size as f32 - 1.0
}

fn nearest_texel(coord: f32, size: u32) -> u32 {
    let texel = ((coord + 1.0) * 0.5 * size as f32 - 0.5).round();
    texel.clamp(0.0, (size - 1) as f32) as u32
}
