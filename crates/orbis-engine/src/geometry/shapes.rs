//! Procedural geometry constructors.

use std::f32::consts::PI;

use cgmath::Point3;

use super::{Attribute, Geometry, NORMAL, POSITION, UV};

/// UV sphere centered at the origin.
///
/// `u` runs west to east with longitude, `v` from the north pole (0) to the
/// south pole (1), so an equirectangular image maps directly onto it.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let ws = width_segments.max(3);
    let hs = height_segments.max(2);

    let mut positions = Vec::with_capacity(((ws + 1) * (hs + 1) * 3) as usize);
    let mut normals = Vec::with_capacity(positions.capacity());
    let mut uvs = Vec::with_capacity(((ws + 1) * (hs + 1) * 2) as usize);

    for y in 0..=hs {
        let v = y as f32 / hs as f32;
        let theta = v * PI;
        for x in 0..=ws {
            let u = x as f32 / ws as f32;
            let phi = u * 2.0 * PI;

            let nx = -phi.cos() * theta.sin();
            let ny = theta.cos();
            let nz = phi.sin() * theta.sin();

            positions.extend_from_slice(&[nx * radius, ny * radius, nz * radius]);
            normals.extend_from_slice(&[nx, ny, nz]);
            uvs.extend_from_slice(&[u, v]);
        }
    }

    let row = ws + 1;
    let mut indices = Vec::with_capacity((ws * hs * 6) as usize);
    for y in 0..hs {
        for x in 0..ws {
            let a = y * row + x + 1;
            let b = y * row + x;
            let c = (y + 1) * row + x;
            let d = (y + 1) * row + x + 1;
            // Pole rows collapse to a single triangle each.
            if y != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if y != hs - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Geometry::new()
        .with_attribute(POSITION, Attribute::f32(positions, 3))
        .with_attribute(NORMAL, Attribute::f32(normals, 3))
        .with_attribute(UV, Attribute::f32(uvs, 2))
        .with_index(indices)
}

/// Plane in the XY plane facing +Z.
pub fn plane(width: f32, height: f32) -> Geometry {
    let (hw, hh) = (width * 0.5, height * 0.5);
    #[rustfmt::skip]
    let positions = vec![
        -hw, -hh, 0.0,
         hw, -hh, 0.0,
         hw,  hh, 0.0,
        -hw,  hh, 0.0,
    ];
    let normals = [0.0, 0.0, 1.0].repeat(4);
    let uvs = vec![0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];

    Geometry::new()
        .with_attribute(POSITION, Attribute::f32(positions, 3))
        .with_attribute(NORMAL, Attribute::f32(normals, 3))
        .with_attribute(UV, Attribute::f32(uvs, 2))
        .with_index(vec![0, 1, 2, 0, 2, 3])
}

/// Axis-aligned box. Each face is its own geometry group (material index
/// 0..6 in +X, -X, +Y, -Y, +Z, -Z order).
pub fn cuboid(width: f32, height: f32, depth: f32) -> Geometry {
    let h = [width * 0.5, height * 0.5, depth * 0.5];

    // (normal axis, sign, u axis, v axis, u flip for left-handed u/v pairs)
    let faces: [(usize, f32, usize, usize, f32); 6] = [
        (0, 1.0, 2, 1, -1.0),
        (0, -1.0, 2, 1, -1.0),
        (1, 1.0, 0, 2, -1.0),
        (1, -1.0, 0, 2, -1.0),
        (2, 1.0, 0, 1, 1.0),
        (2, -1.0, 0, 1, 1.0),
    ];

    let mut positions = Vec::with_capacity(6 * 4 * 3);
    let mut normals = Vec::with_capacity(6 * 4 * 3);
    let mut uvs = Vec::with_capacity(6 * 4 * 2);
    let mut indices = Vec::with_capacity(6 * 6);
    let mut geometry_groups = Vec::with_capacity(6);

    for (face, &(n, sign, ua, va, flip)) in faces.iter().enumerate() {
        let base = (face * 4) as u32;
        for (cu, cv) in [(-1.0f32, -1.0f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let mut p = [0.0f32; 3];
            p[n] = sign * h[n];
            // Counter-clockwise seen from outside.
            p[ua] = cu * sign * flip * h[ua];
            p[va] = cv * h[va];
            positions.extend_from_slice(&p);

            let mut nn = [0.0f32; 3];
            nn[n] = sign;
            normals.extend_from_slice(&nn);
            uvs.extend_from_slice(&[(cu + 1.0) * 0.5, 1.0 - (cv + 1.0) * 0.5]);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        geometry_groups.push(((face * 6) as u32, face));
    }

    let mut g = Geometry::new()
        .with_attribute(POSITION, Attribute::f32(positions, 3))
        .with_attribute(NORMAL, Attribute::f32(normals, 3))
        .with_attribute(UV, Attribute::f32(uvs, 2))
        .with_index(indices);
    for (start, material_index) in geometry_groups {
        g.add_group(start, 6, material_index);
    }
    g
}

/// Connected line through `points`; draw with `LineStrip`. A closed
/// polyline repeats the first point at the end.
pub fn polyline(points: &[Point3<f32>], closed: bool) -> Geometry {
    let mut positions: Vec<f32> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
    if closed {
        if let Some(first) = points.first() {
            positions.extend_from_slice(&[first.x, first.y, first.z]);
        }
    }
    Geometry::new().with_attribute(POSITION, Attribute::f32(positions, 3))
}

/// Independent segments from consecutive point pairs; draw with `Lines`.
/// Several polylines can share one geometry this way.
pub fn line_segments(polylines: &[Vec<Point3<f32>>]) -> Geometry {
    let mut positions = Vec::new();
    let mut indices = Vec::new();
    for line in polylines {
        let base = (positions.len() / 3) as u32;
        positions.extend(line.iter().flat_map(|p| [p.x, p.y, p.z]));
        for i in 1..line.len() as u32 {
            indices.extend_from_slice(&[base + i - 1, base + i]);
        }
    }
    Geometry::new()
        .with_attribute(POSITION, Attribute::f32(positions, 3))
        .with_index(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let g = uv_sphere(2.0, 16, 8);
        let s = g.bounding_sphere().unwrap();
        assert!((s.radius - 2.0).abs() < 1e-4);
        assert_eq!(g.vertex_count(), 17 * 9);
        let max = g.index().unwrap().iter().copied().max().unwrap() as usize;
        assert!(max < g.vertex_count());
    }

    #[test]
    fn cuboid_has_six_groups() {
        let g = cuboid(1.0, 2.0, 3.0);
        assert_eq!(g.groups().len(), 6);
        assert_eq!(g.element_count(), 36);
        let b = g.bounding_box().unwrap();
        assert_eq!(b.size(), cgmath::Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn segments_index_pairs() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(1.0, 1.0, 0.0);
        let g = line_segments(&[vec![a, b, c], vec![a, c]]);
        assert_eq!(g.index().unwrap(), &[0, 1, 1, 2, 3, 4]);
    }
}
