//! Exact triangle/axis-aligned-box overlap via the separating axis theorem.
//!
//! Thirteen candidate axes are tested: the nine cross products of the
//! triangle edges with the box axes, the three box face normals and the
//! triangle normal. Touching counts as overlap. A degenerate triangle yields
//! zero-length axes, which project everything to zero and therefore never
//! separate; nothing here divides.

use glam::Vec3;

#[inline]
fn box_radius(half: Vec3, axis: Vec3) -> f32 {
    half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs()
}

/// Returns `true` when the triangle touches the box `center ± half`.
pub fn triangle_box_overlap(vertices: &[Vec3; 3], center: Vec3, half: Vec3) -> bool {
    let v0 = vertices[0] - center;
    let v1 = vertices[1] - center;
    let v2 = vertices[2] - center;

    let e0 = v1 - v0;
    let e1 = v2 - v1;
    let e2 = v0 - v2;

    // edge x {X, Y, Z}
    let axes = [
        Vec3::new(0.0, -e0.z, e0.y),
        Vec3::new(0.0, -e1.z, e1.y),
        Vec3::new(0.0, -e2.z, e2.y),
        Vec3::new(e0.z, 0.0, -e0.x),
        Vec3::new(e1.z, 0.0, -e1.x),
        Vec3::new(e2.z, 0.0, -e2.x),
        Vec3::new(-e0.y, e0.x, 0.0),
        Vec3::new(-e1.y, e1.x, 0.0),
        Vec3::new(-e2.y, e2.x, 0.0),
    ];

    for axis in axes.iter() {
        let p0 = v0.dot(*axis);
        let p1 = v1.dot(*axis);
        let p2 = v2.dot(*axis);
        let min_p = p0.min(p1.min(p2));
        let max_p = p0.max(p1.max(p2));
        let r = box_radius(half, *axis);
        if min_p > r || max_p < -r {
            return false;
        }
    }

    let tri_min = v0.min(v1).min(v2);
    let tri_max = v0.max(v1).max(v2);
    if tri_min.cmpgt(half).any() || tri_max.cmplt(-half).any() {
        return false;
    }

    let normal = e0.cross(e1);
    let d = normal.dot(v0);
    if d.abs() > box_radius(half, normal) {
        return false;
    }

    true
}
