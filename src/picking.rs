use glam::{Mat4, Vec3};

/// Distance along a normalized ray to the first intersection with a sphere, if any.
pub fn ray_sphere_intersection(origin: Vec3, dir: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let mut t = -b - sqrt_d;
    if t < 0.0 {
        t = -b + sqrt_d;
    }
    if t < 0.0 {
        return None;
    }
    Some(t)
}

pub fn matrix_is_finite(mat: &Mat4) -> bool {
    mat.to_cols_array().iter().all(|v| v.is_finite())
}

pub fn ray_aabb_intersection(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let mut t_min: f32 = 0.0;
    let mut t_max: f32 = f32::INFINITY;
    let origin_arr = origin.to_array();
    let dir_arr = dir.to_array();
    let min_arr = min.to_array();
    let max_arr = max.to_array();
    for i in 0..3 {
        let o = origin_arr[i];
        let d = dir_arr[i];
        if d.abs() < 1e-6 {
            if o < min_arr[i] || o > max_arr[i] {
                return None;
            }
        } else {
            let inv_d = 1.0 / d;
            let mut t1 = (min_arr[i] - o) * inv_d;
            let mut t2 = (max_arr[i] - o) * inv_d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    if t_max < 0.0 {
        return None;
    }
    let t_hit = if t_min >= 0.0 { t_min } else { t_max };
    Some((t_hit, origin + dir * t_hit))
}

/// Casts a world-space ray against a shape expressed in the local space of `world`.
///
/// The ray is carried into local space, tested there, and the hit point is mapped back so the
/// returned distance is measured in world units regardless of the node's scale.
fn ray_hit_local<F>(origin: Vec3, dir: Vec3, world: &Mat4, local_test: F) -> Option<f32>
where
    F: FnOnce(Vec3, Vec3) -> Option<Vec3>,
{
    let inv = world.inverse();
    if !matrix_is_finite(&inv) {
        return None;
    }
    let origin_local = inv.transform_point3(origin);
    let dir_local = inv.transform_vector3(dir);
    if dir_local.length_squared() <= f32::EPSILON {
        return None;
    }
    let hit_local = local_test(origin_local, dir_local.normalize())?;
    let hit_world = world.transform_point3(hit_local);
    Some((hit_world - origin).length())
}

pub fn ray_hit_box(origin: Vec3, dir: Vec3, world: &Mat4, half_extents: Vec3) -> Option<f32> {
    ray_hit_local(origin, dir, world, |o, d| {
        ray_aabb_intersection(o, d, -half_extents, half_extents).map(|(_, hit)| hit)
    })
}

pub fn ray_hit_ball(origin: Vec3, dir: Vec3, world: &Mat4, radius: f32) -> Option<f32> {
    ray_hit_local(origin, dir, world, |o, d| ray_sphere_intersection(o, d, Vec3::ZERO, radius).map(|t| o + d * t))
}
