use bevy::prelude::*;

// Rays closer to parallel than this never reach the plane in view.
const PARALLEL_EPSILON: f32 = 0.001;

/// Distance along the ray to a horizontal plane at `plane_y`, if the plane is
/// in front of the origin.
pub fn ray_horizontal_plane_t(ray_origin: Vec3, ray_direction: Vec3, plane_y: f32) -> Option<f32> {
    if ray_direction.y.abs() < PARALLEL_EPSILON {
        return None;
    }

    let t = (plane_y - ray_origin.y) / ray_direction.y;
    if t > 0.0 { Some(t) } else { None }
}

/// Nearest hit of a ray against a horizontal plane, as a surface pose with
/// +Y along the plane normal.
pub fn ray_ground_hit(ray_origin: Vec3, ray_direction: Vec3, plane_y: f32) -> Option<Vec3> {
    let t = ray_horizontal_plane_t(ray_origin, ray_direction, plane_y)?;
    Some(ray_origin + ray_direction * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downward_ray_hits_floor() {
        let hit = ray_ground_hit(Vec3::new(0.1, 1.0, -0.5), Vec3::NEG_Y, 0.0).unwrap();
        assert!(hit.abs_diff_eq(Vec3::new(0.1, 0.0, -0.5), 1e-6));
    }

    #[test]
    fn upward_and_parallel_rays_miss() {
        assert!(ray_ground_hit(Vec3::Y, Vec3::Y, 0.0).is_none());
        assert!(ray_ground_hit(Vec3::Y, Vec3::X, 0.0).is_none());
    }

    #[test]
    fn slanted_ray_distance() {
        let dir = Vec3::new(0.0, -1.0, -1.0).normalize();
        let t = ray_horizontal_plane_t(Vec3::new(0.0, 2.0, 0.0), dir, 0.0).unwrap();
        assert!((t - 2.0 * std::f32::consts::SQRT_2).abs() < 1e-5);
    }
}
