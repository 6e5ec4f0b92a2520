use bevy::prelude::*;

/// Rigid pose reported by the host: position plus orientation, no scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Decompose a column-major 4x4 rigid transform into position and
    /// orientation. Returns `None` for matrices with non-finite components.
    pub fn from_column_major(matrix: &[f32; 16]) -> Option<Self> {
        let mat = Mat4::from_cols_array(matrix);
        let (_scale, rotation, translation) = mat.to_scale_rotation_translation();

        if !translation.is_finite() || !rotation.is_finite() {
            return None;
        }

        Some(Self::new(translation, rotation.normalize()))
    }

    /// Same as `from_column_major`, for host APIs handing back a slice.
    pub fn from_matrix_slice(matrix: &[f32]) -> Option<Self> {
        let cols: &[f32; 16] = matrix.try_into().ok()?;
        Self::from_column_major(cols)
    }

    /// Surface normal for hit poses (host convention: local +Y).
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn to_transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: self.orientation,
            scale: Vec3::ONE,
        }
    }
}

impl From<Pose> for Transform {
    fn from(pose: Pose) -> Self {
        pose.to_transform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_translation_and_rotation() {
        let rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let translation = Vec3::new(0.1, 0.0, -0.5);
        let matrix = Mat4::from_rotation_translation(rotation, translation).to_cols_array();

        let pose = Pose::from_column_major(&matrix).unwrap();

        assert!(pose.position.abs_diff_eq(translation, 1e-6));
        assert!(pose.orientation.abs_diff_eq(rotation, 1e-6));
    }

    #[test]
    fn rejects_short_and_non_finite_matrices() {
        assert!(Pose::from_matrix_slice(&[0.0; 12]).is_none());

        let mut matrix = Mat4::IDENTITY.to_cols_array();
        matrix[12] = f32::NAN;
        assert!(Pose::from_column_major(&matrix).is_none());
    }

    #[test]
    fn identity_hit_pose_faces_up() {
        assert_eq!(Pose::IDENTITY.up(), Vec3::Y);
        assert_eq!(Transform::from(Pose::IDENTITY), Transform::IDENTITY);
    }
}
