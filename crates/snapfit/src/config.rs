//! Authored per-piece settings.

use serde::{Deserialize, Serialize};
use snapfit_math::{quat_from_euler_yxz_degrees, Point3, Pose, SnapTolerance};

use crate::error::{Result, SnapError};
use crate::registry::PieceSpec;
use crate::scene::ObjectId;

/// Snap settings of one piece as written in a scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PieceConfig {
    /// Goal positions in the piece's parent space, primary slot first.
    pub goal_positions: Vec<[f64; 3]>,
    /// Goal rotations as Euler angles in degrees (applied Y, X, Z), paired
    /// with `goal_positions` by index. Missing entries mean no rotation.
    pub goal_rotations: Vec<[f64; 3]>,
    /// Linear snap tolerance (scene units).
    pub position_tolerance: f64,
    /// Angular snap tolerance (degrees).
    pub angle_tolerance: f64,
    /// Names of interchangeable pieces whose primary slots this piece may take.
    pub alternatives: Vec<String>,
    /// Spawn a ghost visual at the primary goal.
    pub ghost: bool,
    /// Goal to snap onto when the piece is registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_index: Option<usize>,
}

impl Default for PieceConfig {
    fn default() -> Self {
        Self {
            goal_positions: vec![[0.0; 3]],
            goal_rotations: Vec::new(),
            position_tolerance: SnapTolerance::DEFAULT.position,
            angle_tolerance: SnapTolerance::DEFAULT.angle_degrees,
            alternatives: Vec::new(),
            ghost: false,
            snap_index: None,
        }
    }
}

impl PieceConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.goal_positions.is_empty() {
            return Err(SnapError::InvalidConfig(
                "goal_positions needs at least one entry".into(),
            ));
        }
        if self.goal_rotations.len() > self.goal_positions.len() {
            return Err(SnapError::InvalidConfig(format!(
                "{} goal_rotations for {} goal_positions",
                self.goal_rotations.len(),
                self.goal_positions.len()
            )));
        }
        if self
            .goal_positions
            .iter()
            .chain(&self.goal_rotations)
            .flatten()
            .any(|v| !v.is_finite())
        {
            return Err(SnapError::InvalidConfig(
                "goal_positions and goal_rotations must be finite".into(),
            ));
        }
        if !self.position_tolerance.is_finite() || self.position_tolerance < 0.0 {
            return Err(SnapError::InvalidConfig(
                "position_tolerance must be finite and non-negative".into(),
            ));
        }
        if !self.angle_tolerance.is_finite() || !(0.0..=180.0).contains(&self.angle_tolerance) {
            return Err(SnapError::InvalidConfig(
                "angle_tolerance must be between 0 and 180 degrees".into(),
            ));
        }
        if let Some(index) = self.snap_index {
            if index >= self.goal_positions.len() {
                return Err(SnapError::InvalidConfig(format!(
                    "snap_index {} out of range for {} goals",
                    index,
                    self.goal_positions.len()
                )));
            }
        }
        Ok(())
    }

    /// Goal poses with unit scale, primary first.
    pub fn goal_poses(&self) -> Vec<Pose> {
        self.goal_positions
            .iter()
            .enumerate()
            .map(|(i, &[x, y, z])| {
                let [rx, ry, rz] = self.goal_rotations.get(i).copied().unwrap_or_default();
                Pose::new(Point3::new(x, y, z), quat_from_euler_yxz_degrees(rx, ry, rz))
            })
            .collect()
    }

    /// The primary goal, where the ghost goes.
    pub fn primary_goal(&self) -> Option<Pose> {
        self.goal_poses().into_iter().next()
    }

    /// Tolerance pair.
    pub fn tolerance(&self) -> SnapTolerance {
        SnapTolerance::new(self.position_tolerance, self.angle_tolerance)
    }

    /// Validate and convert into registry input.
    pub fn to_spec(&self, ghost: Option<ObjectId>) -> Result<PieceSpec> {
        self.validate()?;
        Ok(PieceSpec {
            goals: self.goal_poses(),
            tolerance: self.tolerance(),
            ghost,
            snap_index: self.snap_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use snapfit_math::Vec3;

    #[test]
    fn test_defaults() {
        let config = PieceConfig::default();
        assert_eq!(config.position_tolerance, 0.05);
        assert_eq!(config.angle_tolerance, 20.0);
        assert!(config.alternatives.is_empty());
        assert!(!config.ghost);
        assert_eq!(config.snap_index, None);
        assert!(config.validate().is_ok());
        assert_eq!(config.goal_poses(), vec![Pose::identity()]);
        assert_eq!(config.primary_goal(), Some(Pose::identity()));
    }

    #[test]
    fn test_toml_fills_missing_fields() {
        let config: PieceConfig = toml::from_str(
            r#"
            goal_positions = [[0.0, 1.0, 0.0]]
            goal_rotations = [[0.0, 90.0, 0.0]]
            alternatives = ["peg-b", "peg-c"]
            "#,
        )
        .unwrap();
        assert_eq!(config.position_tolerance, 0.05);
        assert_eq!(config.alternatives, vec!["peg-b", "peg-c"]);

        let goal = config.primary_goal().unwrap();
        assert_relative_eq!(goal.position, Point3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(
            goal.orientation * Vec3::x(),
            Vec3::new(0.0, 0.0, -1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_goal_lists_pair_by_index() {
        let config: PieceConfig = toml::from_str(
            r#"
            goal_positions = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]
            goal_rotations = [[0.0, 0.0, 0.0], [0.0, 90.0, 0.0]]
            snap_index = 2
            "#,
        )
        .unwrap();
        let goals = config.goal_poses();
        assert_eq!(goals.len(), 3);
        assert_relative_eq!(
            goals[1].orientation * Vec3::x(),
            Vec3::new(0.0, 0.0, -1.0),
            epsilon = 1e-12
        );
        // no rotation authored for the third goal
        assert_eq!(goals[2], Pose::from_translation(2.0, 0.0, 0.0));

        let spec = config.to_spec(None).unwrap();
        assert_eq!(spec.goals, goals);
        assert_eq!(spec.snap_index, Some(2));
    }

    #[test]
    fn test_json_round_trip() {
        let config = PieceConfig {
            position_tolerance: 0.1,
            ghost: true,
            snap_index: Some(0),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PieceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let negative = PieceConfig {
            position_tolerance: -0.1,
            ..Default::default()
        };
        assert!(matches!(negative.validate(), Err(SnapError::InvalidConfig(_))));

        let wide = PieceConfig {
            angle_tolerance: 190.0,
            ..Default::default()
        };
        assert!(wide.to_spec(None).is_err());

        let nan = PieceConfig {
            goal_positions: vec![[0.0, f64::NAN, 0.0]],
            ..Default::default()
        };
        assert!(nan.validate().is_err());

        let no_goals = PieceConfig {
            goal_positions: Vec::new(),
            ..Default::default()
        };
        assert!(no_goals.validate().is_err());

        let extra_rotations = PieceConfig {
            goal_rotations: vec![[0.0; 3], [0.0; 3]],
            ..Default::default()
        };
        assert!(extra_rotations.validate().is_err());

        let past_end = PieceConfig {
            snap_index: Some(1),
            ..Default::default()
        };
        assert!(past_end.validate().is_err());
    }

    #[test]
    fn test_to_spec() {
        let config = PieceConfig {
            goal_positions: vec![[1.0, 2.0, 3.0]],
            angle_tolerance: 5.0,
            ..Default::default()
        };
        let spec = config.to_spec(None).unwrap();
        assert_eq!(spec.goals[0].position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(spec.tolerance, SnapTolerance::new(0.05, 5.0));
        assert!(spec.ghost.is_none());
        assert_eq!(spec.snap_index, None);
    }
}
