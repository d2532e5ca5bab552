// Message types published by the runtime

use serde::{Deserialize, Serialize};

use crate::explore::{ExplorationController, GridPosition, MazeMap, Orientation, Phase};

// Controller progress, runtime -> observers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplorationStatus {
    pub phase: Phase,
    pub cycle: u64,
    pub position: GridPosition,
    pub orientation: Orientation,
    pub visited: u8,
    pub nest: Option<GridPosition>,
    pub on_line: bool,
}

// Snapshot of everything the controller knows, taken on its own thread
impl From<&ExplorationController> for ExplorationStatus {
    fn from(controller: &ExplorationController) -> Self {
        let context = controller.context();
        Self {
            phase: controller.phase(),
            cycle: controller.cycle(),
            position: context.pose.position(),
            orientation: context.pose.orientation(),
            visited: context.map.visited_count(),
            nest: context.nest,
            on_line: context.line.is_on_line(),
        }
    }
}

/// Latest status and map, handed from the control thread to the publisher
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub status: ExplorationStatus,
    pub map: MazeMap,
}

impl From<&ExplorationController> for Telemetry {
    fn from(controller: &ExplorationController) -> Self {
        Self {
            status: ExplorationStatus::from(controller),
            map: controller.context().map,
        }
    }
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    /// No fresh status from the control thread
    Stalled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;

    #[test]
    fn test_status_from_fresh_controller() {
        let controller = ExplorationController::new(ControllerConfig::default());
        let status = ExplorationStatus::from(&controller);
        assert_eq!(status.phase, Phase::Exploring);
        assert_eq!(status.position, GridPosition::new(1, 0));
        assert_eq!(status.orientation, Orientation::North);
        assert_eq!(status.visited, 0);
        assert_eq!(status.nest, None);
        assert!(!status.on_line);
    }

    #[test]
    fn test_status_json_shape() {
        let controller = ExplorationController::new(ControllerConfig::default());
        let json = serde_json::to_value(ExplorationStatus::from(&controller)).unwrap();
        assert_eq!(json["phase"], "exploring");
        assert_eq!(json["orientation"], "north");
        assert_eq!(json["position"]["x"], 1);
        assert_eq!(json["position"]["y"], 0);
        assert!(json["nest"].is_null());
    }

    #[test]
    fn test_health_serialization() {
        assert_eq!(serde_json::to_string(&RuntimeHealth::Ok).unwrap(), "\"ok\"");
        assert_eq!(
            serde_json::to_string(&RuntimeHealth::Stalled).unwrap(),
            "\"stalled\""
        );
    }

    #[test]
    fn test_map_serializes_cells() {
        let json = serde_json::to_value(MazeMap::new()).unwrap();
        assert_eq!(json["visited"], 0);
        assert_eq!(json["cells"][0][0]["sides"][0], "unknown");
    }
}
