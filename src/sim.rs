//! Mock robot environment.
//!
//! Stands in for the robot's perception and actuation API with intentionally
//! simplistic behavior: enough to drive a control loop through a short
//! scripted scenario (find a bottle, grasp it, go to a person, drop it).
//!
//! Control scripts never see [`MockEnvironment`] directly. They reach it
//! through the [`RobotApi`] capability set, which keeps the interpreter
//! testable against any other implementation.
mod display;
mod environment;
mod state;
mod types;

pub use environment::MockEnvironment;
pub use state::SimulationState;
pub use types::{CollisionStatus, Detection, Observation, Pose};

/// Frame id that makes `go_to` schedule an arrival report.
pub const MAP_FRAME: &str = "map";

/// Capability set a control script may call.
///
/// Method order and argument order mirror the script-level names so the
/// bindings in `script::bindings` stay a flat table.
pub trait RobotApi {
    fn detect_objects(&mut self) -> Observation;
    fn get_pose(&mut self) -> Pose;
    fn get_collision_status(&mut self) -> CollisionStatus;

    fn stop(&mut self);
    fn move_forward(&mut self);
    fn move_left(&mut self);
    fn move_right(&mut self);
    fn move_backward(&mut self);
    fn pick(&mut self);
    fn arm_down(&mut self);
    fn arm_up(&mut self);
    fn open_gripper(&mut self);

    /// Grasp whatever is in front of the gripper. Always succeeds.
    fn close_gripper(&mut self) -> bool;
    /// Release the grasped object.
    fn drop_object(&mut self);
    /// Command navigation to `(x, y, z)` with orientation `w` in `frame`.
    fn go_to(&mut self, x: f64, y: f64, z: f64, w: f64, frame: &str);

    fn show_frame(&mut self, window: &str);
    fn wait_key(&mut self, delay_ms: i64) -> i64;
}
