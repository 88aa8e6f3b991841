use super::display::HeadlessDisplay;
use super::state::SimulationState;
use super::types::{CollisionStatus, Detection, Observation, Pose};
use super::{RobotApi, MAP_FRAME};
use std::collections::BTreeMap;

/// Horizontal pixel position of the frame center.
pub const FRAME_CENTER_X: f64 = 375.0;
/// Horizontal pixel position of the left frame edge.
pub const FRAME_LEFT_X: f64 = 0.0;
const DETECTION_Y: f64 = 480.0;
const DETECTION_SIZE: f64 = 10.0;
const DETECTION_CONFIDENCE: f64 = 0.9;
/// Candidate x positions for a default detection; center is weighted 2:1.
const CANDIDATE_X: [f64; 3] = [FRAME_LEFT_X, FRAME_CENTER_X, FRAME_CENTER_X];
const COLLISION_FREE_PROBABILITY: f64 = 0.7;

pub const LABEL_BOTTLE: &str = "bottle";
pub const LABEL_PERSON: &str = "person";

/// In-process stand-in for the robot's sensors and actuators.
pub struct MockEnvironment {
    state: SimulationState,
    rng: fastrand::Rng,
    display: HeadlessDisplay,
    calls: BTreeMap<&'static str, u64>,
}

impl MockEnvironment {
    pub fn new(rng: fastrand::Rng) -> Self {
        Self {
            state: SimulationState::default(),
            rng,
            display: HeadlessDisplay::default(),
            calls: BTreeMap::new(),
        }
    }

    /// Build an environment whose random draws are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(fastrand::Rng::with_seed(seed))
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Number of calls per operation name since construction.
    pub fn call_counts(&self) -> &BTreeMap<&'static str, u64> {
        &self.calls
    }

    fn record(&mut self, op: &'static str) {
        *self.calls.entry(op).or_default() += 1;
    }

    fn arrival_detection() -> Detection {
        Detection::new(
            LABEL_PERSON,
            FRAME_CENTER_X,
            DETECTION_Y,
            DETECTION_SIZE,
            DETECTION_SIZE,
            DETECTION_CONFIDENCE,
        )
    }
}

impl RobotApi for MockEnvironment {
    fn detect_objects(&mut self) -> Observation {
        self.record("detect_objects");
        if self.state.take_pending_arrival() {
            tracing::debug!("arrival reported");
            return Observation::single(Self::arrival_detection());
        }
        let label = if self.state.grasped {
            LABEL_PERSON
        } else {
            LABEL_BOTTLE
        };
        let x = CANDIDATE_X[self.rng.usize(..CANDIDATE_X.len())];
        Observation::single(Detection::new(
            label,
            x,
            DETECTION_Y,
            DETECTION_SIZE,
            DETECTION_SIZE,
            DETECTION_CONFIDENCE,
        ))
    }

    fn get_pose(&mut self) -> Pose {
        self.record("get_pose");
        Pose::default()
    }

    fn get_collision_status(&mut self) -> CollisionStatus {
        self.record("get_collision_status");
        if self.rng.f64() < COLLISION_FREE_PROBABILITY {
            return CollisionStatus::Free;
        }
        CollisionStatus::BLOCKED[self.rng.usize(..CollisionStatus::BLOCKED.len())]
    }

    fn stop(&mut self) {
        self.record("stop");
    }

    fn move_forward(&mut self) {
        self.record("move_forward");
    }

    fn move_left(&mut self) {
        self.record("move_left");
    }

    fn move_right(&mut self) {
        self.record("move_right");
    }

    fn move_backward(&mut self) {
        self.record("move_backward");
    }

    fn pick(&mut self) {
        self.record("pick");
    }

    fn arm_down(&mut self) {
        self.record("arm_down");
    }

    fn arm_up(&mut self) {
        self.record("arm_up");
    }

    fn open_gripper(&mut self) {
        self.record("open_gripper");
    }

    fn close_gripper(&mut self) -> bool {
        self.record("close_gripper");
        self.state.grasped = true;
        tracing::debug!(grasped = true, "gripper closed");
        true
    }

    fn drop_object(&mut self) {
        self.record("drop");
        self.state.grasped = false;
        tracing::debug!(grasped = false, "object dropped");
    }

    fn go_to(&mut self, x: f64, y: f64, z: f64, w: f64, frame: &str) {
        self.record("go_to");
        if frame == MAP_FRAME {
            self.state.pending_arrival = true;
            tracing::debug!(x, y, z, w, frame, "goal accepted");
        } else {
            tracing::debug!(x, y, z, w, frame, "goal ignored for non-map frame");
        }
    }

    fn show_frame(&mut self, window: &str) {
        self.record("show_frame");
        self.display.show_frame(window);
    }

    fn wait_key(&mut self, delay_ms: i64) -> i64 {
        self.record("wait_key");
        self.display.wait_key(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_arrival(obs: &Observation) -> bool {
        obs.detections.len() == 1 && obs.detections[0] == MockEnvironment::arrival_detection()
    }

    #[test]
    fn detections_before_grasp_are_bottles_at_candidate_positions() {
        let mut env = MockEnvironment::with_seed(7);
        for _ in 0..200 {
            let obs = env.detect_objects();
            assert_eq!(obs.detections.len(), 1);
            assert!(obs.metadata.is_empty());
            let d = &obs.detections[0];
            assert_eq!(d.label, LABEL_BOTTLE);
            assert!(CANDIDATE_X.contains(&d.x), "unexpected x {}", d.x);
            assert_eq!(d.y, DETECTION_Y);
            assert_eq!((d.width, d.height), (DETECTION_SIZE, DETECTION_SIZE));
            assert_eq!(d.confidence, DETECTION_CONFIDENCE);
        }
    }

    #[test]
    fn center_position_is_weighted_two_to_one() {
        let mut env = MockEnvironment::with_seed(11);
        let draws = 6000;
        let center = (0..draws)
            .filter(|_| env.detect_objects().detections[0].x == FRAME_CENTER_X)
            .count();
        let fraction = center as f64 / draws as f64;
        assert!((fraction - 2.0 / 3.0).abs() < 0.05, "center fraction {fraction}");
    }

    #[test]
    fn grasp_and_drop_switch_the_reported_label() {
        let mut env = MockEnvironment::with_seed(3);
        assert!(env.close_gripper());
        assert!(env.state().grasped);
        for _ in 0..100 {
            assert!(env.detect_objects().labels().all(|l| l != LABEL_BOTTLE));
        }

        env.drop_object();
        assert!(!env.state().grasped);
        assert!(env.detect_objects().labels().all(|l| l == LABEL_BOTTLE));
    }

    #[test]
    fn arrival_is_reported_on_the_first_query_only() {
        let mut env = MockEnvironment::with_seed(5);
        env.go_to(1.0, 2.0, 0.0, 1.0, MAP_FRAME);
        assert!(env.state().pending_arrival);

        let first = env.detect_objects();
        assert!(is_arrival(&first));
        assert!(!env.state().pending_arrival);

        let second = env.detect_objects();
        assert_eq!(second.detections[0].label, LABEL_BOTTLE);
    }

    #[test]
    fn arrival_takes_precedence_over_grasped_label() {
        let mut env = MockEnvironment::with_seed(5);
        env.close_gripper();
        env.go_to(0.0, 0.0, 0.0, 1.0, MAP_FRAME);
        assert!(is_arrival(&env.detect_objects()));
        assert_eq!(env.detect_objects().detections[0].label, LABEL_PERSON);
    }

    #[test]
    fn goals_outside_the_map_frame_are_ignored() {
        let mut env = MockEnvironment::with_seed(9);
        env.go_to(1.0, 2.0, 0.0, 1.0, "odom");
        assert!(!env.state().pending_arrival);
        for _ in 0..50 {
            let obs = env.detect_objects();
            assert_eq!(obs.detections[0].label, LABEL_BOTTLE);
        }
    }

    #[test]
    fn collision_status_is_mostly_free_and_evenly_blocked() {
        let mut env = MockEnvironment::with_seed(42);
        let draws = 20_000;
        let mut counts: BTreeMap<CollisionStatus, usize> = BTreeMap::new();
        for _ in 0..draws {
            *counts.entry(env.get_collision_status()).or_default() += 1;
        }
        let free = counts.get(&CollisionStatus::Free).copied().unwrap_or(0);
        let free_fraction = free as f64 / draws as f64;
        assert!((free_fraction - 0.7).abs() < 0.02, "free fraction {free_fraction}");

        let blocked = draws - free;
        for status in CollisionStatus::BLOCKED {
            let share = counts.get(&status).copied().unwrap_or(0) as f64 / blocked as f64;
            assert!((share - 1.0 / 3.0).abs() < 0.03, "{status} share {share}");
        }
    }

    #[test]
    fn no_op_actuators_leave_state_untouched() {
        let mut env = MockEnvironment::with_seed(1);
        env.stop();
        env.move_forward();
        env.move_left();
        env.move_right();
        env.move_backward();
        env.pick();
        env.arm_down();
        env.arm_up();
        env.open_gripper();
        env.show_frame("camera");
        assert_eq!(env.wait_key(1), 0);
        assert_eq!(env.state(), SimulationState::default());
        assert_eq!(env.get_pose(), Pose::default());
        assert_eq!(env.call_counts().get("stop"), Some(&1));
        assert_eq!(env.call_counts().get("wait_key"), Some(&1));
    }
}
