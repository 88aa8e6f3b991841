use serde::Serialize;

/// Mutable physical state of the simulated robot.
///
/// Owned by [`super::MockEnvironment`]; lives for one run only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulationState {
    /// The gripper currently holds an object.
    pub grasped: bool,
    /// A `go_to` in the map frame is waiting to be reported as arrived.
    pub pending_arrival: bool,
}

impl SimulationState {
    /// Read and clear the arrival flag. Edge-triggered: a single `go_to`
    /// yields at most one `true`.
    pub fn take_pending_arrival(&mut self) -> bool {
        std::mem::take(&mut self.pending_arrival)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_arrival_is_consumed_once() {
        let mut state = SimulationState {
            pending_arrival: true,
            ..SimulationState::default()
        };
        assert!(state.take_pending_arrival());
        assert!(!state.take_pending_arrival());
        assert!(!state.pending_arrival);
    }
}
