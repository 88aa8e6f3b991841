//! Script-level names of the mock robot operations.
//!
//! The table below is the whole capability set a payload sees. Lookups go
//! through [`RobotApi`] only, so any implementation can be spliced in.
use super::args::CallArgs;
use super::value::Value;
use crate::sim::{RobotApi, MAP_FRAME};
use anyhow::{anyhow, Result};

/// Every operation name bound into a fresh namespace.
pub const MOCK_OPERATIONS: &[&str] = &[
    "detect_objects",
    "get_pose",
    "get_collision_status",
    "stop",
    "move_forward",
    "move_left",
    "move_right",
    "move_backward",
    "pick",
    "arm_down",
    "arm_up",
    "open_gripper",
    "close_gripper",
    "drop",
    "go_to",
    "show_frame",
    "wait_key",
];

pub fn is_mock_operation(name: &str) -> bool {
    MOCK_OPERATIONS.contains(&name)
}

/// Invoke the mock operation `name`. Returns `None` when no such
/// operation exists.
pub fn invoke(robot: &mut dyn RobotApi, name: &str, args: &CallArgs) -> Option<Result<Value>> {
    let result = match name {
        "detect_objects" => args
            .expect_none(name)
            .map(|()| Value::Observation(robot.detect_objects())),
        "get_pose" => args.expect_none(name).map(|()| Value::Pose(robot.get_pose())),
        "get_collision_status" => args
            .expect_none(name)
            .map(|()| Value::Collision(robot.get_collision_status())),
        "stop" => no_op(name, args, |r| r.stop(), robot),
        "move_forward" => no_op(name, args, |r| r.move_forward(), robot),
        "move_left" => no_op(name, args, |r| r.move_left(), robot),
        "move_right" => no_op(name, args, |r| r.move_right(), robot),
        "move_backward" => no_op(name, args, |r| r.move_backward(), robot),
        "pick" => no_op(name, args, |r| r.pick(), robot),
        "arm_down" => no_op(name, args, |r| r.arm_down(), robot),
        "arm_up" => no_op(name, args, |r| r.arm_up(), robot),
        "open_gripper" => no_op(name, args, |r| r.open_gripper(), robot),
        "close_gripper" => args
            .expect_none(name)
            .map(|()| Value::Bool(robot.close_gripper())),
        "drop" => no_op(name, args, |r| r.drop_object(), robot),
        "go_to" => go_to(robot, args),
        "show_frame" => show_frame(robot, args),
        "wait_key" => wait_key(robot, args),
        _ => return None,
    };
    Some(result)
}

fn no_op(
    name: &str,
    args: &CallArgs,
    op: impl FnOnce(&mut dyn RobotApi),
    robot: &mut dyn RobotApi,
) -> Result<Value> {
    args.expect_none(name)?;
    op(robot);
    Ok(Value::Nil)
}

/// `go_to x y [z] [w] [frame]`; `frame_id` is accepted as an alias.
fn go_to(robot: &mut dyn RobotApi, args: &CallArgs) -> Result<Value> {
    const OP: &str = "go_to";
    args.expect_at_most(OP, 5, &["x", "y", "z", "w", "frame", "frame_id"])?;
    let x = args.required_number(OP, 0, &["x"])?;
    let y = args.required_number(OP, 1, &["y"])?;
    let z = args.number(OP, 2, &["z"])?.unwrap_or(0.0);
    let w = args.number(OP, 3, &["w"])?.unwrap_or(1.0);
    let frame = args
        .get(4, &["frame", "frame_id"])
        .map(Value::to_string)
        .unwrap_or_else(|| MAP_FRAME.to_string());
    robot.go_to(x, y, z, w, &frame);
    Ok(Value::Nil)
}

/// `show_frame [window] [frame]`; the frame itself is ignored.
fn show_frame(robot: &mut dyn RobotApi, args: &CallArgs) -> Result<Value> {
    args.expect_at_most("show_frame", 2, &["window", "frame"])?;
    let window = args
        .get(0, &["window"])
        .map(Value::to_string)
        .unwrap_or_default();
    robot.show_frame(&window);
    Ok(Value::Nil)
}

/// `wait_key [delay]`
fn wait_key(robot: &mut dyn RobotApi, args: &CallArgs) -> Result<Value> {
    const OP: &str = "wait_key";
    args.expect_at_most(OP, 1, &["delay"])?;
    let delay = args.number(OP, 0, &["delay"])?.unwrap_or(0.0);
    if !delay.is_finite() {
        return Err(anyhow!("`{OP}` delay must be finite"));
    }
    let key = robot.wait_key(delay as i64);
    Ok(Value::Number(key as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::MockEnvironment;

    fn positional(values: Vec<Value>) -> CallArgs {
        CallArgs {
            positional: values,
            ..CallArgs::default()
        }
    }

    #[test]
    fn every_listed_operation_resolves() {
        let mut env = MockEnvironment::with_seed(1);
        for name in MOCK_OPERATIONS {
            let args = if *name == "go_to" {
                positional(vec![Value::Number(1.0), Value::Number(2.0)])
            } else {
                CallArgs::default()
            };
            let result = invoke(&mut env, name, &args).expect("operation is bound");
            assert!(result.is_ok(), "{name} failed: {result:?}");
        }
        assert!(invoke(&mut env, "fly", &CallArgs::default()).is_none());
    }

    #[test]
    fn go_to_defaults_to_the_map_frame() {
        let mut env = MockEnvironment::with_seed(1);
        invoke(
            &mut env,
            "go_to",
            &positional(vec![Value::Number(1.0), Value::Number(2.0)]),
        )
        .expect("bound")
        .expect("go_to");
        assert!(env.state().pending_arrival);
    }

    #[test]
    fn go_to_honours_keyword_frame() {
        let mut env = MockEnvironment::with_seed(1);
        let mut args = positional(vec![Value::Number(1.0), Value::Number(2.0)]);
        args.keyword.insert("frame".into(), Value::Text("odom".into()));
        invoke(&mut env, "go_to", &args).expect("bound").expect("go_to");
        assert!(!env.state().pending_arrival);

        let args = positional(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(0.0),
            Value::Number(1.0),
            Value::Text("odom".into()),
        ]);
        invoke(&mut env, "go_to", &args).expect("bound").expect("go_to");
        assert!(!env.state().pending_arrival);
    }

    #[test]
    fn go_to_without_coordinates_is_an_error() {
        let mut env = MockEnvironment::with_seed(1);
        let err = invoke(&mut env, "go_to", &positional(vec![Value::Number(1.0)]))
            .expect("bound")
            .expect_err("missing y");
        assert!(err.to_string().contains("missing argument `y`"));
    }

    #[test]
    fn close_gripper_reports_success() {
        let mut env = MockEnvironment::with_seed(1);
        let value = invoke(&mut env, "close_gripper", &CallArgs::default())
            .expect("bound")
            .expect("close");
        assert_eq!(value, Value::Bool(true));
        assert!(env.state().grasped);
        invoke(&mut env, "drop", &CallArgs::default())
            .expect("bound")
            .expect("drop");
        assert!(!env.state().grasped);
    }

    #[test]
    fn display_operations_never_block() {
        let mut env = MockEnvironment::with_seed(1);
        invoke(
            &mut env,
            "show_frame",
            &positional(vec![Value::Text("camera".into())]),
        )
        .expect("bound")
        .expect("show_frame");
        let key = invoke(&mut env, "wait_key", &positional(vec![Value::Number(30.0)]))
            .expect("bound")
            .expect("wait_key");
        assert_eq!(key, Value::Number(0.0));
        assert_eq!(env.call_counts().get("wait_key"), Some(&1));

        let too_many = positional(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert!(invoke(&mut env, "wait_key", &too_many)
            .expect("bound")
            .is_err());
    }
}
