//! Startup cleanup of a leftover reasoning-engine process.
//!
//! A previous run may have left the engine alive. Before the harness starts,
//! every process whose name matches is sent `SIGTERM`, given a grace period,
//! then `SIGKILL`ed. The caller gets an explicit outcome instead of a
//! fire-and-forget kill.
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Kernel limit on the stored process name (`TASK_COMM_LEN - 1`).
const COMM_MAX_LEN: usize = 15;
const POLL_INTERVAL: Duration = Duration::from_millis(25);
const KILL_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupOutcome {
    /// Processes that matched the name when cleanup started.
    pub matched: Vec<i32>,
    /// Matched processes that only exited after `SIGKILL`.
    pub killed: Vec<i32>,
    /// Matched processes still alive when cleanup gave up.
    pub survivors: Vec<i32>,
}

impl CleanupOutcome {
    pub fn is_clean(&self) -> bool {
        self.survivors.is_empty()
    }
}

/// Terminate every process named `name`, waiting up to `timeout` for a
/// graceful exit. Finding no such process is a success.
pub fn terminate_named(name: &str, timeout: Duration) -> Result<CleanupOutcome> {
    let proc_root = Path::new("/proc");
    if !proc_root.is_dir() {
        tracing::debug!(name, "no /proc; skipping process cleanup");
        return Ok(CleanupOutcome::default());
    }
    let matched = find_processes(proc_root, name)?;
    if matched.is_empty() {
        tracing::debug!(name, "no leftover process");
        return Ok(CleanupOutcome::default());
    }
    tracing::info!(name, pids = ?matched, "terminating leftover process");

    for &pid in &matched {
        send_signal(pid, Signal::SIGTERM)?;
    }
    let remaining = wait_for_exit(proc_root, &matched, timeout);
    if remaining.is_empty() {
        return Ok(CleanupOutcome {
            matched,
            ..CleanupOutcome::default()
        });
    }

    tracing::warn!(name, pids = ?remaining, "process ignored SIGTERM, sending SIGKILL");
    for &pid in &remaining {
        send_signal(pid, Signal::SIGKILL)?;
    }
    let survivors = wait_for_exit(proc_root, &remaining, KILL_GRACE);
    let killed = remaining
        .iter()
        .copied()
        .filter(|pid| !survivors.contains(pid))
        .collect();
    Ok(CleanupOutcome {
        matched,
        killed,
        survivors,
    })
}

/// PIDs under `proc_root` whose name matches `name`, excluding ourselves.
fn find_processes(proc_root: &Path, name: &str) -> Result<Vec<i32>> {
    let own_pid = std::process::id() as i32;
    let entries =
        fs::read_dir(proc_root).with_context(|| format!("list {}", proc_root.display()))?;
    let mut pids = Vec::new();
    for entry in entries.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<i32>().ok()) else {
            continue;
        };
        if pid == own_pid {
            continue;
        }
        // processes can exit between listing and reading
        let Ok(comm) = fs::read_to_string(entry.path().join("comm")) else {
            continue;
        };
        if comm_matches(comm.trim_end_matches('\n'), name) && is_alive(proc_root, pid) {
            pids.push(pid);
        }
    }
    pids.sort_unstable();
    Ok(pids)
}

/// Compare a `/proc/<pid>/comm` value against `name`, which the kernel
/// truncates to [`COMM_MAX_LEN`] bytes.
fn comm_matches(comm: &str, name: &str) -> bool {
    let name = name.as_bytes();
    comm.as_bytes() == &name[..name.len().min(COMM_MAX_LEN)]
}

/// A process counts as gone once its `/proc` entry disappears or it is a
/// zombie waiting to be reaped by its parent.
fn is_alive(proc_root: &Path, pid: i32) -> bool {
    let Ok(stat) = fs::read_to_string(proc_root.join(pid.to_string()).join("stat")) else {
        return false;
    };
    // the state letter follows the parenthesised command name
    let state = stat
        .rfind(')')
        .and_then(|idx| stat[idx + 1..].split_whitespace().next());
    !matches!(state, Some("Z") | Some("X") | None)
}

fn wait_for_exit(proc_root: &Path, pids: &[i32], timeout: Duration) -> Vec<i32> {
    let start = Instant::now();
    loop {
        let remaining: Vec<i32> = pids
            .iter()
            .copied()
            .filter(|&pid| is_alive(proc_root, pid))
            .collect();
        if remaining.is_empty() || start.elapsed() > timeout {
            return remaining;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn send_signal(pid: i32, signal: Signal) -> Result<()> {
    match kill(Pid::from_raw(pid), signal) {
        // already gone
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(err) => Err(err).with_context(|| format!("send {signal} to pid {pid}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comm_comparison_truncates_long_names() {
        assert!(comm_matches("NAR", "NAR"));
        assert!(!comm_matches("NARS", "NAR"));
        assert!(comm_matches("reasoning-engin", "reasoning-engine-daemon"));
        assert!(!comm_matches("reasoning-engine", "reasoning-engine"));
    }

    #[test]
    fn own_process_is_never_a_candidate() {
        let own_comm = fs::read_to_string("/proc/self/comm");
        let Ok(own_comm) = own_comm else {
            return;
        };
        let pids = find_processes(Path::new("/proc"), own_comm.trim_end()).expect("scan /proc");
        assert!(!pids.contains(&(std::process::id() as i32)));
    }

    #[test]
    fn missing_process_is_a_clean_outcome() {
        let outcome = terminate_named("mockbot-none-", Duration::from_millis(50))
            .expect("cleanup without matches");
        assert!(outcome.is_clean());
        assert!(outcome.matched.is_empty());
    }

    #[test]
    fn fake_proc_tree_is_scanned_by_name_and_state() {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path();
        let write_proc = |pid: i32, comm: &str, state: &str| {
            let pid_dir = root.join(pid.to_string());
            fs::create_dir_all(&pid_dir).expect("pid dir");
            fs::write(pid_dir.join("comm"), format!("{comm}\n")).expect("comm");
            fs::write(
                pid_dir.join("stat"),
                format!("{pid} ({comm}) {state} 1 1 1 0 -1"),
            )
            .expect("stat");
        };
        write_proc(900_001, "NAR", "S");
        write_proc(900_002, "NAR", "Z");
        write_proc(900_003, "python3", "R");
        fs::create_dir_all(root.join("self")).expect("self dir");

        let pids = find_processes(root, "NAR").expect("scan fake proc");
        assert_eq!(pids, vec![900_001]);
        assert!(is_alive(root, 900_001));
        assert!(!is_alive(root, 900_002));
        assert!(!is_alive(root, 900_004));
    }

    /// Start a shell script named `name` that runs `body` forever. Returns
    /// `None` when the platform cannot run it.
    #[cfg(target_os = "linux")]
    fn spawn_named_script(
        dir: &Path,
        name: &str,
        body: &str,
    ) -> Option<std::process::Child> {
        use std::os::unix::fs::PermissionsExt;

        let sh = which::which("sh").ok()?;
        let script = dir.join(name);
        fs::write(&script, format!("#!{}\n{body}\n", sh.display())).ok()?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).ok()?;
        let mut child = std::process::Command::new(&script).spawn().ok()?;
        // let the shell install its traps
        std::thread::sleep(Duration::from_millis(300));
        if child.try_wait().ok().flatten().is_some() {
            return None;
        }
        Some(child)
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn process_ignoring_sigterm_is_killed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let name = format!("mbtrap{}", std::process::id() % 100_000);
        let Some(mut child) = spawn_named_script(
            dir.path(),
            &name,
            "trap '' TERM\nwhile :; do sleep 1; done",
        ) else {
            return;
        };
        let pid = child.id() as i32;

        let outcome = terminate_named(&name, Duration::from_millis(150));
        let _ = child.kill();
        let _ = child.wait();

        let outcome = outcome.expect("cleanup");
        assert_eq!(outcome.matched, vec![pid]);
        assert_eq!(outcome.killed, vec![pid]);
        assert!(outcome.survivors.is_empty());
        assert!(outcome.is_clean());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn process_honouring_sigterm_is_not_escalated() {
        let dir = tempfile::tempdir().expect("temp dir");
        let name = format!("mbterm{}", std::process::id() % 100_000);
        let Some(mut child) = spawn_named_script(dir.path(), &name, "while :; do sleep 1; done")
        else {
            return;
        };
        let pid = child.id() as i32;

        let outcome = terminate_named(&name, Duration::from_millis(2000));
        let _ = child.kill();
        let _ = child.wait();

        let outcome = outcome.expect("cleanup");
        assert_eq!(outcome.matched, vec![pid]);
        assert!(outcome.killed.is_empty());
        assert!(outcome.is_clean());
    }
}
