// Client process liveness, used to tell listeners the game client has exited

use sysinfo::{Pid, ProcessRefreshKind, System};

pub fn is_process_alive(pid: u32) -> bool {
  let mut sys = System::new();
  let sys_pid = Pid::from(pid as usize);
  sys.refresh_process_specifics(sys_pid, ProcessRefreshKind::new())
}

/// Tracks one client pid and reports its exit exactly once.
#[derive(Debug, Default)]
pub struct LivenessTracker {
  pid: Option<u32>,
  reported: bool,
}

impl LivenessTracker {
  pub fn watch(&mut self, pid: Option<u32>) {
    if self.pid != pid {
      self.pid = pid;
      self.reported = false;
    }
  }

  pub fn clear(&mut self) {
    self.pid = None;
    self.reported = false;
  }

  pub fn pid(&self) -> Option<u32> {
    self.pid
  }

  /// Feed one probe result; true when this is the first observation of the exit.
  pub fn observe(&mut self, alive: bool) -> bool {
    if self.pid.is_none() || alive || self.reported {
      return false;
    }
    self.reported = true;
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn own_process_is_alive() {
    assert!(is_process_alive(std::process::id()));
  }

  #[test]
  fn exit_is_reported_once_per_pid() {
    let mut tracker = LivenessTracker::default();
    assert!(!tracker.observe(false));

    tracker.watch(Some(10));
    assert!(!tracker.observe(true));
    assert!(tracker.observe(false));
    assert!(!tracker.observe(false));

    tracker.watch(Some(10));
    assert!(!tracker.observe(false));

    tracker.watch(Some(11));
    assert!(tracker.observe(false));

    tracker.clear();
    assert!(!tracker.observe(false));
  }
}
