//! Tests against the real `/proc`, using only this process and children it
//! spawns.

#![cfg(target_os = "linux")]

use pshandle_core::PshandleError;
use pshandle_proc::{ProcessHandle, ProcessStatus, Procfs, ReportOptions};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn procfs() -> Arc<Procfs> {
    Arc::new(Procfs::new())
}

/// Wait until a freshly spawned child shows its arguments.
///
/// `spawn` can return before the kernel has mapped the new argument block,
/// and until then the command line reads as empty.
fn wait_for_cmdline(handle: &ProcessHandle) -> Vec<String> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let args = handle.cmdline().unwrap();
        if !args.is_empty() {
            return args;
        }
        assert!(Instant::now() < deadline, "child never showed its arguments");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn current_process_accessors() {
    let procfs = procfs();
    let me = ProcessHandle::current(&procfs).unwrap();

    assert_eq!(me.pid(), std::process::id());
    assert!(me.is_running());
    assert_eq!(me.ppid().unwrap(), std::os::unix::process::parent_id());
    assert_eq!(me.parent().unwrap().pid(), std::os::unix::process::parent_id());
    assert!(me.num_threads().unwrap() >= 1);
    assert!(me.memory_info().unwrap().rss > 0);
    assert!(me.cpu_times().unwrap().user >= 0.0);
    assert!(!me.cmdline().unwrap().is_empty());

    assert_eq!(me.cwd().unwrap(), std::env::current_dir().unwrap());
    assert_eq!(
        me.exe().unwrap().map(|p| pshandle_proc::strip_deleted_suffix(&p)),
        Some(std::env::current_exe().unwrap())
    );

    let uid = unsafe { libc::getuid() };
    let gid = unsafe { libc::getgid() };
    assert_eq!(me.uids().unwrap().real, uid);
    assert_eq!(me.gids().unwrap().real, gid);
    assert_eq!(
        me.username().unwrap(),
        pshandle_proc::lookup_username(uid).unwrap()
    );

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs_f64();
    assert!(me.create_time() <= now + 1.0);
    assert!(me.create_time() > now - 24.0 * 3600.0 * 365.0);
}

#[test]
fn reopened_handles_agree() {
    let procfs = procfs();
    let a = ProcessHandle::current(&procfs).unwrap();
    let b = ProcessHandle::open(&procfs, a.pid(), Some(a.create_time())).unwrap();
    assert_eq!(a, b);
    assert!(b.is_running());
}

#[test]
fn spawned_child_through_zombie_to_gone() {
    let procfs = procfs();
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    let handle = ProcessHandle::open(&procfs, child.id(), None).unwrap();

    assert!(handle.is_running());
    assert_eq!(wait_for_cmdline(&handle), vec!["sleep", "30"]);
    assert_eq!(handle.name().unwrap(), "sleep");
    assert_eq!(handle.ppid().unwrap(), std::process::id());

    child.kill().unwrap();

    // Killed but not reaped: the child becomes a zombie.
    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.status().unwrap() != ProcessStatus::Zombie {
        assert!(Instant::now() < deadline, "child never became a zombie");
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(handle.is_running());
    assert!(matches!(
        handle.memory_info(),
        Err(PshandleError::ZombieProcess { .. })
    ));
    assert!(matches!(
        handle.cmdline(),
        Err(PshandleError::ZombieProcess { .. })
    ));
    assert!(!handle.presumed_gone());

    child.wait().unwrap();

    assert!(!handle.is_running());
    assert!(handle.name().unwrap_err().is_gone());
    assert!(handle.presumed_gone());
    assert_eq!(handle.format().status, "terminated");
}

#[test]
fn report_of_child() {
    let procfs = procfs();
    let mut child = Command::new("sleep").arg("30").spawn().unwrap();
    let handle = ProcessHandle::open(&procfs, child.id(), None).unwrap();
    wait_for_cmdline(&handle);

    let report = handle
        .report(&ReportOptions {
            include_environ: true,
        })
        .unwrap();
    assert_eq!(report.pid, child.id());
    assert_eq!(report.name, "sleep");
    assert_eq!(report.ppid, std::process::id());
    assert!(report.environ.is_some());

    child.kill().unwrap();
    child.wait().unwrap();

    assert!(handle.report(&ReportOptions::default()).unwrap_err().is_gone());
}
