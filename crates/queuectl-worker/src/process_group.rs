//! OS-specific process-group helpers used to terminate a timed-out
//! subprocess together with everything it spawned: both it and its
//! process group must be terminated on timeout.
//!
//! On non-Unix platforms these are no-ops: a timed-out child is killed
//! directly instead, which covers the single-process case.

use std::io;

#[cfg(unix)]
/// Put the calling process into its own process group. Intended for use
/// in `pre_exec` so the spawned shell becomes the group leader.
pub fn set_process_group() -> io::Result<()> {
    let result = unsafe { libc::setpgid(0, 0) };
    if result == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(not(unix))]
pub fn set_process_group() -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
/// Send `SIGKILL` to the whole process group rooted at `pid` (best
/// effort: a group that already exited is not an error).
pub fn kill_process_group_by_pid(pid: u32) -> io::Result<()> {
    use std::io::ErrorKind;

    let pid = pid as libc::pid_t;
    let pgid = unsafe { libc::getpgid(pid) };
    if pgid == -1 {
        let err = io::Error::last_os_error();
        return if err.kind() == ErrorKind::NotFound {
            Ok(())
        } else {
            Err(err)
        };
    }

    let result = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if result == -1 {
        let err = io::Error::last_os_error();
        if err.kind() != ErrorKind::NotFound {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn kill_process_group_by_pid(_pid: u32) -> io::Result<()> {
    Ok(())
}
