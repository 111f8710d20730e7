use std::os::fd::RawFd;
use std::time::{Duration, Instant};

use crate::error::{NetError, Result, errno};

/// Readiness the caller is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interest {
    Read,
    Write,
}

/// Waits for the fd to become ready, up to `timeout` (forever if `None`).
///
/// Returns `false` when the timeout expires without readiness. EINTR is
/// retried with the remaining time recomputed, so interruption is never
/// visible to callers.
pub(crate) fn wait(fd: RawFd, interest: Interest, timeout: Option<Duration>) -> Result<bool> {
    let events = match interest {
        Interest::Read => libc::POLLIN,
        Interest::Write => libc::POLLOUT,
    };
    let deadline = timeout.map(|t| Instant::now() + t);

    loop {
        let timeout_ms: libc::c_int = match deadline {
            None => -1,
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                remaining.as_millis().min(libc::c_int::MAX as u128) as libc::c_int
            }
        };

        let mut pfd = libc::pollfd {
            fd,
            events,
            revents: 0,
        };
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };

        if rc == -1 {
            if errno() == libc::EINTR {
                continue;
            }
            return Err(NetError::os("poll"));
        }
        if rc == 0 {
            // poll() may time out slightly early on a coarse clock.
            if let Some(d) = deadline {
                if Instant::now() < d {
                    continue;
                }
            }
            return Ok(false);
        }
        // POLLERR/POLLHUP count as ready: the next syscall surfaces the error.
        return Ok(true);
    }
}
