//! Socket options.
//!
//! Options are named constants with a fixed semantic type: boolean
//! toggles and byte-size knobs. Each maps to one native `(level, name)`
//! pair and is translated to the platform's option structure here, so
//! callers never touch raw `setsockopt` arguments.

use std::os::fd::AsRawFd;

use crate::error::{NetError, Result};

/// Boolean socket options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOption {
    Debug,
    ReuseAddr,
    KeepAlive,
    Broadcast,
    OobInline,
}

impl BoolOption {
    fn raw(self) -> (libc::c_int, libc::c_int) {
        match self {
            BoolOption::Debug => (libc::SOL_SOCKET, libc::SO_DEBUG),
            BoolOption::ReuseAddr => (libc::SOL_SOCKET, libc::SO_REUSEADDR),
            BoolOption::KeepAlive => (libc::SOL_SOCKET, libc::SO_KEEPALIVE),
            BoolOption::Broadcast => (libc::SOL_SOCKET, libc::SO_BROADCAST),
            BoolOption::OobInline => (libc::SOL_SOCKET, libc::SO_OOBINLINE),
        }
    }

    fn name(self) -> &'static str {
        match self {
            BoolOption::Debug => "setsockopt(SO_DEBUG)",
            BoolOption::ReuseAddr => "setsockopt(SO_REUSEADDR)",
            BoolOption::KeepAlive => "setsockopt(SO_KEEPALIVE)",
            BoolOption::Broadcast => "setsockopt(SO_BROADCAST)",
            BoolOption::OobInline => "setsockopt(SO_OOBINLINE)",
        }
    }
}

/// Byte-size socket options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeOption {
    SendBuffer,
    RecvBuffer,
}

impl SizeOption {
    fn raw(self) -> (libc::c_int, libc::c_int) {
        match self {
            SizeOption::SendBuffer => (libc::SOL_SOCKET, libc::SO_SNDBUF),
            SizeOption::RecvBuffer => (libc::SOL_SOCKET, libc::SO_RCVBUF),
        }
    }

    fn name(self) -> &'static str {
        match self {
            SizeOption::SendBuffer => "setsockopt(SO_SNDBUF)",
            SizeOption::RecvBuffer => "setsockopt(SO_RCVBUF)",
        }
    }
}

/// Sets a boolean option.
pub fn set_bool<S: AsRawFd>(socket: &S, option: BoolOption, enable: bool) -> Result<()> {
    let (level, name) = option.raw();
    let val: libc::c_int = if enable { 1 } else { 0 };
    let result = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            name,
            &val as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if result == -1 {
        Err(NetError::os(option.name()))
    } else {
        Ok(())
    }
}

/// Reads a boolean option.
pub fn get_bool<S: AsRawFd>(socket: &S, option: BoolOption) -> Result<bool> {
    let (level, name) = option.raw();
    let mut val: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let result = unsafe {
        libc::getsockopt(
            socket.as_raw_fd(),
            level,
            name,
            &mut val as *mut _ as *mut libc::c_void,
            &mut len,
        )
    };
    if result == -1 {
        Err(NetError::os(option.name()))
    } else {
        Ok(val != 0)
    }
}

/// Sets a byte-size option. The kernel may round (and typically doubles)
/// the value it actually applies.
pub fn set_size<S: AsRawFd>(socket: &S, option: SizeOption, size: u64) -> Result<()> {
    let (level, name) = option.raw();
    let val = size.min(libc::c_int::MAX as u64) as libc::c_int;
    let result = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            level,
            name,
            &val as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if result == -1 {
        Err(NetError::os(option.name()))
    } else {
        Ok(())
    }
}

/// Reads a byte-size option.
pub fn get_size<S: AsRawFd>(socket: &S, option: SizeOption) -> Result<u64> {
    let (level, name) = option.raw();
    let mut val: libc::c_int = 0;
    let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
    let result = unsafe {
        libc::getsockopt(
            socket.as_raw_fd(),
            level,
            name,
            &mut val as *mut _ as *mut libc::c_void,
            &mut len,
        )
    };
    if result == -1 {
        Err(NetError::os(option.name()))
    } else {
        Ok(val.max(0) as u64)
    }
}

/// Sets SO_REUSEADDR.
///
/// Allows binding to an address that's in TIME_WAIT state.
/// Essential for server restarts.
pub fn set_reuse_addr<S: AsRawFd>(socket: &S, enable: bool) -> Result<()> {
    set_bool(socket, BoolOption::ReuseAddr, enable)
}

/// Sets TCP_NODELAY — disables Nagle's algorithm, sends data immediately.
pub fn set_tcp_nodelay<S: AsRawFd>(socket: &S, enable: bool) -> Result<()> {
    let val: libc::c_int = if enable { 1 } else { 0 };
    let result = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_TCP,
            libc::TCP_NODELAY,
            &val as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if result == -1 {
        Err(NetError::os("setsockopt(TCP_NODELAY)"))
    } else {
        Ok(())
    }
}
