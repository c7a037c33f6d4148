//! Account lookups through the system password database

use anyhow::{Context, Result};
use std::ffi::{CStr, CString};
use std::mem::MaybeUninit;
use std::path::PathBuf;

/// Initial getpw*_r buffer; grown on ERANGE
const PW_BUFFER: usize = 1024;
const PW_BUFFER_MAX: usize = 1 << 20;

/// A resolved account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

/// Effective uid of this process
pub fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() }
}

/// Whether this process runs as root
pub fn is_root() -> bool {
    effective_uid() == 0
}

/// Look up an account by name, `None` if it does not exist
pub fn by_name(name: &str) -> Result<Option<UserInfo>> {
    let c_name = CString::new(name).context("Invalid user name")?;
    lookup(|pwd, buf, result| unsafe {
        libc::getpwnam_r(c_name.as_ptr(), pwd, buf.as_mut_ptr(), buf.len(), result)
    })
    .with_context(|| format!("Failed to look up user {}", name))
}

/// Look up an account by uid
pub fn by_uid(uid: u32) -> Result<Option<UserInfo>> {
    lookup(|pwd, buf, result| unsafe {
        libc::getpwuid_r(uid, pwd, buf.as_mut_ptr(), buf.len(), result)
    })
    .with_context(|| format!("Failed to look up uid {}", uid))
}

/// Name of the account running this process
pub fn current_user_name() -> Result<String> {
    let uid = effective_uid();
    by_uid(uid)?
        .map(|u| u.name)
        .with_context(|| format!("No passwd entry for uid {}", uid))
}

/// Name for a uid, falling back to the number itself
pub fn name_of(uid: u32) -> String {
    by_uid(uid)
        .ok()
        .flatten()
        .map(|u| u.name)
        .unwrap_or_else(|| uid.to_string())
}

/// Run a reentrant getpw*_r call, growing the buffer on ERANGE
fn lookup<F>(mut call: F) -> Result<Option<UserInfo>>
where
    F: FnMut(*mut libc::passwd, &mut [libc::c_char], *mut *mut libc::passwd) -> libc::c_int,
{
    let mut size = PW_BUFFER;
    loop {
        let mut buf: Vec<libc::c_char> = vec![0; size];
        let mut pwd: MaybeUninit<libc::passwd> = MaybeUninit::uninit();
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        let rc = call(pwd.as_mut_ptr(), &mut buf, &mut result);

        if rc == libc::ERANGE && size < PW_BUFFER_MAX {
            size *= 2;
            continue;
        }
        if rc != 0 {
            return Err(std::io::Error::from_raw_os_error(rc).into());
        }
        if result.is_null() {
            return Ok(None);
        }

        // SAFETY: a non-null result means pwd was filled and its strings
        // point into buf, which is still alive here
        let info = unsafe {
            let pwd = pwd.assume_init();
            UserInfo {
                name: CStr::from_ptr(pwd.pw_name).to_string_lossy().into_owned(),
                uid: pwd.pw_uid,
                gid: pwd.pw_gid,
                home: PathBuf::from(CStr::from_ptr(pwd.pw_dir).to_string_lossy().into_owned()),
            }
        };
        return Ok(Some(info));
    }
}
