//! User and group database lookups (`getpwuid_r` and friends)

use std::ffi::{CStr, CString};

const INITIAL_BUF: usize = 1024;
const MAX_BUF: usize = 1 << 20;

/// Run a reentrant passwd/group lookup, growing the scratch buffer on ERANGE.
///
/// `lookup` receives the buffer and returns the libc status code together
/// with the entry, if one was found.
fn with_buffer<T>(mut lookup: impl FnMut(&mut [libc::c_char]) -> (libc::c_int, Option<T>)) -> Option<T> {
    let mut buf = vec![0 as libc::c_char; INITIAL_BUF];
    loop {
        let (rc, found) = lookup(&mut buf);
        if rc == libc::ERANGE && buf.len() < MAX_BUF {
            let len = buf.len() * 2;
            buf.resize(len, 0);
            continue;
        }
        return if rc == 0 { found } else { None };
    }
}

/// Symbolic name for `uid`, if the user database has one.
pub fn user_name(uid: u32) -> Option<String> {
    with_buffer(|buf| {
        // SAFETY: every pointer refers to a live local or to `buf`, whose
        // length is passed alongside it.
        unsafe {
            let mut pwd: libc::passwd = std::mem::zeroed();
            let mut result: *mut libc::passwd = std::ptr::null_mut();
            let rc = libc::getpwuid_r(uid, &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result);
            let name = if result.is_null() {
                None
            } else {
                Some(CStr::from_ptr(pwd.pw_name).to_string_lossy().into_owned())
            };
            (rc, name)
        }
    })
}

/// Symbolic name for `gid`, if the group database has one.
pub fn group_name(gid: u32) -> Option<String> {
    with_buffer(|buf| {
        // SAFETY: as in `user_name`.
        unsafe {
            let mut grp: libc::group = std::mem::zeroed();
            let mut result: *mut libc::group = std::ptr::null_mut();
            let rc = libc::getgrgid_r(gid, &mut grp, buf.as_mut_ptr(), buf.len(), &mut result);
            let name = if result.is_null() {
                None
            } else {
                Some(CStr::from_ptr(grp.gr_name).to_string_lossy().into_owned())
            };
            (rc, name)
        }
    })
}

/// Resolve a user spec: a numeric id is taken as is, a name is looked up.
pub fn resolve_uid(spec: &str) -> Option<u32> {
    if let Ok(id) = spec.parse::<u32>() {
        return Some(id);
    }
    let name = CString::new(spec).ok()?;
    with_buffer(|buf| {
        // SAFETY: as in `user_name`; `name` outlives the call.
        unsafe {
            let mut pwd: libc::passwd = std::mem::zeroed();
            let mut result: *mut libc::passwd = std::ptr::null_mut();
            let rc = libc::getpwnam_r(name.as_ptr(), &mut pwd, buf.as_mut_ptr(), buf.len(), &mut result);
            (rc, (!result.is_null()).then_some(pwd.pw_uid))
        }
    })
}

/// Resolve a group spec: a numeric id is taken as is, a name is looked up.
pub fn resolve_gid(spec: &str) -> Option<u32> {
    if let Ok(id) = spec.parse::<u32>() {
        return Some(id);
    }
    let name = CString::new(spec).ok()?;
    with_buffer(|buf| {
        // SAFETY: as in `resolve_uid`.
        unsafe {
            let mut grp: libc::group = std::mem::zeroed();
            let mut result: *mut libc::group = std::ptr::null_mut();
            let rc = libc::getgrnam_r(name.as_ptr(), &mut grp, buf.as_mut_ptr(), buf.len(), &mut result);
            (rc, (!result.is_null()).then_some(grp.gr_gid))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_specs_resolve_directly() {
        assert_eq!(resolve_uid("0"), Some(0));
        assert_eq!(resolve_gid("4242"), Some(4242));
    }

    #[test]
    fn test_root_round_trips() {
        // uid 0 is present in every user database we run on.
        let name = user_name(0).expect("uid 0 has a name");
        assert_eq!(resolve_uid(&name), Some(0));
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(resolve_uid("no-such-user-gitperm-test"), None);
        assert_eq!(resolve_gid("no-such-group-gitperm-test"), None);
        assert_eq!(resolve_uid("nul\0byte"), None);
    }
}
