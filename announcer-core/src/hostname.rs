// announcer-core/src/hostname.rs

//! System hostname lookup used for the default advertised host.

use std::ffi::OsString;

/// Returns the hostname of this machine.
pub fn get() -> std::io::Result<OsString> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStringExt;
        let mut buf = vec![0u8; 256];
        // SAFETY: gethostname writes at most buf.len() bytes into buf
        let ret =
            unsafe { ::libc::gethostname(buf.as_mut_ptr() as *mut ::libc::c_char, buf.len()) };
        if ret != 0 {
            return Err(std::io::Error::last_os_error());
        }
        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        buf.truncate(len);
        Ok(OsString::from_vec(buf))
    }

    #[cfg(not(unix))]
    {
        Ok(OsString::from("localhost"))
    }
}
