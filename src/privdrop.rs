//! Permanent privilege de-escalation for connection workers.

use crate::{config::Config, error::Error};
use nix::unistd::{chdir, chroot, User};
use std::path::Path;

/// Demotes the current process to the named unprivileged account.
///
/// Group memberships go first, then the group id, then the user id;
/// the user id goes last because changing it first would forfeit the
/// right to change the group. Finally the working directory moves to
/// the account's home, sealed in as the filesystem root when the
/// configuration confines workers.
///
/// Call this in the worker, after isolation and before the first byte
/// of untrusted input, so the restriction lands on the process that
/// talks to the peer and not on the listening parent. Every step must
/// succeed: a partially dropped identity is worse than a dead worker,
/// so any error here is final and the process should not continue.
pub fn drop_privileges(account: &str, config: &Config) -> Result<(), Error> {
    let user = User::from_name(account)?
        .ok_or_else(|| Error::UserNotFound(account.to_string().into()))?;

    // Supplementary groups are an escalation path of their own.
    #[cfg(not(any(target_os = "ios", target_os = "macos", target_os = "redox")))]
    nix::unistd::setgroups(&[]).map_err(|err| Error::Privdrop("setgroups", err))?;

    cfg_if::cfg_if! {
        if #[cfg(any(target_os = "android", target_os = "freebsd",
                     target_os = "linux", target_os = "openbsd"))] {
            nix::unistd::setresgid(user.gid, user.gid, user.gid)
                .map_err(|err| Error::Privdrop("setresgid", err))?;
            nix::unistd::setresuid(user.uid, user.uid, user.uid)
                .map_err(|err| Error::Privdrop("setresuid", err))?;
        } else {
            nix::unistd::setgid(user.gid).map_err(|err| Error::Privdrop("setgid", err))?;
            nix::unistd::setuid(user.uid).map_err(|err| Error::Privdrop("setuid", err))?;
        }
    }

    // Accounts like nobody often name a home that was never created.
    let dir = if user.dir.is_dir() {
        user.dir.as_path()
    } else {
        Path::new("/")
    };

    if config.confine_root {
        chroot(dir).map_err(|err| Error::Privdrop("chroot", err))?;
        chdir("/").map_err(|err| Error::Privdrop("chdir", err))?;
    } else {
        chdir(dir).map_err(|err| Error::Privdrop("chdir", err))?;
    }

    Ok(())
}
