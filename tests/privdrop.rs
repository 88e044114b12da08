//! Privilege-drop tests. The monotonicity test needs root and skips
//! itself otherwise; it runs in a forked child so the test process
//! keeps its own identity.

use forkserv::{drop_privileges, Config, Error};
use nix::{
    sys::wait::{waitpid, WaitStatus},
    unistd::{fork, setuid, ForkResult, Uid},
};
use std::process;

#[test]
fn unknown_accounts_fail_before_any_transition() {
    let err =
        drop_privileges("account-that-cannot-exist", &Config::default()).expect_err("must fail");

    assert!(matches!(err, Error::UserNotFound(_)));
}

#[test]
fn dropping_to_nobody_is_permanent() {
    if !Uid::effective().is_root() {
        eprintln!("skipping dropping_to_nobody_is_permanent: requires root");
        return;
    }

    match unsafe { fork() }.expect("fork") {
        ForkResult::Child => {
            let dropped = drop_privileges("nobody", &Config::default()).is_ok();
            let demoted = !Uid::effective().is_root();
            let locked = setuid(Uid::from_raw(0)).is_err();

            process::exit(if dropped && demoted && locked { 0 } else { 1 });
        }
        ForkResult::Parent { child } => match waitpid(child, None).expect("waitpid") {
            WaitStatus::Exited(pid, 0) if pid == child => {}
            status => panic!("unexpected child status: {:?}", status),
        },
    }
}
