//! Behaviour of the call surface before any engine is installed.

use flaglog::{FlagMask, InstallError};

#[test]
fn try_engine_reports_missing_engine() {
    assert!(!flaglog::is_installed());
    assert_eq!(flaglog::try_engine().err(), Some(InstallError::NotInstalled));
}

#[test]
#[should_panic(expected = "no flaglog engine is installed")]
fn logging_before_install_panics() {
    let _ = flaglog::log_info("too early", FlagMask::NONE);
}

#[test]
#[should_panic(expected = "no flaglog engine is installed")]
fn macros_before_install_panic() {
    let _ = flaglog::log_warning!("too early");
}
