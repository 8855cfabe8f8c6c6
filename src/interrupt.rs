//
// Copyright 2024 sexp-codec Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Cooperative cancellation for long-running scans.
//!
//! This crate has no runtime of its own to hook an interrupt into. A host
//! embedding it inside a real process — a database backend honoring a
//! statement timeout, a signal handler flipping an atomic flag — implements
//! [`Interrupt`] against whatever mechanism it already has and passes it to
//! the `*_with_interrupt` entry points in [`crate::containment`] and
//! [`crate::index`]. It is polled once per visited list child during a
//! containment scan or index-key extraction. The plain entry points
//! (`contains`, `contains_key`, `extract_value_keys`, ...) use [`Never`],
//! which never cancels.

use log::debug;

use crate::error::{Error, Result};

/// A cancellation check a host wires into a long-running scan.
pub trait Interrupt {
    /// Returns `true` if the in-progress scan should stop.
    fn is_cancelled(&self) -> bool;
}

/// Never requests cancellation; used by every entry point that doesn't take
/// an explicit `Interrupt`.
pub struct Never;

impl Interrupt for Never {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<F: Fn() -> bool> Interrupt for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// Polls `interrupt`, returning `Err(Error::Cancelled)` the first time it
/// reports cancellation.
pub(crate) fn check(interrupt: &dyn Interrupt) -> Result<()> {
    if interrupt.is_cancelled() {
        debug!("scan cancelled by host interrupt check");
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_does_not_cancel() {
        assert!(check(&Never).is_ok());
    }

    #[test]
    fn test_closure_interrupt_cancels() {
        let flag = true;
        let interrupt = || flag;
        assert_eq!(check(&interrupt), Err(Error::Cancelled));
    }

    #[test]
    fn test_closure_interrupt_does_not_cancel() {
        let interrupt = || false;
        assert!(check(&interrupt).is_ok());
    }
}
