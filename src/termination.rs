//! Defines the [`Termination`] trait.

use std::{convert::Infallible, fmt::Debug, process};

/// This trait extends the [`std::process::Termination`] trait so that [`gui::run`] can inspect
/// the application's result.
///
/// The windowing event loop never returns control to `main`, so [`gui::run`] has to exit the
/// process itself, with a status depending on the [`Termination`] value returned by the
/// application closure.
///
/// [`gui::run`]: crate::gui::run
pub trait Termination: process::Termination {
    fn is_success(&self) -> bool;
}

impl Termination for Infallible {
    fn is_success(&self) -> bool {
        match *self {}
    }
}

impl Termination for () {
    fn is_success(&self) -> bool {
        true
    }
}

impl<T: Termination, E: Debug> Termination for Result<T, E> {
    fn is_success(&self) -> bool {
        match self {
            Ok(term) => term.is_success(),
            Err(_) => false,
        }
    }
}
