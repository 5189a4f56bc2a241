//! Lifecycle events and their mapping onto the surface binding
//!
//! Only three host signals matter here: quit, enter-foreground and
//! enter-background. Foreground binds the window, background unbinds it and
//! quit ends event processing. Quit does not tear anything down; the host
//! does that afterwards, once the device is idle.

use crate::backend::{GraphicsBackend, SurfaceSource};
use crate::error::SurfaceError;
use crate::surface::SurfaceBinding;

/// Host lifecycle signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The application should exit
    Quit,
    /// The application is visible again and may present
    EnterForeground,
    /// The application is about to lose its presentation surface
    EnterBackground,
}

/// Whether the host loop keeps running after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    /// Keep polling events
    Continue,
    /// Stop after the current batch
    Exit,
}

impl<B: GraphicsBackend> SurfaceBinding<'_, B> {
    /// Apply one lifecycle event to the binding
    pub fn handle_event<W>(&mut self, event: LifecycleEvent, window: &W) -> Result<LoopControl, SurfaceError>
    where
        W: SurfaceSource<B>,
    {
        match event {
            LifecycleEvent::Quit => Ok(LoopControl::Exit),
            LifecycleEvent::EnterForeground => self.bind(window).map(|_| LoopControl::Continue),
            LifecycleEvent::EnterBackground => self.unbind().map(|()| LoopControl::Continue),
        }
    }
}

/// Result of processing one batch of events
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PumpOutcome {
    /// A quit event was seen in the batch
    pub quit_requested: bool,
    /// Surface failures, in the order they happened
    pub failures: Vec<SurfaceError>,
}

impl PumpOutcome {
    /// Loop decision for the host
    pub fn control(&self) -> LoopControl {
        if self.quit_requested {
            LoopControl::Exit
        } else {
            LoopControl::Continue
        }
    }
}

/// Process a batch of events in arrival order
///
/// Surface failures do not stop the batch; they are collected so the host
/// can report them and keep running without a surface. A quit still lets
/// the rest of the batch through; the loop ends before the next poll.
pub fn pump_events<B, W, I>(binding: &mut SurfaceBinding<'_, B>, window: &W, events: I) -> PumpOutcome
where
    B: GraphicsBackend,
    W: SurfaceSource<B>,
    I: IntoIterator<Item = LifecycleEvent>,
{
    let mut outcome = PumpOutcome::default();

    for event in events {
        log::trace!("Lifecycle event: {:?}", event);
        match binding.handle_event(event, window) {
            Ok(LoopControl::Exit) => outcome.quit_requested = true,
            Ok(LoopControl::Continue) => {}
            Err(e) => outcome.failures.push(e),
        }
    }

    outcome
}
