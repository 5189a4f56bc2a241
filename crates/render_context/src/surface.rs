//! Presentation surface binding
//!
//! Tracks the zero-or-one surface tied to the host window. Platforms that
//! reclaim the surface while the application is in the background need it
//! destroyed and created again later, so the binding is an explicit two-state
//! machine:
//!
//! | From    | Request | To      | Effect                          |
//! |---------|---------|---------|---------------------------------|
//! | Unbound | bind    | Bound   | surface created for the window  |
//! | Bound   | bind    | Bound   | none, existing surface returned |
//! | Bound   | unbind  | Unbound | surface destroyed               |
//! | Unbound | unbind  | Unbound | none                            |
//!
//! Duplicate lifecycle events therefore never create a second surface or
//! destroy one twice. The binding borrows its [`GraphicsContext`], so the
//! surface can never outlive the instance it was created against.

use crate::backend::{GraphicsBackend, SurfaceSource};
use crate::context::GraphicsContext;
use crate::error::{ShutdownError, SurfaceError, SurfaceOperation};

/// State of a [`SurfaceBinding`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingState {
    /// No surface exists
    Unbound,
    /// A surface exists for the host window
    Bound,
}

/// Owner of the presentation surface for a single window
pub struct SurfaceBinding<'ctx, B: GraphicsBackend> {
    context: &'ctx GraphicsContext<B>,
    surface: Option<B::Surface>,
}

impl<'ctx, B: GraphicsBackend> SurfaceBinding<'ctx, B> {
    /// Create an unbound binding for the context
    pub fn new(context: &'ctx GraphicsContext<B>) -> Self {
        Self {
            context,
            surface: None,
        }
    }

    /// The context the surface is created against
    pub fn context(&self) -> &'ctx GraphicsContext<B> {
        self.context
    }

    /// Current state
    pub fn state(&self) -> BindingState {
        if self.surface.is_some() {
            BindingState::Bound
        } else {
            BindingState::Unbound
        }
    }

    /// Whether a surface is currently bound
    pub fn is_bound(&self) -> bool {
        self.surface.is_some()
    }

    /// The bound surface, if any
    pub fn surface(&self) -> Option<B::Surface> {
        self.surface
    }

    /// Create a surface for `window` unless one is already bound
    ///
    /// Returns the bound surface. On failure the binding stays unbound and
    /// the context remains usable; a later call may succeed.
    pub fn bind<W>(&mut self, window: &W) -> Result<B::Surface, SurfaceError>
    where
        W: SurfaceSource<B>,
    {
        if let Some(surface) = self.surface {
            log::debug!("Surface already bound, ignoring bind");
            return Ok(surface);
        }

        let surface = window
            .create_surface(self.context.backend(), self.context.instance())
            .map_err(|e| SurfaceError::new(SurfaceOperation::Bind, e))?;
        self.surface = Some(surface);
        log::debug!("Surface bound");
        Ok(surface)
    }

    /// Destroy the bound surface, if any
    ///
    /// On failure the surface stays bound so the caller can retry.
    pub fn unbind(&mut self) -> Result<(), SurfaceError> {
        let Some(surface) = self.surface else {
            log::debug!("No surface bound, ignoring unbind");
            return Ok(());
        };

        self.context
            .backend()
            .destroy_surface(self.context.instance(), surface)
            .map_err(|e| SurfaceError::new(SurfaceOperation::Unbind, e))?;
        self.surface = None;
        log::debug!("Surface unbound");
        Ok(())
    }

    /// Shutdown step for the binding: wait for the device, then unbind
    ///
    /// After this returns the context can be torn down.
    pub fn release(mut self) -> Result<(), ShutdownError> {
        self.context.wait_idle()?;
        self.unbind()?;
        Ok(())
    }
}

impl<B: GraphicsBackend> Drop for SurfaceBinding<'_, B> {
    fn drop(&mut self) {
        if !self.is_bound() {
            return;
        }
        if let Err(e) = self.context.wait_idle() {
            log::warn!("Idle wait before surface release failed: {}", e);
        }
        if let Err(e) = self.unbind() {
            log::warn!("Surface leaked on drop: {}", e);
        }
    }
}
