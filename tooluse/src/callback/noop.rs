//! No-op implementation of [`RunHooks`].

use async_trait::async_trait;

use super::hooks::RunHooks;

/// A [`RunHooks`] implementation that does nothing.
///
/// This is the default when a run is configured without hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRunHooks;

#[async_trait]
impl RunHooks for NoopRunHooks {}
