//! Components
//!
//! A [`Component`] is reusable tree-building code. It renders into any
//! [`BuildScope`] and may hand back a value, such as the fragment of a render
//! instance it started or a handle to an input it created.

use super::scope::BuildScope;
use crate::error::Result;

/// Something that can be rendered into a scope.
pub trait Component {
    /// What rendering hands back to the caller.
    type Output;

    /// Build this component into `scope`.
    fn render(&self, scope: &BuildScope) -> Result<Self::Output>;
}

impl<F, O> Component for F
where
    F: Fn(&BuildScope) -> Result<O>,
{
    type Output = O;

    fn render(&self, scope: &BuildScope) -> Result<O> {
        self(scope)
    }
}

impl BuildScope {
    /// Render a component into this scope.
    pub fn component<C>(&self, component: &C) -> Result<C::Output>
    where
        C: Component + ?Sized,
    {
        component.render(self)
    }
}
