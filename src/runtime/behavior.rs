//! User-supplied element behaviors
//!
//! A template's `<script>` is opaque to sloth. Its Rust counterpart is a
//! [`Behavior`] registered under the template name before the template is
//! defined; the runtime calls `setup` after each render and `teardown` on
//! detachment or before a hot swap.

use super::document::{LiveDocument, NodeId};

pub struct BehaviorContext<'a> {
    pub document: &'a mut LiveDocument,
    pub host: NodeId,
    pub shadow_root: Option<NodeId>,
    pub template: &'a str,
}

pub trait Behavior {
    fn setup(&self, _ctx: &mut BehaviorContext<'_>) {}

    fn teardown(&self, _ctx: &mut BehaviorContext<'_>) {}
}

/// Behavior built from closures, mostly for small hooks and tests
pub struct FnBehavior<S, T> {
    setup: S,
    teardown: T,
}

impl<S> FnBehavior<S, fn(&mut BehaviorContext<'_>)>
where
    S: Fn(&mut BehaviorContext<'_>),
{
    pub fn on_setup(setup: S) -> Self {
        Self {
            setup,
            teardown: |_| {},
        }
    }
}

impl<S, T> FnBehavior<S, T>
where
    S: Fn(&mut BehaviorContext<'_>),
    T: Fn(&mut BehaviorContext<'_>),
{
    pub fn new(setup: S, teardown: T) -> Self {
        Self { setup, teardown }
    }
}

impl<S, T> Behavior for FnBehavior<S, T>
where
    S: Fn(&mut BehaviorContext<'_>),
    T: Fn(&mut BehaviorContext<'_>),
{
    fn setup(&self, ctx: &mut BehaviorContext<'_>) {
        (self.setup)(ctx)
    }

    fn teardown(&self, ctx: &mut BehaviorContext<'_>) {
        (self.teardown)(ctx)
    }
}
