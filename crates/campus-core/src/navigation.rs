//! View navigation for the admin dashboard.
//!
//! The dashboard swaps its main panel between management views. `ViewStack` keeps the
//! views that were replaced so "back" restores the previous one, and `DashboardRouter`
//! maps sidebar anchors to an explicit route enum dispatched through a handler table.

use std::collections::HashMap;
use std::fmt::Debug;

/// Stack of views; the bottom entry is the root and is never popped.
#[derive(Debug, Clone)]
pub struct ViewStack<V> {
    views: Vec<V>,
}

impl<V: Clone + Debug> ViewStack<V> {
    pub fn new(root: V) -> Self {
        Self { views: vec![root] }
    }

    pub fn current(&self) -> &V {
        // The root is never removed, so the stack is never empty.
        &self.views[self.views.len() - 1]
    }

    pub fn root(&self) -> &V {
        &self.views[0]
    }

    pub fn depth(&self) -> usize {
        self.views.len()
    }

    /// Show `view`, remembering the one it replaces.
    pub fn push(&mut self, view: V) {
        tracing::debug!(from = ?self.current(), to = ?view, "Navigating to view");
        self.views.push(view);
    }

    /// Return to the previous view. At the root this is a no-op and returns the root.
    pub fn back(&mut self) -> &V {
        if self.views.len() > 1 {
            self.views.pop();
        }
        self.current()
    }

    /// Drop every view above the root.
    pub fn reset_to_root(&mut self) -> &V {
        self.views.truncate(1);
        self.current()
    }
}

/// Management panels reachable from the dashboard sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardRoute {
    Overview,
    Home,
    Courses,
    About,
    Testimonials,
    Store,
    Messages,
    Certificates,
    Users,
    Settings,
}

const ROUTE_ANCHORS: &[(&str, DashboardRoute)] = &[
    ("#dashboard", DashboardRoute::Overview),
    ("#inicio", DashboardRoute::Home),
    ("#servicios", DashboardRoute::Courses),
    ("#nosotros", DashboardRoute::About),
    ("#exito", DashboardRoute::Testimonials),
    ("#tienda", DashboardRoute::Store),
    ("#contacto", DashboardRoute::Messages),
    ("#certificados", DashboardRoute::Certificates),
    ("#usuarios", DashboardRoute::Users),
    ("#configuracion", DashboardRoute::Settings),
];

impl DashboardRoute {
    /// Resolve a sidebar anchor. Unknown anchors land on the overview.
    pub fn from_anchor(anchor: &str) -> Self {
        ROUTE_ANCHORS
            .iter()
            .find(|(a, _)| *a == anchor.trim())
            .map(|(_, route)| *route)
            .unwrap_or(DashboardRoute::Overview)
    }

    pub fn anchor(&self) -> &'static str {
        ROUTE_ANCHORS
            .iter()
            .find(|(_, route)| route == self)
            .map(|(a, _)| *a)
            .unwrap_or("#dashboard")
    }
}

type RouteHandler<C> = Box<dyn Fn(&mut C) + Send + Sync>;

/// Dispatches routes to registered handlers and keeps the navigation history.
pub struct DashboardRouter<C> {
    handlers: HashMap<DashboardRoute, RouteHandler<C>>,
    history: ViewStack<DashboardRoute>,
}

impl<C> DashboardRouter<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            history: ViewStack::new(DashboardRoute::Overview),
        }
    }

    pub fn register<F>(&mut self, route: DashboardRoute, handler: F) -> &mut Self
    where
        F: Fn(&mut C) + Send + Sync + 'static,
    {
        self.handlers.insert(route, Box::new(handler));
        self
    }

    /// Navigate to `route` and run its handler. Returns false when no handler is registered;
    /// the history still records the route.
    pub fn navigate(&mut self, route: DashboardRoute, ctx: &mut C) -> bool {
        if route == DashboardRoute::Overview {
            self.history.reset_to_root();
        } else {
            self.history.push(route);
        }
        self.dispatch(route, ctx)
    }

    pub fn navigate_anchor(&mut self, anchor: &str, ctx: &mut C) -> bool {
        self.navigate(DashboardRoute::from_anchor(anchor), ctx)
    }

    /// Return to the previous panel and run its handler.
    pub fn back(&mut self, ctx: &mut C) -> DashboardRoute {
        let route = *self.history.back();
        self.dispatch(route, ctx);
        route
    }

    pub fn current(&self) -> DashboardRoute {
        *self.history.current()
    }

    fn dispatch(&self, route: DashboardRoute, ctx: &mut C) -> bool {
        match self.handlers.get(&route) {
            Some(handler) => {
                handler(ctx);
                true
            }
            None => {
                tracing::warn!(route = ?route, "No handler registered for dashboard route");
                false
            }
        }
    }
}

impl<C> Default for DashboardRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_stack_back_never_pops_root() {
        let mut stack = ViewStack::new("overview");
        stack.push("courses");
        stack.push("course-form");
        assert_eq!(*stack.current(), "course-form");
        assert_eq!(*stack.back(), "courses");
        assert_eq!(*stack.back(), "overview");
        assert_eq!(*stack.back(), "overview");
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn view_stack_reset_returns_root() {
        let mut stack = ViewStack::new(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(*stack.reset_to_root(), 1);
        assert_eq!(*stack.root(), 1);
    }

    #[test]
    fn anchors_resolve_through_table() {
        assert_eq!(DashboardRoute::from_anchor("#servicios"), DashboardRoute::Courses);
        assert_eq!(DashboardRoute::from_anchor("#certificados"), DashboardRoute::Certificates);
        assert_eq!(DashboardRoute::from_anchor("#nope"), DashboardRoute::Overview);
        assert_eq!(DashboardRoute::Store.anchor(), "#tienda");
    }

    #[test]
    fn router_dispatches_and_goes_back() {
        let mut router: DashboardRouter<Vec<&'static str>> = DashboardRouter::new();
        router
            .register(DashboardRoute::Overview, |log| log.push("overview"))
            .register(DashboardRoute::Courses, |log| log.push("courses"))
            .register(DashboardRoute::Messages, |log| log.push("messages"));

        let mut log = Vec::new();
        assert!(router.navigate_anchor("#servicios", &mut log));
        assert!(router.navigate(DashboardRoute::Messages, &mut log));
        assert!(!router.navigate(DashboardRoute::Store, &mut log));
        assert_eq!(router.current(), DashboardRoute::Store);

        assert_eq!(router.back(&mut log), DashboardRoute::Messages);
        assert_eq!(router.back(&mut log), DashboardRoute::Courses);
        assert_eq!(log, vec!["courses", "messages", "messages", "courses"]);

        router.navigate(DashboardRoute::Overview, &mut log);
        assert_eq!(router.back(&mut log), DashboardRoute::Overview);
    }
}
