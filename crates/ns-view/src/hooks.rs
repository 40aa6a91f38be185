//! Native-view capability interface
//!
//! The platform widget toolkit sits behind [`NativeViewHooks`]; the core
//! never sees past the opaque handles. One implementation per concrete view
//! variant replaces the subclass-override dispatch of classic widget trees.

use std::any::Any;
use std::rc::Rc;

use ns_dom::NodeId;
use ns_style::PropertyValue;

/// Opaque platform widget handle, exclusively owned by one view.
#[derive(Clone)]
pub struct NativeHandle {
    inner: Rc<dyn Any>,
}

impl NativeHandle {
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            inner: Rc::new(value),
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Handle identity (same underlying platform widget).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeHandle({:p})", Rc::as_ptr(&self.inner))
    }
}

/// Opaque rendering context (activity, window, ...) a subtree renders under.
#[derive(Clone)]
pub struct RenderContext {
    inner: Rc<dyn Any>,
}

impl RenderContext {
    pub fn new<T: 'static>(value: T) -> Self {
        Self {
            inner: Rc::new(value),
        }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RenderContext({:p})", Rc::as_ptr(&self.inner))
    }
}

/// Per-view-type capability table: create/init/reset/dispose plus native
/// child management and property application.
pub trait NativeViewHooks {
    /// Produce the platform widget, or None for marker views without one.
    fn create(&self) -> Option<NativeHandle>;

    /// Wire a freshly assigned handle (listeners, tags, ...).
    fn init(&self, _handle: &NativeHandle) {}

    /// Return a preserved handle to its default state for reuse.
    fn reset(&self, _handle: &NativeHandle) {}

    /// Release the platform widget.
    fn dispose(&self, _handle: &NativeHandle) {}

    /// Push one property value to the platform widget.
    fn apply(&self, _handle: &NativeHandle, _name: &str, _value: &PropertyValue) {}

    /// A child widget entered this widget's native children at `index`
    /// (appended when None).
    fn child_added(&self, _parent: &NativeHandle, _child: &NativeHandle, _index: Option<usize>) {}

    fn child_removed(&self, _parent: &NativeHandle, _child: &NativeHandle) {}

    /// Reorder a child widget to the visual front.
    fn child_moved_to_front(&self, _parent: &NativeHandle, _child: &NativeHandle) {}
}

/// Hooks for views without a platform widget of their own.
#[derive(Debug, Default)]
pub struct PlaceholderHooks;

impl NativeViewHooks for PlaceholderHooks {
    fn create(&self) -> Option<NativeHandle> {
        None
    }
}

pub type SharedHooks = Rc<dyn NativeViewHooks>;

/// Layout-engine seam: the core only signals invalidation.
pub trait LayoutScheduler {
    fn request_layout(&self, root: NodeId);
}
