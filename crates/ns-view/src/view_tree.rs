//! View tree - DOM projected onto native widgets
//!
//! [`ViewTree`] layers view lifecycle over the generic DOM arena: attaching
//! a child propagates inherited style, renders its native view under the
//! parent's context, and connects it; removing reverses all of that. The
//! suspension mask gates when property values reach the platform widget.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use ns_dom::{Event, NodeId, Tree};
use ns_style::{
    clear_inherited_properties, propagate_inheritable_css_properties,
    propagate_inheritable_properties, CssState, PropertyBag, PropertyMeta, PropertyTable,
    PropertyValue, StyleScope, ValidationError, BASE_CSS_PROPERTIES, BASE_VIEW_PROPERTIES,
};

use crate::hooks::{LayoutScheduler, NativeHandle, RenderContext, SharedHooks};
use crate::suspend::{self, SuspendReason};
use crate::{StateError, ViewError};

/// Pseudo-class alias table: requesting a state implies its aliases.
const PSEUDO_CLASS_ALIASES: &[(&str, &[&str])] = &[("highlighted", &["active", "pressed"])];

fn aliased_states(name: &str) -> Vec<&str> {
    let mut states = vec![name];
    if let Some((_, aliases)) = PSEUDO_CLASS_ALIASES.iter().find(|(n, _)| *n == name) {
        states.extend_from_slice(aliases);
    }
    states
}

/// Per-view synchronization state
pub struct ViewState {
    type_name: String,
    view_id: u64,
    properties: PropertyBag,
    style: PropertyBag,
    style_scope: Option<StyleScope>,
    is_style_scope_host: bool,
    css_state: CssState,
    is_connected: bool,
    native_view: Option<NativeHandle>,
    context: Option<RenderContext>,
    suspend_mask: u32,
    /// Property names written while suspended, awaiting the next flush
    pending_updates: Vec<&'static str>,
    flush_count: u32,
    reusable: bool,
    /// Excluded from layout (driven by the `hidden` property)
    is_collapsed: bool,
    css_classes: HashSet<String>,
    pseudo_classes: HashSet<String>,
    visual_state: Option<String>,
    hooks: SharedHooks,
}

impl ViewState {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn view_id(&self) -> u64 {
        self.view_id
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn native_view(&self) -> Option<&NativeHandle> {
        self.native_view.as_ref()
    }

    pub fn context(&self) -> Option<&RenderContext> {
        self.context.as_ref()
    }

    pub fn style(&self) -> &PropertyBag {
        &self.style
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn style_scope(&self) -> Option<&StyleScope> {
        self.style_scope.as_ref()
    }

    pub fn css_state(&self) -> &CssState {
        &self.css_state
    }

    pub fn suspend_mask(&self) -> u32 {
        self.suspend_mask
    }

    /// Flushes performed so far (transitions of the mask to zero)
    pub fn flush_count(&self) -> u32 {
        self.flush_count
    }

    pub fn is_reusable(&self) -> bool {
        self.reusable
    }

    pub fn is_collapsed(&self) -> bool {
        self.is_collapsed
    }

    pub fn css_classes(&self) -> &HashSet<String> {
        &self.css_classes
    }

    pub fn pseudo_classes(&self) -> &HashSet<String> {
        &self.pseudo_classes
    }
}

impl std::fmt::Debug for ViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewState")
            .field("type_name", &self.type_name)
            .field("view_id", &self.view_id)
            .field("is_connected", &self.is_connected)
            .field("has_native_view", &self.native_view.is_some())
            .field("suspend_mask", &format_args!("{:#x}", self.suspend_mask))
            .finish_non_exhaustive()
    }
}

/// DOM tree plus per-node view state
pub struct ViewTree {
    dom: Tree,
    views: HashMap<NodeId, ViewState>,
    layout_scheduler: Option<Rc<dyn LayoutScheduler>>,
    next_view_id: u64,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    pub fn new() -> Self {
        Self {
            dom: Tree::new(),
            views: HashMap::new(),
            layout_scheduler: None,
            next_view_id: 0,
        }
    }

    pub fn set_layout_scheduler(&mut self, scheduler: Rc<dyn LayoutScheduler>) {
        self.layout_scheduler = Some(scheduler);
    }

    /// Read-only access to the underlying DOM
    pub fn dom(&self) -> &Tree {
        &self.dom
    }

    pub fn is_view(&self, id: NodeId) -> bool {
        self.views.contains_key(&id)
    }

    pub fn state(&self, id: NodeId) -> &ViewState {
        self.views
            .get(&id)
            .unwrap_or_else(|| panic!("{id:?} is not a view of this tree"))
    }

    fn state_mut(&mut self, id: NodeId) -> &mut ViewState {
        self.views
            .get_mut(&id)
            .unwrap_or_else(|| panic!("{id:?} is not a view of this tree"))
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a view with the base property tables. Fires `created`.
    pub fn create_view(&mut self, type_name: &str, hooks: SharedHooks) -> NodeId {
        self.create_view_with_tables(type_name, hooks, BASE_VIEW_PROPERTIES, BASE_CSS_PROPERTIES)
    }

    pub fn create_view_with_tables(
        &mut self,
        type_name: &str,
        hooks: SharedHooks,
        view_table: PropertyTable,
        css_table: PropertyTable,
    ) -> NodeId {
        let id = self.dom.create_element(type_name);
        let view_id = self.next_view_id;
        self.next_view_id += 1;

        self.views.insert(
            id,
            ViewState {
                type_name: type_name.to_owned(),
                view_id,
                properties: PropertyBag::new(view_table),
                style: PropertyBag::new(css_table),
                style_scope: None,
                is_style_scope_host: false,
                css_state: CssState::new(),
                is_connected: false,
                native_view: None,
                context: None,
                suspend_mask: suspend::INITIAL,
                pending_updates: Vec::new(),
                flush_count: 0,
                reusable: false,
                is_collapsed: false,
                css_classes: HashSet::new(),
                pseudo_classes: HashSet::new(),
                visual_state: None,
                hooks,
            },
        );

        let mut created = Event::new("created");
        self.dom.dispatch_event(id, &mut created);
        id
    }

    /// Create a plain text node (no view state); text children ride along
    /// inside views without native widgets of their own.
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.dom.create_text(content)
    }

    pub fn set_reusable(&mut self, id: NodeId, reusable: bool) {
        self.state_mut(id).reusable = reusable;
    }

    /// Make the view a scope host with the given scope and notify the
    /// subtree's css state.
    pub fn set_style_scope_host(&mut self, id: NodeId, scope: StyleScope) {
        let state = self.state_mut(id);
        state.is_style_scope_host = true;
        state.style_scope = Some(scope.clone());
        state.css_state.on_change();

        let children: Vec<_> = self.dom.child_nodes(id).collect();
        for child in children {
            self.inherit_style_scope(child, Some(&scope));
        }
    }

    // ------------------------------------------------------------------
    // Attach / detach
    // ------------------------------------------------------------------

    /// Attach `child` before `reference`, propagating inherited style and
    /// — when the parent is rendered/connected — rendering and connecting
    /// the child immediately.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<NodeId, ViewError> {
        // Plain nodes (text content) carry no view lifecycle.
        if !self.is_view(child) {
            self.dom.insert_before(parent, child, reference)?;
            return Ok(child);
        }

        let prev_parent = self.dom.node(child).parent();
        if self.state(child).is_connected && prev_parent != Some(parent) {
            return Err(StateError::AlreadyConnected.into());
        }

        self.dom.insert_before(parent, child, reference)?;

        // Inheritable view/css properties flow parent -> child.
        let parent_props = self.state(parent).properties.clone();
        let parent_style = self.state(parent).style.clone();
        let parent_scope = self.state(parent).style_scope.clone();
        {
            let child_state = self.state_mut(child);
            propagate_inheritable_properties(&parent_props, &mut child_state.properties);
            propagate_inheritable_css_properties(&parent_style, &mut child_state.style);
        }
        self.inherit_style_scope(child, parent_scope.as_ref());

        if let Some(context) = self.state(parent).context.clone() {
            let index = self.dom.index_of_child(parent, child);
            self.render_native_view(child, context, index);
        }

        if self.state(parent).is_connected {
            self.connected_callback(child);
        }

        Ok(child)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, ViewError> {
        self.insert_before(parent, child, None)
    }

    /// Detach `child`: unlink, disconnect, tear down its native view.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, ViewError> {
        self.dom.remove_child(parent, child)?;
        if self.is_view(child) {
            self.disconnected_callback(child);
            self.detach_native_view(child, false);
        }
        Ok(child)
    }

    /// Reorder an attached child to the visual front without a lifecycle
    /// round trip. The native view is reordered immediately.
    pub fn reorder_to_front(&mut self, parent: NodeId, child: NodeId) -> Result<(), ViewError> {
        if self.dom.node(child).parent() != Some(parent) {
            return Err(ns_dom::StructureError::ReorderNonChild.into());
        }

        self.dom.insert_before(parent, child, None)?;

        let parent_handle = self.state(parent).native_view.clone();
        let child_handle = self.state(child).native_view.clone();
        if let (Some(parent_handle), Some(child_handle)) = (parent_handle, child_handle) {
            self.state(parent)
                .hooks
                .child_moved_to_front(&parent_handle, &child_handle);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Native view lifecycle
    // ------------------------------------------------------------------

    /// Store the rendering context, create and assign the native view, and
    /// recursively render children.
    pub fn render_native_view(
        &mut self,
        id: NodeId,
        context: RenderContext,
        index: Option<usize>,
    ) {
        tracing::debug!(view = self.state(id).type_name.as_str(), "render native view");
        self.state_mut(id).context = Some(context.clone());

        let native = self.state(id).hooks.create();
        self.set_native_view(id, native);
        self.resume_bit(id, suspend::UI_SETUP);

        // Notify the parent so the child lands in the native tree.
        if let Some(parent) = self.dom.node(id).parent() {
            self.on_child_added(parent, id, index);
        }

        let children: Vec<_> = self.dom.child_nodes(id).collect();
        for child in children {
            if self.is_view(child) {
                self.render_native_view(child, context.clone(), None);
            }
        }
    }

    /// Assign a native handle. No-op when the handle is unchanged;
    /// otherwise discards buffered updates, runs the init hook, and flushes
    /// if nothing else suspends updates.
    pub fn set_native_view(&mut self, id: NodeId, native: Option<NativeHandle>) {
        {
            let state = self.state_mut(id);
            let unchanged = match (&state.native_view, &native) {
                (None, None) => true,
                (Some(current), Some(new)) => current.ptr_eq(new),
                _ => false,
            };
            if unchanged {
                return;
            }

            state.native_view = native;
            state.suspend_mask |= suspend::NATIVE_VIEW;
            state.pending_updates.clear();
            if let Some(handle) = state.native_view.clone() {
                state.hooks.init(&handle);
            }
        }
        self.resume_bit(id, suspend::NATIVE_VIEW);
    }

    /// Recursively tear down native views. A reusable view keeps its
    /// subtree's handles unless `force` is set.
    pub fn detach_native_view(&mut self, id: NodeId, force: bool) {
        // No context means we are already torn down.
        if self.state(id).context.is_none() {
            return;
        }

        let preserve_native_view = self.state(id).reusable && !force;

        if !preserve_native_view {
            let children: Vec<_> = self.dom.child_nodes(id).collect();
            for child in children {
                if self.is_view(child) {
                    self.detach_native_view(child, force);
                }
            }
        }

        if let Some(parent) = self.dom.node(id).parent() {
            self.on_child_removed(parent, id);
        }

        {
            let state = self.state_mut(id);
            clear_inherited_properties(&mut state.properties);
            state.style.clear_inherited();
        }

        if !preserve_native_view {
            let mut dispose = Event::new("disposeNativeView");
            self.dom.dispatch_event(id, &mut dispose);

            let state = self.state_mut(id);
            if let Some(handle) = state.native_view.clone() {
                state.hooks.dispose(&handle);
            }
            state.suspend_mask |= suspend::UI_SETUP;
            state.native_view = None;
            state.context = None;
        } else if let Some(handle) = self.state(id).native_view.clone() {
            self.state(id).hooks.reset(&handle);
        }
    }

    fn on_child_added(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        let parent_handle = self.state(parent).native_view.clone();
        let child_handle = self.state(child).native_view.clone();
        if let (Some(parent_handle), Some(child_handle)) = (parent_handle, child_handle) {
            self.state(parent)
                .hooks
                .child_added(&parent_handle, &child_handle, index);
        }
    }

    fn on_child_removed(&mut self, parent: NodeId, child: NodeId) {
        self.state_mut(child).is_connected = false;

        let parent_handle = self.state(parent).native_view.clone();
        let child_handle = self.state(child).native_view.clone();
        if let (Some(parent_handle), Some(child_handle)) = (parent_handle, child_handle) {
            self.state(parent)
                .hooks
                .child_removed(&parent_handle, &child_handle);
        }
    }

    // ------------------------------------------------------------------
    // Connectivity
    // ------------------------------------------------------------------

    /// Idempotent connect: resumes the Loaded suspension, recurses
    /// pre-order, and fires `loaded` once.
    pub fn connected_callback(&mut self, id: NodeId) {
        if self.state(id).is_connected {
            return;
        }

        {
            let state = self.state_mut(id);
            state.is_connected = true;
            state.css_state.on_loaded();
        }
        self.resume_bit(id, suspend::LOADED);

        let children: Vec<_> = self.dom.child_nodes(id).collect();
        for child in children {
            if self.is_view(child) {
                self.connected_callback(child);
            }
        }

        let mut loaded = Event::new("loaded");
        self.dom.dispatch_event(id, &mut loaded);
    }

    /// Idempotent disconnect: suspends Loaded, recurses into children
    /// before clearing its own flag, and fires `unloaded` once.
    pub fn disconnected_callback(&mut self, id: NodeId) {
        if !self.state(id).is_connected {
            return;
        }

        self.state_mut(id).suspend_mask |= suspend::LOADED;

        let children: Vec<_> = self.dom.child_nodes(id).collect();
        for child in children {
            if self.is_view(child) {
                self.disconnected_callback(child);
            }
        }

        {
            let state = self.state_mut(id);
            state.is_connected = false;
            state.css_state.on_unloaded();
        }

        let mut unloaded = Event::new("unloaded");
        self.dom.dispatch_event(id, &mut unloaded);
    }

    // ------------------------------------------------------------------
    // Suspension
    // ------------------------------------------------------------------

    /// Raise a sticky suspension bit, or push a nested batch scope when the
    /// reason is None.
    pub fn suspend_native_updates(&mut self, id: NodeId, reason: Option<SuspendReason>) {
        let state = self.state_mut(id);
        match reason {
            Some(reason) => state.suspend_mask |= reason.bit(),
            None => state.suspend_mask += 1,
        }
    }

    /// Clear a sticky suspension bit, or pop a nested batch scope when the
    /// reason is None. Flushes on the transition to an all-zero mask.
    pub fn resume_native_updates(
        &mut self,
        id: NodeId,
        reason: Option<SuspendReason>,
    ) -> Result<(), StateError> {
        {
            let state = self.state_mut(id);
            match reason {
                Some(reason) => state.suspend_mask &= !reason.bit(),
                None => {
                    if state.suspend_mask & suspend::COUNTER_MASK == 0 {
                        return Err(StateError::InvalidResume);
                    }
                    state.suspend_mask -= 1;
                }
            }
        }

        if self.state(id).suspend_mask == 0 {
            self.on_resume_native_updates(id);
        }
        Ok(())
    }

    fn resume_bit(&mut self, id: NodeId, bit: u32) {
        self.state_mut(id).suspend_mask &= !bit;
        if self.state(id).suspend_mask == 0 {
            self.on_resume_native_updates(id);
        }
    }

    /// Batch several property writes into one native pass.
    pub fn batch_update<T>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Self) -> T,
    ) -> Result<T, StateError> {
        self.suspend_native_updates(id, None);
        let result = f(self);
        self.resume_native_updates(id, None)?;
        Ok(result)
    }

    /// Apply native setters after the last suspension clears.
    fn on_resume_native_updates(&mut self, id: NodeId) {
        let state = self.state_mut(id);
        state.flush_count += 1;
        state.pending_updates.clear();

        let Some(handle) = state.native_view.clone() else {
            return;
        };
        let hooks = state.hooks.clone();
        for (name, value, _) in state.properties.stored_entries() {
            hooks.apply(&handle, name, value);
        }
        for (name, value, _) in state.style.stored_entries() {
            hooks.apply(&handle, name, value);
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn set_style_property(
        &mut self,
        id: NodeId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), ValidationError> {
        let meta = self.lookup_meta(id, name, false)?;
        {
            let state = self.state_mut(id);
            state.style.set_local(name, value.clone())?;
            Self::apply_or_buffer(state, meta.name, &value);
        }
        if meta.affects_layout {
            self.request_layout(id);
        }
        Ok(())
    }

    pub fn set_view_property(
        &mut self,
        id: NodeId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), ValidationError> {
        let meta = self.lookup_meta(id, name, true)?;
        {
            let state = self.state_mut(id);
            state.properties.set_local(name, value.clone())?;
            Self::apply_or_buffer(state, meta.name, &value);
        }

        if name == "class-name" {
            self.on_class_name_changed(id);
        }
        if name == "hidden" {
            let hidden = value.as_bool().unwrap_or(false);
            self.state_mut(id).is_collapsed = hidden;
        }
        if meta.affects_layout {
            self.request_layout(id);
        }
        Ok(())
    }

    /// Set a view property from its string form, converting through the
    /// table's default type (`hidden="true"` and friends).
    pub fn set_view_property_from_str(
        &mut self,
        id: NodeId,
        name: &str,
        raw: &str,
    ) -> Result<(), ValidationError> {
        let meta = self.lookup_meta(id, name, true)?;
        let value = match meta.default {
            PropertyValue::Bool(_) => PropertyValue::Bool(ns_style::boolean_converter(raw)?),
            PropertyValue::Number(_) => PropertyValue::Number(
                raw.parse::<f64>()
                    .map_err(|_| ValidationError::InvalidNumber(raw.to_owned()))?,
            ),
            PropertyValue::Text(_) => PropertyValue::Text(raw.to_owned().into()),
        };
        self.set_view_property(id, name, value)
    }

    /// Effective style value (local, inherited, or table default)
    pub fn style_value(&self, id: NodeId, name: &str) -> Option<PropertyValue> {
        self.state(id).style.get(name)
    }

    pub fn view_property(&self, id: NodeId, name: &str) -> Option<PropertyValue> {
        self.state(id).properties.get(name)
    }

    fn lookup_meta(
        &self,
        id: NodeId,
        name: &str,
        view_table: bool,
    ) -> Result<&'static PropertyMeta, ValidationError> {
        let state = self.state(id);
        let bag = if view_table { &state.properties } else { &state.style };
        bag.meta(name)
            .ok_or_else(|| ValidationError::UnknownProperty(name.to_owned()))
    }

    fn apply_or_buffer(state: &mut ViewState, name: &'static str, value: &PropertyValue) {
        if state.suspend_mask == 0 {
            if let Some(handle) = state.native_view.clone() {
                state.hooks.apply(&handle, name, value);
            }
        } else if !state.pending_updates.contains(&name) {
            state.pending_updates.push(name);
        }
    }

    fn on_class_name_changed(&mut self, id: NodeId) {
        let class_value = self
            .state(id)
            .properties
            .get("class-name")
            .and_then(|v| v.as_text().map(str::to_owned))
            .unwrap_or_default();

        let state = self.state_mut(id);
        state.css_classes.clear();
        for class in class_value.split_whitespace() {
            state.css_classes.insert(class.to_owned());
        }
        state.css_state.on_change();
    }

    // ------------------------------------------------------------------
    // Style scope
    // ------------------------------------------------------------------

    /// Adopt the given scope unless this view hosts its own; recurses into
    /// children and notifies css state on an actual change.
    fn inherit_style_scope(&mut self, id: NodeId, scope: Option<&StyleScope>) {
        if !self.is_view(id) {
            return;
        }
        {
            let state = self.state_mut(id);
            if state.is_style_scope_host {
                return;
            }
            if state.style_scope.as_ref() == scope {
                return;
            }
            state.style_scope = scope.cloned();
            state.css_state.on_change();
        }

        let children: Vec<_> = self.dom.child_nodes(id).collect();
        for child in children {
            if self.is_view(child) {
                self.inherit_style_scope(child, scope);
            }
        }
    }

    // ------------------------------------------------------------------
    // Pseudo-classes
    // ------------------------------------------------------------------

    /// Add a CSS state, expanding aliases; notifies only actual changes.
    pub fn add_pseudo_class(&mut self, id: NodeId, name: &str) {
        for state_name in aliased_states(name) {
            let state = self.state_mut(id);
            if state.pseudo_classes.insert(state_name.to_owned()) {
                state.css_state.on_change();
                tracing::trace!(pseudo = state_name, "pseudo class added");
            }
        }
    }

    /// Remove a CSS state, expanding aliases; notifies only actual changes.
    pub fn delete_pseudo_class(&mut self, id: NodeId, name: &str) {
        for state_name in aliased_states(name) {
            let state = self.state_mut(id);
            if state.pseudo_classes.remove(state_name) {
                state.css_state.on_change();
                tracing::trace!(pseudo = state_name, "pseudo class removed");
            }
        }
    }

    /// Swap the previous visual state for a new one. No-op when unchanged.
    pub fn go_to_visual_state(&mut self, id: NodeId, state_name: &str) {
        if self.state(id).visual_state.as_deref() == Some(state_name) {
            return;
        }

        if let Some(previous) = self.state_mut(id).visual_state.take() {
            self.delete_pseudo_class(id, &previous);
        }
        self.state_mut(id).visual_state = Some(state_name.to_owned());
        self.add_pseudo_class(id, state_name);
    }

    // ------------------------------------------------------------------
    // Events / layout
    // ------------------------------------------------------------------

    /// Dispatch through the underlying DOM (capture/bubble over the view
    /// hierarchy).
    pub fn dispatch_event(&self, id: NodeId, event: &mut Event) -> bool {
        self.dom.dispatch_event(id, event)
    }

    /// Signal layout invalidation for the subtree's root.
    pub fn request_layout(&self, id: NodeId) {
        let mut root = id;
        while let Some(parent) = self.dom.node(root).parent() {
            root = parent;
        }
        match &self.layout_scheduler {
            Some(scheduler) => scheduler.request_layout(root),
            None => tracing::trace!(?root, "layout requested with no scheduler"),
        }
    }
}
