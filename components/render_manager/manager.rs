/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The per-tab navigation state machine. For every navigation the manager
//! decides whether the current renderer process may keep hosting the tab or
//! whether the navigation must commit in a new process, creates and retires
//! the render view hosts involved, and drives the beforeunload/unload
//! handshake with the old page.
//!
//! The manager owns no registries: it holds view ids into the shared
//! [`ContentRuntime`] and calls out to its tab through [`ManagerDelegate`].

use std::mem;
use std::time::Instant;

use base::id::{ProcessId, RenderViewId, SiteInstanceId};
use content_traits::{ContentEvent, GlobalRequestId, NavigationEntry, Referrer};
use log::{debug, error, warn};
use rustc_hash::FxHashMap;
use url::Url;

use crate::render_view_host::ViewState;
use crate::runtime::ContentRuntime;
use crate::web_ui::WebUi;

/// In-flight state of a cross-site transfer: a response arrived in one
/// process but must commit in another. Valid only between
/// `on_cross_site_response` and the matching unload ACK or commit.
#[derive(Clone, Debug)]
pub struct PendingNavigationParams {
    /// The request carrying the response, to be handed over or resumed.
    pub global_request_id: GlobalRequestId,

    /// The redirect chain to re-navigate through, newest last. Empty for a
    /// plain (non-transfer) cross-site response.
    pub transfer_url_chain: Vec<Url>,

    pub referrer: Option<Referrer>,

    pub should_replace_current_entry: bool,
}

impl PendingNavigationParams {
    pub fn new(global_request_id: GlobalRequestId) -> PendingNavigationParams {
        PendingNavigationParams {
            global_request_id,
            transfer_url_chain: Vec::new(),
            referrer: None,
            should_replace_current_entry: false,
        }
    }

    pub fn transfer(
        global_request_id: GlobalRequestId,
        transfer_url_chain: Vec<Url>,
        referrer: Option<Referrer>,
    ) -> PendingNavigationParams {
        PendingNavigationParams {
            global_request_id,
            transfer_url_chain,
            referrer,
            should_replace_current_entry: false,
        }
    }
}

/// Where the manager stands in a cross-process navigation. The waiting
/// phases are states, not flags: at most one navigation is in flight and the
/// data each phase needs travels with it.
enum NavigationState {
    /// No cross-process navigation in flight.
    Idle,
    /// A pending view exists in the destination instance; no handshake is
    /// outstanding (either beforeunload already resolved, or none was needed).
    PendingCreated { view: RenderViewId },
    /// The old page is running its `beforeunload` handler; the pending
    /// view's navigation is held back until the handler consents.
    WaitingForBeforeUnload { view: RenderViewId },
    /// The old page was told to swap out and is running its unload handler.
    /// `view` is `None` when the response will commit in the current view
    /// (a transfer out of it).
    WaitingForUnloadOrTransfer {
        view: Option<RenderViewId>,
        params: PendingNavigationParams,
    },
}

impl NavigationState {
    fn pending_view(&self) -> Option<RenderViewId> {
        match *self {
            NavigationState::Idle => None,
            NavigationState::PendingCreated { view } |
            NavigationState::WaitingForBeforeUnload { view } => Some(view),
            NavigationState::WaitingForUnloadOrTransfer { view, .. } => view,
        }
    }
}

/// The tab-level callbacks the manager needs. Implemented by whatever owns
/// the manager (the web-contents object in a full browser).
pub trait ManagerDelegate {
    /// Create the renderer-side view for a host the manager registered.
    /// Returning false means the renderer could not be reached.
    fn create_render_view(&mut self, runtime: &mut ContentRuntime, view: RenderViewId) -> bool;

    /// A beforeunload ACK for a tab close arrived; the tab decides the final
    /// close semantics.
    fn before_unload_fired(&mut self, proceed: bool, proceed_time: Instant);

    /// The old page is swapping out; any dialogs it is showing must go.
    fn cancel_modal_dialogs(&mut self);

    /// A pending view was committed in place of `old`.
    fn notify_swapped(&mut self, old: Option<RenderViewId>, new: RenderViewId);

    /// Create the page's privileged controller, if `url` warrants one.
    fn create_web_ui(&mut self, url: &Url) -> Option<WebUi>;

    /// A transfer navigation needs re-issuing at `url` in this tab, carrying
    /// the already-started request.
    fn request_transfer_url(
        &mut self,
        url: Url,
        referrer: Option<Referrer>,
        global_request_id: GlobalRequestId,
    );

    /// Mirror this tab's opener chain into `instance` as swapped-out views,
    /// returning the view acting as this tab's opener there.
    fn create_opener_render_views(
        &mut self,
        _runtime: &mut ContentRuntime,
        _instance: SiteInstanceId,
    ) -> Option<RenderViewId> {
        None
    }

    /// The process behind the current view died.
    fn render_process_gone(&mut self) {}

    fn focus_location_bar_by_default(&self) -> bool {
        false
    }

    fn set_focus_to_location_bar(&mut self) {}

    fn is_hidden(&self) -> bool {
        false
    }

    /// Embedder override forcing a navigation into a fresh browsing
    /// instance even when the default rules would not.
    fn should_swap_browsing_instances(&self, _current_url: Option<&Url>, _new_url: &Url) -> bool {
        false
    }

    /// Guest views are pinned to their process and never swap.
    fn is_guest(&self) -> bool {
        false
    }
}

pub struct RenderFrameHostManager {
    /// The committed, visible view. Never dangling after `init`.
    current: RenderViewId,

    state: NavigationState,

    /// Hidden placeholder views kept alive so that same-browsing-instance
    /// windows can still script across processes, one per site instance.
    swapped_out: FxHashMap<SiteInstanceId, RenderViewId>,

    /// The committed privileged controller, mutually exclusive with the
    /// pending one.
    web_ui: Option<WebUi>,

    pending_web_ui: Option<WebUi>,

    /// Whether the current view is displaying page source.
    is_view_source: bool,

    /// False until the first commit; the swap heuristics stay out of the way
    /// of the initial navigation.
    has_committed: bool,
}

impl RenderFrameHostManager {
    /// Create the manager and its initial view. Returns `None` if the
    /// renderer-side view could not be created; the tab is unusable then.
    pub fn init(
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        site_instance: Option<SiteInstanceId>,
    ) -> Option<RenderFrameHostManager> {
        let instance = match site_instance {
            Some(instance) => instance,
            None => runtime.site_instances_mut().create(),
        };
        let view = runtime.create_view(instance, delegate.is_hidden(), false)?;
        let mut manager = RenderFrameHostManager {
            current: view,
            state: NavigationState::Idle,
            swapped_out: FxHashMap::default(),
            web_ui: None,
            pending_web_ui: None,
            is_view_source: false,
            has_committed: false,
        };
        if !manager.init_render_view(runtime, delegate, view) {
            runtime.release_view(view);
            return None;
        }
        runtime.set_view_active(view);
        Some(manager)
    }

    pub fn current(&self) -> RenderViewId {
        self.current
    }

    pub fn pending_render_view(&self) -> Option<RenderViewId> {
        self.state.pending_view()
    }

    pub fn swapped_out_view(&self, instance: SiteInstanceId) -> Option<RenderViewId> {
        self.swapped_out.get(&instance).copied()
    }

    pub fn web_ui(&self) -> Option<&WebUi> {
        self.web_ui.as_ref()
    }

    pub fn pending_web_ui(&self) -> Option<&WebUi> {
        self.pending_web_ui.as_ref()
    }

    pub fn current_site_instance(&self, runtime: &ContentRuntime) -> Option<SiteInstanceId> {
        runtime.view(self.current).map(|view| view.site_instance())
    }

    /// Navigate the tab to `entry`. Returns the view that will receive the
    /// navigation (the current one, or a newly pending one), or `None` on
    /// unrecoverable view-creation failure.
    pub fn navigate(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        entry: &NavigationEntry,
    ) -> Option<RenderViewId> {
        let dest = self.update_state_for_navigate(runtime, delegate, entry)?;
        if !runtime.view(dest).map_or(false, |view| view.is_live()) {
            // The renderer crashed since this view was last used; recreate it.
            if !self.init_render_view(runtime, delegate, dest) {
                if self.state.pending_view() == Some(dest) {
                    self.cancel_pending(runtime);
                }
                return None;
            }
            if dest == self.current {
                if !delegate.is_hidden() {
                    runtime.with_view_and_process(dest, |view, process| view.was_shown(process));
                }
                // The crashed process lost its privileged grant; the fresh
                // one needs it before the navigation goes out.
                let bindings = self
                    .pending_web_ui
                    .as_ref()
                    .or(self.web_ui.as_ref())
                    .map(|ui| ui.bindings());
                if let Some(bindings) = bindings {
                    self.grant_bindings(runtime, dest, bindings);
                }
            }
        }
        let load = entry.load_data();
        runtime.with_view_and_process(dest, |view, process| view.navigate(process, load))?;
        Some(dest)
    }

    /// The network stack is ready to commit a response in `view`: the
    /// pending view, or the current one for a transfer out of it. Records
    /// the in-flight request and asks the old page to swap out; the response
    /// stays deferred until the unload ACK (or a commit) releases it.
    pub fn on_cross_site_response(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        view: RenderViewId,
        params: PendingNavigationParams,
    ) {
        let pending = self.state.pending_view();
        if pending != Some(view) && view != self.current {
            warn!("Cross-site response for unknown view {:?}.", view);
            return;
        }
        self.state = NavigationState::WaitingForUnloadOrTransfer {
            view: pending,
            params,
        };
        self.swap_out_old_page(runtime, delegate);
    }

    /// The old view confirmed its unload handler ran (or the embedder gave
    /// up waiting). Releases whatever the in-flight navigation was waiting
    /// on: the transfer hand-off, or the deferred response.
    pub fn swapped_out(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        view: RenderViewId,
    ) {
        if let Some(view) = runtime.view_mut(view) {
            view.unload_acked();
        }
        if view != self.current {
            debug!("Unload ACK from non-current view {:?}; ignoring.", view);
            return;
        }
        match mem::replace(&mut self.state, NavigationState::Idle) {
            NavigationState::WaitingForUnloadOrTransfer { view: pending, params } => {
                if let Some(transfer_url) = params.transfer_url_chain.last().cloned() {
                    self.state = match pending {
                        Some(view) => NavigationState::PendingCreated { view },
                        None => NavigationState::Idle,
                    };
                    delegate.request_transfer_url(
                        transfer_url,
                        params.referrer.clone(),
                        params.global_request_id,
                    );
                } else if let Some(pending) = pending {
                    self.state = NavigationState::PendingCreated { view: pending };
                    runtime.with_view_and_process(pending, |view, process| {
                        view.resume_deferred_navigation(process, params.global_request_id)
                    });
                } else {
                    debug!("Unload ACK with neither a pending view nor a transfer.");
                }
            },
            other => {
                // A late commit already went through; this ACK is stale.
                debug!("Stale unload ACK from view {:?}.", view);
                self.state = other;
            },
        }
    }

    /// A main-frame navigation committed in `view`.
    pub fn did_navigate(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        view: RenderViewId,
    ) {
        if self.state.pending_view() == Some(view) {
            // Also covers navigations that never touched the network (e.g.
            // data: URLs): the old page still has to be told to leave.
            self.swap_out_old_page_if_needed(runtime, delegate);
            self.commit_pending(runtime, delegate);
        } else if view == self.current {
            if self.state.pending_view().is_some() {
                // A same-process navigation beat the cross-process one.
                self.cancel_pending(runtime);
            } else {
                // Drop any stale transfer params.
                self.state = NavigationState::Idle;
                if self.pending_web_ui.is_some() {
                    self.web_ui = self.pending_web_ui.take();
                }
            }
            self.has_committed = true;
        } else {
            warn!("Commit from non-current, non-pending view {:?}.", view);
            return;
        }
        // The first real commit pins the instance's site.
        let committed = runtime
            .view(self.current)
            .and_then(|view| Some((view.site_instance(), view.url().cloned()?)));
        if let Some((instance, url)) = committed {
            runtime.site_instances_mut().set_site_from_url(instance, &url);
        }
    }

    /// beforeunload ACK from the current view.
    ///
    /// For a cross-site transition, `proceed` opens or closes the gate on
    /// the pending navigation. For a tab close, any in-flight navigation is
    /// dropped first so it cannot race the teardown, and the tab decides the
    /// close semantics.
    pub fn should_close_page(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        for_cross_site_transition: bool,
        proceed: bool,
        proceed_time: Instant,
    ) {
        if let Some(view) = runtime.view_mut(self.current) {
            view.before_unload_acked();
        }
        if for_cross_site_transition {
            if proceed {
                if let NavigationState::WaitingForBeforeUnload { view } = self.state {
                    self.state = NavigationState::PendingCreated { view };
                    runtime.with_view_and_process(view, |view, process| {
                        view.set_navigations_suspended(process, false)
                    });
                } else {
                    debug!("beforeunload ACK with no gated navigation.");
                }
            } else if self.state.pending_view().is_some() {
                self.cancel_pending(runtime);
            }
        } else {
            if self.state.pending_view().is_some() {
                self.cancel_pending(runtime);
            }
            delegate.before_unload_fired(proceed, proceed_time);
        }
    }

    /// Tear down the pending navigation. The pending view goes back to
    /// swapped-out storage when it was borrowed from there, and is destroyed
    /// otherwise. Callers check for a pending view first.
    pub fn cancel_pending(&mut self, runtime: &mut ContentRuntime) {
        let state = mem::replace(&mut self.state, NavigationState::Idle);
        self.pending_web_ui = None;
        let Some(pending) = state.pending_view() else {
            return;
        };
        let Some(instance) = runtime.view(pending).map(|view| view.site_instance()) else {
            warn!("Pending view {:?} cancelled after closure.", pending);
            return;
        };
        runtime.with_view_and_process(pending, |view, process| view.stop(process));
        if self.swapped_out.get(&instance) == Some(&pending) {
            // Borrowed from swapped-out storage; it stays there.
            return;
        }
        runtime.release_view(pending);
    }

    /// Find or create a view for `instance` in this tab. A swapped-out view
    /// for the instance is reused (it leaves swapped-out bookkeeping only on
    /// eventual commit); otherwise a fresh one is registered and, unless
    /// `swapped_out` is requested, its process gains a pending-view
    /// reference so it cannot exit before the view initializes.
    pub fn create_render_view(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        instance: SiteInstanceId,
        opener: Option<RenderViewId>,
        swapped_out: bool,
        hidden: bool,
    ) -> Option<RenderViewId> {
        if let Some(&existing) = self.swapped_out.get(&instance) {
            if runtime.view(existing).is_some() {
                if !swapped_out && !self.init_render_view(runtime, delegate, existing) {
                    return None;
                }
                return Some(existing);
            }
            warn!("Swapped-out view {:?} vanished; recreating.", existing);
            self.swapped_out.remove(&instance);
        }
        let view = runtime.create_view(instance, hidden, swapped_out)?;
        if opener.is_some() {
            if let Some(view) = runtime.view_mut(view) {
                view.set_opener(opener);
            }
        }
        if swapped_out {
            self.swapped_out.insert(instance, view);
        }
        if !self.init_render_view(runtime, delegate, view) {
            if swapped_out {
                // Left uninitialized for a later retry.
                return Some(view);
            }
            runtime.release_view(view);
            return None;
        }
        Some(view)
    }

    /// A renderer process is going away: purge the swapped-out hosts that
    /// lived in it so they are never reused, and tell the tab if its current
    /// view just died.
    pub fn renderer_process_closing(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        process: ProcessId,
    ) {
        let doomed: Vec<(SiteInstanceId, RenderViewId)> = self
            .swapped_out
            .iter()
            .filter(|&(_, &view)| {
                runtime.view(view).map_or(true, |view| view.process() == process)
            })
            .map(|(&instance, &view)| (instance, view))
            .collect();
        for (instance, view) in doomed {
            self.swapped_out.remove(&instance);
            runtime.release_view(view);
        }
        if runtime
            .view(self.current)
            .map_or(false, |view| view.process() == process)
        {
            delegate.render_process_gone();
        }
    }

    /// A view was destroyed outside the manager's control. Purge any
    /// reference to it rather than ever dereference a dead id.
    pub fn render_view_deleted(&mut self, view: RenderViewId) {
        self.swapped_out.retain(|_, swapped| *swapped != view);
        if self.state.pending_view() == Some(view) {
            // Historically a use-after-free: null the reference out.
            debug_assert!(false, "pending view deleted out from under the manager");
            error!("Pending view {:?} deleted while still referenced.", view);
            self.state = NavigationState::Idle;
            self.pending_web_ui = None;
        }
    }

    /// Tab teardown: destroy every view this manager references.
    pub fn shutdown(&mut self, runtime: &mut ContentRuntime) {
        if self.state.pending_view().is_some() {
            self.cancel_pending(runtime);
        }
        let swapped: Vec<RenderViewId> = self.swapped_out.drain().map(|(_, view)| view).collect();
        for view in swapped {
            runtime.release_view(view);
        }
        if runtime.view(self.current).map_or(false, |view| view.is_live()) {
            runtime.with_view_and_process(self.current, |view, process| view.close_page(process));
        }
        runtime.release_view(self.current);
        self.web_ui = None;
        self.pending_web_ui = None;
    }

    /// Decide which site instance hosts `entry` and set up the pending view
    /// and handshake if that is not the current one. Returns the view the
    /// navigation will be issued in.
    fn update_state_for_navigate(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        entry: &NavigationEntry,
    ) -> Option<RenderViewId> {
        // At most one cross-process navigation in flight: a new request
        // replaces the old one, no queueing.
        if self.state.pending_view().is_some() || self.pending_web_ui.is_some() {
            self.cancel_pending(runtime);
        } else if !matches!(self.state, NavigationState::Idle) {
            self.state = NavigationState::Idle;
        }

        let current_instance = runtime.view(self.current)?.site_instance();
        let current_url = runtime.view(self.current)?.url().cloned();
        let new_instance =
            self.site_instance_for_entry(runtime, delegate, entry, current_instance, current_url);
        self.is_view_source = entry.is_view_source;

        if new_instance == current_instance {
            // Same instance; at most a new privileged controller for it.
            self.pending_web_ui = if runtime.is_webui_url(&entry.url) {
                delegate.create_web_ui(&entry.url)
            } else {
                None
            };
            if let Some(bindings) = self.pending_web_ui.as_ref().map(|ui| ui.bindings()) {
                self.grant_bindings(runtime, self.current, bindings);
            }
            return Some(self.current);
        }

        self.pending_web_ui = if runtime.is_webui_url(&entry.url) {
            delegate.create_web_ui(&entry.url)
        } else {
            None
        };
        let hidden = delegate.is_hidden();
        let Some(pending) =
            self.create_render_view(runtime, delegate, new_instance, None, false, hidden)
        else {
            self.pending_web_ui = None;
            return None;
        };
        debug_assert!(
            runtime
                .view(pending)
                .map_or(true, |view| view.site_instance() != current_instance),
            "pending view shares the current view's site instance"
        );

        if runtime.view(self.current).map_or(false, |view| view.is_live()) {
            // Hold the navigation until the old page's beforeunload consents.
            runtime.with_view_and_process(pending, |view, process| {
                view.set_navigations_suspended(process, true)
            });
            self.state = NavigationState::WaitingForBeforeUnload { view: pending };
            runtime.with_view_and_process(self.current, |view, process| {
                view.fire_before_unload(process)
            });
            Some(pending)
        } else {
            // The old renderer is gone; nothing to unload. Commit right away.
            self.state = NavigationState::PendingCreated { view: pending };
            self.commit_pending(runtime, delegate);
            Some(self.current)
        }
    }

    fn site_instance_for_entry(
        &self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        entry: &NavigationEntry,
        current_instance: SiteInstanceId,
        current_url: Option<Url>,
    ) -> SiteInstanceId {
        // Guests are pinned to their process by the embedder.
        if delegate.is_guest() {
            return current_instance;
        }
        if let Some(instance) = entry.site_instance {
            if runtime.site_instances().get(instance).is_some() {
                return instance;
            }
            warn!("Entry names unknown {:?}; deciding normally.", instance);
        }
        // Transitions into or out of privileged UI (or forced by the
        // embedder, or flipping view-source) must not stay scriptable by
        // their predecessors: sever the browsing instance.
        let force_swap = self.has_committed &&
            (runtime.is_webui_url(&entry.url) != self.web_ui.is_some() ||
                entry.is_view_source != self.is_view_source ||
                delegate.should_swap_browsing_instances(current_url.as_ref(), &entry.url));
        if force_swap {
            return runtime.site_instances_mut().create_for_url(&entry.url);
        }
        let current_site = runtime
            .site_instances()
            .get(current_instance)
            .and_then(|instance| instance.site().cloned());
        let Some(current_site) = current_site else {
            // Unused instance: the first navigation claims it, and the site
            // is assigned on commit.
            return current_instance;
        };
        if runtime.has_wrong_process_for_url(current_instance, &entry.url) {
            return runtime
                .site_instances_mut()
                .related_instance_for_url(current_instance, &entry.url);
        }
        if current_site.matches_url(&entry.url) {
            return current_instance;
        }
        runtime
            .site_instances_mut()
            .related_instance_for_url(current_instance, &entry.url)
    }

    /// Ask the old page to swap out, unless it could not run an unload
    /// handler anyway, in which case the ACK is synthesized on the spot.
    fn swap_out_old_page(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
    ) {
        // The old page is on its way out; its dialogs must not block the
        // user or the unload handshake.
        delegate.cancel_modal_dialogs();
        let old = self.current;
        let (old_live, sudden_ok) = runtime
            .view(old)
            .map_or((false, false), |view| {
                (view.is_live(), view.sudden_termination_allowed())
            });
        if !old_live || sudden_ok {
            // No unload handler will run; synthesize the ACK on the spot.
            if let Some(view) = runtime.view_mut(old) {
                view.suppress_dialogs();
            }
            self.swapped_out(runtime, delegate, old);
            return;
        }
        runtime.with_view_and_process(old, |view, process| view.swap_out(process));
    }

    fn swap_out_old_page_if_needed(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
    ) {
        let needed = runtime.view(self.current).map_or(false, |view| {
            view.is_live() && !view.is_waiting_for_unload_ack() && !view.dialogs_suppressed()
        });
        if needed {
            self.swap_out_old_page(runtime, delegate);
        }
    }

    /// Promote the pending view (and controller) to current, demote the old
    /// view to swapped-out storage, or destroy it when nothing can script
    /// its instance any more.
    fn commit_pending(&mut self, runtime: &mut ContentRuntime, delegate: &mut dyn ManagerDelegate) {
        let pending = match mem::replace(&mut self.state, NavigationState::Idle) {
            NavigationState::PendingCreated { view } |
            NavigationState::WaitingForBeforeUnload { view } |
            NavigationState::WaitingForUnloadOrTransfer {
                view: Some(view), ..
            } => view,
            NavigationState::Idle |
            NavigationState::WaitingForUnloadOrTransfer { view: None, .. } => {
                debug_assert!(false, "commit with no pending view");
                error!("Commit requested with no pending view.");
                return;
            },
        };
        self.web_ui = self.pending_web_ui.take();

        let will_focus_location_bar = delegate.focus_location_bar_by_default();
        let old = self.current;
        let old_had_focus = runtime.view(old).map_or(false, |view| view.has_focus());
        let old_is_live = runtime.view(old).map_or(false, |view| view.is_live());
        let old_instance = runtime.view(old).map(|view| view.site_instance());

        // The fast path commits before any beforeunload handshake; make sure
        // the stashed navigation, if any, goes out.
        runtime.with_view_and_process(pending, |view, process| {
            view.set_navigations_suspended(process, false)
        });

        self.current = pending;
        runtime.set_view_active(pending);
        if let Some(instance) = runtime.view(pending).map(|view| view.site_instance()) {
            // A view borrowed from swapped-out storage leaves it at commit.
            if self.swapped_out.get(&instance) == Some(&pending) {
                self.swapped_out.remove(&instance);
            }
        }

        if let Some(bindings) = self.web_ui.as_ref().map(|ui| ui.bindings()) {
            self.grant_bindings(runtime, pending, bindings);
        }

        if will_focus_location_bar {
            delegate.set_focus_to_location_bar();
        } else if old_had_focus {
            runtime.with_view_and_process(pending, |view, process| view.focus(process));
        }
        if !delegate.is_hidden() {
            runtime.with_view_and_process(pending, |view, process| view.was_shown(process));
        }

        runtime.with_view_and_process(old, |view, process| {
            view.blur();
            view.was_hidden(process);
            if view.is_waiting_for_unload_ack() {
                // The unload ACK has not come (and may never); liveness wins.
                // A stale ACK arriving later is ignored.
                debug!("View {:?} committed over an outstanding unload ACK.", old);
                view.unload_acked();
            }
            view.before_unload_acked();
        });
        delegate.notify_swapped(Some(old), pending);
        runtime.event(ContentEvent::ViewSwapped {
            old: Some(old),
            new: pending,
        });
        self.has_committed = true;

        let Some(old_instance) = old_instance else {
            return;
        };
        runtime.set_view_swapped_out(old);
        let active_views = runtime
            .site_instances()
            .get(old_instance)
            .map_or(0, |instance| instance.active_view_count());
        if !old_is_live {
            // A dead placeholder can never be scripted; drop it.
            self.swapped_out.remove(&old_instance);
            runtime.release_view(old);
        } else if active_views == 0 {
            // Nothing can script this instance any more: house-clean every
            // view of the instance, whichever tab's bookkeeping holds it.
            self.swapped_out.remove(&old_instance);
            runtime.shutdown_views_in_instance(old_instance);
        } else if let Some(previous) = self.swapped_out.insert(old_instance, old) {
            if previous != old {
                // Replacing a previous placeholder; leaking it would pin its
                // process forever.
                runtime.release_view(previous);
            }
        }
    }

    /// Create the renderer-side view for `view` if it does not exist.
    /// Failure leaves a swapped-out host uninitialized for a later retry and
    /// is otherwise reported to the caller.
    fn init_render_view(
        &mut self,
        runtime: &mut ContentRuntime,
        delegate: &mut dyn ManagerDelegate,
        view: RenderViewId,
    ) -> bool {
        if runtime.view(view).map_or(false, |view| view.is_live()) {
            return true;
        }
        if runtime.ensure_view_process(view).is_none() {
            return false;
        }
        let Some((instance, swapped_out)) = runtime
            .view(view)
            .map(|view| (view.site_instance(), view.state() == ViewState::SwappedOut))
        else {
            return false;
        };
        if !swapped_out {
            let opener = delegate.create_opener_render_views(runtime, instance);
            if opener.is_some() {
                if let Some(view) = runtime.view_mut(view) {
                    view.set_opener(opener);
                }
            }
        }
        if !delegate.create_render_view(runtime, view) {
            return false;
        }
        runtime.mark_view_live(view);
        true
    }

    fn grant_bindings(
        &self,
        runtime: &mut ContentRuntime,
        view: RenderViewId,
        bindings: content_traits::Bindings,
    ) {
        if !runtime.view(view).map_or(false, |view| view.is_live()) {
            return;
        }
        runtime.with_view_and_process(view, |view, process| {
            view.allow_bindings(process, bindings)
        });
        let process = runtime.view(view).map(|view| view.process());
        if let Some(process) = process.and_then(|id| runtime.process_mut(id)) {
            process.grant_bindings(bindings);
        }
    }
}
