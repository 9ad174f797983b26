/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-view browser-side state: one `RenderViewHost` for every render view
//! that exists in some renderer process, whether it is the visible view of a
//! tab, a pending view for an in-flight cross-process navigation, or a
//! swapped-out placeholder kept alive for cross-process scripting.

use base::id::{ProcessId, RenderViewId, SiteInstanceId};
use content_traits::{Bindings, LoadData, ViewMsg};
use log::debug;
use url::Url;

use crate::process_host::RenderProcessHost;

/// Where a view currently stands in the swap lifecycle. Exactly one view per
/// manager is `Active`; a view is `Pending` from creation until its first
/// commit; `SwappedOut` views are hidden, non-interactive placeholders.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewState {
    Pending,
    Active,
    SwappedOut,
}

pub struct RenderViewHost {
    id: RenderViewId,

    site_instance: SiteInstanceId,

    process: ProcessId,

    state: ViewState,

    /// Whether the renderer-side view exists. False until the view is
    /// initialized, and again after its process dies.
    is_live: bool,

    /// Whether this view still holds a pending-view reference on its
    /// process, taken at creation and released once the view is live.
    holds_pending_process_ref: bool,

    /// While true, outgoing `Navigate` messages are stashed rather than
    /// sent. Used to hold a pending view's navigation back until the old
    /// view's `beforeunload` handler has run.
    navigations_suspended: bool,

    suspended_navigation: Option<LoadData>,

    /// The most recently requested URL for this view. Like the most recently
    /// loaded URL of a pipeline, this can lag what the renderer shows.
    url: Option<Url>,

    is_waiting_for_beforeunload_ack: bool,

    is_waiting_for_unload_ack: bool,

    /// True when the renderer has no unload-ish handlers registered, so the
    /// process may be terminated without running them.
    sudden_termination_allowed: bool,

    /// JavaScript dialogs are dropped once the view has started swapping
    /// out; a disappearing page must not block the user.
    dialogs_suppressed: bool,

    has_focus: bool,

    hidden: bool,

    /// The view acting as `window.opener` for this one, when the opener
    /// lives in the same site instance.
    opener: Option<RenderViewId>,

    bindings: Bindings,
}

impl RenderViewHost {
    pub(crate) fn new(
        id: RenderViewId,
        site_instance: SiteInstanceId,
        process: ProcessId,
        hidden: bool,
        swapped_out: bool,
    ) -> RenderViewHost {
        RenderViewHost {
            id,
            site_instance,
            process,
            state: if swapped_out {
                ViewState::SwappedOut
            } else {
                ViewState::Pending
            },
            is_live: false,
            holds_pending_process_ref: !swapped_out,
            navigations_suspended: false,
            suspended_navigation: None,
            url: None,
            is_waiting_for_beforeunload_ack: false,
            is_waiting_for_unload_ack: false,
            sudden_termination_allowed: false,
            dialogs_suppressed: false,
            has_focus: false,
            hidden,
            opener: None,
            bindings: Bindings::empty(),
        }
    }

    pub fn id(&self) -> RenderViewId {
        self.id
    }

    pub fn site_instance(&self) -> SiteInstanceId {
        self.site_instance
    }

    pub fn process(&self) -> ProcessId {
        self.process
    }

    pub(crate) fn set_process(&mut self, process: ProcessId) {
        self.process = process;
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ViewState) {
        self.state = state;
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub(crate) fn set_live(&mut self) {
        self.is_live = true;
    }

    pub(crate) fn renderer_gone(&mut self) {
        self.is_live = false;
        self.is_waiting_for_beforeunload_ack = false;
        self.is_waiting_for_unload_ack = false;
        self.dialogs_suppressed = false;
        self.suspended_navigation = None;
    }

    pub(crate) fn holds_pending_process_ref(&self) -> bool {
        self.holds_pending_process_ref
    }

    pub(crate) fn clear_pending_process_ref(&mut self) {
        self.holds_pending_process_ref = false;
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn are_navigations_suspended(&self) -> bool {
        self.navigations_suspended
    }

    /// Suspend or resume navigation messages. Resuming releases the stashed
    /// navigation, if any.
    pub(crate) fn set_navigations_suspended(
        &mut self,
        process: &RenderProcessHost,
        suspend: bool,
    ) {
        self.navigations_suspended = suspend;
        if suspend {
            return;
        }
        if let Some(load) = self.suspended_navigation.take() {
            debug!("View {:?} releasing suspended navigation.", self.id);
            process.send(ViewMsg::Navigate(self.id, load));
        }
    }

    pub(crate) fn navigate(&mut self, process: &RenderProcessHost, load: LoadData) {
        self.url = Some(load.url.clone());
        if self.navigations_suspended {
            debug!("View {:?} stashing navigation until beforeunload.", self.id);
            self.suspended_navigation = Some(load);
        } else {
            process.send(ViewMsg::Navigate(self.id, load));
        }
    }

    pub fn is_waiting_for_beforeunload_ack(&self) -> bool {
        self.is_waiting_for_beforeunload_ack
    }

    pub fn is_waiting_for_unload_ack(&self) -> bool {
        self.is_waiting_for_unload_ack
    }

    pub(crate) fn fire_before_unload(&mut self, process: &RenderProcessHost) {
        self.is_waiting_for_beforeunload_ack = true;
        process.send(ViewMsg::ShouldClose(self.id));
    }

    pub(crate) fn before_unload_acked(&mut self) {
        self.is_waiting_for_beforeunload_ack = false;
    }

    pub(crate) fn swap_out(&mut self, process: &RenderProcessHost) {
        self.dialogs_suppressed = true;
        self.is_waiting_for_unload_ack = true;
        process.send(ViewMsg::SwapOut(self.id));
    }

    pub(crate) fn suppress_dialogs(&mut self) {
        self.dialogs_suppressed = true;
    }

    /// The page is closing for good: run unload handlers without any swap.
    pub(crate) fn close_page(&mut self, process: &RenderProcessHost) {
        self.dialogs_suppressed = true;
        process.send(ViewMsg::ClosePage(self.id));
    }

    pub(crate) fn unload_acked(&mut self) {
        self.is_waiting_for_unload_ack = false;
    }

    pub fn sudden_termination_allowed(&self) -> bool {
        self.sudden_termination_allowed
    }

    /// The renderer reports this as unload-ish handlers come and go.
    pub fn set_sudden_termination_allowed(&mut self, allowed: bool) {
        self.sudden_termination_allowed = allowed;
    }

    pub fn dialogs_suppressed(&self) -> bool {
        self.dialogs_suppressed
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn focus(&mut self, process: &RenderProcessHost) {
        self.has_focus = true;
        process.send(ViewMsg::Focus(self.id));
    }

    pub fn blur(&mut self) {
        self.has_focus = false;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub(crate) fn was_hidden(&mut self, process: &RenderProcessHost) {
        if self.hidden {
            return;
        }
        self.hidden = true;
        process.send(ViewMsg::WasHidden(self.id));
    }

    pub(crate) fn was_shown(&mut self, process: &RenderProcessHost) {
        if !self.hidden {
            return;
        }
        self.hidden = false;
        process.send(ViewMsg::WasShown(self.id));
    }

    pub fn opener(&self) -> Option<RenderViewId> {
        self.opener
    }

    pub(crate) fn set_opener(&mut self, opener: Option<RenderViewId>) {
        self.opener = opener;
    }

    pub fn bindings(&self) -> Bindings {
        self.bindings
    }

    pub(crate) fn allow_bindings(&mut self, process: &RenderProcessHost, bindings: Bindings) {
        self.bindings |= bindings;
        process.send(ViewMsg::AllowBindings(self.id, bindings));
    }

    pub(crate) fn stop(&self, process: &RenderProcessHost) {
        process.send(ViewMsg::Stop(self.id));
    }

    pub(crate) fn resume_deferred_navigation(
        &self,
        process: &RenderProcessHost,
        request: content_traits::GlobalRequestId,
    ) {
        process.send(ViewMsg::ResumeDeferredNavigation(self.id, request));
    }
}
