/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The shared registries every manager in the browser process operates on:
//! all site instances, all render view hosts, and all renderer processes,
//! keyed by opaque ids and passed to the managers by reference. Managers own
//! only ids; the structures here own the state.

use base::id::{ProcessId, RenderViewId, SiteInstanceId};
use content_traits::ContentEvent;
use crossbeam_channel::Sender;
use log::warn;
use rustc_hash::FxHashMap;
use url::Url;

use crate::process_host::{ProcessRegistry, ProcessSpawner, RenderProcessHost};
use crate::render_view_host::{RenderViewHost, ViewState};
use crate::site_instance::{SiteInstanceRegistry, SiteUrl};

/// Browser-process options the registries consult.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Reuse one renderer process for all instances of a site, even across
    /// browsing instances. Always on for the privileged scheme.
    pub process_per_site: bool,

    /// The scheme of privileged browser-internal pages.
    pub webui_scheme: String,
}

impl Default for Opts {
    fn default() -> Opts {
        Opts {
            process_per_site: false,
            webui_scheme: "chrome".to_owned(),
        }
    }
}

pub struct ContentRuntime {
    opts: Opts,

    site_instances: SiteInstanceRegistry,

    views: FxHashMap<RenderViewId, RenderViewHost>,

    processes: ProcessRegistry,

    /// Sites subject to process-per-site reuse, mapped to their process.
    site_process_map: FxHashMap<SiteUrl, ProcessId>,

    spawner: Box<dyn ProcessSpawner>,

    events: Option<Sender<ContentEvent>>,
}

impl ContentRuntime {
    pub fn new(opts: Opts, spawner: Box<dyn ProcessSpawner>) -> ContentRuntime {
        ContentRuntime {
            opts,
            site_instances: SiteInstanceRegistry::new(),
            views: FxHashMap::default(),
            processes: ProcessRegistry::new(),
            site_process_map: FxHashMap::default(),
            spawner,
            events: None,
        }
    }

    /// Subscribe the embedder to content events.
    pub fn set_event_sender(&mut self, events: Sender<ContentEvent>) {
        self.events = Some(events);
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    pub fn site_instances(&self) -> &SiteInstanceRegistry {
        &self.site_instances
    }

    pub fn site_instances_mut(&mut self) -> &mut SiteInstanceRegistry {
        &mut self.site_instances
    }

    pub fn view(&self, id: RenderViewId) -> Option<&RenderViewHost> {
        self.views.get(&id)
    }

    pub fn view_mut(&mut self, id: RenderViewId) -> Option<&mut RenderViewHost> {
        self.views.get_mut(&id)
    }

    pub fn process(&self, id: ProcessId) -> Option<&RenderProcessHost> {
        self.processes.get(id)
    }

    pub fn process_mut(&mut self, id: ProcessId) -> Option<&mut RenderProcessHost> {
        self.processes.get_mut(id)
    }

    pub fn process_for_view(&self, id: RenderViewId) -> Option<&RenderProcessHost> {
        self.processes.get(self.views.get(&id)?.process())
    }

    pub fn is_webui_url(&self, url: &Url) -> bool {
        url.scheme() == self.opts.webui_scheme
    }

    /// Run `f` with a view and its process host. Returns `None` when either
    /// has already been torn down.
    pub fn with_view_and_process<R>(
        &mut self,
        id: RenderViewId,
        f: impl FnOnce(&mut RenderViewHost, &RenderProcessHost) -> R,
    ) -> Option<R> {
        let view = self.views.get_mut(&id)?;
        let process = self.processes.get(view.process())?;
        Some(f(view, process))
    }

    /// The process for a site instance, reusing the instance's own process if
    /// it is still live, then a process-per-site process for the instance's
    /// site, and only then spawning a fresh one.
    pub fn get_or_create_process(&mut self, instance: SiteInstanceId) -> Option<ProcessId> {
        let site = {
            let instance = self.site_instances.get(instance)?;
            if let Some(process) = instance.process() {
                if self.processes.is_live(process) {
                    return Some(process);
                }
            }
            instance.site().cloned()
        };
        if let Some(site) = &site {
            if self.site_uses_process_per_site(site) {
                if let Some(&process) = self.site_process_map.get(site) {
                    if self.processes.is_live(process) {
                        self.site_instances.get_mut(instance)?.set_process(process);
                        return Some(process);
                    }
                }
            }
        }
        let process = self.processes.spawn(&mut *self.spawner);
        if let Some(site) = site {
            if self.site_uses_process_per_site(&site) {
                self.site_process_map.insert(site, process);
            }
        }
        self.site_instances.get_mut(instance)?.set_process(process);
        self.event(ContentEvent::ProcessSpawned(process));
        Some(process)
    }

    fn site_uses_process_per_site(&self, site: &SiteUrl) -> bool {
        self.opts.process_per_site || site.scheme() == self.opts.webui_scheme
    }

    /// Register a new render view host in `instance`. The renderer-side view
    /// does not exist yet; the caller initializes it separately.
    pub fn create_view(
        &mut self,
        instance: SiteInstanceId,
        hidden: bool,
        swapped_out: bool,
    ) -> Option<RenderViewId> {
        let process = self.get_or_create_process(instance)?;
        let id = RenderViewId::next();
        let view = RenderViewHost::new(id, instance, process, hidden, swapped_out);
        if !swapped_out {
            self.site_instances.get_mut(instance)?.view_attached();
            if let Some(process) = self.processes.get_mut(process) {
                process.add_pending_view();
            }
        }
        self.views.insert(id, view);
        self.event(ContentEvent::ViewCreated(id));
        Some(id)
    }

    /// Point a view at a live process for its site instance, replacing a
    /// dead one if necessary. Returns the process id.
    pub fn ensure_view_process(&mut self, id: RenderViewId) -> Option<ProcessId> {
        let instance = self.views.get(&id)?.site_instance();
        let old = self.views.get(&id)?.process();
        let process = self.get_or_create_process(instance)?;
        self.views.get_mut(&id)?.set_process(process);
        if old != process {
            // Re-pointing may have orphaned the old host; release_view will
            // never name it again.
            self.sweep_process(old);
        }
        Some(process)
    }

    /// The renderer-side view now exists.
    pub fn mark_view_live(&mut self, id: RenderViewId) {
        let Some(view) = self.views.get_mut(&id) else {
            warn!("Live mark for unknown view {:?}.", id);
            return;
        };
        view.set_live();
        if view.holds_pending_process_ref() {
            view.clear_pending_process_ref();
            let process = view.process();
            if let Some(process) = self.processes.get_mut(process) {
                process.remove_pending_view();
            }
        }
    }

    /// An active or pending view became a swapped-out placeholder.
    pub fn set_view_swapped_out(&mut self, id: RenderViewId) {
        let Some(view) = self.views.get_mut(&id) else {
            warn!("Swap-out for unknown view {:?}.", id);
            return;
        };
        if view.state() == ViewState::SwappedOut {
            return;
        }
        view.set_state(ViewState::SwappedOut);
        let instance = view.site_instance();
        if let Some(instance) = self.site_instances.get_mut(instance) {
            instance.view_detached();
        }
    }

    /// A pending or swapped-out view became the committed, visible one.
    pub fn set_view_active(&mut self, id: RenderViewId) {
        let Some(view) = self.views.get_mut(&id) else {
            warn!("Activation of unknown view {:?}.", id);
            return;
        };
        let was_swapped_out = view.state() == ViewState::SwappedOut;
        view.set_state(ViewState::Active);
        if was_swapped_out {
            let instance = view.site_instance();
            if let Some(instance) = self.site_instances.get_mut(instance) {
                instance.view_attached();
            }
        }
    }

    /// Destroy a view, releasing its reference counts and, when this was the
    /// last view of its process, the process itself.
    pub fn release_view(&mut self, id: RenderViewId) {
        let Some(view) = self.views.remove(&id) else {
            warn!("View {:?} released after closure.", id);
            return;
        };
        if view.state() != ViewState::SwappedOut {
            if let Some(instance) = self.site_instances.get_mut(view.site_instance()) {
                instance.view_detached();
            }
        }
        let process = view.process();
        if view.holds_pending_process_ref() {
            if let Some(process) = self.processes.get_mut(process) {
                process.remove_pending_view();
            }
        }
        self.sweep_process(process);
        self.event(ContentEvent::ViewDestroyed(id));
    }

    /// Destroy every view of a site instance, across all managers. Run when
    /// the instance's active view count reaches zero: the swapped-out
    /// placeholders that remain can never be scripted again.
    pub fn shutdown_views_in_instance(&mut self, instance: SiteInstanceId) {
        let doomed: Vec<RenderViewId> = self
            .views
            .values()
            .filter(|view| view.site_instance() == instance)
            .map(|view| view.id())
            .collect();
        for id in doomed {
            self.release_view(id);
        }
    }

    /// A renderer process died. Marks the process and its views dead; the
    /// managers purge their swapped-out bookkeeping via
    /// `renderer_process_closing`.
    pub fn mark_process_gone(&mut self, id: ProcessId) {
        if let Some(process) = self.processes.get_mut(id) {
            process.mark_dead();
        } else {
            warn!("Process {:?} reported gone after closure.", id);
        }
        for view in self.views.values_mut() {
            if view.process() == id {
                view.renderer_gone();
            }
        }
        self.event(ContentEvent::ProcessGone(id));
    }

    /// Whether `instance`'s process must not host `url`: privileged
    /// processes never host ordinary web content and vice versa.
    pub fn has_wrong_process_for_url(&self, instance: SiteInstanceId, url: &Url) -> bool {
        let Some(instance) = self.site_instances.get(instance) else {
            return false;
        };
        let Some(process) = instance.process().and_then(|id| self.processes.get(id)) else {
            return false;
        };
        if !process.is_live() {
            return false;
        }
        process.bindings().contains(content_traits::Bindings::WEB_UI) != self.is_webui_url(url)
    }

    fn sweep_process(&mut self, id: ProcessId) {
        let in_use = self.views.values().any(|view| view.process() == id);
        if in_use {
            return;
        }
        let has_pending = self
            .processes
            .get(id)
            .map_or(false, |process| process.pending_view_count() > 0);
        if has_pending {
            return;
        }
        let Some(process) = self.processes.remove(id) else {
            return;
        };
        let clean_exit = process.is_live();
        if clean_exit {
            process.exit();
        }
        self.site_process_map.retain(|_, process| *process != id);
        self.site_instances.clear_process_references(id);
        if clean_exit {
            // A crashed process already announced itself in mark_process_gone.
            self.event(ContentEvent::ProcessGone(id));
        }
    }

    pub(crate) fn event(&self, event: ContentEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}
