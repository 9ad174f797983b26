/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Test fixtures: an in-process spawner that keeps every renderer message
//! port, and a recording delegate.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use base::id::{ProcessId, RenderViewId, SiteInstanceId};
use content_traits::{ContentEvent, GlobalRequestId, NavigationEntry, Referrer, ViewMsg};
use crossbeam_channel::Receiver;
use render_manager::{
    ContentRuntime, ManagerDelegate, Opts, PendingNavigationParams, ProcessSpawner,
    RenderFrameHostManager, WebUi,
};
use url::Url;

pub fn url(input: &str) -> Url {
    Url::parse(input).expect("invalid test url")
}

pub fn entry(input: &str) -> NavigationEntry {
    NavigationEntry::new(url(input))
}

type Ports = Rc<RefCell<HashMap<ProcessId, Receiver<ViewMsg>>>>;

struct TestSpawner {
    ports: Ports,
}

impl ProcessSpawner for TestSpawner {
    fn spawn(&mut self, id: ProcessId, port: Receiver<ViewMsg>) {
        self.ports.borrow_mut().insert(id, port);
    }
}

#[derive(Default)]
pub struct TestDelegate {
    /// When set, renderer-side view creation fails.
    pub refuse_create: bool,
    pub hidden: bool,
    pub created: Vec<RenderViewId>,
    pub swaps: Vec<(Option<RenderViewId>, RenderViewId)>,
    pub dialogs_cancelled: u32,
    pub closes: Vec<bool>,
    pub transfers: Vec<(Url, GlobalRequestId)>,
    pub process_gone: u32,
}

impl ManagerDelegate for TestDelegate {
    fn create_render_view(&mut self, _runtime: &mut ContentRuntime, view: RenderViewId) -> bool {
        if self.refuse_create {
            return false;
        }
        self.created.push(view);
        true
    }

    fn before_unload_fired(&mut self, proceed: bool, _proceed_time: Instant) {
        self.closes.push(proceed);
    }

    fn cancel_modal_dialogs(&mut self) {
        self.dialogs_cancelled += 1;
    }

    fn notify_swapped(&mut self, old: Option<RenderViewId>, new: RenderViewId) {
        self.swaps.push((old, new));
    }

    fn create_web_ui(&mut self, url: &Url) -> Option<WebUi> {
        (url.scheme() == "chrome").then(|| WebUi::new(url))
    }

    fn request_transfer_url(
        &mut self,
        url: Url,
        _referrer: Option<Referrer>,
        global_request_id: GlobalRequestId,
    ) {
        self.transfers.push((url, global_request_id));
    }

    fn render_process_gone(&mut self) {
        self.process_gone += 1;
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }
}

pub struct Harness {
    pub runtime: ContentRuntime,
    pub delegate: TestDelegate,
    ports: Ports,
    events: Receiver<ContentEvent>,
}

impl Harness {
    pub fn new() -> Harness {
        let ports = Ports::default();
        let spawner = TestSpawner {
            ports: ports.clone(),
        };
        let mut runtime = ContentRuntime::new(Opts::default(), Box::new(spawner));
        let (sender, events) = crossbeam_channel::unbounded();
        runtime.set_event_sender(sender);
        Harness {
            runtime,
            delegate: TestDelegate::default(),
            ports,
            events,
        }
    }

    /// A manager for a fresh tab in its own site instance.
    pub fn manager(&mut self) -> RenderFrameHostManager {
        RenderFrameHostManager::init(&mut self.runtime, &mut self.delegate, None)
            .expect("manager init failed")
    }

    /// A manager for a tab sharing an existing site instance, as a window
    /// opened by a page in that instance would.
    pub fn manager_in(&mut self, instance: SiteInstanceId) -> RenderFrameHostManager {
        RenderFrameHostManager::init(&mut self.runtime, &mut self.delegate, Some(instance))
            .expect("manager init failed")
    }

    /// Everything sent to a renderer process since the last drain.
    pub fn drain(&self, process: ProcessId) -> Vec<ViewMsg> {
        self.ports
            .borrow()
            .get(&process)
            .map(|port| port.try_iter().collect())
            .unwrap_or_default()
    }

    /// Everything the content layer announced since the last drain.
    pub fn events(&self) -> Vec<ContentEvent> {
        self.events.try_iter().collect()
    }

    pub fn process_of(&self, view: RenderViewId) -> ProcessId {
        self.runtime.view(view).expect("no such view").process()
    }

    pub fn request(&self, view: RenderViewId) -> GlobalRequestId {
        GlobalRequestId {
            process: self.process_of(view),
            request: 1,
        }
    }

    /// Run a navigation through to commit, acknowledging the handshake the
    /// way cooperating renderers would.
    pub fn commit(&mut self, manager: &mut RenderFrameHostManager, input: &str) -> RenderViewId {
        let entry = entry(input);
        let dest = manager
            .navigate(&mut self.runtime, &mut self.delegate, &entry)
            .expect("navigate failed");
        if manager.pending_render_view() == Some(dest) {
            let old = manager.current();
            manager.should_close_page(
                &mut self.runtime,
                &mut self.delegate,
                true,
                true,
                Instant::now(),
            );
            let request = self.request(dest);
            manager.on_cross_site_response(
                &mut self.runtime,
                &mut self.delegate,
                dest,
                PendingNavigationParams::new(request),
            );
            manager.swapped_out(&mut self.runtime, &mut self.delegate, old);
        }
        manager.did_navigate(&mut self.runtime, &mut self.delegate, dest);
        manager.current()
    }
}
