/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! This module contains the `RenderProcessHost` type, the browser's handle to
//! one renderer process. The host owns the browser end of the process's view
//! message channel; the renderer end is handed to an injected
//! [`ProcessSpawner`] when the process is created.

use std::hash::Hash;

use base::id::ProcessId;
use content_traits::{Bindings, ViewMsg};
use crossbeam_channel::{Receiver, Sender};
use log::warn;
use rustc_hash::FxHashMap;

/// Launches renderer processes. In production this forks a sandboxed child
/// and bridges the channel to it; in tests it just records the receiver.
pub trait ProcessSpawner {
    fn spawn(&mut self, id: ProcessId, port: Receiver<ViewMsg>);
}

pub struct RenderProcessHost {
    id: ProcessId,

    sender: Sender<ViewMsg>,

    is_live: bool,

    /// Views that have been created for this process but whose renderer-side
    /// counterpart does not exist yet. A nonzero count keeps the process
    /// alive even with no live views.
    pending_view_count: u32,

    /// Privileged bindings ever granted to this process. Granting is
    /// one-way; a privileged process stays privileged until it exits.
    bindings: Bindings,
}

impl PartialEq for RenderProcessHost {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RenderProcessHost {}

impl Hash for RenderProcessHost {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl RenderProcessHost {
    fn new(id: ProcessId, sender: Sender<ViewMsg>) -> RenderProcessHost {
        RenderProcessHost {
            id,
            sender,
            is_live: true,
            pending_view_count: 0,
            bindings: Bindings::empty(),
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    /// Send a message to the renderer process. Failure means the process is
    /// gone; the caller finds out through the process-gone path, not here.
    pub fn send(&self, msg: ViewMsg) {
        if let Err(e) = self.sender.send(msg) {
            warn!("Sending to renderer process {:?} failed ({}).", self.id, e);
        }
    }

    pub fn bindings(&self) -> Bindings {
        self.bindings
    }

    pub fn grant_bindings(&mut self, bindings: Bindings) {
        self.bindings |= bindings;
    }

    pub fn pending_view_count(&self) -> u32 {
        self.pending_view_count
    }

    pub(crate) fn add_pending_view(&mut self) {
        self.pending_view_count += 1;
    }

    pub(crate) fn remove_pending_view(&mut self) {
        if self.pending_view_count == 0 {
            warn!("Pending view count for {:?} underflowed.", self.id);
            return;
        }
        self.pending_view_count -= 1;
    }

    pub(crate) fn mark_dead(&mut self) {
        self.is_live = false;
    }

    pub(crate) fn exit(&self) {
        self.send(ViewMsg::Exit);
    }
}

/// All renderer process hosts, keyed by process id.
#[derive(Default)]
pub struct ProcessRegistry {
    processes: FxHashMap<ProcessId, RenderProcessHost>,
}

impl ProcessRegistry {
    pub fn new() -> ProcessRegistry {
        ProcessRegistry::default()
    }

    pub fn get(&self, id: ProcessId) -> Option<&RenderProcessHost> {
        self.processes.get(&id)
    }

    pub fn get_mut(&mut self, id: ProcessId) -> Option<&mut RenderProcessHost> {
        self.processes.get_mut(&id)
    }

    /// Create a renderer process, handing its message port to the spawner.
    pub fn spawn(&mut self, spawner: &mut dyn ProcessSpawner) -> ProcessId {
        let (sender, port) = crossbeam_channel::unbounded();
        let id = ProcessId::next();
        spawner.spawn(id, port);
        self.processes.insert(id, RenderProcessHost::new(id, sender));
        id
    }

    pub fn remove(&mut self, id: ProcessId) -> Option<RenderProcessHost> {
        self.processes.remove(&id)
    }

    pub fn is_live(&self, id: ProcessId) -> bool {
        self.processes.get(&id).map_or(false, |p| p.is_live())
    }
}
