/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use base::id::{ProcessId, RenderViewId};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::navigation::{GlobalRequestId, LoadData};

bitflags! {
    /// Privileged capabilities granted to a renderer process. A process that
    /// has ever been granted `WEB_UI` must never host ordinary web content,
    /// and vice versa.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    #[derive(Deserialize, Serialize)]
    pub struct Bindings: u32 {
        const WEB_UI = 1 << 0;
    }
}

/// Messages from the browser process to a render view. Each renderer process
/// receives one stream of these; the view id routes the message within the
/// process.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ViewMsg {
    /// Load a document in the view.
    Navigate(RenderViewId, LoadData),
    /// Run the `beforeunload` handler and acknowledge with the result.
    ShouldClose(RenderViewId),
    /// Run the unload handler and become a swapped-out placeholder,
    /// acknowledging when done.
    SwapOut(RenderViewId),
    /// Stop any in-flight load in the view.
    Stop(RenderViewId),
    /// Run unload handlers in preparation for closing the page for good.
    ClosePage(RenderViewId),
    /// The view is no longer visible on screen.
    WasHidden(RenderViewId),
    /// The view became visible on screen.
    WasShown(RenderViewId),
    /// Move input focus to the view.
    Focus(RenderViewId),
    /// Grant the view (and thereby its process) privileged bindings.
    AllowBindings(RenderViewId, Bindings),
    /// Resume a network response that was deferred until the previous
    /// document finished unloading.
    ResumeDeferredNavigation(RenderViewId, GlobalRequestId),
    /// Shut the renderer process down.
    Exit,
}

/// Notifications from the content layer to the embedder. Purely
/// informational; the embedder must not call back into the manager while
/// handling one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContentEvent {
    ViewCreated(RenderViewId),
    ViewDestroyed(RenderViewId),
    /// A pending view was committed in place of the old current view.
    ViewSwapped {
        old: Option<RenderViewId>,
        new: RenderViewId,
    },
    ProcessSpawned(ProcessId),
    ProcessGone(ProcessId),
}
