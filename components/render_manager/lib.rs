/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Cross-process navigation for a multi-process browser. Each tab owns a
//! [`RenderFrameHostManager`] that decides, navigation by navigation, which
//! renderer process hosts the page, swaps render views between processes,
//! and runs the beforeunload/unload handshake with the departing page. The
//! managers share one [`ContentRuntime`] holding every site instance, render
//! view host, and renderer process in the browser.

#![deny(unsafe_code)]

mod manager;
mod process_host;
mod render_view_host;
mod runtime;
mod site_instance;
mod web_ui;

pub use crate::manager::{ManagerDelegate, PendingNavigationParams, RenderFrameHostManager};
pub use crate::process_host::{ProcessRegistry, ProcessSpawner, RenderProcessHost};
pub use crate::render_view_host::{RenderViewHost, ViewState};
pub use crate::runtime::{ContentRuntime, Opts};
pub use crate::site_instance::{SiteInstance, SiteInstanceRegistry, SiteUrl};
pub use crate::web_ui::WebUi;
