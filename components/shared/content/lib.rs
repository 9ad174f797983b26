/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! Message and data contracts shared between the render manager and its
//! collaborators: the renderer-bound view messages, the embedder-bound event
//! stream, and the navigation payload types they carry.

mod messages;
mod navigation;

pub use crate::messages::{Bindings, ContentEvent, ViewMsg};
pub use crate::navigation::{GlobalRequestId, LoadData, NavigationEntry, Referrer};
