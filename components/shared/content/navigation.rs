/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use base::id::{NavigationEntryId, ProcessId, SiteInstanceId};
use serde::{Deserialize, Serialize};
use url::Url;

/// Identifies one network request across all renderer processes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct GlobalRequestId {
    /// The process the request was issued on behalf of.
    pub process: ProcessId,
    /// The request id within that process.
    pub request: u32,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Referrer {
    pub url: Url,
}

/// The payload of a `Navigate` message: everything the renderer needs to
/// load a document.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LoadData {
    pub url: Url,
    pub referrer: Option<Referrer>,
}

impl LoadData {
    pub fn new(url: Url, referrer: Option<Referrer>) -> LoadData {
        LoadData { url, referrer }
    }
}

/// One session history entry, as handed to the manager by the navigation
/// controller. Only the fields the site-instance decision consumes are
/// carried here.
#[derive(Clone, Debug)]
pub struct NavigationEntry {
    pub id: NavigationEntryId,

    pub url: Url,

    pub referrer: Option<Referrer>,

    /// An explicit site instance for the entry, e.g. restored from history or
    /// set by an interstitial. Overrides the site-instance decision.
    pub site_instance: Option<SiteInstanceId>,

    /// Whether the entry displays page source rather than the page.
    pub is_view_source: bool,

    /// For transfer navigations: the request that already carries the
    /// response, handed over from the process the response arrived in.
    pub transferred_request_id: Option<GlobalRequestId>,
}

impl NavigationEntry {
    pub fn new(url: Url) -> NavigationEntry {
        NavigationEntry {
            id: NavigationEntryId::next(),
            url,
            referrer: None,
            site_instance: None,
            is_view_source: false,
            transferred_request_id: None,
        }
    }

    pub fn with_site_instance(mut self, site_instance: SiteInstanceId) -> NavigationEntry {
        self.site_instance = Some(site_instance);
        self
    }

    pub fn load_data(&self) -> LoadData {
        LoadData::new(self.url.clone(), self.referrer.clone())
    }
}
