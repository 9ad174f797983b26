/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The site-instance model: which documents may script each other, and which
//! renderer process a document is affine to.
//!
//! A `SiteInstance` groups the documents that may script each other
//! *directly*; it is also the unit of process affinity. A `BrowsingInstance`
//! groups the site instances whose windows may hold mutual (possibly
//! swapped-out) references, e.g. via `window.opener`. Both live in a
//! dependency-injected registry keyed by opaque ids; nothing in this module
//! holds a pointer to anything else.

use std::fmt;

use base::id::{BrowsingInstanceId, ProcessId, SiteInstanceId};
use log::warn;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use url::Url;

/// The site a URL belongs to: its scheme plus its host.
///
/// Trimming the host to its registry-controlled domain would need a
/// public-suffix table and changes no property of the state machine, so the
/// whole host is used.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct SiteUrl {
    scheme: String,
    host: String,
}

impl SiteUrl {
    /// Derive the site for a URL, or `None` for URLs that should not be
    /// assigned a site (`about:blank`, `data:`, `javascript:`): documents at
    /// such URLs inherit whatever instance they are loaded into.
    pub fn for_url(url: &Url) -> Option<SiteUrl> {
        match url.scheme() {
            "about" | "data" | "javascript" => return None,
            _ => {},
        }
        Some(SiteUrl {
            scheme: url.scheme().to_owned(),
            host: url.host_str().unwrap_or_default().to_owned(),
        })
    }

    /// Whether two URLs belong to the same site. A URL with no site of its
    /// own is considered same-site with anything, so that e.g. `about:blank`
    /// never forces a process swap.
    pub fn same_web_site(a: &Url, b: &Url) -> bool {
        match (SiteUrl::for_url(a), SiteUrl::for_url(b)) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// Whether `url` belongs to this site.
    pub fn matches_url(&self, url: &Url) -> bool {
        match SiteUrl::for_url(url) {
            Some(site) => *self == site,
            None => true,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for SiteUrl {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}://{}", self.scheme, self.host)
    }
}

/// One site instance. The site starts out unset and is assigned on the first
/// real commit; an instance with no site can be reused for any URL.
#[derive(Debug)]
pub struct SiteInstance {
    id: SiteInstanceId,

    browsing_instance: BrowsingInstanceId,

    site: Option<SiteUrl>,

    /// The renderer process currently hosting this instance's documents.
    process: Option<ProcessId>,

    /// The number of render view hosts in this instance that are not swapped
    /// out. When this reaches zero nothing can script the instance's
    /// documents any more and all of its views can be torn down.
    active_view_count: u32,
}

impl SiteInstance {
    fn new(id: SiteInstanceId, browsing_instance: BrowsingInstanceId) -> SiteInstance {
        SiteInstance {
            id,
            browsing_instance,
            site: None,
            process: None,
            active_view_count: 0,
        }
    }

    pub fn id(&self) -> SiteInstanceId {
        self.id
    }

    pub fn browsing_instance(&self) -> BrowsingInstanceId {
        self.browsing_instance
    }

    pub fn site(&self) -> Option<&SiteUrl> {
        self.site.as_ref()
    }

    pub fn has_site(&self) -> bool {
        self.site.is_some()
    }

    pub fn process(&self) -> Option<ProcessId> {
        self.process
    }

    pub(crate) fn set_process(&mut self, process: ProcessId) {
        self.process = Some(process);
    }

    pub(crate) fn clear_process(&mut self) {
        self.process = None;
    }

    pub fn active_view_count(&self) -> u32 {
        self.active_view_count
    }

    pub(crate) fn view_attached(&mut self) {
        self.active_view_count += 1;
    }

    pub(crate) fn view_detached(&mut self) {
        if self.active_view_count == 0 {
            warn!("Active view count for {:?} underflowed.", self.id);
            return;
        }
        self.active_view_count -= 1;
    }
}

#[derive(Debug)]
struct BrowsingInstance {
    /// The first site instance registered for each site in this browsing
    /// instance, used for related-instance lookups.
    site_to_instance: FxHashMap<SiteUrl, SiteInstanceId>,
}

/// The registry of all site instances and browsing instances in the browser
/// process.
#[derive(Debug, Default)]
pub struct SiteInstanceRegistry {
    instances: FxHashMap<SiteInstanceId, SiteInstance>,
    browsing_instances: FxHashMap<BrowsingInstanceId, BrowsingInstance>,
}

impl SiteInstanceRegistry {
    pub fn new() -> SiteInstanceRegistry {
        SiteInstanceRegistry::default()
    }

    pub fn get(&self, id: SiteInstanceId) -> Option<&SiteInstance> {
        self.instances.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: SiteInstanceId) -> Option<&mut SiteInstance> {
        self.instances.get_mut(&id)
    }

    /// Create a site instance with no site yet, in a fresh browsing instance.
    /// The first tab of a window starts here.
    pub fn create(&mut self) -> SiteInstanceId {
        let browsing_instance = self.create_browsing_instance();
        self.create_in(browsing_instance, None)
    }

    /// Create a site instance for `url` in a brand-new browsing instance,
    /// severing all script connections to existing windows. Used when a
    /// navigation must not be scriptable by its predecessor, e.g. when
    /// entering or leaving privileged UI.
    pub fn create_for_url(&mut self, url: &Url) -> SiteInstanceId {
        let browsing_instance = self.create_browsing_instance();
        self.create_in(browsing_instance, SiteUrl::for_url(url))
    }

    /// Find or create the site instance for `url` in the same browsing
    /// instance as `from`. Documents in the returned instance may script the
    /// `from` windows via swapped-out proxies.
    pub fn related_instance_for_url(&mut self, from: SiteInstanceId, url: &Url) -> SiteInstanceId {
        let browsing_instance = match self.instances.get(&from) {
            Some(instance) => instance.browsing_instance(),
            None => {
                warn!("Related-instance lookup from unknown {:?}.", from);
                self.create_browsing_instance()
            },
        };
        let site = SiteUrl::for_url(url);
        if let Some(site) = &site {
            let existing = self
                .browsing_instances
                .get(&browsing_instance)
                .and_then(|group| group.site_to_instance.get(site));
            if let Some(&existing) = existing {
                if self.instances.contains_key(&existing) {
                    return existing;
                }
            }
        }
        self.create_in(browsing_instance, site)
    }

    /// Record that `instance` committed a document at `url`, assigning its
    /// site if it did not have one yet. Later navigations to the same site in
    /// the same browsing instance will reuse the instance.
    pub fn set_site_from_url(&mut self, id: SiteInstanceId, url: &Url) {
        let Some(site) = SiteUrl::for_url(url) else {
            return;
        };
        let Some(instance) = self.instances.get_mut(&id) else {
            warn!("Site commit for unknown {:?}.", id);
            return;
        };
        if instance.has_site() {
            return;
        }
        instance.site = Some(site.clone());
        let browsing_instance = instance.browsing_instance();
        self.register_site(browsing_instance, site, id);
    }

    /// Drop every reference to a process that no longer exists.
    pub(crate) fn clear_process_references(&mut self, process: ProcessId) {
        for instance in self.instances.values_mut() {
            if instance.process() == Some(process) {
                instance.clear_process();
            }
        }
    }

    fn create_browsing_instance(&mut self) -> BrowsingInstanceId {
        let id = BrowsingInstanceId::next();
        self.browsing_instances.insert(
            id,
            BrowsingInstance {
                site_to_instance: FxHashMap::default(),
            },
        );
        id
    }

    fn create_in(
        &mut self,
        browsing_instance: BrowsingInstanceId,
        site: Option<SiteUrl>,
    ) -> SiteInstanceId {
        let id = SiteInstanceId::next();
        let mut instance = SiteInstance::new(id, browsing_instance);
        instance.site = site.clone();
        self.instances.insert(id, instance);
        if let Some(site) = site {
            self.register_site(browsing_instance, site, id);
        }
        id
    }

    fn register_site(
        &mut self,
        browsing_instance: BrowsingInstanceId,
        site: SiteUrl,
        id: SiteInstanceId,
    ) {
        let Some(group) = self.browsing_instances.get_mut(&browsing_instance) else {
            warn!("Site registered in unknown {:?}.", browsing_instance);
            return;
        };
        // First registration wins; later instances for the same site in the
        // same browsing instance are not related-instance candidates.
        group.site_to_instance.entry(site).or_insert(id);
    }
}
