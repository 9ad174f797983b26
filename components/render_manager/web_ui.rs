/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Privileged browser-internal pages. A `WebUi` is the controller for one
//! such page; holding one is what entitles a view to elevated bindings, so
//! the manager keeps the committed and the about-to-commit controller
//! strictly separate.

use content_traits::Bindings;
use url::Url;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WebUi {
    host: String,
    bindings: Bindings,
}

impl WebUi {
    pub fn new(url: &Url) -> WebUi {
        WebUi {
            host: url.host_str().unwrap_or_default().to_owned(),
            bindings: Bindings::WEB_UI,
        }
    }

    /// The privileged host this controller serves, e.g. `settings`.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn bindings(&self) -> Bindings {
        self.bindings
    }
}
