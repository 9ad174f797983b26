/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Process-wide identifiers for the units the navigation manager juggles.
//!
//! Every id is backed by a `NonZeroU32` drawn from a monotonic counter, so
//! `Option<Id>` is the same size as `Id` and ids are never reused within the
//! lifetime of the browser process. Cross-references between registries are
//! expressed with these ids rather than with shared pointers.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! counted_id {
    ($(#[$outer:meta])* $name:ident) => {
        $(#[$outer])*
        #[derive(
            Clone, Copy, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
        )]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Allocate the next id.
            pub fn next() -> $name {
                static COUNTER: AtomicU32 = AtomicU32::new(1);
                let value = COUNTER.fetch_add(1, Ordering::Relaxed);
                // The counter starts at one and would have to wrap all the
                // way around before handing out a zero.
                match NonZeroU32::new(value) {
                    Some(value) => $name(value),
                    None => $name(NonZeroU32::MIN),
                }
            }

            pub fn index(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }
    };
}

counted_id! {
    /// Identifies a group of documents that may script each other directly.
    /// Also the unit of renderer-process affinity.
    SiteInstanceId
}

counted_id! {
    /// Identifies a group of site instances whose windows may hold mutual
    /// (possibly swapped-out) references, e.g. via `window.opener`.
    BrowsingInstanceId
}

counted_id! {
    /// Identifies one browser-side render view host.
    RenderViewId
}

counted_id! {
    /// Identifies one renderer process.
    ProcessId
}

counted_id! {
    /// Identifies one session history entry.
    NavigationEntryId
}
