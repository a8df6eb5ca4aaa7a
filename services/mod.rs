/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Cooperative scheduling primitives shared by the store and the canvas.

pub mod clock;
pub mod events;
pub mod timers;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use events::{EventBus, SubscriptionId};
pub use timers::{Debouncer, IntervalTimer};
