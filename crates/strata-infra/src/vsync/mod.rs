// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Hardware vertical-sync sources.

mod display_link;

pub use self::display_link::{DisplayLinkVSync, SimulatedDisplayLink, VSyncNotifier};

use strata_core::frame::{VSyncProvider, VSyncStream};

/// A provider for displays without a usable vblank signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHardwareVSync;

impl VSyncProvider for NoHardwareVSync {
    fn name(&self) -> &str {
        "none"
    }

    fn open(&mut self) -> Option<VSyncStream> {
        None
    }
}
