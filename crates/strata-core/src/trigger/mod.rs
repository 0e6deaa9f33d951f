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

//! Cross-thread wake-up primitives.
//!
//! A [`TriggerEventManager`] lives on the event thread and owns the callbacks.
//! Worker and render threads hold [`TriggerHandle`]s, which are weak: firing one
//! after its trigger or manager has gone away is harmless.

mod manager;

pub use self::manager::{
    TriggerEvent, TriggerEventManager, TriggerHandle, TriggerId, TriggerOptions,
};
