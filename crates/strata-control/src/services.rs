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

//! Optional collaborators the render thread looks up in the
//! [`ServiceRegistry`](strata_core::service_registry::ServiceRegistry).

use strata_core::trigger::TriggerHandle;

/// Fired by the render thread each time a surface replacement completes, whether
/// or not it succeeded.
#[derive(Debug, Clone)]
pub struct SurfaceReplacedTrigger(pub TriggerHandle);

/// Fired when the render thread has no update pending and goes to sleep.
#[derive(Debug, Clone)]
pub struct RenderIdleTrigger(pub TriggerHandle);
