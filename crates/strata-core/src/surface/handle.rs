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

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The windowing handle traits a native graphics backend needs to bind a surface.
pub trait NativeWindow: HasWindowHandle + HasDisplayHandle {}

impl<T: HasWindowHandle + HasDisplayHandle> NativeWindow for T {}

/// A thread-safe, shared native window.
///
/// Wrapping a window in [`NativeSurfaceHandle::from_window`] stores it as this type,
/// which is what the native platform backends look for.
pub type SharedNativeWindow = Arc<dyn NativeWindow + Send + Sync>;

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`NativeSurfaceHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    /// Returns the raw identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// An opaque reference to a platform drawable.
///
/// This layer does not know the concrete type behind the handle; backends downcast it.
/// Clones share the same underlying resource and compare equal.
#[derive(Clone)]
pub struct NativeSurfaceHandle {
    id: SurfaceId,
    inner: Arc<dyn Any + Send + Sync>,
}

impl NativeSurfaceHandle {
    /// Wraps an arbitrary platform value.
    pub fn new<T: Any + Send + Sync>(surface: T) -> Self {
        Self {
            id: SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed)),
            inner: Arc::new(surface),
        }
    }

    /// Wraps a native window exposing raw window and display handles.
    pub fn from_window(window: SharedNativeWindow) -> Self {
        Self::new(window)
    }

    /// Returns the handle's identity.
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Returns the wrapped value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns the wrapped native window, if this handle was built from one.
    pub fn as_window(&self) -> Option<&SharedNativeWindow> {
        self.downcast_ref::<SharedNativeWindow>()
    }

    /// Number of live clones of this handle.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

impl PartialEq for NativeSurfaceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NativeSurfaceHandle {}

impl fmt::Debug for NativeSurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeSurfaceHandle").field(&self.id).finish()
    }
}
