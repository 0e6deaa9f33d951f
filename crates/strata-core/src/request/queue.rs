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

use super::RenderRequest;
use std::cell::Cell;
use std::marker::PhantomData;

/// Creates request channels.
///
/// The channel is an unbounded `flume` queue split into a producer role held by
/// the event thread and a consumer role held by the render thread.
#[derive(Debug)]
pub struct RenderRequestQueue;

impl RenderRequestQueue {
    /// Creates a queue and splits it into its producer and consumer roles.
    ///
    /// Neither side is `Clone` or `Sync`, so each role has exactly one owner.
    pub fn channel() -> (RenderRequestProducer, RenderRequestConsumer) {
        let (sender, receiver) = flume::unbounded();
        (
            RenderRequestProducer {
                sender,
                _single_owner: PhantomData,
            },
            RenderRequestConsumer {
                receiver,
                _single_owner: PhantomData,
            },
        )
    }
}

/// The event-thread side of a request channel.
pub struct RenderRequestProducer {
    sender: flume::Sender<RenderRequest>,
    // Send but not Sync.
    _single_owner: PhantomData<Cell<()>>,
}

impl RenderRequestProducer {
    /// Appends a request. Never blocks.
    ///
    /// Once the consumer is gone the request is dropped, which completes a
    /// surface replacement with [`ContextLost`](crate::ContextError::ContextLost).
    pub fn push(&self, request: RenderRequest) {
        log::trace!("Queued render request: {}", request.kind_name());
        if let Err(flume::SendError(request)) = self.sender.send(request) {
            log::warn!(
                "Render thread is gone; dropping {} request.",
                request.kind_name()
            );
        }
    }

    /// Number of requests not yet drained.
    pub fn pending(&self) -> usize {
        self.sender.len()
    }
}

impl std::fmt::Debug for RenderRequestProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderRequestProducer")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// The render-thread side of a request channel.
///
/// Dropping it drops every request still queued.
pub struct RenderRequestConsumer {
    receiver: flume::Receiver<RenderRequest>,
    _single_owner: PhantomData<Cell<()>>,
}

impl RenderRequestConsumer {
    /// Returns `true` if requests are waiting to be drained.
    pub fn has_pending(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Removes and returns every queued request in push order.
    ///
    /// Called between frames only.
    pub fn drain_all(&self) -> Vec<RenderRequest> {
        self.receiver.try_iter().collect()
    }

    /// Returns `true` while the producer is alive.
    pub fn is_connected(&self) -> bool {
        !self.receiver.is_disconnected()
    }
}

impl Drop for RenderRequestConsumer {
    fn drop(&mut self) {
        let dropped = self.receiver.drain().count();
        if dropped > 0 {
            log::debug!("Dropped {dropped} unprocessed render request(s).");
        }
    }
}

impl std::fmt::Debug for RenderRequestConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderRequestConsumer")
            .field("has_pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}
