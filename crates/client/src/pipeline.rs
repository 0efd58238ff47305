//! Request/response interceptor chain wrapped around every API call.
//!
//! Interceptors see outgoing requests in registration order and incoming
//! responses in reverse order. An interceptor can ask to be removed from the
//! chain after seeing a response (used by the auth interceptor on 401).

use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Control {
    Keep,
    Eject,
}

pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_request(&self, _request: &mut reqwest::Request) {}

    fn on_response(&self, _status: StatusCode, _headers: &HeaderMap) -> Control {
        Control::Keep
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct InterceptorId(u64);

#[derive(Default)]
struct Chain {
    next_id: u64,
    entries: Vec<(InterceptorId, Arc<dyn Interceptor>)>,
}

#[derive(Default)]
pub struct Pipeline {
    chain: RwLock<Chain>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.chain.read().entries.iter().map(|(_, i)| i.name()).collect();
        f.debug_struct("Pipeline").field("interceptors", &names).finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, interceptor: Arc<dyn Interceptor>) -> InterceptorId {
        let mut chain = self.chain.write();
        let id = InterceptorId(chain.next_id);
        chain.next_id += 1;
        debug!(interceptor = interceptor.name(), "interceptor installed");
        chain.entries.push((id, interceptor));
        id
    }

    /// Returns `true` if the interceptor was still installed.
    pub fn eject(&self, id: InterceptorId) -> bool {
        let mut chain = self.chain.write();
        let before = chain.entries.len();
        chain.entries.retain(|(eid, _)| *eid != id);
        chain.entries.len() != before
    }

    pub fn contains(&self, id: InterceptorId) -> bool {
        self.chain.read().entries.iter().any(|(eid, _)| *eid == id)
    }

    pub fn len(&self) -> usize {
        self.chain.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<(InterceptorId, Arc<dyn Interceptor>)> {
        self.chain.read().entries.clone()
    }

    pub fn apply_request(&self, request: &mut reqwest::Request) {
        for (_, interceptor) in self.snapshot() {
            interceptor.on_request(request);
        }
    }

    pub fn apply_response(&self, status: StatusCode, headers: &HeaderMap) {
        for (id, interceptor) in self.snapshot().into_iter().rev() {
            if interceptor.on_response(status, headers) == Control::Eject {
                debug!(interceptor = interceptor.name(), %status, "interceptor ejected");
                self.eject(id);
            }
        }
    }
}
