//! Outbound request queue with per-path ordering.
//!
//! A label result load is held back while a save of the same path is queued
//! or in flight, and released once that save is acknowledged. Shells may
//! complete requests in any order; this keeps a re-opened image from reading
//! its sidecar before the previous save has landed.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use crate::shell::{Request, RequestId, RequestKind};

/// FIFO of requests waiting for the shell, plus in-flight bookkeeping.
#[derive(Debug, Default)]
pub struct RequestQueue {
    next_id: RequestId,
    ready: VecDeque<Request>,
    held: Vec<Request>,
    in_flight: HashMap<RequestId, RequestKind>,
}

impl RequestQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request and return its id.
    pub fn push(&mut self, kind: RequestKind) -> RequestId {
        self.next_id += 1;
        let request = Request {
            id: self.next_id,
            kind,
        };

        match &request.kind {
            RequestKind::LoadLabelResult { path } if self.save_pending(path) => {
                log::debug!(
                    "Holding {} #{} until the save of {:?} completes",
                    request.kind.name(),
                    request.id,
                    path
                );
                self.held.push(request);
            }
            _ => {
                log::trace!("Queued {} #{}", request.kind.name(), request.id);
                self.ready.push_back(request);
            }
        }

        self.next_id
    }

    /// Hand the next request to the shell and mark it in flight.
    pub fn next(&mut self) -> Option<Request> {
        let request = self.ready.pop_front()?;
        self.in_flight.insert(request.id, request.kind.clone());
        Some(request)
    }

    /// Mark a request answered. Returns the request it answered, if known.
    pub fn complete(&mut self, id: RequestId) -> Option<RequestKind> {
        let kind = self.in_flight.remove(&id)?;

        if let RequestKind::SaveLabelResult { path, .. } = &kind {
            if !self.save_pending(path) {
                self.release_loads_for(&path.clone());
            }
        }

        Some(kind)
    }

    /// Number of requests not yet answered.
    pub fn pending(&self) -> usize {
        self.ready.len() + self.held.len() + self.in_flight.len()
    }

    /// Whether every request has been answered.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    fn save_pending(&self, path: &Path) -> bool {
        let is_save_of = |kind: &RequestKind| {
            matches!(kind, RequestKind::SaveLabelResult { path: p, .. } if p == path)
        };
        self.ready.iter().any(|r| is_save_of(&r.kind)) || self.in_flight.values().any(is_save_of)
    }

    fn release_loads_for(&mut self, path: &PathBuf) {
        let (release, keep): (Vec<_>, Vec<_>) = self.held.drain(..).partition(|r| {
            matches!(&r.kind, RequestKind::LoadLabelResult { path: p } if p == path)
        });
        self.held = keep;
        for request in release {
            log::debug!("Releasing {} #{}", request.kind.name(), request.id);
            self.ready.push_back(request);
        }
    }
}
