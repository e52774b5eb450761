//! Frontend/backend invocation id binding for one stream.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of offering an event's invocation id to the binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// First id seen; the stream is now bound to it.
    Bound(String),
    /// Matches the bound id.
    Accepted,
    /// Unbound without an id, or a different id than the bound one.
    Rejected {
        expected: Option<String>,
        received: Option<String>,
    },
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Admission::Rejected { .. })
    }
}

/// Pairing of the locally generated request id and the backend's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInvocation {
    pub frontend_invocation_id: String,
    pub backend_invocation_id: Option<String>,
}

impl StreamInvocation {
    pub fn new() -> Self {
        Self::with_frontend_id(Uuid::new_v4().to_string())
    }

    pub fn with_frontend_id(id: impl Into<String>) -> Self {
        Self {
            frontend_invocation_id: id.into(),
            backend_invocation_id: None,
        }
    }

    /// Applies the binding rule to an incoming event id.
    ///
    /// The first non-empty id binds the stream. Once bound, only exact
    /// matches are admitted.
    pub fn admit(&mut self, received: Option<&str>) -> Admission {
        let received = received.filter(|id| !id.is_empty());

        if self.backend_invocation_id.is_none() {
            if let Some(id) = received {
                self.backend_invocation_id = Some(id.to_string());
                return Admission::Bound(id.to_string());
            }
        }

        match (&self.backend_invocation_id, received) {
            (Some(bound), Some(id)) if bound == id => Admission::Accepted,
            (bound, received) => Admission::Rejected {
                expected: bound.clone(),
                received: received.map(String::from),
            },
        }
    }

    pub fn backend_id(&self) -> Option<&str> {
        self.backend_invocation_id.as_deref()
    }
}

impl Default for StreamInvocation {
    fn default() -> Self {
        Self::new()
    }
}
