//! Who is asking, and over what

/// Capability token supplied by the outer layer; trusted as given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub privileged: bool,
}

impl Actor {
    pub fn new(id: impl Into<String>, privileged: bool) -> Self {
        Self {
            id: id.into(),
            privileged,
        }
    }
}

/// Per-request facts the access guard decides on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub actor: Actor,
    /// Whether the request arrived over an encrypted channel
    pub secure: bool,
    /// Host the request was addressed to, if known
    pub host: Option<String>,
    pub source_ip: Option<String>,
}

impl RequestContext {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor,
            secure: false,
            host: None,
            source_ip: None,
        }
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }
}
