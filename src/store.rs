//! Remote store client.
//!
//! [`RemoteStore`] speaks the document store's REST dialect on top of any
//! [`HttpTransport`]: every path maps to `{base}{path}.json?auth={credential}`,
//! reads return a single JSON scalar, writes replace the document with a
//! flat JSON object.
//!
//! The client keeps no state between calls beyond its endpoint.  Each call
//! is exactly one round trip; retry policy belongs to the caller.

use core::fmt::Write as _;

use heapless::String;
use log::{debug, warn};
use serde::Serialize;

use crate::app::ports::{HttpFault, HttpReply, HttpTransport, Method, StorePort};
use crate::config::{BASE_URL_CAP, CREDENTIAL_CAP, NodeConfig};
use crate::error::{StoreError, TransportCause};

/// Capacity of a fully-built request URL.
pub const URL_CAP: usize = 256;
/// Largest response body `get_bool` will accept.
pub const RESPONSE_CAP: usize = 128;

impl From<HttpFault> for StoreError {
    fn from(fault: HttpFault) -> Self {
        match fault {
            HttpFault::Connect => Self::Transport(TransportCause::Connect),
            HttpFault::Io => Self::Transport(TransportCause::Io),
            HttpFault::Timeout => Self::Transport(TransportCause::Timeout),
        }
    }
}

/// Document store client over an injected transport.
pub struct RemoteStore<T: HttpTransport> {
    transport: T,
    base_url: String<BASE_URL_CAP>,
    credential: String<CREDENTIAL_CAP>,
}

impl<T: HttpTransport> RemoteStore<T> {
    pub fn new(transport: T, base_url: &str, credential: &str) -> Result<Self, StoreError> {
        Ok(Self {
            transport,
            base_url: String::try_from(base_url).map_err(|_| StoreError::Allocation)?,
            credential: String::try_from(credential).map_err(|_| StoreError::Allocation)?,
        })
    }

    pub fn from_config(transport: T, cfg: &NodeConfig) -> Self {
        Self {
            transport,
            base_url: cfg.store_base_url.clone(),
            credential: cfg.store_credential.clone(),
        }
    }

    /// Full request URL for `path`.  The credential is appended only when
    /// one is configured.
    pub fn url_for(&self, path: &str) -> Result<String<URL_CAP>, StoreError> {
        let mut url = String::new();
        write!(url, "{}{}.json", self.base_url, path).map_err(|_| StoreError::Allocation)?;
        if !self.credential.is_empty() {
            write!(url, "?auth={}", self.credential).map_err(|_| StoreError::Allocation)?;
        }
        Ok(url)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn check_status(&self, method: Method, path: &str, reply: &HttpReply) -> Result<(), StoreError> {
        if reply.is_success() {
            return Ok(());
        }
        // No query string: the credential stays off the console.
        warn!("Store: {:?} {}{}.json -> HTTP {}", method, self.base_url, path, reply.status);
        Err(StoreError::Transport(TransportCause::Status(reply.status)))
    }
}

impl<T: HttpTransport> StorePort for RemoteStore<T> {
    fn get_bool(&mut self, path: &str) -> Result<bool, StoreError> {
        let url = self.url_for(path)?;
        let mut body = [0u8; RESPONSE_CAP];

        debug!("Store: GET {}{}.json", self.base_url, path);
        let reply = self.transport.exchange(Method::Get, &url, None, &mut body)?;
        self.check_status(Method::Get, path, &reply)?;
        if reply.overflowed {
            warn!("Store: GET {}{}.json body exceeds {} bytes", self.base_url, path, RESPONSE_CAP);
            return Err(StoreError::Allocation);
        }

        let value = parse_bool_body(&body[..reply.len.min(RESPONSE_CAP)])?;
        debug!("Store: {} = {}", path, value);
        Ok(value)
    }

    fn put_json<F: Serialize>(&mut self, path: &str, fields: &F) -> Result<(), StoreError> {
        let url = self.url_for(path)?;
        let payload = serde_json::to_vec(fields).map_err(|_| StoreError::Parse)?;

        debug!("Store: PUT {}{}.json ({} bytes)", self.base_url, path, payload.len());
        // The echoed document is drained unread; only the status matters.
        let reply = self.transport.exchange(Method::Put, &url, Some(&payload), &mut [])?;
        self.check_status(Method::Put, path, &reply)
    }
}

/// Interpret a response body as a boolean flag.
///
/// Accepts the bare tokens `true` / `false` (surrounding ASCII whitespace
/// ignored) and the JSON strings `"true"` / `"false"`.  Everything else,
/// `null` included, is [`StoreError::Parse`].
pub fn parse_bool_body(body: &[u8]) -> Result<bool, StoreError> {
    let text = core::str::from_utf8(body).map_err(|_| StoreError::Parse)?;
    let text = text.trim_matches(|c: char| c.is_ascii_whitespace());

    if let Ok(value) = serde_json::from_str::<bool>(text) {
        return Ok(value);
    }
    match serde_json::from_str::<&str>(text) {
        Ok("true") => Ok(true),
        Ok("false") => Ok(false),
        _ => Err(StoreError::Parse),
    }
}
