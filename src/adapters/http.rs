//! HTTP transport adapter.
//!
//! Implements [`HttpTransport`]: one request/response round trip per call,
//! with the connection opened and released inside the call.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspHttpConnection` over TLS, server
//!   certificates checked against the ESP-IDF certificate bundle.
//! - **all other targets**: plaintext HTTP/1.1 over `std::net::TcpStream`,
//!   enough to run the store client against a local fake server.
//!
//! URLs carry the store credential in their query string and are never
//! logged here.

use core::time::Duration;

use crate::app::ports::{HttpFault, HttpReply, HttpTransport, Method};

/// Response body being collected into a caller buffer.  Once a chunk does
/// not fit, later chunks are counted and dropped.
struct BodyWriter<'a> {
    dst: &'a mut [u8],
    filled: usize,
    overflowed: bool,
}

impl<'a> BodyWriter<'a> {
    fn new(dst: &'a mut [u8]) -> Self {
        Self { dst, filled: 0, overflowed: false }
    }

    fn push(&mut self, src: &[u8]) {
        if self.overflowed {
            return;
        }
        match self.filled.checked_add(src.len()) {
            Some(end) if end <= self.dst.len() => {
                self.dst[self.filled..end].copy_from_slice(src);
                self.filled = end;
            }
            _ => self.overflowed = true,
        }
    }

    fn finish(self, status: u16) -> HttpReply {
        HttpReply { status, len: self.filled, overflowed: self.overflowed }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod platform {
    use super::*;

    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
    use esp_idf_svc::sys::{
        EspError, ESP_ERR_HTTP_CONNECT, ESP_ERR_HTTP_EAGAIN, ESP_ERR_TIMEOUT, esp_err_t,
    };
    use log::debug;

    const READ_CHUNK: usize = 64;

    pub struct HttpClient {
        timeout: Duration,
    }

    impl HttpClient {
        pub fn new(timeout: Duration) -> Self {
            Self { timeout }
        }

        fn open(&self) -> Result<EspHttpConnection, HttpFault> {
            EspHttpConnection::new(&Configuration {
                timeout: Some(self.timeout),
                crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
                ..Default::default()
            })
            .map_err(map_err)
        }
    }

    fn map_err(e: EspError) -> HttpFault {
        match e.code() {
            c if c == ESP_ERR_HTTP_CONNECT as esp_err_t => HttpFault::Connect,
            c if c == ESP_ERR_TIMEOUT as esp_err_t || c == ESP_ERR_HTTP_EAGAIN as esp_err_t => {
                HttpFault::Timeout
            }
            _ => HttpFault::Io,
        }
    }

    impl HttpTransport for HttpClient {
        fn exchange(
            &mut self,
            method: Method,
            url: &str,
            body: Option<&[u8]>,
            response: &mut [u8],
        ) -> Result<HttpReply, HttpFault> {
            let mut conn = self.open()?;

            let esp_method = match method {
                Method::Get => esp_idf_svc::http::Method::Get,
                Method::Put => esp_idf_svc::http::Method::Put,
            };
            let len_buf = itoa_len(body.map_or(0, <[u8]>::len));
            let len_str = len_buf.as_str();
            let json_headers = [
                ("Content-Type", "application/json"),
                ("Content-Length", len_str),
            ];
            let headers: &[(&str, &str)] = if body.is_some() { &json_headers } else { &[] };

            conn.initiate_request(esp_method, url, headers).map_err(map_err)?;
            if let Some(bytes) = body {
                let mut sent = 0;
                while sent < bytes.len() {
                    let n = conn.write(&bytes[sent..]).map_err(map_err)?;
                    if n == 0 {
                        return Err(HttpFault::Io);
                    }
                    sent += n;
                }
            }
            conn.initiate_response().map_err(map_err)?;
            let status = conn.status();

            let mut writer = BodyWriter::new(response);
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                let n = conn.read(&mut chunk).map_err(map_err)?;
                if n == 0 {
                    break;
                }
                writer.push(&chunk[..n]);
            }
            let reply = writer.finish(status);
            debug!("HTTP: {:?} -> {} ({} bytes, overflow={})", method, status, reply.len, reply.overflowed);
            Ok(reply)
        }
    }

    fn itoa_len(n: usize) -> heapless::String<20> {
        use core::fmt::Write as _;
        let mut s = heapless::String::new();
        let _ = write!(s, "{}", n);
        s
    }
}

// ───────────────────────────────────────────────────────────────
// Host implementation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod platform {
    use super::*;

    use std::io::{self, Read, Write};
    use std::net::{TcpStream, ToSocketAddrs};

    use log::debug;

    pub struct HttpClient {
        timeout: Duration,
    }

    /// `http://host[:port]/path?query` split into its parts.
    #[derive(Debug, PartialEq, Eq)]
    pub(super) struct Target<'a> {
        pub host: &'a str,
        pub port: u16,
        pub path: &'a str,
    }

    pub(super) fn split_url(url: &str) -> Option<Target<'_>> {
        let rest = url.strip_prefix("http://")?;
        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) => (h, p.parse().ok()?),
            None => (authority, 80),
        };
        if host.is_empty() {
            return None;
        }
        Some(Target { host, port, path })
    }

    fn map_io(e: &io::Error) -> HttpFault {
        match e.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => HttpFault::Timeout,
            _ => HttpFault::Io,
        }
    }

    /// Status code and body offset of a raw HTTP/1.1 response.
    pub(super) fn parse_head(raw: &[u8]) -> Option<(u16, usize, Option<usize>)> {
        let head_end = raw.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
        let head = core::str::from_utf8(&raw[..head_end]).ok()?;
        let mut lines = head.split("\r\n");
        let status = lines.next()?.split(' ').nth(1)?.parse().ok()?;
        let content_length = lines
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse().ok());
        Some((status, head_end, content_length))
    }

    impl HttpClient {
        pub fn new(timeout: Duration) -> Self {
            Self { timeout }
        }

        fn open(&self, target: &Target<'_>) -> Result<TcpStream, HttpFault> {
            let addr = (target.host, target.port)
                .to_socket_addrs()
                .map_err(|_| HttpFault::Connect)?
                .next()
                .ok_or(HttpFault::Connect)?;
            let stream =
                TcpStream::connect_timeout(&addr, self.timeout).map_err(|_| HttpFault::Connect)?;
            stream
                .set_read_timeout(Some(self.timeout))
                .map_err(|e| map_io(&e))?;
            stream
                .set_write_timeout(Some(self.timeout))
                .map_err(|e| map_io(&e))?;
            Ok(stream)
        }
    }

    impl HttpTransport for HttpClient {
        fn exchange(
            &mut self,
            method: Method,
            url: &str,
            body: Option<&[u8]>,
            response: &mut [u8],
        ) -> Result<HttpReply, HttpFault> {
            let target = split_url(url).ok_or(HttpFault::Connect)?;
            let mut stream = self.open(&target)?;

            let verb = match method {
                Method::Get => "GET",
                Method::Put => "PUT",
            };
            let payload = body.unwrap_or_default();
            let mut request = format!(
                "{verb} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n",
                target.path, target.host
            );
            if body.is_some() {
                request.push_str("Content-Type: application/json\r\n");
            }
            request.push_str(&format!("Content-Length: {}\r\n\r\n", payload.len()));

            stream
                .write_all(request.as_bytes())
                .and_then(|()| stream.write_all(payload))
                .map_err(|e| map_io(&e))?;

            let mut raw = Vec::new();
            stream.read_to_end(&mut raw).map_err(|e| map_io(&e))?;

            let (status, body_at, content_length) = parse_head(&raw).ok_or(HttpFault::Io)?;
            let mut data = &raw[body_at..];
            if let Some(n) = content_length {
                data = data.get(..n).ok_or(HttpFault::Io)?;
            }

            let mut writer = BodyWriter::new(response);
            writer.push(data);
            let reply = writer.finish(status);
            debug!("HTTP(host): {} -> {} ({} bytes, overflow={})", verb, status, reply.len, reply.overflowed);
            Ok(reply)
        }
    }
}

pub use platform::HttpClient;

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::platform::{parse_head, split_url};
    use super::*;

    #[test]
    fn body_writer_flags_overflow_and_keeps_status() {
        let mut buf = [0u8; 4];
        let mut w = BodyWriter::new(&mut buf);
        w.push(b"ab");
        w.push(b"abc");
        w.push(b"a");
        assert_eq!(w.finish(503), HttpReply { status: 503, len: 2, overflowed: true });

        let mut buf = [0u8; 4];
        let mut w = BodyWriter::new(&mut buf);
        w.push(b"ab");
        w.push(b"cd");
        assert_eq!(w.finish(200), HttpReply { status: 200, len: 4, overflowed: false });
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn url_split_handles_port_and_query() {
        let t = split_url("http://127.0.0.1:8080/led/led1.json?auth=x").unwrap();
        assert_eq!(t.host, "127.0.0.1");
        assert_eq!(t.port, 8080);
        assert_eq!(t.path, "/led/led1.json?auth=x");

        let t = split_url("http://example.com").unwrap();
        assert_eq!((t.port, t.path), (80, "/"));
    }

    #[test]
    fn tls_urls_are_not_served_on_host() {
        assert!(split_url("https://example.com/gps.json").is_none());
    }

    #[test]
    fn head_parser_reads_status_and_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ntrue";
        assert_eq!(parse_head(raw), Some((200, raw.len() - 4, Some(4))));
        assert_eq!(parse_head(b"HTTP/1.1 500"), None);
    }
}
