use std::io::Read as _;

/// Per-request options forwarded to a [`Fetcher`].
#[derive(Default)]
pub struct RequestOpts<'a> {
    /// `Referer` header value.
    pub referer: &'a str,
    /// `User-Agent` header value.
    pub user_agent: &'a str,
    /// `Cookie` header value; omitted when empty.
    pub cookies: &'a str,
    /// Receives `(total_bytes_or_0, bytes_so_far)` while the body streams in.
    pub progress: Option<&'a mut dyn FnMut(u64, u64)>,
}

/// Result of a GET. The fetcher never interprets the body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    /// HTTP status, or 0 on transport failure.
    pub status: u16,
    /// Raw response body (possibly partial after a transport failure).
    pub body: Vec<u8>,
    /// Human-readable transport failure cause; empty otherwise.
    pub error_message: String,
}

impl Response {
    /// A response describing a transport failure.
    pub fn transport_error(msg: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: Vec::new(),
            error_message: msg.into(),
        }
    }

    /// Short description of why the request did not succeed.
    pub fn failure_reason(&self) -> String {
        if self.status == 0 {
            return self.error_message.clone();
        }
        format!("Request returned {}", self.status)
    }
}

/// Byte fetcher capability. Production uses [`UreqFetcher`]; tests substitute doubles.
pub trait Fetcher {
    /// Perform a GET of `url`.
    fn get(&mut self, url: &str, opts: RequestOpts<'_>) -> Response;
}

const READ_CHUNK: usize = 64 * 1024;

/// Blocking HTTP fetcher backed by `ureq`. Non-2xx statuses are returned, not raised.
pub struct UreqFetcher {
    agent: ureq::Agent,
}

impl Default for UreqFetcher {
    fn default() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Fetcher for UreqFetcher {
    fn get(&mut self, url: &str, mut opts: RequestOpts<'_>) -> Response {
        let mut req = self
            .agent
            .get(url)
            .header("Referer", opts.referer)
            .header("User-Agent", opts.user_agent);
        if !opts.cookies.is_empty() {
            req = req.header("Cookie", opts.cookies);
        }

        let resp = match req.call() {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(url, error = %e, "request failed");
                return Response::transport_error(e.to_string());
            }
        };

        let status = resp.status().as_u16();
        // A compressed transfer's length says nothing about the decoded byte count.
        let total = if resp.headers().contains_key("content-encoding") {
            0
        } else {
            resp.headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0)
        };

        let mut body = resp.into_body();
        let mut reader = body.as_reader();
        let mut out = Vec::with_capacity(usize::try_from(total).unwrap_or(0).min(1 << 26));
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Response {
                        status: 0,
                        body: out,
                        error_message: format!("failed reading response body: {e}"),
                    };
                }
            };
            out.extend_from_slice(&buf[..n]);
            if let Some(cb) = opts.progress.as_mut() {
                cb(total, out.len() as u64);
            }
        }

        Response {
            status,
            body: out,
            error_message: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read as _, Write as _},
        net::TcpListener,
        thread::JoinHandle,
    };

    use super::*;

    const PIXIV: &str = "https://www.pixiv.net/";

    fn local_fetcher() -> UreqFetcher {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .proxy(None)
            .build();
        UreqFetcher {
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Answers one request and hands back the lowercased request head.
    fn serve_once(
        status: &str,
        extra_headers: &str,
        body: Vec<u8>,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!(
            "http://{}/ajax/illust/1/ugoira_meta",
            listener.local_addr().unwrap()
        );
        let status = status.to_string();
        let extra_headers = extra_headers.to_string();

        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }

            let resp_head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n{extra_headers}\r\n",
                body.len()
            );
            stream.write_all(resp_head.as_bytes()).unwrap();
            stream.write_all(&body).unwrap();
            stream.flush().unwrap();
            String::from_utf8_lossy(&head).to_lowercase()
        });
        (url, handle)
    }

    #[test]
    fn error_status_is_returned_with_body_and_headers_are_sent() {
        let (url, server) = serve_once("404 Not Found", "", br#"{"error":true}"#.to_vec());

        let mut ticks = Vec::new();
        let mut on_bytes = |total: u64, now: u64| ticks.push((total, now));
        let resp = local_fetcher().get(
            &url,
            RequestOpts {
                referer: PIXIV,
                user_agent: "UA/1",
                cookies: "PHPSESSID=x",
                progress: Some(&mut on_bytes),
            },
        );
        let head = server.join().unwrap();

        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, br#"{"error":true}"#);
        assert_eq!(resp.error_message, "");
        assert_eq!(resp.failure_reason(), "Request returned 404");

        assert!(head.contains("referer: https://www.pixiv.net/\r\n"), "{head}");
        assert!(head.contains("user-agent: ua/1\r\n"), "{head}");
        assert!(head.contains("cookie: phpsessid=x\r\n"), "{head}");

        assert_eq!(ticks.last(), Some(&(14, 14)));
    }

    #[test]
    fn large_body_streams_with_content_length_ticks() {
        let body: Vec<u8> = (0..3 * READ_CHUNK + 17).map(|i| (i % 251) as u8).collect();
        let len = body.len() as u64;
        let (url, server) = serve_once("200 OK", "", body.clone());

        let mut ticks = Vec::new();
        let mut on_bytes = |total: u64, now: u64| ticks.push((total, now));
        let resp = local_fetcher().get(
            &url,
            RequestOpts {
                referer: PIXIV,
                user_agent: "UA/1",
                cookies: "",
                progress: Some(&mut on_bytes),
            },
        );
        let head = server.join().unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, body);
        assert!(!head.contains("cookie:"), "{head}");

        assert!(!ticks.is_empty());
        assert!(ticks.iter().all(|&(total, _)| total == len));
        assert!(ticks.windows(2).all(|w| w[0].1 < w[1].1));
        assert_eq!(ticks.last(), Some(&(len, len)));
    }

    #[test]
    fn encoded_body_reports_unknown_total() {
        let (url, server) = serve_once(
            "200 OK",
            "Content-Encoding: identity\r\n",
            b"abcdef".to_vec(),
        );

        let mut ticks = Vec::new();
        let mut on_bytes = |total: u64, now: u64| ticks.push((total, now));
        let resp = local_fetcher().get(
            &url,
            RequestOpts {
                progress: Some(&mut on_bytes),
                ..RequestOpts::default()
            },
        );
        server.join().unwrap();

        assert_eq!(resp.body, b"abcdef");
        assert!(ticks.iter().all(|&(total, _)| total == 0), "{ticks:?}");
        assert_eq!(ticks.last().map(|t| t.1), Some(6));
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let resp = local_fetcher().get(&url, RequestOpts::default());
        assert_eq!(resp.status, 0);
        assert!(resp.body.is_empty());
        assert!(!resp.error_message.is_empty());
        assert_eq!(resp.failure_reason(), resp.error_message);
    }

    #[test]
    fn failure_reason_prefers_transport_message() {
        let r = Response::transport_error("Could not resolve host: www.pixiv.net");
        assert_eq!(r.failure_reason(), "Could not resolve host: www.pixiv.net");

        let r = Response {
            status: 404,
            ..Response::default()
        };
        assert_eq!(r.failure_reason(), "Request returned 404");
    }
}
