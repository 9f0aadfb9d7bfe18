// Content-Length framing. The decoder is a push/pull state machine so it
// tolerates any chunking of the byte stream: feed whatever arrived, pull
// whole frames out.

/// Serialize one message body into its wire frame, exactly
/// `header + body` with no trailing bytes.
pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut out = Vec::with_capacity(header.len() + body.len());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(body);
    out
}

#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes as they arrive; headers and body may span any number of
    /// pushes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pull the next complete body, if one is buffered. Frames with
    /// malformed headers are dropped and scanning resumes at the next
    /// header terminator.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let header_end = find(&self.buf, b"\r\n\r\n")?;
            let body_start = header_end + 4;
            match content_length(&self.buf[..header_end]) {
                Some(length) => {
                    if self.buf.len() < body_start + length {
                        return None;
                    }
                    let body = self.buf[body_start..body_start + length].to_vec();
                    self.buf.drain(..body_start + length);
                    return Some(body);
                }
                None => {
                    tracing::warn!("discarding frame with malformed headers");
                    self.buf.drain(..body_start);
                }
            }
        }
    }
}

/// First valid `Content-Length` header in the header section. Header names
/// compare case-insensitively; the value must be a bare decimal integer.
fn content_length(headers: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(headers).ok()?;
    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("content-length") {
            continue;
        }
        let value = value.trim();
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            return value.parse().ok();
        }
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
