// MIT License - Copyright (c) 2026 Peter Wright
// Receive buffer and pattern scanning

/// Bytes received from the module that have not been consumed yet.
///
/// Grows without bound while the device talks; a successful match discards
/// everything up to and including the matched pattern.
#[derive(Debug, Default)]
pub struct ReceiveBuffer {
    data: Vec<u8>,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Append freshly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Drop the first `count` bytes.
    pub fn consume(&mut self, count: usize) {
        let count = count.min(self.data.len());
        self.data.drain(..count);
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Incremental search for one pattern in a growing [`ReceiveBuffer`].
///
/// After a miss only the last `pattern.len() - 1` bytes can still start a
/// match, so the next scan resumes there instead of at the front.
#[derive(Debug)]
pub struct PatternScan<'p> {
    pattern: &'p [u8],
    resume_at: usize,
}

impl<'p> PatternScan<'p> {
    pub fn new(pattern: &'p [u8]) -> Self {
        Self {
            pattern,
            resume_at: 0,
        }
    }

    /// Returns the offset just past the first match, if any.
    ///
    /// The buffer must not have been consumed since the previous call.
    pub fn find_in(&mut self, buffer: &ReceiveBuffer) -> Option<usize> {
        let haystack = buffer.as_bytes();
        if self.pattern.is_empty() {
            return Some(0);
        }
        let start = self.resume_at.min(haystack.len());
        let found = haystack[start..]
            .windows(self.pattern.len())
            .position(|window| window == self.pattern);
        match found {
            Some(pos) => Some(start + pos + self.pattern.len()),
            None => {
                self.resume_at = haystack.len().saturating_sub(self.pattern.len() - 1);
                None
            }
        }
    }
}
