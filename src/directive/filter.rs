use super::EXECUTE_OPEN;

/// Decides which part of a growing response buffer may reach the caller.
///
/// Text is forwarded until the opening marker shows up, after which nothing
/// more is forwarded for the current model turn. A tail that could still grow
/// into the marker (`"[EXEC"`) is held back until the next delta settles it,
/// so partial directive syntax never leaks.
#[derive(Debug, Default, Clone)]
pub struct ChunkFilter {
    forwarded: usize,
    suppressed: bool,
}

impl ChunkFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call after appending a delta to `buffer`; returns the newly releasable text.
    pub fn advance<'a>(&mut self, buffer: &'a str) -> Option<&'a str> {
        if self.suppressed {
            return None;
        }

        if let Some(marker_at) = buffer.find(EXECUTE_OPEN) {
            self.suppressed = true;
            return self.release(buffer, marker_at);
        }

        let safe_end = buffer.len() - partial_marker_len(buffer);
        self.release(buffer, safe_end)
    }

    /// Release held-back text at the end of a model turn.
    ///
    /// Returns nothing once the marker has been seen.
    pub fn flush<'a>(&mut self, buffer: &'a str) -> Option<&'a str> {
        if self.suppressed {
            return None;
        }
        self.release(buffer, buffer.len())
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Start over for a fresh response buffer.
    pub fn reset(&mut self) {
        self.forwarded = 0;
        self.suppressed = false;
    }

    fn release<'a>(&mut self, buffer: &'a str, end: usize) -> Option<&'a str> {
        if end <= self.forwarded {
            return None;
        }
        let out = &buffer[self.forwarded..end];
        self.forwarded = end;
        Some(out)
    }
}

/// Length of the longest buffer suffix that is a proper prefix of the marker.
fn partial_marker_len(buffer: &str) -> usize {
    (1..EXECUTE_OPEN.len())
        .rev()
        .find(|&len| buffer.ends_with(&EXECUTE_OPEN[..len]))
        .unwrap_or(0)
}
