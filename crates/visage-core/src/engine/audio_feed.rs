//! Audio ingestion pipeline
//!
//! Buffers PCM chunks pushed by callers and re-slices them into the
//! fixed-size frames the backend consumes, one per render step. Owned by
//! the render loop; producers only ever reach it through commands.
//!
//! A *session* spans from the first frame handed to the backend until the
//! backend reports playback complete. The ingestion *window* (opened by
//! start-push, closed by stop-push) controls only whether new chunks are
//! accepted; closing it lets buffered audio keep draining. A stream starved
//! longer than the backend's completion lag ends its session; a later chunk
//! in the same window starts a new one.

use std::collections::VecDeque;

/// One backend-sized frame taken from the feed
#[derive(Debug, PartialEq, Eq)]
pub struct FeedFrame {
    /// Exactly frame-size bytes; a final partial frame is zero-padded
    pub pcm: Vec<u8>,
    /// This is the first frame of its session
    pub first: bool,
}

/// Chunk buffer and pacer between the command queue and the backend
pub struct AudioFeed {
    frame_bytes: usize,
    /// Pending PCM in arrival order
    buffer: VecDeque<u8>,
    /// Chunks are currently accepted
    window_open: bool,
    /// A session is in progress (first frame submitted, completion not
    /// yet reported by the backend)
    started: bool,
    /// Arrival sequence of the next chunk, for tracing
    next_seq: u64,
}

impl AudioFeed {
    pub fn new(frame_bytes: usize) -> Self {
        Self {
            frame_bytes,
            buffer: VecDeque::new(),
            window_open: false,
            started: false,
            next_seq: 0,
        }
    }

    /// Open the ingestion window
    pub fn start_window(&mut self) {
        self.window_open = true;
    }

    /// Append a chunk. Returns false (chunk dropped) if the window is closed.
    pub fn push(&mut self, pcm: Vec<u8>) -> bool {
        if !self.window_open {
            log::debug!("audio feed: chunk dropped, window closed");
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        log::trace!("audio feed: chunk seq={} len={}", seq, pcm.len());
        self.buffer.extend(pcm);
        true
    }

    /// Close the window; buffered audio keeps draining
    pub fn close_window(&mut self) {
        self.window_open = false;
    }

    /// Stop playback now: discard buffered audio and close the window.
    /// Returns true if a session stays live awaiting the backend's
    /// completion signal.
    pub fn cancel(&mut self) -> bool {
        self.buffer.clear();
        self.window_open = false;
        self.started
    }

    /// Drop everything, session included. Used on teardown; emits nothing.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.window_open = false;
        self.started = false;
    }

    /// Take the next frame for the backend, if one is due.
    ///
    /// A full frame is due whenever enough bytes are buffered. A final
    /// partial frame is due only once the window is closed (more bytes may
    /// arrive while it is open); it is zero-padded to frame size.
    pub fn next_frame(&mut self) -> Option<FeedFrame> {
        let take = if self.buffer.len() >= self.frame_bytes {
            self.frame_bytes
        } else if !self.window_open && !self.buffer.is_empty() {
            self.buffer.len()
        } else {
            return None;
        };

        let mut pcm: Vec<u8> = self.buffer.drain(..take).collect();
        pcm.resize(self.frame_bytes, 0);
        let first = !self.started;
        self.started = true;
        Some(FeedFrame { pcm, first })
    }

    /// The backend reported playback complete. Returns true if that ends a
    /// live session (the play-ended event is due).
    pub fn on_playback_complete(&mut self) -> bool {
        if !self.started {
            return false;
        }
        self.started = false;
        true
    }

    /// A session is in progress
    pub fn in_session(&self) -> bool {
        self.started
    }

    pub fn window_open(&self) -> bool {
        self.window_open
    }

    pub fn buffered_bytes(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: usize = 4;

    fn feed() -> AudioFeed {
        AudioFeed::new(FRAME)
    }

    #[test]
    fn test_chunks_resliced_in_order() {
        let mut feed = feed();
        feed.start_window();
        // Chunk sizes straddle frame boundaries
        feed.push(vec![1, 2, 3]);
        feed.push(vec![4, 5, 6, 7, 8]);

        let a = feed.next_frame().unwrap();
        assert_eq!(a.pcm, vec![1, 2, 3, 4]);
        assert!(a.first);

        let b = feed.next_frame().unwrap();
        assert_eq!(b.pcm, vec![5, 6, 7, 8]);
        assert!(!b.first);

        // Window still open: nothing due until more bytes or a close
        assert!(feed.next_frame().is_none());
    }

    #[test]
    fn test_partial_tail_padded_after_close() {
        let mut feed = feed();
        feed.start_window();
        feed.push(vec![9, 9]);
        assert!(feed.next_frame().is_none());

        feed.close_window();
        let tail = feed.next_frame().unwrap();
        assert_eq!(tail.pcm, vec![9, 9, 0, 0]);
        assert!(feed.next_frame().is_none());
    }

    #[test]
    fn test_push_outside_window_dropped() {
        let mut feed = feed();
        assert!(!feed.push(vec![1, 2, 3, 4]));
        assert_eq!(feed.buffered_bytes(), 0);

        feed.start_window();
        assert!(feed.push(vec![1, 2, 3, 4]));
        feed.close_window();
        assert!(!feed.push(vec![5, 6, 7, 8]));
        assert_eq!(feed.buffered_bytes(), FRAME);
    }

    #[test]
    fn test_session_ends_on_backend_completion() {
        let mut feed = feed();
        feed.start_window();
        feed.push(vec![1, 2, 3, 4]);
        feed.close_window();

        assert!(feed.next_frame().unwrap().first);
        assert!(feed.in_session());

        assert!(feed.on_playback_complete());
        assert!(!feed.in_session());
        // Completion with no session pending reports nothing
        assert!(!feed.on_playback_complete());
    }

    #[test]
    fn test_starved_window_starts_new_session() {
        let mut feed = feed();
        feed.start_window();
        feed.push(vec![1, 2, 3, 4]);
        assert!(feed.next_frame().unwrap().first);

        // Producer stalls; backend finishes what it has
        assert!(feed.next_frame().is_none());
        assert!(feed.on_playback_complete());

        // Same window, new chunk: a fresh session begins
        feed.push(vec![5, 6, 7, 8]);
        assert!(feed.next_frame().unwrap().first);
    }

    #[test]
    fn test_cancel_discards_but_keeps_session() {
        let mut feed = feed();
        feed.start_window();
        feed.push(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        feed.next_frame().unwrap();

        assert!(feed.cancel());
        assert_eq!(feed.buffered_bytes(), 0);
        assert!(!feed.window_open());
        assert!(feed.next_frame().is_none());
        // The ended event is still owed once the backend confirms
        assert!(feed.on_playback_complete());
    }

    #[test]
    fn test_cancel_before_start_is_silent() {
        let mut feed = feed();
        feed.start_window();
        feed.push(vec![1, 2]);
        assert!(!feed.cancel());
        assert!(!feed.on_playback_complete());
    }

    #[test]
    fn test_close_with_nothing_pushed_is_silent() {
        let mut feed = feed();
        feed.start_window();
        feed.close_window();
        assert!(feed.next_frame().is_none());
        assert!(!feed.on_playback_complete());
    }

    #[test]
    fn test_reset_clears_session() {
        let mut feed = feed();
        feed.start_window();
        feed.push(vec![1, 2, 3, 4]);
        feed.next_frame().unwrap();

        feed.reset();
        assert!(!feed.in_session());
        assert_eq!(feed.buffered_bytes(), 0);
        assert!(!feed.on_playback_complete());
    }
}
