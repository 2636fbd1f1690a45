//! Command ingestion loop
//!
//! Waits on the command pipe, frames what arrives into lines and hands each
//! command to a [`CommandSink`] in stream order. The wait is the only place
//! the loop blocks.

use core::fmt::{Debug, Display};
use core::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use splash_display::{Dispatcher, Outcome, Surface};
use splash_hal::{CommandPipe, ReadError, WaitOutcome};
use splash_protocol::{Command, Drain, LineBuffer};
use tracing::{debug, info, trace, warn};

/// Receiver of parsed commands
pub trait CommandSink {
    /// Error from applying a command; never ends the loop
    type Error: Display;

    /// Apply one command
    fn apply(&mut self, command: Command<'_>) -> Result<Outcome, Self::Error>;
}

impl<S> CommandSink for Dispatcher<S>
where
    S: Surface,
    S::Error: Display,
{
    type Error = S::Error;

    fn apply(&mut self, command: Command<'_>) -> Result<Outcome, Self::Error> {
        Dispatcher::apply(self, command)
    }
}

impl<T: CommandSink + ?Sized> CommandSink for &mut T {
    type Error = T::Error;

    fn apply(&mut self, command: Command<'_>) -> Result<Outcome, Self::Error> {
        (**self).apply(command)
    }
}

/// Why the loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason<E> {
    /// A `QUIT` command was received
    Quit,
    /// The cancellation flag was raised
    Cancelled,
    /// No input arrived within the wait timeout
    TimedOut,
    /// Waiting on the pipe failed
    WaitFailed(E),
    /// The pipe could not be reopened after end of stream
    ReopenFailed(E),
}

/// Reads commands from a pipe until told to stop
pub struct IngestLoop<P, K> {
    pipe: P,
    sink: K,
    buffer: LineBuffer,
    timeout: Option<Duration>,
}

impl<P, K> IngestLoop<P, K>
where
    P: CommandPipe,
    P::Error: Debug,
    K: CommandSink,
{
    /// Create a loop; `timeout` of `None` waits forever
    pub fn new(pipe: P, sink: K, timeout: Option<Duration>) -> Self {
        Self {
            pipe,
            sink,
            buffer: LineBuffer::new(),
            timeout,
        }
    }

    /// Bytes read but not yet parsed
    pub fn pending(&self) -> &[u8] {
        self.buffer.window()
    }

    /// Give back the pipe and the sink
    pub fn into_parts(self) -> (P, K) {
        (self.pipe, self.sink)
    }

    /// Run until quit, cancellation, timeout or a fatal pipe error
    pub fn run(&mut self, cancel: &AtomicBool) -> ExitReason<P::Error> {
        info!("Ingest loop started");

        loop {
            if cancel.load(Ordering::SeqCst) {
                info!("Cancelled");
                return ExitReason::Cancelled;
            }

            match self.pipe.wait(self.timeout) {
                WaitOutcome::Ready => {}
                WaitOutcome::Interrupted => {
                    trace!("Wait interrupted");
                    continue;
                }
                WaitOutcome::TimedOut => {
                    info!("No input within {:?}, stopping", self.timeout);
                    return ExitReason::TimedOut;
                }
                WaitOutcome::Failed(e) => {
                    warn!("Wait failed: {:?}", e);
                    return ExitReason::WaitFailed(e);
                }
            }

            let pipe = &mut self.pipe;
            let fill = match self.buffer.fill(|buf| pipe.read(buf)) {
                Ok(fill) => fill,
                Err(ReadError::WouldBlock) => continue,
                Err(ReadError::Io(e)) => {
                    debug!("Read failed ({:?}), reopening pipe", e);
                    if let Err(e) = self.pipe.reopen() {
                        warn!("Reopen failed: {:?}", e);
                        return ExitReason::ReopenFailed(e);
                    }
                    continue;
                }
            };

            if fill.dropped > 0 {
                warn!("Overlong line, dropped {} bytes", fill.dropped);
            }

            if fill.read == 0 {
                // Last writer closed; buffered bytes stay for the next one
                debug!("End of stream, reopening pipe");
                if let Err(e) = self.pipe.reopen() {
                    warn!("Reopen failed: {:?}", e);
                    return ExitReason::ReopenFailed(e);
                }
                continue;
            }
            trace!("RX: {} bytes", fill.read);

            if self.drain() {
                info!("Quit received");
                return ExitReason::Quit;
            }
        }
    }

    /// Apply every complete line; returns true on stop
    fn drain(&mut self) -> bool {
        let sink = &mut self.sink;
        let drained = self.buffer.drain(|command| {
            debug!("Command: {:?}", command);
            match sink.apply(command) {
                Ok(Outcome::Stop) => ControlFlow::Break(()),
                Ok(Outcome::Continue) => ControlFlow::Continue(()),
                Err(e) => {
                    warn!("Flip failed: {}", e);
                    ControlFlow::Continue(())
                }
            }
        });

        match drained {
            Drain::Stopped => true,
            Drain::Exhausted { commands, dropped } => {
                trace!("{} commands, {} bytes pending", commands, self.buffer.len());
                if dropped > 0 {
                    warn!("Overlong line, dropped {} bytes", dropped);
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use splash_display::{BufferedSurface, FlipPolicy, MemoryPanel, Point, Rgb888, Scene, Size};
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// One scripted pipe event
    #[derive(Debug, Clone)]
    enum Event {
        Wait(WaitOutcome<&'static str>),
        /// Raise the cancel flag and report an interrupted wait
        Signal,
        Data(Vec<u8>),
        Eof,
        ReadFails,
        WouldBlock,
    }

    /// Pipe replaying a fixed script of waits and reads
    struct ScriptedPipe {
        events: VecDeque<Event>,
        cancel: Arc<AtomicBool>,
        reopens: usize,
        fail_reopen: bool,
    }

    impl ScriptedPipe {
        fn new(events: impl IntoIterator<Item = Event>) -> Self {
            Self {
                events: events.into_iter().collect(),
                cancel: Arc::new(AtomicBool::new(false)),
                reopens: 0,
                fail_reopen: false,
            }
        }

        fn data(chunks: &[&[u8]]) -> Self {
            Self::new(chunks.iter().map(|c| Event::Data(c.to_vec())))
        }
    }

    impl CommandPipe for ScriptedPipe {
        type Error = &'static str;

        fn wait(&mut self, _timeout: Option<Duration>) -> WaitOutcome<Self::Error> {
            match self.events.front() {
                None => WaitOutcome::Failed("script exhausted"),
                Some(Event::Wait(outcome)) => {
                    let outcome = *outcome;
                    self.events.pop_front();
                    outcome
                }
                Some(Event::Signal) => {
                    self.events.pop_front();
                    self.cancel.store(true, Ordering::SeqCst);
                    WaitOutcome::Interrupted
                }
                Some(_) => WaitOutcome::Ready,
            }
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ReadError<Self::Error>> {
            match self.events.pop_front() {
                Some(Event::Data(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.events.push_front(Event::Data(bytes.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Event::Eof) => Ok(0),
                Some(Event::ReadFails) => Err(ReadError::Io("read failed")),
                Some(Event::WouldBlock) => Err(ReadError::WouldBlock),
                Some(other) => {
                    self.events.push_front(other);
                    Err(ReadError::WouldBlock)
                }
                None => Err(ReadError::WouldBlock),
            }
        }

        fn reopen(&mut self) -> Result<(), Self::Error> {
            self.reopens += 1;
            if self.fail_reopen {
                Err("reopen failed")
            } else {
                Ok(())
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Seen {
        Message(String),
        Progress(i32),
        Unknown,
        Quit,
    }

    /// Sink recording every command it is given
    #[derive(Default)]
    struct Recorder {
        seen: Vec<Seen>,
        fail: bool,
    }

    impl CommandSink for Recorder {
        type Error = &'static str;

        fn apply(&mut self, command: Command<'_>) -> Result<Outcome, Self::Error> {
            let (seen, outcome) = match command {
                Command::Message(text) => (Seen::Message(text.to_string()), Outcome::Continue),
                Command::Progress(value) => (Seen::Progress(value), Outcome::Continue),
                Command::Unknown => (Seen::Unknown, Outcome::Continue),
                Command::Quit => (Seen::Quit, Outcome::Stop),
            };
            self.seen.push(seen);
            if self.fail {
                return Err("flip failed");
            }
            Ok(outcome)
        }
    }

    fn run(pipe: ScriptedPipe) -> (ExitReason<&'static str>, ScriptedPipe, Recorder) {
        run_with(pipe, Recorder::default())
    }

    fn run_with(
        pipe: ScriptedPipe,
        recorder: Recorder,
    ) -> (ExitReason<&'static str>, ScriptedPipe, Recorder) {
        let cancel = pipe.cancel.clone();
        let mut ingest = IngestLoop::new(pipe, recorder, None);
        let reason = ingest.run(&cancel);
        let (pipe, recorder) = ingest.into_parts();
        (reason, pipe, recorder)
    }

    #[test]
    fn test_commands_split_across_reads() {
        let pipe = ScriptedPipe::data(&[b"MSG Boo", b"ting\nPROG", b"RESS 4", b"2\nQUIT\n"]);
        let (reason, _, recorder) = run(pipe);

        assert_eq!(reason, ExitReason::Quit);
        assert_eq!(
            recorder.seen,
            vec![
                Seen::Message("Booting".to_string()),
                Seen::Progress(42),
                Seen::Quit
            ]
        );
    }

    #[test]
    fn test_quit_ignores_trailing_bytes() {
        let pipe = ScriptedPipe::data(&[b"PROGRESS 10\nQUIT\nMSG never\nPROGRESS 99\n"]);
        let cancel = pipe.cancel.clone();
        let mut ingest = IngestLoop::new(pipe, Recorder::default(), None);

        assert_eq!(ingest.run(&cancel), ExitReason::Quit);
        assert_eq!(ingest.pending(), b"MSG never\nPROGRESS 99\n");

        let (_, recorder) = ingest.into_parts();
        assert_eq!(recorder.seen, vec![Seen::Progress(10), Seen::Quit]);
    }

    #[test]
    fn test_empty_lines_yield_nothing() {
        let pipe = ScriptedPipe::data(&[b"PROGRESS 1\n\n\nPROGRESS 2\n\0QUIT\n"]);
        let (reason, _, recorder) = run(pipe);

        assert_eq!(reason, ExitReason::Quit);
        assert_eq!(
            recorder.seen,
            vec![Seen::Progress(1), Seen::Progress(2), Seen::Quit]
        );
    }

    #[test]
    fn test_writer_close_reopens_and_keeps_partial_line() {
        let pipe = ScriptedPipe::new([
            Event::Data(b"MSG first\nMSG sec".to_vec()),
            Event::Eof,
            Event::Data(b"ond\nQUIT\n".to_vec()),
        ]);
        let (reason, pipe, recorder) = run(pipe);

        assert_eq!(reason, ExitReason::Quit);
        assert_eq!(pipe.reopens, 1);
        assert_eq!(
            recorder.seen,
            vec![
                Seen::Message("first".to_string()),
                Seen::Message("second".to_string()),
                Seen::Quit
            ]
        );
    }

    #[test]
    fn test_read_error_reopens() {
        let pipe = ScriptedPipe::new([
            Event::ReadFails,
            Event::WouldBlock,
            Event::Data(b"QUIT\n".to_vec()),
        ]);
        let (reason, pipe, _) = run(pipe);

        assert_eq!(reason, ExitReason::Quit);
        assert_eq!(pipe.reopens, 1);
    }

    #[test]
    fn test_reopen_failure_is_fatal() {
        let mut pipe = ScriptedPipe::new([Event::Eof, Event::Data(b"QUIT\n".to_vec())]);
        pipe.fail_reopen = true;
        let (reason, _, recorder) = run(pipe);

        assert_eq!(reason, ExitReason::ReopenFailed("reopen failed"));
        assert!(recorder.seen.is_empty());
    }

    #[test]
    fn test_interrupted_wait_is_retried() {
        let pipe = ScriptedPipe::new([
            Event::Wait(WaitOutcome::Interrupted),
            Event::Wait(WaitOutcome::Interrupted),
            Event::Data(b"PROGRESS 5\nQUIT\n".to_vec()),
        ]);
        let (reason, _, recorder) = run(pipe);

        assert_eq!(reason, ExitReason::Quit);
        assert_eq!(recorder.seen, vec![Seen::Progress(5), Seen::Quit]);
    }

    #[test]
    fn test_signal_cancels() {
        let pipe = ScriptedPipe::new([
            Event::Data(b"PROGRESS 5\n".to_vec()),
            Event::Signal,
            Event::Data(b"QUIT\n".to_vec()),
        ]);
        let (reason, _, recorder) = run(pipe);

        assert_eq!(reason, ExitReason::Cancelled);
        assert_eq!(recorder.seen, vec![Seen::Progress(5)]);
    }

    #[test]
    fn test_cancel_checked_before_waiting() {
        let pipe = ScriptedPipe::data(&[b"QUIT\n"]);
        let cancel = AtomicBool::new(true);
        let mut ingest = IngestLoop::new(pipe, Recorder::default(), None);

        assert_eq!(ingest.run(&cancel), ExitReason::Cancelled);
        assert!(ingest.into_parts().1.seen.is_empty());
    }

    #[test]
    fn test_timeout_stops() {
        let pipe = ScriptedPipe::new([
            Event::Data(b"MSG waiting\n".to_vec()),
            Event::Wait(WaitOutcome::TimedOut),
        ]);
        let (reason, _, recorder) = run(pipe);

        assert_eq!(reason, ExitReason::TimedOut);
        assert_eq!(recorder.seen, vec![Seen::Message("waiting".to_string())]);
    }

    #[test]
    fn test_wait_failure_is_fatal() {
        let pipe = ScriptedPipe::new([Event::Wait(WaitOutcome::Failed("EBADF"))]);
        let (reason, _, _) = run(pipe);
        assert_eq!(reason, ExitReason::WaitFailed("EBADF"));
    }

    #[test]
    fn test_sink_errors_do_not_stop_the_loop() {
        let pipe = ScriptedPipe::data(&[b"PROGRESS 1\nPROGRESS 2\n"]);
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let (reason, _, recorder) = run_with(pipe, recorder);

        // Ends only because the script ran out
        assert_eq!(reason, ExitReason::WaitFailed("script exhausted"));
        assert_eq!(recorder.seen, vec![Seen::Progress(1), Seen::Progress(2)]);
    }

    #[test]
    fn test_overlong_line_is_dropped() {
        let long = vec![b'x'; splash_protocol::LINE_BUFFER_SIZE + 100];
        let pipe = ScriptedPipe::new([
            Event::Data(b"MSG ".to_vec()),
            Event::Data(long),
            Event::Data(b"\nPROGRESS 7\nQUIT\n".to_vec()),
        ]);
        let (reason, _, recorder) = run(pipe);

        assert_eq!(reason, ExitReason::Quit);
        assert_eq!(recorder.seen, vec![Seen::Progress(7), Seen::Quit]);
    }

    #[test]
    fn test_drives_dispatcher() {
        let scene = Scene::default().with_bar_size(Size::new(100, 30));
        let surface = BufferedSurface::new(MemoryPanel::new(Size::new(160, 240)));
        let mut dispatcher = Dispatcher::new(surface, scene, FlipPolicy::Always);

        let pipe = ScriptedPipe::data(&[b"MSG hel", b"lo\nPROGRESS 50\nMSG hi\nQUIT\n"]);
        let cancel = AtomicBool::new(false);
        let mut ingest = IngestLoop::new(pipe, &mut dispatcher, None);
        assert_eq!(ingest.run(&cancel), ExitReason::Quit);
        drop(ingest);

        assert_eq!(dispatcher.status().message.as_str(), "hi");
        assert_eq!(dispatcher.status().progress, 50);

        let track = dispatcher.layout().bar_track();
        let canvas = dispatcher.surface().canvas();
        let left = canvas.pixel(track.top_left + Point::new(0, 1));
        assert_eq!(left, Some(Rgb888::new(0x6d, 0x6d, 0x70)));
    }

    proptest! {
        #[test]
        fn prop_read_boundaries_do_not_matter(
            values in proptest::collection::vec(-150i32..150, 1..20),
            cuts in proptest::collection::vec(0usize..400, 0..10),
        ) {
            let mut stream = Vec::new();
            for value in &values {
                stream.extend_from_slice(format!("PROGRESS {value}\nMSG step {value}\n").as_bytes());
            }
            stream.extend_from_slice(b"QUIT\n");

            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c % stream.len()).collect();
            cuts.sort_unstable();
            cuts.dedup();

            let mut chunks = Vec::new();
            let mut start = 0;
            for cut in cuts.into_iter().chain([stream.len()]) {
                if cut > start {
                    chunks.push(Event::Data(stream[start..cut].to_vec()));
                    start = cut;
                }
            }

            let (reason, _, chunked) = run(ScriptedPipe::new(chunks));
            let (_, _, whole) = run(ScriptedPipe::new([Event::Data(stream.clone())]));

            prop_assert_eq!(reason, ExitReason::Quit);
            prop_assert_eq!(chunked.seen.len(), values.len() * 2 + 1);
            prop_assert_eq!(chunked.seen, whole.seen);
        }
    }
}
