mod lifecycle;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::capture::{RgbaFrame, WindowCapture};
use crate::error::{AppError, AppResult};
use crate::event::DocumentEvent;
use crate::transport::{
    InputMessage, NotificationSink, OpenRequest, SessionId, Transport, WindowHandle, WindowRect,
    WireMessage,
};

use super::{Document, OpenOptions};

const PRIMARY: i32 = 0x10;
const SECONDARY: i32 = 0x11;
const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Open { command: String, rect: WindowRect },
    Close(SessionId),
    Post(WindowHandle, InputMessage),
    Send(WindowHandle, InputMessage),
    Move(WindowHandle, WindowRect),
    Foreground(WindowHandle),
}

/// Records every transport call and lets the test play the viewer by
/// injecting notifications.
#[derive(Default)]
struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    sink: Mutex<Option<NotificationSink>>,
    open_error: Mutex<Option<AppError>>,
}

impl RecordingTransport {
    fn failing(err: AppError) -> Self {
        Self {
            open_error: Mutex::new(Some(err)),
            ..Self::default()
        }
    }

    fn notify(&self, code: i32, param: i32) {
        let sink = self.sink.lock().expect("sink lock").clone();
        sink.expect("document should be open").deliver(code, param);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn clear(&self) {
        self.calls.lock().expect("calls lock").clear();
    }

    fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn step_backs(&self) -> usize {
        self.count(|call| matches!(call, Call::Post(_, message) if *message == InputMessage::step_back()))
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

fn decoded(message: WireMessage) -> InputMessage {
    InputMessage::decode(message).expect("document only sends known messages")
}

impl Transport for RecordingTransport {
    fn open(&self, request: &OpenRequest, sink: NotificationSink) -> AppResult<SessionId> {
        if let Some(err) = self.open_error.lock().expect("open error lock").take() {
            return Err(err);
        }
        *self.sink.lock().expect("sink lock") = Some(sink);
        self.record(Call::Open {
            command: request.command.clone(),
            rect: request.rect,
        });
        Ok(SessionId(7))
    }

    fn close(&self, session: SessionId) {
        self.record(Call::Close(session));
    }

    fn post_command(&self, window: WindowHandle, message: WireMessage) {
        self.record(Call::Post(window, decoded(message)));
    }

    fn send_command(&self, window: WindowHandle, message: WireMessage) -> isize {
        self.record(Call::Send(window, decoded(message)));
        0
    }

    fn move_window(&self, window: WindowHandle, rect: WindowRect) {
        self.record(Call::Move(window, rect));
    }

    fn set_foreground(&self, window: WindowHandle) {
        self.record(Call::Foreground(window));
    }
}

/// Tints each capture with its 1-based sequence number.
#[derive(Default)]
struct CountingCapture {
    grabs: AtomicU8,
}

impl WindowCapture for CountingCapture {
    fn grab(&self, _window: WindowHandle) -> AppResult<RgbaFrame> {
        let n = self.grabs.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RgbaFrame::solid(8, 6, [n, 0, 0, 0xff]))
    }
}

struct FailingCapture;

impl WindowCapture for FailingCapture {
    fn grab(&self, _window: WindowHandle) -> AppResult<RgbaFrame> {
        Err(AppError::capture("window vanished"))
    }
}

fn rect() -> WindowRect {
    WindowRect::new(10, 20, 64, 48)
}

fn options() -> OpenOptions {
    let mut options = OpenOptions::new(rect()).thumbnail_width(0);
    options.input.key_pause_ms = 0;
    options
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT;
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(2));
    }
}

fn next_event(events: &flume::Receiver<DocumentEvent>) -> DocumentEvent {
    events.recv_timeout(WAIT).expect("document event expected")
}

fn expect_no_event(events: &flume::Receiver<DocumentEvent>) {
    if let Ok(event) = events.recv_timeout(Duration::from_millis(100)) {
        panic!("unexpected event {event:?}");
    }
}

struct Harness {
    transport: Arc<RecordingTransport>,
    document: Document,
    events: flume::Receiver<DocumentEvent>,
}

fn open_recording(options: OpenOptions) -> Harness {
    open_with_capture(options, Arc::new(CountingCapture::default()))
}

fn open_with_capture(options: OpenOptions, capture: Arc<dyn WindowCapture>) -> Harness {
    let transport = Arc::new(RecordingTransport::default());
    let document = Document::open(transport.clone(), capture, "viewer deck.pptx", options)
        .expect("recording transport opens");
    let events = document.subscribe();
    Harness {
        transport,
        document,
        events,
    }
}

/// Plays a three slide deck without animations (ids 5, 7, 9) through
/// the whole priming pass.
fn prime_three_slide_deck(harness: &Harness) {
    let transport = &harness.transport;
    transport.notify(1, PRIMARY);
    transport.notify(2, SECONDARY);
    for id in [5, 7, 9] {
        transport.notify(4, id);
        transport.notify(3, 0);
    }
    transport.notify(4, 0);
    wait_until(|| transport.step_backs() == 1);

    transport.notify(4, 9);
    wait_until(|| transport.step_backs() == 2);
    transport.notify(4, 7);
    wait_until(|| transport.step_backs() == 3);
    transport.notify(4, 5);

    assert!(matches!(next_event(&harness.events), DocumentEvent::Loaded));
    assert!(matches!(
        next_event(&harness.events),
        DocumentEvent::SlideChanged { slide: 0 }
    ));
}

fn primary() -> WindowHandle {
    WindowHandle(PRIMARY as isize)
}

fn secondary() -> WindowHandle {
    WindowHandle(SECONDARY as isize)
}
