use std::sync::Arc;

use super::{
    Call, expect_no_event, next_event, open_recording, options, prime_three_slide_deck,
    wait_until,
};
use crate::document::Document;
use crate::error::AppError;
use crate::event::DocumentEvent;
use crate::transport::SessionId;
use crate::transport::sim::{SimDeck, SimulatedViewer};

fn closes(calls: &[Call]) -> usize {
    calls
        .iter()
        .filter(|call| matches!(call, Call::Close(_)))
        .count()
}

#[test]
fn close_twice_sends_one_close() {
    let harness = open_recording(options());
    prime_three_slide_deck(&harness);

    harness.document.close();
    harness.document.close();
    assert!(harness.document.is_closed());
    assert_eq!(closes(&harness.transport.calls()), 1);
    assert!(
        harness
            .transport
            .calls()
            .contains(&Call::Close(SessionId(7)))
    );
}

#[test]
fn repeated_shutdown_signals_closed_once() {
    let harness = open_recording(options());
    prime_three_slide_deck(&harness);

    harness.document.close();
    harness.transport.notify(6, 0);
    harness.transport.notify(6, 0);
    assert!(matches!(next_event(&harness.events), DocumentEvent::Closed));
    expect_no_event(&harness.events);
}

#[test]
fn unmapped_slide_after_loading_raises_one_error() {
    let harness = open_recording(options());
    prime_three_slide_deck(&harness);

    harness.transport.notify(4, 99);
    match next_event(&harness.events) {
        DocumentEvent::Error(err) => {
            assert!(matches!(*err, AppError::ProtocolViolation { physical_id: 99 }));
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert!(harness.document.is_closed());
    assert_eq!(closes(&harness.transport.calls()), 1);

    harness.transport.notify(4, 98);
    expect_no_event(&harness.events);
}

#[test]
fn navigation_after_close_fails_fast() {
    let harness = open_recording(options());
    prime_three_slide_deck(&harness);
    harness.document.close();

    assert!(matches!(
        harness.document.step_forward(),
        Err(AppError::DocumentClosed)
    ));
    assert!(matches!(
        harness.document.goto_slide(1),
        Err(AppError::DocumentClosed)
    ));
    assert!(matches!(harness.document.hide(), Err(AppError::DocumentClosed)));
    assert!(matches!(
        harness.document.capture_window(0),
        Err(AppError::DocumentClosed)
    ));
}

#[test]
fn close_before_loading_is_honoured() {
    let harness = open_recording(options());
    harness.transport.notify(1, 0x10);
    harness.document.close();

    assert!(matches!(harness.document.blank(), Err(AppError::DocumentClosed)));
    assert_eq!(closes(&harness.transport.calls()), 1);

    // the viewer keeps reporting until it has shut down; nothing is walked
    harness.transport.notify(2, 0x11);
    harness.transport.notify(4, 5);
    harness.transport.notify(4, 0);
    harness.transport.notify(6, 0);
    assert!(matches!(next_event(&harness.events), DocumentEvent::Closed));
    assert_eq!(harness.transport.step_backs(), 0);
}

#[test]
fn user_closing_the_window_closes_the_document() {
    let harness = open_recording(options());
    prime_three_slide_deck(&harness);

    harness.transport.notify(5, 0);
    wait_until(|| harness.document.is_closed());
    assert_eq!(closes(&harness.transport.calls()), 1);

    harness.transport.notify(6, 0);
    assert!(matches!(next_event(&harness.events), DocumentEvent::Closed));
}

#[test]
fn simulated_user_close_reaches_closed() {
    let deck = SimDeck::from_ids_and_steps(&[5, 7], &[]).expect("deck");
    let viewer = Arc::new(SimulatedViewer::new(deck));
    let document = Document::open(viewer.clone(), viewer.clone(), "viewer deck.pptx", options())
        .expect("simulated viewer opens");
    let events = document.subscribe();
    assert!(matches!(next_event(&events), DocumentEvent::Loaded));
    assert!(matches!(next_event(&events), DocumentEvent::SlideChanged { slide: 0 }));

    viewer.user_close();
    assert!(matches!(next_event(&events), DocumentEvent::Closed));
    assert!(document.is_closed());
    wait_until(|| viewer.snapshot().closed);
}

#[test]
fn dropping_the_document_closes_the_viewer() {
    let deck = SimDeck::from_ids_and_steps(&[5, 7], &[]).expect("deck");
    let viewer = Arc::new(SimulatedViewer::new(deck));
    {
        let document =
            Document::open(viewer.clone(), viewer.clone(), "viewer deck.pptx", options())
                .expect("simulated viewer opens");
        let events = document.subscribe();
        assert!(matches!(next_event(&events), DocumentEvent::Loaded));
    }
    wait_until(|| viewer.snapshot().closed);

    // a closed viewer accepts the next session
    let reopened = Document::open(viewer.clone(), viewer.clone(), "viewer deck.pptx", options())
        .expect("viewer reopens");
    let events = reopened.subscribe();
    assert!(matches!(next_event(&events), DocumentEvent::Loaded));
    assert_eq!(reopened.session_id(), Some(SessionId(1)));
}
