//! Property-based tests for the stream interpreter
//!
//! These tests verify key invariants hold across arbitrary envelope orders.

use super::*;
use crate::conversation::{ActivityUpdate, MessageId, Phase, StorePatch};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_urls() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("https://[a-z]{1,8}\\.com", 0..4)
}

fn arb_content() -> impl Strategy<Value = Envelope> {
    "[a-zA-Z .,]{0,12}".prop_map(|text| Envelope::ContentDelta { text })
}

fn arb_envelope() -> impl Strategy<Value = Envelope> {
    prop_oneof![
        3 => arb_content(),
        1 => "[a-z0-9-]{4,12}".prop_map(|checkpoint_id| Envelope::Continuity { checkpoint_id }),
        1 => "[a-z ]{1,16}".prop_map(|query| Envelope::SearchBegin { query }),
        1 => arb_urls().prop_map(|urls| Envelope::SearchResults { urls }),
        1 => "[a-z ]{1,16}".prop_map(|error| Envelope::SearchFailure { error }),
        1 => Just(Envelope::Terminal),
        1 => "[a-z]{3,8}".prop_map(|kind| Envelope::Unrecognized {
            kind,
            payload: serde_json::Value::Null,
        }),
    ]
}

/// Envelopes without `end`, so a stream never closes early
fn arb_open_envelope() -> impl Strategy<Value = Envelope> {
    arb_envelope().prop_filter("not terminal", |e| !matches!(e, Envelope::Terminal))
}

/// Raw payloads that never decode
fn arb_malformed_payload() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{0,20}"
            .prop_filter("not json", |s| serde_json::from_str::<serde_json::Value>(s).is_err()),
        Just(r#"{"type":"content","content":42}"#.to_string()),
        Just(r#"{"type":"search_results","urls":"<html>"}"#.to_string()),
        Just(r#"{"no_type":true}"#.to_string()),
        Just(r#"{"type":"checkpoint"}"#.to_string()),
    ]
}

fn fold(envelopes: &[Envelope]) -> (StreamState, Vec<Effect>) {
    let mut state = StreamState::new(MessageId(2));
    let mut effects = vec![];
    for envelope in envelopes {
        let result = interpret(&state, envelope.clone());
        state = result.new_state;
        effects.extend(result.effects);
    }
    (state, effects)
}

fn patches(effects: &[Effect]) -> impl Iterator<Item = &StorePatch> {
    effects.iter().filter_map(|e| match e {
        Effect::ApplyPatch(p) => Some(p),
        _ => None,
    })
}

fn phases_of(state: &StreamState) -> Vec<Phase> {
    state
        .activity
        .as_ref()
        .map(|a| a.phases.clone())
        .unwrap_or_default()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Final text is the in-order concatenation of every content fragment
    #[test]
    fn prop_text_is_concatenation(
        envelopes in proptest::collection::vec(arb_open_envelope(), 0..20)
    ) {
        let mut all = envelopes.clone();
        all.push(Envelope::Terminal);
        let (state, effects) = fold(&all);

        let expected: String = envelopes
            .iter()
            .filter_map(|e| match e {
                Envelope::ContentDelta { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(&state.running_text, &expected);

        let last = patches(&effects).last().expect("terminal always patches");
        prop_assert_eq!(last.text.as_deref(), Some(expected.as_str()));
        prop_assert!(!last.pending);
    }

    // Phases only grow, and every earlier trail is a prefix of the next
    #[test]
    fn prop_phases_append_only(envelopes in proptest::collection::vec(arb_envelope(), 0..25)) {
        let mut state = StreamState::new(MessageId(2));
        for envelope in envelopes {
            let before = phases_of(&state);
            state = interpret(&state, envelope).new_state;
            let after = phases_of(&state);
            prop_assert!(after.len() >= before.len());
            prop_assert_eq!(&after[..before.len()], &before[..]);
        }
    }

    // After an error phase, only writing may follow
    #[test]
    fn prop_nothing_but_writing_after_error(
        envelopes in proptest::collection::vec(arb_envelope(), 0..25)
    ) {
        let (state, _) = fold(&envelopes);
        let phases = phases_of(&state);
        if let Some(pos) = phases.iter().position(|p| *p == Phase::Error) {
            let tail = &phases[pos + 1..];
            prop_assert!(
                tail.iter().all(|p| *p == Phase::Writing),
                "trail after error: {:?}",
                tail
            );
            prop_assert!(tail.len() <= 1);
        }
    }

    // Terminal appends writing exactly once, however often it is delivered
    #[test]
    fn prop_terminal_writes_once(
        prefix in proptest::collection::vec(arb_open_envelope(), 0..15),
        repeats in 1usize..4,
    ) {
        let mut all = prefix;
        all.extend(std::iter::repeat(Envelope::Terminal).take(repeats));
        let (state, effects) = fold(&all);

        prop_assert!(state.is_closed());
        let writing = phases_of(&state).iter().filter(|p| **p == Phase::Writing).count();
        let expected = usize::from(state.activity.is_some());
        prop_assert_eq!(writing, expected);
        let closes = effects.iter().filter(|e| matches!(e, Effect::CloseConnection)).count();
        prop_assert_eq!(closes, 1);
    }

    // Closed sessions ignore everything
    #[test]
    fn prop_closed_state_is_inert(
        prefix in proptest::collection::vec(arb_open_envelope(), 0..10),
        late in arb_envelope(),
    ) {
        let mut all = prefix;
        all.push(Envelope::Terminal);
        let (closed, _) = fold(&all);

        let result = interpret(&closed, late);
        prop_assert!(result.effects.is_empty());
        prop_assert_eq!(result.new_state, closed);
    }

    // Search results right after search begin keep the searching phase
    #[test]
    fn prop_results_after_begin_keep_searching(query in "[a-z]{1,10}", urls in arb_urls()) {
        let (state, effects) = fold(&[
            Envelope::SearchBegin { query: query.clone() },
            Envelope::SearchResults { urls: urls.clone() },
        ]);
        let activity = state.activity.expect("activity present");
        prop_assert_eq!(activity.phases, vec![Phase::Searching, Phase::Reading]);
        prop_assert_eq!(activity.query, query);
        prop_assert_eq!(activity.sources, urls);
        let last = patches(&effects).last().expect("patched");
        prop_assert!(matches!(last.activity, ActivityUpdate::Replace(_)));
    }

    // A payload that fails to decode never reaches the interpreter, so the
    // accumulators are exactly what they were
    #[test]
    fn prop_malformed_payload_is_dropped(
        prefix in proptest::collection::vec(arb_open_envelope(), 0..10),
        raw in arb_malformed_payload(),
    ) {
        let (state, _) = fold(&prefix);
        prop_assert!(decode(&raw).is_err(), "payload decoded: {}", raw);
        let unchanged = match decode(&raw) {
            Ok(envelope) => interpret(&state, envelope).new_state,
            Err(_) => state.clone(),
        };
        prop_assert_eq!(unchanged, state);
    }

    // Every patch targets the session's message and clears pending
    #[test]
    fn prop_patches_target_session_message(
        envelopes in proptest::collection::vec(arb_envelope(), 0..20)
    ) {
        let (_, effects) = fold(&envelopes);
        for patch in patches(&effects) {
            prop_assert_eq!(patch.target, MessageId(2));
            prop_assert!(!patch.pending);
        }
    }
}
