//! Property tests for plain scalars and stream lookahead.

use libyaml12::{parse, CharStream, Context, MultiLine, PlainScalar, ScalarStyle};
use proptest::prelude::*;

/// One-line plain values: no indicators at either end, no `: ` or ` #`.
fn plain_value() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9]([a-zA-Z0-9_.,/()-]| [a-zA-Z0-9]){0,24}"
}

/// Lookahead requests: `peek_at(k)` or `peek_line_at(k)`.
#[derive(Debug, Clone)]
enum Lookahead {
    Char(usize),
    Line(usize),
}

fn lookahead() -> impl Strategy<Value = Lookahead> {
    prop_oneof![
        (0usize..64).prop_map(Lookahead::Char),
        (0usize..64).prop_map(Lookahead::Line),
    ]
}

proptest! {
    #[test]
    fn plain_scalar_round_trips(value in plain_value()) {
        let mut scalar = PlainScalar::new(Context::BlockOut, 0);
        let result = scalar.process_first_line(&value).unwrap();
        prop_assert_eq!(result.consumed, value.chars().count());
        prop_assert_eq!(scalar.into_value(), value.clone());

        let stream = parse(&format!("{}\n", value)).unwrap();
        let root = stream.documents()[0].root().unwrap();
        prop_assert_eq!(root.as_str(), Some(value.as_str()));
        prop_assert!(matches!(
            &root.kind,
            libyaml12::NodeKind::Scalar(s) if s.style == ScalarStyle::Plain
        ));
    }

    #[test]
    fn lookahead_leaves_position_unchanged(
        input in "[a-z #:\n-]{0,48}",
        skip in 0usize..8,
        requests in prop::collection::vec(lookahead(), 0..16),
    ) {
        let mut stream = CharStream::from_text(&input);
        stream.advance_by(skip).unwrap();
        let before = stream.mark();
        let first = stream.peek().unwrap();
        let line = stream.peek_line().unwrap();

        for request in &requests {
            match *request {
                Lookahead::Char(k) => {
                    stream.peek_at(k).unwrap();
                }
                Lookahead::Line(k) => {
                    stream.peek_line_at(k).unwrap();
                }
            }
            prop_assert_eq!(stream.mark(), before);
        }

        prop_assert_eq!(stream.peek_line().unwrap(), line);
        prop_assert_eq!(stream.read().unwrap(), first);
        if first.is_some() {
            prop_assert_eq!(stream.position(), before.index + 1);
        }
    }
}
