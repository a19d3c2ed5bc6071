use std::time::{Duration, Instant};

use proptest::prelude::*;

use docops::{
    core::{
        dedup::{DedupFilter, signature},
        list::{DEFAULT_LIST_STYLE, Mutation, plan},
    },
    engine::ack::count_applied_ops,
    op::{OpKind, Operation},
};

#[derive(Debug, Clone)]
enum Step {
    Para(u8),
    Anchor(u8),
    Start,
    Item(u8),
    End,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0u8..16).prop_map(Step::Para),
        (0u8..4).prop_map(Step::Anchor),
        Just(Step::Start),
        (0u8..16).prop_map(Step::Item),
        Just(Step::End),
    ]
}

fn to_op(step: &Step) -> Operation {
    match step {
        Step::Para(n) => Operation::paragraph(format!("p{n}")),
        Step::Anchor(n) => Operation::paragraph(format!("<A{n}>")),
        Step::Start => Operation::new(OpKind::ListStart),
        Step::Item(n) => Operation::new(OpKind::ListItem).with_text(format!("i{n}")),
        Step::End => Operation::new(OpKind::ListEnd),
    }
}

/// Texts in the order the mutator would write them.
fn flatten(mutations: &[Mutation]) -> Vec<String> {
    let mut out = Vec::new();
    for m in mutations {
        match m {
            Mutation::Apply(op) => out.push(op.text().to_string()),
            Mutation::InsertList { items, .. } => out.extend(items.iter().cloned()),
        }
    }
    out
}

proptest! {
    #[test]
    fn planning_preserves_content_order(steps in prop::collection::vec(step_strategy(), 0..64)) {
        let ops: Vec<Operation> = steps.iter().map(to_op).collect();
        let expected: Vec<String> = ops
            .iter()
            .filter(|op| !op.kind.is_list_structure())
            .map(|op| op.text().to_string())
            .collect();

        let planned = plan(ops.clone());
        prop_assert_eq!(flatten(&planned), expected);

        for m in &planned {
            match m {
                Mutation::InsertList { items, style } => {
                    prop_assert!(!items.is_empty());
                    prop_assert_eq!(style.as_str(), DEFAULT_LIST_STYLE);
                }
                Mutation::Apply(op) => prop_assert!(!op.kind.is_list()),
            }
        }

        // Counting is independent of planning: one per non-structural, non-anchor op.
        let anchors = steps.iter().filter(|s| matches!(s, Step::Anchor(_))).count();
        let structure = steps.iter().filter(|s| matches!(s, Step::Start | Step::End)).count();
        prop_assert_eq!(count_applied_ops(&ops), steps.len() - anchors - structure);
    }

    #[test]
    fn dedup_admits_each_signature_once_per_window(
        texts in prop::collection::vec(0u8..8, 1..64),
        gaps in prop::collection::vec(0u64..40, 64),
    ) {
        let window = Duration::from_millis(100);
        let mut filter = DedupFilter::new(window);
        let mut model: std::collections::HashMap<String, Instant> = std::collections::HashMap::new();
        let mut now = Instant::now();

        for (i, t) in texts.iter().enumerate() {
            now += Duration::from_millis(gaps[i]);
            let op = Operation::paragraph(format!("t{t}"));
            let sig = signature(&op);

            let expected = model.get(&sig).is_some_and(|last| now.duration_since(*last) < window);
            if !expected {
                model.insert(sig, now);
            }
            prop_assert_eq!(filter.should_suppress_at(&op, now), expected);
        }
    }

    #[test]
    fn anchors_are_never_suppressed(n in 1usize..32) {
        let mut filter = DedupFilter::default();
        let now = Instant::now();
        for _ in 0..n {
            prop_assert!(!filter.should_suppress_at(&Operation::paragraph("<BLOCK:1>"), now));
        }
        prop_assert!(filter.is_empty());
    }
}
