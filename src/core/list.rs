//! Folds `list.start / list.item* / list.end` runs into one list mutation.

use crate::op::{OpKind, Operation};

/// Style hint used when a list run does not name one.
pub const DEFAULT_LIST_STYLE: &str = "List Bullet";

/// One unit of work for the document mutator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// A single non-list operation, applied as-is.
    Apply(Operation),
    /// A whole list, inserted contiguously in item order.
    InsertList {
        /// Item texts, in arrival order.
        items: Vec<String>,
        /// Preferred style name for every item.
        style: String,
    },
}

/// Accumulator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListState {
    /// No list run open.
    #[default]
    Idle,
    /// Buffering items of an open run.
    Accumulating,
}

/// List run state machine.
#[derive(Debug, Default)]
pub struct ListAccumulator {
    state: ListState,
    style: Option<String>,
    items: Vec<String>,
}

impl ListAccumulator {
    /// Creates an idle accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ListState {
        self.state
    }

    /// Feeds one operation, returning the mutations it releases in order.
    pub fn push(&mut self, op: Operation) -> Vec<Mutation> {
        match op.kind {
            OpKind::ListStart => {
                // A second start closes the previous run instead of dropping it.
                let out = self.flush().into_iter().collect();
                self.state = ListState::Accumulating;
                self.style = op.style;
                out
            }
            OpKind::ListItem => {
                if self.state == ListState::Idle {
                    tracing::debug!("list.item outside a list run, opening one implicitly");
                    self.state = ListState::Accumulating;
                }
                self.items.push(op.text().trim().to_string());
                Vec::new()
            }
            OpKind::ListEnd => self.flush().into_iter().collect(),
            _ => {
                let mut out: Vec<Mutation> = self.flush().into_iter().collect();
                out.push(Mutation::Apply(op));
                out
            }
        }
    }

    /// Closes any open run at a batch boundary.
    pub fn finish(&mut self) -> Option<Mutation> {
        self.flush()
    }

    fn flush(&mut self) -> Option<Mutation> {
        let items = std::mem::take(&mut self.items);
        let style = self.style.take();
        let was_open = self.state == ListState::Accumulating;
        self.state = ListState::Idle;

        if !was_open || items.is_empty() {
            return None;
        }
        Some(Mutation::InsertList {
            items,
            style: style.unwrap_or_else(|| DEFAULT_LIST_STYLE.to_string()),
        })
    }
}

/// Plans a whole batch, closing any trailing run.
pub fn plan(ops: impl IntoIterator<Item = Operation>) -> Vec<Mutation> {
    let mut acc = ListAccumulator::new();
    let mut out = Vec::new();
    for op in ops {
        out.extend(acc.push(op));
    }
    out.extend(acc.finish());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str) -> Operation {
        Operation::new(OpKind::ListItem).with_text(text)
    }

    #[test]
    fn run_becomes_one_list_in_order() {
        let out = plan(vec![
            Operation::new(OpKind::ListStart).with_style("Checklist"),
            item(" a "),
            item("b"),
            item("c"),
            Operation::new(OpKind::ListEnd),
        ]);
        assert_eq!(
            out,
            vec![Mutation::InsertList {
                items: vec!["a".into(), "b".into(), "c".into()],
                style: "Checklist".into(),
            }]
        );
    }

    #[test]
    fn non_list_op_flushes_before_itself() {
        let out = plan(vec![
            Operation::new(OpKind::ListStart),
            item("a"),
            Operation::paragraph("after"),
        ]);
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Mutation::InsertList { items, style } if items == &["a"] && style == DEFAULT_LIST_STYLE));
        assert_eq!(out[1], Mutation::Apply(Operation::paragraph("after")));
    }

    #[test]
    fn empty_run_emits_nothing_and_resets() {
        let mut acc = ListAccumulator::new();
        assert!(acc.push(Operation::new(OpKind::ListStart)).is_empty());
        assert_eq!(acc.state(), ListState::Accumulating);
        assert!(acc.push(Operation::new(OpKind::ListEnd)).is_empty());
        assert_eq!(acc.state(), ListState::Idle);
    }

    #[test]
    fn item_while_idle_opens_a_run() {
        let out = plan(vec![item("loose"), Operation::new(OpKind::ListEnd)]);
        assert!(matches!(&out[..], [Mutation::InsertList { items, .. }] if items == &["loose"]));
    }

    #[test]
    fn trailing_run_is_closed_by_plan() {
        let out = plan(vec![Operation::new(OpKind::ListStart), item("x")]);
        assert_eq!(out.len(), 1);
    }
}
