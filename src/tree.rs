use crate::orm::messages;
use std::collections::HashMap;

/// A message with its direct replies, in chronological order.
#[derive(Debug, PartialEq)]
pub struct MessageNode {
    pub message: messages::Model,
    pub replies: Vec<MessageNode>,
}

/// One line of the rendered thread: a message and its nesting depth.
#[derive(Debug, PartialEq)]
pub struct MessageRow {
    pub depth: usize,
    pub message: messages::Model,
}

/// Builds the reply forest for a single subject.
///
/// Input rows must already be sorted by creation time ascending (the store
/// query does this); both the root list and every reply list come out in
/// that order. A message whose parent_id is absent from the input, or names
/// the message itself, is promoted to the root list.
pub fn build_reply_forest(rows: Vec<messages::Model>) -> Vec<MessageNode> {
    // Pass 1: position of every id in the chronological input.
    let index: HashMap<i32, usize> = rows
        .iter()
        .enumerate()
        .map(|(pos, row)| (row.id, pos))
        .collect();

    // Pass 2: record each message as either a root or a reply edge, still in
    // chronological order. The lookup is scoped to this subject's rows, so a
    // cross-subject parent resolves the same as a deleted one.
    let mut reply_edges: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots: Vec<usize> = Vec::new();
    for (pos, row) in rows.iter().enumerate() {
        match row.parent_id.and_then(|id| index.get(&id).copied()) {
            Some(parent) if parent != pos => reply_edges[parent].push(pos),
            _ => roots.push(pos),
        }
    }

    // Assemble owned nodes from the recorded edges. Depth-first with an
    // explicit stack so reply depth never grows the call stack; a node is
    // moved into its parent once all of its descendants have been moved
    // into it. Messages on a parent cycle are unreachable from any root and
    // simply drop out here.
    let mut slots: Vec<Option<MessageNode>> = rows
        .into_iter()
        .map(|message| {
            Some(MessageNode {
                message,
                replies: Vec::new(),
            })
        })
        .collect();

    enum Step {
        Enter(usize, Option<usize>),
        Exit(usize, Option<usize>),
    }

    let mut forest: Vec<MessageNode> = Vec::with_capacity(roots.len());
    let mut stack: Vec<Step> = roots
        .iter()
        .rev()
        .map(|&pos| Step::Enter(pos, None))
        .collect();

    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(pos, parent) => {
                stack.push(Step::Exit(pos, parent));
                for &reply in reply_edges[pos].iter().rev() {
                    stack.push(Step::Enter(reply, Some(pos)));
                }
            }
            Step::Exit(pos, parent) => {
                if let Some(node) = slots[pos].take() {
                    match parent.and_then(|p| slots[p].as_mut()) {
                        Some(parent_node) => parent_node.replies.push(node),
                        None => forest.push(node),
                    }
                }
            }
        }
    }

    forest
}

/// Flattens a forest into pre-order `(depth, message)` rows for sequential
/// rendering. Iterative for the same reason as the builder.
pub fn flatten_forest(forest: Vec<MessageNode>) -> Vec<MessageRow> {
    let mut rows = Vec::new();
    let mut stack: Vec<(usize, MessageNode)> =
        forest.into_iter().rev().map(|node| (0, node)).collect();

    while let Some((depth, node)) = stack.pop() {
        let MessageNode { message, replies } = node;
        rows.push(MessageRow { depth, message });
        for reply in replies.into_iter().rev() {
            stack.push((depth + 1, reply));
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn message(id: i32, parent_id: Option<i32>, minute: u32) -> messages::Model {
        messages::Model {
            id,
            subject_id: 1,
            parent_id,
            user_id: 1,
            author: "alice".to_owned(),
            content: format!("message {}", id),
            created_at: NaiveDate::from_ymd_opt(2024, 5, 17)
                .unwrap()
                .and_hms_opt(12, minute, 0)
                .unwrap(),
        }
    }

    fn ids(nodes: &[MessageNode]) -> Vec<i32> {
        nodes.iter().map(|n| n.message.id).collect()
    }

    #[test]
    fn test_nested_replies() {
        // 1 ── 2 ── 4
        //   └─ 3
        let forest = build_reply_forest(vec![
            message(1, None, 0),
            message(2, Some(1), 1),
            message(3, Some(1), 2),
            message(4, Some(2), 3),
        ]);

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].replies), vec![2, 3]);
        assert_eq!(ids(&forest[0].replies[0].replies), vec![4]);
        assert!(forest[0].replies[0].replies[0].replies.is_empty());
        assert!(forest[0].replies[1].replies.is_empty());
    }

    #[test]
    fn test_dangling_parent_promotes_to_root() {
        let forest = build_reply_forest(vec![message(1, None, 0), message(2, Some(99), 1)]);

        assert_eq!(ids(&forest), vec![1, 2]);
        assert!(forest[0].replies.is_empty());
        assert!(forest[1].replies.is_empty());
    }

    #[test]
    fn test_empty_subject() {
        assert!(build_reply_forest(Vec::new()).is_empty());
    }

    #[test]
    fn test_chronological_order_is_preserved() {
        let forest = build_reply_forest(vec![
            message(10, None, 0),
            message(11, None, 1),
            message(12, Some(10), 2),
            message(13, Some(11), 3),
            message(14, Some(10), 4),
            message(15, None, 5),
        ]);

        assert_eq!(ids(&forest), vec![10, 11, 15]);
        assert_eq!(ids(&forest[0].replies), vec![12, 14]);
        assert_eq!(ids(&forest[1].replies), vec![13]);
    }

    #[test]
    fn test_reply_created_before_its_parent_still_attaches() {
        // Malformed input order: the reply row precedes its parent row.
        let forest = build_reply_forest(vec![message(2, Some(1), 0), message(1, None, 1)]);

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].replies), vec![2]);
    }

    #[test]
    fn test_self_referential_parent_renders_at_top_level() {
        let forest = build_reply_forest(vec![message(1, Some(1), 0), message(2, Some(1), 1)]);

        assert_eq!(ids(&forest), vec![1]);
        assert_eq!(ids(&forest[0].replies), vec![2]);
    }

    #[test]
    fn test_flatten_contains_every_message_exactly_once() {
        let input = vec![
            message(1, None, 0),
            message(2, Some(1), 1),
            message(3, Some(1), 2),
            message(4, Some(2), 3),
            message(5, Some(99), 4),
        ];

        let rows = flatten_forest(build_reply_forest(input));
        let mut seen: Vec<i32> = rows.iter().map(|r| r.message.id).collect();
        seen.sort_unstable();

        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_flatten_preorder_and_depth() {
        let rows = flatten_forest(build_reply_forest(vec![
            message(1, None, 0),
            message(2, Some(1), 1),
            message(3, Some(1), 2),
            message(4, Some(2), 3),
        ]));

        let shape: Vec<(i32, usize)> = rows.iter().map(|r| (r.message.id, r.depth)).collect();
        assert_eq!(shape, vec![(1, 0), (2, 1), (4, 2), (3, 1)]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let input = vec![
            message(1, None, 0),
            message(2, Some(1), 1),
            message(3, Some(99), 2),
        ];

        assert_eq!(
            build_reply_forest(input.clone()),
            build_reply_forest(input)
        );
    }

    #[test]
    fn test_deep_thread_does_not_overflow_the_stack() {
        let mut input = vec![message(1, None, 0)];
        for id in 2..=10_000 {
            input.push(message(id, Some(id - 1), 1));
        }

        let rows = flatten_forest(build_reply_forest(input));
        assert_eq!(rows.len(), 10_000);
        assert_eq!(rows.last().map(|r| (r.message.id, r.depth)), Some((10_000, 9_999)));
    }
}
