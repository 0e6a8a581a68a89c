//! Expression DAG nodes.
//!
//! Nodes are immutable and shared through [`Arc`], so a sub-expression used
//! in several places is a single allocation. Every node caches its
//! fingerprint at construction time; traversals use it to visit a shared
//! node only once.
use std::{collections::HashSet, sync::Arc};

use smallvec::SmallVec;

use crate::{
    fingerprint::{Fingerprint, FingerprintHasher},
    operator::OperatorPtr,
    value::Value,
};

pub type ExprNodePtr = Arc<ExprNode>;

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A constant.
    Literal(Value),
    /// An input of the expression, bound at evaluation time.
    Leaf(String),
    /// A named hole, substituted when the expression is used as a lambda body.
    Placeholder(String),
    /// Operator application.
    Operator {
        op: OperatorPtr,
        deps: SmallVec<ExprNodePtr, 2>,
    },
}

pub struct ExprNode {
    kind: ExprKind,
    fingerprint: Fingerprint,
}

impl ExprNode {
    pub fn literal(value: impl Into<Value>) -> ExprNodePtr {
        let value = value.into();
        let fingerprint = FingerprintHasher::new("::hyexpr::ExprNode::Literal")
            .combine_fingerprint(value.fingerprint())
            .finish();
        Arc::new(Self {
            kind: ExprKind::Literal(value),
            fingerprint,
        })
    }

    pub fn leaf(key: impl Into<String>) -> ExprNodePtr {
        let key = key.into();
        let fingerprint = FingerprintHasher::new("::hyexpr::ExprNode::Leaf")
            .combine(&key)
            .finish();
        Arc::new(Self {
            kind: ExprKind::Leaf(key),
            fingerprint,
        })
    }

    pub fn placeholder(key: impl Into<String>) -> ExprNodePtr {
        let key = key.into();
        let fingerprint = FingerprintHasher::new("::hyexpr::ExprNode::Placeholder")
            .combine(&key)
            .finish();
        Arc::new(Self {
            kind: ExprKind::Placeholder(key),
            fingerprint,
        })
    }

    /// Apply `op` to `deps`. No arity or type checking happens here.
    pub fn call_op(
        op: OperatorPtr,
        deps: impl IntoIterator<Item = ExprNodePtr>,
    ) -> ExprNodePtr {
        let deps: SmallVec<ExprNodePtr, 2> = deps.into_iter().collect();
        let fingerprint = FingerprintHasher::new("::hyexpr::ExprNode::Operator")
            .combine_fingerprint(op.fingerprint())
            .combine_all(deps.iter().map(|dep| dep.fingerprint))
            .finish();
        Arc::new(Self {
            kind: ExprKind::Operator { op, deps },
            fingerprint,
        })
    }

    #[inline]
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    #[inline]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Direct dependencies; empty unless this is an operator node.
    pub fn deps(&self) -> &[ExprNodePtr] {
        match &self.kind {
            ExprKind::Operator { deps, .. } => &deps[..],
            _ => &[],
        }
    }

    pub fn op(&self) -> Option<&OperatorPtr> {
        match &self.kind {
            ExprKind::Operator { op, .. } => Some(op),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_))
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, ExprKind::Leaf(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, ExprKind::Placeholder(_))
    }

    pub fn is_op(&self) -> bool {
        matches!(self.kind, ExprKind::Operator { .. })
    }

    /// Sorted, deduplicated leaf keys reachable from this node.
    pub fn leaf_keys(self: &Arc<Self>) -> Vec<String> {
        collect_keys(self, |kind| match kind {
            ExprKind::Leaf(key) => Some(key),
            _ => None,
        })
    }

    /// Sorted, deduplicated placeholder keys reachable from this node.
    pub fn placeholder_keys(self: &Arc<Self>) -> Vec<String> {
        collect_keys(self, |kind| match kind {
            ExprKind::Placeholder(key) => Some(key),
            _ => None,
        })
    }
}

fn collect_keys(root: &ExprNodePtr, select: impl Fn(&ExprKind) -> Option<&String>) -> Vec<String> {
    let mut keys: Vec<String> = post_order(root)
        .iter()
        .filter_map(|node| select(node.kind()).cloned())
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Nodes reachable from `root`, dependencies before dependents, each
/// distinct fingerprint exactly once. `root` is always last.
///
/// The walk is iterative, like [`Drop`] and [`Display`](std::fmt::Display)
/// for nodes, so deep chains do not exhaust the stack.
pub fn post_order(root: &ExprNodePtr) -> Vec<ExprNodePtr> {
    enum Frame<'a> {
        Enter(&'a ExprNodePtr),
        Exit(&'a ExprNodePtr),
    }

    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![Frame::Enter(root)];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Enter(node) => {
                if visited.contains(&node.fingerprint) {
                    continue;
                }
                stack.push(Frame::Exit(node));
                // Reversed so that deps are visited left to right.
                for dep in node.deps().iter().rev() {
                    if !visited.contains(&dep.fingerprint) {
                        stack.push(Frame::Enter(dep));
                    }
                }
            }
            Frame::Exit(node) => {
                // A node may have been scheduled twice before its first exit.
                if visited.insert(node.fingerprint) {
                    order.push(node.clone());
                }
            }
        }
    }

    order
}

impl Drop for ExprNode {
    fn drop(&mut self) {
        let ExprKind::Operator { deps, .. } = &mut self.kind else {
            return;
        };
        // Detach uniquely owned dependencies so that dropping them does not recurse.
        let mut stack: Vec<ExprNodePtr> = std::mem::take(deps).into_iter().collect();
        while let Some(node) = stack.pop() {
            if let Ok(mut node) = Arc::try_unwrap(node) {
                if let ExprKind::Operator { deps, .. } = &mut node.kind {
                    stack.extend(std::mem::take(deps));
                }
            }
        }
    }
}

impl std::fmt::Display for ExprNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        enum Item<'a> {
            Node(&'a ExprNode),
            Separator,
            Close,
        }

        let mut stack = vec![Item::Node(self)];
        while let Some(item) = stack.pop() {
            match item {
                Item::Separator => f.write_str(", ")?,
                Item::Close => f.write_str(")")?,
                Item::Node(node) => match &node.kind {
                    ExprKind::Literal(value) => write!(f, "{}", value)?,
                    ExprKind::Leaf(key) => write!(f, "L.{}", key)?,
                    ExprKind::Placeholder(key) => write!(f, "P.{}", key)?,
                    ExprKind::Operator { op, deps } => {
                        write!(f, "{}(", op.display_name())?;
                        stack.push(Item::Close);
                        for (i, dep) in deps.iter().enumerate().rev() {
                            stack.push(Item::Node(dep));
                            if i > 0 {
                                stack.push(Item::Separator);
                            }
                        }
                    }
                },
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExprNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExprNode")
            .field("fingerprint", &self.fingerprint)
            .field("expr", &format_args!("{}", self))
            .finish()
    }
}
