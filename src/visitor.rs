//! Generic tree traversal shared by the source query tree ([`Expr`]) and the
//! target script tree ([`ScriptExpr`]).
//!
//! Both trees are immutable. [`TreeNode::with_children`] is the only way to
//! derive a modified tree: rewrites rebuild the path from the changed node
//! up to the root and share nothing with the original.
//!
//! [`CallHierarchyVisitor`] is specific to script trees. It walks a method
//! chain such as `g.V().has('x').order()` from the outermost call inward,
//! through each call's caller, down to the chain's terminal.
//!
//! [`Expr`]: crate::ast::Expr

use std::ops::ControlFlow;

use crate::error::TranslationError;
use crate::script::{FunctionCall, ScriptExpr};

/// Uniform structural access to a tree node.
pub trait TreeNode: Sized + Clone {
    /// Direct children in a fixed, kind-specific order.
    fn children(&self) -> Vec<&Self>;

    /// Copies this node with `children` substituted, in the order
    /// [`children`](TreeNode::children) reports them.
    fn with_children(&self, children: Vec<Self>) -> Result<Self, TranslationError>;

    /// Short name of the node kind, used in diagnostics.
    fn kind_name(&self) -> &'static str;
}

/// Checks a child list length inside `with_children` implementations.
pub(crate) fn expect_arity<T>(
    node: &'static str,
    children: &[T],
    expected: usize,
) -> Result<(), TranslationError> {
    if children.len() == expected {
        Ok(())
    } else {
        Err(TranslationError::ArityMismatch {
            node,
            expected,
            found: children.len(),
        })
    }
}

/// Pre-order visit. Returning `Break` from `f` stops the whole walk.
pub fn walk_pre<N, B, F>(node: &N, f: &mut F) -> ControlFlow<B>
where
    N: TreeNode,
    F: FnMut(&N) -> ControlFlow<B>,
{
    f(node)?;
    for child in node.children() {
        walk_pre(child, f)?;
    }
    ControlFlow::Continue(())
}

/// Post-order visit. Returning `Break` from `f` stops the whole walk.
pub fn walk_post<N, B, F>(node: &N, f: &mut F) -> ControlFlow<B>
where
    N: TreeNode,
    F: FnMut(&N) -> ControlFlow<B>,
{
    for child in node.children() {
        walk_post(child, f)?;
    }
    f(node)
}

/// Bottom-up rewrite: children are rewritten first, the node is rebuilt
/// from them and then handed to `f`.
pub fn transform_up<N, E, F>(node: &N, f: &mut F) -> Result<N, E>
where
    N: TreeNode,
    E: From<TranslationError>,
    F: FnMut(N) -> Result<N, E>,
{
    let mut children = Vec::new();
    for child in node.children() {
        children.push(transform_up(child, f)?);
    }
    let rebuilt = if children.is_empty() {
        node.clone()
    } else {
        node.with_children(children)?
    };
    f(rebuilt)
}

/// True if any node in the tree satisfies `predicate`.
pub fn any_node<N, F>(node: &N, mut predicate: F) -> bool
where
    N: TreeNode,
    F: FnMut(&N) -> bool,
{
    walk_pre(node, &mut |n: &N| {
        if predicate(n) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .is_break()
}

/// Visitor over a function-call chain.
pub trait CallHierarchyVisitor {
    /// Called on the way in. `false` stops descent into this call's caller.
    fn pre_visit_function_caller(&mut self, call: &FunctionCall) -> bool;

    /// Called when the chain ends in something other than a call.
    fn visit_non_function_caller(&mut self, expr: &ScriptExpr);

    /// Called when the chain ends with a call that has no caller.
    fn visit_null_caller(&mut self);

    /// Called on the way out. `false` stops the remaining outward visits.
    fn post_visit_function_caller(&mut self, call: &FunctionCall) -> bool;
}

/// Walks the call chain rooted at `expr`.
pub fn visit_call_hierarchy<V>(expr: Option<&ScriptExpr>, visitor: &mut V)
where
    V: CallHierarchyVisitor + ?Sized,
{
    walk_calls(expr, visitor);
}

// Returns false once a post-visit hook asked to stop.
fn walk_calls<V>(expr: Option<&ScriptExpr>, visitor: &mut V) -> bool
where
    V: CallHierarchyVisitor + ?Sized,
{
    match expr {
        None => {
            visitor.visit_null_caller();
            true
        }
        Some(ScriptExpr::Call(call)) => {
            if !visitor.pre_visit_function_caller(call) {
                return false;
            }
            if !walk_calls(call.caller.as_deref(), visitor) {
                return false;
            }
            visitor.post_visit_function_caller(call)
        }
        Some(other) => {
            visitor.visit_non_function_caller(other);
            true
        }
    }
}
