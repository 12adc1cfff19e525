//! Scope tracking for nested template blocks.
//!
//! Generated code is a flat nesting of iteration callbacks where every callback
//! parameter shadows the outer one, so the identifier *name* encodes the scope
//! level: the model at depth `d` is always `m{d}` and its iteration key `k{d}`.
//! Parent references (`../`) are therefore resolved statically, by picking the
//! identifier of the ancestor depth.

/// Prefix of model identifiers (`m0`, `m1`, ...).
pub(crate) const MODEL_PREFIX: &str = "m";
/// Prefix of iteration key identifiers (`k1`, `k2`, ...).
pub(crate) const KEY_PREFIX: &str = "k";
/// Runtime namespace holding registered partials.
pub(crate) const PARTIALS_NAME: &str = "p";
/// Expression that refers to the model itself rather than one of its fields.
pub(crate) const SELF_REFERENCE: &str = "this";
/// Walks one scope up before resolving the rest of the expression.
pub(crate) const PARENT_MARKER: &str = "../";

pub(crate) fn model_id(depth: usize) -> String {
    format!("{}{}", MODEL_PREFIX, depth)
}

pub(crate) fn key_id(depth: usize) -> String {
    format!("{}{}", KEY_PREFIX, depth)
}

/// Counts the leading parent markers of an expression and returns the rest.
pub(crate) fn split_parent_markers(expression: &str) -> (usize, &str) {
    let mut rest = expression;
    let mut count = 0;
    while let Some(stripped) = rest.strip_prefix(PARENT_MARKER) {
        rest = stripped;
        count += 1;
    }
    (count, rest)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Each,
    Hide,
}

impl FrameKind {
    pub(crate) fn open_tag(&self) -> &'static str {
        match self {
            FrameKind::Each => "#each",
            FrameKind::Hide => "#hide",
        }
    }

    pub(crate) fn close_tag(&self) -> &'static str {
        match self {
            FrameKind::Each => "/each",
            FrameKind::Hide => "/hide",
        }
    }
}

/// What to do when a close tag has no matching open tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ScopePolicy {
    /// Clamp at depth 0 and keep going.
    #[default]
    Clamp,
    /// Report an unbalanced scope error.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseOutcome {
    /// Closed the innermost open frame.
    Balanced,
    /// No frame of this kind was open.
    Unmatched,
    /// Closed a frame of this kind that was not the innermost one.
    Mismatched { innermost: FrameKind },
}

/// Call-scoped depth bookkeeping.
///
/// Invariant: `depth` equals the number of open `Each` frames. `Hide` frames
/// are tracked only so closes can be validated; they never change the depth.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScopeTracker {
    depth: usize,
    frames: Vec<FrameKind>,
}

impl ScopeTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn model_id(&self) -> String {
        model_id(self.depth)
    }

    pub(crate) fn key_id(&self) -> String {
        key_id(self.depth)
    }

    pub(crate) fn open_frames(&self) -> &[FrameKind] {
        &self.frames
    }

    /// Opens an iteration scope and returns the new model identifier.
    pub(crate) fn enter(&mut self) -> String {
        self.depth += 1;
        self.frames.push(FrameKind::Each);
        self.model_id()
    }

    /// Leaves one iteration level, never going below 0, and returns the
    /// identifier of the now-current scope.
    pub(crate) fn exit(&mut self) -> String {
        self.depth = self.depth.saturating_sub(1);
        self.model_id()
    }

    pub(crate) fn open_hide(&mut self) {
        self.frames.push(FrameKind::Hide);
    }

    /// Closes the most recent frame of `kind`.
    pub(crate) fn close(&mut self, kind: FrameKind) -> CloseOutcome {
        let Some(idx) = self.frames.iter().rposition(|f| *f == kind) else {
            return CloseOutcome::Unmatched;
        };

        let innermost = self.frames[self.frames.len() - 1];
        let was_innermost = idx + 1 == self.frames.len();
        self.frames.remove(idx);
        if kind == FrameKind::Each {
            self.exit();
        }

        if was_innermost {
            CloseOutcome::Balanced
        } else {
            CloseOutcome::Mismatched { innermost }
        }
    }

    /// Resolves an expression against the current depth.
    ///
    /// Each leading `../` moves one level up (clamped at the root model).
    /// `this` resolves to the bare model identifier.
    pub(crate) fn resolve_relative(&self, expression: &str) -> String {
        let (markers, path) = split_parent_markers(expression);
        let target = model_id(self.depth.saturating_sub(markers));
        if path == SELF_REFERENCE {
            target
        } else {
            format!("{}.{}", target, path)
        }
    }
}
