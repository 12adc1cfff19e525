//! Directive translation.
//!
//! Every fragment is spliced into a single-quoted JavaScript string literal, so
//! fragments that emit code first close the literal (`'+`) and reopen it
//! afterwards (`+'`).

use crate::directive::{DirectiveKind, DirectiveMatch};
use crate::scope::{CloseOutcome, FrameKind, ScopeTracker, PARTIALS_NAME};

/// Runtime helper mapping a collection to an array of strings.
pub(crate) const MAP_METHOD: &str = "_.map";

/// Field of the current model that `@selectedIf`/`@checkedIf` compare against.
pub(crate) const COMPARISON_FIELD: &str = "value";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Fragment {
    pub(crate) code: String,
    /// Set for close tags.
    pub(crate) close: Option<CloseOutcome>,
}

impl Fragment {
    fn code(code: String) -> Self {
        Self { code, close: None }
    }

    fn closing(code: &str, outcome: CloseOutcome) -> Self {
        Self {
            code: code.to_string(),
            close: Some(outcome),
        }
    }
}

/// Translates one directive, advancing `tracker` for scope tags.
pub(crate) fn translate(directive: &DirectiveMatch, tracker: &mut ScopeTracker) -> Fragment {
    let value = directive.expression.as_str();

    match directive.kind {
        DirectiveKind::Each => {
            // The collection belongs to the enclosing scope.
            let collection = tracker.resolve_relative(value);
            let model = tracker.enter();
            let key = tracker.key_id();
            Fragment::code(format!(
                "'+{}({}, function({},{}) {{ return '",
                MAP_METHOD, collection, model, key
            ))
        }
        DirectiveKind::EachEnd => {
            let outcome = tracker.close(FrameKind::Each);
            Fragment::closing("';}).join('')+'", outcome)
        }
        DirectiveKind::Hide => {
            let condition = tracker.resolve_relative(value);
            tracker.open_hide();
            Fragment::code(format!("'+(!({})?('", condition))
        }
        DirectiveKind::HideEnd => {
            let outcome = tracker.close(FrameKind::Hide);
            Fragment::closing("'):(''))+'", outcome)
        }
        DirectiveKind::SelectedIf => Fragment::code(attribute_if(tracker, value, "selected")),
        DirectiveKind::CheckedIf => Fragment::code(attribute_if(tracker, value, "checked")),
        DirectiveKind::Partial => Fragment::code(format!(
            "'+{}.{}({})+'",
            PARTIALS_NAME,
            value,
            tracker.model_id()
        )),
        DirectiveKind::Key => Fragment::code(format!("'+{}+'", tracker.key_id())),
        DirectiveKind::Interpolation => {
            Fragment::code(format!("'+{}+'", tracker.resolve_relative(value)))
        }
    }
}

fn attribute_if(tracker: &ScopeTracker, value: &str, attribute: &str) -> String {
    format!(
        "'+(({}=={})?'{}':'')+'",
        tracker.resolve_relative(value),
        tracker.resolve_relative(COMPARISON_FIELD),
        attribute
    )
}
