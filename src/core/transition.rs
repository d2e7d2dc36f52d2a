//! Transition instances proposed by the model.

use serde::Serialize;
use serde_json::Value;

/// One transition proposed by the generation service.
///
/// Transitions are built only by the protocol adapter, after the arguments
/// have been decoded against the schema the machine declared for that name.
/// A name that was not on the menu is kept as [`Transition::Unknown`] so the
/// reducer can decide what to do with it explicitly.
///
/// # Example
///
/// ```rust
/// use statecall::core::Transition;
///
/// fn applied<A>(transitions: &[Transition<A>]) -> usize {
///     transitions
///         .iter()
///         .filter(|t| match t {
///             Transition::Declared { .. } => true,
///             Transition::Unknown { .. } => false,
///         })
///         .count()
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition<A> {
    /// A transition that was on the menu, with its decoded action.
    #[non_exhaustive]
    Declared { name: String, action: A },

    /// A transition whose name was not on the menu for the current state.
    #[non_exhaustive]
    Unknown { name: String, args: Value },
}

impl<A> Transition<A> {
    pub(crate) fn declared(name: impl Into<String>, action: A) -> Self {
        Transition::Declared {
            name: name.into(),
            action,
        }
    }

    pub(crate) fn unknown(name: impl Into<String>, args: Value) -> Self {
        Transition::Unknown {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Transition::Declared { name, .. } | Transition::Unknown { name, .. } => name,
        }
    }

    /// The decoded action, if the transition was declared.
    pub fn action(&self) -> Option<&A> {
        match self {
            Transition::Declared { action, .. } => Some(action),
            Transition::Unknown { .. } => None,
        }
    }

    pub fn is_declared(&self) -> bool {
        matches!(self, Transition::Declared { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize)]
    enum Action {
        Wave,
    }

    #[test]
    fn accessors_distinguish_variants() {
        let declared = Transition::declared("wave", Action::Wave);
        let unknown: Transition<Action> = Transition::unknown("dance", json!({ "style": "tango" }));

        assert_eq!(declared.name(), "wave");
        assert_eq!(declared.action(), Some(&Action::Wave));
        assert!(declared.is_declared());

        assert_eq!(unknown.name(), "dance");
        assert_eq!(unknown.action(), None);
        assert!(!unknown.is_declared());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let unknown: Transition<Action> = Transition::unknown("dance", json!({}));
        assert_eq!(
            serde_json::to_value(&unknown).unwrap(),
            json!({ "kind": "unknown", "name": "dance", "args": {} })
        );
    }
}
