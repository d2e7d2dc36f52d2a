//! The set of transitions a machine offers in a given state.

use crate::schema::{DecodeError, Schema, Typed};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type Decoder<A> = Arc<dyn Fn(&Value) -> Result<A, Vec<DecodeError>> + Send + Sync>;

/// One named transition on offer: its description, argument schema, and
/// the decoder that turns raw arguments into the machine's action type.
pub struct MenuEntry<A> {
    name: String,
    description: String,
    schema: Schema,
    decoder: Decoder<A>,
}

impl<A> MenuEntry<A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Decode raw arguments into an action.
    pub fn decode(&self, args: &Value) -> Result<A, Vec<DecodeError>> {
        (self.decoder)(args)
    }
}

impl<A> Clone for MenuEntry<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            schema: self.schema.clone(),
            decoder: Arc::clone(&self.decoder),
        }
    }
}

impl<A> fmt::Debug for MenuEntry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuEntry")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Ordered menu of the transitions currently legal for a machine.
///
/// Each entry is registered with a typed schema and a constructor for the
/// machine's action enum, so decoding a proposed transition yields a
/// variant whose payload type is fixed by the schema.
///
/// # Example
///
/// ```rust
/// use statecall::core::Menu;
/// use statecall::schema::Typed;
/// use statecall::transition_args;
///
/// transition_args! {
///     pub struct Move {
///         pub distance: f64,
///     }
/// }
///
/// #[derive(Clone, Debug)]
/// enum Action {
///     Move(Move),
/// }
///
/// let menu = Menu::new().offer(
///     "move",
///     "Move forward.",
///     Move::schema(Typed::number()),
///     Action::Move,
/// );
///
/// assert_eq!(menu.names().collect::<Vec<_>>(), ["move"]);
/// ```
pub struct Menu<A> {
    entries: Vec<MenuEntry<A>>,
}

impl<A: 'static> Menu<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Offer a transition. Offering a name twice replaces the earlier
    /// entry in place, keeping its position.
    pub fn offer<T, F>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Typed<T>,
        wrap: F,
    ) -> Self
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) -> A + Send + Sync + 'static,
    {
        let entry = MenuEntry {
            name: name.into(),
            description: description.into(),
            schema: schema.schema().clone(),
            decoder: Arc::new(move |args: &Value| schema.decode(args).map(&wrap)),
        };

        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self
    }
}

impl<A> Menu<A> {
    pub fn entries(&self) -> &[MenuEntry<A>] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&MenuEntry<A>> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Transition names in menu order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A: 'static> Default for Menu<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Menu<A> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<A> fmt::Debug for Menu<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition_args;
    use serde_json::json;

    transition_args! {
        struct Say {
            text: String,
        }
    }

    transition_args! {
        struct Rest {}
    }

    #[derive(Clone, Debug, PartialEq)]
    enum Action {
        Say(Say),
        Rest(Rest),
    }

    fn menu() -> Menu<Action> {
        Menu::new()
            .offer("say", "Say something.", Say::schema(Typed::string()), Action::Say)
            .offer("rest", "Do nothing.", Rest::schema(), Action::Rest)
    }

    #[test]
    fn entries_keep_offer_order() {
        assert_eq!(menu().names().collect::<Vec<_>>(), ["say", "rest"]);
        assert_eq!(menu().len(), 2);
        assert!(!menu().is_empty());
    }

    #[test]
    fn entry_decodes_into_action() {
        let menu = menu();
        let entry = menu.get("say").unwrap();

        assert_eq!(entry.description(), "Say something.");
        assert_eq!(
            entry.decode(&json!({ "text": "hi" })).unwrap(),
            Action::Say(Say {
                text: "hi".to_string(),
            })
        );
        assert!(entry.decode(&json!({ "text": 5 })).is_err());
    }

    #[test]
    fn reoffering_replaces_in_place() {
        let menu = menu().offer("say", "Shout.", Say::schema(Typed::string()), Action::Say);

        assert_eq!(menu.names().collect::<Vec<_>>(), ["say", "rest"]);
        assert_eq!(menu.get("say").unwrap().description(), "Shout.");
    }

    #[test]
    fn lookup_of_missing_name() {
        assert!(menu().get("fly").is_none());
        assert!(!menu().contains("fly"));
        assert!(menu().contains("rest"));
    }
}
