//! Macros for declaring transition arguments.

/// Declare a transition argument struct together with its object schema.
///
/// The struct derives `Clone`, `PartialEq`, `Debug`, `Serialize` and
/// `Deserialize`. An associated `schema` function takes one
/// [`Typed`](crate::schema::Typed) per field, in declaration order, so a
/// field's schema must infer exactly the field's type. Ordinals follow
/// declaration order.
///
/// # Example
///
/// ```
/// use statecall::schema::Typed;
/// use statecall::transition_args;
///
/// transition_args! {
///     /// Secretly send tokens to another player.
///     pub struct SendTokens {
///         pub sender: String,
///         pub receiver: String,
///         pub amount: i64,
///     }
/// }
///
/// let players = ["Alice", "Bob", "Charlie"];
/// let schema = SendTokens::schema(
///     Typed::string_enum(players).describe("Your name."),
///     Typed::string_enum(players).describe("Who receives the tokens."),
///     Typed::integer().describe("How many tokens to send."),
/// );
///
/// let names: Vec<_> = schema.schema().fields().iter().map(|f| f.name()).collect();
/// assert_eq!(names, ["sender", "receiver", "amount"]);
/// ```
#[macro_export]
macro_rules! transition_args {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty
            ),*
        }

        impl $name {
            /// Object schema for this struct, one typed schema per field.
            #[allow(clippy::too_many_arguments)]
            $vis fn schema(
                $($field: $crate::schema::Typed<$ty>),*
            ) -> $crate::schema::Typed<Self> {
                $crate::schema::Typed::from_declared_fields(vec![
                    $((stringify!($field), $field.into_schema())),*
                ])
            }
        }
    };
}
