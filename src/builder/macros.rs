//! Macros for ergonomic machine construction.

/// Generate a `State` implementation for a plain enum.
///
/// # Example
///
/// ```
/// use flywheel::core::State;
/// use flywheel::state_enum;
///
/// state_enum! {
///     pub enum WorkflowState {
///         Start,
///         Processing,
///         Done,
///     }
/// }
///
/// assert_eq!(WorkflowState::Processing.name(), "Processing");
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }
    };
}

/// Generate an event enum with one tuple variant per alternative type,
/// plus `From` and [`Alternative`](crate::core::Alternative)
/// implementations for each.
///
/// # Example
///
/// ```
/// use flywheel::core::Alternative;
/// use flywheel::event_set;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Coin {
///     value: u32,
/// }
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Push;
///
/// event_set! {
///     pub enum Input {
///         Coin(Coin),
///         Push(Push),
///     }
/// }
///
/// let event: Input = Coin { value: 25 }.into();
/// assert!(Coin::holds(&event));
/// assert!(!Push::holds(&event));
/// ```
#[macro_export]
macro_rules! event_set {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident($alt:ty)
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant($alt)
            ),*
        }

        $(
            impl ::core::convert::From<$alt> for $name {
                fn from(value: $alt) -> Self {
                    Self::$variant(value)
                }
            }

            impl $crate::core::Alternative<$name> for $alt {
                #[allow(unreachable_patterns)]
                fn extract(event: &$name) -> ::core::option::Option<&Self> {
                    match event {
                        $name::$variant(inner) => ::core::option::Option::Some(inner),
                        _ => ::core::option::Option::None,
                    }
                }
            }
        )*
    };
}
