/// Declares an enum of header names as they appear on the wire.
///
/// Each variant gets its exact wire spelling through `as_str()`, `Display`
/// and `AsRef<str>` (so variants can be passed straight to
/// [`HeaderSet::get`](crate::headers::HeaderSet::get)), an `ALL` table in
/// declaration order, and a `FromStr` that accepts only the exact spelling.
///
/// ```ignore
/// header_names! {
///     error: ParseReplyHeaderError,
///     /// Framing headers of a reply.
///     pub enum ReplyHeader {
///         ContentType = "Content-Type",
///         ReplyText = "Reply-Text",
///     }
/// }
/// ```
macro_rules! header_names {
    (
        error: $Err:ident,
        $(#[$meta:meta])*
        $vis:vis enum $Name:ident {
            $( $(#[$vmeta:meta])* $Variant:ident = $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $Name {
            $( $(#[$vmeta])* $Variant, )+
        }

        impl $Name {
            /// Every name, in declaration order.
            pub const ALL: &'static [$Name] = &[ $( $Name::$Variant ),+ ];

            pub const fn as_str(self) -> &'static str {
                match self {
                    $( $Name::$Variant => $wire, )+
                }
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $Name {
            type Err = $Err;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire => Ok($Name::$Variant), )+
                    other => Err($Err(other.to_string())),
                }
            }
        }
    };
}
