use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(ClientId);
id_newtype!(ZoneId);

/// Layouts a display client can render, as advertised by the server.
pub const LAYOUTS: &[&str] = &[
    "detailed",
    "minimal",
    "fullscreen",
    "ambient",
    "cover",
    "facts-columns",
    "facts-overlay",
    "facts-carousel",
    "basic",
];

pub const FONTS: &[&str] = &[
    "system",
    "patua-one",
    "comfortaa",
    "noto-sans-display",
    "coda",
    "bellota-text",
    "big-shoulders",
    "inter",
    "roboto",
    "open-sans",
    "lato",
    "montserrat",
    "poppins",
    "source-sans-3",
    "nunito",
    "raleway",
    "work-sans",
];

pub const BACKGROUNDS: &[&str] = &[
    "black",
    "white",
    "dominant",
    "gradient-radial",
    "gradient-linear",
    "gradient-linear-multi",
    "gradient-radial-corner",
    "gradient-mesh",
    "blur-subtle",
    "blur-heavy",
    "duotone",
    "posterized",
    "gradient-noise",
    "blur-grain",
];
