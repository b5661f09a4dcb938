//! Configuration axes
//!
//! Each axis is a closed enumeration. Values parse from and display as their
//! kebab-case names, which is also how they appear in `gauntlet.toml`.

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! axis {
    (
        $(#[$meta:meta])*
        $name:ident as $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, $camel:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every legal value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Axis name used in messages
            pub const AXIS: &'static str = $label;

            /// Kebab-case name
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Name fragment used in configuration names
            pub fn camel_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $camel,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = HarnessError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(HarnessError::InvalidAxisValue {
                        axis: $label,
                        value: s.to_string(),
                        expected: [$($text),+].join(", "),
                    }),
                }
            }
        }
    };
}

axis! {
    /// Compiler frontend implementation behind the facility
    FrontendKind as "frontend" {
        Fir => "fir", "Fir";
        Fe10 => "fe10", "Fe10";
    }
}

axis! {
    /// Kind of module the main fixture file is analyzed as
    ModuleKind as "module kind" {
        Source => "source", "SourceModule";
        LibraryBinary => "library-binary", "LibraryBinaryModule";
        LibrarySource => "library-source", "LibrarySourceModule";
        Script => "script", "ScriptSource";
        NotUnderContentRoot => "not-under-content-root", "NotUnderContentRoot";
        CodeFragment => "code-fragment", "CodeFragment";
    }
}

axis! {
    /// Lifecycle of the analysis session
    SessionMode as "session mode" {
        Normal => "normal", "Normal";
        Dependent => "dependent", "Dependent";
    }
}

axis! {
    /// API surface the facility is reached through
    ApiMode as "API mode" {
        Ide => "ide", "Ide";
        Standalone => "standalone", "Standalone";
    }
}
