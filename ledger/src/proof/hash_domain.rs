//! Typed domain separators for canonical hashing.
//!
//! Every digest selects a domain via [`HashDomain`]. The enum, `as_bytes()`,
//! `ALL`, and `Display` are generated from one macro invocation, so adding a
//! domain is a single change here.

macro_rules! define_hash_domains {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => $bytes:expr
        ),+ $(,)?
    ) => {
        /// Typed domain separator for [`super::hash::canonical_hash`].
        ///
        /// Every variant maps to a unique, null-terminated byte string used as
        /// a SHA-256 prefix.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum HashDomain {
            $(
                $(#[$meta])*
                $variant,
            )+
        }

        impl HashDomain {
            /// The raw domain-separator bytes (null-terminated).
            #[must_use]
            pub const fn as_bytes(&self) -> &'static [u8] {
                match self {
                    $( Self::$variant => $bytes, )+
                }
            }

            /// All domain variants in declaration order.
            pub const ALL: &[HashDomain] = &[
                $( Self::$variant, )+
            ];
        }

        impl core::fmt::Display for HashDomain {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $( Self::$variant => write!(f, stringify!($variant)), )+
                }
            }
        }
    };
}

define_hash_domains! {
    /// Whole-ledger state projection.
    WorldState => b"GAUNTLET::WORLD_STATE::V1\0",

    /// Resolved harness configuration.
    ConfigSnapshot => b"GAUNTLET::CONFIG_SNAPSHOT::V1\0",

    /// Scenario report content.
    ScenarioReport => b"GAUNTLET::SCENARIO_REPORT::V1\0",
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn domain_bytes_are_unique() {
        let mut seen = BTreeSet::new();
        for domain in HashDomain::ALL {
            assert!(seen.insert(domain.as_bytes()), "duplicate domain bytes: {domain}");
        }
    }

    #[test]
    fn domains_are_null_terminated_and_versioned() {
        for domain in HashDomain::ALL {
            let bytes = domain.as_bytes();
            assert!(bytes.starts_with(b"GAUNTLET::"), "{domain} lacks prefix");
            assert!(bytes.ends_with(b"::V1\0"), "{domain} lacks ::V1\\0 suffix");
        }
    }

    #[test]
    fn display_is_variant_name() {
        assert_eq!(HashDomain::ScenarioReport.to_string(), "ScenarioReport");
    }
}
