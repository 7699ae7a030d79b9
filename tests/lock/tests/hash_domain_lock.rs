//! Hash domain governance lock tests.
//!
//! Proves:
//! 1. Canonical domain set has expected count (catches forgotten additions to ALL)
//! 2. All domain byte strings are unique (prevents domain collision)
//! 3. All domains follow the `GAUNTLET::*::V1\0` naming convention
//! 4. `canonical_hash` is plain `sha256(domain ‖ data)`
//! 5. No raw `GAUNTLET::` domain literals in production source outside `hash_domain.rs`

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use gauntlet_ledger::proof::hash::canonical_hash;
use gauntlet_ledger::proof::hash_domain::HashDomain;
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// 1. Canonical set count
// ---------------------------------------------------------------------------

#[test]
fn hash_domain_canonical_set_count() {
    assert_eq!(
        HashDomain::ALL.len(),
        3,
        "expected 3 domain variants; if you added a new domain, update this count"
    );
}

// ---------------------------------------------------------------------------
// 2. All unique bytes
// ---------------------------------------------------------------------------

#[test]
fn hash_domain_all_unique_bytes() {
    let mut seen = BTreeSet::new();
    for domain in HashDomain::ALL {
        assert!(
            seen.insert(domain.as_bytes()),
            "duplicate domain bytes: {domain}"
        );
    }
}

// ---------------------------------------------------------------------------
// 3. Naming convention
// ---------------------------------------------------------------------------

#[test]
fn hash_domain_all_follow_naming_convention() {
    for domain in HashDomain::ALL {
        let bytes = domain.as_bytes();
        assert!(
            bytes.starts_with(b"GAUNTLET::"),
            "{domain} does not start with GAUNTLET::"
        );
        assert!(
            bytes.ends_with(b"::V1\0"),
            "{domain} does not end with ::V1\\0"
        );
    }
}

// ---------------------------------------------------------------------------
// 4. Digest construction
// ---------------------------------------------------------------------------

#[test]
fn canonical_hash_is_domain_prefixed_sha256() {
    let data = br#"{"scenario_id":"truster"}"#;
    for domain in HashDomain::ALL {
        let mut hasher = Sha256::new();
        hasher.update(domain.as_bytes());
        hasher.update(data);
        let expected = format!("sha256:{}", hex::encode(hasher.finalize()));
        assert_eq!(canonical_hash(*domain, data).as_str(), expected, "{domain}");
    }
}

#[test]
fn same_bytes_under_different_domains_hash_differently() {
    let data = b"{}";
    let digests: BTreeSet<String> = HashDomain::ALL
        .iter()
        .map(|domain| canonical_hash(*domain, data).as_str().to_string())
        .collect();
    assert_eq!(digests.len(), HashDomain::ALL.len());
}

// ---------------------------------------------------------------------------
// 5. No raw GAUNTLET:: domain literals in production source
// ---------------------------------------------------------------------------

/// Scan ledger/, targets/, harness/ source for `b"GAUNTLET::` literals.
/// The only file allowed to contain them is `hash_domain.rs`. Test modules
/// sit at the end of each file and are not scanned.
#[test]
fn no_raw_domain_literals_outside_authority() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    let mut sources = Vec::new();
    for krate in ["ledger", "targets", "harness"] {
        collect_sources(&root.join(krate).join("src"), &mut sources);
    }
    assert!(!sources.is_empty(), "no production sources found to scan");

    let violations: Vec<String> = sources
        .iter()
        .filter(|path| path.file_name().and_then(|n| n.to_str()) != Some("hash_domain.rs"))
        .flat_map(|path| raw_domain_literals(path))
        .collect();
    assert!(
        violations.is_empty(),
        "raw GAUNTLET:: domain literals found outside hash_domain.rs:\n{}",
        violations.join("\n")
    );
}

fn raw_domain_literals(path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .take_while(|line| !line.contains("#[cfg(test)]"))
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim_start();
            !line.starts_with("//") && line.contains("b\"GAUNTLET::")
        })
        .map(|(i, line)| format!("  {}:{}: {}", path.display(), i + 1, line.trim()))
        .collect()
}

fn collect_sources(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_sources(&path, out);
        } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
            out.push(path);
        }
    }
}
