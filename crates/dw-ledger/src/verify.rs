use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use dw_crypto::RecordSigner;
use dw_store::DurableObjectStore;
use dw_types::{ContentHash, DurableRef, RecordId};

use crate::records::ProvenanceRecord;
use crate::traits::RecordLookup;

/// A defect found while verifying one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IntegrityViolation {
    #[serde(rename_all = "camelCase")]
    ContentHashMismatch {
        stored: ContentHash,
        computed: Option<ContentHash>,
    },
    SignatureMismatch,
    /// Reported only; does not make the link invalid.
    #[serde(rename_all = "camelCase")]
    DurableRefUnresolved { durable_ref: DurableRef },
    /// The prior link points back into the already walked trail.
    PriorLinkCycle { prior: RecordId },
}

/// Verification outcome for one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkVerification {
    pub record_id: RecordId,
    pub valid: bool,
    pub content_hash_valid: bool,
    pub signature_valid: bool,
    pub durable_resolved: bool,
    pub stored_hash: ContentHash,
    /// `None` when the record could not be re-encoded.
    pub computed_hash: Option<ContentHash>,
    pub violations: Vec<IntegrityViolation>,
}

/// Outcome of walking a chain from a root record back to its origin's first
/// record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub root: RecordId,
    pub valid: bool,
    /// Links in walk order, root first.
    pub trail: Vec<LinkVerification>,
    /// Where the walk broke: the id of an invalid link, or a prior link the
    /// ledger does not hold.
    pub missing_links: Vec<RecordId>,
}

impl ChainReport {
    pub fn depth(&self) -> usize {
        self.trail.len()
    }

    /// Links that failed hash, signature or cycle checks.
    pub fn broken_links(&self) -> impl Iterator<Item = &LinkVerification> {
        self.trail.iter().filter(|l| !l.valid)
    }
}

/// Result of comparing a record with the object held by the durable store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableCopyReport {
    pub record_id: RecordId,
    pub durable_ref: DurableRef,
    pub present: bool,
    /// The stored object hashes to the record's content hash.
    pub matches: bool,
}

/// Recomputes hashes and checks signatures along prior links.
///
/// Read-only and deterministic: verifying the same chain twice over the same
/// records yields identical reports.
pub struct ChainVerifier<'a> {
    signer: &'a dyn RecordSigner,
    durable: &'a dyn DurableObjectStore,
}

impl<'a> ChainVerifier<'a> {
    pub fn new(signer: &'a dyn RecordSigner, durable: &'a dyn DurableObjectStore) -> Self {
        Self { signer, durable }
    }

    /// Walk prior links from `root`.
    ///
    /// The walk stops at the first record without a prior link, at the first
    /// invalid link, or at a missing predecessor. The last two are listed in
    /// `missing_links`.
    pub fn verify_chain<L: RecordLookup + ?Sized>(&self, lookup: &L, root: &RecordId) -> ChainReport {
        let mut trail: Vec<LinkVerification> = Vec::new();
        let mut missing_links = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(*root);

        while let Some(id) = cursor.take() {
            let Some(record) = lookup.lookup(&id) else {
                missing_links.push(id);
                break;
            };
            visited.insert(id);

            let mut link = self.verify_link(record);
            if let Some(prior) = record.prior_link() {
                if visited.contains(prior) {
                    link.valid = false;
                    link.violations
                        .push(IntegrityViolation::PriorLinkCycle { prior: *prior });
                }
            }

            if !link.valid {
                missing_links.push(id);
                trail.push(link);
                break;
            }
            cursor = record.prior_link().copied();
            trail.push(link);
        }

        let valid = missing_links.is_empty();
        if !valid {
            tracing::debug!(
                root = %root,
                depth = trail.len(),
                missing = missing_links.len(),
                "chain verification failed"
            );
        }

        ChainReport {
            root: *root,
            valid,
            trail,
            missing_links,
        }
    }

    /// Check a single record's content hash, signature and durable handle.
    pub fn verify_link(&self, record: &ProvenanceRecord) -> LinkVerification {
        let mut violations = Vec::new();

        let computed_hash = record.recompute_content_hash().ok();
        let content_hash_valid = computed_hash == Some(record.content_hash);
        if !content_hash_valid {
            violations.push(IntegrityViolation::ContentHashMismatch {
                stored: record.content_hash,
                computed: computed_hash,
            });
        }

        let signature_valid = self
            .signer
            .verify_material(&record.signature_material(), &record.signature)
            .unwrap_or(false);
        if !signature_valid {
            violations.push(IntegrityViolation::SignatureMismatch);
        }

        let durable_resolved = self.durable.resolves(&record.durable_ref);
        if !durable_resolved {
            violations.push(IntegrityViolation::DurableRefUnresolved {
                durable_ref: record.durable_ref.clone(),
            });
        }

        LinkVerification {
            record_id: record.id,
            valid: content_hash_valid && signature_valid,
            content_hash_valid,
            signature_valid,
            durable_resolved,
            stored_hash: record.content_hash,
            computed_hash,
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dw_crypto::KeyedSigner;
    use dw_store::InMemoryDurableStore;
    use dw_types::RecordKind;

    use super::*;
    use crate::test_support::signed_record;

    struct Fixture {
        signer: KeyedSigner,
        store: InMemoryDurableStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                signer: KeyedSigner::from_secret("verify-test"),
                store: InMemoryDurableStore::new(),
            }
        }

        fn verifier(&self) -> ChainVerifier<'_> {
            ChainVerifier::new(&self.signer, &self.store)
        }

        /// Three linked records for one origin, oldest first.
        fn chain(&self) -> Vec<ProvenanceRecord> {
            let a = signed_record(&self.signer, "m1", RecordKind::Compute, 10, None);
            let b = signed_record(&self.signer, "m1", RecordKind::Reasoning, 20, Some(a.id));
            let c = signed_record(&self.signer, "m1", RecordKind::Proof, 30, Some(b.id));
            vec![a, b, c]
        }
    }

    fn to_map(records: &[ProvenanceRecord]) -> HashMap<RecordId, ProvenanceRecord> {
        records.iter().map(|r| (r.id, r.clone())).collect()
    }

    #[test]
    fn intact_chain_verifies() {
        let fx = Fixture::new();
        let chain = fx.chain();
        let map = to_map(&chain);

        let report = fx.verifier().verify_chain(&map, &chain[2].id);
        assert!(report.valid);
        assert_eq!(report.depth(), 3);
        assert!(report.missing_links.is_empty());
        let order: Vec<RecordId> = report.trail.iter().map(|l| l.record_id).collect();
        assert_eq!(order, vec![chain[2].id, chain[1].id, chain[0].id]);
    }

    #[test]
    fn single_record_chain() {
        let fx = Fixture::new();
        let chain = fx.chain();
        let report = fx.verifier().verify_chain(&to_map(&chain), &chain[0].id);
        assert!(report.valid);
        assert_eq!(report.depth(), 1);
    }

    #[test]
    fn unresolved_durable_ref_is_reported_not_fatal() {
        let fx = Fixture::new();
        let chain = fx.chain();
        let report = fx.verifier().verify_chain(&to_map(&chain), &chain[2].id);
        assert!(report.valid);
        for link in &report.trail {
            assert!(!link.durable_resolved);
            assert!(matches!(
                link.violations.as_slice(),
                [IntegrityViolation::DurableRefUnresolved { .. }]
            ));
        }
    }

    #[test]
    fn tampered_hash_invalidates_link_and_chain() {
        let fx = Fixture::new();
        let mut chain = fx.chain();
        chain[1].content_hash = ContentHash::from_bytes(b"forged");
        let report = fx.verifier().verify_chain(&to_map(&chain), &chain[2].id);

        assert!(!report.valid);
        assert_eq!(report.depth(), 2);
        assert_eq!(report.missing_links, vec![chain[1].id]);
        let broken: Vec<&LinkVerification> = report.broken_links().collect();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].record_id, chain[1].id);
        assert!(!broken[0].content_hash_valid);
        assert_eq!(broken[0].stored_hash, chain[1].content_hash);
        assert_ne!(broken[0].computed_hash, Some(chain[1].content_hash));
    }

    #[test]
    fn tampered_payload_breaks_hash_only() {
        let fx = Fixture::new();
        let mut chain = fx.chain();
        chain[0].metadata.computation_type = "edited".into();
        let link = fx.verifier().verify_link(&chain[0]);
        assert!(!link.valid);
        assert!(!link.content_hash_valid);
        assert!(link.signature_valid);
    }

    #[test]
    fn foreign_signer_breaks_signature() {
        let fx = Fixture::new();
        let chain = fx.chain();
        let other = KeyedSigner::from_secret("someone-else");
        let link = ChainVerifier::new(&other, &fx.store).verify_link(&chain[0]);
        assert!(link.content_hash_valid);
        assert!(!link.signature_valid);
        assert!(link.violations.contains(&IntegrityViolation::SignatureMismatch));
    }

    #[test]
    fn missing_predecessor_is_listed() {
        let fx = Fixture::new();
        let chain = fx.chain();
        let mut map = to_map(&chain);
        map.remove(&chain[1].id);

        let report = fx.verifier().verify_chain(&map, &chain[2].id);
        assert!(!report.valid);
        assert_eq!(report.missing_links, vec![chain[1].id]);
        assert_eq!(report.depth(), 1);
        assert!(report.trail[0].valid);
    }

    #[test]
    fn unknown_root_is_missing() {
        let fx = Fixture::new();
        let root = RecordId::new();
        let report = fx.verifier().verify_chain(&HashMap::new(), &root);
        assert!(!report.valid);
        assert!(report.trail.is_empty());
        assert_eq!(report.missing_links, vec![root]);
    }

    #[test]
    fn cycle_terminates_walk() {
        let fx = Fixture::new();
        let a = signed_record(&fx.signer, "m1", RecordKind::Compute, 10, None);
        let b = signed_record(&fx.signer, "m1", RecordKind::Compute, 10, Some(a.id));
        let mut a = a;
        a.prior_links = vec![b.id];
        let map = to_map(&[a.clone(), b.clone()]);

        let report = fx.verifier().verify_chain(&map, &b.id);
        assert!(!report.valid);
        assert_eq!(report.depth(), 2);
        assert_eq!(report.missing_links, vec![a.id]);
        assert!(report.trail[1]
            .violations
            .contains(&IntegrityViolation::PriorLinkCycle { prior: b.id }));
    }

    #[test]
    fn verification_is_idempotent() {
        let fx = Fixture::new();
        let chain = fx.chain();
        let map = to_map(&chain);
        let first = fx.verifier().verify_chain(&map, &chain[2].id);
        let second = fx.verifier().verify_chain(&map, &chain[2].id);
        assert_eq!(first, second);
    }

    #[test]
    fn slice_lookup_matches_map_lookup() {
        let fx = Fixture::new();
        let chain = fx.chain();
        let from_slice = fx.verifier().verify_chain(chain.as_slice(), &chain[2].id);
        let from_map = fx.verifier().verify_chain(&to_map(&chain), &chain[2].id);
        assert_eq!(from_slice, from_map);
    }

    #[test]
    fn report_serializes_camel_case() {
        let fx = Fixture::new();
        let chain = fx.chain();
        let report = fx.verifier().verify_chain(&to_map(&chain), &chain[0].id);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["missingLinks"].is_array());
        assert_eq!(json["trail"][0]["contentHashValid"], true);
        assert_eq!(json["trail"][0]["violations"][0]["type"], "durableRefUnresolved");
    }
}
