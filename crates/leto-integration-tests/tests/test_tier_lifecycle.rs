//! Tier lifecycle scenarios: evidence-driven upgrades, the 90-day
//! reverification window, and the idempotent downgrade sweep.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use leto_core::{Clock, DomainName, ManualClock};
use leto_trust::{
    reverification_window, EntityDirectory, LegalEntity, Tier, TierEvaluator,
    VerificationEvidence, VerificationMethod,
};

fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2031, 3, 14, 9, 0, 0).unwrap()
}

fn setup() -> (Arc<EntityDirectory>, Arc<ManualClock>, TierEvaluator) {
    let directory = Arc::new(EntityDirectory::new());
    let clock = Arc::new(ManualClock::new(start()));
    let evaluator = TierEvaluator::new(directory.clone(), clock.clone());
    (directory, clock, evaluator)
}

fn register(directory: &EntityDirectory, clock: &ManualClock, domain: &str) -> LegalEntity {
    directory
        .register(
            DomainName::new(domain).unwrap(),
            format!("Entity at {domain}"),
            clock.now(),
        )
        .unwrap()
}

fn dns_proof(domain: &str) -> VerificationEvidence {
    VerificationEvidence::DnsTxt {
        domain: domain.to_string(),
        challenge: "leto-verify-8fa3bc".to_string(),
        observed_records: vec!["leto-verify-8fa3bc".to_string()],
    }
}

/// The central tier scenario: a Tier 3 entity presents DNS proof,
/// becomes Tier 2 with a deadline 90 days out; the sweep at due + 1 day
/// without renewal lands it back at Tier 3 with the deadline cleared.
#[test]
fn dns_proof_then_lapse_cycles_through_tier2() {
    let (directory, clock, evaluator) = setup();
    let entity = register(&directory, &clock, "carrier.example.com");
    assert_eq!(entity.tier, Tier::Tier3);

    let verified = evaluator
        .apply_evidence(&entity.id, &dns_proof("carrier.example.com"))
        .unwrap();
    assert_eq!(verified.tier, Tier::Tier2);
    assert_eq!(verified.verification_method, Some(VerificationMethod::DnsTxt));
    assert_eq!(
        verified.reverification_due,
        Some(start() + reverification_window())
    );

    clock.advance(reverification_window() + Duration::days(1));
    let report = evaluator.run_sweep();
    assert_eq!(report.downgraded.len(), 1);

    let after = directory.get(&entity.id).unwrap();
    assert_eq!(after.tier, Tier::Tier3);
    assert!(after.reverification_due.is_none());
}

/// Renewal within the window keeps Tier 2 and pushes the deadline.
#[test]
fn renewal_within_window_prevents_downgrade() {
    let (directory, clock, evaluator) = setup();
    let entity = register(&directory, &clock, "carrier.example.com");
    evaluator
        .apply_evidence(&entity.id, &dns_proof("carrier.example.com"))
        .unwrap();

    clock.advance(Duration::days(80));
    evaluator
        .apply_evidence(&entity.id, &dns_proof("carrier.example.com"))
        .unwrap();

    // The original deadline has long passed; the renewed one has not.
    clock.advance(Duration::days(30));
    let report = evaluator.run_sweep();
    assert!(report.downgraded.is_empty());
    assert_eq!(directory.get(&entity.id).unwrap().tier, Tier::Tier2);
}

/// Running the sweep twice with no new evidence produces the same end
/// state as running it once.
#[test]
fn sweep_is_idempotent_across_runs() {
    let (directory, clock, evaluator) = setup();
    let entity = register(&directory, &clock, "carrier.example.com");
    evaluator
        .apply_evidence(&entity.id, &dns_proof("carrier.example.com"))
        .unwrap();
    clock.advance(reverification_window() + Duration::days(1));

    evaluator.run_sweep();
    let first = directory.get(&entity.id).unwrap();

    evaluator.run_sweep();
    let second = directory.get(&entity.id).unwrap();

    assert_eq!(first.tier, second.tier);
    assert_eq!(first.reverification_due, second.reverification_due);
    assert_eq!(first.updated_at, second.updated_at, "second run must be a no-op");
}

/// The tier/deadline invariant holds across every transition the model
/// can make.
#[test]
fn deadline_invariant_holds_across_transitions() {
    let (directory, clock, evaluator) = setup();
    let entity = register(&directory, &clock, "carrier.example.com");

    let check = |directory: &EntityDirectory| {
        let e = directory.get(&entity.id).unwrap();
        assert!(e.invariant_holds(), "invariant broken at tier {}", e.tier);
    };
    check(&directory);

    evaluator
        .apply_evidence(&entity.id, &dns_proof("carrier.example.com"))
        .unwrap();
    check(&directory);

    evaluator
        .apply_evidence(
            &entity.id,
            &VerificationEvidence::EHerkenning {
                assertion_id: "EH-2031-000441".to_string(),
                level_of_assurance: "EH4".to_string(),
                registry_number: "58231904".to_string(),
            },
        )
        .unwrap();
    check(&directory);

    // Tier 1 never decays.
    clock.advance(Duration::days(400));
    evaluator.run_sweep();
    let e = directory.get(&entity.id).unwrap();
    assert_eq!(e.tier, Tier::Tier1);
    assert!(e.reverification_due.is_none());
}

/// eHerkenning proof upgrades a lapsed entity again after decay.
#[test]
fn entities_cycle_indefinitely() {
    let (directory, clock, evaluator) = setup();
    let entity = register(&directory, &clock, "carrier.example.com");

    for _ in 0..3 {
        evaluator
            .apply_evidence(&entity.id, &dns_proof("carrier.example.com"))
            .unwrap();
        assert_eq!(directory.get(&entity.id).unwrap().tier, Tier::Tier2);

        clock.advance(reverification_window() + Duration::days(1));
        evaluator.run_sweep();
        assert_eq!(directory.get(&entity.id).unwrap().tier, Tier::Tier3);
    }
}
