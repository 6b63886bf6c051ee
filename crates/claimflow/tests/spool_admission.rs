//! Integration tests for ticket admission from the spool directory.

mod common;

use std::time::Duration;

use claimflow::claim::ClaimStatus;
use claimflow::db::claim_repo;
use claimflow::queue::ClaimTicket;

use common::ClaimHarness;

fn ticket(harness: &ClaimHarness, claim_id: &str, owner_id: &str, text: &str) -> ClaimTicket {
    let doc = harness.write_document(&format!("{}.pdf", claim_id), text);
    ClaimTicket {
        claim_id: claim_id.to_string(),
        owner_id: owner_id.to_string(),
        document_ref: doc.to_string_lossy().to_string(),
    }
}

#[test]
fn test_spooled_tickets_run_end_to_end() {
    let harness = ClaimHarness::new();
    let queue = harness.start_queue(2);

    let a = ticket(&harness, "spool-a", "owner-1", "Name: First Person\nTotal: $10.00");
    let b = ticket(&harness, "spool-b", "owner-2", "Name: Second Person\nTotal: $20.00");
    let path_a = harness.write_ticket("a.json", &a);
    let path_b = harness.write_ticket("b.json", &b);

    let watcher = harness.spool_watcher();
    assert_eq!(watcher.drain(&queue).unwrap(), 2);

    assert!(!path_a.exists(), "consumed ticket should be removed");
    assert!(!path_b.exists(), "consumed ticket should be removed");

    for _ in 0..2 {
        let outcome = queue
            .recv_outcome_timeout(Duration::from_secs(30))
            .expect("outcome within timeout");
        assert_eq!(outcome.status, Some(ClaimStatus::Completed));
    }

    let claim_a = claim_repo::find_by_id(&harness.db, "spool-a").unwrap().unwrap();
    assert_eq!(claim_a.owner_id, "owner-1");
    assert_eq!(claim_a.fields.name.as_deref(), Some("First Person"));

    let claim_b = claim_repo::find_by_id(&harness.db, "spool-b").unwrap().unwrap();
    assert_eq!(claim_b.owner_id, "owner-2");
    assert_eq!(claim_b.fields.amount, Some(20.0));

    queue.shutdown();
    queue.wait();
}

#[test]
fn test_malformed_ticket_is_set_aside_and_rest_run() {
    let harness = ClaimHarness::new();
    let queue = harness.start_queue(1);

    std::fs::write(harness.spool_dir.join("broken.json"), b"{ nope").unwrap();
    let good = ticket(&harness, "spool-good", "owner-1", "Total: $5.00");
    harness.write_ticket("good.json", &good);

    let watcher = harness.spool_watcher();
    assert_eq!(watcher.drain(&queue).unwrap(), 1);

    assert!(harness.spool_dir.join("broken.json.rejected").exists());
    assert!(!harness.spool_dir.join("broken.json").exists());
    assert!(!harness.spool_dir.join("good.json").exists());

    let outcome = queue.recv_outcome_timeout(Duration::from_secs(30)).unwrap();
    assert_eq!(outcome.claim_id, "spool-good");
    assert_eq!(outcome.status, Some(ClaimStatus::Completed));

    // A later scan must not pick the rejected ticket up again.
    assert!(watcher.scan().unwrap().is_empty());

    queue.shutdown();
    queue.wait();
}

#[test]
fn test_ticket_for_known_claim_reprocesses_without_duplicating() {
    let harness = ClaimHarness::new();
    let queue = harness.start_queue(1);
    let watcher = harness.spool_watcher();

    let first = ticket(&harness, "spool-again", "owner-1", "Total: $1.00");
    harness.write_ticket("first.json", &first);
    assert_eq!(watcher.drain(&queue).unwrap(), 1);
    queue.recv_outcome_timeout(Duration::from_secs(30)).unwrap();

    // Same claim id spooled again: the document now carries a new total.
    harness.write_document("spool-again.pdf", "Total: $2.00");
    harness.write_ticket("second.json", &first);
    assert_eq!(watcher.drain(&queue).unwrap(), 1);
    let outcome = queue.recv_outcome_timeout(Duration::from_secs(30)).unwrap();
    assert_eq!(outcome.status, Some(ClaimStatus::Completed));

    let owned = claim_repo::list_by_owner(&harness.db, "owner-1").unwrap();
    assert_eq!(owned.len(), 1, "re-admission must not create a second row");
    assert_eq!(owned[0].fields.amount, Some(2.0));

    queue.shutdown();
    queue.wait();
}
