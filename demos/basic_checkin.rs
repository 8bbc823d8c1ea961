//! Basic check-in example.
//!
//! Issues a code for an in-memory event, scans it as the attendee, then
//! scans it again to show the replay and duplicate rejections.
//!
//! # Running
//!
//! ```bash
//! export ROLLCALL_SECRET="a-long-random-secret-from-your-vault"
//! cargo run --example basic_checkin
//! ```

use chrono::{Duration, Utc};
use rollcall::{
    CheckInManager, EventRecord, Identity, MemoryStore, Role, RollcallConfig, RollcallError,
    StaticIdentity, Stores,
};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = match RollcallConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(MemoryStore::new());
    store
        .put_event(EventRecord {
            id: "demo-event".into(),
            title: "Intro to Rust".into(),
            club_id: "cs".into(),
            club_name: "CS Club".into(),
            location: "Library Room B".into(),
            start: Utc::now() + Duration::minutes(30),
            end: Utc::now() + Duration::hours(2),
        })
        .await;

    let me = StaticIdentity(Some(Identity::new("student-42", Role::Attendee)));
    let manager = match CheckInManager::new(config, Stores::shared(store), Arc::new(me)) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match manager.generate_for("demo-event").await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Could not issue code: {}", e);
            std::process::exit(1);
        }
    };
    println!("QR payload: {}", code.encoded);
    println!("QR modules per side: {}", code.image.width());

    // First scan records attendance; the repeat is refused by the replay
    // guard; a fresh code for the same person is refused by the store.
    for label in ["first scan", "same code again"] {
        report(label, manager.check_in(&code.encoded).await);
    }
    if let Ok(fresh) = manager.generate_for("demo-event").await {
        report("fresh code", manager.check_in(&fresh.encoded).await);
    }
}

fn report(label: &str, outcome: Result<rollcall::CheckInOutcome, RollcallError>) {
    match outcome {
        Ok(o) => println!("✓ {}: checked in to {} ({})", label, o.event_title, o.method),
        Err(e) if e.is_benign() => println!("• {}: {}", label, e.user_message()),
        Err(RollcallError::SignatureInvalid) => {
            eprintln!("SECURITY: {}: forged or tampered code", label);
        }
        Err(e) => eprintln!("✗ {}: {} ({})", label, e.user_message(), e),
    }
}
