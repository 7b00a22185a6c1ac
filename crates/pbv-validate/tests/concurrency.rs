//! Integration test: the pattern cache and validators under concurrent use.

use std::sync::Arc;
use std::thread;

use pbv_core::{Constraint, FieldDescriptor, Kind, Message, MessageDescriptor, Rule};
use pbv_validate::{PatternCache, Validator};

fn handle_descriptor() -> MessageDescriptor {
    MessageDescriptor::new(
        "test.Handle",
        [FieldDescriptor::singular("handle", 1, Kind::String).with_rule(Rule {
            regex: Some("[a-z][a-z0-9_]{2,15}".into()),
            ..Default::default()
        })],
    )
    .unwrap()
}

#[test]
fn test_concurrent_gets_agree() {
    let cache = Arc::new(PatternCache::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                (0..100)
                    .map(|i| {
                        let re = cache.get("[0-9]+").unwrap();
                        re.is_match(&i.to_string())
                    })
                    .all(|matched| matched)
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_shared_cache_across_validators() {
    let cache = Arc::new(PatternCache::new());
    let desc = handle_descriptor();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let validator = Validator::with_cache(Arc::clone(&cache));
            let desc = desc.clone();
            thread::spawn(move || {
                for i in 0..50 {
                    let good = Message::new(desc.clone())
                        .with("handle", format!("user_{worker}_{i}"))
                        .unwrap();
                    assert!(validator.validate(&good).is_ok());

                    let bad = Message::new(desc.clone())
                        .with("handle", format!("{i}-bad"))
                        .unwrap();
                    let err = validator.validate(&bad).unwrap_err();
                    assert_eq!(err.constraint, Constraint::Regex);
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_reset_racing_with_validation() {
    let validator = Validator::new();
    let desc = handle_descriptor();
    let msg = Message::new(desc).with("handle", "grace_h").unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..200 {
                validator.reset_cache();
            }
        });
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..200 {
                    assert!(validator.validate(&msg).is_ok());
                }
            });
        }
    });
}
