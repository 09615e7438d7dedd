use crate::base::clock::{Clock, ManualClock, SystemClock};
use crate::base::storeerror::StoreError;
use crate::storage::ValueKind;

#[test]
fn test_record_corruption_classification() {
    assert!(StoreError::codec("bad hex").is_record_corruption());
    assert!(StoreError::invalid_cookie("empty name").is_record_corruption());

    let io = StoreError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
    assert!(!io.is_record_corruption());
}

#[test]
fn test_type_mismatch_message() {
    let err = StoreError::type_mismatch("volume", ValueKind::Int, ValueKind::String);
    assert_eq!(
        err.to_string(),
        "Value for 'volume' has kind String, expected Int"
    );
}

#[test]
fn test_manual_clock() {
    let clock = ManualClock::new(1_000);
    assert_eq!(clock.now_millis(), 1_000);
    clock.advance(500);
    assert_eq!(clock.now_millis(), 1_500);
    clock.set(10);
    assert_eq!(clock.now_millis(), 10);
}

#[test]
fn test_system_clock_is_after_2020() {
    // 2020-01-01T00:00:00Z
    assert!(SystemClock.now_millis() > 1_577_836_800_000);
}
