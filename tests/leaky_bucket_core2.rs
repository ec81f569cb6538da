// Verbose admission results.

use rate_guard_leaky::clock::ManualClock;
use rate_guard_leaky::error::Overflow;
use rate_guard_leaky::rate_limiters::{LeakyBucketCore, LeakyBucketCoreConfig};

fn new_leaky(target_rate: f64, capacity: Option<f64>) -> LeakyBucketCore<ManualClock> {
    let mut config = LeakyBucketCoreConfig::new(target_rate);
    config.capacity = capacity;
    LeakyBucketCore::with_clock(config, ManualClock::new(0)).unwrap()
}

#[test]
fn test_ok_then_overflow() {
    let limiter = new_leaky(1000.0, None);
    for _ in 0..1001 {
        assert_eq!(limiter.try_admit_verbose_at(0), Ok(()));
    }

    let err = limiter.try_admit_verbose_at(0).unwrap_err();
    assert_eq!(
        err,
        Overflow {
            level: 1001.0,
            capacity: 1001.0,
            retry_after_ms: 1,
        }
    );

    assert_eq!(limiter.try_admit_verbose_at(1), Ok(()));
}

#[test]
fn test_retry_after_behaves_correctly() {
    // 0.5 token/ms, capacity 2.5: three admissions leave the level at 3
    let limiter = new_leaky(500.0, Some(2.5));
    for _ in 0..3 {
        assert_eq!(limiter.try_admit_verbose_at(0), Ok(()));
    }

    let retry_after = match limiter.try_admit_verbose_at(0) {
        Err(Overflow { retry_after_ms, .. }) => retry_after_ms,
        Ok(()) => panic!("Expected Overflow"),
    };
    assert_eq!(retry_after, 2);

    // Exactly at capacity one millisecond early
    let too_early = retry_after - 1;
    assert!(
        limiter.try_admit_verbose_at(too_early).is_err(),
        "Should fail at tick {}",
        too_early
    );

    assert_eq!(limiter.try_admit_verbose_at(retry_after), Ok(()));
}

#[test]
fn test_overflow_reports_level_after_decay() {
    let limiter = new_leaky(1000.0, Some(4.0));
    for _ in 0..4 {
        assert!(limiter.try_admit_at(0));
    }

    // At tick 0 the bucket is exactly full
    let err = limiter.try_admit_verbose_at(0).unwrap_err();
    assert_eq!(err.level, 4.0);
    assert_eq!(err.capacity, 4.0);

    // One millisecond drains one token, enough to admit again
    assert_eq!(limiter.try_admit_verbose_at(1), Ok(()));
    assert_eq!(limiter.current_level(), 4.0);
}

#[test]
fn test_verbose_and_plain_agree() {
    let plain = new_leaky(10.0, None);
    let verbose = new_leaky(10.0, None);

    for tick in (0..2000).step_by(7) {
        for _ in 0..3 {
            assert_eq!(plain.try_admit_at(tick), verbose.try_admit_verbose_at(tick).is_ok());
        }
    }
    assert_eq!(plain.current_level(), verbose.current_level());
}

#[test]
fn test_verbose_reads_clock() {
    let clock = ManualClock::new(0);
    let limiter = LeakyBucketCore::with_clock(
        LeakyBucketCoreConfig::new(1000.0).with_capacity(1.0),
        clock.clone(),
    )
    .unwrap();

    assert_eq!(limiter.try_admit_verbose(), Ok(()));
    assert!(limiter.try_admit_verbose().is_err());

    clock.advance(1);
    assert_eq!(limiter.try_admit_verbose(), Ok(()));
}

#[test]
fn test_overflow_display() {
    let overflow = Overflow {
        level: 101.0,
        capacity: 101.0,
        retry_after_ms: 10,
    };
    assert_eq!(
        overflow.to_string(),
        "bucket overflow: level 101.000 reached capacity 101.000, retry after 10 ms"
    );
}
