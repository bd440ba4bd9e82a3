use kestrel_api::monitor::{Stall, StallDetector};
use kestrel_api::types::ServiceHandle;
use std::sync::Arc;
use std::thread;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_detector_is_never_flagged() {
        let detector = StallDetector::new();

        for _ in 0..5 {
            assert_eq!(detector.check(), None);
        }
        assert_eq!(detector.in_flight(), None);
    }

    #[test]
    fn test_stuck_message_flagged_on_second_check() {
        let detector = StallDetector::new();
        detector.begin(ServiceHandle(1), ServiceHandle(7));

        // First cycle only records the version
        assert_eq!(detector.check(), None);

        // Nothing moved since the previous cycle
        let stall = detector.check().expect("stall should be reported");
        assert_eq!(stall.source, ServiceHandle(1));
        assert_eq!(stall.destination, ServiceHandle(7));
        assert_eq!(stall.version, detector.version());

        // The report repeats for as long as the message stays stuck
        assert!(detector.check().is_some());
    }

    #[test]
    fn test_progress_between_checks_clears_stall() {
        let detector = StallDetector::new();
        detector.begin(ServiceHandle(1), ServiceHandle(7));
        assert_eq!(detector.check(), None);

        detector.finish();
        detector.begin(ServiceHandle(2), ServiceHandle(7));

        // Same destination, but the version moved on
        assert_eq!(detector.check(), None);
    }

    #[test]
    fn test_finished_message_is_not_a_stall() {
        let detector = StallDetector::new();
        detector.begin(ServiceHandle(3), ServiceHandle(4));
        detector.finish();

        assert_eq!(detector.check(), None);
        assert_eq!(detector.check(), None);
        assert_eq!(detector.in_flight(), None);
    }

    #[test]
    fn test_version_advances_on_begin_and_finish() {
        let detector = StallDetector::new();
        let start = detector.version();

        detector.begin(ServiceHandle(1), ServiceHandle(2));
        assert_eq!(detector.in_flight(), Some(ServiceHandle(2)));
        detector.finish();

        assert_eq!(detector.version(), start + 2);
    }

    #[test]
    fn test_busy_writer_thread_is_not_flagged() {
        let detector = Arc::new(StallDetector::new());
        let writer = {
            let detector = detector.clone();
            thread::spawn(move || {
                for i in 1..=10_000u32 {
                    detector.begin(ServiceHandle(i), ServiceHandle(9));
                    detector.finish();
                }
            })
        };
        writer.join().unwrap();

        assert_eq!(detector.check(), None);
        assert_eq!(detector.check(), None);
    }

    #[test]
    fn test_stall_display() {
        let stall = Stall {
            source: ServiceHandle(1),
            destination: ServiceHandle(0xff),
            version: 12,
        };

        assert_eq!(
            stall.to_string(),
            "a message from [ :00000001 ] to [ :000000ff ] may be in an endless loop (version = 12)"
        );
    }
}
