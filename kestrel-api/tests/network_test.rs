use kestrel_api::network::PollEvent;
use kestrel_api::registry::DispatchOutcome;
use kestrel_api::types::{Message, ServiceHandle};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_event_from_raw() {
        assert_eq!(PollEvent::from_raw(0), PollEvent::Closed);
        assert_eq!(PollEvent::from_raw(-1), PollEvent::Transient);
        assert_eq!(PollEvent::from_raw(i32::MIN), PollEvent::Transient);
        assert_eq!(PollEvent::from_raw(1), PollEvent::Ready);
        assert_eq!(PollEvent::from_raw(64), PollEvent::Ready);
    }

    #[test]
    fn test_dispatch_outcome_is_idle() {
        assert!(DispatchOutcome::Idle.is_idle());
        assert!(!DispatchOutcome::Dispatched.is_idle());
    }

    #[test]
    fn test_service_handle_none() {
        assert!(ServiceHandle::NONE.is_none());
        assert!(ServiceHandle::default().is_none());
        assert!(!ServiceHandle(5).is_none());
    }

    #[test]
    fn test_message_payload_downcast() {
        let message = Message::new(ServiceHandle(3), 11, Box::new("ping".to_string()));

        assert_eq!(message.payload_ref::<String>().map(String::as_str), Some("ping"));
        assert!(message.payload_ref::<u64>().is_none());
        assert!(format!("{:?}", message).contains("session: 11"));
    }
}
