/// Global logical time source advanced by the scheduler's timer thread.
pub trait LogicalClock: Send + Sync {
    /// Advances logical time by one tick. Timer wheels hang off this call.
    fn advance(&self);
}
