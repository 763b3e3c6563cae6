/// Time source used for reply timeouts and query spacing.
///
/// `delay_ms` is the cooperative yield point of every wait loop in the driver;
/// an executor-backed timer (or a busy delay on bare metal) both work.
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Monotonic milliseconds since an arbitrary origin.
    fn now_ms(&self) -> u64;

    /// Suspends the caller for at least `ms` milliseconds.
    async fn delay_ms(&mut self, ms: u32);
}
