/// Sink for transient user-facing messages.
///
/// The view layer supplies the real implementation (a toast queue); the
/// runtime depends on nothing beyond this two-method contract.
pub trait Notifier {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}
