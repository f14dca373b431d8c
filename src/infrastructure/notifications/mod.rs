pub mod log_notifier;
pub mod twilio;

pub use log_notifier::LogNotifier;
pub use twilio::TwilioNotifier;
