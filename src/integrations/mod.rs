//! Third-party collaborators: payment provider and transactional e-mail.
pub mod paystack;
pub mod resend;

pub use paystack::{InitializePayment, PaymentProvider, PaymentSession, PaystackClient};
pub use resend::{Mailer, OutgoingEmail, ResendClient};
