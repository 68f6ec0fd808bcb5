//! Turns provider models into local records and outbound requests.

pub mod payment_method;
pub mod refund;

pub use payment_method::{PaymentMethodPayload, PaymentMethodPayloadBuilder};
pub use refund::RefundPayloadBuilder;
