//! Payment gateway integration and confirmation

pub mod confirmation;
pub mod gateway;

pub use confirmation::{
    PaymentConfirmation, PaymentOutcome, PaymentStatusView, WEBHOOK_SIGNATURE_HEADER, WebhookAck,
};
pub use gateway::{
    HttpPaymentGateway, PaymentGateway, PaymentSession, SessionRequest, SessionStatus,
};
