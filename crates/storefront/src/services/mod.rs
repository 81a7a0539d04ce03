//! External service clients: the Razorpay payment gateway and SMTP email.

pub mod email;
pub mod razorpay;

pub use email::EmailService;
pub use razorpay::RazorpayClient;
