mod email;
mod refund;

pub use email::{EmailSender, GuardedEmailSender, LoggingEmailSender};
pub use refund::{AutoApproveRefunds, RefundProcessor, RefundReceipt};
