mod user;
mod client;
mod invoice;

pub use user::{NewUser, User};
pub use client::{Client, NewClient};
pub use invoice::{Invoice, NewInvoice};
