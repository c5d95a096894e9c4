//! Request dispatch for the SBI verbs.
//!
//! A connection carries exactly one request. The handler reads it, answers
//! `OPTIONS` pre-flights itself, and hands every allowed verb to the
//! [`RequestDispatcher`], which routes it to one of the verb handlers:
//!
//! | Verbs | Handler |
//! |---|---|
//! | `MOSIPDISC`, `GET`, `MOSIPDINFO` | discovery |
//! | `RCAPTURE`, `CAPTURE` | capture |
//! | `STREAM` | stream |
//! | `SETSTATUS`, `SETSCORE`, `SETDELAY`, `SETPROFILE` | admin |
//!
//! Handlers return [`errors::DispatchError`]; the router renders it in the
//! error shape of the verb's family, so clients always receive JSON.

mod admin;
mod capture;
mod discovery;
mod dto;
mod errors;
mod filter;
mod handler;
mod request;
mod response;
mod router;
mod stream;

pub(crate) use self::handler::DispatchConnectionHandler;
pub use self::request::{RawRequest, RequestError};
pub use self::response::{ResponseFramer, ResponseWriter};
pub(crate) use self::router::{Collaborators, DispatchSettings, RequestDispatcher};
pub use self::router::{Verb, VerbFamily};
