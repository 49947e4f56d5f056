//! Client side of signup: form state, the HTTP client for `/auth/signup`,
//! and the page controller that ties them to navigation and session state.

pub mod api;
pub mod form;
pub mod page;

pub use api::{HttpSignupApi, SignupApi, SignupReply};
pub use form::{Effect, Field, FormEvent, FormState, Phase};
pub use page::{Navigator, SessionCache, SignupPage};
