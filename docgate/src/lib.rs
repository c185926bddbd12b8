//! An HTTP gateway that exposes generic document CRUD over JSON.
//!
//! Clients name a collection and send filters, documents and updates as plain JSON.
//! Entity references travel as 24-character hex strings and are converted to native
//! `ObjectId`s on the way in and back to strings on the way out (see
//! [`coercion`] and [`serializer`]). The gateway also relays transactional email
//! through one of two interchangeable transports ([`mail`]).
//!
//! The binary wires everything from the environment; tests build an [`AppState`]
//! directly around an [`InMemoryStore`](memory::InMemoryStore):
//!
//! ```ignore
//! use docgate::{AppState, init_router, mail::{Mailer, Sender}, memory::InMemoryStore, store::DocumentStore};
//!
//! let mailer = Mailer::disabled(Sender { name: "LMS".into(), address: "onboarding@resend.dev".into() });
//! let state = AppState::new(DocumentStore::new(InMemoryStore::default()), mailer, "test");
//! let app = init_router(state);
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod mail;
pub mod modules;
pub mod router;
pub mod state;

pub use bson;
pub use docgate_core::{backend, coercion, convert, query, serializer, store};
pub use router::init_router;
pub use state::{AppState, init_app_state};

pub mod memory {
    pub use docgate_memory::{InMemoryStore, InMemoryStoreBuilder};
}

#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docgate_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
