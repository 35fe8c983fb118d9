//! URL helpers: domain and origin keys, link resolution, and visit keys

mod domain;
mod normalize;

pub use domain::{domain_of, extract_domain, origin_of};
pub use normalize::{resolve_link, visit_key};
