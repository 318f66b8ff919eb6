//! Client for the Odoo external (XML-RPC) API.
//!
//! A [`Session`] authenticates against one database and exposes the model
//! operations (`search_read`, `write`, `fields_get`, ...). Results can be
//! wrapped in a [`Record`] view, which resolves `*_id` / `*_ids` relations
//! into nested views on first access and remembers them.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use odoo_client::{Domain, Params, Session, XmlRpcTransport};
//!
//! let transport = XmlRpcTransport::new("https://erp.example.com")?;
//! let session = Session::connect(Arc::new(transport), "prod", "admin", "secret")?;
//!
//! let partners = session.browse(
//!     "res.partner",
//!     Domain::new().filter("is_company", "=", true),
//!     Params::new().fields(["name", "country_id"]).limit(10),
//! )?;
//! for mut partner in partners.into_records()? {
//!     let country = partner.dig(&["country", "name"])?;
//!     println!("{:?}", country.and_then(|c| c.as_str().map(str::to_string)));
//! }
//! ```

pub mod codec;
pub mod domain;
pub mod error;
pub mod fields;
pub mod paginate;
pub mod params;
pub mod record;
pub mod session;
pub mod transport;
pub mod xmlrpc;

pub use domain::{normalize, Domain};
pub use error::{Error, Result, RpcError};
pub use fields::{FieldDescriptor, FieldSet};
pub use params::Params;
pub use record::{Field, Key, Record};
pub use session::{Session, DEFAULT_MODEL_ATTRIBUTES};
pub use transport::{Call, Transport};
pub use xmlrpc::{TransportOptions, XmlRpcTransport};
