//! Offset/limit pagination over `search_read`.

use std::ops::ControlFlow;

use serde_json::Value;
use tracing::debug;

use crate::domain::Domain;
use crate::error::{Error, Result, RpcError};
use crate::params::Params;
use crate::record::Record;
use crate::session::Session;

impl Session {
    /// Read every record matching `domain`, `page_size` at a time.
    ///
    /// `on_page` receives each non-empty page as a list view. The loop ends
    /// when a page comes back empty (the callback is not invoked), when a
    /// page is shorter than `page_size` (it is still delivered), or when the
    /// callback returns [`ControlFlow::Break`]. An `offset` in `params` is
    /// the starting point; `limit` is overridden.
    ///
    /// Returns the number of records delivered.
    pub fn search_read_all<F>(
        &self,
        model: &str,
        domain: impl Into<Domain>,
        params: Params,
        page_size: usize,
        mut on_page: F,
    ) -> Result<usize>
    where
        F: FnMut(Record<'_>) -> ControlFlow<()>,
    {
        if page_size == 0 {
            return Err(Error::InvalidArgument("page size must be positive".into()));
        }

        let domain = domain.into();
        let mut offset = params
            .get("offset")
            .and_then(Value::as_u64)
            .map_or(0, |o| o as usize);
        let mut delivered = 0;

        loop {
            let mut page_params = params.clone();
            page_params.insert("offset", offset);
            page_params.insert("limit", page_size);

            let rows = self.search_read(model, domain.clone(), page_params.clone())?;
            let len = match &rows {
                Value::Array(items) => items.len(),
                other => {
                    return Err(RpcError::Decode(format!("search_read returned {}", other)).into());
                }
            };
            debug!(model, offset, len, "page");

            if len == 0 {
                break;
            }
            delivered += len;

            let page = Record::new(self, model, rows, page_params);
            if on_page(page).is_break() || len < page_size {
                break;
            }
            offset += page_size;
        }

        Ok(delivered)
    }
}
