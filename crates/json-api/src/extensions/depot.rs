//! Depot helper extensions.

use std::any::Any;

use salvo::prelude::{Depot, StatusError};

/// Maps missing depot state to an internal server error.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError> {
        self.obtain::<T>()
            .map_err(|_missing| StatusError::internal_server_error())
    }
}
