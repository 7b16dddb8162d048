pub mod api;

mod bindings;
mod catalog;
mod compare;
mod connection;
mod errors;
mod instances;

#[cfg(test)]
pub(crate) mod testutils;

pub use bindings::{BindDetails, Binding, ConnectionDetails};
pub use catalog::{Catalog, Plan, Service, Whitelist, WhitelistError, PROVIDER_NAMES};
pub use connection::{ConnectionStringFormat, ConnectionStringParams};
pub use errors::ApiError;
pub use instances::{
    normalize_cluster_name, DeprovisionedService, LastOperation, Operation, OperationState,
    ProvisionDetails, ProvisionedService, UpdateDetails, UpdatedService,
};

// Translates OSB calls into Atlas API calls. Stateless: the catalog is
// fixed at startup and the Atlas client arrives with each request.
pub struct Broker {
    catalog: Catalog,
}

impl Broker {
    // Without a whitelist the catalog is empty and every plan lookup
    // fails.
    pub fn new(whitelist: Option<Whitelist>) -> Self {
        Broker {
            catalog: Catalog::new(whitelist.unwrap_or_default()),
        }
    }

    pub fn services(&self) -> Vec<Service> {
        self.catalog.services()
    }
}
