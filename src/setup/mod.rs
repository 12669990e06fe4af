//! Setup invokers
//!
//! Each invoker builds a well-formed descriptor, submits it through a
//! [`DataEngineClient`](crate::client::DataEngineClient) and returns what it
//! submitted, with the GUID the server assigned, so the harness can compare it
//! with what the repository holds. Client errors are propagated unchanged.

pub mod data_store;
pub mod process;

pub use data_store::DataStoreSetupService;
pub use process::ProcessSetupService;

use crate::models::Column;

/// A submitted descriptor and the GUID the server assigned to it
#[derive(Debug, Clone, PartialEq)]
pub struct Submitted<T> {
    pub guid: String,
    pub descriptor: T,
}

impl<T> Submitted<T> {
    pub fn new(guid: impl Into<String>, descriptor: T) -> Self {
        Self {
            guid: guid.into(),
            descriptor,
        }
    }
}

/// Build ordered columns named `<parent>::(column)=<name>`
pub(crate) fn columns_of(
    parent_qualified_name: &str,
    names: &[String],
    data_type: &str,
) -> Vec<Column> {
    names
        .iter()
        .enumerate()
        .map(|(position, name)| {
            Column::new(column_qualified_name(parent_qualified_name, name), name.as_str())
                .with_description(format!("{} column", name))
                .with_data_type(data_type)
                .at_position(position as i64)
        })
        .collect()
}

pub(crate) fn column_qualified_name(parent_qualified_name: &str, name: &str) -> String {
    format!("{}::(column)={}", parent_qualified_name, name)
}
