//! Lineage chain verification
//!
//! Lineage mappings are stored as undirected relationships between attribute
//! entities. A chain `[a, b, c, ...]` is read as directed `a -> b -> c`: the
//! attribute at position `i` must be mapped to exactly its predecessor (when
//! there is one) and its successor. Comparison ignores storage order.

use std::collections::BTreeMap;
use tracing::debug;

use super::{VerificationError, VerificationResult};
use crate::repository::{RepositoryQuery, RepositoryService};

/// Check every node of a chain except the last against its neighbours
///
/// Returns the number of nodes checked.
pub async fn verify_lineage_chain<Q: RepositoryQuery + ?Sized>(
    service: &RepositoryService<Q>,
    chain: &[String],
) -> VerificationResult<usize> {
    let mut previous: Option<&str> = None;
    let mut checked = 0;

    for (current, next) in chain.iter().zip(chain.iter().skip(1)) {
        let guid = service.find_entity_guid_by_qualified_name(current).await?;
        let relationships = service.find_relationships_by_guid(&guid).await?;
        let mut actual = service.lineage_mappings_proxies_qualified_names(&relationships, current);

        let mut expected: Vec<String> = previous.map(str::to_string).into_iter().collect();
        expected.push(next.clone());

        expected.sort();
        actual.sort();
        if expected != actual {
            return Err(VerificationError::LineageMismatch {
                attribute: current.clone(),
                expected,
                actual,
            });
        }

        previous = Some(current);
        checked += 1;
    }

    Ok(checked)
}

/// Check the lineage chain of every logical column
pub async fn verify_column_lineages<Q: RepositoryQuery + ?Sized>(
    service: &RepositoryService<Q>,
    column_lineages: &BTreeMap<String, Vec<String>>,
) -> VerificationResult<usize> {
    let mut checked = 0;
    for (column, chain) in column_lineages {
        let nodes = verify_lineage_chain(service, chain).await?;
        debug!("Verified {} lineage nodes for column {}", nodes, column);
        checked += nodes;
    }
    Ok(checked)
}
