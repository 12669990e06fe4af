//! Entity lookup, property comparison and related-entity assertions

use tracing::debug;

use super::{VerificationError, VerificationResult};
use crate::models::{EntityDetail, TypeDef};
use crate::repository::{RepositoryQuery, RepositoryService};

/// Look up the single entity of a type carrying this qualified name
///
/// Zero matches is [`VerificationError::NotFound`]; more than one is
/// [`VerificationError::Cardinality`].
pub async fn expect_single_entity<Q: RepositoryQuery + ?Sized>(
    service: &RepositoryService<Q>,
    type_def: TypeDef,
    qualified_name: &str,
) -> VerificationResult<EntityDetail> {
    let found = service
        .find_entity_by_property_value(type_def.guid, qualified_name)
        .await?;
    single(found, type_def, qualified_name)
}

/// Fetch the single entity of a type related to `entity`
pub async fn expect_single_related<Q: RepositoryQuery + ?Sized>(
    service: &RepositoryService<Q>,
    entity: &EntityDetail,
    type_def: TypeDef,
) -> VerificationResult<EntityDetail> {
    let found = service
        .get_related_entities(&entity.guid, type_def.guid)
        .await?;
    let context = format!(
        "{} {}",
        entity.instance_type.type_def_name,
        entity.qualified_name().unwrap_or_else(|| entity.guid.clone())
    );
    single(found, type_def, &context)
}

fn single(
    mut found: Vec<EntityDetail>,
    type_def: TypeDef,
    context: &str,
) -> VerificationResult<EntityDetail> {
    match found.len() {
        0 => Err(VerificationError::NotFound {
            type_name: type_def.name.to_string(),
            value: context.to_string(),
        }),
        1 => {
            let entity = found.remove(0);
            debug!("Matched {} {} for {}", type_def.name, entity.guid, context);
            Ok(entity)
        }
        count => Err(VerificationError::Cardinality {
            type_name: type_def.name.to_string(),
            context: context.to_string(),
            count,
        }),
    }
}

/// Check that the entity is the one the server assigned `guid` to
pub fn assert_guid(entity: &EntityDetail, guid: &str) -> VerificationResult<()> {
    if entity.guid == guid {
        return Ok(());
    }
    Err(VerificationError::GuidMismatch {
        type_name: entity.instance_type.type_def_name.clone(),
        qualified_name: entity.qualified_name().unwrap_or_default(),
        expected: guid.to_string(),
        actual: entity.guid.clone(),
    })
}

/// Compare one named property with its expected string value
pub fn assert_property(
    entity: &EntityDetail,
    property: &str,
    expected: &str,
) -> VerificationResult<()> {
    let actual = entity.properties.string_value(property);
    if actual.as_deref() == Some(expected) {
        return Ok(());
    }
    Err(VerificationError::PropertyMismatch {
        type_name: entity.instance_type.type_def_name.clone(),
        guid: entity.guid.clone(),
        property: property.to_string(),
        expected: expected.to_string(),
        actual,
    })
}

/// Compare properties in order, stopping at the first mismatch
pub fn assert_properties(
    entity: &EntityDetail,
    expectations: &[(&str, &str)],
) -> VerificationResult<()> {
    for (property, expected) in expectations {
        assert_property(entity, property, expected)?;
    }
    Ok(())
}
