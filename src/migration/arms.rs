//! Migration arms for each stored entity type, newest shapes last.

use serde_json::{json, Value};

use super::{ensure_array, has_field, rename_field, MigrationArm, Plain};

pub const SHELL_ARMS: &[MigrationArm] = &[
    MigrationArm {
        name: "shell 1.0.0 single default thumbnail",
        schema_version: "1.0.0",
        matches: shell_has_single_thumbnail,
        rewrite: shell_thumbnail_to_list,
    },
    MigrationArm {
        name: "shell 1.0.0 without thumbnails",
        schema_version: "1.0.0",
        matches: shell_lacks_thumbnails,
        rewrite: shell_empty_thumbnails,
    },
];

pub const CONCEPT_DESCRIPTION_ARMS: &[MigrationArm] = &[MigrationArm {
    name: "concept description 1.0.0 without isCaseOf",
    schema_version: "1.0.0",
    matches: concept_description_lacks_is_case_of,
    rewrite: concept_description_default_is_case_of,
}];

pub const PASSPORT_ARMS: &[MigrationArm] = &[
    MigrationArm {
        name: "passport 1.0.0 owned by organization",
        schema_version: "1.0.0",
        matches: has_legacy_owner,
        rewrite: passport_rename_owner,
    },
    MigrationArm {
        name: "passport 1.0.0 environment without concept descriptions",
        schema_version: "1.0.0",
        matches: environment_lacks_concept_descriptions,
        rewrite: passport_default_environment,
    },
];

pub const TEMPLATE_ARMS: &[MigrationArm] = &[
    MigrationArm {
        name: "template 1.0.0 owned by organization",
        schema_version: "1.0.0",
        matches: has_legacy_owner,
        rewrite: template_rename_owner,
    },
    MigrationArm {
        name: "template 1.0.0 repeatable sections without granularity",
        schema_version: "1.0.0",
        matches: template_has_ungranular_repeatables,
        rewrite: template_default_granularity,
    },
];

fn asset_information(plain: &Plain) -> Option<&serde_json::Map<String, Value>> {
    plain.get("assetInformation").and_then(Value::as_object)
}

fn shell_has_single_thumbnail(plain: &Plain) -> bool {
    asset_information(plain)
        .map(|info| info.get("defaultThumbnail").map(Value::is_object).unwrap_or(false))
        .unwrap_or(false)
}

fn shell_lacks_thumbnails(plain: &Plain) -> bool {
    asset_information(plain)
        .map(|info| !info.contains_key("defaultThumbnails"))
        .unwrap_or(false)
}

fn shell_defaults(plain: &mut Plain) {
    for key in ["extensions", "displayName", "description", "submodels"] {
        ensure_array(plain, key);
    }
}

fn shell_thumbnail_to_list(mut plain: Plain) -> Plain {
    if let Some(Value::Object(info)) = plain.get_mut("assetInformation") {
        let thumbnail = info.remove("defaultThumbnail").unwrap_or(Value::Null);
        info.insert("defaultThumbnails".to_string(), json!([thumbnail]));
    }
    shell_defaults(&mut plain);
    plain
}

fn shell_empty_thumbnails(mut plain: Plain) -> Plain {
    if let Some(Value::Object(info)) = plain.get_mut("assetInformation") {
        info.remove("defaultThumbnail");
        info.insert("defaultThumbnails".to_string(), json!([]));
    }
    shell_defaults(&mut plain);
    plain
}

fn concept_description_lacks_is_case_of(plain: &Plain) -> bool {
    !plain.get("isCaseOf").map(Value::is_array).unwrap_or(false)
}

fn concept_description_default_is_case_of(mut plain: Plain) -> Plain {
    ensure_array(&mut plain, "isCaseOf");
    plain
}

fn has_legacy_owner(plain: &Plain) -> bool {
    has_field(plain, "ownedByOrganizationId") && !has_field(plain, "organizationId")
}

fn environment_lacks_concept_descriptions(plain: &Plain) -> bool {
    plain
        .get("environment")
        .and_then(Value::as_object)
        .map(|env| !env.contains_key("conceptDescriptions"))
        .unwrap_or(false)
}

fn default_environment(plain: &mut Plain) {
    let environment = plain
        .entry("environment".to_string())
        .or_insert_with(|| json!({}));
    if let Value::Object(env) = environment {
        for key in ["assetAdministrationShells", "submodels", "conceptDescriptions"] {
            ensure_array(env, key);
        }
    }
}

fn passport_rename_owner(mut plain: Plain) -> Plain {
    rename_field(&mut plain, "ownedByOrganizationId", "organizationId");
    default_environment(&mut plain);
    plain
}

fn passport_default_environment(mut plain: Plain) -> Plain {
    default_environment(&mut plain);
    plain
}

fn is_ungranular_repeatable(section: &Value) -> bool {
    section.get("type").and_then(Value::as_str) == Some("Repeatable")
        && section
            .get("granularityLevel")
            .map(Value::is_null)
            .unwrap_or(true)
}

fn template_has_ungranular_repeatables(plain: &Plain) -> bool {
    plain
        .get("sections")
        .and_then(Value::as_array)
        .map(|sections| sections.iter().any(is_ungranular_repeatable))
        .unwrap_or(false)
}

fn default_section_granularity(plain: &mut Plain) {
    if let Some(Value::Array(sections)) = plain.get_mut("sections") {
        for section in sections.iter_mut() {
            if is_ungranular_repeatable(section) {
                if let Value::Object(fields) = section {
                    fields.insert("granularityLevel".to_string(), json!("Model"));
                }
            }
        }
    }
}

fn template_default_granularity(mut plain: Plain) -> Plain {
    default_section_granularity(&mut plain);
    default_environment(&mut plain);
    plain
}

fn template_rename_owner(mut plain: Plain) -> Plain {
    rename_field(&mut plain, "ownedByOrganizationId", "organizationId");
    default_section_granularity(&mut plain);
    default_environment(&mut plain);
    plain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MigrationResolver;
    use crate::store::StoredDocument;

    fn stored(tag: &str, body: Value) -> StoredDocument {
        StoredDocument {
            id: "doc-1".to_string(),
            schema_version: tag.to_string(),
            body: body.as_object().cloned().unwrap(),
        }
    }

    fn resolve_twice(arms: &'static [MigrationArm], document: StoredDocument) -> (Plain, Plain) {
        let resolver = MigrationResolver::new(arms);
        let once = resolver.resolve(&document);
        let twice = resolver.resolve(&StoredDocument {
            body: once.clone(),
            ..document
        });
        (once, twice)
    }

    #[test]
    fn test_shell_single_thumbnail_becomes_list() {
        let doc = stored(
            "1.0.0",
            json!({
                "assetInformation": {
                    "assetKind": "Instance",
                    "specificAssetIds": [],
                    "globalAssetId": "doc-1",
                    "defaultThumbnail": {"path": "https://example.png", "contentType": "image/png"}
                }
            }),
        );
        let plain = MigrationResolver::new(SHELL_ARMS).resolve(&doc);

        assert_eq!(
            plain["assetInformation"]["defaultThumbnails"],
            json!([{"path": "https://example.png", "contentType": "image/png"}])
        );
        assert!(plain["assetInformation"].get("defaultThumbnail").is_none());
        assert_eq!(plain["extensions"], json!([]));
        assert_eq!(plain["submodels"], json!([]));
    }

    #[test]
    fn test_shell_without_thumbnail_gets_empty_list() {
        let doc = stored("1.0.0", json!({"assetInformation": {"assetKind": "Type"}}));
        let plain = MigrationResolver::new(SHELL_ARMS).resolve(&doc);
        assert_eq!(plain["assetInformation"]["defaultThumbnails"], json!([]));
    }

    #[test]
    fn test_shell_arms_are_idempotent() {
        let doc = stored(
            "1.0.0",
            json!({"assetInformation": {"assetKind": "Instance", "defaultThumbnail": {"path": "a.png"}}}),
        );
        let (once, twice) = resolve_twice(SHELL_ARMS, doc);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_concept_description_gains_is_case_of() {
        let doc = stored("1.0.0", json!({"idShort": "weight", "displayName": [], "description": []}));
        let (once, twice) = resolve_twice(CONCEPT_DESCRIPTION_ARMS, doc);
        assert_eq!(once["isCaseOf"], json!([]));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_concept_description_current_shape_untouched() {
        let body = json!({"isCaseOf": [{"type": "ExternalReference", "keys": []}]});
        let plain = MigrationResolver::new(CONCEPT_DESCRIPTION_ARMS).resolve(&stored("1.0.0", body.clone()));
        assert_eq!(plain["isCaseOf"], body["isCaseOf"]);
    }

    #[test]
    fn test_passport_legacy_owner_renamed() {
        let doc = stored(
            "1.0.0",
            json!({
                "ownedByOrganizationId": "org-1",
                "environment": {"assetAdministrationShells": ["s1"], "submodels": []},
                "createdAt": "2022-01-01T00:00:00.000Z",
                "updatedAt": "2022-01-01T00:00:00.000Z"
            }),
        );
        let (once, twice) = resolve_twice(PASSPORT_ARMS, doc);
        assert_eq!(once["organizationId"], json!("org-1"));
        assert!(once.get("ownedByOrganizationId").is_none());
        assert_eq!(once["environment"]["conceptDescriptions"], json!([]));
        assert_eq!(once["environment"]["assetAdministrationShells"], json!(["s1"]));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_template_repeatable_sections_default_to_model() {
        let doc = stored(
            "1.0.0",
            json!({
                "organizationId": "org-1",
                "sections": [
                    {"id": "a", "name": "Materials", "type": "Repeatable"},
                    {"id": "b", "name": "General", "type": "Group"},
                    {"id": "c", "name": "Parts", "type": "Repeatable", "granularityLevel": "Item"}
                ]
            }),
        );
        let (once, twice) = resolve_twice(TEMPLATE_ARMS, doc);
        assert_eq!(once["sections"][0]["granularityLevel"], json!("Model"));
        assert!(once["sections"][1].get("granularityLevel").is_none());
        assert_eq!(once["sections"][2]["granularityLevel"], json!("Item"));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_template_legacy_owner_also_fixes_sections() {
        let doc = stored(
            "1.0.0",
            json!({
                "ownedByOrganizationId": "org-9",
                "sections": [{"id": "a", "name": "Materials", "type": "Repeatable"}]
            }),
        );
        let plain = MigrationResolver::new(TEMPLATE_ARMS).resolve(&doc);
        assert_eq!(plain["organizationId"], json!("org-9"));
        assert_eq!(plain["sections"][0]["granularityLevel"], json!("Model"));
        assert_eq!(plain["environment"]["submodels"], json!([]));
    }
}
