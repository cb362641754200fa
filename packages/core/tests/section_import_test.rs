//! Section Import Tests
//!
//! Integration tests for bulk import of flat JSON templates.
//!
//! ## Import Modes
//! - `replace` (default): the existing tree is deleted before inserting
//! - `append`: the existing tree is kept and imported roots follow it
//!
//! ## Test Coverage
//! - Counts reported for a parent/child template
//! - Replace and append modes
//! - Validation failures leave the existing tree untouched
//! - Parent chains past the depth limit are refused
//! - File sources: missing file, invalid UTF-8, invalid JSON

#[cfg(test)]
mod section_import_tests {
    use anyhow::Result;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;
    use toc_core::db::DatabaseService;
    use toc_core::{
        CreateSectionParams, ImportMode, ImportOptions, SectionService, SectionServiceError,
        TreeAssembler,
    };

    async fn create_test_service() -> Result<(SectionService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let db = DatabaseService::new(db_path).await?;
        Ok((SectionService::new(Arc::new(db)), temp_dir))
    }

    fn append_mode() -> ImportOptions {
        ImportOptions {
            mode: ImportMode::Append,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_import_parent_and_child() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let template = json!([
            {"section_key": "intro", "name": "Intro"},
            {"section_key": "ch1", "name": "Chapter 1", "parent_key": "intro"}
        ]);

        let report = service
            .import_value(&template, "inline", ImportOptions::default())
            .await?;

        assert_eq!(report.inserted, 2);
        assert_eq!(report.roots, 1);
        assert_eq!(report.leaves, 1);
        assert_eq!(report.source, "inline");

        let tree = service.get_tree().await?;
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].section_key, "intro");
        assert_eq!(tree[0].children[0].name, "Chapter 1");
        assert!(tree[0].children[0].is_leaf);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_orders_are_contiguous() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let template = json!([
            {"section_id": "b", "section_title": "B", "order": 20},
            {"section_id": "a", "section_title": "A", "order": 5},
            {"section_id": "a.1", "section_title": "A1", "parent_key": "a", "order": 9},
            {"section_id": "a.2", "section_title": "A2", "parent_key": "a", "order": 3}
        ]);

        service
            .import_value(&template, "inline", ImportOptions::default())
            .await?;

        let tree = service.get_tree().await?;
        let roots: Vec<(&str, i64)> = tree.iter().map(|t| (t.name.as_str(), t.order)).collect();
        assert_eq!(roots, vec![("A", 1), ("B", 2)]);
        let children: Vec<(&str, i64)> = tree[0]
            .children
            .iter()
            .map(|t| (t.name.as_str(), t.order))
            .collect();
        assert_eq!(children, vec![("A2", 1), ("A1", 2)]);
        Ok(())
    }

    #[tokio::test]
    async fn test_replace_mode_discards_existing_tree() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let old = service
            .create_section(CreateSectionParams::append("Old", None))
            .await?;
        service
            .create_section(CreateSectionParams::append("Old child", Some(&old)))
            .await?;

        let report = service
            .import_value(&json!([{"name": "Fresh"}]), "inline", ImportOptions::default())
            .await?;

        assert_eq!(report.inserted, 1);
        let sections = service.list_sections().await?;
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Fresh");
        assert_eq!(sections[0].section_key, "u.fresh");
        assert_eq!(sections[0].order, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_append_mode_keeps_existing_tree() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        service
            .create_section(CreateSectionParams::append("Existing", None))
            .await?;

        service
            .import_value(
                &json!([
                    {"section_key": "x", "name": "X"},
                    {"section_key": "y", "name": "Y", "parent_key": "x"}
                ]),
                "inline",
                append_mode(),
            )
            .await?;

        let tree = service.get_tree().await?;
        let roots: Vec<(&str, i64)> = tree.iter().map(|t| (t.name.as_str(), t.order)).collect();
        assert_eq!(roots, vec![("Existing", 1), ("X", 2)]);
        assert_eq!(tree[1].children[0].order, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_import_leaves_tree_untouched() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        service
            .import_value(
                &json!([{"section_key": "keep", "name": "Keep"}]),
                "inline",
                ImportOptions::default(),
            )
            .await?;
        let snapshot = service.list_sections().await?;

        let duplicate = service
            .import_value(
                &json!([
                    {"section_key": "a", "name": "A"},
                    {"section_key": "a", "name": "Again"}
                ]),
                "inline",
                ImportOptions::default(),
            )
            .await;
        assert!(matches!(
            duplicate,
            Err(SectionServiceError::Validation(ref m)) if m == "Duplicate section_key: a"
        ));

        let cycle = service
            .import_value(
                &json!([
                    {"section_key": "a", "name": "A", "parent_key": "b"},
                    {"section_key": "b", "name": "B", "parent_key": "a"}
                ]),
                "inline",
                ImportOptions::default(),
            )
            .await;
        assert!(matches!(cycle, Err(SectionServiceError::Validation(_))));

        let nameless = service
            .import_value(&json!([{"section_key": "a"}]), "inline", ImportOptions::default())
            .await;
        assert!(matches!(nameless, Err(SectionServiceError::Validation(_))));

        assert_eq!(service.list_sections().await?, snapshot);
        Ok(())
    }

    #[tokio::test]
    async fn test_over_deep_chain_rejected() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        service
            .import_value(
                &json!([{"section_key": "keep", "name": "Keep"}]),
                "inline",
                ImportOptions::default(),
            )
            .await?;

        let chain: Vec<serde_json::Value> = (0..20_000)
            .map(|level: usize| match level {
                0 => json!({"section_key": "n0", "name": "N0"}),
                _ => json!({
                    "section_key": format!("n{}", level),
                    "name": format!("N{}", level),
                    "parent_key": format!("n{}", level - 1)
                }),
            })
            .collect();
        let deep = service
            .import_value(&json!(chain), "deep.json", ImportOptions::default())
            .await;
        let err = deep.unwrap_err();
        assert!(matches!(err, SectionServiceError::Validation(_)));
        assert!(err.to_string().contains("levels deep"), "{}", err);

        let tree = service.get_tree().await?;
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "Keep");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_parent_key_imports_as_root() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let report = service
            .import_value(
                &json!([
                    {"section_key": "a", "name": "A"},
                    {"section_key": "b", "name": "B", "parent_key": "missing"}
                ]),
                "inline",
                ImportOptions::default(),
            )
            .await?;

        assert_eq!(report.roots, 2);
        assert_eq!(service.get_tree().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_dotted_parent_inference() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let options = ImportOptions {
            infer_dotted_parents: true,
            ..Default::default()
        };

        let report = service
            .import_value(
                &json!([
                    {"section_key": 1, "name": "One"},
                    {"section_key": "1.1", "name": "One.One"},
                    {"section_key": "1.1.1", "name": "Deep"}
                ]),
                "inline",
                options,
            )
            .await?;

        assert_eq!(report.roots, 1);
        assert_eq!(report.leaves, 1);
        let tree = service.get_tree().await?;
        assert_eq!(tree[0].children[0].children[0].name, "Deep");
        Ok(())
    }

    #[tokio::test]
    async fn test_import_from_path_sources() -> Result<()> {
        let (service, temp_dir) = create_test_service().await?;

        let missing = service
            .import_from_path(&temp_dir.path().join("missing.json"), ImportOptions::default())
            .await;
        assert!(matches!(missing, Err(SectionServiceError::SourceNotFound { .. })));

        let bad_utf8 = temp_dir.path().join("bad_utf8.json");
        std::fs::write(&bad_utf8, [0xff, 0xfe, 0x00])?;
        let err = service
            .import_from_path(&bad_utf8, ImportOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Uploaded file must be UTF-8 encoded JSON");

        let bad_json = temp_dir.path().join("bad.json");
        std::fs::write(&bad_json, "[{\"name\": ")?;
        let err = service
            .import_from_path(&bad_json, ImportOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON in template file"));

        let good = temp_dir.path().join("template.json");
        std::fs::write(
            &good,
            r#"[{"section_key": "intro", "name": "Intro"}, {"name": "Next"}]"#,
        )?;
        let report = service
            .import_from_path(&good, ImportOptions::default())
            .await?;
        assert_eq!(report.inserted, 2);
        assert_eq!(report.source, good.display().to_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_flatten_reproduces_persisted_rows() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        service
            .import_value(
                &json!([
                    {"section_key": "r", "name": "Root"},
                    {"section_key": "c1", "name": "C1", "parent_key": "r"},
                    {"section_key": "c2", "name": "C2", "parent_key": "r"},
                    {"section_key": "g", "name": "G", "parent_key": "c2"},
                    {"section_key": "r2", "name": "Root 2"}
                ]),
                "inline",
                ImportOptions::default(),
            )
            .await?;

        let mut flat = service.list_sections().await?;
        let mut round_trip = TreeAssembler::flatten(&service.get_tree().await?);
        flat.sort_by(|a, b| a.id.cmp(&b.id));
        round_trip.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(round_trip, flat);
        Ok(())
    }
}
