//! Section Mutation Tests
//!
//! Integration tests for rename, create, delete and move against a real
//! libsql database file.
//!
//! ## Test Coverage
//! - Every touched sibling group is numbered `1..=N` after each mutation
//! - Move within a sibling group, self-move and cross-parent rejection
//! - Cascade delete removes exactly the subtree
//! - Lift-children delete splices children into the deleted slot
//! - Rename trimming, no-op and empty-name rejection
//! - Create with anchors, parent mismatch and missing parent
//! - Create refuses to nest past the depth limit

#[cfg(test)]
mod section_mutation_tests {
    use anyhow::Result;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;
    use toc_core::db::{DatabaseService, SiblingOrderCalculator};
    use toc_core::{
        AnchorPosition, CreateSectionParams, DeleteStrategy, Section, SectionService,
        SectionServiceError, MAX_SECTION_DEPTH,
    };

    /// Helper to create a service over a fresh database file
    async fn create_test_service() -> Result<(SectionService, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let db = DatabaseService::new(db_path).await?;
        Ok((SectionService::new(Arc::new(db)), temp_dir))
    }

    async fn create(service: &SectionService, name: &str, parent: Option<&str>) -> Result<String> {
        Ok(service
            .create_section(CreateSectionParams::append(name, parent))
            .await?)
    }

    /// Names of the children of `parent` in order
    async fn child_names(service: &SectionService, parent: Option<&str>) -> Result<Vec<String>> {
        let mut children: Vec<Section> = service
            .list_sections()
            .await?
            .into_iter()
            .filter(|s| s.parent_id.as_deref() == parent)
            .collect();
        children.sort_by_key(|s| s.order);
        Ok(children.into_iter().map(|s| s.name).collect())
    }

    /// Assert every sibling group is numbered 1..=N
    async fn assert_contiguous(service: &SectionService) -> Result<()> {
        let mut groups: HashMap<Option<String>, Vec<i64>> = HashMap::new();
        for section in service.list_sections().await? {
            groups.entry(section.parent_id).or_default().push(section.order);
        }
        for (parent, mut orders) in groups {
            orders.sort();
            assert!(
                SiblingOrderCalculator::is_contiguous(&orders),
                "group {:?} has orders {:?}",
                parent,
                orders
            );
        }
        Ok(())
    }

    /// P with children A, B, C; returns (p, a, b, c)
    async fn seed_abc(service: &SectionService) -> Result<(String, String, String, String)> {
        let p = create(service, "P", None).await?;
        let a = create(service, "A", Some(&p)).await?;
        let b = create(service, "B", Some(&p)).await?;
        let c = create(service, "C", Some(&p)).await?;
        Ok((p, a, b, c))
    }

    #[tokio::test]
    async fn test_create_appends_in_order() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (p, _, _, _) = seed_abc(&service).await?;

        assert_eq!(child_names(&service, Some(&p)).await?, vec!["A", "B", "C"]);
        assert_eq!(child_names(&service, None).await?, vec!["P"]);

        let parent = service.get_section(&p).await?;
        assert!(!parent.is_leaf);
        assert!(parent.section_key.starts_with("new-"));
        assert_contiguous(&service).await
    }

    #[tokio::test]
    async fn test_create_with_anchor_before_and_after() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (p, a, b, _) = seed_abc(&service).await?;

        service
            .create_section(CreateSectionParams::anchored("X", &a, AnchorPosition::After))
            .await?;
        service
            .create_section(CreateSectionParams::anchored("Y", &a, AnchorPosition::Before))
            .await?;
        service
            .create_section(CreateSectionParams {
                name: "Z".to_string(),
                parent_id: Some(p.clone()),
                anchor_id: Some(b.clone()),
                anchor_position: None,
            })
            .await?;

        assert_eq!(
            child_names(&service, Some(&p)).await?,
            vec!["Y", "A", "X", "B", "Z", "C"]
        );
        assert_contiguous(&service).await
    }

    #[tokio::test]
    async fn test_create_validation_and_conflicts() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (p, a, _, _) = seed_abc(&service).await?;
        let other = create(&service, "Other", None).await?;

        let empty = service
            .create_section(CreateSectionParams::append("   ", None))
            .await;
        assert!(matches!(empty, Err(SectionServiceError::Validation(_))));

        let missing_parent = service
            .create_section(CreateSectionParams::append("X", Some("ghost")))
            .await;
        assert!(matches!(missing_parent, Err(SectionServiceError::NotFound { .. })));

        let missing_anchor = service
            .create_section(CreateSectionParams::anchored("X", "ghost", AnchorPosition::After))
            .await;
        assert!(matches!(missing_anchor, Err(SectionServiceError::NotFound { .. })));

        let mismatch = service
            .create_section(CreateSectionParams {
                name: "X".to_string(),
                parent_id: Some(other.clone()),
                anchor_id: Some(a.clone()),
                anchor_position: Some(AnchorPosition::After),
            })
            .await;
        assert!(matches!(mismatch, Err(SectionServiceError::Conflict(_))));

        let position_without_anchor = service
            .create_section(CreateSectionParams {
                name: "X".to_string(),
                anchor_position: Some(AnchorPosition::Before),
                ..Default::default()
            })
            .await;
        assert!(matches!(
            position_without_anchor,
            Err(SectionServiceError::Validation(_))
        ));

        assert_eq!(child_names(&service, Some(&p)).await?, vec!["A", "B", "C"]);
        assert_eq!(service.list_sections().await?.len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_stops_at_depth_limit() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let mut deepest = create(&service, "Level 1", None).await?;
        for level in 2..=MAX_SECTION_DEPTH {
            deepest = create(&service, &format!("Level {}", level), Some(&deepest)).await?;
        }

        let too_deep = create(&service, "Too deep", Some(&deepest)).await;
        let err = too_deep.unwrap_err().downcast::<SectionServiceError>()?;
        assert!(matches!(err, SectionServiceError::Validation(_)), "{}", err);
        assert!(child_names(&service, Some(&deepest)).await?.is_empty());

        // A sibling of the deepest section stays within the limit.
        service
            .create_section(CreateSectionParams::anchored(
                "Beside",
                deepest.clone(),
                AnchorPosition::After,
            ))
            .await?;

        let tree = service.get_tree().await?;
        let mut node = &tree[0];
        let mut depth = 1;
        while let Some(child) = node.children.first() {
            node = child;
            depth += 1;
        }
        assert_eq!(depth, MAX_SECTION_DEPTH);
        assert_eq!(tree[0].size(), MAX_SECTION_DEPTH + 1);
        assert_contiguous(&service).await
    }

    #[tokio::test]
    async fn test_rename() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (_, a, _, _) = seed_abc(&service).await?;
        let before = service.get_section(&a).await?;

        let renamed = service.rename_section(&a, "  Alpha  ").await?;
        assert_eq!(renamed.name, "Alpha");
        assert_eq!(renamed.order, before.order);
        assert_eq!(renamed.parent_id, before.parent_id);

        let unchanged = service.rename_section(&a, "Alpha").await?;
        assert_eq!(unchanged.name, "Alpha");

        let empty = service.rename_section(&a, " \t ").await;
        assert!(matches!(empty, Err(SectionServiceError::Validation(_))));
        assert_eq!(service.get_section(&a).await?.name, "Alpha");

        let missing = service.rename_section("ghost", "Name").await;
        assert!(matches!(missing, Err(SectionServiceError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_move_after_last_sibling() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (p, a, b, c) = seed_abc(&service).await?;

        service.move_section(&a, &c, AnchorPosition::After).await?;

        assert_eq!(child_names(&service, Some(&p)).await?, vec!["B", "C", "A"]);
        assert_eq!(service.get_section(&b).await?.order, 1);
        assert_eq!(service.get_section(&c).await?.order, 2);
        assert_eq!(service.get_section(&a).await?.order, 3);

        service.move_section(&a, &b, AnchorPosition::Before).await?;
        assert_eq!(child_names(&service, Some(&p)).await?, vec!["A", "B", "C"]);
        assert_contiguous(&service).await
    }

    #[tokio::test]
    async fn test_move_rejections_leave_state_unchanged() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (p, a, _, _) = seed_abc(&service).await?;
        let q = create(&service, "Q", None).await?;
        let x = create(&service, "X", Some(&q)).await?;
        let snapshot = service.list_sections().await?;

        let self_move = service.move_section(&a, &a, AnchorPosition::After).await;
        assert!(matches!(self_move, Err(SectionServiceError::Conflict(_))));

        let cross_parent = service.move_section(&a, &x, AnchorPosition::Before).await;
        assert!(matches!(cross_parent, Err(SectionServiceError::Conflict(_))));

        let root_vs_child = service.move_section(&p, &a, AnchorPosition::After).await;
        assert!(matches!(root_vs_child, Err(SectionServiceError::Conflict(_))));

        let missing = service.move_section(&a, "ghost", AnchorPosition::After).await;
        assert!(missing.as_ref().is_err_and(SectionServiceError::is_not_found));

        assert_eq!(service.list_sections().await?, snapshot);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_cascade_removes_exact_subtree() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (p, a, b, c) = seed_abc(&service).await?;
        let x = create(&service, "X", Some(&b)).await?;
        let y = create(&service, "Y", Some(&x)).await?;
        let other = create(&service, "Other", None).await?;

        let outcome = service.delete_section(&b, DeleteStrategy::Cascade).await?;

        let mut deleted = outcome.deleted_ids.clone();
        deleted.sort();
        let mut expected = vec![b.clone(), x, y];
        expected.sort();
        assert_eq!(deleted, expected);
        assert!(outcome.lifted_ids.is_empty());

        let remaining: Vec<String> = service
            .list_sections()
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(remaining.len(), 4);
        for id in [&p, &a, &c, &other] {
            assert!(remaining.contains(id));
        }

        assert_eq!(child_names(&service, Some(&p)).await?, vec!["A", "C"]);
        assert_contiguous(&service).await
    }

    #[tokio::test]
    async fn test_delete_lift_children_splices_in_place() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (p, _, b, _) = seed_abc(&service).await?;
        let x = create(&service, "X", Some(&b)).await?;
        let y = create(&service, "Y", Some(&b)).await?;
        let z = create(&service, "Z", Some(&x)).await?;
        let total_before = service.list_sections().await?.len();

        let outcome = service
            .delete_section(&b, DeleteStrategy::LiftChildren)
            .await?;

        assert_eq!(outcome.deleted_ids, vec![b.clone()]);
        assert_eq!(outcome.lifted_ids, vec![x.clone(), y]);
        assert_eq!(
            child_names(&service, Some(&p)).await?,
            vec!["A", "X", "Y", "C"]
        );
        assert_eq!(service.get_section(&z).await?.parent_id, Some(x));
        assert_eq!(service.list_sections().await?.len(), total_before - 1);
        assert_contiguous(&service).await
    }

    #[tokio::test]
    async fn test_delete_default_strategy_and_missing_id() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (_, a, _, _) = seed_abc(&service).await?;
        let leaf_child = create(&service, "Leaf", Some(&a)).await?;

        service.delete_section(&a, DeleteStrategy::default()).await?;
        assert!(service.get_section(&leaf_child).await.is_ok());

        let missing = service.delete_section("ghost", DeleteStrategy::Cascade).await;
        assert!(matches!(missing, Err(SectionServiceError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_tree_reads() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let (p, a, _, _) = seed_abc(&service).await?;
        let x = create(&service, "X", Some(&a)).await?;

        let tree = service.get_tree().await?;
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, p);
        assert_eq!(tree[0].children.len(), 3);
        assert_eq!(tree[0].children[0].children[0].id, x);
        assert!(tree[0].children[0].children[0].is_leaf);

        let subtree = service.get_subtree(&a).await?;
        assert_eq!(subtree.id, a);
        assert_eq!(subtree.size(), 2);

        assert!(service.get_subtree("ghost").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_appends_stay_contiguous() -> Result<()> {
        let (service, _temp_dir) = create_test_service().await?;
        let p = create(&service, "P", None).await?;

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            let p = p.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create_section(CreateSectionParams::append(format!("Child {}", i), Some(&p)))
                    .await
            }));
        }
        for handle in handles {
            handle.await??;
        }

        assert_eq!(child_names(&service, Some(&p)).await?.len(), 8);
        assert_contiguous(&service).await
    }
}
