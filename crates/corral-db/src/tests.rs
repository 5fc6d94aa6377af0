//! Unit tests for corral-db

use super::*;
use corral_core::{
    create_pagination, create_pagination_without_total, CorralError, GroupRepository, Identity,
    IdentityRepository, Kind, LimitOffsetPagination, ResourceParent, ResourceRecord,
    ResourceRepository,
};

#[cfg(test)]
mod identity_tests {
    use super::*;

    #[tokio::test]
    async fn test_identities_listed_by_name_with_offsets() {
        let repo = MemoryIdentityRepository::new();
        for name in ["carol", "alice", "bob"] {
            repo.insert(Identity::new(name)).await;
        }

        assert_eq!(repo.count_identities().await.unwrap(), 3);
        let page = repo
            .list_identities(&LimitOffsetPagination::new(2, 1))
            .await
            .unwrap();
        let names: Vec<&str> = page.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["bob", "carol"]);
    }

    #[tokio::test]
    async fn test_get_or_create_records_login() {
        let repo = MemoryIdentityRepository::new();
        assert!(repo.fetch_identity("alice").await.unwrap().is_none());

        let created = repo.get_or_create_identity("alice").await.unwrap();
        assert!(created.last_login.is_some());
        assert_eq!(repo.count_identities().await.unwrap(), 1);

        let again = repo.get_or_create_identity("alice").await.unwrap();
        assert_eq!(again.created_at, created.created_at);
        assert_eq!(repo.count_identities().await.unwrap(), 1);
    }
}

#[cfg(test)]
mod group_tests {
    use super::*;

    #[tokio::test]
    async fn test_group_lifecycle() {
        let repo = MemoryGroupRepository::new();
        let group = repo.add_group("devops").await.unwrap();

        let err = repo.add_group("devops").await.unwrap_err();
        assert!(matches!(err, CorralError::AlreadyExists { .. }));

        let renamed = repo.rename_group(group.id, "sre").await.unwrap();
        assert_eq!(renamed.name, "sre");
        assert_eq!(repo.get_group_by_name("sre").await.unwrap().unwrap().id, group.id);

        repo.remove_group(group.id).await.unwrap();
        assert!(repo.get_group(group.id).await.unwrap().is_none());
        let err = repo.remove_group(group.id).await.unwrap_err();
        assert!(matches!(err, CorralError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_group_pages_follow_pagination_math() {
        let repo = MemoryGroupRepository::new();
        for n in 0..5 {
            repo.add_group(&format!("group-{}", n)).await.unwrap();
        }
        let total = repo.count_groups(None).await.unwrap();
        let (info, filter) = create_pagination(Some(2), Some(2), total);
        let groups = repo.list_groups(&filter, None).await.unwrap();

        assert_eq!(info.next_page, None);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "group-4");
        assert_eq!(repo.count_groups(Some("GROUP-1")).await.unwrap(), 1);
    }
}

#[cfg(test)]
mod resource_tests {
    use super::*;

    fn record(kind: Kind, id: &str, name: &str) -> ResourceRecord {
        ResourceRecord {
            kind,
            id: id.to_string(),
            name: name.to_string(),
            parent: None,
        }
    }

    #[tokio::test]
    async fn test_resources_filter_by_kind_and_prefix() {
        let repo = MemoryResourceRepository::new();
        repo.insert(record(Kind::Cloud, "aws", "aws")).await;
        repo.insert(record(Kind::Model, "m1", "Prod-db")).await;
        repo.insert(ResourceRecord {
            parent: Some(ResourceParent {
                kind: Kind::Controller,
                id: "c1".to_string(),
                name: "jimm".to_string(),
            }),
            ..record(Kind::Model, "m2", "prod-web")
        })
        .await;
        repo.insert(record(Kind::Model, "m3", "staging")).await;

        let all = LimitOffsetPagination::default();
        let prod = repo.list_resources(&all, Some("prod"), None).await.unwrap();
        assert_eq!(prod.len(), 2);

        let clouds = repo.list_resources(&all, None, Some(Kind::Cloud)).await.unwrap();
        assert_eq!(clouds.len(), 1);
    }

    #[tokio::test]
    async fn test_probe_row_detects_next_page() {
        let repo = MemoryResourceRepository::new();
        for n in 0..3 {
            repo.insert(record(Kind::Model, &format!("m{}", n), &format!("model-{}", n)))
                .await;
        }

        let probe = create_pagination_without_total(Some(2), Some(0));
        let rows = repo.list_resources(&probe.filter, None, None).await.unwrap();
        let (rows, next) = probe.finish(rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(next, Some(1));

        let probe = create_pagination_without_total(Some(2), Some(1));
        let rows = repo.list_resources(&probe.filter, None, None).await.unwrap();
        let (rows, next) = probe.finish(rows);
        assert_eq!(rows.len(), 1);
        assert_eq!(next, None);
    }
}
