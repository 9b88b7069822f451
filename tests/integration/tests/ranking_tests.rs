//! Rank reconciliation end to end
//!
//! Events go through the aggregator; role changes are observed on the
//! scripted platform.

use chrono::{Duration, Utc};
use integration_tests::*;
use overlord_common::{BotConfig, ConfigError};
use overlord_core::entities::{Rank, StatKind};
use overlord_core::NoticeLevel;
use overlord_service::{
    Outcome, RankOutcome, RankingService, ServiceError, SkipReason, SyncState,
};

/// The standard guild roles plus one that has no rank yet
const ROLES_WITH_GOLD: [&str; 6] = ["@everyone", "Bronze", "Silver", "Gold", "Admin", "Muted"];

fn rank(name: &str, weight: i64, messages: i64) -> Rank {
    Rank {
        name: name.to_string(),
        weight,
        membership: 0,
        messages,
        vc: 0,
    }
}

fn temp_config_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("overlord-ranks-{}.toml", unique_id()))
}

const BRONZE_ONLY: &str = r#"
    [rank.role.Bronze]
    weight = 1
    membership = 0
    messages = 3
    vc = 0
"#;

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn test_join_then_messages_assigns_bronze() {
    let bot = TestBot::with_ranks(BRONZE_ONLY).await.unwrap();
    let user = bot.join_new(&[]).await.unwrap();
    assert_eq!(bot.stat(user, StatKind::Membership), 0);

    bot.chat(user, 5).await.unwrap();

    assert_eq!(bot.stat(user, StatKind::NewMessageCount), 5);
    assert_eq!(bot.held_roles(user), vec!["Bronze".to_string()]);
    // Only the first reconciliation had anything to do
    assert_eq!(
        bot.platform.calls(),
        vec![RoleCall::Add(user, vec![bot.role("Bronze")])]
    );
}

#[tokio::test]
async fn test_promotion_removes_old_rank_before_adding_new() {
    let bot = TestBot::with_ranks(BASIC_RANKS).await.unwrap();
    let user = bot.join_new(&["Bronze"]).await.unwrap();
    bot.store.set_stat(user, StatKind::NewMessageCount, 9);

    let outcome = bot.handle(message(user, TEXT_CHANNEL)).await.unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(bot.stat(user, StatKind::NewMessageCount), 10);
    assert_eq!(
        bot.platform.calls(),
        vec![
            RoleCall::Remove(user, vec![bot.role("Bronze")]),
            RoleCall::Add(user, vec![bot.role("Silver")]),
        ]
    );
    assert_eq!(bot.held_roles(user), vec!["Silver".to_string()]);

    let stored = bot.store.user(user).unwrap();
    let mask = stored.roles.unwrap();
    assert_eq!(mask, bot.ctx.snapshot().mask_for(&[bot.role("Silver")]));
}

#[tokio::test]
async fn test_thresholds_use_messages_or_voice_time() {
    let bot = TestBot::with_ranks(ACTIVITY_RANKS).await.unwrap();
    let user = bot.join_new(&[]).await.unwrap();

    bot.chat(user, 2).await.unwrap();
    assert!(bot.platform.calls().is_empty());

    bot.chat(user, 1).await.unwrap();
    assert_eq!(bot.held_roles(user), vec!["Bronze".to_string()]);

    // An hour in voice qualifies for Silver even with few messages
    let start = Utc::now() - Duration::seconds(3_600);
    bot.handle(voice(user, None, Some(VOICE_CHANNEL), start))
        .await
        .unwrap();
    bot.handle(voice(user, Some(VOICE_CHANNEL), None, start + Duration::seconds(3_600)))
        .await
        .unwrap();

    assert_eq!(bot.stat(user, StatKind::VcTime), 3_600);
    assert_eq!(bot.held_roles(user), vec!["Silver".to_string()]);
}

#[tokio::test]
async fn test_deleted_messages_count_against_rank() {
    let bot = TestBot::with_ranks(ACTIVITY_RANKS).await.unwrap();
    let user = bot.join_new(&[]).await.unwrap();

    let first = unique_id();
    bot.handle(message_with_id(first, user, TEXT_CHANNEL))
        .await
        .unwrap();
    bot.chat(user, 2).await.unwrap();
    assert_eq!(bot.held_roles(user), vec!["Bronze".to_string()]);

    bot.handle(deleted(first, TEXT_CHANNEL)).await.unwrap();

    assert_eq!(bot.stat(user, StatKind::DeleteMessageCount), 1);
    assert!(bot.held_roles(user).is_empty());
}

#[tokio::test]
async fn test_reconciliation_is_idempotent() {
    let platform = MockPlatform::with_roles(&GUILD_ROLES);
    let member = unique_member(Vec::new());
    let user = member.id;
    platform.add_member(member);
    let bot = TestBot::ready(ACTIVITY_RANKS, platform).await.unwrap();
    bot.store.set_stat(user, StatKind::NewMessageCount, 12);

    let ranking = RankingService::new(&bot.ctx);
    let first = ranking.update_all_ranks().await.unwrap();
    assert_eq!(first.checked, 1);
    assert_eq!(first.updated, 1);
    assert_eq!(bot.platform.calls().len(), 1);

    bot.platform.clear_calls();
    let second = ranking.update_all_ranks().await.unwrap();
    assert_eq!(second.updated, 0);
    assert!(bot.platform.calls().is_empty());
    assert_eq!(
        ranking.update_rank(user).await.unwrap(),
        RankOutcome::Unchanged
    );
}

#[tokio::test]
async fn test_ignored_role_excludes_member() {
    let bot = TestBot::with_ranks(ACTIVITY_RANKS).await.unwrap();
    let user = bot.join_new(&["Muted", "Bronze"]).await.unwrap();
    bot.store.set_stat(user, StatKind::NewMessageCount, 50);

    let outcome = RankingService::new(&bot.ctx).update_rank(user).await.unwrap();

    assert_eq!(outcome, RankOutcome::Excluded);
    assert!(bot.platform.calls().is_empty());
    assert_eq!(bot.held_roles(user), vec!["Muted".to_string(), "Bronze".to_string()]);
}

#[tokio::test]
async fn test_required_roles_gate_ranking() {
    let config = ACTIVITY_RANKS.replace(
        "ignored = [\"Muted\"]",
        "ignored = [\"Muted\"]\n    required = [\"Admin\"]",
    );
    let bot = TestBot::with_ranks(&config).await.unwrap();
    let outsider = bot.join_new(&[]).await.unwrap();
    let insider = bot.join_new(&["Admin"]).await.unwrap();

    bot.chat(outsider, 3).await.unwrap();
    bot.chat(insider, 3).await.unwrap();

    assert!(bot.held_roles(outsider).is_empty());
    assert!(bot.held_roles(insider).contains(&"Bronze".to_string()));
}

#[tokio::test]
async fn test_weight_override_stats() {
    let bot = TestBot::with_ranks(ACTIVITY_RANKS).await.unwrap();
    let user = bot.join_new(&[]).await.unwrap();
    bot.store.set_stat(user, StatKind::ExactWeight, 2);

    let outcome = RankingService::new(&bot.ctx).update_rank(user).await.unwrap();

    assert_eq!(
        outcome,
        RankOutcome::Updated {
            removed: Vec::new(),
            added: Some("Silver".to_string()),
        }
    );

    // Dropping the override demotes on the next pass
    bot.store.set_stat(user, StatKind::ExactWeight, 0);
    let outcome = RankingService::new(&bot.ctx).update_rank(user).await.unwrap();
    assert_eq!(
        outcome,
        RankOutcome::Updated {
            removed: vec!["Silver".to_string()],
            added: None,
        }
    );
}

#[tokio::test]
async fn test_member_gone_from_guild() {
    let bot = TestBot::with_ranks(ACTIVITY_RANKS).await.unwrap();
    let user = bot.join_new(&[]).await.unwrap();
    bot.platform.remove_member(user);

    let outcome = RankingService::new(&bot.ctx).update_rank(user).await.unwrap();
    assert_eq!(outcome, RankOutcome::NotInGuild);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_duplicate_weights_rejected_at_load() {
    let config = r#"
        [rank.role.Bronze]
        weight = 5
        [rank.role.Silver]
        weight = 5
    "#;

    match BotConfig::from_toml_str(config).unwrap_err() {
        ConfigError::Invalid { path, reason } => {
            assert_eq!(path, "rank.role.Silver.weight");
            assert!(reason.contains('5'));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(TestBot::new(config, MockPlatform::new()).is_err());
}

#[test]
fn test_duplicate_weights_rejected_by_context() {
    let mut config = BotConfig::default();
    for name in ["Bronze", "Silver"] {
        config.rank.role.insert(
            name.to_string(),
            overlord_common::config::RankRoleConfig {
                weight: 5,
                ..Default::default()
            },
        );
    }

    let store = std::sync::Arc::new(MemoryStore::new());
    let err = overlord_service::ServiceContextBuilder::new()
        .user_repo(store.clone())
        .role_repo(store.clone())
        .event_repo(store.clone())
        .stat_repo(store)
        .platform(std::sync::Arc::new(MockPlatform::new()))
        .config(config)
        .guild(guild())
        .build()
        .unwrap_err();
    assert!(matches!(err, ServiceError::Config(_)));
}

#[tokio::test]
async fn test_validate_config_names_missing_role() {
    let config = r#"
        [rank.role.Platinum]
        weight = 4
    "#;
    let bot = TestBot::with_ranks(config).await.unwrap();

    let err = RankingService::new(&bot.ctx).validate_config().unwrap_err();
    assert!(!err.is_recoverable());
    assert!(err.to_string().contains("rank.role.Platinum"));
}

#[tokio::test]
async fn test_validate_config_checks_control_roles() {
    let config = "[control]\nroles = [\"Admin\", \"Ghost\"]\n";
    let bot = TestBot::with_ranks(config).await.unwrap();

    let err = RankingService::new(&bot.ctx).validate_config().unwrap_err();
    assert!(err.to_string().contains("control.roles[1]"));

    let bot = TestBot::with_ranks(BASIC_RANKS).await.unwrap();
    assert!(RankingService::new(&bot.ctx).validate_config().is_ok());
}

// ============================================================================
// Sync prerequisites
// ============================================================================

#[tokio::test]
async fn test_rank_update_while_unsynced_is_noop() {
    let platform = MockPlatform::with_roles(&GUILD_ROLES);
    let member = unique_member(Vec::new());
    let user = member.id;
    platform.add_member(member);
    let bot = TestBot::new(BASIC_RANKS, platform).unwrap();
    bot.store.set_stat(user, StatKind::NewMessageCount, 40);

    let ranking = RankingService::new(&bot.ctx);
    for _ in 0..2 {
        let err = ranking.update_rank(user).await.unwrap_err();
        assert!(err.is_prerequisite());
    }

    assert_eq!(bot.ctx.sync_state().state(), SyncState::Unsynced);
    assert!(bot.platform.calls().is_empty());
    assert_eq!(bot.stat(user, StatKind::NewMessageCount), 40);

    let notices = bot.platform.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
}

#[tokio::test]
async fn test_role_sync_alone_blocks_tracking() {
    let bot = TestBot::with_ranks(BASIC_RANKS).await.unwrap();
    let user = bot.join_new(&[]).await.unwrap();

    overlord_service::SyncService::new(&bot.ctx)
        .sync_roles()
        .await
        .unwrap();
    assert_eq!(bot.ctx.sync_state().state(), SyncState::RolesSynced);

    let err = bot.handle(message(user, TEXT_CHANNEL)).await.unwrap_err();
    assert!(err.is_prerequisite());
    assert_eq!(bot.stat(user, StatKind::NewMessageCount), 0);

    // Leaves are still tracked
    let outcome = bot.handle(left(user)).await.unwrap();
    assert_eq!(outcome, Outcome::Applied);
    assert!(bot.store.user(user).unwrap().is_absent());

    let outcome = bot.handle(left(unique_id())).await.unwrap();
    assert_eq!(outcome, Outcome::Skipped(SkipReason::UnknownUser));
}

// ============================================================================
// Rank editing
// ============================================================================

#[tokio::test]
async fn test_add_rank_is_live_and_saved() {
    let path = temp_config_path();
    let platform = MockPlatform::with_roles(&ROLES_WITH_GOLD);
    let bot = TestBot::persisted(BASIC_RANKS, platform, &path).await.unwrap();
    let user = bot.join_new(&[]).await.unwrap();
    bot.store.set_stat(user, StatKind::NewMessageCount, 25);

    let ranking = RankingService::new(&bot.ctx);
    ranking.add_rank(rank("Gold", 3, 20)).await.unwrap();

    assert_eq!(
        bot.ranks(),
        vec![
            ("Bronze".to_string(), 1),
            ("Silver".to_string(), 2),
            ("Gold".to_string(), 3)
        ]
    );
    let saved = BotConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(saved.rank.role["Gold"].messages, 20);
    assert_eq!(saved.control.roles, vec!["Admin".to_string()]);

    ranking.update_rank(user).await.unwrap();
    assert_eq!(bot.held_roles(user), vec!["Gold".to_string()]);
}

#[tokio::test]
async fn test_edit_rank_with_taken_weight_is_reverted() {
    let bot = TestBot::with_ranks(BASIC_RANKS).await.unwrap();
    let before = bot.ranks();

    let err = RankingService::new(&bot.ctx)
        .edit_rank(rank("Bronze", 2, 3))
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Config(_)));
    assert!(err.to_string().contains("weight 2 already used"));
    assert_eq!(bot.ranks(), before);
}

#[tokio::test]
async fn test_edit_rank_changes_thresholds() {
    let bot = TestBot::with_ranks(BASIC_RANKS).await.unwrap();
    let user = bot.join_new(&[]).await.unwrap();
    bot.chat(user, 3).await.unwrap();
    assert_eq!(bot.held_roles(user), vec!["Bronze".to_string()]);

    let ranking = RankingService::new(&bot.ctx);
    ranking.edit_rank(rank("Silver", 2, 3)).await.unwrap();
    ranking.update_rank(user).await.unwrap();

    assert_eq!(bot.held_roles(user), vec!["Silver".to_string()]);
}

#[tokio::test]
async fn test_rank_edits_need_existing_roles_and_ranks() {
    let bot = TestBot::with_ranks(BASIC_RANKS).await.unwrap();
    let before = bot.ranks();
    let ranking = RankingService::new(&bot.ctx);

    let err = ranking.add_rank(rank("Platinum", 4, 50)).await.unwrap_err();
    assert!(err.to_string().contains("rank.role.Platinum"));

    let err = ranking.add_rank(rank("Bronze", 5, 1)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let err = ranking.remove_rank("Gold").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { resource: "Rank", .. }));

    let err = ranking.edit_rank(rank("Gold", 3, 20)).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));

    assert_eq!(bot.ranks(), before);
}

#[tokio::test]
async fn test_failed_save_keeps_live_ranks() {
    let path = std::env::temp_dir()
        .join(format!("overlord-missing-{}", unique_id()))
        .join("bot.toml");
    let platform = MockPlatform::with_roles(&GUILD_ROLES);
    let bot = TestBot::persisted(BASIC_RANKS, platform, &path).await.unwrap();

    let err = RankingService::new(&bot.ctx)
        .remove_rank("Silver")
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::Config(ConfigError::Write { .. })));
    assert_eq!(bot.ranks().len(), 2);
}

#[tokio::test]
async fn test_removed_rank_no_longer_resolves() {
    let bot = TestBot::with_ranks(BASIC_RANKS).await.unwrap();
    let user = bot.join_new(&[]).await.unwrap();
    bot.store.set_stat(user, StatKind::NewMessageCount, 12);

    let ranking = RankingService::new(&bot.ctx);
    ranking.remove_rank("Silver").await.unwrap();
    assert_eq!(bot.ranks(), vec![("Bronze".to_string(), 1)]);

    ranking.update_rank(user).await.unwrap();
    assert_eq!(bot.held_roles(user), vec!["Bronze".to_string()]);
}

#[tokio::test]
async fn test_rank_edits_wait_for_role_sync() {
    let bot = TestBot::new(BASIC_RANKS, MockPlatform::with_roles(&GUILD_ROLES)).unwrap();

    let err = RankingService::new(&bot.ctx)
        .remove_rank("Silver")
        .await
        .unwrap_err();

    assert!(err.is_prerequisite());
    assert_eq!(bot.ranks().len(), 2);
}
