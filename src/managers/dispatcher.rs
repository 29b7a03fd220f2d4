use chrono::Utc;
use poise::serenity_prelude::UserId;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use super::field_mapper::FieldMapper;
use super::upstream_client::{LookupResult, ProfileLookup};
use super::verification_manager::SharedVerificationManager;
use crate::config::BotConfig;
use crate::messages;
use crate::reply::{Button, Reply};

const REFRESH_PREFIX: &str = "refresh_";

/// Button payloads routed back to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    VerifyNow,
    Help,
    NewSearch,
    Refresh(String),
}

impl Action {
    pub fn parse(custom_id: &str) -> Option<Self> {
        match custom_id {
            "verify_now" => Some(Action::VerifyNow),
            "help" => Some(Action::Help),
            "new_search" => Some(Action::NewSearch),
            other => other
                .strip_prefix(REFRESH_PREFIX)
                .filter(|uid| !uid.is_empty())
                .map(|uid| Action::Refresh(uid.to_string())),
        }
    }

    pub fn custom_id(&self) -> String {
        match self {
            Action::VerifyNow => "verify_now".to_string(),
            Action::Help => "help".to_string(),
            Action::NewSearch => "new_search".to_string(),
            Action::Refresh(uid) => format!("{}{}", REFRESH_PREFIX, uid),
        }
    }
}

/// Why an identifier was rejected. Display is the user-facing text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("❌ **Invalid UID!**\nPlease enter only numbers.\nExample: `{}`", messages::EXAMPLE_UID)]
    NotNumeric,

    #[error("❌ **Invalid UID length!**\nA UID should be {min}-{max} digits.")]
    Length { min: usize, max: usize },
}

/// Slow work the event layer runs after showing a pending reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Lookup(String),
    Verify,
}

/// What the event layer should do next
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Send or show this reply
    Reply(Reply),
    /// Show `pending` first, then replace it with `Dispatcher::complete`
    Deferred { pending: Reply, task: Task },
}

/// Routes user input to verification, lookup and rendering
pub struct Dispatcher {
    config: Arc<BotConfig>,
    verification: SharedVerificationManager,
    lookup: Arc<dyn ProfileLookup>,
    mapper: FieldMapper,
}

impl Dispatcher {
    pub fn new(
        config: Arc<BotConfig>,
        verification: SharedVerificationManager,
        lookup: Arc<dyn ProfileLookup>,
    ) -> Self {
        let mapper = FieldMapper::new(
            config.field_mapping.clone(),
            &config.owner_username,
            &config.bot_name,
        );
        Self {
            config,
            verification,
            lookup,
            mapper,
        }
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        user_id.get() == self.config.owner_id
    }

    /// Digits only, within the configured length range
    pub fn validate_identifier<'a>(&self, text: &'a str) -> Result<&'a str, ValidationError> {
        let uid = text.trim();
        if uid.is_empty() || !uid.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::NotNumeric);
        }

        let (min, max) = (self.config.min_identifier_len, self.config.max_identifier_len);
        if !(min..=max).contains(&uid.len()) {
            return Err(ValidationError::Length { min, max });
        }
        Ok(uid)
    }

    /// A typed message: gate on verification, then validate
    pub async fn handle_text(&self, user_id: UserId, text: &str) -> Step {
        if !self.verification.ensure_verified(user_id).await {
            return Step::Reply(self.join_prompt(messages::join_prompt_message()));
        }

        match self.validate_identifier(text) {
            Ok(uid) => Step::Deferred {
                pending: Reply::text(messages::searching_message(uid)),
                task: Task::Lookup(uid.to_string()),
            },
            Err(e) => {
                debug!("Rejected identifier from {}: {:?}", user_id, e);
                Step::Reply(Reply::text(e.to_string()))
            }
        }
    }

    /// A button press. Does no I/O, so the press can be answered at once.
    pub fn handle_action(&self, action: Action) -> Step {
        match action {
            Action::VerifyNow => Step::Deferred {
                pending: Reply::text(messages::verifying_message()),
                task: Task::Verify,
            },
            Action::Help => Step::Reply(Reply::text(messages::help_message(
                &self.config.owner_username,
            ))),
            Action::NewSearch => Step::Reply(Reply::text(messages::new_search_message())),
            // Refresh comes from a profile we already showed this user
            Action::Refresh(uid) => match self.validate_identifier(&uid) {
                Ok(uid) => Step::Deferred {
                    pending: Reply::text(messages::refreshing_message(uid)),
                    task: Task::Lookup(uid.to_string()),
                },
                Err(e) => Step::Reply(Reply::text(e.to_string())),
            },
        }
    }

    /// Run a deferred task and build the reply that replaces the pending one
    pub async fn complete(&self, user_id: UserId, task: Task) -> Reply {
        match task {
            Task::Lookup(identifier) => self.run_lookup(&identifier).await,
            Task::Verify => self.run_verify(user_id).await,
        }
    }

    /// Re-check membership after the user says they joined
    async fn run_verify(&self, user_id: UserId) -> Reply {
        if self.verification.verify(user_id).await {
            Reply::text(messages::verification_success_message())
        } else {
            let text = format!(
                "{}{}",
                messages::verification_failed_message(),
                messages::join_prompt_message()
            );
            self.join_prompt(text)
        }
    }

    /// Fetch and render one profile
    pub async fn run_lookup(&self, identifier: &str) -> Reply {
        match self.lookup.fetch(identifier).await {
            LookupResult::Success { data } => {
                match self.mapper.format(&data, identifier, Utc::now()) {
                    Some(profile) => Reply::text(profile)
                        .with_row(vec![
                            Button::action(
                                "🔄 Refresh",
                                Action::Refresh(identifier.to_string()).custom_id(),
                            ),
                            Button::action("📊 Another", Action::NewSearch.custom_id()),
                        ])
                        .with_row(self.link_row()),
                    None => {
                        error!("Format error for UID {}: payload is {}", identifier, data);
                        Reply::text(messages::format_failed_message(identifier))
                    }
                }
            }
            LookupResult::Error { message } => {
                Reply::text(messages::lookup_failed_message(identifier, &message))
            }
        }
    }

    /// `/start`: welcome verified users, prompt everyone else
    pub async fn start(&self, user_id: UserId, name: &str) -> Reply {
        if self.verification.ensure_verified(user_id).await {
            Reply::text(messages::welcome_message(name, &self.config.bot_name))
        } else {
            self.join_prompt(messages::join_prompt_message())
        }
    }

    /// Join links for every required channel plus verify/help actions
    pub fn join_prompt(&self, text: String) -> Reply {
        let joins: Vec<Button> = self
            .config
            .required_channels
            .iter()
            .map(|channel| Button::link(format!("📢 Join {}", channel.name), &channel.url))
            .collect();

        Reply::text(text).with_row(joins).with_row(vec![
            Button::action("✅ I've Joined - Verify", Action::VerifyNow.custom_id()),
            Button::action("❓ Help", Action::Help.custom_id()),
        ])
    }

    fn link_row(&self) -> Vec<Button> {
        let mut row = Vec::new();
        if let Some(channel) = self.config.required_channels.first() {
            row.push(Button::link("📢 Channel", &channel.url));
        }
        row.push(Button::link("👤 Owner", &self.config.owner_url()));
        row
    }

    #[cfg(test)]
    pub fn verification(&self) -> &SharedVerificationManager {
        &self.verification
    }
}

/// Shared dispatcher type
pub type SharedDispatcher = Arc<Dispatcher>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::membership::tests::{channels, StubMembership};
    use crate::managers::membership::MemberStatus;
    use crate::managers::verification_manager::create_shared_verification_manager;
    use crate::state::{create_shared_user_database, UserDatabase};
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    /// Returns a canned result and records every identifier asked for
    struct StubLookup {
        result: LookupResult,
        calls: Mutex<Vec<String>>,
    }

    impl StubLookup {
        fn new(result: LookupResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProfileLookup for StubLookup {
        async fn fetch(&self, identifier: &str) -> LookupResult {
            self.calls.lock().unwrap().push(identifier.to_string());
            self.result.clone()
        }
    }

    fn config() -> Arc<BotConfig> {
        let mut config: BotConfig = serde_json::from_value(json!({
            "owner_id": 6678577936u64,
            "owner_username": "owner",
            "api": { "base_url": "http://localhost", "endpoint": "/accinfo" }
        }))
        .unwrap();
        config.required_channels = channels();
        Arc::new(config)
    }

    struct Harness {
        dispatcher: Dispatcher,
        membership: Arc<StubMembership>,
        lookup: Arc<StubLookup>,
        _dir: tempfile::TempDir,
    }

    fn harness(statuses: &[(u64, MemberStatus)], result: LookupResult) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        let membership = Arc::new(StubMembership::new(statuses));
        let lookup = StubLookup::new(result);
        let verification = create_shared_verification_manager(
            create_shared_user_database(UserDatabase::new()),
            path.to_str().unwrap(),
            membership.clone(),
            channels(),
            Duration::seconds(300),
        );

        Harness {
            dispatcher: Dispatcher::new(config(), verification, lookup.clone()),
            membership,
            lookup,
            _dir: dir,
        }
    }

    fn members() -> Vec<(u64, MemberStatus)> {
        vec![(1001, MemberStatus::Member), (1002, MemberStatus::Member)]
    }

    fn profile() -> LookupResult {
        LookupResult::Success {
            data: json!({ "nickname": "Tiger", "level": 70 }),
        }
    }

    #[test]
    fn test_identifier_validation() {
        let h = harness(&[], profile());
        let d = &h.dispatcher;

        for ok in ["12345", "1484443876", "123456789012345", " 1484443876 "] {
            assert!(d.validate_identifier(ok).is_ok(), "{ok} should pass");
        }
        assert_eq!(d.validate_identifier("12ab"), Err(ValidationError::NotNumeric));
        assert_eq!(d.validate_identifier(""), Err(ValidationError::NotNumeric));
        assert_eq!(d.validate_identifier("-12345"), Err(ValidationError::NotNumeric));
        assert_eq!(d.validate_identifier("١٢٣٤٥"), Err(ValidationError::NotNumeric));
        assert_eq!(
            d.validate_identifier("1234"),
            Err(ValidationError::Length { min: 5, max: 15 })
        );
        assert_eq!(
            d.validate_identifier("1234567890123456"),
            Err(ValidationError::Length { min: 5, max: 15 })
        );
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(Action::parse("verify_now"), Some(Action::VerifyNow));
        assert_eq!(Action::parse("help"), Some(Action::Help));
        assert_eq!(Action::parse("new_search"), Some(Action::NewSearch));
        assert_eq!(
            Action::parse("refresh_1484443876"),
            Some(Action::Refresh("1484443876".to_string()))
        );
        assert_eq!(Action::parse("refresh_"), None);
        assert_eq!(Action::parse("config_global"), None);
        assert_eq!(
            Action::parse(&Action::Refresh("12345".to_string()).custom_id()),
            Some(Action::Refresh("12345".to_string()))
        );
    }

    #[tokio::test]
    async fn test_member_proceeds_to_lookup() {
        let h = harness(&members(), profile());
        let user = UserId::new(1484443876);

        assert!(!h.dispatcher.verification().is_verified(user).await);

        let step = h.dispatcher.handle_text(user, "1484443876").await;
        let Step::Deferred { pending, task } = step else {
            panic!("expected lookup");
        };
        assert_eq!(task, Task::Lookup("1484443876".to_string()));
        assert!(pending.content.contains("Searching for UID"));
        assert!(h.dispatcher.verification().is_verified(user).await);
        assert_eq!(h.membership.queries.load(Ordering::SeqCst), 2);

        let reply = h.dispatcher.complete(user, task).await;
        assert!(reply.content.contains("✨ **Name:** Tiger"));
        assert_eq!(reply.action_ids(), vec!["refresh_1484443876", "new_search"]);
        assert_eq!(h.lookup.calls(), vec!["1484443876".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_identifier_makes_no_upstream_call() {
        let h = harness(&members(), profile());
        let user = UserId::new(42);

        let step = h.dispatcher.handle_text(user, "12ab").await;
        assert_eq!(
            step,
            Step::Reply(Reply::text(ValidationError::NotNumeric.to_string()))
        );
        assert!(h.lookup.calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_member_gets_join_prompt() {
        let h = harness(&[(1001, MemberStatus::Member), (1002, MemberStatus::Left)], profile());
        let user = UserId::new(42);

        let Step::Reply(reply) = h.dispatcher.handle_text(user, "1484443876").await else {
            panic!("expected join prompt");
        };
        assert!(reply.content.contains("VERIFICATION REQUIRED"));
        assert_eq!(reply.action_ids(), vec!["verify_now", "help"]);
        assert_eq!(reply.rows[0].len(), 2);
        assert!(h.lookup.calls().is_empty());
        assert!(!h.dispatcher.verification().is_verified(user).await);
    }

    #[tokio::test]
    async fn test_verify_now_answers_before_checking() {
        let h = harness(&members(), profile());

        let step = h.dispatcher.handle_action(Action::VerifyNow);
        assert_eq!(
            step,
            Step::Deferred {
                pending: Reply::text(messages::verifying_message()),
                task: Task::Verify,
            }
        );
        assert_eq!(h.membership.queries.load(Ordering::SeqCst), 0);
        assert_eq!(h.dispatcher.verification().user_count().await, 0);
    }

    #[tokio::test]
    async fn test_verify_now_transitions() {
        let denied = harness(&[(1001, MemberStatus::Kicked)], profile());
        let reply = denied
            .dispatcher
            .complete(UserId::new(42), Task::Verify)
            .await;
        assert!(reply.content.contains("Verification Failed"));
        assert!(reply.action_ids().contains(&"verify_now"));

        let allowed = harness(&members(), profile());
        let user = UserId::new(42);
        let reply = allowed.dispatcher.complete(user, Task::Verify).await;
        assert_eq!(reply, Reply::text(messages::verification_success_message()));
        assert!(allowed.dispatcher.verification().is_verified(user).await);
    }

    #[tokio::test]
    async fn test_refresh_skips_verification() {
        let h = harness(&[], profile());
        let step = h.dispatcher.handle_action(Action::Refresh("1484443876".to_string()));

        assert!(
            matches!(step, Step::Deferred { task: Task::Lookup(ref uid), .. } if uid == "1484443876")
        );
        assert_eq!(h.membership.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_rendered_verbatim() {
        let h = harness(&members(), LookupResult::error("Timeout - Server is slow"));

        let reply = h.dispatcher.run_lookup("1484443876").await;
        assert!(reply.content.contains("**Reason:** Timeout - Server is slow"));
        assert!(reply.rows.is_empty());
    }

    #[tokio::test]
    async fn test_unformattable_payload() {
        let h = harness(
            &members(),
            LookupResult::Success {
                data: json!("not an object"),
            },
        );

        let reply = h.dispatcher.run_lookup("1484443876").await;
        assert_eq!(reply, Reply::text(messages::format_failed_message("1484443876")));
    }

    #[tokio::test]
    async fn test_owner_check() {
        let h = harness(&[], profile());
        assert!(h.dispatcher.is_owner(UserId::new(6678577936)));
        assert!(!h.dispatcher.is_owner(UserId::new(42)));
    }

    #[tokio::test]
    async fn test_start_for_member() {
        let h = harness(&members(), profile());
        let reply = h.dispatcher.start(UserId::new(42), "Alex").await;
        assert!(reply.content.contains("Welcome Alex"));
        assert!(reply.rows.is_empty());
    }
}
