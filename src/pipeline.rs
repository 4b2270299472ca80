//! Webhook notification pipeline.
//!
//! One entry point, [`Orchestrator::handle`], runs the whole flow for a
//! single notification: filter by topic, load the tenant credential, fetch
//! the question, validate it, fetch the listing, generate a reply, post it.
//! Every branch ends in a terminal [`Outcome`] so the webhook endpoint can
//! always acknowledge with HTTP 200 and the provider never retries into a
//! duplicate answer.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::marketplace::{MarketplaceApi, QuestionStatus};
use crate::replier::ReplyGenerator;
use crate::repositories::CredentialStore;

/// Webhook payload sent by the marketplace
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NotificationEvent {
    /// Notification category, only `questions` is acted upon
    pub topic: String,
    /// Seller account the notification belongs to
    pub user_id: i64,
    /// Resource path of the subject, for example `/questions/10`
    pub resource: String,
}

/// Business-rule reasons a notification is acknowledged but not answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UserNotFound,
    UserInactive,
    NotUnanswered,
    SelfQuestion,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserNotFound => "user_not_found",
            Self::UserInactive => "user_inactive",
            Self::NotUnanswered => "not_unanswered",
            Self::SelfQuestion => "self_question",
        }
    }
}

/// Infrastructure reasons the pipeline could not complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    StoreUnavailable,
    QuestionFetchFailed,
    ItemFetchFailed,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StoreUnavailable => "store_unavailable",
            Self::QuestionFetchFailed => "question_fetch_failed",
            Self::ItemFetchFailed => "item_fetch_failed",
        }
    }
}

/// Terminal result of handling one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Handled, or deliberately not actionable at the topic level
    Ok,
    /// Acknowledged but skipped by a business rule
    Ignored(SkipReason),
    /// Acknowledged but a dependency failed mid-pipeline
    Error(FailureReason),
}

impl Outcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Ignored(_) => "ignored",
            Self::Error(_) => "error",
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Ok => None,
            Self::Ignored(reason) => Some(reason.as_str()),
            Self::Error(reason) => Some(reason.as_str()),
        }
    }
}

/// Runs the question-answering pipeline over injected dependencies
pub struct Orchestrator {
    store: Arc<dyn CredentialStore>,
    marketplace: Arc<dyn MarketplaceApi>,
    replier: Arc<dyn ReplyGenerator>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        marketplace: Arc<dyn MarketplaceApi>,
        replier: Arc<dyn ReplyGenerator>,
    ) -> Self {
        Self {
            store,
            marketplace,
            replier,
        }
    }

    /// Handle a single notification to a terminal outcome. Never panics and
    /// never returns an error type; the caller always acknowledges.
    pub async fn handle(&self, event: &NotificationEvent) -> Outcome {
        if event.topic != "questions" {
            info!(topic = %event.topic, "ignoring non-question topic");
            return Outcome::Ok;
        }

        let credential = match self.store.get(event.user_id).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                info!(tenant_id = event.user_id, "no credentials for tenant");
                return Outcome::Ignored(SkipReason::UserNotFound);
            }
            Err(error) => {
                warn!(tenant_id = event.user_id, %error, "credential store unavailable");
                return Outcome::Error(FailureReason::StoreUnavailable);
            }
        };

        if !credential.is_active {
            info!(tenant_id = event.user_id, "tenant is deactivated");
            return Outcome::Ignored(SkipReason::UserInactive);
        }

        let question = match self
            .marketplace
            .fetch_question(&event.resource, &credential.access_token)
            .await
        {
            Ok(question) => question,
            Err(error) => {
                warn!(resource = %event.resource, %error, "failed to fetch question");
                return Outcome::Error(FailureReason::QuestionFetchFailed);
            }
        };

        if question.status != QuestionStatus::Unanswered {
            info!(question_id = question.id, status = ?question.status, "question not actionable");
            return Outcome::Ignored(SkipReason::NotUnanswered);
        }

        // Sellers can ask questions on their own listings; answering those
        // would have the bot talking to its own tenant.
        if question.from.id == event.user_id {
            info!(question_id = question.id, "question asked by the seller");
            return Outcome::Ignored(SkipReason::SelfQuestion);
        }

        let item = match self
            .marketplace
            .fetch_item(&question.item_id, &credential.access_token)
            .await
        {
            Ok(item) => item,
            Err(error) => {
                warn!(item_id = %question.item_id, %error, "failed to fetch item");
                return Outcome::Error(FailureReason::ItemFetchFailed);
            }
        };

        let reply = self.replier.generate_reply(&question.text, &item).await;

        // One delivery attempt. A rejected post is logged with the provider's
        // response; acknowledging ok prevents a redelivery loop that would
        // double-answer if the first attempt actually landed.
        if let Err(error) = self
            .marketplace
            .post_answer(question.id, &reply, &credential.access_token)
            .await
        {
            warn!(question_id = question.id, %error, "failed to post answer");
        } else {
            info!(question_id = question.id, tenant_id = event.user_id, "answer posted");
        }

        Outcome::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::marketplace::{Item, MarketplaceError, Question, QuestionAuthor};
    use crate::models::tenant::Model as TenantCredential;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn credential(tenant_id: i64, is_active: bool) -> TenantCredential {
        TenantCredential {
            tenant_id,
            access_token: format!("access-{tenant_id}"),
            refresh_token: format!("refresh-{tenant_id}"),
            is_active,
        }
    }

    fn question(id: i64, status: QuestionStatus, author_id: i64) -> Question {
        Question {
            id,
            status,
            text: "Does it come in black?".to_string(),
            item_id: "X1".to_string(),
            from: QuestionAuthor { id: author_id },
        }
    }

    fn item() -> Item {
        Item {
            title: "Wireless mouse".to_string(),
            price: 59.0,
            currency_id: "BRL".to_string(),
            permalink: None,
        }
    }

    fn event() -> NotificationEvent {
        NotificationEvent {
            topic: "questions".to_string(),
            user_id: 1,
            resource: "/questions/10".to_string(),
        }
    }

    #[derive(Default)]
    struct StubStore {
        credential: Option<TenantCredential>,
        fail: bool,
    }

    #[async_trait]
    impl CredentialStore for StubStore {
        async fn upsert(&self, _: i64, _: &str, _: &str) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn get(&self, _: i64) -> Result<Option<TenantCredential>, RepositoryError> {
            if self.fail {
                return Err(RepositoryError::Database(sea_orm::DbErr::Custom(
                    "connection refused".to_string(),
                )));
            }
            Ok(self.credential.clone())
        }
    }

    /// Records every marketplace call so tests can assert on ordering and
    /// payloads.
    #[derive(Default)]
    struct StubMarketplace {
        question: Option<Result<Question, ()>>,
        item: Option<Result<Item, ()>>,
        post_fails: bool,
        calls: Mutex<Vec<String>>,
    }

    impl StubMarketplace {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn remote_error() -> MarketplaceError {
        MarketplaceError::Http {
            status: 500,
            body: Some("boom".to_string()),
        }
    }

    #[async_trait]
    impl MarketplaceApi for StubMarketplace {
        async fn fetch_question(
            &self,
            resource: &str,
            token: &str,
        ) -> Result<Question, MarketplaceError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("fetch_question {resource} {token}"));
            match &self.question {
                Some(Ok(question)) => Ok(question.clone()),
                _ => Err(remote_error()),
            }
        }

        async fn fetch_item(&self, item_id: &str, token: &str) -> Result<Item, MarketplaceError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("fetch_item {item_id} {token}"));
            match &self.item {
                Some(Ok(item)) => Ok(item.clone()),
                _ => Err(remote_error()),
            }
        }

        async fn post_answer(
            &self,
            question_id: i64,
            text: &str,
            token: &str,
        ) -> Result<(), MarketplaceError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("post_answer {question_id} '{text}' {token}"));
            if self.post_fails {
                return Err(remote_error());
            }
            Ok(())
        }
    }

    struct StubReplier {
        reply: String,
    }

    #[async_trait]
    impl ReplyGenerator for StubReplier {
        async fn generate_reply(&self, _: &str, _: &Item) -> String {
            self.reply.clone()
        }
    }

    fn orchestrator(
        store: StubStore,
        marketplace: Arc<StubMarketplace>,
    ) -> Orchestrator {
        Orchestrator::new(
            Arc::new(store),
            marketplace,
            Arc::new(StubReplier {
                reply: "Yes, black is in stock!".to_string(),
            }),
        )
    }

    #[tokio::test]
    async fn happy_path_posts_generated_reply() {
        let marketplace = Arc::new(StubMarketplace {
            question: Some(Ok(question(10, QuestionStatus::Unanswered, 2))),
            item: Some(Ok(item())),
            ..StubMarketplace::default()
        });
        let store = StubStore {
            credential: Some(credential(1, true)),
            fail: false,
        };

        let outcome = orchestrator(store, marketplace.clone()).handle(&event()).await;

        assert_eq!(outcome, Outcome::Ok);
        assert_eq!(
            marketplace.calls(),
            vec![
                "fetch_question /questions/10 access-1",
                "fetch_item X1 access-1",
                "post_answer 10 'Yes, black is in stock!' access-1",
            ]
        );
    }

    #[tokio::test]
    async fn non_question_topic_is_acknowledged_without_any_calls() {
        let marketplace = Arc::new(StubMarketplace::default());
        let store = StubStore {
            credential: Some(credential(1, true)),
            fail: false,
        };
        let mut orders = event();
        orders.topic = "orders".to_string();

        let outcome = orchestrator(store, marketplace.clone()).handle(&orders).await;

        assert_eq!(outcome, Outcome::Ok);
        assert!(marketplace.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_tenant_is_ignored() {
        let marketplace = Arc::new(StubMarketplace::default());
        let outcome = orchestrator(StubStore::default(), marketplace.clone())
            .handle(&event())
            .await;

        assert_eq!(outcome, Outcome::Ignored(SkipReason::UserNotFound));
        assert_eq!(outcome.status(), "ignored");
        assert_eq!(outcome.reason(), Some("user_not_found"));
        assert!(marketplace.calls().is_empty());
    }

    #[tokio::test]
    async fn inactive_tenant_is_ignored_before_any_remote_call() {
        let marketplace = Arc::new(StubMarketplace::default());
        let store = StubStore {
            credential: Some(credential(1, false)),
            fail: false,
        };

        let outcome = orchestrator(store, marketplace.clone()).handle(&event()).await;

        assert_eq!(outcome, Outcome::Ignored(SkipReason::UserInactive));
        assert!(marketplace.calls().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_an_error_outcome() {
        let marketplace = Arc::new(StubMarketplace::default());
        let store = StubStore {
            credential: None,
            fail: true,
        };

        let outcome = orchestrator(store, marketplace.clone()).handle(&event()).await;

        assert_eq!(outcome, Outcome::Error(FailureReason::StoreUnavailable));
        assert_eq!(outcome.reason(), Some("store_unavailable"));
        assert!(marketplace.calls().is_empty());
    }

    #[tokio::test]
    async fn answered_question_is_ignored() {
        let marketplace = Arc::new(StubMarketplace {
            question: Some(Ok(question(10, QuestionStatus::Answered, 2))),
            ..StubMarketplace::default()
        });
        let store = StubStore {
            credential: Some(credential(1, true)),
            fail: false,
        };

        let outcome = orchestrator(store, marketplace.clone()).handle(&event()).await;

        assert_eq!(outcome, Outcome::Ignored(SkipReason::NotUnanswered));
        // The pipeline stopped before touching the item or posting.
        assert_eq!(marketplace.calls().len(), 1);
    }

    #[tokio::test]
    async fn sellers_own_question_is_ignored() {
        let marketplace = Arc::new(StubMarketplace {
            question: Some(Ok(question(10, QuestionStatus::Unanswered, 1))),
            ..StubMarketplace::default()
        });
        let store = StubStore {
            credential: Some(credential(1, true)),
            fail: false,
        };

        let outcome = orchestrator(store, marketplace.clone()).handle(&event()).await;

        assert_eq!(outcome, Outcome::Ignored(SkipReason::SelfQuestion));
        assert_eq!(marketplace.calls().len(), 1);
    }

    #[tokio::test]
    async fn question_fetch_failure_is_an_error_outcome() {
        let marketplace = Arc::new(StubMarketplace {
            question: Some(Err(())),
            ..StubMarketplace::default()
        });
        let store = StubStore {
            credential: Some(credential(1, true)),
            fail: false,
        };

        let outcome = orchestrator(store, marketplace.clone()).handle(&event()).await;

        assert_eq!(outcome, Outcome::Error(FailureReason::QuestionFetchFailed));
    }

    #[tokio::test]
    async fn item_fetch_failure_is_an_error_outcome() {
        let marketplace = Arc::new(StubMarketplace {
            question: Some(Ok(question(10, QuestionStatus::Unanswered, 2))),
            item: Some(Err(())),
            ..StubMarketplace::default()
        });
        let store = StubStore {
            credential: Some(credential(1, true)),
            fail: false,
        };

        let outcome = orchestrator(store, marketplace.clone()).handle(&event()).await;

        assert_eq!(outcome, Outcome::Error(FailureReason::ItemFetchFailed));
        assert_eq!(marketplace.calls().len(), 2);
    }

    #[tokio::test]
    async fn post_failure_still_acknowledges_ok() {
        let marketplace = Arc::new(StubMarketplace {
            question: Some(Ok(question(10, QuestionStatus::Unanswered, 2))),
            item: Some(Ok(item())),
            post_fails: true,
            ..StubMarketplace::default()
        });
        let store = StubStore {
            credential: Some(credential(1, true)),
            fail: false,
        };

        let outcome = orchestrator(store, marketplace.clone()).handle(&event()).await;

        assert_eq!(outcome, Outcome::Ok);
        assert_eq!(marketplace.calls().len(), 3, "exactly one delivery attempt");
    }
}
