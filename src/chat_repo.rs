// src/chat_repo.rs

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

use crate::chat_db::MongoDB;
use crate::errors::ApiError;
use crate::models::{Chat, Group, User};

/// Store access for chats, groups and the user lookups the projections need.
/// Each method is a single round trip; callers sequence them without any
/// cross-document transaction.
#[derive(Clone)]
pub struct ChatRepo {
    db: Arc<MongoDB>,
}

/// Match filter for the duplicate-pair lookup: a non-group, non-community
/// chat where both users appear in `participants`, regardless of order.
pub fn one_to_one_filter(a: ObjectId, b: ObjectId) -> Document {
    doc! {
        "participants": { "$all": [a, b] },
        "isGroup": false,
        "isCommunity": false,
    }
}

/// Match filter for group-name uniqueness: scoped to one creator, so the
/// same name under different creators never collides.
pub fn group_name_filter(name: &str, creator: &ObjectId) -> Document {
    doc! { "name": name, "groupCreator": creator }
}

impl ChatRepo {
    pub fn new(db: Arc<MongoDB>) -> Self {
        ChatRepo { db }
    }

    pub async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, ApiError> {
        Ok(self.db.users().find_one(doc! { "_id": id }).await?)
    }

    /// Fetches all users in `ids` with one `$in` query, keyed by id so the
    /// caller can re-apply the stored array order.
    pub async fn find_users(
        &self,
        ids: &[ObjectId],
    ) -> Result<HashMap<ObjectId, User>, ApiError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut cursor = self
            .db
            .users()
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        let mut users = HashMap::new();
        while let Some(user) = cursor.next().await {
            let user = user?;
            users.insert(user.id, user);
        }
        Ok(users)
    }

    pub async fn find_chat(&self, id: &ObjectId) -> Result<Option<Chat>, ApiError> {
        Ok(self.db.chats().find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_one_to_one_chat(
        &self,
        a: ObjectId,
        b: ObjectId,
    ) -> Result<Option<Chat>, ApiError> {
        Ok(self.db.chats().find_one(one_to_one_filter(a, b)).await?)
    }

    pub async fn find_group(&self, id: &ObjectId) -> Result<Option<Group>, ApiError> {
        Ok(self.db.groups().find_one(doc! { "_id": id }).await?)
    }

    /// Name uniqueness is scoped to the creator, not global.
    pub async fn find_group_by_name_and_creator(
        &self,
        name: &str,
        creator: &ObjectId,
    ) -> Result<Option<Group>, ApiError> {
        Ok(self
            .db
            .groups()
            .find_one(group_name_filter(name, creator))
            .await?)
    }

    pub async fn insert_chat(&self, chat: &Chat) -> Result<(), ApiError> {
        self.db.chats().insert_one(chat).await?;
        Ok(())
    }

    pub async fn insert_group(&self, group: &Group) -> Result<(), ApiError> {
        self.db.groups().insert_one(group).await?;
        Ok(())
    }

    /// Replaces the `participants` array in place. Deliberately a `$set` on
    /// the single field rather than a re-validated full-document save, so
    /// unrelated document validators cannot block a valid membership change.
    pub async fn set_participants(
        &self,
        chat_id: &ObjectId,
        participants: &[ObjectId],
    ) -> Result<(), ApiError> {
        self.db
            .chats()
            .update_one(
                doc! { "_id": chat_id },
                doc! { "$set": {
                    "participants": participants.to_vec(),
                    "updatedAt": chrono::Utc::now().to_rfc3339(),
                } },
            )
            .await?;
        Ok(())
    }
}
