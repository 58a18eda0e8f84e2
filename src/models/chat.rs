// File: chat.rs

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use super::PublicUser;

/// A chat document. `participants` and `admins` are two independent id sets:
/// an admin is not required to be a participant, and no mutation couples the
/// two. A group chat always carries `is_group = true` and a `group` id; a
/// one-to-one chat carries neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub is_group: bool,
    pub is_community: bool,
    pub participants: Vec<ObjectId>,
    pub admins: Vec<ObjectId>,
    pub group: Option<ObjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Shape of a one-to-one chat: both users participate, the requester is
    /// the sole admin.
    pub fn one_to_one(requester: ObjectId, receiver: ObjectId) -> Self {
        let now = Utc::now();
        Chat {
            id: ObjectId::new(),
            name: "oneToOne".to_string(),
            is_group: false,
            is_community: false,
            participants: vec![requester, receiver],
            admins: vec![requester],
            group: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn group_chat(requester: ObjectId, group_id: ObjectId, members: Vec<ObjectId>) -> Self {
        let now = Utc::now();
        Chat {
            id: ObjectId::new(),
            name: "GroupChat".to_string(),
            is_group: true,
            is_community: false,
            participants: members,
            admins: vec![requester],
            group: Some(group_id),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Group metadata referenced by exactly one group chat. The creator is fixed
/// at creation; the name is unique per creator, not globally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub group_creator: ObjectId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: String, group_creator: ObjectId) -> Self {
        let now = Utc::now();
        Group {
            id: ObjectId::new(),
            name,
            group_creator,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Read-only projection of a `Group` with its creator joined in. A dangling
/// creator reference projects as `None` rather than an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub group_creator: Option<PublicUser>,
}

/// Read-only projection of a `Chat` with participant and admin ids joined to
/// stripped user records. This is the payload clients receive, both as the
/// HTTP response body and as the WebSocket fanout payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub is_group: bool,
    pub is_community: bool,
    pub participants: Vec<PublicUser>,
    pub admins: Vec<PublicUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
