// src/views.rs

use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;

use crate::chat_repo::ChatRepo;
use crate::errors::ApiError;
use crate::models::{Chat, ChatView, GroupView, PublicUser, User};

/// Joins a chat's id arrays against fetched user records, preserving the
/// stored array order. Ids with no matching user are dropped, the same way a
/// store-side lookup would produce an empty join. Never mutates anything.
fn assemble(chat: &Chat, users: &HashMap<ObjectId, User>, group: Option<GroupView>) -> ChatView {
    let join = |ids: &[ObjectId]| -> Vec<PublicUser> {
        ids.iter()
            .filter_map(|id| users.get(id).map(PublicUser::from))
            .collect()
    };
    ChatView {
        id: chat.id.to_hex(),
        name: chat.name.clone(),
        is_group: chat.is_group,
        is_community: chat.is_community,
        participants: join(&chat.participants),
        admins: join(&chat.admins),
        group,
        created_at: chat.created_at,
        updated_at: chat.updated_at,
    }
}

/// First-match group join: a missing group or creator projects as `None`
/// instead of failing the request.
async fn group_view(repo: &ChatRepo, group_id: &ObjectId) -> Result<Option<GroupView>, ApiError> {
    let group = match repo.find_group(group_id).await? {
        Some(group) => group,
        None => return Ok(None),
    };
    let creator = repo
        .find_user(&group.group_creator)
        .await?
        .map(|user| PublicUser::from(&user));
    Ok(Some(GroupView {
        id: group.id.to_hex(),
        name: group.name,
        group_creator: creator,
    }))
}

/// Builds the full projection for a chat: participants and admins joined to
/// stripped user records, plus the group (and its creator) when the chat is
/// a group chat.
pub async fn chat_view(repo: &ChatRepo, chat: &Chat) -> Result<ChatView, ApiError> {
    let mut ids = chat.participants.clone();
    for admin in &chat.admins {
        if !ids.contains(admin) {
            ids.push(*admin);
        }
    }
    let users = repo.find_users(&ids).await?;

    let group = match (chat.is_group, chat.group.as_ref()) {
        (true, Some(group_id)) => group_view(repo, group_id).await?,
        _ => None,
    };

    Ok(assemble(chat, &users, group))
}

/// Resolves a chat id and projects it. `Ok(None)` means the chat is gone,
/// which callers after a mutation treat as a failed post-write read.
pub async fn chat_view_by_id(
    repo: &ChatRepo,
    chat_id: &ObjectId,
) -> Result<Option<ChatView>, ApiError> {
    match repo.find_chat(chat_id).await? {
        Some(chat) => Ok(Some(chat_view(repo, &chat).await?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_user, Chat};

    fn indexed(users: Vec<User>) -> HashMap<ObjectId, User> {
        users.into_iter().map(|u| (u.id, u)).collect()
    }

    #[test]
    fn assemble_preserves_stored_participant_order() {
        let a = sample_user("a");
        let b = sample_user("b");
        let chat = Chat::one_to_one(a.id, b.id);
        let view = assemble(&chat, &indexed(vec![b.clone(), a.clone()]), None);
        assert_eq!(view.participants.len(), 2);
        assert_eq!(view.participants[0].id, a.id.to_hex());
        assert_eq!(view.participants[1].id, b.id.to_hex());
        assert_eq!(view.admins, vec![PublicUser::from(&a)]);
    }

    #[test]
    fn assemble_drops_unresolvable_ids() {
        let a = sample_user("a");
        let b = sample_user("b");
        let chat = Chat::one_to_one(a.id, b.id);
        let view = assemble(&chat, &indexed(vec![a.clone()]), None);
        assert_eq!(view.participants, vec![PublicUser::from(&a)]);
    }

    #[test]
    fn assemble_keeps_admin_disjoint_from_participants() {
        // An admin that is not a participant still appears in `admins`.
        let admin = sample_user("admin");
        let member = sample_user("member");
        let mut chat = Chat::group_chat(admin.id, ObjectId::new(), vec![member.id]);
        chat.admins = vec![admin.id];
        let view = assemble(&chat, &indexed(vec![admin.clone(), member.clone()]), None);
        assert_eq!(view.participants, vec![PublicUser::from(&member)]);
        assert_eq!(view.admins, vec![PublicUser::from(&admin)]);
    }
}
