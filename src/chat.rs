// File: chat.rs

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use log::info;
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::chat_repo::ChatRepo;
use crate::chat_server::{Notify, LEAVE_CHAT, NEW_CHAT};
use crate::errors::{ApiError, ApiResponse};
use crate::models::{Chat, Group};
use crate::views;

// ─── REQUEST PAYLOADS ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateParticipantsRequest {
    #[serde(rename = "chatId")]
    pub chat_id: String,
    pub participants: Vec<String>,
}

// ─── VALIDATION HELPERS ───────────────────────────────────────────────────────

fn current_user(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    req.extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized access".to_string()))
}

/// Order-preserving dedup: first occurrence wins.
fn dedupe(ids: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(id.clone());
        }
    }
    seen
}

fn parse_participant_ids(ids: &[String]) -> Result<Vec<ObjectId>, ApiError> {
    ids.iter()
        .map(|id| {
            ObjectId::parse_str(id)
                .map_err(|_| ApiError::InvalidArgument(format!("Invalid participant id: {}", id)))
        })
        .collect()
}

/// Shared validation for add/remove: well-formed chat id, non-empty deduped
/// target list, well-formed target ids, and the requester not targeting
/// themselves.
fn validate_targets(
    requester: &AuthUser,
    chat_id: &str,
    participants: &[String],
) -> Result<(ObjectId, Vec<ObjectId>), ApiError> {
    if chat_id.is_empty() || participants.is_empty() {
        return Err(ApiError::InvalidArgument(
            "Chat id and participants are required".to_string(),
        ));
    }
    let chat_id = ObjectId::parse_str(chat_id)
        .map_err(|_| ApiError::InvalidArgument("Invalid chat id".to_string()))?;

    let members = dedupe(participants);
    if members.is_empty() {
        return Err(ApiError::Forbidden("No participants are there".to_string()));
    }
    let members = parse_participant_ids(&members)?;
    if members.contains(&requester.id) {
        return Err(ApiError::Forbidden(
            "Admin cannot be a participant".to_string(),
        ));
    }
    Ok((chat_id, members))
}

/// No self-chat: a one-to-one chat needs two distinct users.
fn ensure_not_self(requester: &ObjectId, receiver: &ObjectId) -> Result<(), ApiError> {
    if requester == receiver {
        return Err(ApiError::Forbidden(
            "You cannot chat with yourself".to_string(),
        ));
    }
    Ok(())
}

/// Builds the deduped member set for a group (requester always included)
/// and enforces the three-member minimum.
fn group_members(requester: &AuthUser, participants: &[String]) -> Result<Vec<ObjectId>, ApiError> {
    let mut member_ids = participants.to_vec();
    member_ids.push(requester.id.to_hex());
    let members = parse_participant_ids(&dedupe(&member_ids))?;
    if members.len() < 3 {
        return Err(ApiError::Forbidden(
            "Group should have at least 3 members".to_string(),
        ));
    }
    Ok(members)
}

/// Membership mutation is gated on the `admins` set alone; being a
/// participant grants nothing.
fn require_admin(chat: &Chat, user_id: &ObjectId, action: &str) -> Result<(), ApiError> {
    if !chat.admins.contains(user_id) {
        return Err(ApiError::Unauthorized(format!(
            "{} requires admin permissions",
            action
        )));
    }
    Ok(())
}

fn first_already_present(existing: &[ObjectId], members: &[ObjectId]) -> Option<ObjectId> {
    members.iter().find(|id| existing.contains(id)).copied()
}

/// Set difference; ids in `members` that are not present are silently
/// ignored.
fn without_members(existing: &[ObjectId], members: &[ObjectId]) -> Vec<ObjectId> {
    existing
        .iter()
        .filter(|id| !members.contains(id))
        .copied()
        .collect()
}

// ─── HANDLERS ─────────────────────────────────────────────────────────────────

// POST /chats/one-to-one/{receiver_id}
// Idempotent: an existing chat for the pair is returned with 200 instead of
// creating a duplicate.
pub async fn create_one_to_one_chat(
    req: HttpRequest,
    data: web::Data<AppState>,
    receiver_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req)?;
    let receiver_id = ObjectId::parse_str(receiver_id.into_inner().as_str())
        .map_err(|_| ApiError::InvalidArgument("Invalid receiver id".to_string()))?;

    let repo = ChatRepo::new(data.mongodb.clone());
    let receiver = repo
        .find_user(&receiver_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Receiver does not exist".to_string()))?;

    ensure_not_self(&user.id, &receiver.id)?;

    if let Some(existing) = repo.find_one_to_one_chat(user.id, receiver.id).await? {
        let view = views::chat_view(&repo, &existing).await?;
        return Ok(HttpResponse::Ok().json(ApiResponse::new(200, "Chat already existed", view)));
    }

    let chat = Chat::one_to_one(user.id, receiver.id);
    repo.insert_chat(&chat).await?;
    let view = views::chat_view_by_id(&repo, &chat.id).await?.ok_or_else(|| {
        ApiError::Internal("Something went wrong while creating one to one chat".to_string())
    })?;

    // The requester is notified about their own new chat as well.
    for participant in &chat.participants {
        data.chat_server.do_send(Notify {
            user_id: participant.to_hex(),
            event: NEW_CHAT,
            payload: view.clone(),
        });
    }

    info!("One to one chat {} created by {}", chat.id.to_hex(), user.id.to_hex());
    Ok(HttpResponse::Created().json(ApiResponse::new(
        201,
        "One to one chat created successfully",
        view,
    )))
}

// POST /chats/group
pub async fn create_group(
    req: HttpRequest,
    data: web::Data<AppState>,
    group_info: web::Json<CreateGroupRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req)?;
    let name = group_info.name.trim();
    if name.is_empty() || group_info.participants.is_empty() {
        return Err(ApiError::InvalidArgument(
            "Name and participants are required".to_string(),
        ));
    }

    // The requester always counts toward the member minimum.
    let members = group_members(&user, &group_info.participants)?;

    let repo = ChatRepo::new(data.mongodb.clone());
    if repo
        .find_group_by_name_and_creator(name, &user.id)
        .await?
        .is_some()
    {
        return Err(ApiError::Forbidden("Group already created".to_string()));
    }

    let group = Group::new(name.to_string(), user.id);
    repo.insert_group(&group).await?;
    let group = repo
        .find_group(&group.id)
        .await?
        .ok_or_else(|| ApiError::Internal("Something went wrong while creating group".to_string()))?;

    let chat = Chat::group_chat(user.id, group.id, members.clone());
    repo.insert_chat(&chat).await?;
    let view = views::chat_view_by_id(&repo, &chat.id).await?.ok_or_else(|| {
        ApiError::Internal("Something went wrong while creating group chat".to_string())
    })?;

    // Unlike one-to-one creation, the requester is not notified here.
    for member in &members {
        if *member == user.id {
            continue;
        }
        data.chat_server.do_send(Notify {
            user_id: member.to_hex(),
            event: NEW_CHAT,
            payload: view.clone(),
        });
    }

    info!("Group chat {} ({}) created by {}", chat.id.to_hex(), name, user.id.to_hex());
    Ok(HttpResponse::Created().json(ApiResponse::new(
        201,
        "Group chat created successfully",
        view,
    )))
}

// POST /chats/group/participants
pub async fn add_participants(
    req: HttpRequest,
    data: web::Data<AppState>,
    info: web::Json<UpdateParticipantsRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req)?;
    let (chat_id, members) = validate_targets(&user, &info.chat_id, &info.participants)?;

    let repo = ChatRepo::new(data.mongodb.clone());
    let chat = repo
        .find_chat(&chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group chat does not exist".to_string()))?;

    require_admin(&chat, &user.id, "Adding participants")?;

    if let Some(duplicate) = first_already_present(&chat.participants, &members) {
        return Err(ApiError::Conflict(format!(
            "User already in chat group with id: {}",
            duplicate.to_hex()
        )));
    }

    let mut updated = chat.participants.clone();
    updated.extend(members.iter().copied());
    repo.set_participants(&chat_id, &updated).await?;

    let view = views::chat_view_by_id(&repo, &chat_id).await?.ok_or_else(|| {
        ApiError::Internal("Something went wrong while adding participants".to_string())
    })?;

    for member in &members {
        data.chat_server.do_send(Notify {
            user_id: member.to_hex(),
            event: NEW_CHAT,
            payload: view.clone(),
        });
    }

    info!("{} participant(s) added to chat {}", members.len(), chat_id.to_hex());
    Ok(HttpResponse::Created().json(ApiResponse::new(
        201,
        "Participants added successfully",
        view,
    )))
}

// DELETE /chats/group/participants
pub async fn remove_participants(
    req: HttpRequest,
    data: web::Data<AppState>,
    info: web::Json<UpdateParticipantsRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = current_user(&req)?;
    let (chat_id, members) = validate_targets(&user, &info.chat_id, &info.participants)?;

    let repo = ChatRepo::new(data.mongodb.clone());
    let chat = repo
        .find_chat(&chat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Group chat does not exist".to_string()))?;

    require_admin(&chat, &user.id, "Removing participants")?;

    // Ids not currently in the chat fall out of the difference silently.
    let remaining = without_members(&chat.participants, &members);
    repo.set_participants(&chat_id, &remaining).await?;

    let view = views::chat_view_by_id(&repo, &chat_id).await?.ok_or_else(|| {
        ApiError::Internal("Something went wrong while removing participants".to_string())
    })?;

    for member in &members {
        data.chat_server.do_send(Notify {
            user_id: member.to_hex(),
            event: LEAVE_CHAT,
            payload: view.clone(),
        });
    }

    info!("{} participant(s) removed from chat {}", members.len(), chat_id.to_hex());
    Ok(HttpResponse::Ok().json(ApiResponse::new(
        200,
        "Participants removed successfully",
        view,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_user() -> AuthUser {
        AuthUser {
            id: ObjectId::new(),
            name: "requester".to_string(),
            email: "requester@example.com".to_string(),
        }
    }

    fn hex_ids(n: usize) -> Vec<String> {
        (0..n).map(|_| ObjectId::new().to_hex()).collect()
    }

    #[test]
    fn dedupe_preserves_first_occurrence_order() {
        let ids = vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
            "c".to_string(),
            "b".to_string(),
        ];
        assert_eq!(dedupe(&ids), vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_names_the_offending_id() {
        let mut ids = hex_ids(1);
        ids.push("not-an-object-id".to_string());
        let err = parse_participant_ids(&ids).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid participant id: not-an-object-id"
        );
    }

    #[test]
    fn validate_targets_rejects_empty_input() {
        let user = auth_user();
        let err = validate_targets(&user, "", &hex_ids(1)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
        let err = validate_targets(&user, &ObjectId::new().to_hex(), &[]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn validate_targets_rejects_malformed_chat_id() {
        let user = auth_user();
        let err = validate_targets(&user, "nope", &hex_ids(1)).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn validate_targets_rejects_self_targeting_admin() {
        let user = auth_user();
        let mut ids = hex_ids(1);
        ids.push(user.id.to_hex());
        let err = validate_targets(&user, &ObjectId::new().to_hex(), &ids).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn validate_targets_dedups_before_parsing() {
        let user = auth_user();
        let id = ObjectId::new().to_hex();
        let (_, members) =
            validate_targets(&user, &ObjectId::new().to_hex(), &[id.clone(), id.clone()])
                .unwrap();
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn self_chat_is_forbidden() {
        let id = ObjectId::new();
        let err = ensure_not_self(&id, &id).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(ensure_not_self(&id, &ObjectId::new()).is_ok());
    }

    #[test]
    fn group_below_three_members_is_forbidden() {
        let user = auth_user();
        // requester + one participant = 2 members
        let err = group_members(&user, &hex_ids(1)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        // requester + two participants = 3 members
        let members = group_members(&user, &hex_ids(2)).unwrap();
        assert_eq!(members.len(), 3);
        assert!(members.contains(&user.id));
    }

    #[test]
    fn requester_in_participant_list_does_not_inflate_the_count() {
        let user = auth_user();
        let ids = vec![ObjectId::new().to_hex(), user.id.to_hex()];
        let err = group_members(&user, &ids).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn non_admin_is_unauthorized_even_as_participant() {
        let admin = ObjectId::new();
        let member = ObjectId::new();
        let chat = Chat::group_chat(admin, ObjectId::new(), vec![admin, member]);
        let err = require_admin(&chat, &member, "Adding participants").unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert!(require_admin(&chat, &admin, "Adding participants").is_ok());
    }

    #[test]
    fn already_present_member_is_reported() {
        let existing = vec![ObjectId::new(), ObjectId::new()];
        let members = vec![ObjectId::new(), existing[1]];
        assert_eq!(first_already_present(&existing, &members), Some(existing[1]));
        assert_eq!(first_already_present(&existing, &[ObjectId::new()]), None);
    }

    #[test]
    fn removing_absent_members_leaves_set_unchanged() {
        let existing = vec![ObjectId::new(), ObjectId::new(), ObjectId::new()];
        let absent = vec![ObjectId::new()];
        assert_eq!(without_members(&existing, &absent), existing);
    }

    #[test]
    fn removal_is_a_set_difference() {
        let keep = ObjectId::new();
        let drop_a = ObjectId::new();
        let drop_b = ObjectId::new();
        let existing = vec![drop_a, keep, drop_b];
        assert_eq!(without_members(&existing, &[drop_a, drop_b]), vec![keep]);
    }
}
