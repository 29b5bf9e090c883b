//! Collaboration requests: invite by email, then accept or reject.
//!
//! Request, document and notification writes are independent; an accept
//! that fails after the request is resolved leaves the request resolved.

use super::types::*;
use crate::auth::service::normalize_email;
use crate::database::Database;
use crate::docs::access;
use crate::docs::service as documents;
use crate::docs::types::{Collaborator, CreateDocumentInput, Document, DocumentSummary};
use crate::error::AppError;
use crate::mail::{self, Mailer};
use crate::notifications::{NewNotification, NotificationData, NotificationKind};

fn load_document(db: &Database, id: &str) -> Result<Document, AppError> {
    documents::validate_document_id(id)?;
    db.get_document(id)?
        .filter(|d| !d.is_deleted)
        .ok_or_else(|| AppError::not_found("Document not found"))
}

pub async fn send_request(
    db: &Database,
    mailer: &Mailer,
    sender_id: &str,
    input: SendRequestInput,
) -> Result<CollaborationRequest, AppError> {
    let email = normalize_email(&input.recipient_email);
    if !email.contains('@') {
        return Err(AppError::validation("A valid recipient email is required"));
    }

    let sender = db
        .get_user(sender_id)?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?;
    let recipient = db
        .find_user_by_email(&email)?
        .ok_or_else(|| AppError::not_found("No user found with that email"))?
        .user;

    if recipient.id == sender.id {
        return Err(AppError::validation("You cannot invite yourself"));
    }

    // the recipient is resolved first so a failed invite never leaves a blank document behind
    let doc = match input.document_ref() {
        DocumentRef::Existing(id) => {
            let doc = load_document(db, &id)?;
            access::require_owner(&doc, sender_id)?;
            doc
        }
        DocumentRef::New { title } => documents::create_document(
            db,
            sender_id,
            CreateDocumentInput {
                title,
                ..Default::default()
            },
        )?,
    };

    if doc.collaborator(&recipient.id).is_some() {
        return Err(AppError::conflict("User is already a collaborator on this document"));
    }
    if db.has_pending_request(&doc.id, &recipient.id)? {
        return Err(AppError::conflict("A pending request already exists for this user"));
    }

    let request = CollaborationRequest {
        id: uuid::Uuid::new_v4().to_string(),
        document_id: doc.id.clone(),
        sender_id: sender.id.clone(),
        recipient_id: recipient.id.clone(),
        recipient_email: email,
        permission: input.permission,
        message: input.message.trim().to_string(),
        status: RequestStatus::Pending,
        created_at: chrono::Utc::now().timestamp_millis(),
        responded_at: None,
    };

    // a concurrent invite can still slip past the check above
    if let Err(e) = db.insert_collaboration_request(&request) {
        if e.is_constraint_violation() {
            return Err(AppError::conflict("A pending request already exists for this user"));
        }
        return Err(e.into());
    }

    db.create_notification(&NewNotification {
        recipient_id: recipient.id.clone(),
        kind: NotificationKind::CollaborationRequest,
        title: "Collaboration Request".to_string(),
        message: format!(
            "{} invited you to {} \"{}\"",
            sender.name,
            request.permission.as_str(),
            doc.title
        ),
        data: NotificationData {
            document_id: Some(doc.id.clone()),
            request_id: Some(request.id.clone()),
            sender_id: Some(sender.id.clone()),
        },
    })?;

    tracing::info!(
        request_id = %request.id,
        document_id = %doc.id,
        recipient_id = %recipient.id,
        "collaboration request sent"
    );

    mailer
        .send_best_effort(mail::invitation_mail(
            &recipient.email,
            &sender.name,
            &doc.title,
            request.permission.as_str(),
            &request.message,
        ))
        .await;

    Ok(request)
}

pub fn respond(db: &Database, user_id: &str, input: RespondInput) -> Result<CollaborationRequest, AppError> {
    let mut request = db
        .get_collaboration_request(&input.request_id)?
        .ok_or_else(|| AppError::not_found("Collaboration request not found"))?;

    if request.recipient_id != user_id {
        return Err(AppError::forbidden("This request was not sent to you"));
    }
    if request.status != RequestStatus::Pending {
        return Err(AppError::conflict("Request has already been answered"));
    }

    let now = chrono::Utc::now().timestamp_millis();
    let status = match input.action {
        RespondAction::Accept => RequestStatus::Accepted,
        RespondAction::Reject => RequestStatus::Rejected,
    };

    // lost the race against another respond call
    if !db.resolve_collaboration_request(&request.id, status, now)? {
        return Err(AppError::conflict("Request has already been answered"));
    }
    request.status = status;
    request.responded_at = Some(now);

    let recipient_name = db
        .get_user(user_id)?
        .map(|u| u.name)
        .unwrap_or_else(|| request.recipient_email.clone());

    match input.action {
        RespondAction::Accept => {
            let mut doc = db
                .get_document(&request.document_id)?
                .ok_or_else(|| AppError::not_found("Document not found"))?;

            if doc.collaborator(user_id).is_none() {
                doc.collaborators.push(Collaborator {
                    user_id: user_id.to_string(),
                    permission: request.permission,
                    added_at: now,
                });
                doc.last_modified = now;
                db.save_document(&doc)?;
            }

            db.create_notification(&NewNotification {
                recipient_id: request.sender_id.clone(),
                kind: NotificationKind::CollaborationAccepted,
                title: "Request Accepted".to_string(),
                message: format!("{} accepted your invitation to \"{}\"", recipient_name, doc.title),
                data: NotificationData {
                    document_id: Some(doc.id.clone()),
                    request_id: Some(request.id.clone()),
                    sender_id: Some(user_id.to_string()),
                },
            })?;

            db.create_notification(&NewNotification {
                recipient_id: user_id.to_string(),
                kind: NotificationKind::DocumentShared,
                title: "Document Shared".to_string(),
                message: format!("You can now {} \"{}\"", request.permission.as_str(), doc.title),
                data: NotificationData {
                    document_id: Some(doc.id.clone()),
                    request_id: Some(request.id.clone()),
                    sender_id: Some(request.sender_id.clone()),
                },
            })?;

            tracing::info!(request_id = %request.id, document_id = %doc.id, "collaboration request accepted");
        }
        RespondAction::Reject => {
            db.create_notification(&NewNotification {
                recipient_id: request.sender_id.clone(),
                kind: NotificationKind::CollaborationRejected,
                title: "Request Declined".to_string(),
                message: format!("{} declined your invitation", recipient_name),
                data: NotificationData {
                    document_id: Some(request.document_id.clone()),
                    request_id: Some(request.id.clone()),
                    sender_id: Some(user_id.to_string()),
                },
            })?;

            tracing::info!(request_id = %request.id, "collaboration request rejected");
        }
    }

    Ok(request)
}

pub fn list_pending_requests(db: &Database, user_id: &str) -> Result<Vec<RequestSummary>, AppError> {
    let requests = db.list_pending_requests_for(user_id)?;

    let mut summaries = Vec::with_capacity(requests.len());
    for request in requests {
        let document_title = db
            .get_document(&request.document_id)?
            .map(|d| d.title)
            .unwrap_or_default();
        let sender_name = db
            .get_user(&request.sender_id)?
            .map(|u| u.name)
            .unwrap_or_default();

        summaries.push(RequestSummary {
            request,
            document_title,
            sender_name,
        });
    }

    Ok(summaries)
}

pub fn list_collaborated_documents(db: &Database, user_id: &str) -> Result<Vec<CollaboratedDocument>, AppError> {
    let docs = db.list_collaborated_documents(user_id)?;

    Ok(docs
        .iter()
        .filter_map(|doc| {
            let permission = doc.collaborator(user_id)?.permission;
            Some(CollaboratedDocument {
                document: DocumentSummary::from(doc),
                owner_id: doc.owner_id.clone(),
                permission,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::Permission;

    struct Fixture {
        db: Database,
        owner: String,
        bob: String,
        doc: Document,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("Ada", "ada@example.com", "hash").unwrap().id;
        let bob = db.create_user("Bob", "bob@example.com", "hash").unwrap().id;
        let doc = documents::create_document(
            &db,
            &owner,
            CreateDocumentInput {
                title: Some("Notes".into()),
                ..Default::default()
            },
        )
        .unwrap();

        Fixture { db, owner, bob, doc }
    }

    fn invite(doc_id: Option<&str>, email: &str) -> SendRequestInput {
        SendRequestInput {
            document_id: doc_id.map(String::from),
            title: None,
            recipient_email: email.into(),
            permission: Permission::Edit,
            message: "join me".into(),
        }
    }

    fn answer(request_id: &str, action: RespondAction) -> RespondInput {
        RespondInput {
            request_id: request_id.into(),
            action,
        }
    }

    #[tokio::test]
    async fn test_accept_adds_collaborator_once() {
        let f = setup();
        let request = send_request(&f.db, &Mailer::Log, &f.owner, invite(Some(&f.doc.id), "BOB@example.com"))
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        let pending = list_pending_requests(&f.db, &f.bob).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].document_title, "Notes");
        assert_eq!(pending[0].sender_name, "Ada");

        let accepted = respond(&f.db, &f.bob, answer(&request.id, RespondAction::Accept)).unwrap();
        assert_eq!(accepted.status, RequestStatus::Accepted);
        assert!(accepted.responded_at.is_some());

        let second = respond(&f.db, &f.bob, answer(&request.id, RespondAction::Reject)).unwrap_err();
        assert!(matches!(second, AppError::Conflict(_)));

        let shared = list_collaborated_documents(&f.db, &f.bob).unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].permission, Permission::Edit);
        assert_eq!(shared[0].owner_id, f.owner);

        let owner_notes = f.db.list_notifications(&f.owner, true).unwrap();
        assert_eq!(owner_notes[0].kind, NotificationKind::CollaborationAccepted);
        let bob_kinds: Vec<_> = f.db.list_notifications(&f.bob, false).unwrap().iter().map(|n| n.kind).collect();
        assert!(bob_kinds.contains(&NotificationKind::CollaborationRequest));
        assert!(bob_kinds.contains(&NotificationKind::DocumentShared));
    }

    #[tokio::test]
    async fn test_duplicate_pending_conflicts_until_resolved() {
        let f = setup();
        let first = send_request(&f.db, &Mailer::Log, &f.owner, invite(Some(&f.doc.id), "bob@example.com"))
            .await
            .unwrap();

        let dup = send_request(&f.db, &Mailer::Log, &f.owner, invite(Some(&f.doc.id), "bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));

        respond(&f.db, &f.bob, answer(&first.id, RespondAction::Reject)).unwrap();
        let owner_notes = f.db.list_notifications(&f.owner, false).unwrap();
        assert_eq!(owner_notes[0].kind, NotificationKind::CollaborationRejected);

        let again = send_request(&f.db, &Mailer::Log, &f.owner, invite(Some(&f.doc.id), "bob@example.com"))
            .await
            .unwrap();
        assert_ne!(again.id, first.id);

        respond(&f.db, &f.bob, answer(&again.id, RespondAction::Accept)).unwrap();
        let already = send_request(&f.db, &Mailer::Log, &f.owner, invite(Some(&f.doc.id), "bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(already, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reject_notifies_sender_only() {
        let f = setup();
        let request = send_request(&f.db, &Mailer::Log, &f.owner, invite(Some(&f.doc.id), "bob@example.com"))
            .await
            .unwrap();

        let rejected = respond(&f.db, &f.bob, answer(&request.id, RespondAction::Reject)).unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(
            f.db.get_collaboration_request(&request.id).unwrap().unwrap().status,
            RequestStatus::Rejected
        );

        let owner_kinds: Vec<_> = f.db.list_notifications(&f.owner, false).unwrap().iter().map(|n| n.kind).collect();
        assert_eq!(owner_kinds, vec![NotificationKind::CollaborationRejected]);

        let bob_kinds: Vec<_> = f.db.list_notifications(&f.bob, false).unwrap().iter().map(|n| n.kind).collect();
        assert_eq!(bob_kinds, vec![NotificationKind::CollaborationRequest]);

        assert!(f.db.get_document(&f.doc.id).unwrap().unwrap().collaborators.is_empty());
    }

    #[tokio::test]
    async fn test_invite_without_document_creates_one() {
        let f = setup();
        let mut input = invite(None, "bob@example.com");
        input.title = Some("Fresh".into());

        let request = send_request(&f.db, &Mailer::Log, &f.owner, input).await.unwrap();
        let doc = f.db.get_document(&request.document_id).unwrap().unwrap();
        assert_eq!(doc.title, "Fresh");
        assert!(doc.is_owner(&f.owner));
        assert_ne!(doc.id, f.doc.id);
    }

    #[tokio::test]
    async fn test_unknown_recipient_creates_nothing() {
        let f = setup();
        let err = send_request(&f.db, &Mailer::Log, &f.owner, invite(None, "nobody@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(
            f.db.list_owned_documents(&f.owner, crate::docs::ListFilter::Active).unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_only_owner_invites_and_only_recipient_responds() {
        let f = setup();
        f.db.create_user("Carol", "carol@example.com", "hash").unwrap();

        let err = send_request(&f.db, &Mailer::Log, &f.bob, invite(Some(&f.doc.id), "carol@example.com"))
            .await
            .unwrap_err();
        assert!(err.is_authorization());

        let own = send_request(&f.db, &Mailer::Log, &f.owner, invite(Some(&f.doc.id), "ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(own, AppError::Validation(_)));

        let request = send_request(&f.db, &Mailer::Log, &f.owner, invite(Some(&f.doc.id), "bob@example.com"))
            .await
            .unwrap();
        let err = respond(&f.db, &f.owner, answer(&request.id, RespondAction::Accept)).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let missing = respond(&f.db, &f.bob, answer("nope", RespondAction::Accept)).unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }
}
