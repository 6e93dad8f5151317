//! Identifier helpers: prefixed ids (§3) and the room-name slugifier used by
//! `TenantCoordinator::createRoom`.

use uuid::Uuid;

pub fn new_uuid() -> String {
    Uuid::new_v4().to_string()
}

pub fn message_id() -> String {
    format!("m:{}", new_uuid())
}

pub fn document_id() -> String {
    format!("d:{}", new_uuid())
}

pub fn session_id() -> String {
    format!("s:{}", new_uuid())
}

pub fn request_id() -> String {
    format!("req:{}", new_uuid())
}

/// `lowercase, spaces→-, strip non-[a-z0-9-], truncate to 50 chars` (§4.4).
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut slug = String::with_capacity(lower.len());
    for c in lower.chars() {
        match c {
            ' ' => slug.push('-'),
            'a'..='z' | '0'..='9' | '-' => slug.push(c),
            _ => {}
        }
    }
    slug.truncate(50);
    slug
}

pub fn room_id_for(name: &str) -> String {
    format!("r:{}", slugify(name))
}

pub fn tenant_agreement_id(tenant_id: &str) -> String {
    format!("a:tenant:{tenant_id}")
}

pub fn room_agreement_id(room_id: &str) -> String {
    format!("a:room:{room_id}")
}

pub fn workspace_agreement_id(workspace_id: &str) -> String {
    format!("a:workspace:{workspace_id}")
}
