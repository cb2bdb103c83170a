/// Typed views over stored documents.
///
/// Every field is optional: documents written by older versions of the
/// admin console carry different subsets of fields, and the analytics
/// engine must read all of them.
use crate::store::Document;
use crate::timestamp::RawTimestamp;

fn text(doc: &Document, field: &str) -> Option<String> {
    doc.text(field).map(str::to_owned)
}

#[derive(Debug, Clone)]
pub struct Poem {
    pub id: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub date_posted: RawTimestamp,
    pub views: u64,
    pub likes: u64,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Poem {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: text(doc, "title"),
            author: text(doc, "author"),
            slug: text(doc, "slug"),
            content: text(doc, "content"),
            date_posted: RawTimestamp::from_field(doc, "datePosted"),
            views: doc.get("views").and_then(|v| v.as_u64()).unwrap_or(0),
            likes: doc.get("likes").and_then(|v| v.as_u64()).unwrap_or(0),
            user_id: doc.identity_text("userId"),
            email: text(doc, "email"),
            name: text(doc, "name"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub created_at: RawTimestamp,
    pub role: Option<String>,
}

impl User {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            user_id: doc.identity_text("userId"),
            name: text(doc, "name"),
            display_name: text(doc, "displayName"),
            email: text(doc, "email"),
            created_at: RawTimestamp::from_field(doc, "createdAt"),
            role: text(doc, "role"),
        }
    }

    /// Key under which this user's display name is looked up.
    pub fn resolution_key(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.id)
    }

    /// Display name: name, then displayName, then email, then document id.
    pub fn display_name(&self) -> &str {
        [&self.name, &self.display_name, &self.email]
            .into_iter()
            .find_map(|candidate| candidate.as_deref())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub poem_slug: Option<String>,
    pub author: Option<String>,
    pub content: Option<String>,
    pub timestamp: RawTimestamp,
    pub admin_reply: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Comment {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            poem_slug: text(doc, "poemSlug"),
            author: text(doc, "author"),
            content: text(doc, "content"),
            timestamp: RawTimestamp::from_field(doc, "timestamp"),
            admin_reply: doc
                .get("adminReply")
                .and_then(|v| v.as_str())
                .map(str::to_owned),
            user_id: doc.identity_text("userId"),
            email: text(doc, "email"),
            name: text(doc, "name"),
        }
    }

    /// An admin reply is present and not just whitespace.
    pub fn is_replied(&self) -> bool {
        self.admin_reply
            .as_deref()
            .is_some_and(|reply| !reply.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct PoemRequest {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub user_name: Option<String>,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub timestamp: RawTimestamp,
}

impl PoemRequest {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: text(doc, "title"),
            content: text(doc, "content"),
            user_name: text(doc, "userName"),
            user_id: doc.identity_text("userId"),
            email: text(doc, "email"),
            timestamp: RawTimestamp::from_field(doc, "timestamp"),
        }
    }
}
