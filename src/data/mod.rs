//! Core data models for restpager
//!
//! This module contains the resource types served by the remote API, the
//! items decoded from its responses, and the request descriptor built for
//! each page fetch.

pub mod query;

pub use query::{build_request, total_pages};

use serde::de::DeserializeOwned;
use serde::Deserialize;

/// One of the remote collections the API exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Posts,
    Users,
    Comments,
}

impl ResourceType {
    /// Path segment of the collection on the server
    pub fn path(&self) -> &'static str {
        match self {
            ResourceType::Posts => "posts",
            ResourceType::Users => "users",
            ResourceType::Comments => "comments",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            ResourceType::Posts => "Posts",
            ResourceType::Users => "Users",
            ResourceType::Comments => "Comments",
        }
    }

    /// Parses a resource type name, case-insensitively.
    ///
    /// Accepts both the plural collection name and its singular form.
    pub fn from_str(s: &str) -> Option<ResourceType> {
        match s.to_lowercase().trim() {
            "posts" | "post" => Some(ResourceType::Posts),
            "users" | "user" => Some(ResourceType::Users),
            "comments" | "comment" => Some(ResourceType::Comments),
            _ => None,
        }
    }

    /// Decodes an already-parsed JSON array into items of this type
    pub fn items_from_value(self, value: serde_json::Value) -> Result<Vec<Item>, serde_json::Error> {
        match self {
            ResourceType::Posts => decode_as(value, Item::Post),
            ResourceType::Users => decode_as(value, Item::User),
            ResourceType::Comments => decode_as(value, Item::Comment),
        }
    }

    /// Decodes a raw JSON body into items of this type
    pub fn items_from_slice(self, body: &[u8]) -> Result<Vec<Item>, serde_json::Error> {
        self.items_from_value(serde_json::from_slice(body)?)
    }
}

fn decode_as<T: DeserializeOwned>(
    value: serde_json::Value,
    wrap: fn(T) -> Item,
) -> Result<Vec<Item>, serde_json::Error> {
    Ok(serde_json::from_value::<Vec<T>>(value)?
        .into_iter()
        .map(wrap)
        .collect())
}

/// A blog post
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub body: String,
}

/// The company a user works for
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Company {
    pub name: String,
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub company: Company,
}

/// A comment left on a post
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub body: String,
    #[serde(rename = "postId")]
    pub post_id: u64,
}

/// A single element of a fetched page
///
/// The variant is chosen by the resource type the page was requested for,
/// never guessed from the JSON shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Post(Post),
    User(User),
    Comment(Comment),
}

impl Item {
    /// Server-side identifier of the item
    pub fn id(&self) -> u64 {
        match self {
            Item::Post(post) => post.id,
            Item::User(user) => user.id,
            Item::Comment(comment) => comment.id,
        }
    }

    /// Primary line shown for the item
    pub fn headline(&self) -> &str {
        match self {
            Item::Post(post) => &post.title,
            Item::User(user) => &user.name,
            Item::Comment(comment) => &comment.name,
        }
    }

    /// Secondary line shown under the headline
    pub fn detail(&self) -> String {
        match self {
            Item::Post(post) => post.body.replace('\n', " "),
            Item::User(user) => format!("{} \u{00B7} {}", user.email, user.company.name),
            Item::Comment(comment) => format!(
                "{} on post #{}: {}",
                comment.email,
                comment.post_id,
                comment.body.replace('\n', " ")
            ),
        }
    }
}

/// Everything needed to perform one page fetch
///
/// Built fresh for each request by [`build_request`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Collection URL, without query string
    pub endpoint: String,
    /// Collection being requested
    pub resource_type: ResourceType,
    /// Trimmed full-text search term; empty means no filter
    pub search_term: String,
    /// 1-based page number
    pub page: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl RequestDescriptor {
    /// Query parameters in the json-server pagination dialect
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("_page", self.page.to_string()),
            ("_limit", self.page_size.to_string()),
        ];
        if !self.search_term.is_empty() {
            pairs.push(("q", self.search_term.clone()));
        }
        pairs
    }
}
